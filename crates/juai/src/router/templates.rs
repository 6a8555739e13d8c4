//! Per-tool prompt templates.

use crate::types::ToolId;

struct PromptTemplate {
    tool: ToolId,
    prefix: &'static str,
    suffix: &'static str,
    camera_hints: &'static [&'static str],
}

const TEMPLATES: &[PromptTemplate] = &[
    PromptTemplate {
        tool: ToolId::Veo,
        prefix: "",
        suffix: ", photorealistic, highly detailed, natural lighting, 4K quality",
        camera_hints: &[
            "Drone view",
            "FPV shot",
            "tracking shot",
            "slow motion",
            "motion blur",
        ],
    },
    PromptTemplate {
        tool: ToolId::Kling,
        prefix: "",
        suffix: ", shot on iPhone 15 Pro, natural lighting, cinematic grain, 4K quality",
        camera_hints: &["handheld", "steady cam", "dolly shot"],
    },
    PromptTemplate {
        tool: ToolId::Sora,
        prefix: "",
        suffix: ", cinematic, dramatic lighting, film grain, anamorphic lens, 4K HDR",
        camera_hints: &["crane shot", "establishing shot", "wide angle", "long take"],
    },
    PromptTemplate {
        tool: ToolId::Midjourney,
        prefix: "",
        suffix: ", studio lighting, 8k",
        camera_hints: &[],
    },
    PromptTemplate {
        tool: ToolId::Heygen,
        prefix: "Professional presenter speaking: ",
        suffix: "",
        camera_hints: &[],
    },
    PromptTemplate {
        tool: ToolId::Suno,
        prefix: "Instrumental only, ",
        suffix: ", high fidelity, professional mix",
        camera_hints: &[],
    },
];

/// Only these tools get a camera hint.
const CAMERA_TOOLS: &[ToolId] = &[ToolId::Veo, ToolId::Sora, ToolId::Kling];

fn template(tool: ToolId) -> Option<&'static PromptTemplate> {
    TEMPLATES.iter().find(|t| t.tool == tool)
}

/// prefix + text + first camera hint + suffix. Tools without a template get
/// the text unchanged.
pub fn optimized_prompt(tool: ToolId, text: &str) -> String {
    let Some(template) = template(tool) else {
        return text.to_string();
    };

    let hint = match template.camera_hints.first() {
        Some(hint) if CAMERA_TOOLS.contains(&tool) => format!(", {}", hint),
        _ => String::new(),
    };

    format!("{}{}{}{}", template.prefix, text, hint, template.suffix)
}

/// prefix + text + suffix, without camera direction.
pub fn plain_prompt(tool: ToolId, text: &str) -> String {
    match template(tool) {
        Some(template) => format!("{}{}{}", template.prefix, text, template.suffix),
        None => text.to_string(),
    }
}
