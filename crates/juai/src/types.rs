//! Shared request and status types.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::style::StylePreset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Video,
    Image,
    Music,
    Avatar,
    Edit,
}

impl Modality {
    pub const ALL: [Modality; 5] = [
        Modality::Video,
        Modality::Image,
        Modality::Music,
        Modality::Avatar,
        Modality::Edit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Video => "video",
            Modality::Image => "image",
            Modality::Music => "music",
            Modality::Avatar => "avatar",
            Modality::Edit => "edit",
        }
    }

    /// Tool used when routing yields nothing usable for this modality.
    pub fn default_tool(&self) -> ToolId {
        match self {
            Modality::Video => ToolId::Kling,
            Modality::Image => ToolId::Midjourney,
            Modality::Music => ToolId::Suno,
            Modality::Avatar => ToolId::Heygen,
            Modality::Edit => ToolId::Creatomate,
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every generation tool a caller can ask for by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolId {
    Kling,
    Veo,
    Sora,
    Hailuo,
    Luma,
    Midjourney,
    Flux,
    Suno,
    Udio,
    Heygen,
    Creatomate,
}

impl ToolId {
    pub const ALL: [ToolId; 11] = [
        ToolId::Kling,
        ToolId::Veo,
        ToolId::Sora,
        ToolId::Hailuo,
        ToolId::Luma,
        ToolId::Midjourney,
        ToolId::Flux,
        ToolId::Suno,
        ToolId::Udio,
        ToolId::Heygen,
        ToolId::Creatomate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolId::Kling => "kling",
            ToolId::Veo => "veo",
            ToolId::Sora => "sora",
            ToolId::Hailuo => "hailuo",
            ToolId::Luma => "luma",
            ToolId::Midjourney => "midjourney",
            ToolId::Flux => "flux",
            ToolId::Suno => "suno",
            ToolId::Udio => "udio",
            ToolId::Heygen => "heygen",
            ToolId::Creatomate => "creatomate",
        }
    }

    pub fn modality(&self) -> Modality {
        match self {
            ToolId::Kling | ToolId::Veo | ToolId::Sora | ToolId::Hailuo | ToolId::Luma => {
                Modality::Video
            }
            ToolId::Midjourney | ToolId::Flux => Modality::Image,
            ToolId::Suno | ToolId::Udio => Modality::Music,
            ToolId::Heygen => Modality::Avatar,
            ToolId::Creatomate => Modality::Edit,
        }
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown tool '{0}'")]
pub struct UnknownTool(pub String);

impl FromStr for ToolId {
    type Err = UnknownTool;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        ToolId::ALL
            .iter()
            .copied()
            .find(|tool| tool.as_str() == lowered)
            .ok_or_else(|| UnknownTool(s.to_string()))
    }
}

/// `auto` lets the router pick; anything else names a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ToolChoice {
    #[default]
    Auto,
    Tool(ToolId),
}

impl FromStr for ToolChoice {
    type Err = UnknownTool;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() || s.trim().eq_ignore_ascii_case("auto") {
            return Ok(ToolChoice::Auto);
        }
        s.parse().map(ToolChoice::Tool)
    }
}

impl TryFrom<String> for ToolChoice {
    type Error = UnknownTool;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ToolChoice> for String {
    fn from(choice: ToolChoice) -> Self {
        match choice {
            ToolChoice::Auto => "auto".to_string(),
            ToolChoice::Tool(tool) => tool.as_str().to_string(),
        }
    }
}

impl From<ToolId> for ToolChoice {
    fn from(tool: ToolId) -> Self {
        ToolChoice::Tool(tool)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "16:9")]
    Landscape,
    #[default]
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:5")]
    Feed,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Square => "1:1",
            AspectRatio::Feed => "4:5",
        }
    }

    /// Pixel dimensions used by providers that want explicit sizes.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            AspectRatio::Landscape => (1920, 1080),
            AspectRatio::Portrait => (1080, 1920),
            AspectRatio::Square => (1080, 1080),
            AspectRatio::Feed => (1080, 1350),
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarOptions {
    #[serde(default)]
    pub avatar_id: Option<String>,
    #[serde(default)]
    pub voice_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditOptions {
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub modifications: BTreeMap<String, serde_json::Value>,
}

/// A caller's generation request. The facade takes ownership on submit;
/// everything downstream only borrows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub prompt: String,
    pub modality: Modality,
    #[serde(default)]
    pub tool: ToolChoice,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    #[serde(default)]
    pub duration_secs: Option<u32>,
    #[serde(default)]
    pub style_preset: Option<String>,
    #[serde(default)]
    pub negative_prompt: Option<String>,
    #[serde(default)]
    pub source_image_url: Option<String>,
    #[serde(default)]
    pub avatar: Option<AvatarOptions>,
    #[serde(default)]
    pub edit: Option<EditOptions>,
}

impl GenerationRequest {
    pub fn new(modality: Modality, prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            modality,
            tool: ToolChoice::Auto,
            aspect_ratio: AspectRatio::default(),
            duration_secs: None,
            style_preset: None,
            negative_prompt: None,
            source_image_url: None,
            avatar: None,
            edit: None,
        }
    }

    pub fn video(prompt: impl Into<String>) -> Self {
        Self::new(Modality::Video, prompt)
    }

    pub fn image(prompt: impl Into<String>) -> Self {
        Self::new(Modality::Image, prompt)
    }

    pub fn music(prompt: impl Into<String>) -> Self {
        Self::new(Modality::Music, prompt)
    }

    pub fn avatar(script: impl Into<String>) -> Self {
        Self::new(Modality::Avatar, script)
    }

    pub fn edit(prompt: impl Into<String>) -> Self {
        Self::new(Modality::Edit, prompt)
    }

    pub fn with_tool(mut self, tool: impl Into<ToolChoice>) -> Self {
        self.tool = tool.into();
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_duration(mut self, secs: u32) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    pub fn with_style(mut self, preset_id: impl Into<String>) -> Self {
        self.style_preset = Some(preset_id.into());
        self
    }

    pub fn with_source_image(mut self, url: impl Into<String>) -> Self {
        self.source_image_url = Some(url.into());
        self
    }

    pub fn with_avatar(mut self, avatar: AvatarOptions) -> Self {
        self.avatar = Some(avatar);
        self
    }

    pub fn with_edit(mut self, edit: EditOptions) -> Self {
        self.edit = Some(edit);
        self
    }
}

/// What an adapter receives: the original request, the prompt actually sent
/// (possibly rewritten by the router) and the resolved style.
#[derive(Debug, Clone, Copy)]
pub struct ProviderRequest<'a> {
    pub request: &'a GenerationRequest,
    pub prompt: &'a str,
    pub style: &'a StylePreset,
}

impl<'a> ProviderRequest<'a> {
    pub fn new(request: &'a GenerationRequest, prompt: &'a str, style: &'a StylePreset) -> Self {
        Self {
            request,
            prompt,
            style,
        }
    }

    /// Prompt with the style suffix appended.
    pub fn enhanced_prompt(&self) -> String {
        self.style.apply(self.prompt)
    }

    pub fn duration_or(&self, default: u32) -> u32 {
        self.request.duration_secs.unwrap_or(default)
    }
}

/// Opaque provider task identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical provider-side state after vocabulary normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderState {
    Pending,
    Processing,
    Succeeded,
    Failed,
    Unknown,
}

/// One normalized poll result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStatus {
    pub state: ProviderState,
    pub progress: Option<u8>,
    pub result_url: Option<String>,
    pub error: Option<String>,
}

impl RawStatus {
    pub fn pending() -> Self {
        Self::with_state(ProviderState::Pending)
    }

    pub fn processing(progress: Option<u8>) -> Self {
        Self {
            progress,
            ..Self::with_state(ProviderState::Processing)
        }
    }

    pub fn succeeded(url: impl Into<String>) -> Self {
        Self {
            result_url: Some(url.into()),
            ..Self::with_state(ProviderState::Succeeded)
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::with_state(ProviderState::Failed)
        }
    }

    pub fn with_state(state: ProviderState) -> Self {
        Self {
            state,
            progress: None,
            result_url: None,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_choice_parsing() {
        assert_eq!("auto".parse::<ToolChoice>().unwrap(), ToolChoice::Auto);
        assert_eq!("".parse::<ToolChoice>().unwrap(), ToolChoice::Auto);
        assert_eq!(
            "Kling".parse::<ToolChoice>().unwrap(),
            ToolChoice::Tool(ToolId::Kling)
        );
        assert!("dalle".parse::<ToolChoice>().is_err());
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let json = r#"{"prompt": "자동차 추격 장면", "modality": "video", "tool": "veo"}"#;
        let request: GenerationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.tool, ToolChoice::Tool(ToolId::Veo));
        assert_eq!(request.aspect_ratio, AspectRatio::Portrait);
        assert!(request.style_preset.is_none());
    }

    #[test]
    fn test_aspect_ratio_serde_uses_ratio_strings() {
        let json = serde_json::to_string(&AspectRatio::Landscape).unwrap();
        assert_eq!(json, "\"16:9\"");
        let parsed: AspectRatio = serde_json::from_str("\"4:5\"").unwrap();
        assert_eq!(parsed, AspectRatio::Feed);
    }

    #[test]
    fn test_every_modality_default_tool_matches() {
        for modality in Modality::ALL {
            assert_eq!(modality.default_tool().modality(), modality);
        }
    }
}
