//! Named visual style presets applied to generation prompts.

use serde::Serialize;

pub const DEFAULT_STYLE_ID: &str = "warm_film";

/// A visual style: a prompt suffix plus color-grade metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StylePreset {
    pub id: &'static str,
    pub name: &'static str,
    pub prompt_suffix: &'static str,
    pub color_grade: &'static str,
    pub mood: &'static str,
}

impl StylePreset {
    /// Appends the preset's suffix to `prompt`.
    pub fn apply(&self, prompt: &str) -> String {
        let prompt = prompt.trim();
        if self.prompt_suffix.is_empty() {
            return prompt.to_string();
        }
        if prompt.is_empty() {
            return self.prompt_suffix.to_string();
        }
        format!("{}, {}", prompt, self.prompt_suffix)
    }
}

const PRESETS: &[StylePreset] = &[
    StylePreset {
        id: "warm_film",
        name: "따뜻한 필름",
        prompt_suffix: "warm film look, soft grain, gentle highlights",
        color_grade: "warm, slightly faded blacks, kodak-like",
        mood: "nostalgic, cozy",
    },
    StylePreset {
        id: "cool_modern",
        name: "시원한 모던",
        prompt_suffix: "cool modern look, crisp contrast, clean whites",
        color_grade: "cool blue shadows, neutral highlights",
        mood: "sleek, urban",
    },
    StylePreset {
        id: "golden_hour",
        name: "골든아워",
        prompt_suffix: "golden hour sunlight, long soft shadows, glowing backlight",
        color_grade: "amber highlights, warm midtones",
        mood: "romantic, hopeful",
    },
    StylePreset {
        id: "cinematic_teal_orange",
        name: "시네마틱",
        prompt_suffix: "cinematic teal and orange grade, anamorphic framing",
        color_grade: "teal shadows, orange skin tones",
        mood: "dramatic, epic",
    },
    StylePreset {
        id: "iphone_korean",
        name: "아이폰 감성",
        prompt_suffix:
            "shot on iPhone 15 Pro, 4K cinematic, natural lighting, candid moment, warm tones",
        color_grade: "warm, slightly desaturated, film-like",
        mood: "한국 감성, 따뜻하고 자연스러운, 일상의 아름다움",
    },
    StylePreset {
        id: "professional",
        name: "프로페셔널",
        prompt_suffix: "professional studio setup, perfect lighting, commercial quality",
        color_grade: "neutral, accurate colors, high contrast",
        mood: "clean, premium, trustworthy",
    },
    StylePreset {
        id: "cinematic",
        name: "시네마",
        prompt_suffix: "cinematic anamorphic, dramatic lighting, film grain",
        color_grade: "teal and orange, high dynamic range",
        mood: "emotional, storytelling, epic",
    },
    StylePreset {
        id: "minimal",
        name: "미니멀",
        prompt_suffix: "minimalist, clean backgrounds, focused subject",
        color_grade: "monochromatic or limited palette",
        mood: "simple, elegant, modern",
    },
    StylePreset {
        id: "trendy",
        name: "트렌디",
        prompt_suffix: "viral style, dynamic edits, bold colors",
        color_grade: "vibrant, high saturation, punchy",
        mood: "energetic, fun, attention-grabbing",
    },
];

/// Read-only catalog of the built-in presets.
#[derive(Debug, Clone)]
pub struct StyleCatalog {
    default_index: usize,
}

impl Default for StyleCatalog {
    fn default() -> Self {
        Self { default_index: 0 }
    }
}

impl StyleCatalog {
    /// Catalog whose fallback preset is `default_id`. An unknown id keeps
    /// the built-in default.
    pub fn with_default(default_id: &str) -> Self {
        match PRESETS.iter().position(|p| p.id == default_id) {
            Some(default_index) => Self { default_index },
            None => {
                log::warn!(
                    "Unknown default style preset '{}', using '{}'",
                    default_id,
                    DEFAULT_STYLE_ID
                );
                Self::default()
            }
        }
    }

    pub fn default_preset(&self) -> &'static StylePreset {
        &PRESETS[self.default_index]
    }

    /// Looks up a preset. Missing, empty or unknown ids resolve to the default.
    pub fn resolve(&self, preset_id: Option<&str>) -> &'static StylePreset {
        let Some(id) = preset_id.map(str::trim).filter(|id| !id.is_empty()) else {
            return self.default_preset();
        };
        match self.get(id) {
            Some(preset) => preset,
            None => {
                log::debug!("Unknown style preset '{}', using default", id);
                self.default_preset()
            }
        }
    }

    pub fn get(&self, preset_id: &str) -> Option<&'static StylePreset> {
        PRESETS.iter().find(|p| p.id == preset_id)
    }

    pub fn list(&self) -> &'static [StylePreset] {
        PRESETS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_id_resolves_to_default() {
        let catalog = StyleCatalog::default();
        assert_eq!(catalog.resolve(Some("neon_noir")).id, DEFAULT_STYLE_ID);
        assert_eq!(catalog.resolve(Some("")).id, DEFAULT_STYLE_ID);
        assert_eq!(catalog.resolve(None).id, DEFAULT_STYLE_ID);
    }

    #[test]
    fn test_known_id_resolves() {
        let catalog = StyleCatalog::default();
        let preset = catalog.resolve(Some("cinematic"));
        assert_eq!(preset.color_grade, "teal and orange, high dynamic range");
    }

    #[test]
    fn test_configured_default() {
        let catalog = StyleCatalog::with_default("golden_hour");
        assert_eq!(catalog.resolve(Some("nope")).id, "golden_hour");

        let catalog = StyleCatalog::with_default("nope");
        assert_eq!(catalog.default_preset().id, DEFAULT_STYLE_ID);
    }

    #[test]
    fn test_list_is_stable_and_unique() {
        let catalog = StyleCatalog::default();
        let ids: Vec<&str> = catalog.list().iter().map(|p| p.id).collect();
        assert_eq!(ids[0], DEFAULT_STYLE_ID);
        let mut deduped = ids.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), ids.len());
    }

    #[test]
    fn test_apply_appends_suffix() {
        let preset = StyleCatalog::default().resolve(Some("minimal"));
        assert_eq!(
            preset.apply("a red chair "),
            "a red chair, minimalist, clean backgrounds, focused subject"
        );
    }
}
