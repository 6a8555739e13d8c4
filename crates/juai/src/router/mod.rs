//! Intent routing: decides which tool should serve a free-text request and
//! rewrites the prompt for that tool.

pub mod gemini;
pub mod keywords;
pub mod model;
pub mod templates;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;

use crate::types::ToolId;

pub use gemini::GeminiModel;
pub use model::{ModelError, ModelVerdict, TextModel};

const KEYWORD_WEIGHT: f64 = 0.3;
const MODEL_WEIGHT: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    RealismAction,
    CharacterProduct,
    Informational,
    Cinematic,
    MusicAudio,
    Unknown,
}

impl IntentCategory {
    /// Also the tie-break order: earlier wins.
    pub const ALL: [IntentCategory; 6] = [
        IntentCategory::RealismAction,
        IntentCategory::CharacterProduct,
        IntentCategory::Informational,
        IntentCategory::Cinematic,
        IntentCategory::MusicAudio,
        IntentCategory::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentCategory::RealismAction => "realism_action",
            IntentCategory::CharacterProduct => "character_product",
            IntentCategory::Informational => "informational",
            IntentCategory::Cinematic => "cinematic",
            IntentCategory::MusicAudio => "music_audio",
            IntentCategory::Unknown => "unknown",
        }
    }

    /// Primary tool, optional secondary tool, and why.
    pub fn tools(&self) -> (ToolId, Option<ToolId>, &'static str) {
        match self {
            IntentCategory::RealismAction => (
                ToolId::Kling,
                None,
                "액션/리얼리즘 - Kling 고품질 text-to-video",
            ),
            IntentCategory::CharacterProduct => (
                ToolId::Kling,
                Some(ToolId::Midjourney),
                "인물/제품 일관성 - 이미지 생성 후 영상화",
            ),
            IntentCategory::Informational => {
                (ToolId::Heygen, None, "정보 전달 - 스크립트 기반 아바타")
            }
            IntentCategory::Cinematic => (ToolId::Sora, None, "시네마틱 - Sora2 영화적 표현"),
            IntentCategory::MusicAudio => (ToolId::Suno, None, "음악/BGM 생성"),
            IntentCategory::Unknown => (ToolId::Kling, None, "기본 영상 생성 - Kling"),
        }
    }
}

impl fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        IntentCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == lowered)
            .ok_or_else(|| s.to_string())
    }
}

/// Where the winning score came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreSource {
    Keywords,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingDecision {
    pub intent: IntentCategory,
    pub primary_tool: ToolId,
    pub secondary_tool: Option<ToolId>,
    pub confidence: f64,
    pub reasoning: String,
    pub prompts: BTreeMap<ToolId, String>,
    pub scores: BTreeMap<IntentCategory, f64>,
    pub detected_keywords: Vec<String>,
    pub source: ScoreSource,
}

impl RoutingDecision {
    /// Primary then secondary tool.
    pub fn candidates(&self) -> impl Iterator<Item = ToolId> + '_ {
        std::iter::once(self.primary_tool).chain(self.secondary_tool)
    }

    pub fn prompt_for(&self, tool: ToolId) -> Option<&str> {
        self.prompts.get(&tool).map(String::as_str)
    }
}

/// Keyword scoring optionally refined by a text model.
#[derive(Clone, Default)]
pub struct IntentRouter {
    model: Option<Arc<dyn TextModel>>,
}

impl IntentRouter {
    pub fn new(model: Option<Arc<dyn TextModel>>) -> Self {
        Self { model }
    }

    pub fn keyword_only() -> Self {
        Self::default()
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub async fn classify(&self, text: &str, context: Option<&str>) -> RoutingDecision {
        let keyword = keywords::score(text);
        let mut scores = keyword.scores;
        let mut source = ScoreSource::Keywords;
        let mut model_reasoning = None;

        if let Some(model) = &self.model {
            match model.classify(text, context).await {
                Ok(verdict) => {
                    blend(&mut scores, &verdict);
                    source = ScoreSource::Model;
                    model_reasoning = verdict.reasoning;
                }
                Err(e) => {
                    log::warn!(
                        "Text model '{}' unavailable, using keyword routing: {}",
                        model.name(),
                        e
                    );
                }
            }
        }

        let (intent, confidence) = winner(&scores);
        let (primary_tool, secondary_tool, table_reasoning) = intent.tools();

        let mut prompts = BTreeMap::new();
        prompts.insert(primary_tool, templates::optimized_prompt(primary_tool, text));
        if let Some(secondary) = secondary_tool {
            prompts.insert(secondary, templates::optimized_prompt(secondary, text));
        }

        let reasoning = match model_reasoning {
            Some(r) => format!("{} ({})", table_reasoning, r),
            None => table_reasoning.to_string(),
        };

        tracing::debug!(
            intent = %intent,
            tool = %primary_tool,
            confidence,
            keywords = ?keyword.keywords,
            "Request routed"
        );

        RoutingDecision {
            intent,
            primary_tool,
            secondary_tool,
            confidence,
            reasoning,
            prompts,
            scores,
            detected_keywords: keyword.keywords,
            source,
        }
    }

    /// Template-based rewrite, or a model rewrite when one is configured.
    pub async fn optimize_prompt(&self, prompt: &str, tool: ToolId) -> String {
        let fallback = || templates::plain_prompt(tool, prompt);
        let Some(model) = &self.model else {
            return fallback();
        };

        let request = format!(
            "다음 프롬프트를 {}에 최적화해주세요.\n\n[원본 프롬프트]\n{}\n\n[응답]\n최적화된 프롬프트만 출력하세요. 설명 없이 프롬프트 텍스트만.",
            tool.as_str().to_uppercase(),
            model::sanitize_for_prompt(prompt)
        );
        self.complete_or(model.as_ref(), &request, fallback).await
    }

    /// Presenter script for an avatar video about `topic`.
    pub async fn avatar_script(&self, topic: &str, style: &str) -> String {
        let fallback = || format!("안녕하세요. {}에 대해 설명드리겠습니다.", topic.trim());
        let Some(model) = &self.model else {
            return fallback();
        };

        let request = format!(
            "다음 주제에 대한 AI 아바타 발표 스크립트를 작성해주세요.\n\n[주제] {}\n[스타일] {}\n[요구사항]\n- 30초~1분 분량\n- 자연스러운 발화\n- 전문적이지만 친근한 톤\n- 명확한 정보 전달\n\n[스크립트]",
            model::sanitize_for_prompt(topic),
            model::sanitize_for_prompt(style)
        );
        self.complete_or(model.as_ref(), &request, fallback).await
    }

    /// Music-generation prompt matching a video description.
    pub async fn music_prompt(&self, description: &str, mood: &str) -> String {
        let fallback = || {
            format!(
                "Instrumental only, cinematic, 90-120 BPM, {}, high fidelity",
                mood.trim()
            )
        };
        let Some(model) = &self.model else {
            return fallback();
        };

        let wanted_mood = if mood.trim().is_empty() || mood == "auto" {
            "영상에 맞게 자동 선택".to_string()
        } else {
            model::sanitize_for_prompt(mood)
        };
        let request = format!(
            "다음 영상에 어울리는 BGM 프롬프트를 Suno AI용으로 작성해주세요.\n\n[영상 설명] {}\n[원하는 분위기] {}\n\n[응답 형식]\nInstrumental only, [장르], [BPM 범위], [분위기 키워드], high fidelity\n\n프롬프트만 출력하세요.",
            model::sanitize_for_prompt(description),
            wanted_mood
        );
        self.complete_or(model.as_ref(), &request, fallback).await
    }

    async fn complete_or(
        &self,
        model: &dyn TextModel,
        request: &str,
        fallback: impl FnOnce() -> String,
    ) -> String {
        match model.complete(request).await {
            Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
            Ok(_) => fallback(),
            Err(e) => {
                log::warn!("Text model '{}' failed, using template: {}", model.name(), e);
                fallback()
            }
        }
    }
}

/// `0.3·keyword + 0.7·confidence` for the model's intent, `0.3·keyword`
/// for the rest.
fn blend(scores: &mut BTreeMap<IntentCategory, f64>, verdict: &ModelVerdict) {
    for (intent, score) in scores.iter_mut() {
        *score *= KEYWORD_WEIGHT;
        if *intent == verdict.intent {
            *score += MODEL_WEIGHT * verdict.confidence;
        }
    }
    scores
        .entry(verdict.intent)
        .or_insert(MODEL_WEIGHT * verdict.confidence);
}

/// Highest score; ties go to the category listed first.
fn winner(scores: &BTreeMap<IntentCategory, f64>) -> (IntentCategory, f64) {
    IntentCategory::ALL
        .iter()
        .map(|c| (*c, scores.get(c).copied().unwrap_or(0.0)))
        .fold((IntentCategory::Cinematic, f64::MIN), |best, candidate| {
            if candidate.1 > best.1 {
                candidate
            } else {
                best
            }
        })
}
