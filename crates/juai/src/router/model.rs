//! External text model used to refine routing and draft scripts.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use super::IntentCategory;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Text model is not configured")]
    NotConfigured,

    #[error("Text model request failed: {0}")]
    Request(String),

    #[error("Text model timed out")]
    Timeout,

    #[error("Failed to parse text model response: {0}")]
    ResponseParse(String),
}

/// What the model thinks the request is about.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelVerdict {
    pub intent: IntentCategory,
    pub confidence: f64,
    pub reasoning: Option<String>,
}

#[async_trait]
pub trait TextModel: Send + Sync {
    fn name(&self) -> &str;

    /// Free-form completion.
    async fn complete(&self, prompt: &str) -> Result<String, ModelError>;

    /// Classifies `text` into one of the routing intents.
    async fn classify(&self, text: &str, context: Option<&str>) -> Result<ModelVerdict, ModelError> {
        let reply = self.complete(&classification_prompt(text, context)).await?;
        parse_verdict(&reply)
    }
}

pub fn classification_prompt(text: &str, context: Option<&str>) -> String {
    let context = context
        .map(|c| format!("\n[맥락]\n{}\n", sanitize_for_prompt(c)))
        .unwrap_or_default();

    format!(
        r#"당신은 영상 제작 AI Director입니다.
사용자의 요청을 분석하여 최적의 AI 툴을 결정해야 합니다.

[사용자 요청]
{text}
{context}
[사용 가능한 툴]
1. VEO: 리얼리즘, 물리 법칙, 자동차, 스포츠, 액션
2. KLING: 범용 영상, 일반적인 콘텐츠
3. SORA: 시네마틱, 영화적 배경, 드라마틱
4. MIDJOURNEY: 이미지 생성, 캐릭터 디자인
5. HEYGEN: AI 아바타, 발표자, 뉴스 리포터
6. SUNO: 음악, BGM, 효과음

[응답 형식 - JSON만 출력]
{{
  "intent": "realism_action|character_product|informational|cinematic|music_audio",
  "confidence": 0.0-1.0,
  "reasoning": "선택 이유 한 줄"
}}"#,
        text = sanitize_for_prompt(text),
        context = context,
    )
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    intent: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Parses the model's JSON reply, tolerating prose or code fences around it.
pub fn parse_verdict(reply: &str) -> Result<ModelVerdict, ModelError> {
    let json = extract_json(reply);
    let raw: RawVerdict =
        serde_json::from_str(json).map_err(|e| ModelError::ResponseParse(e.to_string()))?;

    let intent = raw
        .intent
        .parse::<IntentCategory>()
        .map_err(|_| ModelError::ResponseParse(format!("unknown intent '{}'", raw.intent)))?;

    let confidence = raw.confidence.unwrap_or(0.5);
    if !confidence.is_finite() {
        return Err(ModelError::ResponseParse("confidence is not a number".to_string()));
    }

    Ok(ModelVerdict {
        intent,
        confidence: confidence.clamp(0.0, 1.0),
        reasoning: raw.reasoning.filter(|r| !r.trim().is_empty()),
    })
}

/// Slices the first balanced `{...}` object out of `response`, honoring
/// string literals and escapes. Returns the input unchanged if there is none.
pub fn extract_json(response: &str) -> &str {
    let Some(start) = response.find('{') else {
        return response;
    };

    let mut depth = 0;
    let mut in_string = false;
    let mut escape_next = false;
    let mut end = response.len();

    for (i, c) in response[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    end = start + i + 1;
                    break;
                }
            }
            _ => {}
        }
    }

    &response[start..end]
}

/// Strips control characters and bounds the length of user text embedded
/// in a model prompt.
pub fn sanitize_for_prompt(text: &str) -> String {
    const MAX_PROMPT_INPUT: usize = 2000;
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n')
        .take(MAX_PROMPT_INPUT)
        .collect::<String>()
        .trim()
        .to_string()
}
