//! Multi-asset production requests: a concept turned into a thumbnail and a
//! short clip, plus a rough turnaround estimate.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::style::StylePreset;
use crate::studio::JobTicket;
use crate::types::{AspectRatio, GenerationRequest, ToolId};

const BASE_SECS: u64 = 60;
const LONG_CLIP_SECS: u32 = 30;
const LONG_CLIP_SURCHARGE_SECS: u64 = 60;
const PER_REFERENCE_SECS: u64 = 30;
const CINEMATIC_SURCHARGE_SECS: u64 = 60;

/// Kling clips are capped at this length.
pub const MAX_CLIP_SECS: u32 = 10;
pub const THUMBNAIL_TOOL: ToolId = ToolId::Midjourney;
pub const CLIP_TOOL: ToolId = ToolId::Kling;

fn default_duration() -> u32 {
    30
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionRequest {
    pub concept: String,
    #[serde(default)]
    pub style_preset: Option<String>,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    /// Length of the finished piece, not of the generated clip.
    #[serde(default = "default_duration")]
    pub duration_secs: u32,
    #[serde(default)]
    pub reference_urls: Vec<String>,
}

impl ProductionRequest {
    pub fn new(concept: impl Into<String>) -> Self {
        Self {
            concept: concept.into(),
            style_preset: None,
            aspect_ratio: AspectRatio::default(),
            duration_secs: default_duration(),
            reference_urls: Vec::new(),
        }
    }

    pub fn with_style(mut self, preset_id: impl Into<String>) -> Self {
        self.style_preset = Some(preset_id.into());
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_duration(mut self, secs: u32) -> Self {
        self.duration_secs = secs;
        self
    }

    pub fn with_references(mut self, urls: Vec<String>) -> Self {
        self.reference_urls = urls;
        self
    }

    fn reference_count(&self) -> usize {
        self.reference_urls
            .iter()
            .filter(|url| !url.trim().is_empty())
            .count()
    }

    pub(crate) fn thumbnail_request(&self) -> GenerationRequest {
        let prompt = format!("thumbnail, eye-catching, {}", self.concept.trim());
        let mut request = GenerationRequest::image(prompt)
            .with_tool(THUMBNAIL_TOOL)
            .with_aspect_ratio(self.aspect_ratio);
        request.style_preset = self.style_preset.clone();
        request
    }

    pub(crate) fn clip_request(&self) -> GenerationRequest {
        let mut request = GenerationRequest::video(self.concept.trim())
            .with_tool(CLIP_TOOL)
            .with_aspect_ratio(self.aspect_ratio)
            .with_duration(self.duration_secs.clamp(1, MAX_CLIP_SECS));
        request.style_preset = self.style_preset.clone();
        request
    }
}

/// Expected turnaround, broken down by what adds to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionEstimate {
    pub total_secs: u64,
    pub base_secs: u64,
    pub duration_secs: u64,
    pub reference_secs: u64,
    pub style_secs: u64,
}

pub fn estimate(request: &ProductionRequest, style: &StylePreset) -> ProductionEstimate {
    let duration_secs = if request.duration_secs > LONG_CLIP_SECS {
        LONG_CLIP_SURCHARGE_SECS
    } else {
        0
    };
    let reference_secs = PER_REFERENCE_SECS * request.reference_count() as u64;
    let style_secs = if style.id.starts_with("cinematic") {
        CINEMATIC_SURCHARGE_SECS
    } else {
        0
    };

    ProductionEstimate {
        total_secs: BASE_SECS + duration_secs + reference_secs + style_secs,
        base_secs: BASE_SECS,
        duration_secs,
        reference_secs,
        style_secs,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Thumbnail,
    Clip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    /// Every asset was accepted.
    Accepted,
    /// Some assets were accepted.
    Partial,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetTicket {
    pub kind: AssetKind,
    #[serde(flatten)]
    pub ticket: JobTicket,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetError {
    pub kind: AssetKind,
    #[serde(flatten)]
    pub error: ApiError,
}

/// Outcome of submitting every asset of a production. Failed submissions
/// are reported next to the accepted ones instead of failing the batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionBatch {
    pub status: BatchStatus,
    pub assets: Vec<AssetTicket>,
    pub errors: Vec<AssetError>,
    pub estimate: ProductionEstimate,
}

impl ProductionBatch {
    pub(crate) fn new(
        assets: Vec<AssetTicket>,
        errors: Vec<AssetError>,
        estimate: ProductionEstimate,
    ) -> Self {
        let status = match (assets.is_empty(), errors.is_empty()) {
            (true, _) => BatchStatus::Failed,
            (false, true) => BatchStatus::Accepted,
            (false, false) => BatchStatus::Partial,
        };
        Self {
            status,
            assets,
            errors,
            estimate,
        }
    }

    pub fn asset(&self, kind: AssetKind) -> Option<&JobTicket> {
        self.assets
            .iter()
            .find(|asset| asset.kind == kind)
            .map(|asset| &asset.ticket)
    }
}
