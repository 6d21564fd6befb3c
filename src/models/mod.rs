// DeepGuard Data Models
// Wire schemas of the detection backend plus the aggregated verdict

use serde::{Deserialize, Serialize};
use std::fmt;

// ============ Analysis Mode ============

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    #[default]
    Text,
    Image,
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Image => write!(f, "image"),
        }
    }
}

// ============ Detection Status ============

pub const STATUS_AI_GENERATED: &str = "Likely AI-Generated";
pub const STATUS_HUMAN_WRITTEN: &str = "Likely Human-Written";
pub const STATUS_SYNTHETIC_IMAGE: &str = "Likely Synthetic / Deepfake";
pub const STATUS_AUTHENTIC_IMAGE: &str = "Likely Authentic Image";

/// Status label reported by the backend. Unknown labels are kept verbatim.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum VerdictStatus {
    AiGenerated,
    HumanWritten,
    SyntheticImage,
    AuthenticImage,
    Other(String),
}

impl VerdictStatus {
    pub fn from_label(label: &str) -> Self {
        match label {
            STATUS_AI_GENERATED => Self::AiGenerated,
            STATUS_HUMAN_WRITTEN => Self::HumanWritten,
            STATUS_SYNTHETIC_IMAGE => Self::SyntheticImage,
            STATUS_AUTHENTIC_IMAGE => Self::AuthenticImage,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::AiGenerated => STATUS_AI_GENERATED,
            Self::HumanWritten => STATUS_HUMAN_WRITTEN,
            Self::SyntheticImage => STATUS_SYNTHETIC_IMAGE,
            Self::AuthenticImage => STATUS_AUTHENTIC_IMAGE,
            Self::Other(label) => label,
        }
    }
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for VerdictStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for VerdictStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Self::from_label(&label))
    }
}

// ============ Engine & Highlight Types ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineScore {
    pub name: String,
    /// Percentage in [0, 100].
    pub score: f64,
    pub strength: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightSpan {
    pub text: String,
    /// Probability in [0, 1] that the span is machine-written.
    pub score: f64,
    pub reason: String,
}

// ============ Backend Requests ============

#[derive(Debug, Clone, Serialize)]
pub struct TextRequest<'a> {
    pub text: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PerturbResponse {
    pub perturbed_text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub message: String,
}

// ============ Backend Responses ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTextResponse {
    pub status: VerdictStatus,
    pub probability_ai: f64,
    pub perplexity: f64,
    pub burstiness: f64,
    pub confidence_score: f64,
    pub engines: Vec<EngineScore>,
    pub highlights: Vec<HighlightSpan>,
    pub explanation: String,
    pub disclaimer: String,
    #[serde(default)]
    pub likely_source: Option<String>,
    #[serde(default)]
    pub language_warning: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawImageResponse {
    pub status: VerdictStatus,
    pub probability_fake: f64,
    pub confidence_score: f64,
    pub dimensions: String,
    pub explanation: String,
    pub disclaimer: String,
    #[serde(default)]
    pub likely_source: Option<String>,
    #[serde(default)]
    pub language_warning: Option<String>,
}

/// A schema-validated backend response.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResponse {
    Text(RawTextResponse),
    Image(RawImageResponse),
}

impl RawResponse {
    pub fn mode(&self) -> AnalysisMode {
        match self {
            Self::Text(_) => AnalysisMode::Text,
            Self::Image(_) => AnalysisMode::Image,
        }
    }
}

// ============ Verdict ============

/// Mode-specific part of a verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum VerdictDetail {
    #[serde(rename_all = "camelCase")]
    Text {
        perplexity: f64,
        burstiness: f64,
        engines: Vec<EngineScore>,
        highlights: Vec<HighlightSpan>,
        language: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Image { dimensions: String },
}

/// The aggregated result of one analysis. Never mutated after construction;
/// sessions share it behind an `Arc` and replace it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub mode: AnalysisMode,
    pub status: VerdictStatus,
    pub confidence_score: f64,
    /// probability_ai for text, probability_fake for images.
    pub probability_primary: f64,
    /// Retained as received. Rendering goes through `displayed_source`.
    pub likely_source: Option<String>,
    pub language_warning: Option<String>,
    pub explanation: String,
    pub disclaimer: String,
    pub detail: VerdictDetail,
}

impl Verdict {
    pub fn perplexity(&self) -> Option<f64> {
        match &self.detail {
            VerdictDetail::Text { perplexity, .. } => Some(*perplexity),
            VerdictDetail::Image { .. } => None,
        }
    }

    pub fn burstiness(&self) -> Option<f64> {
        match &self.detail {
            VerdictDetail::Text { burstiness, .. } => Some(*burstiness),
            VerdictDetail::Image { .. } => None,
        }
    }

    pub fn engines(&self) -> &[EngineScore] {
        match &self.detail {
            VerdictDetail::Text { engines, .. } => engines,
            VerdictDetail::Image { .. } => &[],
        }
    }

    pub fn highlights(&self) -> &[HighlightSpan] {
        match &self.detail {
            VerdictDetail::Text { highlights, .. } => highlights,
            VerdictDetail::Image { .. } => &[],
        }
    }

    pub fn dimensions(&self) -> Option<&str> {
        match &self.detail {
            VerdictDetail::Image { dimensions } => Some(dimensions),
            VerdictDetail::Text { .. } => None,
        }
    }
}

// ============ Workflow State ============

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Default)]
pub enum WorkflowState {
    #[default]
    Idle,
    Analyzing,
    Perturbing,
    ResultReady,
    Failed,
}

impl WorkflowState {
    /// True while a backend request is outstanding.
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Analyzing | Self::Perturbing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels_roundtrip() {
        for label in [
            STATUS_AI_GENERATED,
            STATUS_HUMAN_WRITTEN,
            STATUS_SYNTHETIC_IMAGE,
            STATUS_AUTHENTIC_IMAGE,
            "Inconclusive / AI-Assisted",
        ] {
            assert_eq!(VerdictStatus::from_label(label).label(), label);
        }
        assert_eq!(
            VerdictStatus::from_label("Inconclusive / AI-Assisted"),
            VerdictStatus::Other("Inconclusive / AI-Assisted".to_string())
        );
    }

    #[test]
    fn test_text_response_optional_fields() {
        let json = serde_json::json!({
            "status": "Likely Human-Written",
            "probability_ai": 0.12,
            "perplexity": 71.4,
            "burstiness": 30.2,
            "confidence_score": 0.88,
            "engines": [{"name": "Transformer (RoBERTa)", "score": 12.0, "strength": "Contextual Nuance"}],
            "highlights": [],
            "explanation": "varied",
            "disclaimer": "decision-support only"
        });
        let parsed: RawTextResponse = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.status, VerdictStatus::HumanWritten);
        assert!(parsed.likely_source.is_none());
        assert!(parsed.language.is_none());
    }

    #[test]
    fn test_mode_serialization() {
        assert_eq!(serde_json::to_string(&AnalysisMode::Image).unwrap(), "\"image\"");
        assert!(WorkflowState::Perturbing.is_in_flight());
        assert!(!WorkflowState::Failed.is_in_flight());
    }
}
