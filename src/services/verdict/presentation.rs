// Presentation Rules
// Display semantics derived from a verdict. Nothing here mutates the verdict.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::models::{AnalysisMode, EngineScore, HighlightSpan, Verdict, VerdictStatus};

const HIGH_CONFIDENCE_ABOVE: f64 = 0.85;
const MODERATE_CONFIDENCE_ABOVE: f64 = 0.65;
const HIGHLIGHT_AI_ABOVE: f64 = 0.7;
const ENGINE_ALERT_ABOVE: f64 = 70.0;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PresentationClass {
    /// negative/alert
    Alert,
    /// positive/clear
    Clear,
    /// neutral/uncertain
    Uncertain,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfidenceBand {
    High,
    Moderate,
    Low,
}

impl ConfidenceBand {
    pub fn label(self) -> &'static str {
        match self {
            Self::High => "High Confidence",
            Self::Moderate => "Moderate Confidence",
            Self::Low => "Low Confidence",
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Attribution {
    Ai,
    Human,
}

pub fn presentation_class(status: &VerdictStatus) -> PresentationClass {
    match status {
        VerdictStatus::AiGenerated | VerdictStatus::SyntheticImage => PresentationClass::Alert,
        VerdictStatus::HumanWritten | VerdictStatus::AuthenticImage => PresentationClass::Clear,
        VerdictStatus::Other(_) => PresentationClass::Uncertain,
    }
}

pub fn confidence_band(score: f64) -> ConfidenceBand {
    if score > HIGH_CONFIDENCE_ABOVE {
        ConfidenceBand::High
    } else if score > MODERATE_CONFIDENCE_ABOVE {
        ConfidenceBand::Moderate
    } else {
        ConfidenceBand::Low
    }
}

pub fn highlight_attribution(span: &HighlightSpan) -> Attribution {
    if span.score > HIGHLIGHT_AI_ABOVE {
        Attribution::Ai
    } else {
        Attribution::Human
    }
}

pub fn engine_attribution(engine: &EngineScore) -> Attribution {
    if engine.score > ENGINE_ALERT_ABOVE {
        Attribution::Ai
    } else {
        Attribution::Human
    }
}

/// The source attribution a renderer may show. Only AI-generated text carries one.
pub fn displayed_source(verdict: &Verdict) -> Option<&str> {
    match verdict.status {
        VerdictStatus::AiGenerated => verdict.likely_source.as_deref(),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSlice {
    pub name: &'static str,
    pub value: f64,
}

/// Two-slice split of the primary probability. The second slice is the complement.
pub fn chart_slices(verdict: &Verdict) -> [ChartSlice; 2] {
    let (primary, complement) = match verdict.mode {
        AnalysisMode::Text => ("AI", "Human"),
        AnalysisMode::Image => ("Fake", "Real"),
    };
    let value = verdict.probability_primary * 100.0;
    [
        ChartSlice { name: primary, value },
        ChartSlice { name: complement, value: 100.0 - value },
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricBar {
    pub label: &'static str,
    pub value: f64,
    /// Visual fill in percent, always within [0, 100].
    pub width: f64,
}

impl MetricBar {
    fn new(label: &'static str, value: f64, raw_width: f64) -> Self {
        let width = if raw_width.is_nan() { 0.0 } else { raw_width.clamp(0.0, 100.0) };
        Self { label, value, width }
    }
}

pub fn metric_bars(verdict: &Verdict) -> Vec<MetricBar> {
    match (verdict.perplexity(), verdict.burstiness()) {
        (Some(perplexity), Some(burstiness)) => vec![
            MetricBar::new("Predictability (Perplexity)", perplexity, perplexity),
            MetricBar::new("Irregularity (Burstiness)", burstiness, burstiness * 2.0),
        ],
        _ => {
            let percent = verdict.probability_primary * 100.0;
            vec![MetricBar::new("Synthetic Probability", percent, percent)]
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

fn dimensions_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d+)\s*[xX×]\s*(\d+)\s*$").expect("valid dimensions regex"))
}

pub fn parse_dimensions(raw: &str) -> Option<ImageDimensions> {
    let caps = dimensions_re().captures(raw)?;
    Some(ImageDimensions {
        width: caps[1].parse().ok()?,
        height: caps[2].parse().ok()?,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineView {
    pub name: String,
    pub score: f64,
    pub strength: String,
    pub leaning: Attribution,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightView {
    pub text: String,
    pub reason: String,
    pub attribution: Attribution,
}

/// Everything a renderer needs, with display rules already applied.
/// Fields that must stay hidden (e.g. a non-AI likely source) are absent here.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerdictView {
    pub mode: AnalysisMode,
    pub status: String,
    pub class: PresentationClass,
    pub confidence_score: f64,
    pub confidence_band: ConfidenceBand,
    pub likely_source: Option<String>,
    pub language_warning: Option<String>,
    pub chart: [ChartSlice; 2],
    pub metrics: Vec<MetricBar>,
    pub engines: Vec<EngineView>,
    pub highlights: Vec<HighlightView>,
    pub dimensions: Option<String>,
    pub parsed_dimensions: Option<ImageDimensions>,
    pub explanation: String,
    pub disclaimer: String,
}

impl VerdictView {
    pub fn from_verdict(verdict: &Verdict) -> Self {
        Self {
            mode: verdict.mode,
            status: verdict.status.label().to_string(),
            class: presentation_class(&verdict.status),
            confidence_score: verdict.confidence_score,
            confidence_band: confidence_band(verdict.confidence_score),
            likely_source: displayed_source(verdict).map(str::to_string),
            language_warning: verdict.language_warning.clone(),
            chart: chart_slices(verdict),
            metrics: metric_bars(verdict),
            engines: verdict
                .engines()
                .iter()
                .map(|e| EngineView {
                    name: e.name.clone(),
                    score: e.score,
                    strength: e.strength.clone(),
                    leaning: engine_attribution(e),
                })
                .collect(),
            highlights: verdict
                .highlights()
                .iter()
                .map(|h| HighlightView {
                    text: h.text.clone(),
                    reason: h.reason.clone(),
                    attribution: highlight_attribution(h),
                })
                .collect(),
            dimensions: verdict.dimensions().map(str::to_string),
            parsed_dimensions: verdict.dimensions().and_then(parse_dimensions),
            explanation: verdict.explanation.clone(),
            disclaimer: verdict.disclaimer.clone(),
        }
    }

    /// "Confidence: 88.0%"
    pub fn confidence_text(&self) -> String {
        format!("Confidence: {:.1}%", self.confidence_score * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawImageResponse, RawResponse, RawTextResponse};
    use crate::services::verdict::to_verdict;

    fn text_verdict(status: &str, probability_ai: f64, confidence: f64) -> Verdict {
        let raw = RawTextResponse {
            status: VerdictStatus::from_label(status),
            probability_ai,
            perplexity: 142.0,
            burstiness: -3.0,
            confidence_score: confidence,
            engines: vec![
                EngineScore { name: "Transformer (RoBERTa)".into(), score: 92.0, strength: "Contextual Nuance".into() },
                EngineScore { name: "Statistical (Perplexity)".into(), score: 70.0, strength: "Predictability".into() },
            ],
            highlights: vec![
                HighlightSpan { text: "First.".into(), score: 0.71, reason: "Predictable structure".into() },
                HighlightSpan { text: "Second.".into(), score: 0.7, reason: "Natural variance".into() },
            ],
            explanation: "explanation".into(),
            disclaimer: "disclaimer".into(),
            likely_source: Some("GPT-4 / Advanced Transformer".into()),
            language_warning: None,
            language: None,
        };
        to_verdict(RawResponse::Text(raw), AnalysisMode::Text).unwrap()
    }

    fn image_verdict(status: &str, probability_fake: f64) -> Verdict {
        let raw = RawImageResponse {
            status: VerdictStatus::from_label(status),
            probability_fake,
            confidence_score: 0.7,
            dimensions: "1024x768".into(),
            explanation: "explanation".into(),
            disclaimer: "disclaimer".into(),
            likely_source: Some("Diffusion".into()),
            language_warning: None,
        };
        to_verdict(RawResponse::Image(raw), AnalysisMode::Image).unwrap()
    }

    #[test]
    fn test_confidence_band_boundaries() {
        let bands: Vec<ConfidenceBand> =
            [0.90, 0.85, 0.80, 0.65, 0.60].iter().map(|s| confidence_band(*s)).collect();
        assert_eq!(
            bands,
            vec![
                ConfidenceBand::High,
                ConfidenceBand::Moderate,
                ConfidenceBand::Moderate,
                ConfidenceBand::Low,
                ConfidenceBand::Low,
            ]
        );
    }

    #[test]
    fn test_presentation_classes() {
        assert_eq!(presentation_class(&VerdictStatus::AiGenerated), PresentationClass::Alert);
        assert_eq!(presentation_class(&VerdictStatus::SyntheticImage), PresentationClass::Alert);
        assert_eq!(presentation_class(&VerdictStatus::HumanWritten), PresentationClass::Clear);
        assert_eq!(presentation_class(&VerdictStatus::AuthenticImage), PresentationClass::Clear);
        assert_eq!(
            presentation_class(&VerdictStatus::from_label("Inconclusive / AI-Assisted")),
            PresentationClass::Uncertain
        );
    }

    #[test]
    fn test_ai_generated_text_view() {
        let view = VerdictView::from_verdict(&text_verdict("Likely AI-Generated", 0.92, 0.88));
        assert_eq!(view.class, PresentationClass::Alert);
        assert_eq!(view.confidence_band, ConfidenceBand::High);
        assert_eq!(view.likely_source.as_deref(), Some("GPT-4 / Advanced Transformer"));
        assert_eq!(view.confidence_text(), "Confidence: 88.0%");
    }

    #[test]
    fn test_source_hidden_for_other_statuses() {
        for status in ["Likely Human-Written", "Inconclusive / AI-Assisted"] {
            let verdict = text_verdict(status, 0.5, 0.5);
            assert!(verdict.likely_source.is_some());
            assert_eq!(displayed_source(&verdict), None);
            assert_eq!(VerdictView::from_verdict(&verdict).likely_source, None);
        }
        let image = image_verdict("Likely Synthetic / Deepfake", 0.9);
        assert_eq!(VerdictView::from_verdict(&image).likely_source, None);
    }

    #[test]
    fn test_chart_slices_sum_to_hundred() {
        for p in [0.0, 0.1, 0.333_333_3, 0.92, 1.0, 1.2, -0.05] {
            let text = chart_slices(&text_verdict("Likely AI-Generated", p, 0.9));
            assert_eq!((text[0].name, text[1].name), ("AI", "Human"));
            assert!((text[0].value + text[1].value - 100.0).abs() < 1e-9);

            let image = chart_slices(&image_verdict("Likely Authentic Image", p));
            assert_eq!((image[0].name, image[1].name), ("Fake", "Real"));
            assert!((image[0].value + image[1].value - 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_highlight_and_engine_thresholds() {
        let view = VerdictView::from_verdict(&text_verdict("Likely Human-Written", 0.2, 0.8));
        assert_eq!(view.highlights[0].attribution, Attribution::Ai);
        assert_eq!(view.highlights[1].attribution, Attribution::Human);
        assert_eq!(view.engines[0].leaning, Attribution::Ai);
        assert_eq!(view.engines[1].leaning, Attribution::Human);
    }

    #[test]
    fn test_metric_bars_clamp_width_only() {
        let verdict = text_verdict("Likely Human-Written", 0.2, 0.8);
        let bars = metric_bars(&verdict);
        assert_eq!(bars[0].value, 142.0);
        assert_eq!(bars[0].width, 100.0);
        assert_eq!(bars[1].value, -3.0);
        assert_eq!(bars[1].width, 0.0);
        assert_eq!(verdict.perplexity(), Some(142.0));

        let image = metric_bars(&image_verdict("Likely Authentic Image", 0.25));
        assert_eq!(image.len(), 1);
        assert_eq!(image[0].width, 25.0);
    }

    #[test]
    fn test_parse_dimensions() {
        assert_eq!(parse_dimensions("1024x768"), Some(ImageDimensions { width: 1024, height: 768 }));
        assert_eq!(parse_dimensions(" 640 X 480 "), Some(ImageDimensions { width: 640, height: 480 }));
        assert_eq!(parse_dimensions("unknown"), None);

        let view = VerdictView::from_verdict(&image_verdict("Likely Authentic Image", 0.1));
        assert_eq!(view.dimensions.as_deref(), Some("1024x768"));
        assert_eq!(view.parsed_dimensions, Some(ImageDimensions { width: 1024, height: 768 }));
    }
}
