// Aggregation Logic
// Turns a validated backend response into an immutable verdict

use thiserror::Error;

use crate::models::{AnalysisMode, RawResponse, Verdict, VerdictDetail};

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum AggregationError {
    #[error("received a {received} response while the session is in {expected} mode")]
    ModeMismatch {
        expected: AnalysisMode,
        received: AnalysisMode,
    },
}

/// Empty strings from the backend mean "not present".
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Build the verdict for `mode` from a raw response.
/// Status is taken as reported and numbers pass through untouched.
pub fn to_verdict(raw: RawResponse, mode: AnalysisMode) -> Result<Verdict, AggregationError> {
    if raw.mode() != mode {
        return Err(AggregationError::ModeMismatch {
            expected: mode,
            received: raw.mode(),
        });
    }

    let verdict = match raw {
        RawResponse::Text(r) => Verdict {
            mode,
            status: r.status,
            confidence_score: r.confidence_score,
            probability_primary: r.probability_ai,
            likely_source: non_empty(r.likely_source),
            language_warning: non_empty(r.language_warning),
            explanation: r.explanation,
            disclaimer: r.disclaimer,
            detail: VerdictDetail::Text {
                perplexity: r.perplexity,
                burstiness: r.burstiness,
                engines: r.engines,
                highlights: r.highlights,
                language: non_empty(r.language),
            },
        },
        RawResponse::Image(r) => Verdict {
            mode,
            status: r.status,
            confidence_score: r.confidence_score,
            probability_primary: r.probability_fake,
            likely_source: non_empty(r.likely_source),
            language_warning: non_empty(r.language_warning),
            explanation: r.explanation,
            disclaimer: r.disclaimer,
            detail: VerdictDetail::Image {
                dimensions: r.dimensions,
            },
        },
    };

    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        EngineScore, HighlightSpan, RawImageResponse, RawTextResponse, VerdictStatus,
    };

    fn text_response(status: &str, probability_ai: f64, confidence: f64) -> RawTextResponse {
        RawTextResponse {
            status: VerdictStatus::from_label(status),
            probability_ai,
            perplexity: 18.4,
            burstiness: 7.2,
            confidence_score: confidence,
            engines: vec![EngineScore {
                name: "Transformer (RoBERTa)".to_string(),
                score: probability_ai * 100.0,
                strength: "Contextual Nuance".to_string(),
            }],
            highlights: vec![HighlightSpan {
                text: "The results demonstrate a clear trend.".to_string(),
                score: 0.81,
                reason: "Predictable structure".to_string(),
            }],
            explanation: "flagged".to_string(),
            disclaimer: "decision-support only".to_string(),
            likely_source: Some("Legacy GPT-3.5 Style".to_string()),
            language_warning: Some(String::new()),
            language: Some("en".to_string()),
        }
    }

    #[test]
    fn test_text_fields_pass_through() {
        let verdict = to_verdict(
            RawResponse::Text(text_response("Likely AI-Generated", 1.07, 0.88)),
            AnalysisMode::Text,
        )
        .unwrap();

        // No clamping of probabilities
        assert_eq!(verdict.probability_primary, 1.07);
        assert_eq!(verdict.perplexity(), Some(18.4));
        assert_eq!(verdict.burstiness(), Some(7.2));
        assert_eq!(verdict.engines().len(), 1);
        assert_eq!(verdict.highlights().len(), 1);
        assert_eq!(verdict.dimensions(), None);
        assert_eq!(verdict.likely_source.as_deref(), Some("Legacy GPT-3.5 Style"));
        assert_eq!(verdict.language_warning, None);
    }

    #[test]
    fn test_image_fields_pass_through() {
        let raw = RawImageResponse {
            status: VerdictStatus::SyntheticImage,
            probability_fake: 0.77,
            confidence_score: 0.77,
            dimensions: "1024x768".to_string(),
            explanation: "GAN-style fingerprints".to_string(),
            disclaimer: "decision-support only".to_string(),
            likely_source: None,
            language_warning: None,
        };
        let verdict = to_verdict(RawResponse::Image(raw), AnalysisMode::Image).unwrap();
        assert_eq!(verdict.mode, AnalysisMode::Image);
        assert_eq!(verdict.probability_primary, 0.77);
        assert_eq!(verdict.dimensions(), Some("1024x768"));
        assert!(verdict.engines().is_empty());
        assert!(verdict.perplexity().is_none());
    }

    #[test]
    fn test_mode_mismatch_rejected() {
        let err = to_verdict(
            RawResponse::Text(text_response("Likely Human-Written", 0.1, 0.9)),
            AnalysisMode::Image,
        )
        .unwrap_err();
        assert_eq!(
            err,
            AggregationError::ModeMismatch {
                expected: AnalysisMode::Image,
                received: AnalysisMode::Text,
            }
        );
    }
}
