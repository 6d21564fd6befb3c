// Result Region Rasterizer
// Paints the rendered verdict region into an RGB raster

use async_trait::async_trait;
use image::{Rgb, RgbImage};

use super::ExportError;
use crate::services::verdict::{Attribution, ConfidenceBand, PresentationClass, VerdictView};

/// Dark page background behind the captured region (#020617).
pub const REPORT_BACKGROUND: Rgb<u8> = Rgb([0x02, 0x06, 0x17]);
/// Fixed capture upscale.
pub const EXPORT_SCALE: u32 = 2;

const DANGER: Rgb<u8> = Rgb([0xf4, 0x3f, 0x5e]);
const ACCENT: Rgb<u8> = Rgb([0x2d, 0xd4, 0xbf]);
const WARNING: Rgb<u8> = Rgb([0xfb, 0xbf, 0x24]);
const LANGUAGE_WARNING: Rgb<u8> = Rgb([0xf5, 0x9e, 0x0b]);
const PRIMARY: Rgb<u8> = Rgb([0xa8, 0x55, 0xf7]);
const BURSTINESS: Rgb<u8> = Rgb([0xc0, 0x84, 0xfc]);
const TRACK: Rgb<u8> = Rgb([0x1e, 0x29, 0x3b]);

/// The on-screen region that shows the current verdict.
#[async_trait]
pub trait RenderedRegion: Send + Sync {
    async fn rasterize(
        &self,
        view: &VerdictView,
        scale: u32,
        background: Rgb<u8>,
    ) -> Result<RgbImage, ExportError>;
}

/// Headless renderer for the result card. Layout is in logical pixels,
/// multiplied by the capture scale.
#[derive(Debug, Clone)]
pub struct VerdictCanvas {
    pub width: u32,
    pub padding: u32,
    pub gap: u32,
}

impl Default for VerdictCanvas {
    fn default() -> Self {
        Self {
            width: 480,
            padding: 16,
            gap: 12,
        }
    }
}

fn class_color(class: PresentationClass) -> Rgb<u8> {
    match class {
        PresentationClass::Alert => DANGER,
        PresentationClass::Clear => ACCENT,
        PresentationClass::Uncertain => WARNING,
    }
}

fn band_color(band: ConfidenceBand) -> Rgb<u8> {
    match band {
        ConfidenceBand::High => ACCENT,
        ConfidenceBand::Moderate => WARNING,
        ConfidenceBand::Low => DANGER,
    }
}

fn attribution_color(attribution: Attribution) -> Rgb<u8> {
    match attribution {
        Attribution::Ai => DANGER,
        Attribution::Human => ACCENT,
    }
}

/// Fraction of `total` for a percentage, clamped to the track.
fn fill(total: u32, percent: f64) -> u32 {
    if !percent.is_finite() {
        return 0;
    }
    ((total as f64) * percent.clamp(0.0, 100.0) / 100.0).round() as u32
}

/// A horizontal row to paint: height plus colored segments as (width, color).
struct Row {
    height: u32,
    segments: Vec<(u32, Rgb<u8>)>,
}

impl VerdictCanvas {
    fn inner_width(&self) -> u32 {
        self.width.saturating_sub(2 * self.padding)
    }

    fn bar(&self, height: u32, percent: f64, color: Rgb<u8>) -> Row {
        let width = self.inner_width();
        let filled = fill(width, percent);
        Row {
            height,
            segments: vec![(filled, color), (width - filled, TRACK)],
        }
    }

    fn layout(&self, view: &VerdictView) -> Vec<Row> {
        let width = self.inner_width();
        let mut rows = vec![Row {
            height: 24,
            segments: vec![(width, class_color(view.class))],
        }];

        if view.likely_source.is_some() {
            rows.push(Row { height: 6, segments: vec![(width, PRIMARY)] });
        }
        if view.language_warning.is_some() {
            rows.push(Row { height: 6, segments: vec![(width, LANGUAGE_WARNING)] });
        }

        rows.push(self.bar(10, view.confidence_score * 100.0, band_color(view.confidence_band)));

        let primary = fill(width, view.chart[0].value);
        rows.push(Row {
            height: 20,
            segments: vec![(primary, DANGER), (width - primary, ACCENT)],
        });

        for (i, metric) in view.metrics.iter().enumerate() {
            let color = if i == 0 { PRIMARY } else { BURSTINESS };
            rows.push(self.bar(8, metric.width, color));
        }

        for engine in &view.engines {
            rows.push(self.bar(12, engine.score, attribution_color(engine.leaning)));
        }

        if !view.highlights.is_empty() {
            let total_chars: usize = view
                .highlights
                .iter()
                .map(|h| h.text.chars().count().max(1))
                .sum();
            let mut used = 0;
            let mut segments = Vec::with_capacity(view.highlights.len());
            for (i, h) in view.highlights.iter().enumerate() {
                let span = if i + 1 == view.highlights.len() {
                    width - used
                } else {
                    let chars = h.text.chars().count().max(1);
                    ((width as usize * chars) / total_chars) as u32
                };
                used += span;
                segments.push((span, attribution_color(h.attribution)));
            }
            rows.push(Row { height: 12, segments });
        }

        rows
    }

    /// Paint synchronously. Output size is `width * scale` by content height `* scale`.
    pub fn paint(&self, view: &VerdictView, scale: u32, background: Rgb<u8>) -> RgbImage {
        let scale = scale.max(1);
        let rows = self.layout(view);
        let content: u32 = rows.iter().map(|r| r.height).sum::<u32>()
            + self.gap * rows.len().saturating_sub(1) as u32;
        let height = content + 2 * self.padding;

        let mut img = RgbImage::from_pixel(self.width * scale, height * scale, background);
        let mut y = self.padding;
        for row in &rows {
            let mut x = self.padding;
            for &(w, color) in &row.segments {
                fill_rect(&mut img, x * scale, y * scale, w * scale, row.height * scale, color);
                x += w;
            }
            y += row.height + self.gap;
        }
        img
    }
}

fn fill_rect(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    let x_end = (x + w).min(img.width());
    let y_end = (y + h).min(img.height());
    for py in y..y_end {
        for px in x..x_end {
            img.put_pixel(px, py, color);
        }
    }
}

#[async_trait]
impl RenderedRegion for VerdictCanvas {
    async fn rasterize(
        &self,
        view: &VerdictView,
        scale: u32,
        background: Rgb<u8>,
    ) -> Result<RgbImage, ExportError> {
        let canvas = self.clone();
        let view = view.clone();
        tokio::task::spawn_blocking(move || canvas.paint(&view, scale, background))
            .await
            .map_err(|e| ExportError::Raster(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AnalysisMode, EngineScore, HighlightSpan, Verdict, VerdictDetail, VerdictStatus,
    };

    fn view(status: VerdictStatus, source: Option<&str>) -> VerdictView {
        let verdict = Verdict {
            mode: AnalysisMode::Text,
            status,
            confidence_score: 0.88,
            probability_primary: 0.92,
            likely_source: source.map(str::to_string),
            language_warning: None,
            explanation: String::new(),
            disclaimer: String::new(),
            detail: VerdictDetail::Text {
                perplexity: 21.0,
                burstiness: 6.0,
                engines: vec![EngineScore {
                    name: "Transformer (RoBERTa)".into(),
                    score: 92.0,
                    strength: "Contextual Nuance".into(),
                }],
                highlights: vec![
                    HighlightSpan { text: "First sentence.".into(), score: 0.9, reason: String::new() },
                    HighlightSpan { text: "Second.".into(), score: 0.2, reason: String::new() },
                ],
                language: None,
            },
        };
        VerdictView::from_verdict(&verdict)
    }

    #[test]
    fn test_paint_uses_scale_and_background() {
        let canvas = VerdictCanvas::default();
        let img = canvas.paint(&view(VerdictStatus::AiGenerated, None), EXPORT_SCALE, REPORT_BACKGROUND);
        assert_eq!(img.width(), 960);
        assert_eq!(*img.get_pixel(0, 0), REPORT_BACKGROUND);
        // Status band starts right after the padding.
        assert_eq!(*img.get_pixel(32, 32), DANGER);
    }

    #[test]
    fn test_hidden_source_adds_no_row() {
        let canvas = VerdictCanvas::default();
        let shown = canvas.paint(&view(VerdictStatus::AiGenerated, Some("GPT-4")), 1, REPORT_BACKGROUND);
        let hidden = canvas.paint(&view(VerdictStatus::HumanWritten, Some("GPT-4")), 1, REPORT_BACKGROUND);
        assert_eq!(shown.height(), hidden.height() + 6 + 12);
    }

    #[tokio::test]
    async fn test_rasterize_matches_paint() {
        let canvas = VerdictCanvas::default();
        let v = view(VerdictStatus::AiGenerated, None);
        let async_img = canvas.rasterize(&v, EXPORT_SCALE, REPORT_BACKGROUND).await.unwrap();
        let sync_img = canvas.paint(&v, EXPORT_SCALE, REPORT_BACKGROUND);
        assert_eq!(async_img.dimensions(), sync_img.dimensions());
    }
}
