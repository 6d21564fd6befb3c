// Report Document Builder
// Wraps a captured raster into a single-page PDF and hands it to a save sink

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use super::raster::{RenderedRegion, EXPORT_SCALE, REPORT_BACKGROUND};
use super::ExportError;
use crate::models::{AnalysisMode, Verdict};
use crate::services::verdict::VerdictView;

/// A4 portrait in points.
pub const PAGE_WIDTH_PT: f32 = 595.28;
pub const PAGE_HEIGHT_PT: f32 = 841.89;
const JPEG_QUALITY: u8 = 92;

pub fn report_filename(timestamp_ms: i64) -> String {
    format!("DeepGuard_Report_{}.pdf", timestamp_ms)
}

/// Where finished reports go (a download folder, a save dialog, ...).
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, ExportError>;
}

/// Saves reports into a directory on disk.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ReportSink for DirectorySink {
    async fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, ExportError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(filename);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }
}

/// Embed the raster at full page width, keeping its aspect ratio, anchored at the top.
pub fn build_report_pdf(raster: &RgbImage) -> Result<Vec<u8>, ExportError> {
    let (px_width, px_height) = raster.dimensions();
    if px_width == 0 || px_height == 0 {
        return Err(ExportError::Raster("captured region is empty".to_string()));
    }

    let mut jpeg = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY);
        encoder.encode(raster.as_raw(), px_width, px_height, ColorType::Rgb8)?;
    }

    let draw_width = PAGE_WIDTH_PT;
    let draw_height = px_height as f32 * PAGE_WIDTH_PT / px_width as f32;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => px_width as i64,
            "Height" => px_height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        jpeg,
    ));

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    draw_width.into(),
                    0.into(),
                    0.into(),
                    draw_height.into(),
                    0.into(),
                    (PAGE_HEIGHT_PT - draw_height).into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let encoded = content
        .encode()
        .map_err(|e| ExportError::Document(e.to_string()))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH_PT.into(), PAGE_HEIGHT_PT.into()],
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| ExportError::Document(e.to_string()))?;
    Ok(bytes)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportedReport {
    pub filename: String,
    pub location: PathBuf,
    pub size_bytes: usize,
    pub mode: AnalysisMode,
    pub status: String,
}

/// Capture -> PDF -> sink, for one verdict snapshot.
pub struct ReportExporter {
    sink: Arc<dyn ReportSink>,
}

impl ReportExporter {
    pub fn new(sink: Arc<dyn ReportSink>) -> Self {
        Self { sink }
    }

    pub async fn export(
        &self,
        verdict: &Verdict,
        region: &dyn RenderedRegion,
    ) -> Result<ExportedReport, ExportError> {
        let start = Instant::now();
        let timestamp_ms = chrono::Utc::now().timestamp_millis();
        let view = VerdictView::from_verdict(verdict);

        let raster = region
            .rasterize(&view, EXPORT_SCALE, REPORT_BACKGROUND)
            .await?;
        let pdf = build_report_pdf(&raster)?;

        let filename = report_filename(timestamp_ms);
        let location = self.sink.save(&filename, &pdf).await?;

        info!(
            file = %filename,
            bytes = pdf.len(),
            raster_w = raster.width(),
            raster_h = raster.height(),
            elapsed_ms = start.elapsed().as_millis() as i64,
            "[EXPORT] report saved"
        );

        Ok(ExportedReport {
            filename,
            location,
            size_bytes: pdf.len(),
            mode: verdict.mode,
            status: view.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_report_filename_format() {
        assert_eq!(report_filename(1718000000123), "DeepGuard_Report_1718000000123.pdf");
    }

    #[test]
    fn test_pdf_has_single_page_at_page_width() {
        let raster = RgbImage::from_pixel(960, 480, Rgb([0x02, 0x06, 0x17]));
        let bytes = build_report_pdf(&raster).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);

        let has_raster = doc.objects.values().any(|obj| match obj {
            Object::Stream(stream) => {
                stream.dict.get(b"Width").and_then(|w| w.as_i64()).ok() == Some(960)
            }
            _ => false,
        });
        assert!(has_raster);
    }

    #[test]
    fn test_empty_raster_rejected() {
        let raster = RgbImage::new(0, 0);
        assert!(matches!(build_report_pdf(&raster), Err(ExportError::Raster(_))));
    }

    #[tokio::test]
    async fn test_directory_sink_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("reports"));
        let path = sink.save("DeepGuard_Report_1.pdf", b"%PDF-1.5").await.unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"%PDF-1.5");
    }
}
