// Export Module
// Report snapshot pipeline:
// - raster: captures the rendered verdict region (2x, dark background)
// - report: single-page PDF assembly and the save sink

pub mod raster;
pub mod report;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Rasterization failed: {0}")]
    Raster(String),
    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("PDF assembly failed: {0}")]
    Document(String),
    #[error("Saving report failed: {0}")]
    Io(#[from] std::io::Error),
}

pub use raster::{RenderedRegion, VerdictCanvas, EXPORT_SCALE, REPORT_BACKGROUND};
pub use report::{
    build_report_pdf,
    report_filename,
    DirectorySink,
    ExportedReport,
    ReportExporter,
    ReportSink,
};
