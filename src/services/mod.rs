// DeepGuard Core Services
// Client-side orchestration of the detection backend

pub mod config_store;
pub mod export;
pub mod gateway;
pub mod input_model;
pub mod session;
pub mod verdict;
pub mod workflow;

pub use config_store::*;
pub use gateway::{DetectionBackend, GatewayError, GatewayErrorKind, HttpDetectionGateway};
pub use input_model::{
    AnalysisPayload,
    InputModel,
    PreviewHandle,
    PreviewRegistry,
    SelectedFile,
    ValidationError,
    MIN_TEXT_CHARS,
};
pub use session::{Session, SessionSnapshot};
pub use workflow::{ActionOutcome, Blocked, ExportLease, Workflow};

// Re-export the verdict and export pipelines
pub use export::{
    DirectorySink,
    ExportError,
    ExportedReport,
    RenderedRegion,
    ReportExporter,
    ReportSink,
    VerdictCanvas,
};
pub use verdict::{
    confidence_band,
    displayed_source,
    presentation_class,
    to_verdict,
    AggregationError,
    ConfidenceBand,
    PresentationClass,
    VerdictView,
};
