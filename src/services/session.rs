// Analysis Session
// Owns the input model and workflow for one interactive session and drives
// the awaited backend calls with single-flight semantics.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{AnalysisMode, RawResponse, Verdict, WorkflowState};
use crate::services::config_store::AppConfig;
use crate::services::export::{
    DirectorySink, ExportError, ExportedReport, RenderedRegion, ReportExporter,
};
use crate::services::gateway::{DetectionBackend, GatewayError, HttpDetectionGateway};
use crate::services::input_model::{AnalysisPayload, InputModel, PreviewRegistry, SelectedFile};
use crate::services::verdict::to_verdict;
use crate::services::workflow::{ActionOutcome, Blocked, Workflow};

/// Point-in-time view of the session for rendering and control enablement.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub mode: AnalysisMode,
    pub state: WorkflowState,
    pub text: String,
    pub file_name: Option<String>,
    pub preview_uri: Option<String>,
    pub verdict: Option<Arc<Verdict>>,
    pub error: Option<String>,
    pub can_analyze: bool,
    pub can_perturb: bool,
    pub can_export: bool,
}

struct SessionInner {
    input: InputModel,
    workflow: Workflow,
}

pub struct Session {
    id: Uuid,
    backend: Arc<dyn DetectionBackend>,
    exporter: ReportExporter,
    previews: PreviewRegistry,
    inner: Mutex<SessionInner>,
}

impl Session {
    pub fn new(backend: Arc<dyn DetectionBackend>, exporter: ReportExporter) -> Self {
        let previews = PreviewRegistry::new();
        let id = Uuid::new_v4();
        info!(session = %id, "[WORKFLOW] session started");
        Self {
            id,
            backend,
            exporter,
            inner: Mutex::new(SessionInner {
                input: InputModel::new(previews.clone()),
                workflow: Workflow::new(),
            }),
            previews,
        }
    }

    /// HTTP backend plus a directory sink, both taken from the persisted config.
    pub fn from_config(config: &AppConfig) -> Result<Self, GatewayError> {
        let gateway = HttpDetectionGateway::from_config(&config.backend, config.proxy.as_ref())?;
        let sink = DirectorySink::new(config.export.resolve_output_dir());
        info!(
            backend = gateway.base_url(),
            output_dir = %sink.dir().display(),
            "[WORKFLOW] session configured"
        );
        Ok(Self::new(Arc::new(gateway), ReportExporter::new(Arc::new(sink))))
    }

    /// Whether the backend answers at all.
    pub async fn health(&self) -> Result<(), GatewayError> {
        self.backend.health().await
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock().await;
        let workflow = &inner.workflow;
        let can_start = workflow.check_can_start().is_ok();
        SessionSnapshot {
            mode: inner.input.mode(),
            state: workflow.state(),
            text: inner.input.text().to_string(),
            file_name: inner.input.file().map(|f| f.name.clone()),
            preview_uri: inner.input.preview_uri(),
            verdict: workflow.verdict(),
            error: workflow.error().map(str::to_string),
            can_analyze: can_start && inner.input.analysis_payload().is_ok(),
            can_perturb: can_start && inner.input.perturb_payload().is_ok(),
            can_export: workflow.state() == WorkflowState::ResultReady
                && workflow.verdict().is_some()
                && !workflow.is_exporting(),
        }
    }

    pub async fn state(&self) -> WorkflowState {
        self.inner.lock().await.workflow.state()
    }

    pub async fn verdict(&self) -> Option<Arc<Verdict>> {
        self.inner.lock().await.workflow.verdict()
    }

    /// Switch modes from any state. Always lands in Idle without result or error.
    pub async fn set_mode(&self, mode: AnalysisMode) {
        let mut inner = self.inner.lock().await;
        let from = inner.workflow.state();
        inner.input.set_mode(mode);
        inner.workflow.reset();
        info!(session = %self.id, %mode, ?from, "[WORKFLOW] mode set");
    }

    pub async fn set_text(&self, text: impl Into<String>) {
        self.inner.lock().await.input.set_text(text);
    }

    /// Replace the selected image. The previous preview is released and any verdict dropped.
    pub async fn set_file(&self, file: SelectedFile) {
        let mut inner = self.inner.lock().await;
        inner.input.set_file(file);
        inner.workflow.invalidate_verdict();
    }

    /// Run one analysis of the current payload. A no-op while another request
    /// or an export is in flight, or when the payload is not analyzable.
    pub async fn analyze(&self) -> ActionOutcome {
        let (ticket, payload) = {
            let mut inner = self.inner.lock().await;
            if let Err(blocked) = inner.workflow.check_can_start() {
                return ActionOutcome::Ignored(blocked);
            }
            let payload = match inner.input.analysis_payload() {
                Ok(payload) => payload,
                Err(e) => return ActionOutcome::Ignored(Blocked::Invalid(e)),
            };
            match inner.workflow.begin_analyze(payload.mode()) {
                Ok(ticket) => (ticket, payload),
                Err(blocked) => return ActionOutcome::Ignored(blocked),
            }
        };

        let mode = ticket.mode();
        info!(session = %self.id, %mode, "[WORKFLOW] analyzing");
        let start = Instant::now();

        let result = self.fetch(payload).await.and_then(|raw| {
            to_verdict(raw, mode).map_err(|e| GatewayError::Schema(e.to_string()))
        });

        let mut inner = self.inner.lock().await;
        let outcome = match result {
            Ok(verdict) => {
                info!(
                    session = %self.id,
                    status = %verdict.status,
                    confidence = verdict.confidence_score,
                    elapsed_ms = start.elapsed().as_millis() as i64,
                    "[WORKFLOW] analysis complete"
                );
                inner.workflow.complete_analyze_ok(ticket, verdict)
            }
            Err(e) => {
                warn!(
                    session = %self.id,
                    kind = ?e.kind(),
                    error = %e,
                    elapsed_ms = start.elapsed().as_millis() as i64,
                    "[WORKFLOW] analysis failed"
                );
                inner.workflow.complete_analyze_err(ticket)
            }
        };
        if outcome == ActionOutcome::Ignored(Blocked::Superseded) {
            info!(session = %self.id, "[WORKFLOW] dropped stale analysis response");
        }
        outcome
    }

    async fn fetch(&self, payload: AnalysisPayload) -> Result<RawResponse, GatewayError> {
        match payload {
            AnalysisPayload::Text(text) => self.backend.analyze_text(&text).await.map(RawResponse::Text),
            AnalysisPayload::Image(file) => {
                self.backend.analyze_image(&file).await.map(RawResponse::Image)
            }
        }
    }

    /// Ask the backend for a synonym-substituted version of the text.
    /// Failures leave the text alone and are only logged.
    pub async fn perturb(&self) -> ActionOutcome {
        let (ticket, text) = {
            let mut inner = self.inner.lock().await;
            if let Err(blocked) = inner.workflow.check_can_start() {
                return ActionOutcome::Ignored(blocked);
            }
            let text = match inner.input.perturb_payload() {
                Ok(text) => text,
                Err(e) => return ActionOutcome::Ignored(Blocked::Invalid(e)),
            };
            match inner.workflow.begin_perturb() {
                Ok(ticket) => (ticket, text),
                Err(blocked) => return ActionOutcome::Ignored(blocked),
            }
        };

        info!(session = %self.id, chars = text.chars().count(), "[WORKFLOW] perturbing");
        let result = self.backend.perturb_text(&text).await;

        let mut inner = self.inner.lock().await;
        match result {
            Ok(perturbed) => {
                let outcome = inner.workflow.complete_perturb_ok(ticket);
                if outcome.is_applied() {
                    inner.input.set_text(perturbed);
                }
                outcome
            }
            Err(e) => {
                warn!(session = %self.id, error = %e, "[WORKFLOW] perturbation failed");
                inner.workflow.complete_perturb_err(ticket)
            }
        }
    }

    /// Export the rendered verdict as a PDF. Returns `Ok(None)` without writing
    /// anything when no verdict is rendered. The export lock is released when this
    /// future completes or is dropped.
    pub async fn export_report(
        &self,
        region: &dyn RenderedRegion,
    ) -> Result<Option<ExportedReport>, ExportError> {
        let (verdict, _lease) = {
            let mut inner = self.inner.lock().await;
            match inner.workflow.begin_export() {
                Some(locked) => locked,
                None => {
                    info!(session = %self.id, "[EXPORT] nothing to export");
                    return Ok(None);
                }
            }
        };

        self.exporter.export(&verdict, region).await.map(Some)
    }
}
