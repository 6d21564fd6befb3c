// Workflow State Machine
// Governs which operations may start and applies their outcomes.
// Pure state: no I/O happens here, the session drives the awaits.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::models::{AnalysisMode, Verdict, WorkflowState};
use crate::services::input_model::ValidationError;

pub const TEXT_ANALYSIS_FAILED: &str =
    "Failed to connect to detection backend. Please ensure the server is running.";
pub const IMAGE_ANALYSIS_FAILED: &str =
    "Failed to analyze image. Ensure the backend is running and the file is an image.";

/// Why an action did not start. The matching control should be disabled.
#[derive(Debug, Clone, PartialEq)]
pub enum Blocked {
    /// Another analyze/perturb request is in flight.
    Busy(WorkflowState),
    /// A report capture holds the verdict.
    Exporting,
    Invalid(ValidationError),
    /// The session was reset while the request was in flight.
    Superseded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Applied(WorkflowState),
    Ignored(Blocked),
}

impl ActionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Ticket for an in-flight request. Completion is accepted only for the matching epoch.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Ticket {
    epoch: u64,
    mode: AnalysisMode,
}

impl Ticket {
    pub fn mode(&self) -> AnalysisMode {
        self.mode
    }
}

/// What the session displayed before a perturbation started.
#[derive(Debug, Clone)]
struct Resume {
    state: WorkflowState,
    verdict: Option<Arc<Verdict>>,
    error: Option<String>,
}

/// Read lock on the verdict for one report capture. Dropping it releases the
/// lock, including when the export future is cancelled or unwinds.
#[derive(Debug)]
pub struct ExportLease {
    slot: Arc<AtomicU64>,
    id: u64,
}

impl Drop for ExportLease {
    fn drop(&mut self) {
        // A reset may already have released this lease and a newer one taken the slot.
        let _ = self
            .slot
            .compare_exchange(self.id, 0, Ordering::SeqCst, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
pub struct Workflow {
    state: WorkflowState,
    verdict: Option<Arc<Verdict>>,
    error: Option<String>,
    epoch: u64,
    /// Ticket of the request in flight, if any.
    pending: Option<Ticket>,
    /// Id of the live export lease, 0 when none.
    export_slot: Arc<AtomicU64>,
    export_seq: u64,
    resume: Option<Resume>,
}

impl Workflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn verdict(&self) -> Option<Arc<Verdict>> {
        self.verdict.clone()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_exporting(&self) -> bool {
        self.export_slot.load(Ordering::SeqCst) != 0
    }

    /// Guard shared by analyze and perturb.
    pub fn check_can_start(&self) -> Result<(), Blocked> {
        if self.state.is_in_flight() {
            return Err(Blocked::Busy(self.state));
        }
        if self.is_exporting() {
            return Err(Blocked::Exporting);
        }
        Ok(())
    }

    fn next_ticket(&mut self, mode: AnalysisMode) -> Ticket {
        self.epoch += 1;
        let ticket = Ticket {
            epoch: self.epoch,
            mode,
        };
        self.pending = Some(ticket);
        ticket
    }

    /// Idle/ResultReady/Failed -> Analyzing. Any prior result or error is discarded.
    pub fn begin_analyze(&mut self, mode: AnalysisMode) -> Result<Ticket, Blocked> {
        self.check_can_start()?;
        self.verdict = None;
        self.error = None;
        self.state = WorkflowState::Analyzing;
        Ok(self.next_ticket(mode))
    }

    /// Analyzing -> ResultReady, installing the verdict in one step.
    pub fn complete_analyze_ok(&mut self, ticket: Ticket, verdict: Verdict) -> ActionOutcome {
        if !self.accepts(ticket, WorkflowState::Analyzing) {
            return ActionOutcome::Ignored(Blocked::Superseded);
        }
        self.pending = None;
        self.verdict = Some(Arc::new(verdict));
        self.state = WorkflowState::ResultReady;
        ActionOutcome::Applied(self.state)
    }

    /// Analyzing -> Failed with the generic message for the ticket's mode.
    pub fn complete_analyze_err(&mut self, ticket: Ticket) -> ActionOutcome {
        if !self.accepts(ticket, WorkflowState::Analyzing) {
            return ActionOutcome::Ignored(Blocked::Superseded);
        }
        self.pending = None;
        self.verdict = None;
        self.error = Some(
            match ticket.mode {
                AnalysisMode::Text => TEXT_ANALYSIS_FAILED,
                AnalysisMode::Image => IMAGE_ANALYSIS_FAILED,
            }
            .to_string(),
        );
        self.state = WorkflowState::Failed;
        ActionOutcome::Applied(self.state)
    }

    /// Idle/ResultReady/Failed -> Perturbing. The displayed state is remembered.
    pub fn begin_perturb(&mut self) -> Result<Ticket, Blocked> {
        self.check_can_start()?;
        self.resume = Some(Resume {
            state: self.state,
            verdict: self.verdict.clone(),
            error: self.error.clone(),
        });
        self.state = WorkflowState::Perturbing;
        Ok(self.next_ticket(AnalysisMode::Text))
    }

    /// Perturbing -> Idle. The input changed, so the old verdict and error are stale.
    pub fn complete_perturb_ok(&mut self, ticket: Ticket) -> ActionOutcome {
        if !self.accepts(ticket, WorkflowState::Perturbing) {
            return ActionOutcome::Ignored(Blocked::Superseded);
        }
        self.pending = None;
        self.resume = None;
        self.verdict = None;
        self.error = None;
        self.state = WorkflowState::Idle;
        ActionOutcome::Applied(self.state)
    }

    /// Perturbing -> whatever was displayed before. Failures are not surfaced.
    pub fn complete_perturb_err(&mut self, ticket: Ticket) -> ActionOutcome {
        if !self.accepts(ticket, WorkflowState::Perturbing) {
            return ActionOutcome::Ignored(Blocked::Superseded);
        }
        self.pending = None;
        match self.resume.take() {
            Some(resume) => {
                self.state = resume.state;
                self.verdict = resume.verdict;
                self.error = resume.error;
            }
            None => self.state = WorkflowState::Idle,
        }
        ActionOutcome::Applied(self.state)
    }

    /// Forced transition to Idle (mode switch). In-flight tickets become stale
    /// and any export lease is released.
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.pending = None;
        self.export_slot.store(0, Ordering::SeqCst);
        self.resume = None;
        self.verdict = None;
        self.error = None;
        self.state = WorkflowState::Idle;
    }

    /// Drop the verdict because the input it describes was replaced.
    /// An image analysis still in flight describes the old file and is superseded.
    pub fn invalidate_verdict(&mut self) {
        let analyzing_image = self.state == WorkflowState::Analyzing
            && self.pending.map(|t| t.mode) == Some(AnalysisMode::Image);
        if analyzing_image {
            self.epoch += 1;
            self.pending = None;
            self.state = WorkflowState::Idle;
        }
        self.verdict = None;
        if self.state == WorkflowState::ResultReady {
            self.state = WorkflowState::Idle;
        }
        if let Some(resume) = self.resume.as_mut() {
            resume.verdict = None;
            if resume.state == WorkflowState::ResultReady {
                resume.state = WorkflowState::Idle;
            }
        }
    }

    /// Take the read lock for a report capture. Requires a rendered verdict.
    /// The lock is held until the returned lease is dropped.
    pub fn begin_export(&mut self) -> Option<(Arc<Verdict>, ExportLease)> {
        if self.state != WorkflowState::ResultReady || self.is_exporting() {
            return None;
        }
        let verdict = self.verdict.clone()?;
        self.export_seq += 1;
        self.export_slot.store(self.export_seq, Ordering::SeqCst);
        let lease = ExportLease {
            slot: Arc::clone(&self.export_slot),
            id: self.export_seq,
        };
        Some((verdict, lease))
    }

    fn accepts(&self, ticket: Ticket, expected: WorkflowState) -> bool {
        ticket.epoch == self.epoch && self.state == expected
    }
}
