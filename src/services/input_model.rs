// Input Model
// Analysis mode, text/file payloads and the revocable preview handles

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::AnalysisMode;

/// Minimum character count (Unicode scalars, untrimmed) before text can be analyzed.
pub const MIN_TEXT_CHARS: usize = 10;

const PREVIEW_SCHEME: &str = "blob:deepguard/";

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum ValidationError {
    #[error("text is empty or whitespace only")]
    BlankText,
    #[error("text has {actual} characters, at least {min} required")]
    TextTooShort { min: usize, actual: usize },
    #[error("no image selected")]
    MissingFile,
    #[error("action is only available in {required} mode")]
    WrongMode { required: AnalysisMode },
}

/// A file picked by the user. Cloning shares the underlying bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFile {
    pub name: String,
    pub content_type: Option<String>,
    bytes: Arc<Vec<u8>>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type,
            bytes: Arc::new(bytes),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

type PreviewTable = HashMap<Uuid, Arc<Vec<u8>>>;

/// Issues preview URIs for selected files, like object URLs in a browser.
/// An entry lives exactly as long as its [`PreviewHandle`].
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    entries: Arc<Mutex<PreviewTable>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, PreviewTable> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn create(&self, file: &SelectedFile) -> PreviewHandle {
        let id = Uuid::new_v4();
        self.table().insert(id, Arc::clone(&file.bytes));
        debug!(%id, file = %file.name, "preview created");
        PreviewHandle {
            id,
            registry: self.clone(),
        }
    }

    /// Resolve a preview URI to the bytes it displays, if still live.
    pub fn resolve(&self, uri: &str) -> Option<Arc<Vec<u8>>> {
        let id = uri.strip_prefix(PREVIEW_SCHEME)?.parse::<Uuid>().ok()?;
        self.table().get(&id).cloned()
    }

    pub fn live_count(&self) -> usize {
        self.table().len()
    }

    fn revoke(&self, id: &Uuid) {
        if self.table().remove(id).is_some() {
            debug!(%id, "preview revoked");
        }
    }
}

/// Owner of one live preview entry. Dropping it revokes the URI.
#[derive(Debug)]
pub struct PreviewHandle {
    id: Uuid,
    registry: PreviewRegistry,
}

impl PreviewHandle {
    pub fn uri(&self) -> String {
        format!("{}{}", PREVIEW_SCHEME, self.id)
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.revoke(&self.id);
    }
}

/// Payloads for both modes. Only the payload of the active mode is considered.
#[derive(Debug)]
pub struct InputModel {
    mode: AnalysisMode,
    text: String,
    image: Option<(SelectedFile, PreviewHandle)>,
    previews: PreviewRegistry,
}

impl InputModel {
    pub fn new(previews: PreviewRegistry) -> Self {
        Self {
            mode: AnalysisMode::default(),
            text: String::new(),
            image: None,
            previews,
        }
    }

    pub fn mode(&self) -> AnalysisMode {
        self.mode
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.image.as_ref().map(|(file, _)| file)
    }

    pub fn preview_uri(&self) -> Option<String> {
        self.image.as_ref().map(|(_, preview)| preview.uri())
    }

    /// Returns true when the mode actually changed.
    pub fn set_mode(&mut self, mode: AnalysisMode) -> bool {
        let changed = self.mode != mode;
        self.mode = mode;
        changed
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Install a new file and its preview, releasing the previous pair.
    pub fn set_file(&mut self, file: SelectedFile) {
        let preview = self.previews.create(&file);
        // Replacing the tuple drops the old handle, which revokes its entry.
        self.image = Some((file, preview));
    }

    /// Check the text payload for analysis or perturbation.
    pub fn validate_text(&self) -> Result<&str, ValidationError> {
        if self.text.trim().is_empty() {
            return Err(ValidationError::BlankText);
        }
        let actual = self.text.chars().count();
        if actual < MIN_TEXT_CHARS {
            return Err(ValidationError::TextTooShort {
                min: MIN_TEXT_CHARS,
                actual,
            });
        }
        Ok(&self.text)
    }

    /// The payload an Analyze action would submit in the current mode.
    pub fn analysis_payload(&self) -> Result<AnalysisPayload, ValidationError> {
        match self.mode {
            AnalysisMode::Text => self
                .validate_text()
                .map(|text| AnalysisPayload::Text(text.to_string())),
            AnalysisMode::Image => self
                .file()
                .cloned()
                .map(AnalysisPayload::Image)
                .ok_or(ValidationError::MissingFile),
        }
    }

    /// The text a robustness test would submit.
    pub fn perturb_payload(&self) -> Result<String, ValidationError> {
        if self.mode != AnalysisMode::Text {
            return Err(ValidationError::WrongMode {
                required: AnalysisMode::Text,
            });
        }
        self.validate_text().map(str::to_string)
    }
}

/// Owned copy of the payload taken when a request starts.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisPayload {
    Text(String),
    Image(SelectedFile),
}

impl AnalysisPayload {
    pub fn mode(&self) -> AnalysisMode {
        match self {
            Self::Text(_) => AnalysisMode::Text,
            Self::Image(_) => AnalysisMode::Image,
        }
    }
}
