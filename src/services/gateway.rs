// Detection Gateway
// Transport and schema-validation boundary to the detection backend

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{
    AnalysisMode, HealthResponse, PerturbResponse, RawImageResponse, RawResponse, RawTextResponse,
    TextRequest,
};
use crate::services::config_store::{BackendConfig, ProxyConfig};
use crate::services::input_model::SelectedFile;

const TEXT_DETECT_PATH: &str = "/api/detect/text";
const IMAGE_DETECT_PATH: &str = "/api/detect/image";
const PERTURB_PATH: &str = "/api/robustness/perturb";

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum GatewayErrorKind {
    Network,
    Schema,
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },
    #[error("Schema error: {0}")]
    Schema(String),
}

impl GatewayError {
    pub fn kind(&self) -> GatewayErrorKind {
        match self {
            Self::Transport(_) | Self::Status { .. } => GatewayErrorKind::Network,
            Self::Schema(_) => GatewayErrorKind::Schema,
        }
    }
}

/// The three backend operations the workflow depends on.
#[async_trait]
pub trait DetectionBackend: Send + Sync {
    async fn analyze_text(&self, text: &str) -> Result<RawTextResponse, GatewayError>;
    async fn analyze_image(&self, file: &SelectedFile) -> Result<RawImageResponse, GatewayError>;
    async fn perturb_text(&self, text: &str) -> Result<String, GatewayError>;

    /// Liveness probe. Backends without one report healthy.
    async fn health(&self) -> Result<(), GatewayError> {
        Ok(())
    }
}

pub struct HttpDetectionGateway {
    client: Client,
    base_url: String,
}

impl HttpDetectionGateway {
    /// Gateway for exactly `base_url`, with the default timeout and no proxy.
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        let defaults = BackendConfig::default();
        Self::build(&base_url.into(), defaults.timeout_secs, None)
    }

    /// Gateway from persisted settings. `DEEPGUARD_API_URL` takes precedence here.
    pub fn from_config(
        backend: &BackendConfig,
        proxy: Option<&ProxyConfig>,
    ) -> Result<Self, GatewayError> {
        Self::build(&backend.effective_base_url(), backend.timeout_secs, proxy)
    }

    fn build(
        base_url: &str,
        timeout_secs: u64,
        proxy: Option<&ProxyConfig>,
    ) -> Result<Self, GatewayError> {
        let mut builder = Client::builder().timeout(Duration::from_secs(timeout_secs));
        if let Some(proxy_url) = proxy.and_then(|p| p.active_url()) {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map non-2xx to a network error and hand back the raw body otherwise.
    async fn read_success(
        path: &str,
        response: Response,
        started: Instant,
    ) -> Result<Vec<u8>, GatewayError> {
        let latency_ms = started.elapsed().as_millis() as i64;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(path, status = status.as_u16(), latency_ms, "[GATEWAY] non-success response");
            return Err(GatewayError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        let bytes = response.bytes().await?;
        debug!(path, latency_ms, bytes = bytes.len(), "[GATEWAY] response received");
        Ok(bytes.to_vec())
    }
}

/// Strictly decode a 2xx body. Anything that is not the expected shape is a schema error.
pub fn parse_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, GatewayError> {
    serde_json::from_slice(bytes).map_err(|e| GatewayError::Schema(e.to_string()))
}

/// Decode a text-detection body and check the invariants serde cannot express.
pub fn parse_text_response(bytes: &[u8]) -> Result<RawTextResponse, GatewayError> {
    let parsed: RawTextResponse = parse_body(bytes)?;
    if parsed.engines.is_empty() {
        return Err(GatewayError::Schema("engines must not be empty".to_string()));
    }
    Ok(parsed)
}

/// Decode a body as the response for the given mode.
pub fn parse_raw_response(mode: AnalysisMode, bytes: &[u8]) -> Result<RawResponse, GatewayError> {
    match mode {
        AnalysisMode::Text => parse_text_response(bytes).map(RawResponse::Text),
        AnalysisMode::Image => parse_body::<RawImageResponse>(bytes).map(RawResponse::Image),
    }
}

#[async_trait]
impl DetectionBackend for HttpDetectionGateway {
    async fn analyze_text(&self, text: &str) -> Result<RawTextResponse, GatewayError> {
        let start = Instant::now();
        info!(chars = text.chars().count(), "[GATEWAY] analyze text");

        let response = self
            .client
            .post(self.url(TEXT_DETECT_PATH))
            .json(&TextRequest { text })
            .send()
            .await?;

        let body = Self::read_success(TEXT_DETECT_PATH, response, start).await?;
        parse_text_response(&body)
    }

    async fn analyze_image(&self, file: &SelectedFile) -> Result<RawImageResponse, GatewayError> {
        let start = Instant::now();
        info!(file = %file.name, bytes = file.len(), "[GATEWAY] analyze image");

        let mut part = Part::bytes(file.bytes().to_vec()).file_name(file.name.clone());
        if let Some(content_type) = file.content_type.as_deref() {
            part = part.mime_str(content_type)?;
        }
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.url(IMAGE_DETECT_PATH))
            .multipart(form)
            .send()
            .await?;

        let body = Self::read_success(IMAGE_DETECT_PATH, response, start).await?;
        parse_body(&body)
    }

    async fn perturb_text(&self, text: &str) -> Result<String, GatewayError> {
        let start = Instant::now();
        info!(chars = text.chars().count(), "[GATEWAY] perturb text");

        let response = self
            .client
            .post(self.url(PERTURB_PATH))
            .json(&TextRequest { text })
            .send()
            .await?;

        let body = Self::read_success(PERTURB_PATH, response, start).await?;
        let data: PerturbResponse = parse_body(&body)?;
        Ok(data.perturbed_text)
    }

    async fn health(&self) -> Result<(), GatewayError> {
        let start = Instant::now();
        let response = self.client.get(self.url("/")).send().await?;
        let body = Self::read_success("/", response, start).await?;
        let data: HealthResponse = parse_body(&body)?;
        info!(message = %data.message, "[GATEWAY] backend reachable");
        Ok(())
    }
}
