//! # OCR Collaborator Interface
//!
//! The OCR engine is an external black-box text-extraction service:
//! it receives an image and returns raw text with a confidence figure.
//! This module defines the [`TextExtractor`] seam the analysis pipeline
//! depends on, plus [`OcrClient`], an HTTP implementation with an explicit
//! initialize/ready lifecycle instead of a module-level singleton.
//!
//! Empty extracted text is not an error at this layer; the analysis caller
//! fails fast on it so "retake the photo" stays distinguishable from
//! "service is down".

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::OcrServiceConfig;
use crate::errors::{AppError, AppResult};

/// What the OCR collaborator returns for one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrOutcome {
    pub text: String,
    /// Recognition confidence, clamped to 0..=100
    pub confidence: f32,
    pub word_count: usize,
}

impl OcrOutcome {
    /// Coerce an upstream payload into the documented shape once, at the
    /// boundary: clamp confidence and recompute the word count from the
    /// text rather than trusting the service.
    pub fn coerced(text: String, confidence: f32) -> Self {
        let word_count = text.split_whitespace().count();
        Self {
            text,
            confidence: confidence.clamp(0.0, 100.0),
            word_count,
        }
    }
}

/// Seam for the external OCR service, stubbed in tests
#[allow(async_fn_in_trait)]
pub trait TextExtractor: Send + Sync {
    /// Extract raw text from the image at `path`
    async fn extract_text(&self, path: &Path) -> AppResult<OcrOutcome>;
    /// True once the collaborator is initialized and reachable
    fn is_ready(&self) -> bool;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtractResponse {
    #[serde(default)]
    text: String,
    #[serde(default)]
    confidence: f32,
}

/// HTTP client for the OCR service
pub struct OcrClient {
    http: reqwest::Client,
    config: OcrServiceConfig,
    initialized: AtomicBool,
}

impl OcrClient {
    /// Build the client; call [`OcrClient::initialize`] before first use
    pub fn new(config: OcrServiceConfig) -> AppResult<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("failed to build OCR HTTP client: {}", e)))?;
        Ok(Self {
            http,
            config,
            initialized: AtomicBool::new(false),
        })
    }

    /// Probe the service's health endpoint and mark the client ready
    pub async fn initialize(&self) -> AppResult<()> {
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }
        let health_url = format!("{}/health", self.config.base_url.trim_end_matches('/'));
        let response = self.http.get(&health_url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "OCR service health check failed with status {}",
                response.status()
            )));
        }
        self.initialized.store(true, Ordering::Release);
        info!(base_url = %self.config.base_url, "OCR client initialized");
        Ok(())
    }

    /// Explicit shutdown; the client cannot be used afterwards
    pub fn shutdown(&self) {
        self.initialized.store(false, Ordering::Release);
        info!("OCR client shut down");
    }

    async fn post_image(&self, image_bytes: Vec<u8>) -> AppResult<OcrOutcome> {
        let extract_url = format!("{}/extract", self.config.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&extract_url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image_bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "OCR service returned status {}",
                status
            )));
        }

        let payload: ExtractResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("malformed OCR response: {}", e)))?;
        Ok(OcrOutcome::coerced(payload.text, payload.confidence))
    }
}

impl TextExtractor for OcrClient {
    async fn extract_text(&self, path: &Path) -> AppResult<OcrOutcome> {
        let image_bytes = tokio::fs::read(path).await.map_err(|e| {
            AppError::Validation(format!(
                "image could not be read at '{}': {}",
                path.display(),
                e
            ))
        })?;
        if image_bytes.is_empty() {
            return Err(AppError::Validation(format!(
                "image file is empty: '{}'",
                path.display()
            )));
        }

        debug!(path = %path.display(), bytes = image_bytes.len(), "Sending image to OCR service");

        match self.post_image(image_bytes.clone()).await {
            Ok(outcome) => Ok(outcome),
            // At most one retry, with jitter to avoid thundering-herd on a
            // recovering service.
            Err(err) if self.config.retry_once => {
                let jitter_ms = rand::rng().random_range(100..500);
                warn!(error = %err, jitter_ms, "OCR call failed, retrying once");
                tokio::time::sleep(Duration::from_millis(jitter_ms)).await;
                self.post_image(image_bytes).await
            }
            Err(err) => Err(err),
        }
    }

    fn is_ready(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }
}
