//! # Recipe Analysis Pipeline
//!
//! Orchestrates one analysis request end to end: OCR extraction, text
//! normalization, segmentation, local pantry matching, and the external
//! feasibility score. Concurrency is bounded by a semaphore so a burst of
//! uploads cannot exhaust the process, and every external call runs under
//! an outer deadline on top of the client's own HTTP timeout.
//!
//! The pipeline fails fast on empty OCR output so callers can tell "retake
//! the photo" apart from service failures. Uploaded images are temporary
//! files removed on every path, success or error.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tempfile::TempPath;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::AnalysisConfig;
use crate::errors::{error_logging, AppError, AppResult};
use crate::match_engine::{match_ingredients, MatchOutcome};
use crate::normalize::normalize;
use crate::ocr::{OcrOutcome, TextExtractor};
use crate::reconcile::PantryReconciler;
use crate::scorer::{FeasibilityReport, FeasibilityScorer};
use crate::segment::{segment, RecipeStructure};
use crate::store::PantryStore;

/// OCR figures surfaced alongside the analysis; absent for text-only
/// requests that never touched the OCR service
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrSummary {
    pub confidence: f32,
    pub word_count: usize,
}

/// Complete result of one analysis request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub extracted_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr: Option<OcrSummary>,
    pub recipe: RecipeStructure,
    pub pantry_match: MatchOutcome,
    pub total_pantry_items: usize,
    pub feasibility: FeasibilityReport,
    pub timestamp: DateTime<Utc>,
}

/// Readiness of the external collaborators
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub ocr_ready: bool,
    pub scorer_ready: bool,
}

/// Drives the analysis pipeline over a pantry store and the two external
/// collaborators
pub struct RecipeAnalyzer<S: PantryStore, X: TextExtractor, F: FeasibilityScorer> {
    reconciler: Arc<PantryReconciler<S>>,
    extractor: X,
    scorer: F,
    limiter: Semaphore,
    external_deadline: Duration,
}

impl<S: PantryStore, X: TextExtractor, F: FeasibilityScorer> RecipeAnalyzer<S, X, F> {
    pub fn new(
        reconciler: Arc<PantryReconciler<S>>,
        extractor: X,
        scorer: F,
        config: &AnalysisConfig,
    ) -> Self {
        Self {
            reconciler,
            extractor,
            scorer,
            limiter: Semaphore::new(config.max_concurrent_analyses),
            external_deadline: Duration::from_secs(config.external_call_timeout_secs),
        }
    }

    async fn with_deadline<T>(
        &self,
        what: &str,
        fut: impl std::future::Future<Output = AppResult<T>>,
    ) -> AppResult<T> {
        match tokio::time::timeout(self.external_deadline, fut).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Upstream(format!(
                "{} did not respond within {}s",
                what,
                self.external_deadline.as_secs()
            ))),
        }
    }

    async fn extract_or_fail(&self, path: &Path) -> AppResult<OcrOutcome> {
        let outcome = match self
            .with_deadline("OCR service", self.extractor.extract_text(path))
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                error_logging::log_upstream_error(&err, "ocr", "extract_text", None);
                return Err(err);
            }
        };
        if outcome.text.trim().is_empty() {
            warn!(path = %path.display(), "OCR returned no text");
            return Err(AppError::TextExtractionEmpty);
        }
        Ok(outcome)
    }

    /// Analyze a recipe photo already on disk
    pub async fn analyze_image(&self, user_id: &str, path: &Path) -> AppResult<AnalysisReport> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| AppError::Internal("analysis limiter is closed".to_string()))?;

        let outcome = self.extract_or_fail(path).await?;
        let summary = OcrSummary {
            confidence: outcome.confidence,
            word_count: outcome.word_count,
        };
        self.run_pipeline(user_id, &outcome.text, Some(summary)).await
    }

    /// Analyze an uploaded photo held in a temporary file. The file is
    /// deleted before returning, on success and on every error path.
    pub async fn analyze_upload(&self, user_id: &str, image: TempPath) -> AppResult<AnalysisReport> {
        let result = self.analyze_image(user_id, &image).await;
        if let Err(err) = image.close() {
            warn!(error = %err, "Failed to remove uploaded image");
        }
        result
    }

    /// Analyze recipe text directly, skipping OCR
    pub async fn analyze_text(&self, user_id: &str, text: &str) -> AppResult<AnalysisReport> {
        if text.trim().is_empty() {
            return Err(AppError::Validation("recipe text is required".to_string()));
        }

        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| AppError::Internal("analysis limiter is closed".to_string()))?;

        self.run_pipeline(user_id, text, None).await
    }

    /// Extract only the ingredient lines from a recipe photo; no pantry
    /// access and no scorer call
    pub async fn extract_ingredients(&self, path: &Path) -> AppResult<Vec<String>> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| AppError::Internal("analysis limiter is closed".to_string()))?;

        let outcome = self.extract_or_fail(path).await?;
        let cleaned = normalize(&outcome.text);
        Ok(segment(&cleaned).ingredients)
    }

    async fn run_pipeline(
        &self,
        user_id: &str,
        raw_text: &str,
        ocr: Option<OcrSummary>,
    ) -> AppResult<AnalysisReport> {
        let pantry = self.reconciler.pantry(user_id).await?;

        let cleaned = normalize(raw_text);
        let recipe = segment(&cleaned);
        let pantry_match = match_ingredients(&recipe.ingredients, &pantry.ingredients);
        debug!(
            user_id = %user_id,
            ingredient_lines = recipe.ingredients.len(),
            available = pantry_match.available.len(),
            "Recipe structured, requesting feasibility score"
        );

        let snapshot = pantry.snapshot();
        let feasibility = match self
            .with_deadline("feasibility scorer", self.scorer.score(&cleaned, &snapshot))
            .await
        {
            Ok(report) => report,
            Err(err) => {
                error_logging::log_upstream_error(&err, "scorer", "score", None);
                return Err(err);
            }
        };

        info!(
            user_id = %user_id,
            score = feasibility.feasibility_score,
            "Analysis completed"
        );
        Ok(AnalysisReport {
            extracted_text: cleaned,
            ocr,
            recipe,
            pantry_match,
            total_pantry_items: pantry.total_items,
            feasibility,
            timestamp: Utc::now(),
        })
    }

    /// Readiness probe over both external collaborators
    pub fn service_status(&self) -> ServiceStatus {
        ServiceStatus {
            ocr_ready: self.extractor.is_ready(),
            scorer_ready: self.scorer.is_ready(),
        }
    }
}
