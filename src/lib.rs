//! # Pantry Chef
//!
//! Recipe text structuring and pantry reconciliation engine. Takes noisy
//! OCR output from recipe photos, cleans and segments it into a structured
//! recipe, reconciles ingredient observations into per-user pantry state,
//! and matches recipes against what the pantry holds. Text extraction and
//! feasibility scoring are delegated to external collaborators behind the
//! [`ocr::TextExtractor`] and [`scorer::FeasibilityScorer`] seams.
//!
//! ## Module Overview
//!
//! - `errors` - Application error taxonomy and logging helpers
//! - `model` - Ingredient and pantry domain types
//! - `normalize` - OCR text cleanup
//! - `segment` - Line-oriented recipe segmentation heuristics
//! - `match_engine` - Recipe-vs-pantry availability matching
//! - `store` - Pantry persistence (in-memory and Postgres)
//! - `reconcile` - Pantry mutation with quantity-merging deduplication
//! - `ocr` - External OCR collaborator interface
//! - `scorer` - External feasibility scorer interface
//! - `analysis` - End-to-end analysis pipeline
//! - `config` - Environment-driven configuration
//! - `observability` - Tracing setup

pub mod analysis;
pub mod config;
pub mod errors;
pub mod match_engine;
pub mod model;
pub mod normalize;
pub mod observability;
pub mod ocr;
pub mod reconcile;
pub mod scorer;
pub mod segment;
pub mod store;

pub use analysis::{AnalysisReport, RecipeAnalyzer, ServiceStatus};
pub use config::AppConfig;
pub use errors::{AppError, AppResult};
pub use match_engine::{match_ingredients, MatchOutcome};
pub use model::{
    IngredientCategory, IngredientPatch, IngredientRecord, MeasurementUnit, NewIngredient, Pantry,
    PantryStats,
};
pub use normalize::normalize;
pub use ocr::{OcrClient, OcrOutcome, TextExtractor};
pub use reconcile::PantryReconciler;
pub use scorer::{FeasibilityReport, FeasibilityScorer, ScorerClient};
pub use segment::{segment, RecipeStructure};
pub use store::{MemoryPantryStore, PantryStore, PgPantryStore};
