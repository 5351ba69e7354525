//! Integration tests for the analysis pipeline, driven by stub OCR and
//! scorer collaborators so no network is involved.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use pantry_chef::analysis::RecipeAnalyzer;
use pantry_chef::config::AnalysisConfig;
use pantry_chef::errors::{AppError, AppResult};
use pantry_chef::model::{NewIngredient, PantryItemSnapshot};
use pantry_chef::ocr::{OcrOutcome, TextExtractor};
use pantry_chef::reconcile::PantryReconciler;
use pantry_chef::scorer::{parse_report, FeasibilityReport, FeasibilityScorer};
use pantry_chef::store::MemoryPantryStore;

struct StubExtractor {
    text: String,
    ready: bool,
}

impl TextExtractor for StubExtractor {
    async fn extract_text(&self, _path: &Path) -> AppResult<OcrOutcome> {
        Ok(OcrOutcome::coerced(self.text.clone(), 92.0))
    }

    fn is_ready(&self) -> bool {
        self.ready
    }
}

struct FailingExtractor;

impl TextExtractor for FailingExtractor {
    async fn extract_text(&self, _path: &Path) -> AppResult<OcrOutcome> {
        Err(AppError::Upstream("OCR service unavailable".to_string()))
    }

    fn is_ready(&self) -> bool {
        false
    }
}

/// Replays a canned reply and records what it was asked to score
struct CannedScorer {
    reply: String,
    calls: Arc<Mutex<Vec<(String, usize)>>>,
}

impl CannedScorer {
    fn new(reply: &str) -> (Self, Arc<Mutex<Vec<(String, usize)>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                reply: reply.to_string(),
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

impl FeasibilityScorer for CannedScorer {
    async fn score(
        &self,
        recipe_text: &str,
        pantry: &[PantryItemSnapshot],
    ) -> AppResult<FeasibilityReport> {
        self.calls.lock().push((recipe_text.to_string(), pantry.len()));
        Ok(parse_report(&self.reply))
    }

    fn is_ready(&self) -> bool {
        true
    }
}

const RECIPE_TEXT: &str =
    "Simple Pancake Breakfast\nServes 4\nIngredients:\n2 cups flour\n1 cup milk\nInstructions:\n1. Mix ingredients.\n2. Heat pan and cook.";

fn analyzer_with<X: TextExtractor, F: FeasibilityScorer>(
    extractor: X,
    scorer: F,
) -> (
    RecipeAnalyzer<MemoryPantryStore, X, F>,
    Arc<PantryReconciler<MemoryPantryStore>>,
) {
    let reconciler = Arc::new(PantryReconciler::new(MemoryPantryStore::new()));
    let analyzer = RecipeAnalyzer::new(
        Arc::clone(&reconciler),
        extractor,
        scorer,
        &AnalysisConfig::default(),
    );
    (analyzer, reconciler)
}

#[tokio::test]
async fn test_image_analysis_assembles_full_report() {
    let (scorer, _) = CannedScorer::new(r#"{"feasibilityScore": 80, "recipeTitle": "Pancakes"}"#);
    let extractor = StubExtractor {
        text: RECIPE_TEXT.to_string(),
        ready: true,
    };
    let (analyzer, reconciler) = analyzer_with(extractor, scorer);

    reconciler
        .add_or_merge("u1", NewIngredient::named("flour"))
        .await
        .unwrap();

    let report = analyzer
        .analyze_image("u1", Path::new("photo.jpg"))
        .await
        .unwrap();

    let ocr = report.ocr.expect("image analysis should carry OCR figures");
    assert_eq!(ocr.confidence, 92.0);
    assert_eq!(report.feasibility.feasibility_score, 80);
    assert_eq!(report.feasibility.recipe_title, "Pancakes");
    assert_eq!(report.recipe.servings, Some(4));
    assert_eq!(report.recipe.ingredients.len(), 2);
    assert_eq!(report.total_pantry_items, 1);
    // Every ingredient line lands on exactly one side of the match
    assert_eq!(
        report.pantry_match.available.len() + report.pantry_match.missing.len(),
        report.recipe.ingredients.len()
    );
}

#[tokio::test]
async fn test_empty_ocr_text_fails_fast() {
    let (scorer, calls) = CannedScorer::new(r#"{"feasibilityScore": 80}"#);
    let extractor = StubExtractor {
        text: "   \n\t ".to_string(),
        ready: true,
    };
    let (analyzer, _) = analyzer_with(extractor, scorer);

    let err = analyzer
        .analyze_image("u1", Path::new("photo.jpg"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::TextExtractionEmpty));
    // The scorer must never see an empty-text request
    assert!(calls.lock().is_empty());
}

#[tokio::test]
async fn test_ocr_failure_propagates_as_upstream() {
    let (scorer, _) = CannedScorer::new("{}");
    let (analyzer, _) = analyzer_with(FailingExtractor, scorer);

    let err = analyzer
        .analyze_image("u1", Path::new("photo.jpg"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Upstream(_)));
}

#[tokio::test]
async fn test_text_analysis_skips_ocr() {
    let (scorer, _) = CannedScorer::new(r#"{"feasibilityScore": 65}"#);
    let (analyzer, _) = analyzer_with(FailingExtractor, scorer);

    let report = analyzer.analyze_text("u1", RECIPE_TEXT).await.unwrap();
    assert!(report.ocr.is_none());
    assert_eq!(report.feasibility.feasibility_score, 65);
}

#[tokio::test]
async fn test_blank_text_analysis_is_rejected() {
    let (scorer, _) = CannedScorer::new("{}");
    let (analyzer, _) = analyzer_with(FailingExtractor, scorer);

    let err = analyzer.analyze_text("u1", "   ").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_scorer_receives_cleaned_text_and_pantry_snapshot() {
    let (scorer, calls) = CannedScorer::new("{}");
    let (analyzer, reconciler) = analyzer_with(FailingExtractor, scorer);

    for name in ["flour", "milk", "butter"] {
        reconciler
            .add_or_merge("u1", NewIngredient::named(name))
            .await
            .unwrap();
    }

    analyzer
        .analyze_text("u1", "2   cups  flour\n1 cup milk and mix it all together")
        .await
        .unwrap();

    let calls = calls.lock();
    assert_eq!(calls.len(), 1);
    let (sent_text, pantry_len) = &calls[0];
    // The scorer sees the cleaned text, not the raw input
    assert_eq!(sent_text, "2 cup flour\n1 cup milk and mix it all together");
    assert_eq!(*pantry_len, 3);
}

#[tokio::test]
async fn test_unparseable_scorer_reply_degrades_to_fallback() {
    let (scorer, _) = CannedScorer::new("Sorry, I cannot help with that.");
    let (analyzer, _) = analyzer_with(FailingExtractor, scorer);

    let report = analyzer.analyze_text("u1", RECIPE_TEXT).await.unwrap();
    assert_eq!(report.feasibility.feasibility_score, 50);
    assert!(report.feasibility.raw_response.is_some());
    assert!(!report.feasibility.warnings_and_notes.is_empty());
}

#[tokio::test]
async fn test_upload_is_deleted_after_analysis() {
    let (scorer, _) = CannedScorer::new(r#"{"feasibilityScore": 70}"#);
    let extractor = StubExtractor {
        text: RECIPE_TEXT.to_string(),
        ready: true,
    };
    let (analyzer, _) = analyzer_with(extractor, scorer);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"fake image bytes").unwrap();
    let temp_path = file.into_temp_path();
    let on_disk = temp_path.to_path_buf();
    assert!(on_disk.exists());

    analyzer.analyze_upload("u1", temp_path).await.unwrap();
    assert!(!on_disk.exists(), "uploaded image should be removed");
}

#[tokio::test]
async fn test_upload_is_deleted_even_when_analysis_fails() {
    let (scorer, _) = CannedScorer::new("{}");
    let extractor = StubExtractor {
        text: String::new(),
        ready: true,
    };
    let (analyzer, _) = analyzer_with(extractor, scorer);

    let file = tempfile::NamedTempFile::new().unwrap();
    let temp_path = file.into_temp_path();
    let on_disk = temp_path.to_path_buf();

    let err = analyzer.analyze_upload("u1", temp_path).await.unwrap_err();
    assert!(matches!(err, AppError::TextExtractionEmpty));
    assert!(!on_disk.exists(), "uploaded image should be removed on error");
}

#[tokio::test]
async fn test_extract_ingredients_returns_only_ingredient_lines() {
    let (scorer, calls) = CannedScorer::new("{}");
    let extractor = StubExtractor {
        text: RECIPE_TEXT.to_string(),
        ready: true,
    };
    let (analyzer, _) = analyzer_with(extractor, scorer);

    let lines = analyzer
        .extract_ingredients(Path::new("photo.jpg"))
        .await
        .unwrap();
    assert_eq!(lines, vec!["2 cup flour".to_string(), "1 cup milk".to_string()]);
    // Ingredient-only extraction never consults the scorer
    assert!(calls.lock().is_empty());
}

#[tokio::test]
async fn test_service_status_reflects_collaborators() {
    let (scorer, _) = CannedScorer::new("{}");
    let extractor = StubExtractor {
        text: String::new(),
        ready: true,
    };
    let (analyzer, _) = analyzer_with(extractor, scorer);

    let status = analyzer.service_status();
    assert!(status.ocr_ready);
    assert!(status.scorer_ready);

    let (scorer, _) = CannedScorer::new("{}");
    let (analyzer, _) = analyzer_with(FailingExtractor, scorer);
    assert!(!analyzer.service_status().ocr_ready);
}
