//! # Feasibility Scorer Interface
//!
//! The feasibility scorer is an external generative-AI service that judges
//! "can I cook this recipe with what I have" from the verbatim recipe text
//! plus a snapshot of the user's pantry. Its replies are text that should
//! contain JSON but frequently arrives wrapped in markdown code fences or
//! surrounded by prose, so parsing is defensive throughout: fields default
//! when absent, scores outside 0..=100 collapse to a neutral 50, and a
//! wholly unparseable reply degrades to a fallback report instead of an
//! error.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ScorerConfig;
use crate::errors::{AppError, AppResult};
use crate::model::PantryItemSnapshot;

/// Neutral score used when the service reply is missing or invalid
const NEUTRAL_SCORE: u8 = 50;

/// Payload sent to the scorer: the recipe text verbatim (the scorer does
/// its own interpretation) plus the pantry snapshot
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    pub recipe_text: String,
    pub pantry_ingredients: Vec<PantryItemSnapshot>,
}

/// An ingredient the scorer extracted from the recipe text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoredIngredient {
    pub name: String,
    pub quantity: String,
    pub unit: String,
    pub essential: bool,
}

/// A recipe ingredient the pantry lacks, with suggested stand-ins
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MissingIngredient {
    pub name: String,
    pub quantity: String,
    pub unit: String,
    pub substitutes: Vec<String>,
    pub essential: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Substitution {
    pub original: String,
    pub substitute: String,
    pub note: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Suggestions {
    pub substitutions: Vec<Substitution>,
    pub modifications: Vec<String>,
    pub tips: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NutritionalInfo {
    pub estimated_calories: String,
    pub difficulty: String,
    pub cooking_time: String,
    pub servings: String,
}

/// Full scorer verdict for one recipe-vs-pantry request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeasibilityReport {
    pub feasibility_score: u8,
    pub recipe_title: String,
    pub extracted_ingredients: Vec<ScoredIngredient>,
    pub required_tools: Vec<String>,
    pub available_ingredients: Vec<String>,
    pub missing_ingredients: Vec<MissingIngredient>,
    pub suggestions: Suggestions,
    pub nutritional_info: NutritionalInfo,
    pub warnings_and_notes: Vec<String>,
    pub timestamp: Option<DateTime<Utc>>,
    /// Verbatim service reply, kept only when parsing degraded to the
    /// fallback so operators can inspect what came back
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

/// Seam for the external scorer, stubbed in tests
#[allow(async_fn_in_trait)]
pub trait FeasibilityScorer: Send + Sync {
    async fn score(
        &self,
        recipe_text: &str,
        pantry: &[PantryItemSnapshot],
    ) -> AppResult<FeasibilityReport>;
    fn is_ready(&self) -> bool;
}

/// Strip markdown fences and surrounding prose, keeping the outermost
/// JSON object if one exists
fn isolate_json(raw: &str) -> Option<&str> {
    let stripped = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    let start = stripped.find('{')?;
    let end = stripped.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&stripped[start..=end])
}

/// A score is accepted only when it is an integer inside 0..=100;
/// anything else becomes the neutral 50
fn normalize_score(value: &Value) -> u8 {
    match value.get("feasibilityScore").and_then(Value::as_i64) {
        Some(score) if (0..=100).contains(&score) => score as u8,
        _ => NEUTRAL_SCORE,
    }
}

/// Parse a service reply into a report.
///
/// Never fails: malformed or fence-mangled replies degrade to
/// [`fallback_report`] with the raw reply retained.
pub fn parse_report(raw: &str) -> FeasibilityReport {
    let Some(candidate) = isolate_json(raw) else {
        warn!("Scorer reply contained no JSON object, using fallback report");
        return fallback_report(raw);
    };

    let mut value: Value = match serde_json::from_str(candidate) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "Scorer reply was not valid JSON, using fallback report");
            return fallback_report(raw);
        }
    };

    // Rewrite the score in place so an out-of-range value cannot fail the
    // typed parse and throw away the rest of a usable reply.
    let score = normalize_score(&value);
    if let Some(object) = value.as_object_mut() {
        object.insert("feasibilityScore".to_string(), Value::from(score));
    }
    let mut report: FeasibilityReport = match serde_json::from_value(value) {
        Ok(report) => report,
        Err(err) => {
            warn!(error = %err, "Scorer JSON did not fit the report shape, using fallback");
            return fallback_report(raw);
        }
    };

    report.feasibility_score = score;
    report.timestamp = Some(Utc::now());
    report.raw_response = None;
    debug!(score = report.feasibility_score, "Parsed scorer report");
    report
}

/// Degraded report returned when the scorer reply cannot be parsed:
/// neutral score, advisory notes, raw reply retained
pub fn fallback_report(raw: &str) -> FeasibilityReport {
    FeasibilityReport {
        feasibility_score: NEUTRAL_SCORE,
        recipe_title: "Recipe Analysis".to_string(),
        warnings_and_notes: vec![
            "Automatic analysis could not be fully parsed.".to_string(),
            "Please review the recipe text manually.".to_string(),
        ],
        timestamp: Some(Utc::now()),
        raw_response: Some(raw.to_string()),
        ..FeasibilityReport::default()
    }
}

/// HTTP client for the scorer service
pub struct ScorerClient {
    http: reqwest::Client,
    config: ScorerConfig,
}

impl ScorerClient {
    pub fn new(config: ScorerConfig) -> AppResult<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("failed to build scorer HTTP client: {}", e)))?;
        info!(endpoint = %config.endpoint, "Scorer client ready");
        Ok(Self { http, config })
    }

    async fn post_request(&self, request: &ScoreRequest) -> AppResult<String> {
        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "scorer service returned status {}",
                status
            )));
        }
        Ok(response.text().await?)
    }
}

impl FeasibilityScorer for ScorerClient {
    async fn score(
        &self,
        recipe_text: &str,
        pantry: &[PantryItemSnapshot],
    ) -> AppResult<FeasibilityReport> {
        let request = ScoreRequest {
            recipe_text: recipe_text.to_string(),
            pantry_ingredients: pantry.to_vec(),
        };

        let raw = match self.post_request(&request).await {
            Ok(raw) => raw,
            Err(err) if self.config.retry_once => {
                let jitter_ms = rand::rng().random_range(100..500);
                warn!(error = %err, jitter_ms, "Scorer call failed, retrying once");
                tokio::time::sleep(Duration::from_millis(jitter_ms)).await;
                self.post_request(&request).await?
            }
            Err(err) => return Err(err),
        };

        Ok(parse_report(&raw))
    }

    fn is_ready(&self) -> bool {
        !self.config.api_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clean_json() {
        let raw = r#"{"feasibilityScore": 85, "recipeTitle": "Pancakes",
            "availableIngredients": ["flour"], "missingIngredients": []}"#;
        let report = parse_report(raw);
        assert_eq!(report.feasibility_score, 85);
        assert_eq!(report.recipe_title, "Pancakes");
        assert_eq!(report.available_ingredients, vec!["flour".to_string()]);
        assert!(report.raw_response.is_none());
    }

    #[test]
    fn test_parse_fenced_json_with_prose() {
        let raw = "Here is the analysis:\n```json\n{\"feasibilityScore\": 70}\n```\nEnjoy!";
        let report = parse_report(raw);
        assert_eq!(report.feasibility_score, 70);
    }

    #[test]
    fn test_out_of_range_score_becomes_neutral() {
        assert_eq!(parse_report(r#"{"feasibilityScore": 150}"#).feasibility_score, 50);
        assert_eq!(parse_report(r#"{"feasibilityScore": -3}"#).feasibility_score, 50);
        assert_eq!(
            parse_report(r#"{"feasibilityScore": "high"}"#).feasibility_score,
            50
        );
        assert_eq!(parse_report(r#"{}"#).feasibility_score, 50);

        // The rest of the reply survives score normalization
        let report = parse_report(r#"{"feasibilityScore": 150, "recipeTitle": "Soup"}"#);
        assert_eq!(report.feasibility_score, 50);
        assert_eq!(report.recipe_title, "Soup");
    }

    #[test]
    fn test_unparseable_reply_degrades_to_fallback() {
        let report = parse_report("I could not analyze this recipe, sorry!");
        assert_eq!(report.feasibility_score, 50);
        assert!(!report.warnings_and_notes.is_empty());
        assert_eq!(
            report.raw_response.as_deref(),
            Some("I could not analyze this recipe, sorry!")
        );
    }

    #[test]
    fn test_truncated_json_degrades_to_fallback() {
        let report = parse_report(r#"{"feasibilityScore": 85, "recipeTitle": "Pan"#);
        assert_eq!(report.feasibility_score, 50);
        assert!(report.raw_response.is_some());
    }

    #[test]
    fn test_missing_fields_default() {
        let report = parse_report(r#"{"feasibilityScore": 60}"#);
        assert!(report.extracted_ingredients.is_empty());
        assert!(report.suggestions.tips.is_empty());
        assert_eq!(report.nutritional_info, NutritionalInfo::default());
    }
}
