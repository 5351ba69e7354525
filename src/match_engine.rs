//! # Pantry Match Engine
//!
//! Splits a recipe's extracted ingredient names into those available in the
//! pantry and those missing. Matching is case-insensitive exact-name
//! comparison, not substring or fuzzy: this is one input among several the
//! external feasibility scorer consumes, and also serves standalone
//! listing. It does not compute a feasibility percentage itself.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::IngredientRecord;

/// Availability split over a recipe's ingredient names. Both sides preserve
/// the recipe's original ordering, duplicates included, so
/// `available.len() + missing.len()` always equals the input length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub available: Vec<String>,
    pub missing: Vec<String>,
}

/// Compare recipe ingredient names against the pantry's records.
///
/// Empty pantry means every recipe ingredient is missing; an empty recipe
/// list yields two empty outputs.
pub fn match_ingredients(
    recipe_ingredient_names: &[String],
    pantry_ingredients: &[IngredientRecord],
) -> MatchOutcome {
    let pantry_names: HashSet<String> = pantry_ingredients
        .iter()
        .map(|record| record.name.to_lowercase())
        .collect();

    let mut outcome = MatchOutcome::default();
    for name in recipe_ingredient_names {
        if pantry_names.contains(&name.trim().to_lowercase()) {
            outcome.available.push(name.clone());
        } else {
            outcome.missing.push(name.clone());
        }
    }

    debug!(
        requested = recipe_ingredient_names.len(),
        available = outcome.available.len(),
        missing = outcome.missing.len(),
        "Matched recipe ingredients against pantry"
    );
    outcome
}
