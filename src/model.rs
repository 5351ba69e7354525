//! # Pantry Data Model
//!
//! Closed data types for pantry contents. The original wire shapes were
//! loosely-typed JSON; here the category and unit vocabularies are fixed
//! enumerations and all coercion happens once, when a record enters the
//! system through [`NewIngredient::into_record`].
//!
//! Ingredient identity is the `(name, category, unit)` triple. Within one
//! pantry no two records may share an identity; such records are merged by
//! summing quantity (see `reconcile`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::{AppError, AppResult};

/// Fixed ingredient category vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngredientCategory {
    Dairy,
    Meat,
    Vegetable,
    Fruit,
    Grain,
    Spice,
    Condiment,
    #[default]
    Other,
}

impl IngredientCategory {
    /// All categories, in declaration order
    pub const ALL: [IngredientCategory; 8] = [
        IngredientCategory::Dairy,
        IngredientCategory::Meat,
        IngredientCategory::Vegetable,
        IngredientCategory::Fruit,
        IngredientCategory::Grain,
        IngredientCategory::Spice,
        IngredientCategory::Condiment,
        IngredientCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IngredientCategory::Dairy => "dairy",
            IngredientCategory::Meat => "meat",
            IngredientCategory::Vegetable => "vegetable",
            IngredientCategory::Fruit => "fruit",
            IngredientCategory::Grain => "grain",
            IngredientCategory::Spice => "spice",
            IngredientCategory::Condiment => "condiment",
            IngredientCategory::Other => "other",
        }
    }
}

impl fmt::Display for IngredientCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IngredientCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dairy" => Ok(IngredientCategory::Dairy),
            "meat" => Ok(IngredientCategory::Meat),
            "vegetable" => Ok(IngredientCategory::Vegetable),
            "fruit" => Ok(IngredientCategory::Fruit),
            "grain" => Ok(IngredientCategory::Grain),
            "spice" => Ok(IngredientCategory::Spice),
            "condiment" => Ok(IngredientCategory::Condiment),
            "other" => Ok(IngredientCategory::Other),
            other => Err(AppError::Validation(format!(
                "unknown ingredient category '{}'",
                other
            ))),
        }
    }
}

/// Fixed measurement unit vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementUnit {
    #[default]
    Piece,
    Cup,
    Tbsp,
    Tsp,
    Lb,
    Oz,
    Kg,
    G,
    Ml,
    L,
    Other,
}

impl MeasurementUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementUnit::Piece => "piece",
            MeasurementUnit::Cup => "cup",
            MeasurementUnit::Tbsp => "tbsp",
            MeasurementUnit::Tsp => "tsp",
            MeasurementUnit::Lb => "lb",
            MeasurementUnit::Oz => "oz",
            MeasurementUnit::Kg => "kg",
            MeasurementUnit::G => "g",
            MeasurementUnit::Ml => "ml",
            MeasurementUnit::L => "l",
            MeasurementUnit::Other => "other",
        }
    }
}

impl fmt::Display for MeasurementUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeasurementUnit {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "piece" => Ok(MeasurementUnit::Piece),
            "cup" => Ok(MeasurementUnit::Cup),
            "tbsp" => Ok(MeasurementUnit::Tbsp),
            "tsp" => Ok(MeasurementUnit::Tsp),
            "lb" => Ok(MeasurementUnit::Lb),
            "oz" => Ok(MeasurementUnit::Oz),
            "kg" => Ok(MeasurementUnit::Kg),
            "g" => Ok(MeasurementUnit::G),
            "ml" => Ok(MeasurementUnit::Ml),
            "l" => Ok(MeasurementUnit::L),
            "other" => Ok(MeasurementUnit::Other),
            other => Err(AppError::Validation(format!(
                "unknown measurement unit '{}'",
                other
            ))),
        }
    }
}

/// One ingredient occurrence in a pantry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientRecord {
    /// Normalized lowercase trimmed name; part of the identity key
    pub name: String,
    #[serde(default)]
    pub category: IngredientCategory,
    pub quantity: f64,
    #[serde(default)]
    pub unit: MeasurementUnit,
    /// Absent means "no expiry tracked"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<DateTime<Utc>>,
    /// Set at creation, never mutated by updates
    pub added_date: DateTime<Utc>,
}

impl IngredientRecord {
    /// Identity key used for storage-level dedup and add-merge matching
    pub fn identity(&self) -> IngredientKey {
        IngredientKey {
            name: self.name.to_lowercase(),
            category: self.category,
            unit: self.unit,
        }
    }

    /// Days from `today` until expiry, negative when already expired.
    /// `None` when no expiry is tracked.
    pub fn days_until_expiry(&self, today: DateTime<Utc>) -> Option<i64> {
        self.expiry_date
            .map(|expiry| (expiry.date_naive() - today.date_naive()).num_days())
    }
}

/// The `(name, category, unit)` dedup key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IngredientKey {
    pub name: String,
    pub category: IngredientCategory,
    pub unit: MeasurementUnit,
}

/// Incoming ingredient payload before boundary coercion.
///
/// Absent optional fields take the documented defaults; a missing name is a
/// validation error, never silently defaulted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIngredient {
    pub name: String,
    #[serde(default)]
    pub category: Option<IngredientCategory>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<MeasurementUnit>,
    #[serde(default)]
    pub expiry_date: Option<DateTime<Utc>>,
}

impl NewIngredient {
    /// Minimal constructor for the common name-only case
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Validate and coerce into a canonical record, stamping `added_date`
    pub fn into_record(self, now: DateTime<Utc>) -> AppResult<IngredientRecord> {
        let name = self.name.trim().to_lowercase();
        if name.is_empty() {
            return Err(AppError::Validation(
                "ingredient name is required".to_string(),
            ));
        }

        let quantity = self.quantity.unwrap_or(1.0);
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(AppError::Validation(format!(
                "ingredient quantity must be a positive number, got {}",
                quantity
            )));
        }

        Ok(IngredientRecord {
            name,
            category: self.category.unwrap_or_default(),
            quantity,
            unit: self.unit.unwrap_or_default(),
            expiry_date: self.expiry_date,
            added_date: now,
        })
    }
}

/// Partial update applied over an existing record; absent fields are kept
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientPatch {
    #[serde(default)]
    pub category: Option<IngredientCategory>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<MeasurementUnit>,
    #[serde(default)]
    pub expiry_date: Option<Option<DateTime<Utc>>>,
}

impl IngredientPatch {
    /// Apply the provided fields over `record`. `added_date` is never touched.
    pub fn apply(&self, record: &mut IngredientRecord) -> AppResult<()> {
        if let Some(quantity) = self.quantity {
            if !quantity.is_finite() || quantity <= 0.0 {
                return Err(AppError::Validation(format!(
                    "ingredient quantity must be a positive number, got {}",
                    quantity
                )));
            }
            record.quantity = quantity;
        }
        if let Some(category) = self.category {
            record.category = category;
        }
        if let Some(unit) = self.unit {
            record.unit = unit;
        }
        if let Some(expiry) = self.expiry_date {
            record.expiry_date = expiry;
        }
        Ok(())
    }
}

/// A user's persisted ingredient inventory. At most one pantry per user,
/// created lazily on first access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pantry {
    pub user_id: String,
    /// Insertion-ordered; order carries no meaning beyond display
    pub ingredients: Vec<IngredientRecord>,
    /// Stamped on every mutation, never set by callers
    pub last_updated: DateTime<Utc>,
    /// Recomputed on every mutation, never set by callers
    pub total_items: usize,
}

impl Pantry {
    pub fn empty(user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            ingredients: Vec::new(),
            last_updated: now,
            total_items: 0,
        }
    }

    /// Re-stamp the derived fields after a mutation
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.total_items = self.ingredients.len();
        self.last_updated = now;
    }

    pub fn ingredient_names(&self) -> Vec<String> {
        self.ingredients.iter().map(|i| i.name.clone()).collect()
    }

    /// Snapshot of `{name, quantity, unit}` tuples for the feasibility scorer
    pub fn snapshot(&self) -> Vec<PantryItemSnapshot> {
        self.ingredients
            .iter()
            .map(|i| PantryItemSnapshot {
                name: i.name.clone(),
                quantity: i.quantity,
                unit: i.unit,
            })
            .collect()
    }
}

/// The slim pantry view sent to the external AI scorer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PantryItemSnapshot {
    pub name: String,
    pub quantity: f64,
    pub unit: MeasurementUnit,
}

/// Aggregate pantry statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PantryStats {
    pub total_items: usize,
    /// Category distribution over stored records
    pub categories: HashMap<IngredientCategory, usize>,
    /// Records with 0..=7 days until expiry, inclusive of today and day 7
    pub expiring_items: Vec<IngredientRecord>,
    /// Records already past their expiry date; tracked separately from
    /// "expiring soon"
    pub expired_items: Vec<IngredientRecord>,
    pub last_updated: DateTime<Utc>,
}
