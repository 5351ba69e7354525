//! # Pantry Reconciliation Module
//!
//! Owns mutation of a user's pantry: add-with-merge, patch updates,
//! removal, clearing, search, and aggregate statistics. Every mutation is
//! a read-modify-write over the full ingredient collection, so concurrent
//! requests for the same user are serialized through a per-user async
//! mutex to prevent lost updates; different users never contend.
//!
//! Ingredient identity is the `(name, category, unit)` triple, applied
//! uniformly: `add_or_merge` merges into the record with the same identity
//! by summing quantities, and the stored collection never holds two records
//! with one identity. Name-keyed operations (`update`, `remove`, `search`)
//! match on name alone, case-insensitively.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::errors::{error_logging, AppError, AppResult};
use crate::model::{
    IngredientPatch, IngredientRecord, NewIngredient, Pantry, PantryStats,
};
use crate::store::PantryStore;

/// Outcome of a bulk add: per-item failures do not abort the batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkAddOutcome {
    pub added: Vec<IngredientRecord>,
    pub errors: Vec<String>,
}

/// Reconciles ingredient observations into per-user pantry state
pub struct PantryReconciler<S: PantryStore> {
    store: S,
    /// Per-user write serialization; the registry lock is never held
    /// across an await point.
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl<S: PantryStore> PantryReconciler<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn user_lock(&self, user_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock();
        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Fetch the user's pantry, creating an empty one lazily on first access
    pub async fn pantry(&self, user_id: &str) -> AppResult<Pantry> {
        match self.store.load_by_user(user_id).await? {
            Some(pantry) => Ok(pantry),
            None => {
                info!(user_id = %user_id, "Creating pantry on first access");
                self.store.create(user_id).await
            }
        }
    }

    async fn load_or_create(&self, user_id: &str) -> AppResult<Pantry> {
        self.pantry(user_id).await
    }

    /// Merge an incoming ingredient into the pantry.
    ///
    /// If a record with the same `(name, category, unit)` identity exists,
    /// its quantity is increased by the incoming quantity (default 1);
    /// otherwise the record is inserted with `added_date` stamped now.
    /// Returns the stored record after the merge.
    pub async fn add_or_merge(
        &self,
        user_id: &str,
        incoming: NewIngredient,
    ) -> AppResult<IngredientRecord> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let now = Utc::now();
        let record = incoming.into_record(now)?;
        let mut pantry = self.load_or_create(user_id).await?;

        let identity = record.identity();
        let merged = match pantry
            .ingredients
            .iter_mut()
            .find(|existing| existing.identity() == identity)
        {
            Some(existing) => {
                existing.quantity += record.quantity;
                debug!(
                    user_id = %user_id,
                    name = %existing.name,
                    quantity = existing.quantity,
                    "Merged ingredient into existing record"
                );
                existing.clone()
            }
            None => {
                debug!(user_id = %user_id, name = %record.name, "Inserted new ingredient");
                pantry.ingredients.push(record.clone());
                record
            }
        };

        pantry.touch(now);
        self.store.save(&pantry).await?;
        Ok(merged)
    }

    /// Add a batch of ingredients, collecting per-item errors instead of
    /// aborting on the first failure
    pub async fn add_many(
        &self,
        user_id: &str,
        incoming: Vec<NewIngredient>,
    ) -> AppResult<BulkAddOutcome> {
        if incoming.is_empty() {
            return Err(AppError::Validation(
                "ingredients list is required".to_string(),
            ));
        }

        let mut outcome = BulkAddOutcome::default();
        for item in incoming {
            let label = item.name.clone();
            match self.add_or_merge(user_id, item).await {
                Ok(record) => outcome.added.push(record),
                Err(err) => {
                    if matches!(err, AppError::Validation(_)) {
                        error_logging::log_validation_error(
                            &err,
                            "add_many",
                            Some(user_id),
                            "ingredient",
                            Some(&label),
                        );
                    } else {
                        warn!(user_id = %user_id, name = %label, error = %err, "Skipping bulk item");
                    }
                    outcome.errors.push(format!("{}: {}", label, err));
                }
            }
        }

        info!(
            user_id = %user_id,
            added = outcome.added.len(),
            errors = outcome.errors.len(),
            "Bulk add completed"
        );
        Ok(outcome)
    }

    /// Apply a partial update over the first record whose name matches
    /// case-insensitively. Absent patch fields are preserved.
    pub async fn update(
        &self,
        user_id: &str,
        name: &str,
        patch: IngredientPatch,
    ) -> AppResult<IngredientRecord> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return Err(AppError::Validation(
                "ingredient name is required".to_string(),
            ));
        }

        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let now = Utc::now();
        let mut pantry = match self.store.load_by_user(user_id).await? {
            Some(pantry) => pantry,
            None => {
                return Err(AppError::NotFound(format!(
                    "no pantry exists for user '{}'",
                    user_id
                )))
            }
        };

        let record = pantry
            .ingredients
            .iter_mut()
            .find(|existing| existing.name.eq_ignore_ascii_case(&needle))
            .ok_or_else(|| {
                AppError::NotFound(format!("ingredient '{}' not found in pantry", name))
            })?;

        patch.apply(record)?;
        let updated = record.clone();

        pantry.touch(now);
        self.store.save(&pantry).await?;
        debug!(user_id = %user_id, name = %updated.name, "Ingredient updated");
        Ok(updated)
    }

    /// Delete every record whose name matches case-insensitively. A miss is
    /// a no-op, not an error.
    pub async fn remove(&self, user_id: &str, name: &str) -> AppResult<()> {
        let needle = name.trim().to_lowercase();

        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let now = Utc::now();
        let mut pantry = self.load_or_create(user_id).await?;
        let before = pantry.ingredients.len();
        pantry
            .ingredients
            .retain(|existing| !existing.name.eq_ignore_ascii_case(&needle));

        debug!(
            user_id = %user_id,
            name = %needle,
            removed = before - pantry.ingredients.len(),
            "Ingredient removal"
        );

        pantry.touch(now);
        self.store.save(&pantry).await?;
        Ok(())
    }

    /// Empty the pantry; idempotent
    pub async fn clear(&self, user_id: &str) -> AppResult<()> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let now = Utc::now();
        let mut pantry = self.load_or_create(user_id).await?;
        pantry.ingredients.clear();
        pantry.touch(now);
        self.store.save(&pantry).await?;

        info!(user_id = %user_id, "Pantry cleared");
        Ok(())
    }

    /// Case-insensitive substring search over ingredient names. An empty
    /// query is an input-validation error, not an empty result.
    pub async fn search(&self, user_id: &str, query: &str) -> AppResult<Vec<IngredientRecord>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Err(AppError::Validation("search query is required".to_string()));
        }

        let pantry = match self.store.load_by_user(user_id).await? {
            Some(pantry) => pantry,
            None => return Ok(Vec::new()),
        };

        Ok(pantry
            .ingredients
            .into_iter()
            .filter(|record| record.name.to_lowercase().contains(&needle))
            .collect())
    }

    /// Aggregate statistics: total item count, category distribution, and
    /// the expiring-soon window of 0..=7 days (inclusive of today and of
    /// exactly seven days out). Already-expired records are reported
    /// separately, never as "expiring soon".
    pub async fn stats(&self, user_id: &str) -> AppResult<PantryStats> {
        let pantry = self.load_or_create(user_id).await?;
        let now = Utc::now();

        let mut categories = HashMap::new();
        let mut expiring_items = Vec::new();
        let mut expired_items = Vec::new();

        for record in &pantry.ingredients {
            *categories.entry(record.category).or_insert(0) += 1;
            match record.days_until_expiry(now) {
                Some(days) if (0..=7).contains(&days) => expiring_items.push(record.clone()),
                Some(days) if days < 0 => expired_items.push(record.clone()),
                _ => {}
            }
        }

        Ok(PantryStats {
            total_items: pantry.total_items,
            categories,
            expiring_items,
            expired_items,
            last_updated: pantry.last_updated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IngredientCategory, MeasurementUnit};
    use crate::store::MemoryPantryStore;

    fn reconciler() -> PantryReconciler<MemoryPantryStore> {
        PantryReconciler::new(MemoryPantryStore::new())
    }

    #[tokio::test]
    async fn test_add_inserts_then_merges() {
        let reconciler = reconciler();

        let mut first = NewIngredient::named("egg");
        first.quantity = Some(2.0);
        let record = reconciler.add_or_merge("u1", first).await.unwrap();
        assert_eq!(record.quantity, 2.0);

        let mut second = NewIngredient::named("egg");
        second.quantity = Some(3.0);
        let merged = reconciler.add_or_merge("u1", second).await.unwrap();
        assert_eq!(merged.quantity, 5.0);

        let pantry = reconciler.pantry("u1").await.unwrap();
        assert_eq!(pantry.total_items, 1);
    }

    #[tokio::test]
    async fn test_identity_distinguishes_unit_and_category() {
        let reconciler = reconciler();

        let mut by_piece = NewIngredient::named("tomato");
        by_piece.unit = Some(MeasurementUnit::Piece);
        by_piece.category = Some(IngredientCategory::Vegetable);
        reconciler.add_or_merge("u1", by_piece).await.unwrap();

        let mut by_weight = NewIngredient::named("tomato");
        by_weight.unit = Some(MeasurementUnit::Kg);
        by_weight.category = Some(IngredientCategory::Vegetable);
        reconciler.add_or_merge("u1", by_weight).await.unwrap();

        let pantry = reconciler.pantry("u1").await.unwrap();
        assert_eq!(pantry.total_items, 2);
    }

    #[tokio::test]
    async fn test_update_unknown_ingredient_is_not_found() {
        let reconciler = reconciler();
        reconciler
            .add_or_merge("u1", NewIngredient::named("salt"))
            .await
            .unwrap();

        let before = reconciler.pantry("u1").await.unwrap();
        let err = reconciler
            .update("u1", "nonexistent", IngredientPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        // Pantry left unmodified
        let after = reconciler.pantry("u1").await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_empty_search_is_validation_error() {
        let reconciler = reconciler();
        let err = reconciler.search("u1", "  ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
