//! # Pantry Persistence Boundary
//!
//! The engine is agnostic to storage; it requires only load/create/save
//! with read-your-writes consistency per user. [`MemoryPantryStore`] backs
//! tests and single-process deployments; [`PgPantryStore`] persists
//! pantries in Postgres with the ingredient collection serialized as JSON
//! text.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sqlx::postgres::PgPool;
use sqlx::Row;
use tracing::{debug, info};

use crate::errors::{error_logging, AppError, AppResult};
use crate::model::{IngredientRecord, Pantry};

/// Storage contract for pantries. Any store satisfying at-least
/// read-your-writes consistency per user suffices.
#[allow(async_fn_in_trait)]
pub trait PantryStore: Send + Sync {
    /// Fetch the user's pantry, `None` if the user has none yet
    async fn load_by_user(&self, user_id: &str) -> AppResult<Option<Pantry>>;
    /// Create an empty pantry for the user
    async fn create(&self, user_id: &str) -> AppResult<Pantry>;
    /// Persist the pantry, replacing the stored state
    async fn save(&self, pantry: &Pantry) -> AppResult<Pantry>;
}

/// In-memory store keyed by user id
#[derive(Debug, Default)]
pub struct MemoryPantryStore {
    pantries: RwLock<HashMap<String, Pantry>>,
}

impl MemoryPantryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PantryStore for MemoryPantryStore {
    async fn load_by_user(&self, user_id: &str) -> AppResult<Option<Pantry>> {
        Ok(self.pantries.read().get(user_id).cloned())
    }

    async fn create(&self, user_id: &str) -> AppResult<Pantry> {
        let pantry = Pantry::empty(user_id, Utc::now());
        self.pantries
            .write()
            .insert(user_id.to_string(), pantry.clone());
        debug!(user_id = %user_id, "Created new pantry");
        Ok(pantry)
    }

    async fn save(&self, pantry: &Pantry) -> AppResult<Pantry> {
        self.pantries
            .write()
            .insert(pantry.user_id.clone(), pantry.clone());
        Ok(pantry.clone())
    }
}

/// Postgres-backed pantry store
#[derive(Debug, Clone)]
pub struct PgPantryStore {
    pool: PgPool,
}

impl PgPantryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Initialize the pantry schema
    pub async fn init_schema(&self) -> AppResult<()> {
        info!("Initializing pantry schema");

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS pantries (
                user_id VARCHAR(255) PRIMARY KEY,
                ingredients TEXT NOT NULL DEFAULT '[]',
                total_items BIGINT NOT NULL DEFAULT 0,
                last_updated TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error_logging::log_storage_error(&e, "init_schema", None);
            AppError::from(e)
        })?;

        info!("Pantry schema initialized successfully");
        Ok(())
    }

    fn pantry_from_row(row: &sqlx::postgres::PgRow) -> AppResult<Pantry> {
        let user_id: String = row.get(0);
        let ingredients_json: String = row.get(1);
        let total_items: i64 = row.get(2);
        let last_updated: DateTime<Utc> = row.get(3);

        let ingredients: Vec<IngredientRecord> = serde_json::from_str(&ingredients_json)
            .map_err(|e| {
                AppError::Storage(format!(
                    "stored ingredient collection for '{}' is corrupt: {}",
                    user_id, e
                ))
            })?;

        Ok(Pantry {
            user_id,
            ingredients,
            last_updated,
            total_items: total_items as usize,
        })
    }
}

impl PantryStore for PgPantryStore {
    async fn load_by_user(&self, user_id: &str) -> AppResult<Option<Pantry>> {
        debug!(user_id = %user_id, "Loading pantry");

        let row = sqlx::query(
            "SELECT user_id, ingredients, total_items, last_updated FROM pantries WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let pantry = Self::pantry_from_row(&row)?;
                debug!(user_id = %user_id, total_items = pantry.total_items, "Pantry found");
                Ok(Some(pantry))
            }
            None => {
                debug!(user_id = %user_id, "No pantry found");
                Ok(None)
            }
        }
    }

    async fn create(&self, user_id: &str) -> AppResult<Pantry> {
        debug!(user_id = %user_id, "Creating pantry");

        let pantry = Pantry::empty(user_id, Utc::now());
        sqlx::query(
            "INSERT INTO pantries (user_id, ingredients, total_items, last_updated)
             VALUES ($1, '[]', 0, $2)
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(pantry.last_updated)
        .execute(&self.pool)
        .await?;

        // On conflict another writer created it first; read back to keep
        // read-your-writes semantics.
        match self.load_by_user(user_id).await? {
            Some(existing) => Ok(existing),
            None => Ok(pantry),
        }
    }

    async fn save(&self, pantry: &Pantry) -> AppResult<Pantry> {
        debug!(user_id = %pantry.user_id, total_items = pantry.total_items, "Saving pantry");

        let ingredients_json = serde_json::to_string(&pantry.ingredients)
            .map_err(|e| AppError::Internal(format!("failed to serialize ingredients: {}", e)))?;

        sqlx::query(
            "INSERT INTO pantries (user_id, ingredients, total_items, last_updated)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (user_id) DO UPDATE
             SET ingredients = EXCLUDED.ingredients,
                 total_items = EXCLUDED.total_items,
                 last_updated = EXCLUDED.last_updated",
        )
        .bind(&pantry.user_id)
        .bind(&ingredients_json)
        .bind(pantry.total_items as i64)
        .bind(pantry.last_updated)
        .execute(&self.pool)
        .await?;

        Ok(pantry.clone())
    }
}
