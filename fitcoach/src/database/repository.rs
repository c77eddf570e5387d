//! Repository layer for database operations
//!
//! The repository owns the connection pool and hands out transactions.
//! A handful of read-only helpers wrap a single query in its own
//! short transaction for callers that only need a snapshot.

use super::models::*;
use super::transaction::StoreTx;
use crate::error::Result;
use sqlx::SqlitePool;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Begin a logical unit of work
    pub async fn begin(&self) -> Result<StoreTx> {
        let tx = self.pool.begin().await?;
        Ok(StoreTx::new(tx))
    }

    /// Current trainer state for a user
    pub async fn get_trainer_state(&self, user_id: &str) -> Result<Option<TrainerState>> {
        let mut tx = self.begin().await?;
        let state = tx.get_trainer_state(user_id).await?;
        tx.commit().await?;
        Ok(state)
    }

    /// Weight records ordered by date ascending
    pub async fn list_weight_records(&self, user_id: &str) -> Result<Vec<WeightRecord>> {
        let mut tx = self.begin().await?;
        let records = tx.list_weight_records(user_id, None).await?;
        tx.commit().await?;
        Ok(records)
    }

    /// Total points from the ledger
    pub async fn sum_points(&self, user_id: &str) -> Result<i64> {
        let mut tx = self.begin().await?;
        let total = tx.sum_points(user_id).await?;
        tx.commit().await?;
        Ok(total)
    }

    pub async fn count_available_consumables(&self, user_id: &str, item_id: &str) -> Result<i64> {
        let mut tx = self.begin().await?;
        let count = tx.count_available_consumables(user_id, item_id).await?;
        tx.commit().await?;
        Ok(count)
    }

    pub async fn list_unlocked_achievement_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let mut tx = self.begin().await?;
        let ids = tx.list_unlocked_achievement_ids(user_id).await?;
        tx.commit().await?;
        Ok(ids)
    }
}
