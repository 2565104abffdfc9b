use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

use crate::domain::errors::StatsError;
use crate::domain::ports::{Clock, StatsStore};
use crate::domain::{PlayerId, PlayerStats, Rank};

// In-memory statistics store used when no database is configured.
#[derive(Clone, Default)]
pub struct InMemoryStatsStore {
    rows: Arc<Mutex<HashMap<PlayerId, PlayerStats>>>,
}

impl InMemoryStatsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatsStore for InMemoryStatsStore {
    async fn record_win(&self, player_id: PlayerId) -> Result<(), StatsError> {
        let mut rows = self.rows.lock().await;
        rows.entry(player_id).or_default().wins += 1;
        Ok(())
    }

    async fn record_loss(&self, player_id: PlayerId) -> Result<(), StatsError> {
        let mut rows = self.rows.lock().await;
        rows.entry(player_id).or_default().losses += 1;
        Ok(())
    }

    async fn update_best_survival_time(
        &self,
        player_id: PlayerId,
        survival_ms: u64,
    ) -> Result<(), StatsError> {
        let mut rows = self.rows.lock().await;
        let row = rows.entry(player_id).or_default();
        row.best_survival_ms = row.best_survival_ms.max(survival_ms);
        Ok(())
    }

    async fn fetch_stats(&self, player_id: PlayerId) -> Result<Option<PlayerStats>, StatsError> {
        let rows = self.rows.lock().await;
        Ok(rows.get(&player_id).copied())
    }

    async fn fetch_rank(&self, player_id: PlayerId) -> Result<Rank, StatsError> {
        let rows = self.rows.lock().await;
        if !rows.contains_key(&player_id) {
            return Ok(Rank::Unranked);
        }
        // Most wins first; ties fall back to a stable id order.
        let mut board: Vec<(&PlayerId, u32)> = rows.iter().map(|(id, row)| (id, row.wins)).collect();
        board.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        let position = board
            .iter()
            .position(|(id, _)| **id == player_id)
            .map_or(Rank::Unranked, |index| Rank::Ranked(index as u32 + 1));
        Ok(position)
    }
}

// PostgreSQL-backed statistics store.
#[derive(Clone)]
pub struct PostgresStatsStore {
    pub db: PgPool,
}

impl PostgresStatsStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn backend(error: sqlx::Error) -> StatsError {
    StatsError::Backend(error.to_string())
}

#[async_trait]
impl StatsStore for PostgresStatsStore {
    async fn record_win(&self, player_id: PlayerId) -> Result<(), StatsError> {
        sqlx::query(
            r#"
            INSERT INTO player_stats (player_id, wins)
            VALUES ($1, 1)
            ON CONFLICT (player_id) DO UPDATE SET
                wins = player_stats.wins + 1
            "#,
        )
        .bind(player_id)
        .execute(&self.db)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn record_loss(&self, player_id: PlayerId) -> Result<(), StatsError> {
        sqlx::query(
            r#"
            INSERT INTO player_stats (player_id, losses)
            VALUES ($1, 1)
            ON CONFLICT (player_id) DO UPDATE SET
                losses = player_stats.losses + 1
            "#,
        )
        .bind(player_id)
        .execute(&self.db)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn update_best_survival_time(
        &self,
        player_id: PlayerId,
        survival_ms: u64,
    ) -> Result<(), StatsError> {
        let survival_ms = i64::try_from(survival_ms).unwrap_or(i64::MAX);
        sqlx::query(
            r#"
            INSERT INTO player_stats (player_id, best_survival_ms)
            VALUES ($1, $2)
            ON CONFLICT (player_id) DO UPDATE SET
                best_survival_ms = GREATEST(player_stats.best_survival_ms, EXCLUDED.best_survival_ms)
            "#,
        )
        .bind(player_id)
        .bind(survival_ms)
        .execute(&self.db)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn fetch_stats(&self, player_id: PlayerId) -> Result<Option<PlayerStats>, StatsError> {
        let row: Option<(i32, i32, i64)> = sqlx::query_as(
            r#"
            SELECT wins, losses, best_survival_ms
            FROM player_stats
            WHERE player_id = $1
            "#,
        )
        .bind(player_id)
        .fetch_optional(&self.db)
        .await
        .map_err(backend)?;

        Ok(row.map(|(wins, losses, best_survival_ms)| PlayerStats {
            wins: u32::try_from(wins).unwrap_or_default(),
            losses: u32::try_from(losses).unwrap_or_default(),
            best_survival_ms: u64::try_from(best_survival_ms).unwrap_or_default(),
        }))
    }

    async fn fetch_rank(&self, player_id: PlayerId) -> Result<Rank, StatsError> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT position
            FROM (
                SELECT player_id,
                       ROW_NUMBER() OVER (ORDER BY wins DESC, player_id) AS position
                FROM player_stats
            ) AS board
            WHERE player_id = $1
            "#,
        )
        .bind(player_id)
        .fetch_optional(&self.db)
        .await
        .map_err(backend)?;

        Ok(match row {
            Some((position,)) => Rank::Ranked(u32::try_from(position).unwrap_or(u32::MAX)),
            None => Rank::Unranked,
        })
    }
}

// System clock adapter used by the round engine.
#[derive(Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}
