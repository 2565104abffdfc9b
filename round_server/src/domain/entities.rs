use serde::Serialize;

// Persisted per-player statistics record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PlayerStats {
    pub wins: u32,
    pub losses: u32,
    pub best_survival_ms: u64,
}

// Position of a player on the win leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "rank", rename_all = "snake_case")]
pub enum Rank {
    // 1-based position ordered by wins, highest first.
    Ranked(u32),
    // The player has no statistics record.
    Unranked,
}
