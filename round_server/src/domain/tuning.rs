/// Gameplay tuning for the round cycle.
///
/// Keep this separate from runtime/server configuration (tick interval, buffer sizes, etc.).
/// Durations are in countdown steps of one second unless noted otherwise.

#[derive(Debug, Clone)]
pub struct RoundTuning {
    /// Engine ticks per countdown second.
    pub ticks_per_second: u32,

    /// Online players needed before the lobby countdown runs.
    pub min_players: usize,

    /// Lobby countdown length and the values that are announced.
    pub lobby_seconds: u32,
    pub lobby_milestones: Vec<u32>,

    /// Operator "start now" shortens the lobby countdown to this value.
    pub shorten_floor: u32,

    /// Invulnerability window after teleporting into the arena.
    pub protection_seconds: u32,

    /// Countdown between the win and the end-of-round hook.
    pub ending_seconds: u32,
    pub ending_milestones: Vec<u32>,

    /// Engine ticks between two AFK scans.
    pub afk_scan_ticks: u32,

    /// Horizontal speed (blocks per second, two decimals) of a player standing still.
    pub standing_speed: f64,
}

impl Default for RoundTuning {
    fn default() -> Self {
        Self {
            ticks_per_second: 20,
            min_players: 2,
            lobby_seconds: 60,
            lobby_milestones: vec![30, 10, 5, 3, 2, 1],
            shorten_floor: 10,
            protection_seconds: 5,
            ending_seconds: 10,
            ending_milestones: vec![10, 5, 3, 2, 1],
            afk_scan_ticks: 5,
            standing_speed: 0.0,
        }
    }
}
