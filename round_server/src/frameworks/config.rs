use crate::use_cases::EndAction;
use std::{env, path::PathBuf, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("ROUND_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3004)
}

pub fn maps_config_path() -> PathBuf {
    env::var("MAPS_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("maps.toml"))
}

// Statistics fall back to an in-memory store when unset.
pub fn stats_database_url() -> Option<String> {
    env::var("STATS_DATABASE_URL")
        .ok()
        .filter(|value| !value.trim().is_empty())
}

pub fn round_end_action() -> EndAction {
    match env::var("ROUND_END_ACTION").as_deref() {
        Ok("reset") => EndAction::Reset,
        Ok("shutdown") | Err(_) => EndAction::Shutdown,
        Ok(other) => {
            tracing::warn!(value = other, "unknown ROUND_END_ACTION; using shutdown");
            EndAction::Shutdown
        }
    }
}

pub const EVENT_CHANNEL_CAPACITY: usize = 1024;
pub const NOTICE_BROADCAST_CAPACITY: usize = 256;

// One engine tick; the gameplay tuning counts twenty of these per countdown second.
pub const TICK_INTERVAL: Duration = Duration::from_millis(1000 / 20);
