// Domain-level errors for round workflows and their collaborators.

use thiserror::Error;

/// Failures reported by the map registry.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("map \"{0}\" is not configured")]
    NotFound(String),
    #[error("map \"{name}\" could not be loaded: {reason}")]
    Unloadable { name: String, reason: String },
}

/// Reasons the lobby countdown could not start a round.
#[derive(Debug, Error)]
pub enum RoundStartError {
    #[error("there is no configured game map")]
    NoMaps,
    #[error(transparent)]
    Map(#[from] MapError),
    #[error("there isn't a configured spawn point for the map \"{0}\"")]
    MissingSpawn(String),
}

/// Failures reported by the statistics backend.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("statistics backend failure: {0}")]
    Backend(String),
}

/// Failures while reading, editing or saving the map configuration file.
#[derive(Debug, Error)]
pub enum MapConfigError {
    #[error("failed to access map config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid map config: {0}")]
    Parse(String),
    #[error("failed to encode map config: {0}")]
    Encode(String),
    #[error("map \"{0}\" already exists")]
    DuplicateMap(String),
    #[error("map \"{0}\" is not configured")]
    UnknownMap(String),
}
