//! Error types for path construction and configuration.

use thiserror::Error;

/// A waypoint list that cannot be turned into a drivable path.
///
/// Fatal at setup: a scene is never built from a path that fails these checks.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PathError {
    #[error("a path needs at least 2 waypoints, got {count}")]
    TooFewWaypoints { count: usize },

    #[error("waypoint {index} has a non-finite coordinate")]
    NonFiniteWaypoint { index: usize },

    /// Waypoint `index` repeats the one before it (for closed paths the
    /// last waypoint is also compared with the first).
    #[error("waypoint {index} duplicates its predecessor")]
    DuplicateWaypoint { index: usize },

    #[error("path has zero length")]
    ZeroLength,

    #[error("sample count must be positive")]
    EmptySampling,
}

/// A tunable outside its usable range.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("speed range is empty: min {min} > max {max}")]
    EmptySpeedRange { min: f64, max: f64 },

    #[error("initial speed {speed} lies outside [{min}, {max}]")]
    InitialSpeedOutOfRange { speed: f64, min: f64, max: f64 },

    #[error("lookahead of {lookahead} samples must be smaller than the sample count {sample_count}")]
    LookaheadTooLarge { lookahead: usize, sample_count: usize },

    #[error("{field} must be finite")]
    NonFinite { field: &'static str },
}

/// Everything that can stop a scene from being set up.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid path: {0}")]
    Path(#[from] PathError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to start the render loop: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("invalid script: {0}")]
    Script(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
