//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode of startup, the run loop, and
//! snapshot files, so `main` can propagate with `?`.

use std::path::PathBuf;

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: zeroplayer_core::ConfigError,
    },

    /// Building, ticking, or restoring the simulation failed.
    #[error("simulation error: {source}")]
    Simulation {
        /// The underlying tick error.
        #[from]
        source: zeroplayer_core::TickError,
    },

    /// Reading or writing a snapshot file failed.
    #[error("snapshot file {path}: {source}")]
    SnapshotIo {
        /// The file involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A snapshot file is not valid JSON for a world snapshot.
    #[error("snapshot file {path} is malformed: {source}")]
    SnapshotFormat {
        /// The file involved.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}
