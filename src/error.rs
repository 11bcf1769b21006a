//! Error types for the scheduling simulator

use thiserror::Error;

/// Simulator error types
#[derive(Debug, Error)]
pub enum SimError {
    /// A core could not accept any further tasks during allocation
    #[error("allocation failure: {0}")]
    AllocationFailure(String),

    /// Admission left a core (or the whole fleet) with zero tasks
    #[error("admission produced an empty fleet: {0}")]
    AdmissionEmpty(String),

    /// A task missed its deadline (recorded, not fatal)
    #[error("task {pid} missed its deadline at tick {tick}")]
    DeadlineMiss {
        /// Task identifier
        pid: u32,
        /// Tick at which the miss was observed
        tick: u64,
    },

    /// A taskset record was discarded because one of its cores had no tasks
    #[error("taskset {0} discarded: core with zero tasks")]
    TasksetDiscarded(u32),

    /// Ingest reached end of file cleanly
    #[error("end of taskset stream")]
    IoEndOfStream,

    /// A taskset record was malformed or truncated
    #[error("malformed taskset record: {0}")]
    ParseShort(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML config parse error
    #[error("config parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parse error
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for simulator operations
pub type Result<T> = std::result::Result<T, SimError>;

impl SimError {
    /// Whether the outer driver loop can recover and continue to the next taskset
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::AllocationFailure(_))
    }
}
