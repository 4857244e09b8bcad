use thiserror::Error;

/// Failures while building or configuring the pathfinding engine.
///
/// Path queries never return this: unreachable goals are reported through
/// [`PathStatus`](crate::PathStatus).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NavError {
    #[error("node dimension must be positive, got {0}")]
    InvalidNodeDimension(i32),
    #[error("world size is not defined")]
    WorldSizeUnset,
    #[error("invalid configuration: `{field}` {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },
    #[error("failed to spawn pathing worker: {0}")]
    WorkerSpawn(String),
}
