// Error types for gridnav.
//
// Two kinds of failure are kept apart. Domain outcomes (no path exists, the
// expansion budget ran out) are ordinary return values (see `SearchOutcome`
// in `dstar_lite.rs` and `PlanStep` in `planner.rs`). The enums here cover the
// rest: broken queue bookkeeping, an agent with nowhere to go, and anomalies
// spotted by the navigator. None of these are retried.

use crate::types::NodeId;
use thiserror::Error;

/// Contract violations on `IndexedQueue`.
///
/// Raised when a caller removes or re-prioritizes an item that is not queued
/// (or enqueues one twice). This means the engine's own bookkeeping is
/// inconsistent.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("item is not in the priority queue")]
    NotQueued,

    #[error("item is already in the priority queue")]
    AlreadyQueued,
}

/// Errors raised by a planner while choosing the next step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("agent at {node} has no neighbor with finite cost")]
    DisconnectedAgent { node: NodeId },

    #[error("planner used before initialize()")]
    NotInitialized,

    #[error("queue bookkeeping broken: {0}")]
    Queue(#[from] QueueError),
}

/// Errors raised by the `Navigator` while driving an episode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("agent stepped onto obstacle {node}")]
    SteppedOnObstacle { node: NodeId },

    #[error("planner proposed {to}, which is not adjacent to {from}")]
    InvalidStep { from: NodeId, to: NodeId },

    #[error("navigator used before initialize()")]
    NotInitialized,
}

/// Errors loading or saving configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
