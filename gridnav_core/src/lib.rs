// gridnav_core: incremental path planners for grids with toggling doors.
//
// This crate holds the search side of gridnav: the graph model, the open
// queue, five planners that share one `Planner` interface, and a navigator
// that drives a planner through an episode. It knows nothing about how doors
// are scheduled; any `ChangeSource` can flip obstacles between ticks.
//
// Module overview:
// - `types.rs`:      NodeId, GridPos, the two-part search Key, INFINITY.
// - `error.rs`:      QueueError, PlanError, NavError, ConfigError.
// - `queue.rs`:      IndexedQueue, a binary heap with an item -> index map (decrease-key, removal).
// - `graph.rs`:      Graph trait (cost + heuristic model) and the GridGraph arena.
// - `planner.rs`:    Planner trait, PlanStep, greedy successor selection.
// - `astar.rs`:      Static A* and the replan-from-scratch AStarPlanner.
// - `dstar_lite.rs`: D*-Lite with optional expansion budget.
// - `adstar.rs`:     Anytime D* with an adaptive inflation factor.
// - `lss_lrta.rs`:   LSS-LRTA* local search with learned heuristics.
// - `rtdstar.rs`:    RTD*, budgeted D*-Lite falling back to LSS-LRTA*.
// - `config.rs`:     GridnavConfig and per-planner settings.
// - `navigator.rs`:  ChangeSource trait, Navigator tick loop, RunMetrics.
//
// The companion crate `gridnav_env` supplies the door-schedule environment,
// map layouts and the comparison binary.
//
// **Critical constraint: determinism.** Given the same graph, changes and
// configuration, every planner makes the same moves. Hash maps are used for
// lookups only; nothing iterates one to decide a move.

pub mod adstar;
pub mod astar;
pub mod config;
pub mod dstar_lite;
pub mod error;
pub mod graph;
pub mod lss_lrta;
pub mod navigator;
pub mod planner;
pub mod queue;
pub mod rtdstar;
pub mod types;

pub use adstar::AdStar;
pub use astar::{AStarPlanner, PathResult, astar};
pub use config::{AdStarConfig, GridnavConfig, NavigatorConfig, RtdStarConfig};
pub use dstar_lite::{DStarLite, SearchOutcome};
pub use error::{ConfigError, NavError, PlanError, QueueError};
pub use graph::{Graph, GridGraph, GridNode, NodeKind};
pub use lss_lrta::{LocalPlan, LocalSearch};
pub use navigator::{
    ChangeSource, Navigator, NoChanges, RunMetrics, ScriptedChanges, StepOutcome, Termination,
};
pub use planner::{PlanStep, Planner};
pub use queue::{IndexedQueue, cost_queue};
pub use rtdstar::{MoveSource, RtdStar};
pub use types::{GridPos, INFINITY, Key, NodeId};
