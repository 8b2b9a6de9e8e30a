// The planner interface shared by every engine.
//
// A `Planner` is built for one `(start, goal)` pair via `begin()` and then
// driven one tick at a time through `step()`, which receives the nodes whose
// obstacle flag flipped since the previous tick. The planner tracks the
// agent's position itself: every `PlanStep::Move` it returns is assumed
// taken. Starting a new episode means calling `begin()` again, which is
// where all per-node search state is reset to its infinite defaults.
//
// See also: `navigator.rs` for the driver that owns the graph and the
// environment and feeds planners, `astar.rs`, `dstar_lite.rs`, `adstar.rs`,
// `rtdstar.rs` for the implementations.

use crate::error::PlanError;
use crate::graph::Graph;
use crate::types::{INFINITY, NodeId};
use serde::{Deserialize, Serialize};

/// What a planner decided for the current tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanStep {
    /// Move the agent to this neighbor.
    Move(NodeId),
    /// The agent is on the goal.
    Arrived,
    /// No path exists right now. The agent stays put.
    NoPath,
    /// Every edge out of the agent's node is infinite (it is boxed in by
    /// obstacles). The agent stays put.
    Disconnected,
}

pub trait Planner: Sized {
    /// Tunables for this planner.
    type Config: Clone + Default;

    /// Short identifier used in metrics output.
    const NAME: &'static str;

    /// Construct the planner for one navigation episode and do any initial
    /// planning that does not depend on the first tick.
    fn begin<G: Graph>(
        graph: &G,
        start: NodeId,
        goal: NodeId,
        config: &Self::Config,
    ) -> Result<Self, PlanError>;

    /// Absorb this tick's changed nodes and choose the next move.
    fn step<G: Graph>(&mut self, graph: &G, changed: &[NodeId]) -> Result<PlanStep, PlanError>;

    /// Where the planner believes the agent is.
    fn position(&self) -> NodeId;

    fn goal(&self) -> NodeId;

    /// Vertex expansions performed so far in this episode.
    fn expansions(&self) -> u64;
}

/// Pick the neighbor minimizing `cost(from, n) + estimate(n)`.
///
/// Ties go to the first neighbor in adjacency order. Returns `None` when
/// every candidate is infinite.
pub(crate) fn best_neighbor<G, F>(graph: &G, from: NodeId, mut estimate: F) -> Option<NodeId>
where
    G: Graph,
    F: FnMut(NodeId) -> f64,
{
    let mut best = None;
    let mut best_value = f64::INFINITY;
    for &n in graph.neighbors(from) {
        let value = graph.cost(from, n) + estimate(n);
        if value < best_value {
            best_value = value;
            best = Some(n);
        }
    }
    best
}

/// True when no finite-cost edge leaves `node`.
pub(crate) fn is_boxed_in<G: Graph>(graph: &G, node: NodeId) -> bool {
    graph
        .neighbors(node)
        .iter()
        .all(|&n| graph.cost(node, n) == INFINITY)
}
