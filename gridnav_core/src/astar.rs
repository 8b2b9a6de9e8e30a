// Static A* search, the baseline every incremental planner is measured
// against.
//
// `astar()` is a one-shot best-first search: the open set is an
// `IndexedQueue` ordered by `f = g + h`, so a cheaper route to a queued node
// repositions it in place (decrease-key) instead of pushing a duplicate.
// Scores, parents and the closed set live in `Vec`s indexed by `NodeId`.
// A path is reconstructed from parent indices once the goal is dequeued.
//
// `AStarPlanner` wraps it as a `Planner`: it caches the last path and
// throws it away wholesale whenever the environment reports any change.
//
// See also: `dstar_lite.rs` for the incremental alternative, `queue.rs` for
// the open set.

use crate::error::PlanError;
use crate::graph::Graph;
use crate::planner::{PlanStep, Planner, is_boxed_in};
use crate::queue::cost_queue;
use crate::types::{INFINITY, NodeId};
use std::collections::VecDeque;

/// The result of a successful A* search.
#[derive(Clone, Debug, PartialEq)]
pub struct PathResult {
    /// Node ids from start to goal (inclusive).
    pub nodes: Vec<NodeId>,
    /// Total traversal cost.
    pub cost: f64,
    /// Nodes closed by the search.
    pub expansions: u64,
}

impl PathResult {
    /// Number of moves along the path.
    pub fn steps(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }
}

/// Find the shortest path from `start` to `goal`.
///
/// Returns `None` if the open set empties before the goal is reached.
pub fn astar<G: Graph>(graph: &G, start: NodeId, goal: NodeId) -> Option<PathResult> {
    let n = graph.node_count();
    if n == 0 {
        return None;
    }
    if start == goal {
        return Some(PathResult {
            nodes: vec![start],
            cost: 0.0,
            expansions: 0,
        });
    }

    let mut g_score = vec![INFINITY; n];
    let mut came_from: Vec<Option<NodeId>> = vec![None; n];
    let mut closed = vec![false; n];
    let mut expansions = 0u64;

    g_score[start.index()] = 0.0;
    let mut open = cost_queue::<NodeId>();
    open.upsert(start, graph.heuristic(start, goal));

    while let Some((current, _)) = open.dequeue() {
        let ci = current.index();
        if current == goal {
            return Some(PathResult {
                nodes: reconstruct_path(&came_from, start, goal),
                cost: g_score[ci],
                expansions,
            });
        }

        closed[ci] = true;
        expansions += 1;
        let current_g = g_score[ci];

        for &neighbor in graph.neighbors(current) {
            let ni = neighbor.index();
            if closed[ni] {
                continue;
            }
            let step = graph.cost(current, neighbor);
            if step == INFINITY {
                continue;
            }
            let tentative_g = current_g + step;
            if tentative_g < g_score[ni] {
                g_score[ni] = tentative_g;
                came_from[ni] = Some(current);
                open.upsert(neighbor, tentative_g + graph.heuristic(neighbor, goal));
            }
        }
    }

    None
}

fn reconstruct_path(came_from: &[Option<NodeId>], start: NodeId, goal: NodeId) -> Vec<NodeId> {
    let mut nodes = vec![goal];
    let mut current = goal;
    while current != start {
        match came_from[current.index()] {
            Some(prev) => {
                nodes.push(prev);
                current = prev;
            }
            None => break,
        }
    }
    nodes.reverse();
    nodes
}

/// A* re-run from scratch after every environment change.
#[derive(Clone, Debug)]
pub struct AStarPlanner {
    position: NodeId,
    goal: NodeId,
    /// Remaining moves of the current plan, excluding the current position.
    path: VecDeque<NodeId>,
    expansions: u64,
    searches: u64,
}

impl AStarPlanner {
    fn replan<G: Graph>(&mut self, graph: &G) -> bool {
        self.searches += 1;
        match astar(graph, self.position, self.goal) {
            Some(result) => {
                self.expansions += result.expansions;
                self.path = result.nodes.into_iter().skip(1).collect();
                true
            }
            None => {
                self.path.clear();
                false
            }
        }
    }

    /// Number of full searches run this episode.
    pub fn searches(&self) -> u64 {
        self.searches
    }
}

impl Planner for AStarPlanner {
    type Config = ();

    const NAME: &'static str = "astar";

    fn begin<G: Graph>(
        graph: &G,
        start: NodeId,
        goal: NodeId,
        _config: &(),
    ) -> Result<Self, PlanError> {
        let mut planner = Self {
            position: start,
            goal,
            path: VecDeque::new(),
            expansions: 0,
            searches: 0,
        };
        planner.replan(graph);
        Ok(planner)
    }

    fn step<G: Graph>(&mut self, graph: &G, changed: &[NodeId]) -> Result<PlanStep, PlanError> {
        if self.position == self.goal {
            return Ok(PlanStep::Arrived);
        }
        if is_boxed_in(graph, self.position) {
            self.path.clear();
            return Ok(PlanStep::Disconnected);
        }
        let stale = !changed.is_empty() || self.path.is_empty();
        if stale && !self.replan(graph) {
            return Ok(PlanStep::NoPath);
        }
        match self.path.pop_front() {
            Some(next) => {
                self.position = next;
                Ok(PlanStep::Move(next))
            }
            None => Ok(PlanStep::NoPath),
        }
    }

    fn position(&self) -> NodeId {
        self.position
    }

    fn goal(&self) -> NodeId {
        self.goal
    }

    fn expansions(&self) -> u64 {
        self.expansions
    }
}
