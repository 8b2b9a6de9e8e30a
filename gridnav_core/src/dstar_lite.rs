// D*-Lite: incremental shortest paths toward a fixed goal.
//
// The search runs backward from the goal. For every node it keeps `g` (best
// known cost to the goal) and `rhs` (one-step lookahead,
// `min over neighbors n of cost(s, n) + g(n)`, pinned to 0 at the goal). A
// node is consistent when `g == rhs`. Node state is implicit in
// `(g, rhs, queued)`:
//
//   new                  g = rhs = inf, not queued
//   queued-inconsistent  g != rhs, in the open queue ordered by `Key`
//   settled-consistent   g == rhs, not queued
//
// `compute_shortest_path` pops the minimum-key node `u` while the agent's
// node is inconsistent or the top key is below the agent's key:
//
//   - stale key (recomputing gives a larger key): re-key and push back;
//   - overconsistent (`g > rhs`, cost dropped): settle `g = rhs` and relax
//     every neighbor's `rhs` through `u`;
//   - otherwise (cost rose or never settled): `g = inf`, then recompute
//     `rhs` from scratch for `u` and for each neighbor whose old `rhs` went
//     through `u`.
//
// When the agent moves, `k_m` grows by the heuristic distance moved instead
// of re-keying the queue; keys computed earlier stay comparable because
// every new key carries the same offset.
//
// An optional expansion budget turns the loop into the bounded variant used
// by `rtdstar.rs`. Budget exhaustion is reported as
// `SearchOutcome::LimitReached`; an unreachable agent as
// `SearchOutcome::NoPath`. Neither is an error.
//
// See also: `adstar.rs` for the inflated anytime variant, `queue.rs` for the
// open queue.

use crate::error::{PlanError, QueueError};
use crate::graph::Graph;
use crate::planner::{PlanStep, Planner, best_neighbor, is_boxed_in};
use crate::queue::IndexedQueue;
use crate::types::{INFINITY, Key, NodeId};
use serde::{Deserialize, Serialize};

/// How a consistency pass ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchOutcome {
    /// The agent's node is consistent and no queued key is smaller.
    Complete,
    /// Converged with `rhs(start) = inf`.
    NoPath,
    /// The expansion budget ran out before convergence.
    LimitReached,
}

/// Incremental search state for one `(start, goal)` episode.
#[derive(Clone, Debug)]
pub struct DStarLite {
    start: NodeId,
    goal: NodeId,
    /// Agent position when `k_m` was last brought up to date.
    last: NodeId,
    k_m: f64,
    g: Vec<f64>,
    rhs: Vec<f64>,
    open: IndexedQueue<NodeId, Key>,
    expansions: u64,
    outcome: Option<SearchOutcome>,
}

impl DStarLite {
    /// Fresh engine: every node new, goal queued with `rhs = 0`.
    pub fn new<G: Graph>(graph: &G, start: NodeId, goal: NodeId) -> Result<Self, QueueError> {
        let n = graph.node_count();
        let mut engine = Self {
            start,
            goal,
            last: start,
            k_m: 0.0,
            g: vec![INFINITY; n],
            rhs: vec![INFINITY; n],
            open: IndexedQueue::new(),
            expansions: 0,
            outcome: None,
        };
        engine.rhs[goal.index()] = 0.0;
        let key = engine.calculate_key(graph, goal);
        engine.open.enqueue(goal, key)?;
        Ok(engine)
    }

    pub fn start(&self) -> NodeId {
        self.start
    }

    pub fn goal(&self) -> NodeId {
        self.goal
    }

    pub fn g(&self, node: NodeId) -> f64 {
        self.g[node.index()]
    }

    pub fn rhs(&self, node: NodeId) -> f64 {
        self.rhs[node.index()]
    }

    pub fn k_m(&self) -> f64 {
        self.k_m
    }

    pub fn expansions(&self) -> u64 {
        self.expansions
    }

    /// Outcome of the most recent `compute_shortest_path`, if any.
    pub fn outcome(&self) -> Option<SearchOutcome> {
        self.outcome
    }

    pub fn open_len(&self) -> usize {
        self.open.len()
    }

    pub fn is_consistent(&self, node: NodeId) -> bool {
        self.g[node.index()] == self.rhs[node.index()]
    }

    /// `(min(g, rhs) + h(s, start) + k_m, min(g, rhs))`.
    pub fn calculate_key<G: Graph>(&self, graph: &G, node: NodeId) -> Key {
        let i = node.index();
        let m = self.g[i].min(self.rhs[i]);
        Key::new(m + graph.heuristic(node, self.start) + self.k_m, m)
    }

    /// `min over neighbors n of cost(node, n) + g(n)`.
    fn lookahead<G: Graph>(&self, graph: &G, node: NodeId) -> f64 {
        graph
            .neighbors(node)
            .iter()
            .map(|&n| graph.cost(node, n) + self.g[n.index()])
            .fold(INFINITY, f64::min)
    }

    /// Bring `node`'s queue membership in line with its consistency.
    fn update_vertex<G: Graph>(&mut self, graph: &G, node: NodeId) -> Result<(), QueueError> {
        let consistent = self.is_consistent(node);
        let queued = self.open.contains(node);
        match (consistent, queued) {
            (false, true) => {
                let key = self.calculate_key(graph, node);
                self.open.update_priority(node, key)?;
            }
            (false, false) => {
                let key = self.calculate_key(graph, node);
                self.open.enqueue(node, key)?;
            }
            (true, true) => {
                self.open.remove(node)?;
            }
            (true, false) => {}
        }
        Ok(())
    }

    /// Fold the agent's movement since the last sync into `k_m`.
    fn sync_key_modifier<G: Graph>(&mut self, graph: &G) {
        if self.last != self.start {
            self.k_m += graph.heuristic(self.last, self.start);
            self.last = self.start;
        }
    }

    /// Move the agent. Keys are corrected lazily through `k_m` on the next
    /// pass.
    pub fn move_agent(&mut self, to: NodeId) {
        self.start = to;
    }

    /// Restore consistency along the agent's frontier.
    ///
    /// With `budget = Some(n)`, at most `n` nodes are popped before giving up
    /// with `LimitReached`; progress made so far is kept for the next call.
    pub fn compute_shortest_path<G: Graph>(
        &mut self,
        graph: &G,
        budget: Option<u64>,
    ) -> Result<SearchOutcome, QueueError> {
        self.sync_key_modifier(graph);
        let mut remaining = budget;

        loop {
            let Some((u, k_old)) = self.open.peek().map(|(n, k)| (n, *k)) else {
                break;
            };
            let start_key = self.calculate_key(graph, self.start);
            if self.is_consistent(self.start) && !k_old.less_than(&start_key) {
                break;
            }
            if let Some(left) = remaining.as_mut() {
                if *left == 0 {
                    self.outcome = Some(SearchOutcome::LimitReached);
                    return Ok(SearchOutcome::LimitReached);
                }
                *left -= 1;
            }
            self.expansions += 1;

            let ui = u.index();
            let k_new = self.calculate_key(graph, u);
            if k_old.less_than(&k_new) {
                self.open.update_priority(u, k_new)?;
            } else if self.g[ui] > self.rhs[ui] {
                self.g[ui] = self.rhs[ui];
                self.open.remove(u)?;
                let g_u = self.g[ui];
                for &s in graph.neighbors(u) {
                    if s != self.goal {
                        let si = s.index();
                        self.rhs[si] = self.rhs[si].min(graph.cost(s, u) + g_u);
                    }
                    self.update_vertex(graph, s)?;
                }
            } else {
                let g_old = self.g[ui];
                self.g[ui] = INFINITY;
                let affected = graph.neighbors(u).iter().copied().chain(std::iter::once(u));
                for s in affected {
                    let si = s.index();
                    let through_u = s == u || self.rhs[si] == graph.cost(s, u) + g_old;
                    if through_u && s != self.goal {
                        self.rhs[si] = self.lookahead(graph, s);
                    }
                    self.update_vertex(graph, s)?;
                }
            }
        }

        let outcome = if self.rhs[self.start.index()] == INFINITY {
            SearchOutcome::NoPath
        } else {
            SearchOutcome::Complete
        };
        self.outcome = Some(outcome);
        Ok(outcome)
    }

    /// Repair `rhs` around nodes whose obstacle flag flipped.
    ///
    /// Each toggled node and each of its neighbors gets its `rhs` recomputed
    /// from all of its neighbors (a node that just became an obstacle sees
    /// only infinite edges and drops to `inf`). Call `compute_shortest_path`
    /// afterwards.
    pub fn update_changed_nodes<G: Graph>(
        &mut self,
        graph: &G,
        changed: &[NodeId],
    ) -> Result<(), QueueError> {
        self.sync_key_modifier(graph);
        for &u in changed {
            if u != self.goal {
                self.rhs[u.index()] = self.lookahead(graph, u);
            }
            self.update_vertex(graph, u)?;
            for &v in graph.neighbors(u) {
                if v != self.goal {
                    self.rhs[v.index()] = self.lookahead(graph, v);
                }
                self.update_vertex(graph, v)?;
            }
        }
        Ok(())
    }

    /// The neighbor of the agent minimizing `cost + g`.
    pub fn next_step<G: Graph>(&self, graph: &G) -> Result<NodeId, PlanError> {
        best_neighbor(graph, self.start, |n| self.g[n.index()]).ok_or(
            PlanError::DisconnectedAgent {
                node: self.start,
            },
        )
    }

    /// Follow the greedy `cost + g` descent from the agent toward the goal.
    /// Stops early after `max_len` moves or at a dead end.
    pub fn extract_path<G: Graph>(&self, graph: &G, max_len: usize) -> Vec<NodeId> {
        let mut path = vec![self.start];
        let mut current = self.start;
        while current != self.goal && path.len() <= max_len {
            match best_neighbor(graph, current, |n| self.g[n.index()]) {
                Some(next) => {
                    path.push(next);
                    current = next;
                }
                None => break,
            }
        }
        path
    }
}

impl Planner for DStarLite {
    type Config = ();

    const NAME: &'static str = "dstar_lite";

    fn begin<G: Graph>(
        graph: &G,
        start: NodeId,
        goal: NodeId,
        _config: &(),
    ) -> Result<Self, PlanError> {
        let mut engine = DStarLite::new(graph, start, goal)?;
        engine.compute_shortest_path(graph, None)?;
        Ok(engine)
    }

    fn step<G: Graph>(&mut self, graph: &G, changed: &[NodeId]) -> Result<PlanStep, PlanError> {
        if self.start == self.goal {
            return Ok(PlanStep::Arrived);
        }
        if !changed.is_empty() {
            let before = self.expansions;
            self.update_changed_nodes(graph, changed)?;
            self.compute_shortest_path(graph, None)?;
            tracing::debug!(
                changed = changed.len(),
                expansions = self.expansions - before,
                "d*-lite repaired"
            );
        }
        if is_boxed_in(graph, self.start) {
            return Ok(PlanStep::Disconnected);
        }
        if self.rhs(self.start) == INFINITY {
            return Ok(PlanStep::NoPath);
        }
        let next = self.next_step(graph)?;
        self.move_agent(next);
        Ok(PlanStep::Move(next))
    }

    fn position(&self) -> NodeId {
        self.start
    }

    fn goal(&self) -> NodeId {
        self.goal
    }

    fn expansions(&self) -> u64 {
        self.expansions
    }
}
