// LSS-LRTA*: bounded local search with heuristic learning.
//
// Each call to `LocalSearch::search` does three things:
//
//   1. A* from the agent toward the goal, ordered by `g + h` where `h` is the
//      learned heuristic, for at most `lookahead` expansions. It stops early
//      once the goal's local `g` is no larger than the smallest open `f`; the
//      goal itself is never expanded.
//   2. Dijkstra back-propagation over exactly the expanded (closed) set:
//      closed nodes are reset to `h = inf`, then the open frontier is popped
//      in order of `h` and each closed neighbor `p` takes
//      `h(p) = min(h(p), cost(p, s) + h(s))`. Learned values only grow, so
//      they stay admissible as long as edge costs do not drop.
//   3. The agent takes the first move toward the target: the goal if the
//      local search reached it, otherwise the best frontier node. When
//      nothing was expanded the move is a direct greedy step minimizing
//      `cost + h`.
//
// Learned values persist across calls in `LocalSearch`. An opened door can
// shorten true distances below a learned value, so callers must `forget()`
// whenever the environment reports changes.
//
// See also: `rtdstar.rs`, which falls back to this search when its global
// budget runs out.

use crate::graph::Graph;
use crate::planner::best_neighbor;
use crate::queue::cost_queue;
use crate::types::{INFINITY, NodeId};
use rustc_hash::{FxHashMap, FxHashSet};

/// The outcome of one local search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalPlan {
    /// First move toward `target`.
    pub next: NodeId,
    /// The goal, or the frontier node with the smallest `g + h`.
    pub target: NodeId,
    /// Nodes expanded by the A* phase.
    pub expanded: u64,
}

/// Learned heuristic table plus the search routine that updates it.
#[derive(Clone, Debug, Default)]
pub struct LocalSearch {
    learned: FxHashMap<NodeId, f64>,
}

impl LocalSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learned heuristic if one exists, otherwise the graph's estimate.
    pub fn h<G: Graph>(&self, graph: &G, node: NodeId, goal: NodeId) -> f64 {
        self.learned
            .get(&node)
            .copied()
            .unwrap_or_else(|| graph.heuristic(node, goal))
    }

    /// Drop every learned value.
    pub fn forget(&mut self) {
        self.learned.clear();
    }

    pub fn learned_len(&self) -> usize {
        self.learned.len()
    }

    /// Search, learn, and pick a move. `None` means the agent's component
    /// was exhausted without reaching the goal, or every neighbor is
    /// blocked.
    pub fn search<G: Graph>(
        &mut self,
        graph: &G,
        start: NodeId,
        goal: NodeId,
        lookahead: u64,
    ) -> Option<LocalPlan> {
        let mut g: FxHashMap<NodeId, f64> = FxHashMap::default();
        let mut parent: FxHashMap<NodeId, NodeId> = FxHashMap::default();
        let mut closed: Vec<NodeId> = Vec::new();
        let mut closed_set: FxHashSet<NodeId> = FxHashSet::default();
        let mut open = cost_queue::<NodeId>();

        g.insert(start, 0.0);
        open.upsert(start, self.h(graph, start, goal));

        let mut expanded = 0u64;
        while expanded < lookahead {
            let Some((_, &f_min)) = open.peek() else {
                break;
            };
            if g.get(&goal).copied().unwrap_or(INFINITY) <= f_min {
                break;
            }
            let Some((u, _)) = open.dequeue() else {
                break;
            };
            closed.push(u);
            closed_set.insert(u);
            expanded += 1;
            let g_u = g.get(&u).copied().unwrap_or(INFINITY);
            for &n in graph.neighbors(u) {
                if closed_set.contains(&n) {
                    continue;
                }
                let step = graph.cost(u, n);
                if step == INFINITY {
                    continue;
                }
                let tentative = g_u + step;
                if tentative < g.get(&n).copied().unwrap_or(INFINITY) {
                    g.insert(n, tentative);
                    parent.insert(n, u);
                    open.upsert(n, tentative + self.h(graph, n, goal));
                }
            }
        }

        let (top, &f_min) = open.peek()?;
        let target = if g.get(&goal).copied().unwrap_or(INFINITY) <= f_min {
            goal
        } else {
            top
        };

        if target == start {
            let next = best_neighbor(graph, start, |n| self.h(graph, n, goal))?;
            return Some(LocalPlan {
                next,
                target,
                expanded,
            });
        }

        // Back-propagate frontier values into the closed set.
        for &s in &closed {
            self.learned.insert(s, INFINITY);
        }
        let mut frontier = cost_queue::<NodeId>();
        for s in open.items() {
            frontier.upsert(s, self.h(graph, s, goal));
        }
        let mut remaining = closed_set;
        while !remaining.is_empty() {
            let Some((s, h_s)) = frontier.dequeue() else {
                break;
            };
            remaining.remove(&s);
            for &p in graph.neighbors(s) {
                if !remaining.contains(&p) {
                    continue;
                }
                let step = graph.cost(p, s);
                if step == INFINITY {
                    continue;
                }
                let candidate = step + h_s;
                if candidate < self.h(graph, p, goal) {
                    self.learned.insert(p, candidate);
                    frontier.upsert(p, candidate);
                }
            }
        }

        let mut next = target;
        while let Some(&prev) = parent.get(&next) {
            if prev == start {
                break;
            }
            next = prev;
        }
        Some(LocalPlan {
            next,
            target,
            expanded,
        })
    }
}
