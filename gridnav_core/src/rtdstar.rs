// Real-Time D* (RTD*): D*-Lite under a per-step expansion budget, with
// LSS-LRTA* as the fallback when the global search cannot finish in time.
//
// Each agent step has `expansion_limit` expansions to spend, split into a
// local share (`local_limit`, the LSS-LRTA* lookahead) and the remainder for
// the global D*-Lite search. A step:
//
//   1. absorbs changed nodes into the D*-Lite state and forgets every
//      learned local heuristic;
//   2. stays put with `PlanStep::Disconnected` if every edge out of the
//      agent is blocked;
//   3. resumes `compute_shortest_path` with the global budget;
//   4. moves by the global `g` if the search completed, stays put if it
//      proved there is no path, and otherwise asks the local search for a
//      move.
//
// The global search keeps its progress between steps, so a long search is
// spread over several agent moves. The agent's movement is folded into
// D*-Lite's `k_m` like any other move.
//
// See also: `dstar_lite.rs`, `lss_lrta.rs`, `config.rs` for `RtdStarConfig`.

use crate::config::RtdStarConfig;
use crate::dstar_lite::{DStarLite, SearchOutcome};
use crate::error::PlanError;
use crate::graph::Graph;
use crate::lss_lrta::LocalSearch;
use crate::planner::{PlanStep, Planner, is_boxed_in};
use crate::types::NodeId;
use serde::{Deserialize, Serialize};

/// Which search chose the most recent move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveSource {
    Global,
    Local,
}

#[derive(Clone, Debug)]
pub struct RtdStar {
    core: DStarLite,
    local: LocalSearch,
    global_limit: u64,
    local_limit: u64,
    local_expansions: u64,
    last_outcome: Option<SearchOutcome>,
    last_source: Option<MoveSource>,
}

impl RtdStar {
    pub fn global_limit(&self) -> u64 {
        self.global_limit
    }

    pub fn local_limit(&self) -> u64 {
        self.local_limit
    }

    /// Outcome of the bounded global search on the latest step.
    pub fn last_outcome(&self) -> Option<SearchOutcome> {
        self.last_outcome
    }

    pub fn last_source(&self) -> Option<MoveSource> {
        self.last_source
    }

    pub fn core(&self) -> &DStarLite {
        &self.core
    }
}

impl Planner for RtdStar {
    type Config = RtdStarConfig;

    const NAME: &'static str = "rtdstar";

    fn begin<G: Graph>(
        graph: &G,
        start: NodeId,
        goal: NodeId,
        config: &RtdStarConfig,
    ) -> Result<Self, PlanError> {
        Ok(Self {
            core: DStarLite::new(graph, start, goal)?,
            local: LocalSearch::new(),
            global_limit: config.global_limit(),
            local_limit: config.local_limit(),
            local_expansions: 0,
            last_outcome: None,
            last_source: None,
        })
    }

    fn step<G: Graph>(&mut self, graph: &G, changed: &[NodeId]) -> Result<PlanStep, PlanError> {
        let start = self.core.start();
        let goal = self.core.goal();
        if start == goal {
            return Ok(PlanStep::Arrived);
        }
        if !changed.is_empty() {
            self.core.update_changed_nodes(graph, changed)?;
            self.local.forget();
        }
        if is_boxed_in(graph, start) {
            return Ok(PlanStep::Disconnected);
        }

        let outcome = self
            .core
            .compute_shortest_path(graph, Some(self.global_limit))?;
        self.last_outcome = Some(outcome);

        let next = match outcome {
            SearchOutcome::Complete => {
                self.last_source = Some(MoveSource::Global);
                self.core.next_step(graph)?
            }
            SearchOutcome::NoPath => return Ok(PlanStep::NoPath),
            SearchOutcome::LimitReached => {
                let Some(plan) = self.local.search(graph, start, goal, self.local_limit) else {
                    tracing::debug!(node = %start, "local search found no move");
                    return Ok(PlanStep::NoPath);
                };
                self.local_expansions += plan.expanded;
                self.last_source = Some(MoveSource::Local);
                plan.next
            }
        };
        self.core.move_agent(next);
        Ok(PlanStep::Move(next))
    }

    fn position(&self) -> NodeId {
        self.core.start()
    }

    fn goal(&self) -> NodeId {
        self.core.goal()
    }

    fn expansions(&self) -> u64 {
        self.core.expansions() + self.local_expansions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::astar::astar;
    use crate::graph::GridGraph;
    use crate::types::{GridPos, INFINITY};

    fn at(graph: &GridGraph, x: i32, y: i32) -> NodeId {
        graph.node_at(GridPos::new(x, y)).unwrap()
    }

    #[test]
    fn budget_split_follows_config() {
        let graph = GridGraph::open(3, 3);
        let config = RtdStarConfig {
            expansion_limit: 10,
            local_ratio: 0.3,
        };
        let planner = RtdStar::begin(&graph, NodeId(0), NodeId(8), &config).unwrap();
        assert_eq!(planner.local_limit(), 3);
        assert_eq!(planner.global_limit(), 7);
    }

    #[test]
    fn zero_global_budget_delegates_to_local_search() {
        let graph = GridGraph::open(3, 3);
        let start = at(&graph, 0, 0);
        let goal = at(&graph, 2, 2);
        let config = RtdStarConfig {
            expansion_limit: 4,
            local_ratio: 1.0,
        };
        let mut planner = RtdStar::begin(&graph, start, goal, &config).unwrap();
        assert_eq!(planner.global_limit(), 0);

        let step = planner.step(&graph, &[]).unwrap();
        assert_eq!(planner.last_outcome(), Some(SearchOutcome::LimitReached));
        assert_eq!(planner.last_source(), Some(MoveSource::Local));
        match step {
            PlanStep::Move(next) => {
                assert!(graph.neighbors(start).contains(&next));
                assert!(graph.heuristic(next, goal) < graph.heuristic(start, goal));
            }
            other => panic!("expected a move, got {other:?}"),
        }
    }

    #[test]
    fn generous_budget_moves_by_global_search() {
        let graph = GridGraph::open(3, 3);
        let mut planner =
            RtdStar::begin(&graph, NodeId(0), NodeId(8), &RtdStarConfig::default()).unwrap();
        assert!(matches!(planner.step(&graph, &[]).unwrap(), PlanStep::Move(_)));
        assert_eq!(planner.last_outcome(), Some(SearchOutcome::Complete));
        assert_eq!(planner.last_source(), Some(MoveSource::Global));
    }

    #[test]
    fn tight_budget_still_reaches_goal() {
        let graph = GridGraph::from_ascii(
            "..........\n\
             .########.\n\
             .#......#.\n\
             .#.####.#.\n\
             .#.#..#.#.\n\
             ...#..#...\n\
             ..........",
        );
        let goal = at(&graph, 4, 4);
        let config = RtdStarConfig {
            expansion_limit: 4,
            local_ratio: 0.5,
        };
        let mut planner = RtdStar::begin(&graph, at(&graph, 0, 0), goal, &config).unwrap();
        let mut steps = 0;
        loop {
            match planner.step(&graph, &[]).unwrap() {
                PlanStep::Move(_) => steps += 1,
                PlanStep::Arrived => break,
                PlanStep::NoPath | PlanStep::Disconnected => panic!("map is connected"),
            }
            assert!(steps < 500, "agent did not reach the goal");
        }
        assert_eq!(planner.position(), goal);
    }

    #[test]
    fn door_change_is_absorbed() {
        let mut graph = GridGraph::from_ascii("..@.");
        let mut planner =
            RtdStar::begin(&graph, NodeId(0), NodeId(3), &RtdStarConfig::default()).unwrap();
        assert_eq!(planner.step(&graph, &[]).unwrap(), PlanStep::NoPath);

        graph.set_obstacle(NodeId(2), false);
        assert_eq!(
            planner.step(&graph, &[NodeId(2)]).unwrap(),
            PlanStep::Move(NodeId(1))
        );
        assert_eq!(planner.step(&graph, &[]).unwrap(), PlanStep::Move(NodeId(2)));
        assert_eq!(planner.step(&graph, &[]).unwrap(), PlanStep::Move(NodeId(3)));
        assert_eq!(planner.step(&graph, &[]).unwrap(), PlanStep::Arrived);
    }

    #[test]
    fn boxed_in_agent_is_disconnected() {
        let graph = GridGraph::from_ascii(
            ".@.\n\
             @.@\n\
             .@.",
        );
        let start = at(&graph, 1, 1);
        let mut planner =
            RtdStar::begin(&graph, start, at(&graph, 0, 0), &RtdStarConfig::default()).unwrap();
        assert_eq!(planner.step(&graph, &[]).unwrap(), PlanStep::Disconnected);
        assert_eq!(planner.position(), start);
    }

    #[test]
    fn learned_values_stay_admissible_after_a_door_closes() {
        // The agent starts in a pocket that opens away from the goal.
        let mut graph = GridGraph::from_ascii(
            ".....\n\
             .###.\n\
             .#.#.\n\
             .+...",
        );
        let goal = at(&graph, 2, 0);
        let door = at(&graph, 1, 3);
        let config = RtdStarConfig {
            expansion_limit: 4,
            local_ratio: 1.0,
        };
        let mut planner = RtdStar::begin(&graph, at(&graph, 2, 2), goal, &config).unwrap();
        assert_eq!(planner.step(&graph, &[]).unwrap(), PlanStep::Move(at(&graph, 2, 3)));
        assert!(planner.local.learned_len() > 0);

        graph.set_obstacle(door, true);
        assert!(matches!(
            planner.step(&graph, &[door]).unwrap(),
            PlanStep::Move(_)
        ));
        assert_eq!(planner.last_source(), Some(MoveSource::Local));
        assert!(planner.local.learned_len() > 0);
        // Every expansion so far came out of the local budget.
        assert_eq!(planner.core().expansions(), 0);

        for node in graph.nodes().iter().filter(|n| !n.obstacle) {
            let learned = planner.local.h(&graph, node.id, goal);
            let truth = astar(&graph, node.id, goal).map_or(INFINITY, |p| p.cost);
            assert!(learned <= truth, "h({}) = {learned} > {truth}", node.id);
        }
    }
}
