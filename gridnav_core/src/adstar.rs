// Anytime D* (AD*): an inflated-heuristic planner that repairs itself.
//
// AD* keeps D*-Lite's backward `g`/`rhs` bookkeeping but inflates the
// heuristic in the keys of overconsistent nodes by `epsilon >= 1`:
//
//   key(s) = [rhs + eps * h(s, start), rhs]   if g > rhs
//          = [g + h(s, start), g]             otherwise
//
// Only overconsistent keys are inflated. An underconsistent node (`g < rhs`,
// its cost just rose) keeps the plain `g + h` key so it is raised before
// the agent's own key can end a pass; inflating it too (`min(g, rhs) +
// eps * h` on both branches) lets a pass stop while `g(start)` still
// reflects a path through a door that has since closed.
//
// The resulting path costs at most `eps` times the optimum. Within one pass
// each node is expanded as overconsistent at most once: a node that becomes
// inconsistent again after being CLOSED is parked in INCONS instead of the
// open queue. Between passes (`replan`):
//
//   1. changed nodes and their neighbors get `update_state`;
//   2. epsilon moves: `+step_up` (capped at `max_epsilon`) when the share of
//      changed doors exceeds `significant_change_ratio`, otherwise
//      `-step_down` toward 1;
//   3. INCONS is merged into OPEN and every open key is recomputed against
//      the current agent position and epsilon;
//   4. CLOSED and INCONS are cleared and `improve_path` runs.
//
// Keys are always rebuilt wholesale before a pass, so agent movement needs no
// `k_m` correction here. The planner replans every tick while `eps > 1` and
// whenever changes are reported; once `eps` reaches 1 with no changes it just
// follows `g`.
//
// **Critical constraint: determinism.** INCONS is a `Vec` with a membership
// flag, so merge order depends only on insertion order.
//
// See also: `dstar_lite.rs` for the non-inflated engine, `config.rs` for
// `AdStarConfig`.

use crate::config::AdStarConfig;
use crate::error::{PlanError, QueueError};
use crate::graph::Graph;
use crate::planner::{PlanStep, Planner, best_neighbor, is_boxed_in};
use crate::queue::IndexedQueue;
use crate::types::{INFINITY, Key, NodeId};

fn inflated_key<G: Graph>(
    graph: &G,
    g: &[f64],
    rhs: &[f64],
    epsilon: f64,
    start: NodeId,
    node: NodeId,
) -> Key {
    let i = node.index();
    let h = graph.heuristic(node, start);
    if g[i] > rhs[i] {
        Key::new(rhs[i] + epsilon * h, rhs[i])
    } else {
        Key::new(g[i] + h, g[i])
    }
}

#[derive(Clone, Debug)]
pub struct AdStar {
    start: NodeId,
    goal: NodeId,
    epsilon: f64,
    config: AdStarConfig,
    g: Vec<f64>,
    rhs: Vec<f64>,
    open: IndexedQueue<NodeId, Key>,
    closed: Vec<bool>,
    incons: Vec<NodeId>,
    in_incons: Vec<bool>,
    expansions: u64,
    passes: u64,
}

impl AdStar {
    pub fn new<G: Graph>(
        graph: &G,
        start: NodeId,
        goal: NodeId,
        config: &AdStarConfig,
    ) -> Result<Self, QueueError> {
        let n = graph.node_count();
        let mut engine = Self {
            start,
            goal,
            epsilon: config.initial_epsilon,
            config: config.clone(),
            g: vec![INFINITY; n],
            rhs: vec![INFINITY; n],
            open: IndexedQueue::new(),
            closed: vec![false; n],
            incons: Vec::new(),
            in_incons: vec![false; n],
            expansions: 0,
            passes: 0,
        };
        engine.rhs[goal.index()] = 0.0;
        let key = engine.key(graph, goal);
        engine.open.enqueue(goal, key)?;
        Ok(engine)
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Cost of the current solution, `g(start)`. At most `epsilon` times the
    /// optimum once a pass has completed.
    pub fn solution_cost(&self) -> f64 {
        self.g[self.start.index()]
    }

    pub fn g(&self, node: NodeId) -> f64 {
        self.g[node.index()]
    }

    pub fn rhs(&self, node: NodeId) -> f64 {
        self.rhs[node.index()]
    }

    /// Number of completed `improve_path` passes.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn move_agent(&mut self, to: NodeId) {
        self.start = to;
    }

    fn key<G: Graph>(&self, graph: &G, node: NodeId) -> Key {
        inflated_key(graph, &self.g, &self.rhs, self.epsilon, self.start, node)
    }

    fn is_consistent(&self, node: NodeId) -> bool {
        self.g[node.index()] == self.rhs[node.index()]
    }

    /// Recompute `rhs(node)` and file the node into OPEN, INCONS or nowhere.
    pub fn update_state<G: Graph>(&mut self, graph: &G, node: NodeId) -> Result<(), QueueError> {
        let i = node.index();
        if node != self.goal {
            self.rhs[i] = graph
                .neighbors(node)
                .iter()
                .map(|&n| graph.cost(node, n) + self.g[n.index()])
                .fold(INFINITY, f64::min);
        }
        if self.open.contains(node) {
            self.open.remove(node)?;
        }
        if !self.is_consistent(node) {
            if !self.closed[i] {
                let key = self.key(graph, node);
                self.open.enqueue(node, key)?;
            } else if !self.in_incons[i] {
                self.in_incons[i] = true;
                self.incons.push(node);
            }
        }
        Ok(())
    }

    /// One AD* pass at the current epsilon.
    pub fn improve_path<G: Graph>(&mut self, graph: &G) -> Result<(), QueueError> {
        loop {
            let Some((s, top)) = self.open.peek().map(|(n, k)| (n, *k)) else {
                break;
            };
            let start_key = self.key(graph, self.start);
            if !top.less_than(&start_key) && self.is_consistent(self.start) {
                break;
            }
            self.open.remove(s)?;
            self.expansions += 1;
            let si = s.index();
            if self.g[si] > self.rhs[si] {
                self.g[si] = self.rhs[si];
                self.closed[si] = true;
                for &pred in graph.neighbors(s) {
                    self.update_state(graph, pred)?;
                }
            } else {
                self.g[si] = INFINITY;
                for &pred in graph.neighbors(s) {
                    self.update_state(graph, pred)?;
                }
                self.update_state(graph, s)?;
            }
        }
        self.passes += 1;
        Ok(())
    }

    /// Absorb `changed`, adjust epsilon, and run another pass.
    ///
    /// Returns whether the change was treated as significant.
    pub fn replan<G: Graph>(&mut self, graph: &G, changed: &[NodeId]) -> Result<bool, QueueError> {
        for &node in changed {
            self.update_state(graph, node)?;
            for &n in graph.neighbors(node) {
                self.update_state(graph, n)?;
            }
        }

        let doors = graph.door_count().max(1) as f64;
        let ratio = changed.len() as f64 / doors;
        let significant = ratio > self.config.significant_change_ratio;
        if significant {
            self.epsilon = (self.epsilon + self.config.step_up).min(self.config.max_epsilon);
        } else if self.epsilon > 1.0 {
            self.epsilon = (self.epsilon - self.config.step_down).max(1.0);
        }

        for node in std::mem::take(&mut self.incons) {
            let i = node.index();
            self.in_incons[i] = false;
            if !self.is_consistent(node) {
                let key = self.key(graph, node);
                self.open.upsert(node, key);
            }
        }
        let (g, rhs, epsilon, start) = (&self.g, &self.rhs, self.epsilon, self.start);
        self.open
            .rekey_all(|node, _| inflated_key(graph, g, rhs, epsilon, start, node));
        self.closed.fill(false);

        let before = self.expansions;
        self.improve_path(graph)?;
        tracing::debug!(
            epsilon = self.epsilon,
            changed = changed.len(),
            expansions = self.expansions - before,
            cost = self.solution_cost(),
            "ad* pass"
        );
        Ok(significant)
    }

    pub fn next_step<G: Graph>(&self, graph: &G) -> Result<NodeId, PlanError> {
        best_neighbor(graph, self.start, |n| self.g[n.index()]).ok_or(
            PlanError::DisconnectedAgent {
                node: self.start,
            },
        )
    }
}

impl Planner for AdStar {
    type Config = AdStarConfig;

    const NAME: &'static str = "adstar";

    fn begin<G: Graph>(
        graph: &G,
        start: NodeId,
        goal: NodeId,
        config: &AdStarConfig,
    ) -> Result<Self, PlanError> {
        let mut engine = AdStar::new(graph, start, goal, config)?;
        engine.improve_path(graph)?;
        Ok(engine)
    }

    fn step<G: Graph>(&mut self, graph: &G, changed: &[NodeId]) -> Result<PlanStep, PlanError> {
        if self.start == self.goal {
            return Ok(PlanStep::Arrived);
        }
        if self.epsilon > 1.0 || !changed.is_empty() {
            self.replan(graph, changed)?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::astar::astar;
    use crate::graph::GridGraph;
    use crate::types::GridPos;

    const MAZE: &str = "\
........#.....
.######.#.###.
.#......#...#.
.#.########.#.
.#..........#.
.##########.#.
..............";

    fn at(graph: &GridGraph, x: i32, y: i32) -> NodeId {
        graph.node_at(GridPos::new(x, y)).unwrap()
    }

    #[test]
    fn first_pass_is_within_epsilon_bound() {
        let graph = GridGraph::from_ascii(MAZE);
        let start = at(&graph, 0, 0);
        let goal = at(&graph, 13, 0);
        let engine = AdStar::begin(&graph, start, goal, &AdStarConfig::default()).unwrap();
        let optimal = astar(&graph, start, goal).unwrap().cost;
        assert_eq!(engine.epsilon(), 2.5);
        assert!(engine.solution_cost() >= optimal);
        assert!(engine.solution_cost() <= 2.5 * optimal);
    }

    #[test]
    fn cost_never_increases_as_epsilon_drops() {
        let graph = GridGraph::from_ascii(MAZE);
        let start = at(&graph, 2, 2);
        let goal = at(&graph, 13, 6);
        let mut engine = AdStar::begin(&graph, start, goal, &AdStarConfig::default()).unwrap();
        let mut previous = engine.solution_cost();
        assert!(previous.is_finite());
        while engine.epsilon() > 1.0 {
            engine.replan(&graph, &[]).unwrap();
            let cost = engine.solution_cost();
            assert!(cost <= previous, "cost rose from {previous} to {cost}");
            previous = cost;
        }
        assert_eq!(engine.epsilon(), 1.0);
        assert_eq!(previous, astar(&graph, start, goal).unwrap().cost);
    }

    #[test]
    fn significant_change_raises_epsilon() {
        let mut graph = GridGraph::from_ascii(
            "...\n\
             .+.\n\
             ...",
        );
        let start = at(&graph, 1, 0);
        let goal = at(&graph, 1, 2);
        let door = at(&graph, 1, 1);
        let config = AdStarConfig {
            initial_epsilon: 1.0,
            ..AdStarConfig::default()
        };
        let mut engine = AdStar::begin(&graph, start, goal, &config).unwrap();
        assert_eq!(engine.solution_cost(), 2.0);

        graph.set_obstacle(door, true);
        assert!(engine.replan(&graph, &[door]).unwrap());
        assert_eq!(engine.epsilon(), 2.0);
        assert!(engine.solution_cost().is_finite());
        assert!(engine.solution_cost() <= 2.0 * 4.0);

        while engine.epsilon() > 1.0 {
            assert!(!engine.replan(&graph, &[]).unwrap());
        }
        assert_eq!(engine.solution_cost(), 4.0);
    }

    #[test]
    fn epsilon_is_capped() {
        let mut graph = GridGraph::from_ascii("+.");
        let config = AdStarConfig {
            initial_epsilon: 4.5,
            ..AdStarConfig::default()
        };
        let mut engine = AdStar::begin(&graph, NodeId(1), NodeId(1), &config).unwrap();
        graph.set_obstacle(NodeId(0), true);
        engine.replan(&graph, &[NodeId(0)]).unwrap();
        assert_eq!(engine.epsilon(), 5.0);
    }

    #[test]
    fn planner_reaches_goal_with_optimal_tail() {
        let graph = GridGraph::from_ascii(MAZE);
        let start = at(&graph, 0, 0);
        let goal = at(&graph, 13, 0);
        let mut planner = AdStar::begin(&graph, start, goal, &AdStarConfig::default()).unwrap();
        let mut steps = 0;
        loop {
            match planner.step(&graph, &[]).unwrap() {
                PlanStep::Move(_) => steps += 1,
                PlanStep::Arrived => break,
                PlanStep::NoPath | PlanStep::Disconnected => panic!("maze is connected"),
            }
            assert!(steps < 200);
        }
        assert_eq!(planner.position(), goal);
        assert_eq!(planner.epsilon(), 1.0);
    }

    #[test]
    fn walled_off_goal_is_no_path() {
        let graph = GridGraph::from_ascii("..@.");
        let mut planner =
            AdStar::begin(&graph, NodeId(0), NodeId(3), &AdStarConfig::default()).unwrap();
        assert_eq!(planner.step(&graph, &[]).unwrap(), PlanStep::NoPath);
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
            AdStar::begin(&graph, start, at(&graph, 2, 2), &AdStarConfig::default()).unwrap();
        assert_eq!(planner.step(&graph, &[]).unwrap(), PlanStep::Disconnected);
        assert_eq!(planner.position(), start);
    }

    #[test]
    fn exact_epsilon_walks_an_optimal_path() {
        let graph = GridGraph::open(3, 3);
        let start = at(&graph, 0, 0);
        let goal = at(&graph, 2, 2);
        let config = AdStarConfig {
            initial_epsilon: 1.0,
            ..AdStarConfig::default()
        };
        let mut planner = AdStar::begin(&graph, start, goal, &config).unwrap();
        assert_eq!(planner.solution_cost(), 4.0);
        assert_eq!(planner.passes(), 1);

        let mut steps = 0;
        while let PlanStep::Move(_) = planner.step(&graph, &[]).unwrap() {
            steps += 1;
            assert!(steps <= 4);
        }
        assert_eq!(steps, 4);
        assert_eq!(planner.position(), goal);
        // Nothing changed and epsilon is already 1, so no further passes ran.
        assert_eq!(planner.passes(), 1);
    }

    #[test]
    fn only_overconsistent_keys_are_inflated() {
        let graph = GridGraph::open(4, 1);
        let config = AdStarConfig::default();
        let mut engine = AdStar::new(&graph, NodeId(0), NodeId(3), &config).unwrap();
        let node = NodeId(3);

        // Underconsistent: g = 2 < rhs = 5, h = 3.
        engine.g[3] = 2.0;
        engine.rhs[3] = 5.0;
        assert_eq!(engine.key(&graph, node), Key::new(5.0, 2.0));

        // Overconsistent: g = inf > rhs = 2.
        engine.g[3] = INFINITY;
        engine.rhs[3] = 2.0;
        assert_eq!(engine.key(&graph, node), Key::new(2.0 + 2.5 * 3.0, 2.0));
    }

    #[test]
    fn closing_a_door_on_the_path_raises_solution_cost() {
        // The only detour runs around the wall: 8 moves become 12.
        let mut graph = GridGraph::from_ascii(
            "....+....\n\
             .#######.\n\
             .........",
        );
        let start = at(&graph, 0, 0);
        let goal = at(&graph, 8, 0);
        let door = at(&graph, 4, 0);
        let mut engine = AdStar::begin(&graph, start, goal, &AdStarConfig::default()).unwrap();
        assert_eq!(engine.solution_cost(), 8.0);

        graph.set_obstacle(door, true);
        engine.replan(&graph, &[door]).unwrap();
        let optimal = astar(&graph, start, goal).unwrap().cost;
        assert_eq!(optimal, 12.0);
        assert!(engine.solution_cost() >= optimal, "stale cost {}", engine.solution_cost());
        assert!(engine.solution_cost() <= engine.epsilon() * optimal);
        assert_eq!(engine.next_step(&graph), Ok(at(&graph, 0, 1)));
    }
}
