// Episode driver: owns the grid, the environment and one planner.
//
// A `Navigator` runs the tick loop shared by every planner:
//
//   1. poll the `ChangeSource`, which may flip door obstacles in the graph
//      and reports the ids it flipped;
//   2. hand those ids to `Planner::step` and time the call;
//   3. check the proposed move (must be adjacent, must not be an obstacle)
//      and apply it, accumulating path length, cost and revisits.
//
// `run` repeats this until the agent arrives, the step limit is hit, the
// agent has waited `max_wait_ticks` consecutive ticks without a path, or a
// planner or move error occurs. A wait that ends the run while the agent is
// boxed in by obstacles is reported as `Termination::Disconnected` rather
// than `NoPath`. The result is a serializable `RunMetrics`.
//
// Planning time is split two ways: `planning_ms` covers every planner call
// (including `begin`), `recompute_ms` only the `step` calls that received a
// non-empty change set.
//
// See also: `planner.rs` for the trait being driven, `gridnav_env` for the
// door-schedule `ChangeSource`.

use crate::config::NavigatorConfig;
use crate::error::NavError;
use crate::graph::{Graph, GridGraph};
use crate::planner::{PlanStep, Planner};
use crate::types::NodeId;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Something that changes the grid between ticks.
pub trait ChangeSource {
    /// Apply this tick's changes to `graph` and return the nodes whose
    /// obstacle flag flipped, sorted. `agent` is the agent's current node.
    fn poll_changed_nodes(&mut self, graph: &mut GridGraph, agent: NodeId) -> Vec<NodeId>;
}

/// A static world.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoChanges;

impl ChangeSource for NoChanges {
    fn poll_changed_nodes(&mut self, _graph: &mut GridGraph, _agent: NodeId) -> Vec<NodeId> {
        Vec::new()
    }
}

/// Toggles fixed node lists at fixed ticks. Tick 0 is the first poll.
#[derive(Clone, Debug, Default)]
pub struct ScriptedChanges {
    script: BTreeMap<u64, Vec<NodeId>>,
    tick: u64,
}

impl ScriptedChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle `nodes` when the given tick is polled.
    pub fn at(mut self, tick: u64, nodes: &[NodeId]) -> Self {
        self.script.entry(tick).or_default().extend_from_slice(nodes);
        self
    }
}

impl ChangeSource for ScriptedChanges {
    fn poll_changed_nodes(&mut self, graph: &mut GridGraph, _agent: NodeId) -> Vec<NodeId> {
        let mut changed = self.script.remove(&self.tick).unwrap_or_default();
        self.tick += 1;
        for &node in &changed {
            graph.toggle(node);
        }
        changed.sort_unstable();
        changed.dedup();
        changed
    }
}

/// What one tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    Moved(NodeId),
    /// No path this tick; the agent stayed put.
    Waiting,
    /// Every edge out of the agent is blocked; the agent stayed put.
    Disconnected,
    Arrived,
}

/// How a run ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    Arrived,
    NoPath,
    /// Waited too long while boxed in by obstacles.
    Disconnected,
    StepLimit,
    Error(String),
}

/// Per-run measurements.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunMetrics {
    pub planner: String,
    pub termination: Termination,
    /// Ticks executed, including waiting ticks.
    pub ticks: u64,
    pub path_length: u64,
    pub path_cost: f64,
    /// Moves onto a node the agent had already visited.
    pub revisits: u64,
    pub expansions: u64,
    /// Ticks whose change set was non-empty.
    pub replans: u64,
    /// Time spent inside the planner, including `begin`.
    pub planning_ms: f64,
    /// `planning_ms` divided by the number of planner calls.
    pub average_planning_ms: f64,
    /// Time spent in `step` calls that had to absorb changes.
    pub recompute_ms: f64,
    /// `recompute_ms` divided by `replans`.
    pub average_recompute_ms: f64,
}

/// Drives one planner through an episode on a (possibly changing) grid.
pub struct Navigator<P: Planner, E: ChangeSource> {
    graph: GridGraph,
    env: E,
    planner_config: P::Config,
    config: NavigatorConfig,
    planner: Option<P>,
    path: Vec<NodeId>,
    path_cost: f64,
    visits: FxHashMap<NodeId, u32>,
    revisits: u64,
    ticks: u64,
    waiting: u64,
    replans: u64,
    planner_calls: u64,
    planning: Duration,
    recompute: Duration,
}

impl<P: Planner, E: ChangeSource> Navigator<P, E> {
    pub fn new(graph: GridGraph, env: E, planner_config: P::Config, config: NavigatorConfig) -> Self {
        Self {
            graph,
            env,
            planner_config,
            config,
            planner: None,
            path: Vec::new(),
            path_cost: 0.0,
            visits: FxHashMap::default(),
            revisits: 0,
            ticks: 0,
            waiting: 0,
            replans: 0,
            planner_calls: 0,
            planning: Duration::ZERO,
            recompute: Duration::ZERO,
        }
    }

    pub fn graph(&self) -> &GridGraph {
        &self.graph
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn planner(&self) -> Option<&P> {
        self.planner.as_ref()
    }

    /// Nodes visited so far, starting with the start node.
    pub fn path(&self) -> &[NodeId] {
        &self.path
    }

    pub fn agent(&self) -> Option<NodeId> {
        self.planner.as_ref().map(|p| p.position())
    }

    /// Start a new episode. Resets every counter and the planner's state.
    pub fn initialize(&mut self, start: NodeId, goal: NodeId) -> Result<(), NavError> {
        self.path = vec![start];
        self.path_cost = 0.0;
        self.visits.clear();
        self.visits.insert(start, 1);
        self.revisits = 0;
        self.ticks = 0;
        self.waiting = 0;
        self.replans = 0;
        self.planner_calls = 0;
        self.planning = Duration::ZERO;
        self.recompute = Duration::ZERO;
        self.planner = None;

        let timer = Instant::now();
        let planner = P::begin(&self.graph, start, goal, &self.planner_config)?;
        self.planning += timer.elapsed();
        self.planner_calls += 1;
        self.planner = Some(planner);
        Ok(())
    }

    /// Advance one tick.
    pub fn step(&mut self) -> Result<StepOutcome, NavError> {
        let planner = self.planner.as_mut().ok_or(NavError::NotInitialized)?;
        let agent = planner.position();
        if agent == planner.goal() {
            return Ok(StepOutcome::Arrived);
        }
        self.ticks += 1;

        let changed = self.env.poll_changed_nodes(&mut self.graph, agent);
        if !changed.is_empty() {
            self.replans += 1;
        }

        let timer = Instant::now();
        let decision = planner.step(&self.graph, &changed);
        let elapsed = timer.elapsed();
        self.planning += elapsed;
        if !changed.is_empty() {
            self.recompute += elapsed;
        }
        self.planner_calls += 1;

        match decision? {
            PlanStep::Arrived => Ok(StepOutcome::Arrived),
            PlanStep::NoPath => {
                self.waiting += 1;
                Ok(StepOutcome::Waiting)
            }
            PlanStep::Disconnected => {
                self.waiting += 1;
                Ok(StepOutcome::Disconnected)
            }
            PlanStep::Move(next) => {
                if !self.graph.neighbors(agent).contains(&next) {
                    return Err(NavError::InvalidStep {
                        from: agent,
                        to: next,
                    });
                }
                if self.graph.is_obstacle(next) {
                    tracing::warn!(node = %next, planner = P::NAME, "stepped onto an obstacle");
                    return Err(NavError::SteppedOnObstacle { node: next });
                }
                self.waiting = 0;
                self.path_cost += self.graph.cost(agent, next);
                self.path.push(next);
                let seen = self.visits.entry(next).or_insert(0);
                if *seen > 0 {
                    self.revisits += 1;
                }
                *seen += 1;
                Ok(StepOutcome::Moved(next))
            }
        }
    }

    /// Step until the episode ends and report what happened.
    pub fn run(&mut self) -> RunMetrics {
        let termination = loop {
            if self.ticks >= self.config.max_steps {
                break Termination::StepLimit;
            }
            match self.step() {
                Ok(StepOutcome::Arrived) => break Termination::Arrived,
                Ok(StepOutcome::Moved(_)) => {}
                Ok(StepOutcome::Waiting) => {
                    if self.waiting > self.config.max_wait_ticks {
                        break Termination::NoPath;
                    }
                }
                Ok(StepOutcome::Disconnected) => {
                    if self.waiting > self.config.max_wait_ticks {
                        tracing::warn!(planner = P::NAME, node = ?self.agent(), "agent boxed in");
                        break Termination::Disconnected;
                    }
                }
                Err(e) => {
                    tracing::warn!(planner = P::NAME, error = %e, "episode aborted");
                    break Termination::Error(e.to_string());
                }
            }
        };
        let metrics = self.metrics(termination);
        tracing::debug!(
            planner = P::NAME,
            ticks = metrics.ticks,
            path_length = metrics.path_length,
            expansions = metrics.expansions,
            "episode finished"
        );
        metrics
    }

    /// Snapshot of the counters under the given termination.
    pub fn metrics(&self, termination: Termination) -> RunMetrics {
        let planning_ms = self.planning.as_secs_f64() * 1000.0;
        let recompute_ms = self.recompute.as_secs_f64() * 1000.0;
        RunMetrics {
            planner: P::NAME.to_string(),
            termination,
            ticks: self.ticks,
            path_length: self.path.len().saturating_sub(1) as u64,
            path_cost: self.path_cost,
            revisits: self.revisits,
            expansions: self.planner.as_ref().map_or(0, |p| p.expansions()),
            replans: self.replans,
            planning_ms,
            average_planning_ms: if self.planner_calls == 0 {
                0.0
            } else {
                planning_ms / self.planner_calls as f64
            },
            recompute_ms,
            average_recompute_ms: if self.replans == 0 {
                0.0
            } else {
                recompute_ms / self.replans as f64
            },
        }
    }
}
