// Scenarios: a map, its door environment and a start/goal pair.
//
// `Scenario::rooms` builds a rooms layout, carves a maze so every room stays
// reachable, and hands the remaining closed doors to the schedule as
// single-cell blocks. `Scenario::scattered` builds a random field and groups
// adjacent doors into blocks. Both apply the schedule's initial frame before
// returning, so the graph holds the episode's starting door state.
//
// A scenario is a template: `navigator()` clones the graph and environment,
// so every planner compared on one scenario sees exactly the same sequence
// of changes.
//
// See also: `layout.rs` for map generation, `environment.rs` for playback.

use crate::blocks::{ObstacleBlock, find_blocks, singletons};
use crate::environment::{DoorEnvironment, EnvironmentConfig};
use crate::layout::{RoomLayout, ScatteredLayout};
use crate::rng::ScheduleRng;
use crate::schedule::{DoorSchedule, ScheduleConfig, ScheduleError};
use gridnav_core::{GridGraph, GridPos, NavError, Navigator, NavigatorConfig, NodeId, Planner};
use thiserror::Error;

/// Seeds the layout stream apart from the schedule stream.
const LAYOUT_SEED_SALT: u64 = 0x1a70_u64;

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("no walkable cell at ({x}, {y})")]
    MissingCell { x: i32, y: i32 },
}

#[derive(Clone, Debug)]
pub struct Scenario {
    pub graph: GridGraph,
    pub environment: DoorEnvironment,
    pub start: NodeId,
    pub goal: NodeId,
}

impl Scenario {
    pub fn rooms(
        layout: &RoomLayout,
        schedule: &ScheduleConfig,
        environment: EnvironmentConfig,
    ) -> Result<Self, ScenarioError> {
        let mut graph = GridGraph::from_ascii(&layout.to_ascii());
        let mut rng = ScheduleRng::new(schedule.seed ^ LAYOUT_SEED_SALT);
        for i in layout.carve_maze(&mut rng) {
            let pos = layout.doors[i].position;
            let id = locate(&graph, pos)?;
            graph.set_obstacle(id, false);
        }
        let dynamic: Vec<NodeId> = graph
            .doors()
            .iter()
            .copied()
            .filter(|&d| graph.node(d).obstacle)
            .collect();
        let blocks = singletons(&dynamic);
        Self::assemble(graph, blocks, layout.start(), layout.goal(), schedule, environment)
    }

    pub fn scattered(
        layout: &ScatteredLayout,
        schedule: &ScheduleConfig,
        environment: EnvironmentConfig,
    ) -> Result<Self, ScenarioError> {
        let mut rng = ScheduleRng::new(schedule.seed ^ LAYOUT_SEED_SALT);
        let graph = GridGraph::from_ascii(&layout.to_ascii(&mut rng));
        let blocks = find_blocks(&graph);
        Self::assemble(graph, blocks, layout.start(), layout.goal(), schedule, environment)
    }

    /// Build a scenario from a hand-written ASCII map. All doors become
    /// blocks as `find_blocks` groups them.
    pub fn from_ascii(
        text: &str,
        start: GridPos,
        goal: GridPos,
        schedule: &ScheduleConfig,
        environment: EnvironmentConfig,
    ) -> Result<Self, ScenarioError> {
        let graph = GridGraph::from_ascii(text);
        let blocks = find_blocks(&graph);
        Self::assemble(graph, blocks, start, goal, schedule, environment)
    }

    fn assemble(
        mut graph: GridGraph,
        blocks: Vec<ObstacleBlock>,
        start: GridPos,
        goal: GridPos,
        schedule: &ScheduleConfig,
        environment: EnvironmentConfig,
    ) -> Result<Self, ScenarioError> {
        let start = locate(&graph, start)?;
        let goal = locate(&graph, goal)?;
        let frames = DoorSchedule::generate(&blocks, &graph, schedule)?;
        let mut environment = DoorEnvironment::new(blocks, frames, environment)?;
        environment.apply_initial_frame(&mut graph);
        tracing::debug!(
            nodes = graph.nodes().len(),
            doors = graph.doors().len(),
            blocks = environment.blocks().len(),
            "scenario ready"
        );
        Ok(Self {
            graph,
            environment,
            start,
            goal,
        })
    }

    /// A navigator over a fresh copy of this scenario, already initialized.
    pub fn navigator<P: Planner>(
        &self,
        planner_config: P::Config,
        config: NavigatorConfig,
    ) -> Result<Navigator<P, DoorEnvironment>, NavError> {
        let mut navigator = Navigator::new(
            self.graph.clone(),
            self.environment.clone(),
            planner_config,
            config,
        );
        navigator.initialize(self.start, self.goal)?;
        Ok(navigator)
    }
}

fn locate(graph: &GridGraph, pos: GridPos) -> Result<NodeId, ScenarioError> {
    graph
        .node_at(pos)
        .ok_or(ScenarioError::MissingCell { x: pos.x, y: pos.y })
}
