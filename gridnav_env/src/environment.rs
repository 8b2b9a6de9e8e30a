// Door-schedule playback as a `ChangeSource`.
//
// `DoorEnvironment` owns the obstacle blocks of a map and a `DoorSchedule`.
// Each navigator tick polls it once. Every `change_interval` ticks it
// applies the next frame, except while the agent stands on a door: the
// frame is then held back until the agent steps off, so a door never closes
// underneath the agent. Frame 0 is applied up front by
// `apply_initial_frame` to establish the starting door state.
//
// Applying a frame toggles all doors of the listed blocks in parallel with
// rayon over the node arena and collects the toggled ids. The ids are sorted
// afterwards so planners see the same change set regardless of thread
// scheduling.
//
// See also: `schedule.rs` for frame generation, `gridnav_core::navigator`
// for the `ChangeSource` trait.

use crate::blocks::ObstacleBlock;
use crate::schedule::{DoorSchedule, ScheduleError};
use gridnav_core::{ChangeSource, GridGraph, NodeId, NodeKind};
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Ticks between schedule frames.
    pub change_interval: u64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            change_interval: 20,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DoorEnvironment {
    blocks: Vec<ObstacleBlock>,
    schedule: DoorSchedule,
    config: EnvironmentConfig,
    /// Index of the next frame to apply.
    position: usize,
    /// Ticks since the last applied frame.
    timer: u64,
    frames_applied: u64,
    deferred: u64,
}

impl DoorEnvironment {
    pub fn new(
        blocks: Vec<ObstacleBlock>,
        schedule: DoorSchedule,
        config: EnvironmentConfig,
    ) -> Result<Self, ScheduleError> {
        schedule.validate(blocks.len())?;
        Ok(Self {
            blocks,
            schedule,
            config,
            position: 0,
            timer: 0,
            frames_applied: 0,
            deferred: 0,
        })
    }

    pub fn blocks(&self) -> &[ObstacleBlock] {
        &self.blocks
    }

    pub fn schedule(&self) -> &DoorSchedule {
        &self.schedule
    }

    /// Frames applied so far, including the initial one.
    pub fn frames_applied(&self) -> u64 {
        self.frames_applied
    }

    /// Ticks on which a due frame was held back because the agent stood on
    /// a door.
    pub fn deferred(&self) -> u64 {
        self.deferred
    }

    /// Apply frame 0. Call once before the episode starts.
    pub fn apply_initial_frame(&mut self, graph: &mut GridGraph) -> Vec<NodeId> {
        self.position = 0;
        self.timer = 0;
        self.advance(graph)
    }

    /// Apply the next frame and move the cursor, wrapping at the end.
    pub fn advance(&mut self, graph: &mut GridGraph) -> Vec<NodeId> {
        let frame = &self.schedule.frames[self.position];
        let targets: FxHashSet<NodeId> = frame
            .iter()
            .flat_map(|&b| self.blocks[b].doors.iter().copied())
            .collect();
        let changed = toggle_nodes(graph, &targets);
        self.position = (self.position + 1) % self.schedule.frames.len();
        self.frames_applied += 1;
        tracing::debug!(
            frame = self.frames_applied,
            blocks = frame.len(),
            nodes = changed.len(),
            "door frame applied"
        );
        changed
    }
}

/// Flip `obstacle` on every node in `targets`. Returns the flipped ids,
/// sorted.
pub fn toggle_nodes(graph: &mut GridGraph, targets: &FxHashSet<NodeId>) -> Vec<NodeId> {
    if targets.is_empty() {
        return Vec::new();
    }
    let mut changed: Vec<NodeId> = graph
        .nodes_mut()
        .par_iter_mut()
        .filter(|node| targets.contains(&node.id))
        .map(|node| {
            node.obstacle = !node.obstacle;
            node.id
        })
        .collect();
    changed.sort_unstable();
    changed
}

impl ChangeSource for DoorEnvironment {
    fn poll_changed_nodes(&mut self, graph: &mut GridGraph, agent: NodeId) -> Vec<NodeId> {
        if self.timer < self.config.change_interval {
            self.timer += 1;
            return Vec::new();
        }
        if graph.node(agent).kind == NodeKind::Door {
            self.deferred += 1;
            return Vec::new();
        }
        self.timer = 0;
        self.advance(graph)
    }
}
