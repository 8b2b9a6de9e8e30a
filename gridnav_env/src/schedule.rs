// Door schedules: pre-generated sequences of block toggles.
//
// A `DoorSchedule` is a list of frames; each frame lists the obstacle
// blocks that flip when it is applied. Frame 0 sets up the initial state
// (a share of the closed blocks opens) and later frames are the dynamic
// changes. Playback cycles back to frame 0 after the last frame.
//
// Generation walks the blocks once per frame and flips each with a
// probability that depends on its current state:
//
//   closed -> open:  (change_volume / 2) / closed_percent
//   open -> closed:  (change_volume / 2) / open_percent
//
// With the default 80/20 closed/open split this flips about
// `change_volume` percent of all blocks per frame while keeping the split
// roughly stable.
//
// Schedules are saved and loaded as JSON so benchmark runs can be repeated
// against the same sequence.
//
// See also: `environment.rs` for playback, `rng.rs` for the generator.

use crate::blocks::ObstacleBlock;
use crate::rng::ScheduleRng;
use gridnav_core::GridGraph;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("schedule I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("schedule JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame {frame} refers to block {block}, but only {count} blocks exist")]
    UnknownBlock {
        frame: usize,
        block: usize,
        count: usize,
    },

    #[error("schedule has no frames")]
    Empty,

    #[error("invalid schedule config: {0}")]
    InvalidConfig(String),
}

/// Parameters for `DoorSchedule::generate`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Number of frames including the initial one.
    pub frames: usize,
    /// Approximate percentage of blocks flipping per dynamic frame.
    pub change_volume: f64,
    /// Share of blocks open in steady state, in percent. Also the chance a
    /// block opens in frame 0.
    pub open_percent: f64,
    pub seed: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            frames: 20,
            change_volume: 1.0,
            open_percent: 20.0,
            seed: 0x5eed,
        }
    }
}

impl ScheduleConfig {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.frames == 0 {
            return Err(ScheduleError::InvalidConfig("frames must be positive".into()));
        }
        if self.open_percent.is_nan() || self.open_percent <= 0.0 || self.open_percent >= 100.0 {
            return Err(ScheduleError::InvalidConfig(format!(
                "open_percent must be in (0, 100), got {}",
                self.open_percent
            )));
        }
        if self.change_volume.is_nan() || self.change_volume < 0.0 {
            return Err(ScheduleError::InvalidConfig(format!(
                "change_volume must be non-negative, got {}",
                self.change_volume
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorSchedule {
    /// Block indices toggled by each frame.
    pub frames: Vec<Vec<usize>>,
}

impl DoorSchedule {
    /// Generate a schedule for `blocks`, starting from their current state in
    /// `graph`. The graph itself is not modified.
    pub fn generate(
        blocks: &[ObstacleBlock],
        graph: &GridGraph,
        config: &ScheduleConfig,
    ) -> Result<Self, ScheduleError> {
        config.validate()?;
        let mut rng = ScheduleRng::new(config.seed);
        let mut closed: Vec<bool> = blocks.iter().map(|b| b.is_obstacle(graph)).collect();
        let mut frames = Vec::with_capacity(config.frames);

        let open_chance = config.open_percent / 100.0;
        let initial: Vec<usize> = (0..blocks.len())
            .filter(|&i| closed[i] && rng.chance(open_chance))
            .collect();
        for &i in &initial {
            closed[i] = false;
        }
        frames.push(initial);

        let half = config.change_volume / 2.0;
        let p_open = half / (100.0 - config.open_percent);
        let p_close = half / config.open_percent;
        for _ in 1..config.frames {
            let mut frame = Vec::new();
            for (i, is_closed) in closed.iter_mut().enumerate() {
                let p = if *is_closed { p_open } else { p_close };
                if rng.chance(p) {
                    *is_closed = !*is_closed;
                    frame.push(i);
                }
            }
            frames.push(frame);
        }
        Ok(Self { frames })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Check that the schedule is non-empty and names only existing blocks.
    pub fn validate(&self, block_count: usize) -> Result<(), ScheduleError> {
        if self.frames.is_empty() {
            return Err(ScheduleError::Empty);
        }
        for (frame, blocks) in self.frames.iter().enumerate() {
            if let Some(&block) = blocks.iter().find(|&&b| b >= block_count) {
                return Err(ScheduleError::UnknownBlock {
                    frame,
                    block,
                    count: block_count,
                });
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, ScheduleError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ScheduleError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ScheduleError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ScheduleError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
