// gridnav_env: changing maps for the gridnav planners.
//
// This crate supplies the world side of a navigation episode: map layouts,
// door blocks, pre-generated door schedules and the `DoorEnvironment` that
// plays a schedule back as a `gridnav_core::ChangeSource`. It also ships the
// `gridnav_compare` binary, which runs every planner on one scenario and
// prints their metrics, and the `replanning` criterion bench.
//
// Module overview:
// - `rng.rs`:         ScheduleRng, a hand-rolled xoshiro256++ for schedules and layouts.
// - `blocks.rs`:      ObstacleBlock, grouping of adjacent door cells.
// - `schedule.rs`:    DoorSchedule generation and JSON persistence, ScheduleConfig.
// - `environment.rs`: DoorEnvironment, parallel door toggling on a fixed interval.
// - `layout.rs`:      Rooms-and-doors and scattered-obstacle map generators.
// - `scenario.rs`:    Scenario, a ready-to-run map + environment + endpoints.
//
// **Critical constraint: determinism.** A `ScheduleConfig` seed fixes the
// layout, the schedule and therefore every change a planner will see.

pub mod blocks;
pub mod environment;
pub mod layout;
pub mod rng;
pub mod scenario;
pub mod schedule;

pub use blocks::{ObstacleBlock, find_blocks, singletons};
pub use environment::{DoorEnvironment, EnvironmentConfig, toggle_nodes};
pub use layout::{RoomDoor, RoomLayout, ScatteredLayout};
pub use rng::ScheduleRng;
pub use scenario::{Scenario, ScenarioError};
pub use schedule::{DoorSchedule, ScheduleConfig, ScheduleError};
