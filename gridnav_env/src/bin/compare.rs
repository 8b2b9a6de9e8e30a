// gridnav_compare: run every planner on one changing map and print metrics.
//
// Builds a scenario (rooms or scattered layout plus a generated door
// schedule), then drives A*, D*-Lite, AD* and RTD* through identical copies
// of it and prints one row per planner. With `--json` the rows are printed
// as a JSON array of `RunMetrics` instead.
//
// Usage:
//   cargo run --release -p gridnav_env --bin gridnav_compare -- [OPTIONS]
//     --layout rooms|scattered   Map kind (default: rooms)
//     --rooms <N>                Rooms per side (default: 8)
//     --room-size <N>            Room side including wall (default: 16)
//     --width <N> --height <N>   Scattered map size (default: 64 x 64)
//     --seed <N>                 Layout and schedule seed (default: 24301)
//     --volume <PCT>             Percent of doors flipping per frame (default: 1)
//     --frames <N>               Schedule length (default: 20)
//     --interval <N>             Ticks between frames (default: 20)
//     --config <PATH>            GridnavConfig JSON for planner settings
//     --save-schedule <PATH>     Write the generated schedule as JSON
//     --json                     Print metrics as JSON

use gridnav_core::{
    AStarPlanner, AdStar, DStarLite, GridnavConfig, NavigatorConfig, Planner, RunMetrics, RtdStar,
    Termination,
};
use gridnav_env::{EnvironmentConfig, RoomLayout, ScatteredLayout, Scenario, ScheduleConfig};
use std::path::Path;
use std::str::FromStr;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let layout_name: String = parse_flag(&args, "--layout").unwrap_or_else(|| "rooms".to_string());
    let defaults = ScheduleConfig::default();
    let schedule = ScheduleConfig {
        frames: parse_flag(&args, "--frames").unwrap_or(defaults.frames),
        change_volume: parse_flag(&args, "--volume").unwrap_or(defaults.change_volume),
        seed: parse_flag(&args, "--seed").unwrap_or(defaults.seed),
        ..defaults
    };
    let environment = EnvironmentConfig {
        change_interval: parse_flag(&args, "--interval")
            .unwrap_or(EnvironmentConfig::default().change_interval),
    };
    let json = args.iter().any(|a| a == "--json");

    let config = match parse_flag::<String>(&args, "--config") {
        Some(path) => load_config(&path),
        None => GridnavConfig::default(),
    };

    let scenario = match layout_name.as_str() {
        "rooms" => {
            let layout = RoomLayout::new(
                parse_flag(&args, "--rooms").unwrap_or(8),
                parse_flag(&args, "--room-size").unwrap_or(16),
            );
            Scenario::rooms(&layout, &schedule, environment)
        }
        "scattered" => {
            let defaults = ScatteredLayout::default();
            let layout = ScatteredLayout {
                width: parse_flag(&args, "--width").unwrap_or(defaults.width),
                height: parse_flag(&args, "--height").unwrap_or(defaults.height),
                ..defaults
            };
            Scenario::scattered(&layout, &schedule, environment)
        }
        other => {
            eprintln!("Unknown layout '{}'. Expected 'rooms' or 'scattered'.", other);
            std::process::exit(1);
        }
    };
    let scenario = match scenario {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to build scenario: {e}");
            std::process::exit(1);
        }
    };

    if let Some(path) = parse_flag::<String>(&args, "--save-schedule") {
        if let Err(e) = scenario.environment.schedule().save(Path::new(&path)) {
            eprintln!("Error writing schedule: {e}");
            std::process::exit(1);
        }
    }

    if !json {
        println!("=== gridnav planner comparison ===");
        println!(
            "Layout: {} ({} x {}, {} doors, {} scheduled blocks)",
            layout_name,
            scenario.graph.width(),
            scenario.graph.height(),
            scenario.graph.doors().len(),
            scenario.environment.blocks().len()
        );
        println!(
            "Schedule: {} frames, {}% volume, every {} ticks, seed {}",
            schedule.frames, schedule.change_volume, environment.change_interval, schedule.seed
        );
        println!();
    }

    let nav = config.navigator.clone();
    let results = vec![
        run_planner::<AStarPlanner>(&scenario, (), &nav),
        run_planner::<DStarLite>(&scenario, (), &nav),
        run_planner::<AdStar>(&scenario, config.adstar.clone(), &nav),
        run_planner::<RtdStar>(&scenario, config.rtdstar.clone(), &nav),
    ];

    if json {
        match serde_json::to_string_pretty(&results) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error serializing metrics: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    println!(
        "{:<12} {:<12} {:>8} {:>8} {:>10} {:>9} {:>12} {:>9} {:>11} {:>10} {:>13} {:>12}",
        "planner",
        "result",
        "ticks",
        "length",
        "cost",
        "revisits",
        "expansions",
        "replans",
        "total ms",
        "avg ms",
        "recompute ms",
        "avg recomp"
    );
    for m in &results {
        println!(
            "{:<12} {:<12} {:>8} {:>8} {:>10.1} {:>9} {:>12} {:>9} {:>11.3} {:>10.4} {:>13.3} {:>12.4}",
            m.planner,
            termination_label(&m.termination),
            m.ticks,
            m.path_length,
            m.path_cost,
            m.revisits,
            m.expansions,
            m.replans,
            m.planning_ms,
            m.average_planning_ms,
            m.recompute_ms,
            m.average_recompute_ms
        );
    }
}

fn run_planner<P: Planner>(
    scenario: &Scenario,
    planner_config: P::Config,
    nav: &NavigatorConfig,
) -> RunMetrics {
    match scenario.navigator::<P>(planner_config, nav.clone()) {
        Ok(mut navigator) => navigator.run(),
        Err(e) => RunMetrics {
            planner: P::NAME.to_string(),
            termination: Termination::Error(e.to_string()),
            ticks: 0,
            path_length: 0,
            path_cost: 0.0,
            revisits: 0,
            expansions: 0,
            replans: 0,
            planning_ms: 0.0,
            average_planning_ms: 0.0,
            recompute_ms: 0.0,
            average_recompute_ms: 0.0,
        },
    }
}

fn termination_label(t: &Termination) -> &'static str {
    match t {
        Termination::Arrived => "arrived",
        Termination::NoPath => "no path",
        Termination::Disconnected => "disconnected",
        Termination::StepLimit => "step limit",
        Termination::Error(_) => "error",
    }
}

fn load_config(path: &str) -> GridnavConfig {
    let loaded = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|json| GridnavConfig::from_json(&json).map_err(|e| e.to_string()));
    match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config '{}': {}", path, e);
            std::process::exit(1);
        }
    }
}

/// Parse a `--flag value` pair from the argument list.
fn parse_flag<T: FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}
