// End-to-end episodes through the Navigator.
//
// Every planner drives the same agent across a two-corridor map whose doors
// are toggled by a fixed script. The episode must end with the agent on the
// goal, never standing on a closed door, and with a path no shorter than
// the static optimum.

use gridnav_core::{
    AStarPlanner, AdStar, AdStarConfig, DStarLite, GridGraph, GridPos, Navigator,
    NavigatorConfig, NodeId, Planner, RtdStar, RtdStarConfig, RunMetrics, ScriptedChanges,
    Termination, astar,
};

const MAP: &str = "\
..........
.####+###.
.#......#.
.#.####.#.
.#......#.
.###@####.
..........";

fn at(graph: &GridGraph, x: i32, y: i32) -> NodeId {
    graph.node_at(GridPos::new(x, y)).unwrap()
}

fn script(graph: &GridGraph) -> ScriptedChanges {
    let top = at(graph, 5, 1);
    let bottom = at(graph, 4, 5);
    ScriptedChanges::new()
        .at(2, &[top])
        .at(6, &[bottom])
        .at(11, &[top])
        .at(15, &[bottom])
}

fn run_episode<P: Planner>(config: P::Config) -> (RunMetrics, Vec<NodeId>, GridGraph) {
    let graph = GridGraph::from_ascii(MAP);
    let start = at(&graph, 3, 2);
    let goal = at(&graph, 0, 6);
    let env = script(&graph);
    let mut nav: Navigator<P, _> =
        Navigator::new(graph, env, config, NavigatorConfig::default());
    nav.initialize(start, goal).unwrap();
    let metrics = nav.run();
    (metrics, nav.path().to_vec(), nav.graph().clone())
}

fn check(metrics: &RunMetrics, path: &[NodeId], graph: &GridGraph) {
    assert_eq!(metrics.termination, Termination::Arrived, "{metrics:?}");
    let start = at(graph, 3, 2);
    let goal = at(graph, 0, 6);
    assert_eq!(path.first(), Some(&start));
    assert_eq!(path.last(), Some(&goal));
    for pair in path.windows(2) {
        assert!(graph.node(pair[0]).neighbors.contains(&pair[1]));
    }
    let fresh = GridGraph::from_ascii(MAP);
    let mut open_doors = fresh.clone();
    for &door in fresh.doors() {
        open_doors.set_obstacle(door, false);
    }
    let lower_bound = astar(&open_doors, start, goal).unwrap().cost;
    assert!(metrics.path_cost >= lower_bound);
    assert_eq!(metrics.path_length as usize, path.len() - 1);
}

#[test]
fn astar_planner_navigates_changing_map() {
    let (metrics, path, graph) = run_episode::<AStarPlanner>(());
    check(&metrics, &path, &graph);
    assert_eq!(metrics.planner, "astar");
}

#[test]
fn dstar_lite_navigates_changing_map() {
    let (metrics, path, graph) = run_episode::<DStarLite>(());
    check(&metrics, &path, &graph);
    assert!(metrics.replans > 0);
}

#[test]
fn adstar_navigates_changing_map() {
    let (metrics, path, graph) = run_episode::<AdStar>(AdStarConfig::default());
    check(&metrics, &path, &graph);
}

#[test]
fn rtdstar_navigates_changing_map() {
    let config = RtdStarConfig {
        expansion_limit: 6,
        local_ratio: 0.5,
    };
    let (metrics, path, graph) = run_episode::<RtdStar>(config);
    check(&metrics, &path, &graph);
}
