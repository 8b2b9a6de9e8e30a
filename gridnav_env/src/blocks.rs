// Obstacle blocks: groups of door cells that open and close together.
//
// On scattered-obstacle maps, adjacent door cells form one physical
// obstacle. `find_blocks` groups them by breadth-first search over the
// 4-neighborhood, restricted to door nodes. Blocks are numbered in order of
// their first door (row-major), so the numbering is stable for a given map
// and a schedule can refer to blocks by index.
//
// On room maps every door is a single cell between two walls, so each
// dynamic door is its own block (`singletons`).
//
// See also: `schedule.rs`, which toggles blocks frame by frame,
// `environment.rs`, which applies them to the graph.

use gridnav_core::{GridGraph, NodeId, NodeKind};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A connected set of door nodes, toggled as a unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObstacleBlock {
    pub id: usize,
    pub doors: Vec<NodeId>,
}

impl ObstacleBlock {
    /// A block is closed when its first door is. Doors in a block always
    /// share a state as long as they are only ever toggled together.
    pub fn is_obstacle(&self, graph: &GridGraph) -> bool {
        self.doors
            .first()
            .is_some_and(|&d| graph.node(d).obstacle)
    }
}

/// Group all door nodes of `graph` into connected blocks.
pub fn find_blocks(graph: &GridGraph) -> Vec<ObstacleBlock> {
    let mut visited: FxHashSet<NodeId> = FxHashSet::default();
    let mut blocks = Vec::new();
    for &door in graph.doors() {
        if !visited.insert(door) {
            continue;
        }
        let mut members = Vec::new();
        let mut queue = VecDeque::from([door]);
        while let Some(current) = queue.pop_front() {
            members.push(current);
            for &n in &graph.node(current).neighbors {
                if graph.node(n).kind == NodeKind::Door && visited.insert(n) {
                    queue.push_back(n);
                }
            }
        }
        blocks.push(ObstacleBlock {
            id: blocks.len(),
            doors: members,
        });
    }
    blocks
}

/// One block per door in `doors`, keeping their order.
pub fn singletons(doors: &[NodeId]) -> Vec<ObstacleBlock> {
    doors
        .iter()
        .enumerate()
        .map(|(id, &d)| ObstacleBlock { id, doors: vec![d] })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridnav_core::GridPos;

    #[test]
    fn adjacent_doors_share_a_block() {
        let graph = GridGraph::from_ascii(
            "@@..@\n\
             .@...\n\
             ....@",
        );
        let blocks = find_blocks(&graph);
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].doors.len(), 3);
        assert_eq!(blocks[1].doors.len(), 1);
        assert_eq!(blocks[2].doors.len(), 1);
        let lone = graph.node_at(GridPos::new(4, 2)).unwrap();
        assert_eq!(blocks[2].doors, vec![lone]);
        assert!(blocks.iter().enumerate().all(|(i, b)| b.id == i));
    }

    #[test]
    fn every_door_lands_in_exactly_one_block() {
        let graph = GridGraph::from_ascii(
            "@.@@\n\
             @.+@\n\
             ..@.",
        );
        let blocks = find_blocks(&graph);
        let mut all: Vec<NodeId> = blocks.iter().flat_map(|b| b.doors.clone()).collect();
        all.sort();
        let mut doors = graph.doors().to_vec();
        doors.sort();
        assert_eq!(all, doors);
    }

    #[test]
    fn block_state_follows_first_door() {
        let mut graph = GridGraph::from_ascii("@@.");
        let blocks = find_blocks(&graph);
        assert!(blocks[0].is_obstacle(&graph));
        for &d in &blocks[0].doors {
            graph.toggle(d);
        }
        assert!(!blocks[0].is_obstacle(&graph));
    }

    #[test]
    fn singletons_number_in_order() {
        let blocks = singletons(&[NodeId(4), NodeId(9)]);
        assert_eq!(blocks[1], ObstacleBlock { id: 1, doors: vec![NodeId(9)] });
    }
}
