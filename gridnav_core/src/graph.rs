// Grid graph: node arena, neighbor relation, traversal cost, heuristic.
//
// `GridGraph` is a flat arena of `GridNode`s indexed by `NodeId`. Neighbor
// lists are 4-connected, symmetric and fixed when the grid is built; only
// the `obstacle` flag of door nodes changes afterwards (through
// `set_obstacle`/`toggle`, or in bulk via `nodes_mut` from the environment
// layer). Walls are simply absent from the arena, except in `.map` files,
// where `@` cells become permanently blocked `Plain` nodes.
//
// Planners never see `GridGraph` directly. They are written against the
// `Graph` trait, whose provided `cost` and `heuristic` methods define the one
// cost model used by every engine:
//
//   cost(a, b)      = +inf if either endpoint is an obstacle,
//                     else manhattan(a, b)
//   heuristic(a, b) = manhattan(a, b)
//
// `cost` is symmetric. Once obstacles exist it is not a metric (the triangle
// inequality fails through an obstacle), so no caller may rely on that.
//
// See also: `types.rs` for `NodeId`/`GridPos`, `dstar_lite.rs` and friends
// for the engines that read this graph.

use crate::types::{GridPos, INFINITY, NodeId};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// What a cell is. Only doors may change their obstacle flag over time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Plain,
    Door,
}

/// A traversable-or-blockable cell of the grid.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GridNode {
    pub id: NodeId,
    pub position: GridPos,
    pub kind: NodeKind,
    /// A closed door. Cost into or out of this node is +inf.
    pub obstacle: bool,
    /// 4-connected neighbors, in left/right/up/down order where present.
    pub neighbors: SmallVec<[NodeId; 4]>,
}

/// Read-only view of a graph that planners search.
pub trait Graph {
    fn node_count(&self) -> usize;

    fn neighbors(&self, node: NodeId) -> &[NodeId];

    fn is_obstacle(&self, node: NodeId) -> bool;

    fn position(&self, node: NodeId) -> GridPos;

    /// Number of nodes whose obstacle flag can change.
    fn door_count(&self) -> usize;

    /// Traversal cost between two adjacent nodes.
    fn cost(&self, a: NodeId, b: NodeId) -> f64 {
        if self.is_obstacle(a) || self.is_obstacle(b) {
            INFINITY
        } else {
            self.heuristic(a, b)
        }
    }

    /// Admissible estimate of the cost between two nodes.
    fn heuristic(&self, a: NodeId, b: NodeId) -> f64 {
        self.position(a).manhattan_distance(self.position(b)) as f64
    }
}

impl<G: Graph + ?Sized> Graph for &G {
    fn node_count(&self) -> usize {
        (**self).node_count()
    }

    fn neighbors(&self, node: NodeId) -> &[NodeId] {
        (**self).neighbors(node)
    }

    fn is_obstacle(&self, node: NodeId) -> bool {
        (**self).is_obstacle(node)
    }

    fn position(&self, node: NodeId) -> GridPos {
        (**self).position(node)
    }

    fn door_count(&self) -> usize {
        (**self).door_count()
    }
}

/// The grid container.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GridGraph {
    nodes: Vec<GridNode>,
    #[serde(skip)]
    by_position: FxHashMap<GridPos, NodeId>,
    doors: Vec<NodeId>,
    width: u32,
    height: u32,
}

impl GridGraph {
    /// A `width` x `height` grid with every cell free.
    pub fn open(width: u32, height: u32) -> Self {
        let mut graph = Self {
            width,
            height,
            ..Self::default()
        };
        for y in 0..height as i32 {
            for x in 0..width as i32 {
                graph.push_node(GridPos::new(x, y), NodeKind::Plain, false);
            }
        }
        graph.link_neighbors();
        graph
    }

    /// Parse an ASCII map, one row per line.
    ///
    /// - `.` free cell
    /// - `@` door, initially closed
    /// - `+` door, initially open
    /// - anything else (`#`, `T`, space, ...) is a wall and gets no node
    pub fn from_ascii(text: &str) -> Self {
        let mut graph = Self::default();
        for (y, line) in text.lines().enumerate() {
            let mut row_width = 0u32;
            for (x, c) in line.chars().enumerate() {
                let pos = GridPos::new(x as i32, y as i32);
                match c {
                    '.' => {
                        graph.push_node(pos, NodeKind::Plain, false);
                    }
                    '@' => {
                        graph.push_node(pos, NodeKind::Door, true);
                    }
                    '+' => {
                        graph.push_node(pos, NodeKind::Door, false);
                    }
                    _ => {}
                }
                row_width = x as u32 + 1;
            }
            graph.width = graph.width.max(row_width);
            graph.height = y as u32 + 1;
        }
        graph.link_neighbors();
        graph
    }

    /// Parse a `.map` file in the rooms-map format.
    ///
    /// - `.` free cell
    /// - `@` permanent obstacle (a node that is never toggled)
    /// - `D` door, initially closed
    /// - any other character is skipped without taking a column
    pub fn from_map(text: &str) -> Self {
        let mut graph = Self::default();
        for (y, line) in text.lines().enumerate() {
            let mut x = 0i32;
            for c in line.chars() {
                let pos = GridPos::new(x, y as i32);
                match c {
                    '.' => graph.push_node(pos, NodeKind::Plain, false),
                    '@' => graph.push_node(pos, NodeKind::Plain, true),
                    'D' => graph.push_node(pos, NodeKind::Door, true),
                    _ => continue,
                };
                x += 1;
            }
            graph.width = graph.width.max(x as u32);
            graph.height = y as u32 + 1;
        }
        graph.link_neighbors();
        graph
    }

    fn push_node(&mut self, position: GridPos, kind: NodeKind, obstacle: bool) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(GridNode {
            id,
            position,
            kind,
            obstacle,
            neighbors: SmallVec::new(),
        });
        self.by_position.insert(position, id);
        if kind == NodeKind::Door {
            self.doors.push(id);
        }
        id
    }

    fn link_neighbors(&mut self) {
        const OFFSETS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
        for idx in 0..self.nodes.len() {
            let pos = self.nodes[idx].position;
            let neighbors: SmallVec<[NodeId; 4]> = OFFSETS
                .iter()
                .filter_map(|&(dx, dy)| self.by_position.get(&GridPos::new(pos.x + dx, pos.y + dy)))
                .copied()
                .collect();
            self.nodes[idx].neighbors = neighbors;
        }
    }

    /// Rebuild the position index after deserialization.
    pub fn rebuild_index(&mut self) {
        self.by_position = self.nodes.iter().map(|n| (n.position, n.id)).collect();
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn node(&self, id: NodeId) -> &GridNode {
        &self.nodes[id.index()]
    }

    pub fn nodes(&self) -> &[GridNode] {
        &self.nodes
    }

    /// Mutable access to the whole arena, for bulk obstacle toggling.
    /// Callers must only change `obstacle`; ids, positions and neighbor
    /// lists are fixed.
    pub fn nodes_mut(&mut self) -> &mut [GridNode] {
        &mut self.nodes
    }

    pub fn node_at(&self, pos: GridPos) -> Option<NodeId> {
        self.by_position.get(&pos).copied()
    }

    /// All door nodes, in creation (row-major) order.
    pub fn doors(&self) -> &[NodeId] {
        &self.doors
    }

    pub fn set_obstacle(&mut self, id: NodeId, obstacle: bool) {
        self.nodes[id.index()].obstacle = obstacle;
    }

    /// Flip a node's obstacle flag, returning the new value.
    pub fn toggle(&mut self, id: NodeId) -> bool {
        let node = &mut self.nodes[id.index()];
        node.obstacle = !node.obstacle;
        node.obstacle
    }
}

impl Graph for GridGraph {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn neighbors(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.index()].neighbors
    }

    fn is_obstacle(&self, node: NodeId) -> bool {
        self.nodes[node.index()].obstacle
    }

    fn position(&self, node: NodeId) -> GridPos {
        self.nodes[node.index()].position
    }

    fn door_count(&self) -> usize {
        self.doors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_grid_links_four_neighbors() {
        let graph = GridGraph::open(3, 3);
        assert_eq!(graph.node_count(), 9);
        let center = graph.node_at(GridPos::new(1, 1)).unwrap();
        assert_eq!(graph.neighbors(center).len(), 4);
        let corner = graph.node_at(GridPos::new(0, 0)).unwrap();
        assert_eq!(graph.neighbors(corner).len(), 2);
    }

    #[test]
    fn neighbor_relation_is_symmetric() {
        let graph = GridGraph::from_ascii("..#.\n.@..\n..+.");
        for node in graph.nodes() {
            for &n in &node.neighbors {
                assert!(graph.neighbors(n).contains(&node.id));
            }
        }
    }

    #[test]
    fn ascii_walls_have_no_node() {
        let graph = GridGraph::from_ascii(".#.\n...");
        assert_eq!(graph.node_count(), 5);
        assert!(graph.node_at(GridPos::new(1, 0)).is_none());
        assert_eq!(graph.width(), 3);
        assert_eq!(graph.height(), 2);
    }

    #[test]
    fn ascii_doors_start_closed_or_open() {
        let graph = GridGraph::from_ascii("@+.");
        assert_eq!(graph.door_count(), 2);
        let closed = graph.node_at(GridPos::new(0, 0)).unwrap();
        let open = graph.node_at(GridPos::new(1, 0)).unwrap();
        assert!(graph.is_obstacle(closed));
        assert!(!graph.is_obstacle(open));
        assert_eq!(graph.node(open).kind, NodeKind::Door);
    }

    #[test]
    fn map_files_mark_permanent_obstacles_and_doors() {
        let graph = GridGraph::from_map("..@\r\n.D.\n@..");
        assert_eq!(graph.node_count(), 9);
        assert_eq!(graph.width(), 3);
        assert_eq!(graph.height(), 3);
        assert_eq!(graph.door_count(), 1);

        let wall = graph.node_at(GridPos::new(2, 0)).unwrap();
        assert!(graph.is_obstacle(wall));
        assert_eq!(graph.node(wall).kind, NodeKind::Plain);
        assert_eq!(graph.neighbors(wall).len(), 2);

        let door = graph.node_at(GridPos::new(1, 1)).unwrap();
        assert!(graph.is_obstacle(door));
        assert_eq!(graph.doors(), &[door]);
        assert_eq!(graph.neighbors(door).len(), 4);
    }

    #[test]
    fn cost_is_infinite_through_obstacles() {
        let mut graph = GridGraph::open(2, 1);
        let a = NodeId(0);
        let b = NodeId(1);
        assert_eq!(graph.cost(a, b), 1.0);
        graph.set_obstacle(b, true);
        assert_eq!(graph.cost(a, b), INFINITY);
        assert_eq!(graph.cost(b, a), INFINITY);
        // The heuristic ignores obstacles.
        assert_eq!(graph.heuristic(a, b), 1.0);
        assert!(!graph.toggle(b));
        assert_eq!(graph.cost(a, b), 1.0);
    }

    #[test]
    fn graph_serialization_roundtrip() {
        let graph = GridGraph::from_ascii("..\n@.");
        let json = serde_json::to_string(&graph).unwrap();
        let mut restored: GridGraph = serde_json::from_str(&json).unwrap();
        restored.rebuild_index();
        assert_eq!(restored.node_count(), 4);
        assert_eq!(restored.node_at(GridPos::new(0, 1)), graph.node_at(GridPos::new(0, 1)));
        assert_eq!(restored.door_count(), 1);
    }
}
