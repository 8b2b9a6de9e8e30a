// Map layouts: rooms connected by doors, and scattered obstacle fields.
//
// A rooms layout is an `n x n` grid of square rooms of side `room_size`
// (walls included). Walls run along every multiple of `room_size`; each
// wall shared by two rooms has one door cell at its midpoint, and the outer
// boundary is solid. All doors start closed. `carve_maze` picks a spanning
// tree of the rooms with a randomized depth-first search; opening those
// doors and keeping them open guarantees every room stays reachable no
// matter what the schedule does with the remaining doors.
//
// A scattered layout is a rectangle of random walls and door cells. Adjacent
// door cells form obstacle blocks (see `blocks.rs`). Reachability is not
// guaranteed.
//
// Both produce ASCII in the format `GridGraph::from_ascii` reads.
//
// See also: `scenario.rs`, which turns a layout into a runnable episode.

use crate::rng::ScheduleRng;
use gridnav_core::GridPos;
use serde::{Deserialize, Serialize};

/// A door between two rooms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDoor {
    /// Room indices (row-major), lower index first.
    pub rooms: (usize, usize),
    pub position: GridPos,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomLayout {
    pub rooms_per_side: usize,
    pub room_size: usize,
    pub doors: Vec<RoomDoor>,
}

impl RoomLayout {
    /// Lay out `rooms_per_side`^2 rooms. `room_size` is clamped to at
    /// least 3 so every room has an interior and a door midpoint.
    pub fn new(rooms_per_side: usize, room_size: usize) -> Self {
        let n = rooms_per_side.max(1);
        let s = room_size.max(3);
        let mut doors = Vec::new();
        for row in 0..n {
            for col in 0..n {
                let room = row * n + col;
                if col + 1 < n {
                    doors.push(RoomDoor {
                        rooms: (room, room + 1),
                        position: GridPos::new(((col + 1) * s) as i32, (row * s + s / 2) as i32),
                    });
                }
                if row + 1 < n {
                    doors.push(RoomDoor {
                        rooms: (room, room + n),
                        position: GridPos::new((col * s + s / 2) as i32, ((row + 1) * s) as i32),
                    });
                }
            }
        }
        Self {
            rooms_per_side: n,
            room_size: s,
            doors,
        }
    }

    /// Side length of the whole map in cells.
    pub fn side(&self) -> usize {
        self.rooms_per_side * self.room_size + 1
    }

    pub fn room_count(&self) -> usize {
        self.rooms_per_side * self.rooms_per_side
    }

    /// Top-left interior cell of the first room.
    pub fn start(&self) -> GridPos {
        GridPos::new(1, 1)
    }

    /// Bottom-right interior cell of the last room.
    pub fn goal(&self) -> GridPos {
        let far = (self.side() - 2) as i32;
        GridPos::new(far, far)
    }

    /// Render with every door closed.
    pub fn to_ascii(&self) -> String {
        let side = self.side();
        let s = self.room_size;
        let mut rows: Vec<Vec<char>> = (0..side)
            .map(|y| {
                (0..side)
                    .map(|x| if x % s == 0 || y % s == 0 { '#' } else { '.' })
                    .collect()
            })
            .collect();
        for door in &self.doors {
            rows[door.position.y as usize][door.position.x as usize] = '@';
        }
        rows.into_iter()
            .map(|r| r.into_iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Indices into `doors` forming a random spanning tree of the rooms.
    pub fn carve_maze(&self, rng: &mut ScheduleRng) -> Vec<usize> {
        let rooms = self.room_count();
        let mut adjacency: Vec<Vec<(usize, usize)>> = vec![Vec::new(); rooms];
        for (i, door) in self.doors.iter().enumerate() {
            adjacency[door.rooms.0].push((door.rooms.1, i));
            adjacency[door.rooms.1].push((door.rooms.0, i));
        }

        let mut visited = vec![false; rooms];
        let mut opened = Vec::with_capacity(rooms.saturating_sub(1));
        let first = rng.below_usize(rooms);
        visited[first] = true;
        let mut stack = vec![first];
        while let Some(current) = stack.pop() {
            let unvisited: Vec<(usize, usize)> = adjacency[current]
                .iter()
                .copied()
                .filter(|&(room, _)| !visited[room])
                .collect();
            if unvisited.is_empty() {
                continue;
            }
            let (next, door) = unvisited[rng.below_usize(unvisited.len())];
            opened.push(door);
            visited[next] = true;
            stack.push(current);
            stack.push(next);
        }
        opened.sort_unstable();
        opened
    }
}

/// Parameters for a scattered obstacle field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScatteredLayout {
    pub width: usize,
    pub height: usize,
    /// Chance a cell is a permanent wall, in percent.
    pub wall_percent: f64,
    /// Chance a cell is a door, in percent.
    pub door_percent: f64,
}

impl Default for ScatteredLayout {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            wall_percent: 10.0,
            door_percent: 15.0,
        }
    }
}

impl ScatteredLayout {
    pub fn start(&self) -> GridPos {
        GridPos::new(0, 0)
    }

    pub fn goal(&self) -> GridPos {
        GridPos::new(self.width as i32 - 1, self.height as i32 - 1)
    }

    /// Render a random field. The start and goal cells are always free.
    pub fn to_ascii(&self, rng: &mut ScheduleRng) -> String {
        let wall = self.wall_percent / 100.0;
        let door = wall + self.door_percent / 100.0;
        let (start, goal) = (self.start(), self.goal());
        let mut text = String::with_capacity((self.width + 1) * self.height);
        for y in 0..self.height {
            if y > 0 {
                text.push('\n');
            }
            for x in 0..self.width {
                let pos = GridPos::new(x as i32, y as i32);
                let roll = rng.next_f64();
                let c = if pos == start || pos == goal {
                    '.'
                } else if roll < wall {
                    '#'
                } else if roll < door {
                    '@'
                } else {
                    '.'
                };
                text.push(c);
            }
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridnav_core::{Graph, GridGraph, NodeKind};

    #[test]
    fn two_by_two_rooms_have_four_doors() {
        let layout = RoomLayout::new(2, 4);
        assert_eq!(layout.side(), 9);
        assert_eq!(layout.doors.len(), 4);
        let graph = GridGraph::from_ascii(&layout.to_ascii());
        assert_eq!(graph.door_count(), 4);
        for door in &layout.doors {
            let id = graph.node_at(door.position).unwrap();
            assert_eq!(graph.node(id).kind, NodeKind::Door);
            assert!(graph.is_obstacle(id));
            // A door links exactly the two rooms it separates.
            assert_eq!(graph.neighbors(id).len(), 2);
        }
        assert!(graph.node_at(layout.start()).is_some());
        assert!(graph.node_at(layout.goal()).is_some());
    }

    #[test]
    fn maze_is_a_spanning_tree() {
        let layout = RoomLayout::new(4, 5);
        let mut rng = ScheduleRng::new(3);
        let opened = layout.carve_maze(&mut rng);
        assert_eq!(opened.len(), layout.room_count() - 1);

        let mut graph = GridGraph::from_ascii(&layout.to_ascii());
        for &i in &opened {
            let id = graph.node_at(layout.doors[i].position).unwrap();
            graph.set_obstacle(id, false);
        }
        let start = graph.node_at(layout.start()).unwrap();
        let goal = graph.node_at(layout.goal()).unwrap();
        assert!(gridnav_core::astar(&graph, start, goal).is_some());
    }

    #[test]
    fn scattered_layout_is_reproducible() {
        let layout = ScatteredLayout {
            width: 20,
            height: 10,
            ..ScatteredLayout::default()
        };
        let a = layout.to_ascii(&mut ScheduleRng::new(8));
        let b = layout.to_ascii(&mut ScheduleRng::new(8));
        assert_eq!(a, b);
        assert_eq!(a.lines().count(), 10);
        assert!(a.lines().all(|l| l.chars().count() == 20));
        assert!(a.starts_with('.'));
        assert!(a.ends_with('.'));
    }
}
