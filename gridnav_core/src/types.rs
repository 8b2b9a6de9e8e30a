// Core types shared by every planner.
//
// Defines node identifiers (`NodeId`), grid positions (`GridPos`), the
// two-part search key (`Key`) used by the D*-family engines, and the
// `INFINITY` cost sentinel. All types derive `Serialize`/`Deserialize` so
// metrics and schedules can carry them.
//
// Costs are `f64` and may be `+inf`. Ordering always goes through
// `f64::total_cmp` so that `inf == inf` compares equal and heap order is
// total.
//
// See also: `graph.rs` for the node arena these ids index into, `queue.rs`
// for the heap that orders `Key`s.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Cost of an untraversable edge or an unknown distance.
pub const INFINITY: f64 = f64::INFINITY;

// ---------------------------------------------------------------------------
// Identifiers and positions
// ---------------------------------------------------------------------------

/// Index of a node in a `GridGraph` arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A cell position. `x` grows to the right, `y` grows downward (map rows).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance between two positions.
    pub fn manhattan_distance(self, other: Self) -> u32 {
        (self.x - other.x).unsigned_abs() + (self.y - other.y).unsigned_abs()
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Search key
// ---------------------------------------------------------------------------

/// Lexicographic priority of a vertex in the D*-family open queues.
///
/// `k1 = min(g, rhs) + eps * h(s, start) + k_m`, `k2 = min(g, rhs)`.
/// Smaller keys are expanded first.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Key {
    pub k1: f64,
    pub k2: f64,
}

impl Key {
    /// The key of a vertex that is unreachable: larger than every finite key.
    pub const INFINITE: Key = Key {
        k1: INFINITY,
        k2: INFINITY,
    };

    pub const fn new(k1: f64, k2: f64) -> Self {
        Self { k1, k2 }
    }

    /// Strict lexicographic "less than".
    pub fn less_than(&self, other: &Key) -> bool {
        self.cmp(other) == Ordering::Less
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.k1
            .total_cmp(&other.k1)
            .then_with(|| self.k2.total_cmp(&other.k2))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.k1, self.k2)
    }
}
