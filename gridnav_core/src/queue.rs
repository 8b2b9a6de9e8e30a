// Indexed binary min-heap with arbitrary removal and key update.
//
// `IndexedQueue` stores `(item, priority)` pairs in an implicit binary heap
// (`Vec`) and keeps an `item -> heap index` map alongside it. The map is
// what the search engines need on top of `BinaryHeap`: O(1) membership tests,
// O(log n) removal of any queued vertex, and O(log n) repositioning after a
// vertex's key changes. Every swap during sift-up/sift-down, and the
// swap-with-last used by removal, writes both moved items back into the map.
//
// The queue knows nothing about search. Ordering comes from a `Comparator`:
// `NaturalOrder` for `Ord` priorities such as `Key`, or a plain function
// pointer such as `f64::total_cmp` for scalar costs.
//
// See also: `dstar_lite.rs`, `adstar.rs`, `astar.rs`, `lss_lrta.rs`, which
// all order their open sets with this queue.

use crate::error::QueueError;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::hash::Hash;

/// Ordering used by an `IndexedQueue`. Smaller priorities are dequeued first.
pub trait Comparator<P> {
    fn compare(&self, a: &P, b: &P) -> Ordering;
}

/// Orders priorities by their `Ord` implementation.
#[derive(Clone, Copy, Debug, Default)]
pub struct NaturalOrder;

impl<P: Ord> Comparator<P> for NaturalOrder {
    fn compare(&self, a: &P, b: &P) -> Ordering {
        a.cmp(b)
    }
}

impl<P> Comparator<P> for fn(&P, &P) -> Ordering {
    fn compare(&self, a: &P, b: &P) -> Ordering {
        self(a, b)
    }
}

/// Scalar cost ordering used by the A*-style open sets.
pub type CostOrder = fn(&f64, &f64) -> Ordering;

/// Queue of `f64` priorities ordered with `f64::total_cmp`.
pub type CostQueue<I> = IndexedQueue<I, f64, CostOrder>;

/// Create an empty `CostQueue`.
pub fn cost_queue<I: Copy + Eq + Hash>() -> CostQueue<I> {
    IndexedQueue::with_comparator(f64::total_cmp as CostOrder)
}

/// Binary min-heap of `(item, priority)` with an identity -> position index.
#[derive(Clone, Debug)]
pub struct IndexedQueue<I, P, C = NaturalOrder> {
    heap: Vec<(I, P)>,
    positions: FxHashMap<I, usize>,
    comparator: C,
}

impl<I: Copy + Eq + Hash, P: Ord> IndexedQueue<I, P, NaturalOrder> {
    pub fn new() -> Self {
        Self::with_comparator(NaturalOrder)
    }
}

impl<I: Copy + Eq + Hash, P: Ord> Default for IndexedQueue<I, P, NaturalOrder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I, P, C> IndexedQueue<I, P, C>
where
    I: Copy + Eq + Hash,
    C: Comparator<P>,
{
    pub fn with_comparator(comparator: C) -> Self {
        Self {
            heap: Vec::new(),
            positions: FxHashMap::default(),
            comparator,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// O(1) membership test.
    pub fn contains(&self, item: I) -> bool {
        self.positions.contains_key(&item)
    }

    /// The priority an item was last queued or updated with.
    pub fn priority(&self, item: I) -> Option<&P> {
        self.positions.get(&item).map(|&idx| &self.heap[idx].1)
    }

    /// The minimum entry, without removing it.
    pub fn peek(&self) -> Option<(I, &P)> {
        self.heap.first().map(|(item, priority)| (*item, priority))
    }

    /// Insert an item. Enqueueing an item that is already queued is a
    /// contract violation; use `update_priority` instead.
    pub fn enqueue(&mut self, item: I, priority: P) -> Result<(), QueueError> {
        if self.positions.contains_key(&item) {
            return Err(QueueError::AlreadyQueued);
        }
        let idx = self.heap.len();
        self.heap.push((item, priority));
        self.positions.insert(item, idx);
        self.sift_up(idx);
        Ok(())
    }

    /// Remove and return the minimum entry.
    pub fn dequeue(&mut self) -> Option<(I, P)> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.heap.swap(0, last);
        let (item, priority) = self.heap.pop()?;
        self.positions.remove(&item);
        if !self.heap.is_empty() {
            self.positions.insert(self.heap[0].0, 0);
            self.sift_down(0);
        }
        Some((item, priority))
    }

    /// Remove an arbitrary item, returning its priority.
    pub fn remove(&mut self, item: I) -> Result<P, QueueError> {
        let idx = self.positions.remove(&item).ok_or(QueueError::NotQueued)?;
        let last = self.heap.len() - 1;
        if idx == last {
            let (_, priority) = self.heap.pop().ok_or(QueueError::NotQueued)?;
            return Ok(priority);
        }
        self.heap.swap(idx, last);
        let (_, priority) = self.heap.pop().ok_or(QueueError::NotQueued)?;
        self.positions.insert(self.heap[idx].0, idx);
        self.repair(idx);
        Ok(priority)
    }

    /// Replace an item's priority and restore heap order around it.
    pub fn update_priority(&mut self, item: I, priority: P) -> Result<(), QueueError> {
        let idx = *self.positions.get(&item).ok_or(QueueError::NotQueued)?;
        self.heap[idx].1 = priority;
        self.repair(idx);
        Ok(())
    }

    /// Insert the item, or reposition it if already queued.
    pub fn upsert(&mut self, item: I, priority: P) {
        if let Some(&idx) = self.positions.get(&item) {
            self.heap[idx].1 = priority;
            self.repair(idx);
        } else {
            let idx = self.heap.len();
            self.heap.push((item, priority));
            self.positions.insert(item, idx);
            self.sift_up(idx);
        }
    }

    /// Recompute every priority with `f`, then rebuild the heap bottom-up.
    /// O(n); cheaper than n separate updates when all keys move at once.
    pub fn rekey_all<F>(&mut self, mut f: F)
    where
        F: FnMut(I, &P) -> P,
    {
        for entry in &mut self.heap {
            entry.1 = f(entry.0, &entry.1);
        }
        for idx in (0..self.heap.len() / 2).rev() {
            self.sift_down(idx);
        }
    }

    /// Queued items in heap-array order.
    pub fn items(&self) -> impl Iterator<Item = I> + '_ {
        self.heap.iter().map(|(item, _)| *item)
    }

    /// Queued entries in heap-array order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &P)> + '_ {
        self.heap.iter().map(|(item, priority)| (*item, priority))
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.positions.clear();
    }

    /// Check the heap property and that the index map agrees with the array.
    /// Intended for tests and debug assertions.
    pub fn verify(&self) -> bool {
        if self.positions.len() != self.heap.len() {
            return false;
        }
        for (idx, (item, _)) in self.heap.iter().enumerate() {
            if self.positions.get(item) != Some(&idx) {
                return false;
            }
            if idx > 0 && self.less(idx, (idx - 1) / 2) {
                return false;
            }
        }
        true
    }

    // -----------------------------------------------------------------------
    // Heap maintenance
    // -----------------------------------------------------------------------

    fn less(&self, a: usize, b: usize) -> bool {
        self.comparator.compare(&self.heap[a].1, &self.heap[b].1) == Ordering::Less
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.positions.insert(self.heap[a].0, a);
        self.positions.insert(self.heap[b].0, b);
    }

    /// Move an entry whose priority changed to its correct place.
    fn repair(&mut self, idx: usize) {
        if self.sift_up(idx) == idx {
            self.sift_down(idx);
        }
    }

    /// Returns the entry's final index.
    fn sift_up(&mut self, mut idx: usize) -> usize {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if !self.less(idx, parent) {
                break;
            }
            self.swap(idx, parent);
            idx = parent;
        }
        idx
    }

    fn sift_down(&mut self, mut idx: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * idx + 1;
            let right = left + 1;
            let mut smallest = idx;
            if left < len && self.less(left, smallest) {
                smallest = left;
            }
            if right < len && self.less(right, smallest) {
                smallest = right;
            }
            if smallest == idx {
                break;
            }
            self.swap(idx, smallest);
            idx = smallest;
        }
    }
}
