//! Delayed-effect queue keyed by simulated time.
//!
//! Items fire on the first `update` whose clock has reached their due
//! time, in due-time order, with insertion order breaking ties. Each item
//! fires exactly once. Items pushed while a batch is being fired are never
//! part of that batch.

use std::cmp::Ordering;
use std::collections::binary_heap::PeekMut;
use std::collections::BinaryHeap;

struct Timed<T> {
    when: i64,
    seq: u64,
    value: T,
}

impl<T> PartialEq for Timed<T> {
    fn eq(&self, other: &Self) -> bool {
        self.when == other.when && self.seq == other.seq
    }
}

impl<T> Eq for Timed<T> {}

impl<T> PartialOrd for Timed<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Timed<T> {
    // Reversed: BinaryHeap is a max-heap, the earliest item must be on top.
    fn cmp(&self, other: &Self) -> Ordering {
        (other.when, other.seq).cmp(&(self.when, self.seq))
    }
}

pub struct Scheduler<T> {
    queue: BinaryHeap<Timed<T>>,
    time: i64,
    seq: u64,
    timestep: i64,
}

impl<T> Scheduler<T> {
    pub fn new(timestep_ms: u16) -> Self {
        Scheduler {
            queue: BinaryHeap::new(),
            time: 0,
            seq: 0,
            timestep: i64::from(timestep_ms),
        }
    }

    /// Queue `value` to fire `delay_ms` after the current clock.
    pub fn push(&mut self, delay_ms: i64, value: T) {
        let when = self.time + delay_ms.max(0);
        self.queue.push(Timed { when, seq: self.seq, value });
        self.seq += 1;
    }

    /// Like `push`, building the item from its parts.
    pub fn emplace<A: Into<T>>(&mut self, delay_ms: i64, args: A) {
        self.push(delay_ms, args.into());
    }

    /// Advance the clock by one timestep and return every item now due.
    pub fn update(&mut self) -> Vec<T> {
        self.time += self.timestep;

        let mut due = Vec::new();
        while let Some(top) = self.queue.peek_mut() {
            if top.when > self.time {
                break;
            }
            due.push(PeekMut::pop(top).value);
        }
        due
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_at_due_tick() {
        let mut s: Scheduler<&str> = Scheduler::new(8);
        s.push(20, "hit");

        assert!(s.update().is_empty()); // t=8
        assert!(s.update().is_empty()); // t=16
        assert_eq!(s.update(), vec!["hit"]); // t=24
        assert!(s.update().is_empty());
        assert!(s.is_empty());
    }

    #[test]
    fn test_exact_boundary_fires() {
        let mut s: Scheduler<i32> = Scheduler::new(8);
        s.push(16, 1);
        s.update();
        assert_eq!(s.update(), vec![1]);
    }

    #[test]
    fn test_zero_delay_fires_next_update() {
        let mut s: Scheduler<i32> = Scheduler::new(8);
        s.push(0, 7);
        s.push(-50, 8);
        assert_eq!(s.update(), vec![7, 8]);
    }

    #[test]
    fn test_due_order_and_fifo_ties() {
        let mut s: Scheduler<i32> = Scheduler::new(100);
        s.push(50, 3);
        s.push(10, 1);
        s.push(50, 4);
        s.push(10, 2);
        assert_eq!(s.update(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_each_item_fires_once() {
        let mut s: Scheduler<i32> = Scheduler::new(8);
        for i in 0..50 {
            s.push(i64::from(i) * 3, i);
        }
        let mut fired = Vec::new();
        for _ in 0..100 {
            fired.extend(s.update());
        }
        assert_eq!(fired, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_push_during_fire_waits_for_next_update() {
        let mut s: Scheduler<i32> = Scheduler::new(8);
        s.push(0, 1);
        let batch = s.update();
        for item in batch {
            s.push(0, item + 1);
        }
        assert_eq!(s.update(), vec![2]);
    }

    #[test]
    fn test_emplace_converts() {
        struct Effect(i32, bool);
        impl From<(i32, bool)> for Effect {
            fn from((d, c): (i32, bool)) -> Self {
                Effect(d, c)
            }
        }
        let mut s: Scheduler<Effect> = Scheduler::new(8);
        s.emplace(0, (120, true));
        let fired = s.update();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].0, 120);
        assert!(fired[0].1);
    }
}
