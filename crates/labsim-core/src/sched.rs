//! One-shot task scheduling on the cooperative tick timeline.
//!
//! All delayed behavior (stir settling, auto-evaporate, completion popups)
//! is expressed as a task scheduled for a future tick. Tasks carry the
//! generation current at scheduling time; [`Scheduler::bump_generation`]
//! invalidates every in-flight task, so a callback scheduled before a reset
//! is provably inert when it comes due. Stale tasks are dropped silently
//! (and counted, for tests).
//!
//! Tasks never fire within a tick: the engine collects due tasks once per
//! step and runs them between ticks, in deterministic
//! `(fire_at, insertion order)` sequence.

use crate::fixed::Ticks;

#[derive(Debug, Clone)]
struct Entry<T> {
    fire_at: Ticks,
    generation: u64,
    seq: u64,
    task: T,
}

/// A single-threaded one-shot task scheduler with a generation guard.
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    tasks: Vec<Entry<T>>,
    generation: u64,
    next_seq: u64,
    stale_dropped: u64,
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            generation: 0,
            next_seq: 0,
            stale_dropped: 0,
        }
    }

    /// Schedule a task to fire at `fire_at` (a tick, not a delay). The task
    /// is tagged with the current generation.
    pub fn schedule(&mut self, fire_at: Ticks, task: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.tasks.push(Entry {
            fire_at,
            generation: self.generation,
            seq,
            task,
        });
    }

    /// Current generation. Tasks scheduled now are valid until the next bump.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Invalidate every task scheduled under the current generation.
    /// They remain queued but will be dropped inert when due.
    pub fn bump_generation(&mut self) {
        self.generation += 1;
    }

    /// Collect tasks due at or before `now`, in `(fire_at, insertion)` order.
    /// Stale tasks (scheduled under an old generation) are dropped silently.
    pub fn fire_due(&mut self, now: Ticks) -> Vec<T> {
        let mut due: Vec<Entry<T>> = Vec::new();
        let mut i = 0;
        while i < self.tasks.len() {
            if self.tasks[i].fire_at <= now {
                due.push(self.tasks.swap_remove(i));
            } else {
                i += 1;
            }
        }
        due.sort_by_key(|e| (e.fire_at, e.seq));

        let generation = self.generation;
        let mut fired = Vec::with_capacity(due.len());
        for entry in due {
            if entry.generation == generation {
                fired.push(entry.task);
            } else {
                self.stale_dropped += 1;
            }
        }
        fired
    }

    /// Number of queued tasks, including stale ones not yet swept.
    pub fn pending_len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// How many stale tasks have been dropped inert since creation.
    pub fn stale_dropped(&self) -> u64 {
        self.stale_dropped
    }

    /// Drop all queued tasks without firing them.
    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_at_or_before_now() {
        let mut s = Scheduler::new();
        s.schedule(5, "a");
        s.schedule(10, "b");
        assert!(s.fire_due(4).is_empty());
        assert_eq!(s.fire_due(5), vec!["a"]);
        assert_eq!(s.fire_due(20), vec!["b"]);
        assert!(s.is_empty());
    }

    #[test]
    fn fires_in_deterministic_order() {
        let mut s = Scheduler::new();
        s.schedule(10, "late");
        s.schedule(5, "early");
        s.schedule(5, "early-second");
        assert_eq!(s.fire_due(10), vec!["early", "early-second", "late"]);
    }

    #[test]
    fn bump_generation_makes_tasks_inert() {
        let mut s = Scheduler::new();
        s.schedule(5, "stale");
        s.bump_generation();
        s.schedule(5, "fresh");
        assert_eq!(s.fire_due(5), vec!["fresh"]);
        assert_eq!(s.stale_dropped(), 1);
    }

    #[test]
    fn stale_tasks_from_multiple_resets_all_dropped() {
        let mut s = Scheduler::new();
        s.schedule(5, 1);
        s.bump_generation();
        s.schedule(5, 2);
        s.bump_generation();
        s.schedule(5, 3);
        assert_eq!(s.fire_due(5), vec![3]);
        assert_eq!(s.stale_dropped(), 2);
    }

    #[test]
    fn tasks_never_fire_early() {
        let mut s = Scheduler::new();
        s.schedule(100, ());
        for now in 0..100 {
            assert!(s.fire_due(now).is_empty(), "fired early at {now}");
        }
        assert_eq!(s.fire_due(100).len(), 1);
    }

    #[test]
    fn clear_drops_everything() {
        let mut s = Scheduler::new();
        s.schedule(1, ());
        s.schedule(2, ());
        s.clear();
        assert!(s.is_empty());
        assert!(s.fire_due(10).is_empty());
    }
}
