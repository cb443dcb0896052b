//! Labsim Core -- the simulation engine for the chemistry laboratory.
//!
//! This crate provides the chemical/rule/apparatus registry, the vessel
//! content-conservation model, the generic sandbox reaction matcher, typed
//! events, one-shot task scheduling, and deterministic fixed-point
//! arithmetic that the guided-curriculum and apparatus crates depend on.
//!
//! # Tick Timeline
//!
//! The simulation is single-threaded and cooperative. One step is:
//!
//! 1. **Advance** -- [`engine::LabEngine::advance_tick`] increments the clock.
//! 2. **Commands** -- externally queued commands apply at the tick boundary.
//! 3. **Modules** -- thermal and filtration updates run against committed state.
//! 4. **Tasks** -- due one-shot tasks fire, generation-guarded
//!    ([`sched::Scheduler`]): anything scheduled before a reset is inert.
//! 5. **Post-tick** -- buffered events deliver to listeners
//!    ([`event::EventBus::deliver`]).
//!
//! Callbacks interleave between ticks, never within one; all mutations
//! commit before the next tick's reads.
//!
//! # Key Types
//!
//! - [`engine::LabEngine`] -- vessel store, registry, events, tick counter.
//! - [`registry::Registry`] -- immutable catalog of chemicals, reaction
//!   rules, and apparatus (frozen at startup).
//! - [`vessel::Vessel`] -- mutable container with the proportional-removal
//!   conservation algorithm.
//! - [`reaction`] -- first-match-wins category-pair matcher with equal-split
//!   product volumes.
//! - [`event::EventBus`] -- per-kind ring buffers with suppression and
//!   prioritized passive listeners.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic math.

pub mod engine;
pub mod event;
pub mod fixed;
pub mod id;
pub mod reaction;
pub mod registry;
pub mod sched;
pub mod vessel;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
