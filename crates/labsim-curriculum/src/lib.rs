//! Labsim Curriculum -- guided experiments on top of the sandbox engine.
//!
//! Guided mode layers a curriculum of scripted experiments over the free
//! sandbox: each experiment defines an [`outcome::OutcomeTable`] keyed by
//! *signatures* (which chemicals were added, which actions were performed)
//! and a family-specific [`phase::PhaseMachine`] tracking sub-procedure
//! progress. The [`session::Session`] accumulates the learner's moves,
//! probes the table on demand, and applies the matched outcome's vessel
//! transform and phase bookkeeping.
//!
//! [`guided::GuidedLab`] is the top-level facade: it owns the engine, the
//! heating and filtration modules, the session, and a deterministic
//! [`command::CommandQueue`] drained at tick boundaries.
//!
//! # Families
//!
//! - **Comparison** -- two independent sub-procedures; completing one raises
//!   a reset prompt, completing both finishes the experiment.
//! - **Material study** -- three materials tested in a gated round order.
//! - **Titration** -- completion is owned by a drop counter, never by the
//!   signature lookup.

pub mod command;
pub mod experiment;
pub mod guided;
pub mod outcome;
pub mod phase;
pub mod session;
