//! Labsim Data -- content loading and persistence.
//!
//! Lab content (chemicals, reaction rules, apparatus, guided experiments)
//! comes from data files in RON, TOML, or JSON, resolved into the frozen
//! registry and the curriculum by [`loader::load_lab_data`]. The
//! [`builtin`] module ships a complete catalog for clients that run without
//! a data directory, and [`completion`] persists the experiment completion
//! record across runs.

pub mod builtin;
pub mod completion;
pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, LabData, load_lab_data};
