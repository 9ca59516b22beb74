//! Deterministic, pure building blocks for scenario replay.
//!
//! Core modules must be free of I/O side effects. They describe effects,
//! coroutines and scenarios, and project the effects a scenario expects
//! without running anything.

pub mod coroutine;
pub mod effect;
pub mod project;
pub mod scenario;
pub mod types;
