//! Scripted replay and verification of dispatcher/worker coroutine pairs.
//!
//! A scenario describes how a dispatcher coroutine forks a worker on a
//! trigger, which effects the worker yields, and what each resumption feeds
//! back into it. The crate enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic data (effects, coroutine contract,
//!   scenario descriptions) and the expected-effect projector.
//! - **[`io`]**: Side-effecting helpers (configuration files).
//!
//! Orchestration modules ([`builder`], [`replay`], [`oracle`]) build scenarios,
//! drive the real coroutines, and compare what they yield with the script.

pub mod builder;
pub mod core;
pub mod error;
pub mod io;
pub mod logging;
pub mod oracle;
pub mod replay;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use builder::build_saga_scenario;
pub use crate::core::scenario::{Scenario, ScenarioOutput};
pub use error::ScenarioError;
pub use oracle::{assert_saga, make_oracle};
