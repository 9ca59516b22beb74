//! Error types for scenario replay.
//!
//! Behavioral mismatches are never errors: they show up as data in a
//! [`ScenarioOutput`](crate::core::scenario::ScenarioOutput) or as failed
//! checks in a [`Verification`](crate::oracle::Verification). These variants
//! cover replays that cannot proceed at all.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScenarioError {
    /// A fork token does not hold what the fork layout puts in a slot.
    #[error("malformed fork payload: {reason}")]
    MalformedFork {
        /// Which slot is wrong and what it holds.
        reason: String,
    },

    /// The dispatcher's first yield is not a fork token, but the worker has to
    /// be recovered from it.
    #[error("dispatcher yielded {effect} instead of a fork token")]
    NotAFork {
        /// Debug rendering of the yielded effect.
        effect: String,
    },

    /// The dispatcher completed without yielding, but the worker has to be
    /// recovered from its fork token.
    #[error("dispatcher completed without yielding a fork token")]
    DispatcherCompleted,

    /// The dispatcher raised on its first resumption.
    #[error("dispatcher raised {error}")]
    DispatcherRaised {
        /// Value that escaped the dispatcher.
        error: Value,
    },
}
