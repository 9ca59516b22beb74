//! Shared deterministic types for scenario descriptions.
//!
//! These types define stable contracts between the builder, the projector,
//! the replay engine and the oracle. They hold no coroutine state.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::core::coroutine::Resume;
use crate::core::effect::Effect;

/// Triggering message a dispatcher subscribes its worker to.
///
/// Serialized as `{"type": ..., "payload": ...}`; that JSON object is the
/// last positional argument every worker receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

impl Action {
    /// Create an action without payload.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: Value::Null,
        }
    }

    /// Attach a payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// JSON form handed to worker factories.
    pub fn to_value(&self) -> Value {
        if self.payload.is_null() {
            json!({ "type": self.kind })
        } else {
            json!({ "type": self.kind, "payload": self.payload })
        }
    }
}

/// What the next resumption injects into the worker.
#[derive(Debug, Clone, PartialEq)]
pub enum Feedback {
    /// Resume normally; the value becomes the result of the pending yield.
    Return(Value),
    /// Throw the value into the worker at its pending yield.
    Throw(Value),
}

impl Feedback {
    /// Resumption carrying this feedback.
    pub fn to_resume(&self) -> Resume {
        match self {
            Feedback::Return(value) => Resume::Next(value.clone()),
            Feedback::Throw(error) => Resume::Throw(error.clone()),
        }
    }
}

/// One expected suspension of the worker.
///
/// `feedback` applies to the resumption that follows this step, never to the
/// resumption that produced `effect`.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub effect: Effect,
    pub feedback: Option<Feedback>,
}

impl Step {
    pub fn new(effect: Effect) -> Self {
        Self {
            effect,
            feedback: None,
        }
    }

    /// Scripted return value, if this step returns one.
    pub fn returned_value(&self) -> Option<&Value> {
        match &self.feedback {
            Some(Feedback::Return(value)) => Some(value),
            _ => None,
        }
    }

    /// Scripted error, if this step throws one.
    pub fn error(&self) -> Option<&Value> {
        match &self.feedback {
            Some(Feedback::Throw(error)) => Some(error),
            _ => None,
        }
    }

    /// Resumption that produces the step after this one.
    ///
    /// Without feedback the worker is resumed with `null`.
    pub fn next_resume(&self) -> Resume {
        self.feedback
            .as_ref()
            .map_or(Resume::Next(Value::Null), Feedback::to_resume)
    }
}
