//! Immutable scenario descriptions.
//!
//! A [`Scenario`] is produced by the builder in [`crate::builder`] and is
//! read-only afterwards. Replays never mutate it, so one description can be
//! projected and replayed any number of times.

use serde_json::Value;

use crate::core::coroutine::Resume;
use crate::core::effect::{Effect, ForkHelper, Task};
use crate::core::project::project;
use crate::core::types::{Action, Step};

/// Expected execution of a dispatcher/worker coroutine pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub(crate) saga: Task,
    pub(crate) fork_helper: Option<ForkHelper>,
    pub(crate) action: Action,
    pub(crate) task: Option<Task>,
    pub(crate) args: Vec<Value>,
    pub(crate) steps: Vec<Step>,
    pub(crate) starved: Option<bool>,
}

/// Effect sequence plus starvation flag, shared by projection and replay.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioOutput {
    pub effects: Vec<Effect>,
    pub starved: bool,
}

impl Scenario {
    pub(crate) fn new(saga: Task, fork_helper: Option<ForkHelper>, action: Action) -> Self {
        Self {
            saga,
            fork_helper,
            action,
            task: None,
            args: Vec::new(),
            steps: Vec::new(),
            starved: None,
        }
    }

    /// Dispatcher coroutine factory.
    pub fn saga(&self) -> Task {
        self.saga
    }

    pub fn fork_helper(&self) -> Option<ForkHelper> {
        self.fork_helper
    }

    /// Triggering message.
    pub fn action(&self) -> &Action {
        &self.action
    }

    /// Worker factory; `None` when it is recovered from the dispatcher's fork.
    pub fn task(&self) -> Option<Task> {
        self.task
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Starvation override, if one was recorded.
    pub fn starved(&self) -> Option<bool> {
        self.starved
    }

    /// Expected starvation: the override if set, else `true`.
    pub fn expected_starved(&self) -> bool {
        self.starved.unwrap_or(true)
    }

    /// Fork token the recorded helper would produce, if a helper is recorded.
    pub fn synthesized_fork(&self) -> Option<Effect> {
        match (self.fork_helper, self.task) {
            (Some(helper), Some(task)) => Some(helper.apply(&self.action.kind, task, &self.args)),
            _ => None,
        }
    }

    /// Steps the worker is expected to produce, and the resumption that starts it.
    ///
    /// Without a fork helper the first step is the dispatcher's fork token, so
    /// the worker owns the remaining steps and the fork step's feedback feeds
    /// the worker's first resumption.
    pub(crate) fn worker_plan(&self) -> (&[Step], Resume) {
        if self.fork_helper.is_some() {
            return (&self.steps, Resume::Next(Value::Null));
        }
        match self.steps.split_first() {
            Some((fork_step, rest)) => (rest, fork_step.next_resume()),
            None => (&[], Resume::Next(Value::Null)),
        }
    }

    /// Expected output, derived structurally without running any coroutine.
    pub fn output(&self) -> ScenarioOutput {
        project(self)
    }

    pub(crate) fn with_step(&self, step: Step) -> Self {
        let mut next = self.clone();
        next.steps.push(step);
        next
    }

    pub(crate) fn map_last_step(&self, update: impl FnOnce(&mut Step)) -> Self {
        let mut next = self.clone();
        if let Some(last) = next.steps.last_mut() {
            update(last);
        }
        next
    }
}
