//! Effect tokens yielded by dispatcher and worker coroutines.
//!
//! Tokens describe a requested side effect and are only ever produced and
//! compared. Equality is structural; tasks inside fork tokens compare by the
//! canonical path of their factory function.

use std::fmt;

use serde_json::Value;

use crate::core::coroutine::Coroutine;
use crate::core::types::Action;
use crate::error::ScenarioError;

/// Payload slot holding the trigger pattern of a fork token.
pub const PATTERN_SLOT: usize = 0;
/// Payload slot holding the worker task of a fork token.
pub const WORKER_SLOT: usize = 1;

/// Coroutine factory: positional arguments in, fresh coroutine instance out.
pub type TaskFn = fn(&[Value]) -> Box<dyn Coroutine>;

/// A named coroutine factory.
///
/// Two tasks are equal when their names are equal. Use [`task!`](crate::task)
/// to name a task after its function's canonical path, which does not depend
/// on how the call site spells it.
#[derive(Clone, Copy)]
pub struct Task {
    name: &'static str,
    factory: TaskFn,
}

impl Task {
    pub const fn new(name: &'static str, factory: TaskFn) -> Self {
        Self { name, factory }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Instantiate a new coroutine with the given positional arguments.
    pub fn spawn(&self, args: &[Value]) -> Box<dyn Coroutine> {
        (self.factory)(args)
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Task {}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task({})", self.name)
    }
}

/// Build a [`Task`] named after the canonical path of the given function.
#[macro_export]
macro_rules! task {
    ($factory:path) => {
        $crate::core::effect::Task::new(::std::any::type_name_of_val(&$factory), $factory)
    };
}

/// One positional argument of a fork token.
#[derive(Debug, Clone, PartialEq)]
pub enum ForkArg {
    Value(Value),
    Task(Task),
}

/// "Start `worker` on every matching trigger" token.
///
/// Payload layout is fixed: [`PATTERN_SLOT`] holds the trigger pattern,
/// [`WORKER_SLOT`] the worker task, and every later slot an extra argument
/// forwarded to the worker.
#[derive(Debug, Clone, PartialEq)]
pub struct Fork {
    pub helper: &'static str,
    pub args: Vec<ForkArg>,
}

impl Fork {
    pub fn new(helper: &'static str, pattern: &str, worker: Task, extra: &[Value]) -> Self {
        let mut args = Vec::with_capacity(extra.len() + 2);
        args.push(ForkArg::Value(Value::String(pattern.to_string())));
        args.push(ForkArg::Task(worker));
        args.extend(extra.iter().cloned().map(ForkArg::Value));
        Self { helper, args }
    }

    /// Trigger pattern the worker is subscribed to.
    pub fn pattern(&self) -> Result<&str, ScenarioError> {
        match self.args.get(PATTERN_SLOT) {
            Some(ForkArg::Value(Value::String(pattern))) => Ok(pattern),
            Some(other) => Err(malformed(format!(
                "slot {} holds {:?}, expected a trigger pattern",
                PATTERN_SLOT, other
            ))),
            None => Err(malformed(format!("slot {} is missing", PATTERN_SLOT))),
        }
    }

    /// Worker task the fork starts.
    pub fn worker(&self) -> Result<Task, ScenarioError> {
        match self.args.get(WORKER_SLOT) {
            Some(ForkArg::Task(task)) => Ok(*task),
            Some(other) => Err(malformed(format!(
                "slot {} holds {:?}, expected a worker task",
                WORKER_SLOT, other
            ))),
            None => Err(malformed(format!("slot {} is missing", WORKER_SLOT))),
        }
    }

    /// Extra arguments forwarded to the worker (every slot after the worker).
    pub fn worker_args(&self) -> Result<Vec<Value>, ScenarioError> {
        self.args
            .iter()
            .enumerate()
            .skip(WORKER_SLOT + 1)
            .map(|(slot, arg)| match arg {
                ForkArg::Value(value) => Ok(value.clone()),
                ForkArg::Task(task) => Err(malformed(format!(
                    "slot {} holds task '{}', expected a worker argument",
                    slot,
                    task.name()
                ))),
            })
            .collect()
    }
}

fn malformed(reason: String) -> ScenarioError {
    ScenarioError::MalformedFork { reason }
}

/// "Invoke `func` with `args`" token.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub func: String,
    pub args: Vec<Value>,
}

/// A requested side effect.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Fork(Fork),
    Call(Call),
    /// Dispatch an action.
    Put(Action),
    /// Any other effect, compared by value.
    Other(Value),
}

impl Effect {
    pub fn as_fork(&self) -> Option<&Fork> {
        match self {
            Effect::Fork(fork) => Some(fork),
            _ => None,
        }
    }

    /// Trigger pattern when this is a well-formed fork token.
    pub fn fork_pattern(&self) -> Option<&str> {
        self.as_fork().and_then(|fork| fork.pattern().ok())
    }
}

pub fn call(func: impl Into<String>, args: Vec<Value>) -> Effect {
    Effect::Call(Call {
        func: func.into(),
        args,
    })
}

pub fn put(action: Action) -> Effect {
    Effect::Put(action)
}

pub type ForkHelperFn = fn(&str, Task, &[Value]) -> Effect;

/// Fork-registration helper: maps (trigger pattern, worker, extra args) to the
/// fork token a dispatcher yields to subscribe that worker.
///
/// Helpers compare by name. Use [`fork_helper!`](crate::fork_helper) to name
/// one after its build function's canonical path.
#[derive(Clone, Copy)]
pub struct ForkHelper {
    name: &'static str,
    build: ForkHelperFn,
}

impl ForkHelper {
    pub const fn new(name: &'static str, build: ForkHelperFn) -> Self {
        Self { name, build }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn apply(&self, pattern: &str, worker: Task, extra: &[Value]) -> Effect {
        (self.build)(pattern, worker, extra)
    }
}

impl PartialEq for ForkHelper {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ForkHelper {}

impl fmt::Debug for ForkHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ForkHelper({})", self.name)
    }
}

/// Build a [`ForkHelper`] named after the canonical path of the given function.
#[macro_export]
macro_rules! fork_helper {
    ($build:path) => {
        $crate::core::effect::ForkHelper::new(::std::any::type_name_of_val(&$build), $build)
    };
}

/// Start a new worker for every matching trigger.
pub fn take_every() -> ForkHelper {
    crate::fork_helper!(take_every_fork)
}

/// Start a worker for a matching trigger, cancelling the previous one.
pub fn take_latest() -> ForkHelper {
    crate::fork_helper!(take_latest_fork)
}

fn take_every_fork(pattern: &str, worker: Task, extra: &[Value]) -> Effect {
    Effect::Fork(Fork::new("takeEvery", pattern, worker, extra))
}

fn take_latest_fork(pattern: &str, worker: Task, extra: &[Value]) -> Effect {
    Effect::Fork(Fork::new("takeLatest", pattern, worker, extra))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coroutine::Sequence;
    use serde_json::json;

    fn idle(_args: &[Value]) -> Box<dyn Coroutine> {
        Box::new(Sequence::new(Vec::new()))
    }

    fn other_idle(_args: &[Value]) -> Box<dyn Coroutine> {
        Box::new(Sequence::new(Vec::new()))
    }

    mod elsewhere {
        use serde_json::Value;

        use crate::core::coroutine::{Coroutine, Sequence};
        use crate::core::effect::call;

        /// Same last path segment as the outer `idle`, different behavior.
        pub fn idle(_args: &[Value]) -> Box<dyn Coroutine> {
            Box::new(Sequence::once(call("elsewhere", vec![])))
        }
    }

    #[test]
    fn task_macro_names_task_after_canonical_path() {
        let task = crate::task!(idle);
        assert_eq!(task.name(), "saga_scenario::core::effect::tests::idle");
        assert_eq!(
            format!("{:?}", task),
            "Task(saga_scenario::core::effect::tests::idle)"
        );
    }

    #[test]
    fn tasks_compare_by_name() {
        assert_eq!(crate::task!(idle), crate::task!(idle));
        assert_ne!(crate::task!(idle), crate::task!(other_idle));
    }

    #[test]
    fn task_identity_ignores_call_site_spelling() {
        assert_eq!(crate::task!(idle), crate::task!(self::idle));
        assert_eq!(
            crate::task!(crate::test_support::flag_worker),
            crate::task!(crate::test_support::flag_worker)
        );
        {
            use crate::test_support::flag_worker;
            assert_eq!(
                crate::task!(flag_worker),
                crate::task!(crate::test_support::flag_worker)
            );
        }
    }

    #[test]
    fn same_named_functions_in_other_modules_differ() {
        assert_ne!(crate::task!(idle), crate::task!(elsewhere::idle));
        let outer = take_every().apply("ping", crate::task!(idle), &[]);
        let inner = take_every().apply("ping", crate::task!(elsewhere::idle), &[]);
        assert_ne!(outer, inner);
    }

    #[test]
    fn custom_helper_does_not_collide_with_builtin() {
        fn take_every_fork(pattern: &str, worker: Task, extra: &[Value]) -> Effect {
            Effect::Fork(Fork::new("takeEvery", pattern, worker, extra))
        }
        assert_ne!(crate::fork_helper!(take_every_fork), take_every());
        assert_eq!(take_every(), take_every());
    }

    /// The helper places pattern, worker and extra arguments in fixed slots.
    #[test]
    fn take_every_lays_out_fork_slots() {
        let effect = take_every().apply("ping", crate::task!(idle), &[json!(1), json!("x")]);
        let fork = effect.as_fork().expect("fork");
        assert_eq!(fork.helper, "takeEvery");
        assert_eq!(fork.pattern().expect("pattern"), "ping");
        assert_eq!(fork.worker().expect("worker"), crate::task!(idle));
        assert_eq!(fork.worker_args().expect("args"), vec![json!(1), json!("x")]);
        assert_eq!(effect.fork_pattern(), Some("ping"));
    }

    #[test]
    fn take_every_and_take_latest_differ() {
        let every = take_every().apply("ping", crate::task!(idle), &[]);
        let latest = take_latest().apply("ping", crate::task!(idle), &[]);
        assert_ne!(every, latest);
        assert_ne!(take_every(), take_latest());
    }

    #[test]
    fn worker_slot_must_hold_a_task() {
        let fork = Fork {
            helper: "custom",
            args: vec![
                ForkArg::Value(json!("ping")),
                ForkArg::Value(json!("not-a-task")),
            ],
        };
        let err = fork.worker().expect_err("malformed");
        assert!(err.to_string().contains("expected a worker task"));
    }

    #[test]
    fn missing_worker_slot_is_malformed() {
        let fork = Fork {
            helper: "custom",
            args: vec![ForkArg::Value(json!("ping"))],
        };
        let err = fork.worker().expect_err("malformed");
        assert!(err.to_string().contains("slot 1 is missing"));
    }

    #[test]
    fn non_fork_effects_have_no_pattern() {
        assert_eq!(put(Action::new("a")).fork_pattern(), None);
        assert_eq!(call("f", vec![]).fork_pattern(), None);
    }
}
