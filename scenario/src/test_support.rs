//! Test-only dispatcher and worker coroutines.
//!
//! The workers are hand-rolled state machines modelled on a typical
//! "check a flag, report the outcome" saga:
//!
//! ```text
//! try {
//!     flag = yield call(checker, action.payload)
//!     yield put(flag ? ok : fail)
//!     yield put(all)            // flag_worker only
//! } catch {
//!     yield put(error)
//! }
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::{Value, json};
use tempfile::TempDir;

use crate::core::coroutine::{Coroutine, Resume, Sequence, Suspend};
use crate::core::effect::{Effect, Fork, ForkArg, call, put, take_every};
use crate::core::types::Action;
use crate::task;

/// Trigger every sample dispatcher subscribes to.
pub fn subscribed_action() -> Action {
    Action::new("some-type").with_payload(json!(1))
}

pub fn ok_action() -> Action {
    Action::new("ok-type").with_payload(json!(2))
}

pub fn fail_action() -> Action {
    Action::new("fail-type").with_payload(json!(10))
}

pub fn all_action() -> Action {
    Action::new("all-type").with_payload(json!(20))
}

pub fn error_action() -> Action {
    Action::new("error-type").with_payload(json!(30))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagState {
    Start,
    AwaitingFlag,
    Reported,
    Summarized,
    Recovered,
    Finished,
}

/// Worker that calls `checker` with the trigger payload and reports the flag.
pub struct FlagWorker {
    checker: String,
    payload: Value,
    inverted: bool,
    summarize: bool,
    state: FlagState,
}

impl FlagWorker {
    /// `args` is `[checker, trigger]`, as a dispatcher forwards them.
    fn from_args(args: &[Value], inverted: bool, summarize: bool) -> Self {
        let checker = args
            .first()
            .and_then(Value::as_str)
            .unwrap_or("<missing>")
            .to_string();
        let payload = args
            .last()
            .and_then(|trigger| trigger.get("payload"))
            .cloned()
            .unwrap_or(Value::Null);
        Self {
            checker,
            payload,
            inverted,
            summarize,
            state: FlagState::Start,
        }
    }
}

impl Coroutine for FlagWorker {
    fn resume(&mut self, input: Resume) -> Result<Suspend, Value> {
        let (state, outcome) = match (self.state, input) {
            (FlagState::Start, Resume::Next(_)) => (
                FlagState::AwaitingFlag,
                Ok(Suspend::Yielded(call(
                    self.checker.clone(),
                    vec![self.payload.clone()],
                ))),
            ),
            (FlagState::AwaitingFlag, Resume::Next(flag)) => {
                let ok = is_truthy(&flag) != self.inverted;
                let action = if ok { ok_action() } else { fail_action() };
                (FlagState::Reported, Ok(Suspend::Yielded(put(action))))
            }
            (FlagState::Reported, Resume::Next(_)) if self.summarize => (
                FlagState::Summarized,
                Ok(Suspend::Yielded(put(all_action()))),
            ),
            (FlagState::Reported | FlagState::Summarized | FlagState::Recovered, Resume::Next(_)) => {
                (FlagState::Finished, Ok(Suspend::Done))
            }
            (FlagState::AwaitingFlag | FlagState::Reported | FlagState::Summarized, Resume::Throw(_)) => (
                FlagState::Recovered,
                Ok(Suspend::Yielded(put(error_action()))),
            ),
            (FlagState::Start | FlagState::Recovered | FlagState::Finished, Resume::Throw(error)) => {
                (FlagState::Finished, Err(error))
            }
            (FlagState::Finished, Resume::Next(_)) => (FlagState::Finished, Ok(Suspend::Done)),
        };
        self.state = state;
        outcome
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Check, report, then dispatch `all-type`.
pub fn flag_worker(args: &[Value]) -> Box<dyn Coroutine> {
    Box::new(FlagWorker::from_args(args, false, true))
}

/// Check and report, nothing more.
pub fn quick_flag_worker(args: &[Value]) -> Box<dyn Coroutine> {
    Box::new(FlagWorker::from_args(args, false, false))
}

/// Like [`quick_flag_worker`] but reports the opposite outcome.
pub fn inverted_flag_worker(args: &[Value]) -> Box<dyn Coroutine> {
    Box::new(FlagWorker::from_args(args, true, false))
}

/// Worker that echoes every resumption.
///
/// `args[0]` is the number of effects to yield. Each effect reports what the
/// resumption carried: `{"received": value}` or `{"caught": error}`.
pub struct EchoWorker {
    remaining: u64,
}

impl Coroutine for EchoWorker {
    fn resume(&mut self, input: Resume) -> Result<Suspend, Value> {
        if self.remaining == 0 {
            return Ok(Suspend::Done);
        }
        self.remaining -= 1;
        Ok(Suspend::Yielded(echo(&input)))
    }
}

/// Effect an [`EchoWorker`] yields for `input`.
pub fn echo(input: &Resume) -> Effect {
    match input {
        Resume::Next(value) => Effect::Other(json!({ "received": value })),
        Resume::Throw(error) => Effect::Other(json!({ "caught": error })),
    }
}

pub fn echo_worker(args: &[Value]) -> Box<dyn Coroutine> {
    let remaining = args.first().and_then(Value::as_u64).unwrap_or(0);
    Box::new(EchoWorker { remaining })
}

/// Dispatcher forking [`flag_worker`] on `some-type`.
pub fn watch_flag(args: &[Value]) -> Box<dyn Coroutine> {
    Box::new(Sequence::once(
        take_every().apply("some-type", task!(flag_worker), args),
    ))
}

/// Dispatcher forking [`quick_flag_worker`] on `some-type`.
pub fn watch_quick_flag(args: &[Value]) -> Box<dyn Coroutine> {
    Box::new(Sequence::once(
        take_every().apply("some-type", task!(quick_flag_worker), args),
    ))
}

/// Dispatcher forking [`inverted_flag_worker`] on `some-type`.
pub fn watch_inverted_flag(args: &[Value]) -> Box<dyn Coroutine> {
    Box::new(Sequence::once(
        take_every().apply("some-type", task!(inverted_flag_worker), args),
    ))
}

/// Dispatcher subscribed to the wrong trigger.
pub fn watch_wrong_type(args: &[Value]) -> Box<dyn Coroutine> {
    Box::new(Sequence::once(
        take_every().apply("WrongType", task!(inverted_flag_worker), args),
    ))
}

/// Dispatcher forking [`echo_worker`] on `some-type`.
pub fn watch_echo(args: &[Value]) -> Box<dyn Coroutine> {
    Box::new(Sequence::once(
        take_every().apply("some-type", task!(echo_worker), args),
    ))
}

/// Dispatcher that completes without forking anything.
pub fn watch_nothing(_args: &[Value]) -> Box<dyn Coroutine> {
    Box::new(Sequence::new(Vec::new()))
}

/// Dispatcher that dispatches an action instead of forking.
pub fn watch_by_putting(_args: &[Value]) -> Box<dyn Coroutine> {
    Box::new(Sequence::once(put(ok_action())))
}

/// Dispatcher whose fork token has a value where the worker belongs.
pub fn watch_malformed(_args: &[Value]) -> Box<dyn Coroutine> {
    Box::new(Sequence::once(Effect::Fork(Fork {
        helper: "takeEvery",
        args: vec![
            ForkArg::Value(json!("some-type")),
            ForkArg::Value(json!("flag_worker")),
        ],
    })))
}

/// Write `contents` to a config file inside a fresh temp dir.
///
/// The returned [`TempDir`] must outlive the path.
pub fn temp_config(contents: &str) -> Result<(TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("saga-scenario.toml");
    std::fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    Ok((dir, path))
}
