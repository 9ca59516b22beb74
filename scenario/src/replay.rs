//! Live replay of a scenario against its real coroutines.
//!
//! The dispatcher is resumed once to obtain its fork token, then the worker is
//! driven through the scripted steps. The feedback scripted on a step is what
//! the *following* resumption injects; after the last step one more
//! resumption probes whether the worker has completed.

use serde_json::Value;
use tracing::{debug, instrument, trace, warn};

use crate::core::coroutine::{Coroutine, Fused, Resume};
use crate::core::effect::{Effect, Task};
use crate::core::scenario::{Scenario, ScenarioOutput};
use crate::core::types::Step;
use crate::error::ScenarioError;

/// Replay `scenario` and record the effects its coroutines actually yield.
///
/// Mismatches against the script are not errors; the full trace is always
/// returned, even when the worker lets a thrown value escape. Errors are
/// reserved for replays that cannot proceed: a dispatcher that raises, or no
/// usable fork token when the worker must be recovered from it.
#[instrument(skip_all, fields(saga = scenario.saga().name()))]
pub fn run(scenario: &Scenario) -> Result<ScenarioOutput, ScenarioError> {
    let dispatched = dispatch(scenario)?;
    let mut effects = Vec::with_capacity(scenario.steps().len() + 1);
    effects.extend(dispatched.fork.clone());

    let mut replay = Replay::start(scenario, &dispatched);
    for record in replay.by_ref() {
        if let Some(effect) = record.actual {
            trace!(step = record.index, ?effect, "recorded worker effect");
            effects.push(effect);
        }
    }
    let starved = replay.probe();
    debug!(effects = effects.len(), starved, "replay finished");

    Ok(ScenarioOutput { effects, starved })
}

/// Result of the dispatcher's single resumption.
#[derive(Debug, Clone)]
pub(crate) struct Dispatched {
    /// First yielded effect; `None` when the dispatcher completed at once.
    pub(crate) fork: Option<Effect>,
    pub(crate) worker: Task,
    pub(crate) worker_args: Vec<Value>,
}

/// Instantiate the dispatcher with the scenario's args and resume it once.
///
/// With no recorded worker, the worker and its arguments are recovered from
/// the fork token's payload slots.
pub(crate) fn dispatch(scenario: &Scenario) -> Result<Dispatched, ScenarioError> {
    let mut saga = Fused::new(scenario.saga().spawn(scenario.args()));
    let fork = saga
        .next(Value::Null)
        .map_err(|error| ScenarioError::DispatcherRaised { error })?
        .into_effect();

    if let Some(worker) = scenario.task() {
        return Ok(Dispatched {
            fork,
            worker,
            worker_args: scenario.args().to_vec(),
        });
    }

    let effect = fork.ok_or(ScenarioError::DispatcherCompleted)?;
    let recovered = effect.as_fork().ok_or_else(|| ScenarioError::NotAFork {
        effect: format!("{:?}", effect),
    })?;
    let worker = recovered.worker()?;
    let worker_args = recovered.worker_args()?;
    debug!(worker = worker.name(), "recovered worker from fork token");

    Ok(Dispatched {
        fork: Some(effect),
        worker,
        worker_args,
    })
}

/// One worker resumption matched with the step it was meant to produce.
#[derive(Debug, Clone)]
pub(crate) struct StepRecord<'a> {
    /// Index into the scenario's steps.
    pub(crate) index: usize,
    pub(crate) expected: &'a Step,
    /// Yielded effect; `None` when the worker completed or raised instead.
    pub(crate) actual: Option<Effect>,
}

/// Drives a worker through the scripted steps, one resumption per step.
pub(crate) struct Replay<'a> {
    worker: Fused,
    steps: &'a [Step],
    offset: usize,
    cursor: usize,
    pending: Resume,
}

impl<'a> Replay<'a> {
    /// Instantiate the worker with `(...worker_args, trigger)`.
    pub(crate) fn start(scenario: &'a Scenario, dispatched: &Dispatched) -> Self {
        let mut args = dispatched.worker_args.clone();
        args.push(scenario.action().to_value());
        let (steps, pending) = scenario.worker_plan();
        Self {
            worker: Fused::new(dispatched.worker.spawn(&args)),
            steps,
            offset: scenario.steps().len() - steps.len(),
            cursor: 0,
            pending,
        }
    }

    /// Resume once more with the carried feedback and report whether the
    /// worker is now done. The yielded value is discarded; a raise counts as
    /// completion.
    pub(crate) fn probe(mut self) -> bool {
        let input = std::mem::replace(&mut self.pending, Resume::Next(Value::Null));
        match self.worker.resume(input) {
            Ok(outcome) => outcome.is_done(),
            Err(error) => {
                debug!(%error, "worker raised on the completion probe");
                true
            }
        }
    }
}

impl<'a> Iterator for Replay<'a> {
    type Item = StepRecord<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let expected = self.steps.get(self.cursor)?;
        let index = self.offset + self.cursor;
        self.cursor += 1;

        let input = std::mem::replace(&mut self.pending, expected.next_resume());
        debug!(
            step = index,
            throw = matches!(input, Resume::Throw(_)),
            "resuming worker"
        );
        let actual = match self.worker.resume(input) {
            Ok(outcome) => {
                if outcome.is_done() {
                    warn!(step = index, "worker completed before its scripted steps ran out");
                }
                outcome.into_effect()
            }
            Err(error) => {
                warn!(step = index, %error, "worker raised before its scripted steps ran out");
                None
            }
        };

        Some(StepRecord {
            index,
            expected,
            actual,
        })
    }
}
