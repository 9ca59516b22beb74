//! Type-state builder for scenario descriptions.
//!
//! Every stage is its own type and only exposes the calls that are legal
//! next, so an out-of-order chain does not compile:
//!
//! ```compile_fail
//! use saga_scenario::builder::build_saga_scenario;
//! use saga_scenario::core::coroutine::{Coroutine, Sequence};
//! use saga_scenario::core::types::Action;
//! use saga_scenario::task;
//! use serde_json::Value;
//!
//! fn idle(_args: &[Value]) -> Box<dyn Coroutine> {
//!     Box::new(Sequence::new(Vec::new()))
//! }
//!
//! // `with_action` must precede `and_task`.
//! let _ = build_saga_scenario().for_saga(task!(idle)).and_task(task!(idle));
//! ```
//!
//! ```compile_fail
//! use saga_scenario::builder::build_saga_scenario;
//! use saga_scenario::core::coroutine::{Coroutine, Sequence};
//! use saga_scenario::core::effect::take_every;
//! use saga_scenario::core::types::Action;
//! use saga_scenario::task;
//! use serde_json::Value;
//!
//! fn idle(_args: &[Value]) -> Box<dyn Coroutine> {
//!     Box::new(Sequence::new(Vec::new()))
//! }
//!
//! // A synthesized fork needs an explicit worker.
//! let _ = build_saga_scenario()
//!     .for_saga(task!(idle))
//!     .taking(take_every())
//!     .with_action(Action::new("ping"))
//!     .and_forked_task();
//! ```
//!
//! Stages take `&self` and return a fresh stage, so a partially built
//! scenario can be branched without the branches affecting each other.

use std::marker::PhantomData;

use serde_json::Value;

use crate::core::effect::{Effect, ForkHelper, Task};
use crate::core::scenario::{Scenario, ScenarioOutput};
use crate::core::types::{Action, Feedback, Step};
use crate::error::ScenarioError;
use crate::replay;

/// Start a new scenario description.
pub fn build_saga_scenario() -> ScenarioBuilder {
    ScenarioBuilder
}

/// Entry stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScenarioBuilder;

impl ScenarioBuilder {
    /// Record the dispatcher coroutine factory.
    pub fn for_saga(&self, saga: Task) -> SagaStage {
        SagaStage { saga }
    }
}

/// Dispatcher recorded.
#[derive(Debug, Clone)]
pub struct SagaStage {
    saga: Task,
}

impl SagaStage {
    /// Record the fork helper used to synthesize the expected fork token.
    pub fn taking(&self, helper: ForkHelper) -> TakingStage {
        TakingStage {
            saga: self.saga,
            helper,
        }
    }

    /// Record the trigger. Without a helper, the first step must script the
    /// dispatcher's fork token.
    pub fn with_action(&self, action: Action) -> ActionStage<ScriptedFork> {
        ActionStage {
            scenario: Scenario::new(self.saga, None, action),
            fork: PhantomData,
        }
    }
}

/// Dispatcher and fork helper recorded.
#[derive(Debug, Clone)]
pub struct TakingStage {
    saga: Task,
    helper: ForkHelper,
}

impl TakingStage {
    pub fn with_action(&self, action: Action) -> ActionStage<SynthesizedFork> {
        ActionStage {
            scenario: Scenario::new(self.saga, Some(self.helper), action),
            fork: PhantomData,
        }
    }
}

/// Marker: the expected fork token is synthesized by a fork helper.
#[derive(Debug, Clone, Copy)]
pub struct SynthesizedFork;

/// Marker: the expected fork token is scripted as the first step.
#[derive(Debug, Clone, Copy)]
pub struct ScriptedFork;

/// Trigger recorded; a worker comes next.
#[derive(Debug, Clone)]
pub struct ActionStage<F> {
    scenario: Scenario,
    fork: PhantomData<F>,
}

impl<F> ActionStage<F> {
    /// Record the worker coroutine factory.
    pub fn and_task(&self, task: Task) -> TaskStage {
        let mut scenario = self.scenario.clone();
        scenario.task = Some(task);
        TaskStage { scenario }
    }
}

impl ActionStage<ScriptedFork> {
    /// Use whichever worker the dispatcher forks.
    ///
    /// The worker factory and its arguments are read from the dispatcher's
    /// fork token during replay.
    pub fn and_forked_task(&self) -> TaskStage {
        TaskStage {
            scenario: self.scenario.clone(),
        }
    }
}

/// Worker recorded.
#[derive(Debug, Clone)]
pub struct TaskStage {
    scenario: Scenario,
}

impl TaskStage {
    /// Record positional worker arguments (the trigger is appended after them).
    pub fn with_args(&self, args: impl IntoIterator<Item = Value>) -> ArgsStage {
        let mut scenario = self.scenario.clone();
        scenario.args = args.into_iter().collect();
        ArgsStage { scenario }
    }

    pub fn generate_effect(&self, effect: Effect) -> EffectStage {
        EffectStage {
            scenario: self.scenario.with_step(Step::new(effect)),
        }
    }
}

/// Worker arguments recorded.
#[derive(Debug, Clone)]
pub struct ArgsStage {
    scenario: Scenario,
}

impl ArgsStage {
    pub fn generate_effect(&self, effect: Effect) -> EffectStage {
        EffectStage {
            scenario: self.scenario.with_step(Step::new(effect)),
        }
    }
}

/// A step was just appended; its feedback may still be scripted.
#[derive(Debug, Clone)]
pub struct EffectStage {
    scenario: Scenario,
}

impl EffectStage {
    /// Append the next expected effect.
    pub fn generate_effect(&self, effect: Effect) -> EffectStage {
        EffectStage {
            scenario: self.scenario.with_step(Step::new(effect)),
        }
    }

    /// Value the next resumption feeds into the worker.
    pub fn returns(&self, value: Value) -> StepStage {
        StepStage {
            scenario: self
                .scenario
                .map_last_step(|step| step.feedback = Some(Feedback::Return(value))),
        }
    }

    /// Error the next resumption throws into the worker.
    pub fn throws(&self, error: Value) -> StepStage {
        StepStage {
            scenario: self
                .scenario
                .map_last_step(|step| step.feedback = Some(Feedback::Throw(error))),
        }
    }

    /// Override the expectation that the worker is drained after the last step.
    pub fn starved(&self, starved: bool) -> FinalStage {
        FinalStage {
            scenario: with_starved(&self.scenario, starved),
        }
    }

    pub fn build(&self) -> Scenario {
        self.scenario.clone()
    }

    pub fn output(&self) -> ScenarioOutput {
        self.scenario.output()
    }

    pub fn run(&self) -> Result<ScenarioOutput, ScenarioError> {
        replay::run(&self.scenario)
    }
}

/// The last step's feedback is scripted.
#[derive(Debug, Clone)]
pub struct StepStage {
    scenario: Scenario,
}

impl StepStage {
    pub fn generate_effect(&self, effect: Effect) -> EffectStage {
        EffectStage {
            scenario: self.scenario.with_step(Step::new(effect)),
        }
    }

    pub fn starved(&self, starved: bool) -> FinalStage {
        FinalStage {
            scenario: with_starved(&self.scenario, starved),
        }
    }

    pub fn build(&self) -> Scenario {
        self.scenario.clone()
    }

    pub fn output(&self) -> ScenarioOutput {
        self.scenario.output()
    }

    pub fn run(&self) -> Result<ScenarioOutput, ScenarioError> {
        replay::run(&self.scenario)
    }
}

/// Starvation override recorded; nothing more can be scripted.
#[derive(Debug, Clone)]
pub struct FinalStage {
    scenario: Scenario,
}

impl FinalStage {
    pub fn build(&self) -> Scenario {
        self.scenario.clone()
    }

    pub fn output(&self) -> ScenarioOutput {
        self.scenario.output()
    }

    pub fn run(&self) -> Result<ScenarioOutput, ScenarioError> {
        replay::run(&self.scenario)
    }
}

fn with_starved(scenario: &Scenario, starved: bool) -> Scenario {
    let mut next = scenario.clone();
    next.starved = Some(starved);
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::effect::{call, put, take_every};
    use crate::task;
    use crate::test_support::{flag_worker, watch_flag};
    use serde_json::json;

    fn effect(n: u64) -> Effect {
        Effect::Other(json!({ "effect": n }))
    }

    /// The built description records every call in order.
    #[test]
    fn builds_full_description() {
        let scenario = build_saga_scenario()
            .for_saga(task!(watch_flag))
            .taking(take_every())
            .with_action(Action::new("some-type"))
            .and_task(task!(flag_worker))
            .with_args(vec![json!({ "arg1": true }), json!({ "arg2": true })])
            .generate_effect(effect(1))
            .generate_effect(effect(2))
            .returns(json!({ "returnedValue": true }))
            .generate_effect(effect(3))
            .throws(json!({ "error": true }))
            .build();

        assert_eq!(scenario.saga(), task!(watch_flag));
        assert_eq!(scenario.fork_helper(), Some(take_every()));
        assert_eq!(scenario.action(), &Action::new("some-type"));
        assert_eq!(scenario.task(), Some(task!(flag_worker)));
        assert_eq!(
            scenario.args(),
            &[json!({ "arg1": true }), json!({ "arg2": true })]
        );
        assert_eq!(
            scenario.steps(),
            &[
                Step::new(effect(1)),
                Step {
                    effect: effect(2),
                    feedback: Some(Feedback::Return(json!({ "returnedValue": true }))),
                },
                Step {
                    effect: effect(3),
                    feedback: Some(Feedback::Throw(json!({ "error": true }))),
                },
            ]
        );
        assert_eq!(scenario.starved(), None);
        assert!(scenario.expected_starved());
    }

    /// Branching from one handle leaves the handle and the sibling untouched.
    #[test]
    fn stages_are_copy_on_write() {
        let base = build_saga_scenario()
            .for_saga(task!(watch_flag))
            .with_action(Action::new("some-type"))
            .and_task(task!(flag_worker))
            .generate_effect(call("is_enabled", vec![json!(1)]));

        let truthy = base
            .returns(json!(true))
            .generate_effect(put(Action::new("ok-type")))
            .build();
        let falsy = base
            .returns(json!(false))
            .generate_effect(put(Action::new("fail-type")))
            .build();

        assert_eq!(base.build().steps().len(), 1);
        assert_eq!(base.build().steps()[0].feedback, None);
        assert_eq!(truthy.steps()[0].returned_value(), Some(&json!(true)));
        assert_eq!(falsy.steps()[0].returned_value(), Some(&json!(false)));
        assert_ne!(truthy, falsy);
    }

    #[test]
    fn build_is_idempotent() {
        let stage = build_saga_scenario()
            .for_saga(task!(watch_flag))
            .with_action(Action::new("some-type"))
            .and_task(task!(flag_worker))
            .generate_effect(effect(1));
        assert_eq!(stage.build(), stage.build());
    }

    #[test]
    fn args_default_to_empty() {
        let scenario = build_saga_scenario()
            .for_saga(task!(watch_flag))
            .with_action(Action::new("some-type"))
            .and_task(task!(flag_worker))
            .generate_effect(effect(1))
            .build();
        assert!(scenario.args().is_empty());
    }

    #[test]
    fn forked_task_records_no_worker() {
        let scenario = build_saga_scenario()
            .for_saga(task!(watch_flag))
            .with_action(Action::new("some-type"))
            .and_forked_task()
            .generate_effect(effect(1))
            .build();
        assert_eq!(scenario.task(), None);
        assert_eq!(scenario.fork_helper(), None);
    }

    #[test]
    fn starved_override_is_recorded() {
        let scenario = build_saga_scenario()
            .for_saga(task!(watch_flag))
            .with_action(Action::new("some-type"))
            .and_task(task!(flag_worker))
            .generate_effect(effect(1))
            .returns(json!(1))
            .starved(false)
            .build();
        assert_eq!(scenario.starved(), Some(false));
        assert!(!scenario.expected_starved());
    }
}
