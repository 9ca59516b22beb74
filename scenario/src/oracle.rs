//! Equality oracle for scenario verification.
//!
//! The oracle replays a scenario and hands every individual check (the fork
//! signature, each step's effect, the final starvation flag) to a pluggable
//! comparison, one call per check and in replay order. The comparison decides
//! what a mismatch means: it may record it, log it, or panic.

use std::fmt;

use tracing::{info, instrument, warn};

use crate::core::effect::Effect;
use crate::core::scenario::Scenario;
use crate::error::ScenarioError;
use crate::io::config::HarnessConfig;
use crate::replay::{Replay, dispatch};

/// A value handed to the comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// Trigger pattern of a fork token; `None` when there is no usable fork.
    Signature(Option<String>),
    /// A step's effect; `None` when the worker had completed or raised.
    Effect(Option<Effect>),
    Starved(bool),
}

/// Which check an outcome belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    ForkSignature,
    /// Index into the scenario's steps.
    Step(usize),
    Starved,
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::ForkSignature => write!(f, "fork signature"),
            Check::Step(index) => write!(f, "step {}", index),
            Check::Starved => write!(f, "starvation"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub check: Check,
    pub actual: Observation,
    pub expected: Observation,
    pub passed: bool,
}

/// Every check issued during one verification, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Verification {
    pub checks: Vec<CheckOutcome>,
}

impl Verification {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|outcome| outcome.passed)
    }

    pub fn first_failure(&self) -> Option<&CheckOutcome> {
        self.checks.iter().find(|outcome| !outcome.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.checks.iter().filter(|outcome| !outcome.passed)
    }

    /// Human-readable list of failed checks.
    pub fn report(&self) -> String {
        self.failures()
            .map(|outcome| {
                format!(
                    "{}: expected {:?}, got {:?}",
                    outcome.check, outcome.expected, outcome.actual
                )
            })
            .collect::<Vec<_>>()
            .join("\n- ")
    }
}

/// Comparison used by the oracle: `(actual, expected) -> passed`.
pub trait Compare {
    fn compare(&mut self, actual: &Observation, expected: &Observation) -> bool;
}

impl<F> Compare for F
where
    F: FnMut(&Observation, &Observation) -> bool,
{
    fn compare(&mut self, actual: &Observation, expected: &Observation) -> bool {
        self(actual, expected)
    }
}

/// Deep structural equality.
pub fn structural_eq(actual: &Observation, expected: &Observation) -> bool {
    actual == expected
}

/// Build an oracle around `compare`.
pub fn make_oracle<C: Compare>(compare: C) -> Oracle<C> {
    Oracle::new(compare)
}

pub struct Oracle<C> {
    compare: C,
    fail_fast: bool,
}

impl<C: Compare> Oracle<C> {
    pub fn new(compare: C) -> Self {
        Self {
            compare,
            fail_fast: false,
        }
    }

    /// Apply harness settings (currently `fail_fast`).
    pub fn with_config(compare: C, config: &HarnessConfig) -> Self {
        Self {
            compare,
            fail_fast: config.fail_fast,
        }
    }

    /// Replay `scenario`, comparing each observation as soon as it is made.
    ///
    /// Returns `Err` only when the replay itself cannot proceed. A worker
    /// that raises mid-script is observed as a missing effect.
    #[instrument(skip_all, fields(saga = scenario.saga().name()))]
    pub fn verify(&mut self, scenario: &Scenario) -> Result<Verification, ScenarioError> {
        let mut verification = Verification::default();

        let dispatched = dispatch(scenario)?;
        let actual = dispatched
            .fork
            .as_ref()
            .and_then(Effect::fork_pattern)
            .map(str::to_string);
        if !self.check(
            &mut verification,
            Check::ForkSignature,
            Observation::Signature(actual),
            Observation::Signature(expected_signature(scenario)),
        ) {
            return Ok(verification);
        }

        let mut replay = Replay::start(scenario, &dispatched);
        for record in replay.by_ref() {
            if !self.check(
                &mut verification,
                Check::Step(record.index),
                Observation::Effect(record.actual),
                Observation::Effect(Some(record.expected.effect.clone())),
            ) {
                return Ok(verification);
            }
        }

        let starved = replay.probe();
        self.check(
            &mut verification,
            Check::Starved,
            Observation::Starved(starved),
            Observation::Starved(scenario.expected_starved()),
        );

        info!(
            checks = verification.checks.len(),
            passed = verification.passed(),
            "verification finished"
        );
        Ok(verification)
    }

    /// Run one comparison; returns whether verification should continue.
    fn check(
        &mut self,
        verification: &mut Verification,
        check: Check,
        actual: Observation,
        expected: Observation,
    ) -> bool {
        let passed = self.compare.compare(&actual, &expected);
        if !passed {
            warn!(%check, ?actual, ?expected, "check failed");
        }
        verification.checks.push(CheckOutcome {
            check,
            actual,
            expected,
            passed,
        });
        passed || !self.fail_fast
    }
}

/// Trigger pattern the dispatcher is expected to fork on.
///
/// Taken from the helper's synthesized fork when a helper is recorded,
/// otherwise from the scripted fork in the first step.
fn expected_signature(scenario: &Scenario) -> Option<String> {
    match scenario.synthesized_fork() {
        Some(fork) => fork.fork_pattern().map(str::to_string),
        None => scenario
            .steps()
            .first()
            .and_then(|step| step.effect.fork_pattern())
            .map(str::to_string),
    }
}

/// Verify `scenario` with [`structural_eq`] and panic on any failed check.
#[track_caller]
pub fn assert_saga(scenario: &Scenario) {
    match make_oracle(structural_eq).verify(scenario) {
        Ok(verification) if verification.passed() => {}
        Ok(verification) => panic!(
            "scenario for saga '{}' failed:\n- {}",
            scenario.saga().name(),
            verification.report()
        ),
        Err(err) => panic!(
            "scenario for saga '{}' could not be replayed: {}",
            scenario.saga().name(),
            err
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_saga_scenario;
    use crate::core::effect::{call, put, take_every};
    use crate::task;
    use crate::test_support::{
        error_action, fail_action, ok_action, quick_flag_worker, subscribed_action,
        watch_quick_flag,
    };
    use serde_json::json;

    fn scenario(flag: bool, reported: crate::core::types::Action) -> Scenario {
        build_saga_scenario()
            .for_saga(task!(watch_quick_flag))
            .taking(take_every())
            .with_action(subscribed_action())
            .and_task(task!(quick_flag_worker))
            .with_args(vec![json!("is_enabled")])
            .generate_effect(call("is_enabled", vec![json!(1)]))
            .returns(json!(flag))
            .generate_effect(put(reported))
            .build()
    }

    #[test]
    fn passing_scenario_issues_one_check_per_observation() {
        let verification = make_oracle(structural_eq)
            .verify(&scenario(true, ok_action()))
            .expect("verify");
        let checks: Vec<Check> = verification.checks.iter().map(|o| o.check).collect();
        assert_eq!(
            checks,
            vec![
                Check::ForkSignature,
                Check::Step(0),
                Check::Step(1),
                Check::Starved
            ]
        );
        assert!(verification.passed());
        assert!(verification.first_failure().is_none());
    }

    /// The comparison is called exactly once per check, in replay order.
    #[test]
    fn comparison_sees_every_check_in_order() {
        let mut seen = Vec::new();
        make_oracle(|actual: &Observation, expected: &Observation| {
            seen.push((actual.clone(), expected.clone()));
            true
        })
        .verify(&scenario(false, fail_action()))
        .expect("verify");

        assert_eq!(seen.len(), 4);
        assert_eq!(
            seen[0],
            (
                Observation::Signature(Some("some-type".to_string())),
                Observation::Signature(Some("some-type".to_string()))
            )
        );
        assert_eq!(
            seen[2].0,
            Observation::Effect(Some(put(fail_action())))
        );
        assert_eq!(
            seen[3],
            (Observation::Starved(true), Observation::Starved(true))
        );
    }

    #[test]
    fn mismatch_is_reported_without_stopping() {
        let verification = make_oracle(structural_eq)
            .verify(&scenario(false, ok_action()))
            .expect("verify");
        assert!(!verification.passed());
        assert_eq!(verification.failures().count(), 1);
        let failure = verification.first_failure().expect("failure");
        assert_eq!(failure.check, Check::Step(1));
        assert_eq!(verification.checks.len(), 4);
        assert!(verification.report().starts_with("step 1: expected"));
    }

    #[test]
    fn fail_fast_stops_after_first_failure() {
        let config = HarnessConfig {
            fail_fast: true,
            ..HarnessConfig::default()
        };
        let verification = Oracle::with_config(structural_eq, &config)
            .verify(&scenario(false, ok_action()))
            .expect("verify");
        assert_eq!(verification.checks.len(), 3);
        assert_eq!(
            verification.checks.last().map(|o| o.check),
            Some(Check::Step(1))
        );
    }

    /// A worker raising mid-script still gets every check issued.
    #[test]
    fn worker_raise_is_observed_as_missing_effect() {
        let scenario = build_saga_scenario()
            .for_saga(task!(watch_quick_flag))
            .taking(take_every())
            .with_action(subscribed_action())
            .and_task(task!(quick_flag_worker))
            .with_args(vec![json!("is_enabled")])
            .generate_effect(call("is_enabled", vec![json!(1)]))
            .throws(json!("x"))
            .generate_effect(put(error_action()))
            .throws(json!("y"))
            .generate_effect(put(ok_action()))
            .build();
        let verification = make_oracle(structural_eq)
            .verify(&scenario)
            .expect("verify");

        let checks: Vec<Check> = verification.checks.iter().map(|o| o.check).collect();
        assert_eq!(
            checks,
            vec![
                Check::ForkSignature,
                Check::Step(0),
                Check::Step(1),
                Check::Step(2),
                Check::Starved
            ]
        );
        let failed: Vec<&CheckOutcome> = verification.failures().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].check, Check::Step(2));
        assert_eq!(failed[0].actual, Observation::Effect(None));
        assert!(verification.checks.last().is_some_and(|o| o.passed));
    }

    #[test]
    fn assert_saga_accepts_matching_scenario() {
        assert_saga(&scenario(true, ok_action()));
    }

    #[test]
    #[should_panic(expected = "step 1")]
    fn assert_saga_panics_on_mismatch() {
        assert_saga(&scenario(true, fail_action()));
    }
}
