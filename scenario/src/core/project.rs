//! Expected-effect projection.

use crate::core::scenario::{Scenario, ScenarioOutput};

/// Project the effects a scenario expects, in order.
///
/// The recorded fork helper (if any) synthesizes the leading fork token; every
/// step's effect follows. Neither the dispatcher nor the worker is invoked.
pub fn project(scenario: &Scenario) -> ScenarioOutput {
    let mut effects = Vec::with_capacity(scenario.steps.len() + 1);
    effects.extend(scenario.synthesized_fork());
    effects.extend(scenario.steps.iter().map(|step| step.effect.clone()));
    ScenarioOutput {
        effects,
        starved: scenario.expected_starved(),
    }
}
