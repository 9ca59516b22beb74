//! Resumable coroutine contract.
//!
//! A coroutine is driven explicitly: each [`Coroutine::resume`] either feeds
//! a value into the pending yield or throws an error at it, and the coroutine
//! answers by yielding its next effect or by completing. A thrown value that
//! the coroutine does not handle escapes as `Err`.

use std::collections::VecDeque;

use serde_json::Value;

use crate::core::effect::Effect;

/// Input for one resumption.
#[derive(Debug, Clone, PartialEq)]
pub enum Resume {
    /// Resume normally; `Value::Null` stands for "no value".
    Next(Value),
    /// Throw the value at the pending yield.
    Throw(Value),
}

/// Outcome of one resumption.
#[derive(Debug, Clone, PartialEq)]
pub enum Suspend {
    Yielded(Effect),
    Done,
}

impl Suspend {
    pub fn is_done(&self) -> bool {
        matches!(self, Suspend::Done)
    }

    pub fn into_effect(self) -> Option<Effect> {
        match self {
            Suspend::Yielded(effect) => Some(effect),
            Suspend::Done => None,
        }
    }
}

/// A cooperative coroutine yielding effect tokens.
///
/// Once a coroutine reports [`Suspend::Done`] or raises, later resumptions
/// must report `Done` (resuming a finished coroutine is a no-op).
pub trait Coroutine {
    /// Resume the coroutine. `Err` carries a thrown value it did not handle.
    fn resume(&mut self, input: Resume) -> Result<Suspend, Value>;

    fn next(&mut self, value: Value) -> Result<Suspend, Value> {
        self.resume(Resume::Next(value))
    }

    fn throw(&mut self, error: Value) -> Result<Suspend, Value> {
        self.resume(Resume::Throw(error))
    }
}

/// Adapter that enforces "finished stays finished" on any coroutine.
pub struct Fused {
    inner: Box<dyn Coroutine>,
    finished: bool,
}

impl Fused {
    pub fn new(inner: Box<dyn Coroutine>) -> Self {
        Self {
            inner,
            finished: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Coroutine for Fused {
    fn resume(&mut self, input: Resume) -> Result<Suspend, Value> {
        if self.finished {
            return Ok(Suspend::Done);
        }
        let outcome = self.inner.resume(input);
        if !matches!(outcome, Ok(Suspend::Yielded(_))) {
            self.finished = true;
        }
        outcome
    }
}

/// Coroutine that yields a fixed list of effects and ignores resumed values.
///
/// A thrown value is never handled: it escapes and the sequence finishes.
pub struct Sequence {
    effects: VecDeque<Effect>,
}

impl Sequence {
    pub fn new(effects: Vec<Effect>) -> Self {
        Self {
            effects: effects.into(),
        }
    }

    /// The usual dispatcher body: yield one effect, then complete.
    pub fn once(effect: Effect) -> Self {
        Self::new(vec![effect])
    }
}

impl Coroutine for Sequence {
    fn resume(&mut self, input: Resume) -> Result<Suspend, Value> {
        if let Resume::Throw(error) = input {
            self.effects.clear();
            return Err(error);
        }
        Ok(self
            .effects
            .pop_front()
            .map_or(Suspend::Done, Suspend::Yielded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::effect::{call, put};
    use crate::core::types::Action;
    use serde_json::json;

    #[test]
    fn sequence_yields_in_order_then_completes() {
        let mut seq = Sequence::new(vec![call("f", vec![]), put(Action::new("a"))]);
        assert_eq!(
            seq.next(Value::Null),
            Ok(Suspend::Yielded(call("f", vec![])))
        );
        assert_eq!(
            seq.next(json!(true)),
            Ok(Suspend::Yielded(put(Action::new("a"))))
        );
        assert_eq!(seq.next(Value::Null), Ok(Suspend::Done));
    }

    #[test]
    fn sequence_lets_thrown_values_escape() {
        let mut seq = Sequence::once(call("f", vec![]));
        assert_eq!(seq.throw(json!("boom")), Err(json!("boom")));
        assert_eq!(seq.next(Value::Null), Ok(Suspend::Done));
    }

    /// A fused coroutine never calls into its inner coroutine after it finished.
    #[test]
    fn fused_stays_finished_after_raise() {
        let mut fused = Fused::new(Box::new(Sequence::new(vec![
            call("f", vec![]),
            call("g", vec![]),
        ])));
        assert!(matches!(fused.next(Value::Null), Ok(Suspend::Yielded(_))));
        assert_eq!(fused.throw(json!("x")), Err(json!("x")));
        assert!(fused.is_finished());
        assert_eq!(fused.next(Value::Null), Ok(Suspend::Done));
        assert_eq!(fused.throw(json!("y")), Ok(Suspend::Done));
    }

    #[test]
    fn suspend_helpers() {
        assert!(Suspend::Done.is_done());
        assert_eq!(Suspend::Done.into_effect(), None);
        let effect = put(Action::new("a"));
        assert_eq!(Suspend::Yielded(effect.clone()).into_effect(), Some(effect));
    }
}
