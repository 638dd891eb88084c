/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/2/26
******************************************************************************/

//! Step types.
//!
//! A [`Step`] is a unit of work submitted to the [`Sequencer`]. It receives a
//! [`StepContext`] and must eventually call [`StepContext::done`] or
//! [`StepContext::fail`], either before returning or later from a timer or
//! I/O callback.

use super::core::Sequencer;
use super::result::StepOutcome;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

static NULL: Value = Value::Null;

/// Signature shared by every step function.
pub type StepFn = dyn Fn(StepContext) -> StepOutcome + Send + Sync;

/// How a fanned-out argument is handed to the step.
///
/// # Examples
///
/// ```
/// use sequencer_rs::{Invocation, Sequencer, StepOutcome};
/// use serde_json::json;
///
/// let seq = Sequencer::new();
/// seq.then_with(
///     |ctx| {
///         assert_eq!(ctx.args().len(), 2);
///         ctx.done(());
///         StepOutcome::Continue
///     },
///     vec![json!([1, 2]), json!([3, 4])],
///     Invocation::Apply,
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Invocation {
    /// The argument is passed as a single value.
    #[default]
    Call,

    /// An array argument is spread into positional arguments.
    Apply,
}

/// Arguments bound to a queued step.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Binding {
    /// The step receives the previous step's result.
    Previous,

    /// The step receives one fanned-out argument.
    Call(Value),

    /// The step receives fanned-out positional arguments.
    Apply(Vec<Value>),
}

impl Binding {
    pub(crate) fn from_argument(argument: Value, invocation: Invocation) -> Self {
        match (invocation, argument) {
            (Invocation::Apply, Value::Array(items)) => Self::Apply(items),
            // A scalar spreads into a single positional argument.
            (Invocation::Apply, other) => Self::Apply(vec![other]),
            (Invocation::Call, other) => Self::Call(other),
        }
    }

    fn resolve(&self, previous: &Value) -> Vec<Value> {
        match self {
            Self::Previous => vec![previous.clone()],
            Self::Call(argument) => vec![argument.clone()],
            Self::Apply(arguments) => arguments.clone(),
        }
    }
}

/// A queued unit of work: the step function, an optional label and the
/// arguments bound to it.
///
/// Cloning a `Step` is cheap and keeps the identity of the underlying
/// function, which is what the replay journal records.
#[derive(Clone)]
pub struct Step {
    func: Arc<StepFn>,
    name: Option<Arc<str>>,
    binding: Binding,
}

impl Step {
    /// Wraps a step function.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(StepContext) -> StepOutcome + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            name: None,
            binding: Binding::Previous,
        }
    }

    /// Wraps a step function and labels it.
    ///
    /// The label is reported by [`Sequencer::current_step_name`] while the
    /// step runs and carried in every [`StepEvent`](super::StepEvent).
    pub fn named<F>(name: impl Into<Arc<str>>, func: F) -> Self
    where
        F: Fn(StepContext) -> StepOutcome + Send + Sync + 'static,
    {
        Self::new(func).with_name(name)
    }

    /// Returns the step with the given label.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the step's label, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns `true` if both steps wrap the same function.
    #[must_use]
    pub fn same_fn(&self, other: &Step) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }

    pub(crate) fn bound(&self, binding: Binding) -> Self {
        Self {
            func: Arc::clone(&self.func),
            name: self.name.clone(),
            binding,
        }
    }

    pub(crate) fn name_arc(&self) -> Option<Arc<str>> {
        self.name.clone()
    }

    pub(crate) fn invoke(&self, sequencer: &Sequencer, previous: Value) -> StepOutcome {
        let args = self.binding.resolve(&previous);
        let ctx = StepContext {
            sequencer: sequencer.clone(),
            previous,
            args,
        };
        (self.func)(ctx)
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}

/// Handle passed to a running step.
///
/// The context owns a handle to its sequencer, so it can be cloned and moved
/// into a timer or callback that calls [`done`](Self::done) later.
#[derive(Clone)]
pub struct StepContext {
    sequencer: Sequencer,
    previous: Value,
    args: Vec<Value>,
}

impl StepContext {
    /// Result of the previous step, as passed to its `done`.
    #[must_use]
    pub fn previous(&self) -> &Value {
        &self.previous
    }

    /// The step's primary input.
    ///
    /// For plain steps this is the previous result. For fanned-out steps it is
    /// the bound argument (or the first positional argument under
    /// [`Invocation::Apply`]).
    #[must_use]
    pub fn input(&self) -> &Value {
        self.args.first().unwrap_or(&NULL)
    }

    /// All positional arguments of this invocation.
    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Positional argument `index`, or `Null` when absent.
    #[must_use]
    pub fn arg(&self, index: usize) -> &Value {
        self.args.get(index).unwrap_or(&NULL)
    }

    /// The sequencer running this step.
    #[must_use]
    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    /// Completes the step and passes `result` to the next one.
    pub fn done(&self, result: impl Into<Value>) {
        self.sequencer.done(result);
    }

    /// Aborts the chain with `data`.
    pub fn fail(&self, data: impl Into<Value>) {
        self.sequencer.fail(data);
    }
}

impl fmt::Debug for StepContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepContext")
            .field("sequencer", &self.sequencer.id())
            .field("previous", &self.previous)
            .field("args", &self.args)
            .finish()
    }
}
