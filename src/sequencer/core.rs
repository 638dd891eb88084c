/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/2/26
******************************************************************************/

//! Core Sequencer implementation.
//!
//! This module provides the main Sequencer handle. All state lives behind one
//! mutex that is never held while user code (steps, observers, listeners)
//! runs, so every callback may freely call back into the sequencer.
//!
//! # Queue-of-queues
//!
//! Pending steps are kept in an ordered sequence of FIFO queues. The drain
//! loop always takes from the front queue. When it pops a step and that queue
//! still holds siblings, a new empty queue is pushed in front of it: anything
//! the popped step enqueues with `then` lands there and is fully drained
//! before the siblings resume. Empty front queues are discarded as the loop
//! moves on, so the sequence collapses to empty exactly when the chain is
//! drained.
//!
//! # Re-entry
//!
//! A `done` issued while the same sequencer is already draining (typically a
//! synchronous step completing before it returns) only stores the result and
//! asks the running loop to continue once the step returns. Steps therefore
//! run one after another at constant stack depth, and each step's
//! [`StepOutcome`] is known before the next one starts.

use super::event::{StepEvent, StepEventKind};
use super::journal::{JournalEntry, StepJournal};
use super::observer::{self, EventListener, ObserverFn, ObserverId, ObserverKind, Observers};
use super::receipt::Receipt;
use super::replay::{LoopCount, LoopState};
use super::result::StepOutcome;
use super::settings::SharedSettings;
use super::step::{Binding, Invocation, Step, StepContext};
use super::timer;
use crate::config::SequencerConfig;
use bitflags::bitflags;
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, error, trace};
use uuid::Uuid;

/// Callback handed the sequencer, used by `stop`, `restart` and `erase`.
type Hook = Arc<dyn Fn(&Sequencer) + Send + Sync>;

type Queue = VecDeque<Step>;

bitflags! {
    /// Orthogonal state flags of a sequencer.
    ///
    /// Legal combinations are: idle (empty), `RUNNING`,
    /// `RUNNING | LOOPING`, `RUNNING | PAUSED` and
    /// `RUNNING | PAUSED | LOOPING`. `LOOPING` may also be observed on an idle
    /// sequencer between a recording run and its replay.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SequencerState: u8 {
        /// A chain has started and has not drained yet.
        const RUNNING = 0b0001;
        /// Forward progress is suspended by `stop`.
        const PAUSED = 0b0010;
        /// Executed steps are recorded for replay.
        const LOOPING = 0b0100;
    }
}

impl SequencerState {
    /// Returns `true` when no chain is running.
    #[inline]
    #[must_use]
    pub fn is_idle(&self) -> bool {
        !self.intersects(Self::RUNNING | Self::PAUSED)
    }
}

struct State {
    queues: VecDeque<Queue>,
    flags: SequencerState,
    draining: bool,
    resume_requested: bool,
    loop_state: LoopState,
    journal: StepJournal,
    last_result: Value,
    current_step_name: Option<Arc<str>>,
    observers: Observers,
    listeners: Vec<EventListener>,
}

impl State {
    fn new(journal_capacity: usize, observers: Observers, listeners: Vec<EventListener>) -> Self {
        Self {
            queues: VecDeque::new(),
            flags: SequencerState::empty(),
            draining: false,
            resume_requested: false,
            loop_state: LoopState::Disabled,
            journal: StepJournal::with_capacity(journal_capacity),
            last_result: Value::Null,
            current_step_name: None,
            observers,
            listeners,
        }
    }

    fn front_queue(&mut self) -> &mut Queue {
        if self.queues.is_empty() {
            self.queues.push_front(Queue::new());
        }
        &mut self.queues[0]
    }

    /// Marks the chain started. Returns `true` if it was idle, in which case
    /// the caller is responsible for kicking off the drain.
    fn start(&mut self) -> bool {
        if self.flags.contains(SequencerState::RUNNING) {
            return false;
        }
        self.flags.insert(SequencerState::RUNNING);
        true
    }

    fn next_step(&mut self) -> Option<Step> {
        while let Some(front) = self.queues.front_mut() {
            if let Some(step) = front.pop_front() {
                if !front.is_empty() {
                    self.queues.push_front(Queue::new());
                }
                return Some(step);
            }
            self.queues.pop_front();
        }
        None
    }

    fn stack_length(&self) -> usize {
        let pending: usize = self.queues.iter().map(VecDeque::len).sum();
        pending + usize::from(self.flags.contains(SequencerState::RUNNING))
    }

    /// Ends a pass of the drain loop. Returns `true` if a `done` arrived
    /// meanwhile and the loop must continue.
    fn settle(&mut self) -> bool {
        if self.resume_requested {
            return true;
        }
        self.draining = false;
        false
    }

    fn reset(&mut self) {
        self.queues.clear();
        self.flags
            .remove(SequencerState::RUNNING | SequencerState::PAUSED);
        self.loop_state = LoopState::Disabled;
        self.journal.clear();
    }
}

struct Inner {
    id: Uuid,
    config: SequencerConfig,
    state: Mutex<State>,
    settings: Arc<SharedSettings>,
    write_through: Arc<SharedSettings>,
    sequence: AtomicU64,
}

/// A cooperative sequencer of synchronous and asynchronous steps.
///
/// `Sequencer` is a cheap, cloneable handle; clones made with [`Clone`] refer
/// to the same instance. Use [`fork`](Self::fork) to create an independent
/// chain.
///
/// Steps run strictly one at a time in FIFO order. Each step receives the
/// previous step's result and must call `done(result)` to advance or
/// `fail(data)` to abort the chain. A step that never calls back stalls the
/// chain; steps must not panic.
///
/// # Examples
///
/// ```
/// use sequencer_rs::{Sequencer, StepOutcome};
///
/// let seq = Sequencer::new();
/// seq.then(|ctx| {
///     ctx.done(1);
///     StepOutcome::Continue
/// })
/// .queue(|previous| {
///     assert_eq!(previous, 1);
///     StepOutcome::Continue
/// });
/// assert_eq!(seq.last_result(), 1);
/// ```
#[derive(Clone)]
pub struct Sequencer {
    inner: Arc<Inner>,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequencer {
    /// Creates a new idle Sequencer with the default configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use sequencer_rs::Sequencer;
    ///
    /// let sequencer = Sequencer::new();
    /// assert!(sequencer.state().is_idle());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SequencerConfig::default())
    }

    /// Creates a new idle Sequencer with a specific configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Name and journal sizing of the sequencer
    #[must_use]
    pub fn with_config(config: SequencerConfig) -> Self {
        let settings = SharedSettings::root();
        Self::build(
            config,
            Arc::clone(&settings),
            settings,
            Observers::default(),
            Vec::new(),
        )
    }

    fn build(
        config: SequencerConfig,
        settings: Arc<SharedSettings>,
        write_through: Arc<SharedSettings>,
        observers: Observers,
        listeners: Vec<EventListener>,
    ) -> Self {
        let state = State::new(config.journal_capacity, observers, listeners);
        Self {
            inner: Arc::new(Inner {
                id: Uuid::new_v4(),
                config,
                state: Mutex::new(state),
                settings,
                write_through,
                sequence: AtomicU64::new(1),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Unique identity of this instance.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Configured name of this instance.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// Configuration this instance was built with.
    #[must_use]
    pub fn config(&self) -> &SequencerConfig {
        &self.inner.config
    }

    /// Returns `true` if both handles refer to the same instance.
    #[must_use]
    pub fn same_instance(&self, other: &Sequencer) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ------------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------------

    /// Enqueues an asynchronous step.
    ///
    /// The step receives the previous result and must call `done` or `fail`,
    /// now or later. If the sequencer is idle, draining starts synchronously
    /// inside this call.
    pub fn then<F>(&self, f: F) -> &Self
    where
        F: Fn(StepContext) -> StepOutcome + Send + Sync + 'static,
    {
        self.then_step(Step::new(f))
    }

    /// Enqueues a prepared [`Step`].
    pub fn then_step(&self, step: Step) -> &Self {
        self.enqueue(std::iter::once(step))
    }

    /// Enqueues `f` once per element of `args`, in order.
    ///
    /// Under [`Invocation::Call`] each invocation receives its element as
    /// [`StepContext::input`]; under [`Invocation::Apply`] an array element is
    /// spread into [`StepContext::args`]. With no arguments this behaves like
    /// [`then`](Self::then).
    ///
    /// # Examples
    ///
    /// ```
    /// use sequencer_rs::{Invocation, Sequencer, StepOutcome};
    /// use serde_json::json;
    /// use std::sync::{Arc, Mutex};
    ///
    /// let seen = Arc::new(Mutex::new(Vec::new()));
    /// let sink = Arc::clone(&seen);
    /// Sequencer::new().then_with(
    ///     move |ctx| {
    ///         sink.lock().unwrap().push(ctx.input().clone());
    ///         ctx.done(());
    ///         StepOutcome::Continue
    ///     },
    ///     vec![json!("a"), json!("b")],
    ///     Invocation::Call,
    /// );
    /// assert_eq!(*seen.lock().unwrap(), vec![json!("a"), json!("b")]);
    /// ```
    pub fn then_with<F>(&self, f: F, args: Vec<Value>, invocation: Invocation) -> &Self
    where
        F: Fn(StepContext) -> StepOutcome + Send + Sync + 'static,
    {
        let step = Step::new(f);
        if args.is_empty() {
            return self.then_step(step);
        }
        self.enqueue(
            args.into_iter()
                .map(|argument| step.bound(Binding::from_argument(argument, invocation))),
        )
    }

    fn enqueue(&self, steps: impl IntoIterator<Item = Step>) -> &Self {
        let start = {
            let mut state = self.lock();
            state.front_queue().extend(steps);
            state.start()
        };
        if start {
            self.advance(None);
        }
        self
    }

    /// Enqueues a synchronous step.
    ///
    /// `f` receives the previous result; the sequencer calls `done` with that
    /// same, unchanged result right after `f` returns. `f` may return
    /// [`StepOutcome::Once`] to keep its invocation out of the replay journal.
    pub fn queue<F>(&self, f: F) -> &Self
    where
        F: Fn(&Value) -> StepOutcome + Send + Sync + 'static,
    {
        self.then(move |ctx| {
            let outcome = f(ctx.previous());
            ctx.done(ctx.previous().clone());
            outcome
        })
    }

    /// Inserts a step at the very front of the current queue.
    ///
    /// Unlike [`then`](Self::then), an idle sequencer does not start inside
    /// this call: draining begins on the next scheduler tick. Use sparingly,
    /// the step runs ahead of everything already queued.
    pub fn now<F>(&self, f: F) -> &Self
    where
        F: Fn(StepContext) -> StepOutcome + Send + Sync + 'static,
    {
        self.now_step(Step::new(f))
    }

    /// Inserts a prepared [`Step`] at the very front of the current queue.
    pub fn now_step(&self, step: Step) -> &Self {
        let start = {
            let mut state = self.lock();
            state.front_queue().push_front(step);
            state.start()
        };
        if start {
            let this = self.clone();
            timer::defer(Duration::ZERO, move || this.advance(None));
        }
        self
    }

    /// Inserts, at the very front, a step that fails the chain with `data`.
    pub fn now_fail(&self, data: impl Into<Value>) -> &Self {
        let data = data.into();
        self.now_step(Step::named("now_fail", move |ctx| {
            ctx.fail(data.clone());
            StepOutcome::Continue
        }))
    }

    /// Enqueues a step that waits `duration` before passing the previous
    /// result on.
    ///
    /// With `once` set the delay itself is never recorded for replay, so a
    /// looped chain can start with a one-shot delay.
    pub fn delay(&self, duration: Duration, once: bool) -> &Self {
        self.then_step(Step::named("delay", move |ctx| {
            let result = ctx.previous().clone();
            timer::defer(duration, move || ctx.done(result));
            StepOutcome::once_if(once)
        }))
    }

    // ------------------------------------------------------------------
    // Continuations
    // ------------------------------------------------------------------

    /// Completes the step in flight and runs the next ones.
    ///
    /// `result` becomes the input of the next step. When every queue is
    /// exhausted the chain stops, `complete` observers fire, and a recording
    /// loop re-enqueues its journal.
    pub fn done(&self, result: impl Into<Value>) {
        self.advance(Some(result.into()));
    }

    fn advance(&self, result: Option<Value>) {
        {
            let mut state = self.lock();
            if let Some(result) = result {
                state.last_result = result;
            }
            if state.draining {
                state.resume_requested = true;
                return;
            }
            state.draining = true;
        }
        self.drain();
    }

    fn drain(&self) {
        loop {
            let (next, previous, listeners) = {
                let mut state = self.lock();
                state.resume_requested = false;
                state.current_step_name = None;
                let next = state.next_step();
                if let Some(step) = &next {
                    state.current_step_name = step.name_arc();
                }
                (next, state.last_result.clone(), state.listeners.clone())
            };

            let keep_going = match next {
                Some(step) => self.run_step(&step, previous, &listeners),
                None => self.finish(previous, &listeners),
            };
            if !keep_going {
                return;
            }
        }
    }

    fn run_step(&self, step: &Step, previous: Value, listeners: &[EventListener]) -> bool {
        let sequence_num = self.emit(listeners, step.name_arc(), || StepEventKind::Invoked {
            input: previous.clone(),
        });
        trace!(
            sequencer = %self.inner.config.name,
            id = %self.inner.id,
            sequence_num,
            step = step.name().unwrap_or("<anonymous>"),
            "invoking step"
        );

        let outcome = step.invoke(self, previous);

        let mut state = self.lock();
        if outcome.is_recordable() && state.loop_state.is_recording() {
            state.journal.record(sequence_num, step.clone());
        }
        state.settle()
    }

    fn finish(&self, result: Value, listeners: &[EventListener]) -> bool {
        let callbacks = {
            let mut state = self.lock();
            state.flags.remove(SequencerState::RUNNING);
            state.observers.take_for_firing(ObserverKind::Complete)
        };
        debug!(
            sequencer = %self.inner.config.name,
            id = %self.inner.id,
            "chain drained"
        );
        self.emit(listeners, None, || StepEventKind::Drained { result });
        observer::fire(&callbacks, self, &Value::Null);

        let mut guard = self.lock();
        let state = &mut *guard;
        if let Some(steps) = state.loop_state.next_cycle(&mut state.journal) {
            debug!(
                sequencer = %self.inner.config.name,
                id = %self.inner.id,
                replayed = steps.len(),
                remaining = ?state.loop_state.remaining(),
                "replaying recorded steps"
            );
            if !steps.is_empty() {
                state.front_queue().extend(steps);
                if state.start() {
                    state.resume_requested = true;
                }
            }
        }
        state.settle()
    }

    /// Aborts the chain.
    ///
    /// Fires every `failure` observer with `data`, then drops all pending
    /// steps and clears the paused and looping state. The now-empty chain is
    /// drained, which fires the `complete` observers. The instance stays
    /// usable.
    pub fn fail(&self, data: impl Into<Value>) {
        let data = data.into();
        let (callbacks, listeners, step_name) = {
            let mut state = self.lock();
            (
                state.observers.take_for_firing(ObserverKind::Failure),
                state.listeners.clone(),
                state.current_step_name.clone(),
            )
        };
        debug!(
            sequencer = %self.inner.config.name,
            id = %self.inner.id,
            data = %data,
            "chain failed"
        );
        self.emit(&listeners, step_name, || StepEventKind::Failed { data: data.clone() });
        observer::fire(&callbacks, self, &data);

        self.lock().reset();
        self.advance(None);
    }

    /// Enqueues a step that pipes this chain's result into `other`.
    ///
    /// The step calls `other.done(previous)` and then advances this chain
    /// with `Null`. Piping a sequencer into itself is a usage error: it is
    /// logged and replaced by a plain `done(Null)`.
    pub fn then_done(&self, other: &Sequencer) -> &Self {
        if self.same_instance(other) {
            error!(
                sequencer = %self.inner.config.name,
                id = %self.inner.id,
                "{}",
                SequencerError::SelfPipe
            );
            self.done(Value::Null);
            return self;
        }
        let other = other.clone();
        self.then_step(Step::named("then_done", move |ctx| {
            other.done(ctx.previous().clone());
            ctx.done(Value::Null);
            StepOutcome::Continue
        }))
    }

    /// Calls `done` once every busy sequencer in `others` has completed.
    ///
    /// This acts immediately, not through the queue: use it in place of
    /// `done` inside a step. Sequencers with no outstanding work count as
    /// complete. The result is an array of each sequencer's last result, in
    /// the order given.
    pub fn done_when(&self, others: &[Sequencer]) -> &Self {
        let others: Arc<[Sequencer]> = Arc::from(others);
        // Starts at one so that no observer can reach zero before every
        // registration is made.
        let remaining = Arc::new(AtomicUsize::new(1));

        for other in others.iter() {
            remaining.fetch_add(1, Ordering::AcqRel);
            let this = self.clone();
            let all = Arc::clone(&others);
            let counter = Arc::clone(&remaining);
            let callback: ObserverFn = Arc::new(move |_: &Sequencer, _: &Value| {
                if counter.fetch_sub(1, Ordering::AcqRel) == 1 {
                    this.done(collect_results(&all));
                }
            });
            if !other.observe_if_busy(callback) {
                remaining.fetch_sub(1, Ordering::AcqRel);
            }
        }

        if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.done(collect_results(&others));
        }
        self
    }

    /// Waits for `others` before the next step of this chain.
    ///
    /// Each of `others` is stopped right away. A step is enqueued on this
    /// sequencer that restarts them and then behaves like
    /// [`done_when`](Self::done_when).
    pub fn when(&self, others: &[Sequencer]) -> &Self {
        for other in others {
            other.stop();
        }
        let others = others.to_vec();
        self.then_step(Step::named("when", move |ctx| {
            for other in &others {
                other.restart();
            }
            ctx.sequencer().done_when(&others);
            StepOutcome::Continue
        }))
    }

    // ------------------------------------------------------------------
    // Pause and loop control
    // ------------------------------------------------------------------

    /// Suspends the chain as soon as possible.
    ///
    /// No-op if the sequencer is idle or already stopped. A synthetic step is
    /// inserted at the front of the queue; it never calls `done`, so forward
    /// progress halts there until [`restart`](Self::restart).
    pub fn stop(&self) -> &Self {
        self.stop_inner(None, false)
    }

    /// Suspends the chain and calls `on_stop` when the suspension takes
    /// effect.
    ///
    /// With `deferred` set the synthetic step is appended to the queue
    /// instead of inserted at the front, so already queued steps run first.
    pub fn stop_with<F>(&self, on_stop: F, deferred: bool) -> &Self
    where
        F: Fn(&Sequencer) + Send + Sync + 'static,
    {
        self.stop_inner(Some(Arc::new(on_stop)), deferred)
    }

    fn stop_inner(&self, on_stop: Option<Hook>, deferred: bool) -> &Self {
        {
            let mut state = self.lock();
            if state.queues.is_empty() || state.flags.contains(SequencerState::PAUSED) {
                return self;
            }
            state.flags.insert(SequencerState::PAUSED);
        }
        let step = Step::named("stop", move |ctx| {
            if let Some(hook) = &on_stop {
                hook(ctx.sequencer());
            }
            StepOutcome::Once
        });
        if deferred {
            self.then_step(step)
        } else {
            self.now_step(step)
        }
    }

    /// Resumes a stopped chain with the result that was current when it
    /// stopped. No-op unless stopped.
    pub fn restart(&self) -> &Self {
        self.restart_inner(None)
    }

    /// Resumes a stopped chain, calling `on_restart` first.
    pub fn restart_with<F>(&self, on_restart: F) -> &Self
    where
        F: Fn(&Sequencer) + Send + Sync + 'static,
    {
        self.restart_inner(Some(Arc::new(on_restart)))
    }

    fn restart_inner(&self, on_restart: Option<Hook>) -> &Self {
        {
            let mut state = self.lock();
            if state.queues.is_empty() || !state.flags.contains(SequencerState::PAUSED) {
                return self;
            }
            state.flags.remove(SequencerState::PAUSED);
        }
        if let Some(hook) = on_restart {
            hook(self);
        }
        debug!(
            sequencer = %self.inner.config.name,
            id = %self.inner.id,
            "restarting chain"
        );
        self.advance(None);
        self
    }

    /// Starts recording executed steps for replay.
    ///
    /// Enqueues a step that switches recording on and passes the previous
    /// result along. `None` replays forever; `Some(n)` replays `n` more times
    /// after the current run; `Some(0)` records without replaying. No-op if
    /// already recording.
    pub fn repeat(&self, count: Option<u32>) -> &Self {
        if self.lock().loop_state.is_recording() {
            return self;
        }
        let count = LoopCount::from(count);
        self.then_step(Step::named("repeat", move |ctx| {
            {
                let mut guard = ctx.sequencer().lock();
                let state = &mut *guard;
                state.journal.clear();
                state.loop_state = LoopState::Recording(count);
            }
            ctx.done(ctx.previous().clone());
            StepOutcome::Once
        }))
    }

    /// Stops recording and clears the journal. No-op unless recording.
    pub fn erase(&self) -> &Self {
        self.erase_inner(None)
    }

    /// Stops recording, clears the journal, then calls `on_erase`.
    pub fn erase_with<F>(&self, on_erase: F) -> &Self
    where
        F: Fn(&Sequencer) + Send + Sync + 'static,
    {
        self.erase_inner(Some(Arc::new(on_erase)))
    }

    fn erase_inner(&self, on_erase: Option<Hook>) -> &Self {
        {
            let mut state = self.lock();
            if !state.loop_state.is_recording() {
                return self;
            }
            state.loop_state = LoopState::Disabled;
            state.journal.clear();
        }
        if let Some(hook) = on_erase {
            hook(self);
        }
        self
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    /// Registers a `failure` observer, called with the failure payload.
    pub fn on_failure<F>(&self, f: F) -> &Self
    where
        F: Fn(&Sequencer, &Value) + Send + Sync + 'static,
    {
        self.observe(ObserverKind::Failure, Arc::new(f), false)
    }

    /// Registers a `failure` observer removed after its first call.
    pub fn on_failure_once<F>(&self, f: F) -> &Self
    where
        F: Fn(&Sequencer, &Value) + Send + Sync + 'static,
    {
        self.observe(ObserverKind::Failure, Arc::new(f), true)
    }

    /// Registers a `complete` observer, called with `Null` whenever the chain
    /// drains.
    pub fn on_complete<F>(&self, f: F) -> &Self
    where
        F: Fn(&Sequencer, &Value) + Send + Sync + 'static,
    {
        self.observe(ObserverKind::Complete, Arc::new(f), false)
    }

    /// Registers a `complete` observer removed after its first call.
    pub fn on_complete_once<F>(&self, f: F) -> &Self
    where
        F: Fn(&Sequencer, &Value) + Send + Sync + 'static,
    {
        self.observe(ObserverKind::Complete, Arc::new(f), true)
    }

    fn observe(&self, kind: ObserverKind, callback: ObserverFn, once: bool) -> &Self {
        self.lock().observers.register(kind, callback, once);
        self
    }

    /// Registers a one-shot `complete` observer only if work is outstanding.
    fn observe_if_busy(&self, callback: ObserverFn) -> bool {
        let mut state = self.lock();
        if state.stack_length() == 0 {
            return false;
        }
        state
            .observers
            .register(ObserverKind::Complete, callback, true);
        true
    }

    fn forget_observer(&self, kind: ObserverKind, id: ObserverId) {
        self.lock().observers.remove(kind, id);
    }

    /// Number of registered `failure` observers.
    #[must_use]
    pub fn failure_observers(&self) -> usize {
        self.lock().observers.len(ObserverKind::Failure)
    }

    /// Number of registered `complete` observers.
    #[must_use]
    pub fn complete_observers(&self) -> usize {
        self.lock().observers.len(ObserverKind::Complete)
    }

    /// Registers an event listener.
    ///
    /// Listeners are called synchronously, in sequence order, for every step
    /// invocation, drain and failure of this instance.
    ///
    /// # Arguments
    ///
    /// * `listener` - Function to call for each event
    pub fn add_listener<F>(&self, listener: F) -> &Self
    where
        F: Fn(&StepEvent) + Send + Sync + 'static,
    {
        self.lock().listeners.push(Arc::new(listener));
        self
    }

    fn emit(
        &self,
        listeners: &[EventListener],
        step_name: Option<Arc<str>>,
        kind: impl FnOnce() -> StepEventKind,
    ) -> u64 {
        let sequence_num = self.inner.sequence.fetch_add(1, Ordering::Relaxed);
        if !listeners.is_empty() {
            let event = StepEvent::new(
                sequence_num,
                nanos_since_epoch(),
                self.inner.id,
                step_name,
                kind(),
            );
            for listener in listeners {
                listener(&event);
            }
        }
        sequence_num
    }

    /// Returns a future resolving on the next completion or failure.
    ///
    /// The observers are registered when this method is called, not when the
    /// future is first polled, so it can be created before the chain is
    /// seeded.
    ///
    /// # Errors
    ///
    /// The future yields [`SequencerError::Failed`] if the chain fails first,
    /// or [`SequencerError::Shutdown`] if the sequencer is dropped before
    /// either happens.
    ///
    /// # Examples
    ///
    /// ```
    /// use sequencer_rs::{Sequencer, StepOutcome};
    /// use std::time::Duration;
    ///
    /// # async fn example() -> Result<(), sequencer_rs::SequencerError> {
    /// let seq = Sequencer::new();
    /// let finished = seq.completion();
    /// seq.delay(Duration::from_millis(5), false).then(|ctx| {
    ///     ctx.done("ok");
    ///     StepOutcome::Continue
    /// });
    /// let receipt = finished.await?;
    /// assert_eq!(receipt.result, "ok");
    /// # Ok(())
    /// # }
    /// ```
    pub fn completion(
        &self,
    ) -> impl Future<Output = Result<Receipt, SequencerError>> + Send + use<> {
        let (tx, rx) = oneshot::channel::<Result<Receipt, SequencerError>>();
        let slot = Arc::new(Mutex::new(Some(tx)));

        {
            let mut state = self.lock();
            let complete_id = state.observers.reserve();
            let failure_id = state.observers.reserve();

            // Whichever fires first unregisters the other.
            let on_complete: ObserverFn = {
                let slot = Arc::clone(&slot);
                Arc::new(move |seq: &Sequencer, _: &Value| {
                    seq.forget_observer(ObserverKind::Failure, failure_id);
                    if let Some(tx) = take_sender(&slot) {
                        let _ = tx.send(Ok(Receipt::new(seq.last_sequence(), seq.last_result())));
                    }
                })
            };
            let on_failure: ObserverFn = Arc::new(move |seq: &Sequencer, data: &Value| {
                seq.forget_observer(ObserverKind::Complete, complete_id);
                if let Some(tx) = take_sender(&slot) {
                    let _ = tx.send(Err(SequencerError::Failed { data: data.clone() }));
                }
            });

            state
                .observers
                .insert(ObserverKind::Complete, complete_id, on_complete, true);
            state
                .observers
                .insert(ObserverKind::Failure, failure_id, on_failure, true);
        }

        async move {
            match rx.await {
                Ok(outcome) => outcome,
                Err(_) => Err(SequencerError::Shutdown),
            }
        }
    }

    // ------------------------------------------------------------------
    // Forks and shared settings
    // ------------------------------------------------------------------

    /// Forks this sequencer, copying its observers and listeners.
    ///
    /// See [`fork_with`](Self::fork_with).
    #[must_use]
    pub fn fork(&self) -> Sequencer {
        self.fork_with(true, true)
    }

    /// Creates an independent sequencer branching off this one.
    ///
    /// The fork has its own empty queues, a `Null` last result and a new
    /// identity. Its settings read through to this instance's settings at
    /// lookup time, and [`setter`](Self::setter) on the fork writes into the
    /// settings of the root of the fork chain. Observer and listener lists are copied by value
    /// when the flags are set, so later registrations on either side are not
    /// shared.
    #[must_use]
    pub fn fork_with(&self, copy_observers: bool, copy_listeners: bool) -> Sequencer {
        let (observers, listeners) = {
            let state = self.lock();
            (
                if copy_observers {
                    state.observers.clone()
                } else {
                    Observers::default()
                },
                if copy_listeners {
                    state.listeners.clone()
                } else {
                    Vec::new()
                },
            )
        };
        let fork = Self::build(
            self.inner.config.clone(),
            SharedSettings::child_of(&self.inner.settings),
            Arc::clone(&self.inner.write_through),
            observers,
            listeners,
        );
        debug!(
            sequencer = %self.inner.config.name,
            id = %self.inner.id,
            fork = %fork.inner.id,
            "forked sequencer"
        );
        fork
    }

    /// Reads a named setting, falling back to the parent chain.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.settings.get(key)
    }

    /// Writes a named setting on this instance. `Null` removes it.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.inner.settings.put(key, value.into());
        self
    }

    /// Writes a named setting on the root of the fork chain, or on this
    /// instance if it is not a fork. `Null` removes it.
    pub fn setter(&self, key: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.inner.write_through.put(key, value.into());
        self
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Number of pending steps across all queues, plus one while a chain is
    /// running.
    #[must_use]
    pub fn stack_length(&self) -> usize {
        self.lock().stack_length()
    }

    /// Current state flags.
    #[must_use]
    pub fn state(&self) -> SequencerState {
        let state = self.lock();
        let mut flags = state.flags;
        flags.set(SequencerState::LOOPING, state.loop_state.is_recording());
        flags
    }

    /// Current loop state, including the remaining replay count.
    #[must_use]
    pub fn loop_state(&self) -> LoopState {
        self.lock().loop_state
    }

    /// Result passed to the most recent `done`.
    #[must_use]
    pub fn last_result(&self) -> Value {
        self.lock().last_result.clone()
    }

    /// Label of the step in flight, if it has one.
    #[must_use]
    pub fn current_step_name(&self) -> Option<String> {
        self.lock().current_step_name.as_deref().map(str::to_owned)
    }

    /// Snapshot of the steps recorded for the next replay cycle.
    #[must_use]
    pub fn journal(&self) -> Vec<JournalEntry> {
        self.lock().journal.entries().to_vec()
    }

    /// Sequence number of the last emitted event, `0` if none.
    #[must_use]
    pub fn last_sequence(&self) -> u64 {
        self.inner.sequence.load(Ordering::Relaxed).saturating_sub(1)
    }
}

impl fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequencer")
            .field("id", &self.inner.id)
            .field("name", &self.inner.config.name)
            .field("state", &self.state())
            .field("stack_length", &self.stack_length())
            .finish()
    }
}

/// Errors surfaced by the Sequencer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SequencerError {
    /// The chain was aborted with `fail`.
    #[error("step chain failed: {data}")]
    Failed {
        /// The failure payload.
        data: Value,
    },

    /// The sequencer was dropped before the chain settled.
    #[error("sequencer has been shut down")]
    Shutdown,

    /// A sequencer was asked to pipe its result into itself.
    #[error("improper use of then_done: a sequencer cannot pipe into itself, call done() instead")]
    SelfPipe,

    /// A configuration value is malformed or out of range.
    #[error("invalid sequencer config: {0}")]
    InvalidConfig(String),
}

fn collect_results(others: &[Sequencer]) -> Value {
    Value::Array(others.iter().map(Sequencer::last_result).collect())
}

fn take_sender<T>(slot: &Mutex<Option<oneshot::Sender<T>>>) -> Option<oneshot::Sender<T>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

/// Returns the current time in nanoseconds since the Unix epoch.
#[inline]
fn nanos_since_epoch() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
