/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/2/26
******************************************************************************/

//! # sequencer-rs
//!
//! A cooperative step sequencer. Callers enqueue a chain of steps, synchronous
//! or asynchronous, and the [`Sequencer`] runs them one at a time, in order.
//! Each step signals completion with `done(result)` or aborts the whole chain
//! with `fail(data)`; the value passed to `done` becomes the input of the next
//! step.
//!
//! On top of plain chaining the sequencer supports:
//!
//! - depth-first nesting: steps enqueued from inside a running step complete
//!   before that step's queued siblings resume
//! - argument fan-out (`then_with`) under `call` or `apply` invocation
//! - pausing and resuming (`stop` / `restart`)
//! - recording executed steps and replaying them (`repeat` / `erase`)
//! - completion and failure observers, and per-step event listeners
//! - forks with independent queues that read shared settings through their parent
//! - cross-instance waiting (`when` / `done_when`)
//!
//! ## Example
//!
//! ```
//! use sequencer_rs::{Sequencer, StepOutcome};
//!
//! let seq = Sequencer::new();
//! seq.then(|ctx| {
//!     ctx.done("first");
//!     StepOutcome::Continue
//! })
//! .then(|ctx| {
//!     assert_eq!(ctx.previous(), "first");
//!     ctx.done(());
//!     StepOutcome::Continue
//! });
//! assert_eq!(seq.stack_length(), 0);
//! ```

pub mod config;
pub mod sequencer;
pub mod tool;

pub use config::SequencerConfig;
pub use sequencer::{
    Invocation, LoopCount, LoopState, Receipt, Sequencer, SequencerError, SequencerState, Step,
    StepContext, StepEvent, StepEventKind, StepOutcome,
};

/// Dynamic value carried between steps.
pub use serde_json::Value;
