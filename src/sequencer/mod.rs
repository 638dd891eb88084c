/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/2/26
******************************************************************************/

//! Sequencer module for ordered execution of chained steps.
//!
//! This module provides a cooperative Sequencer that runs externally supplied
//! steps one at a time, in order. The sequencer never performs asynchronous
//! work itself: a step defers its `done` call behind a timer or an I/O
//! callback, and the chain simply waits for it.
//!
//! # Architecture
//!
//! - Steps are enqueued with `then` / `queue` / `now` into a queue-of-queues
//! - A drain loop pops one step at a time and hands it the previous result
//! - Each step continues the chain with `done` or aborts it with `fail`
//! - Steps enqueued from a running step are drained depth-first
//! - While looping, executed steps are journaled and replayed after each run
//! - Completion and failure observers, and per-step event listeners, report
//!   progress in sequence order
//!
//! # Examples
//!
//! ```no_run
//! use sequencer_rs::{Sequencer, StepOutcome};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let sequencer = Sequencer::new();
//!
//! // Register an event listener
//! sequencer.add_listener(|event| {
//!     println!("Event {}: {:?}", event.sequence_num, event.kind);
//! });
//!
//! let finished = sequencer.completion();
//! sequencer
//!     .then(|ctx| {
//!         let ctx2 = ctx.clone();
//!         tokio::spawn(async move {
//!             tokio::time::sleep(Duration::from_millis(10)).await;
//!             ctx2.done("fetched");
//!         });
//!         StepOutcome::Continue
//!     })
//!     .queue(|previous| {
//!         println!("got {previous}");
//!         StepOutcome::Continue
//!     });
//!
//! // Wait for the chain to drain
//! let receipt = finished.await?;
//! assert_eq!(receipt.result, "fetched");
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod event;
pub mod journal;
mod observer;
pub mod receipt;
pub mod replay;
pub mod result;
pub mod settings;
pub mod step;
mod timer;

#[cfg(test)]
mod tests;

// Re-export main types
pub use self::core::{Sequencer, SequencerError, SequencerState};
pub use event::{StepEvent, StepEventKind};
pub use journal::{JournalEntry, StepJournal};
pub use observer::ObserverFn;
pub use receipt::Receipt;
pub use replay::{LoopCount, LoopState};
pub use result::StepOutcome;
pub use settings::SharedSettings;
pub use step::{Invocation, Step, StepContext, StepFn};
