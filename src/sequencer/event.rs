/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/2/26
******************************************************************************/

//! Sequencer event types.
//!
//! This module defines the events emitted to listeners registered with
//! [`Sequencer::add_listener`](super::Sequencer::add_listener).

use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// What happened on the sequencer.
#[derive(Debug, Clone, PartialEq)]
pub enum StepEventKind {
    /// A step is about to be invoked with the given input.
    Invoked {
        /// The previous result handed to the step.
        input: Value,
    },

    /// All queues drained; `complete` observers are about to run.
    Drained {
        /// The last result of the chain.
        result: Value,
    },

    /// The chain was aborted by `fail`.
    Failed {
        /// The failure payload.
        data: Value,
    },
}

/// Event emitted by a sequencer.
///
/// Every event receives the next value of the sequencer's monotonic counter,
/// so events from one instance can be totally ordered.
///
/// # Examples
///
/// ```
/// use sequencer_rs::{StepEvent, StepEventKind};
/// use serde_json::Value;
/// use uuid::Uuid;
///
/// let event = StepEvent::new(
///     1,
///     1234567890,
///     Uuid::nil(),
///     None,
///     StepEventKind::Drained { result: Value::Null },
/// );
/// assert_eq!(event.sequence_num, 1);
/// assert!(event.is_drained());
/// ```
#[derive(Debug, Clone)]
pub struct StepEvent {
    /// Monotonically increasing sequence number.
    pub sequence_num: u64,

    /// Nanosecond timestamp when the event was emitted.
    pub timestamp_ns: u64,

    /// Identity of the emitting sequencer.
    pub sequencer_id: Uuid,

    /// Label of the step involved, if any.
    pub step_name: Option<Arc<str>>,

    /// What happened.
    pub kind: StepEventKind,
}

impl StepEvent {
    /// Creates a new step event.
    #[must_use]
    pub fn new(
        sequence_num: u64,
        timestamp_ns: u64,
        sequencer_id: Uuid,
        step_name: Option<Arc<str>>,
        kind: StepEventKind,
    ) -> Self {
        Self {
            sequence_num,
            timestamp_ns,
            sequencer_id,
            step_name,
            kind,
        }
    }

    /// Returns `true` for an invocation event.
    #[inline]
    #[must_use]
    pub fn is_invoked(&self) -> bool {
        matches!(self.kind, StepEventKind::Invoked { .. })
    }

    /// Returns `true` for a drain-completion event.
    #[inline]
    #[must_use]
    pub fn is_drained(&self) -> bool {
        matches!(self.kind, StepEventKind::Drained { .. })
    }

    /// Returns `true` for a failure event.
    #[inline]
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self.kind, StepEventKind::Failed { .. })
    }
}
