/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/2/26
******************************************************************************/

//! Step outcome types.
//!
//! This module defines the value a step returns to the Sequencer after it is
//! invoked. The outcome is independent of whether the step has already
//! called `done`: it only controls replay recording.

/// Value returned by a step function.
///
/// # Examples
///
/// ```
/// use sequencer_rs::StepOutcome;
///
/// assert!(StepOutcome::Continue.is_recordable());
/// assert!(StepOutcome::Once.is_once());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepOutcome {
    /// Normal step. Recorded in the replay journal while looping.
    #[default]
    Continue,

    /// Run this invocation but never record it for replay.
    Once,
}

impl StepOutcome {
    /// Returns `true` if the invocation may be recorded for replay.
    #[inline]
    #[must_use]
    pub fn is_recordable(&self) -> bool {
        matches!(self, Self::Continue)
    }

    /// Returns `true` if the invocation must not be replayed.
    #[inline]
    #[must_use]
    pub fn is_once(&self) -> bool {
        matches!(self, Self::Once)
    }

    /// Returns [`Once`](Self::Once) when `once` is set.
    #[inline]
    #[must_use]
    pub fn once_if(once: bool) -> Self {
        if once { Self::Once } else { Self::Continue }
    }
}
