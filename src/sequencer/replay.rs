/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/2/26
******************************************************************************/

//! Loop state and replay cycles.
//!
//! [`LoopState`] tracks whether a sequencer is recording executed steps and
//! how many replay cycles remain. When a recording chain drains,
//! [`LoopState::next_cycle`] decides whether the journal is re-enqueued.

use super::journal::StepJournal;
use super::step::Step;

/// Number of replay cycles requested by `repeat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCount {
    /// Replay forever, until `erase` or `fail`.
    Infinite,

    /// Replay this many more times after the current run.
    Remaining(u32),
}

impl From<Option<u32>> for LoopCount {
    fn from(count: Option<u32>) -> Self {
        count.map_or(Self::Infinite, Self::Remaining)
    }
}

/// Recording state of a sequencer.
///
/// # Examples
///
/// ```
/// use sequencer_rs::{LoopCount, LoopState};
///
/// let state = LoopState::Recording(LoopCount::Remaining(2));
/// assert!(state.is_recording());
/// assert_eq!(state.remaining(), Some(2));
/// assert!(!LoopState::Disabled.is_recording());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    /// Steps are not recorded.
    #[default]
    Disabled,

    /// Every recordable step is appended to the journal.
    Recording(LoopCount),
}

impl LoopState {
    /// Returns `true` while steps are recorded.
    #[inline]
    #[must_use]
    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording(_))
    }

    /// Remaining replay cycles, `None` when infinite or disabled.
    #[must_use]
    pub fn remaining(&self) -> Option<u32> {
        match self {
            Self::Recording(LoopCount::Remaining(n)) => Some(*n),
            _ => None,
        }
    }

    /// Advances the loop at the end of a natural run.
    ///
    /// Returns the steps to enqueue for the next cycle, oldest first, or
    /// `None` when no replay happens. A finite count is decremented on every
    /// replay and the state becomes [`Disabled`](Self::Disabled) once it
    /// reaches zero. The journal is emptied by a replay; on exhaustion of a
    /// zero count it is left intact for inspection.
    pub(crate) fn next_cycle(&mut self, journal: &mut StepJournal) -> Option<Vec<Step>> {
        match *self {
            Self::Disabled => None,
            Self::Recording(LoopCount::Infinite) => Some(journal.take()),
            Self::Recording(LoopCount::Remaining(0)) => {
                *self = Self::Disabled;
                None
            }
            Self::Recording(LoopCount::Remaining(n)) => {
                *self = match n - 1 {
                    0 => Self::Disabled,
                    left => Self::Recording(LoopCount::Remaining(left)),
                };
                Some(journal.take())
            }
        }
    }
}
