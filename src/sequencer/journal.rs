/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/2/26
******************************************************************************/

//! Replay journal of executed steps.
//!
//! While a sequencer is looping, every recordable step invocation is appended
//! to its [`StepJournal`]. An entry stores the step itself (function identity,
//! label and bound arguments), which is all that is needed to enqueue the same
//! call again at the start of the next cycle.

use super::step::Step;

/// One recorded invocation.
#[derive(Debug, Clone)]
pub struct JournalEntry {
    /// Sequence number of the invocation event.
    pub sequence_num: u64,

    /// The step as it was invoked.
    pub step: Step,
}

impl JournalEntry {
    /// Creates a new journal entry.
    #[must_use]
    pub fn new(sequence_num: u64, step: Step) -> Self {
        Self { sequence_num, step }
    }
}

/// Append-only log of recorded step invocations, in invocation order.
///
/// # Examples
///
/// ```
/// use sequencer_rs::sequencer::journal::StepJournal;
/// use sequencer_rs::{Step, StepOutcome};
///
/// let mut journal = StepJournal::new();
/// assert!(journal.is_empty());
///
/// journal.record(7, Step::named("tick", |_| StepOutcome::Continue));
/// assert_eq!(journal.len(), 1);
/// assert_eq!(journal.last_sequence(), Some(7));
/// ```
#[derive(Debug, Default, Clone)]
pub struct StepJournal {
    entries: Vec<JournalEntry>,
}

impl StepJournal {
    /// Creates a new empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Creates a new journal with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Appends an invocation.
    pub fn record(&mut self, sequence_num: u64, step: Step) {
        self.entries.push(JournalEntry::new(sequence_num, step));
    }

    /// Removes and returns every recorded step, oldest first.
    pub fn take(&mut self) -> Vec<Step> {
        self.entries.drain(..).map(|e| e.step).collect()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns a slice of all entries.
    #[must_use]
    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Returns the number of recorded invocations.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been recorded.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the sequence number of the last entry, or `None` if empty.
    #[inline]
    #[must_use]
    pub fn last_sequence(&self) -> Option<u64> {
        self.entries.last().map(|e| e.sequence_num)
    }
}
