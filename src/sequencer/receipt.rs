/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/2/26
******************************************************************************/

//! Sequencer receipt types.
//!
//! This module defines the receipt returned to callers awaiting
//! [`Sequencer::completion`](super::Sequencer::completion).

use serde_json::Value;

/// Receipt returned when a chain drains.
///
/// # Examples
///
/// ```
/// use sequencer_rs::Receipt;
/// use serde_json::json;
///
/// let receipt = Receipt::new(42, json!("ok"));
/// assert_eq!(receipt.sequence_num, 42);
/// assert!(receipt.has_result());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    /// Sequence number of the last event emitted before the chain drained.
    pub sequence_num: u64,

    /// The last result of the chain.
    pub result: Value,
}

impl Receipt {
    /// Creates a new receipt.
    #[must_use]
    pub fn new(sequence_num: u64, result: Value) -> Self {
        Self {
            sequence_num,
            result,
        }
    }

    /// Returns `true` if the chain ended with a non-null result.
    #[inline]
    #[must_use]
    pub fn has_result(&self) -> bool {
        !self.result.is_null()
    }
}
