/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/2/26
******************************************************************************/

//! Sequencer configuration.
//!
//! A [`SequencerConfig`] can be built in code or loaded from one or more JSON
//! documents. Later documents override earlier ones key by key.

use crate::sequencer::SequencerError;
use crate::tool;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default pre-allocated size of the replay journal.
pub const DEFAULT_JOURNAL_CAPACITY: usize = 64;

/// Upper bound accepted for [`SequencerConfig::journal_capacity`].
pub const MAX_JOURNAL_CAPACITY: usize = 1 << 20;

/// Configuration for a [`Sequencer`](crate::Sequencer).
///
/// # Examples
///
/// ```
/// use sequencer_rs::SequencerConfig;
///
/// let config = SequencerConfig::from_json(r#"{ "name": "ingest" }"#).unwrap();
/// assert_eq!(config.name, "ingest");
/// assert_eq!(config.journal_capacity, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Label attached to every log line and step event of the sequencer.
    pub name: String,

    /// Initial capacity of the replay journal.
    pub journal_capacity: usize,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            name: "sequencer".to_string(),
            journal_capacity: DEFAULT_JOURNAL_CAPACITY,
        }
    }
}

impl SequencerConfig {
    /// Creates a default configuration with the given name.
    #[must_use]
    pub fn named(name: impl AsRef<str>) -> Self {
        Self {
            name: tool::trim(name.as_ref()),
            ..Self::default()
        }
    }

    /// Parses a configuration from a JSON object.
    ///
    /// Missing keys take their default value.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::InvalidConfig`] if the document is not a JSON
    /// object, cannot be deserialized, or fails [`validate`](Self::validate).
    pub fn from_json(document: &str) -> Result<Self, SequencerError> {
        Self::from_json_layers(&[document])
    }

    /// Parses and merges several JSON objects, lowest priority first.
    ///
    /// # Errors
    ///
    /// Same as [`from_json`](Self::from_json), for any of the layers.
    pub fn from_json_layers(layers: &[&str]) -> Result<Self, SequencerError> {
        let mut parsed = Vec::with_capacity(layers.len());
        for (index, layer) in layers.iter().enumerate() {
            let value: Value = serde_json::from_str(layer).map_err(|e| {
                SequencerError::InvalidConfig(format!("layer {index}: {e}"))
            })?;
            if !tool::is_object(&value) {
                return Err(SequencerError::InvalidConfig(format!(
                    "layer {index}: expected an object, found {}",
                    tool::type_of(&value)
                )));
            }
            parsed.push(value);
        }

        let merged = tool::extend(Value::Object(Default::default()), parsed);
        let mut config: Self = serde_json::from_value(merged)
            .map_err(|e| SequencerError::InvalidConfig(e.to_string()))?;
        config.name = tool::trim(&config.name);
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration for out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::InvalidConfig`] if the name is empty or the
    /// journal capacity exceeds [`MAX_JOURNAL_CAPACITY`].
    pub fn validate(&self) -> Result<(), SequencerError> {
        if self.name.trim().is_empty() {
            return Err(SequencerError::InvalidConfig(
                "name must not be empty".to_string(),
            ));
        }
        if self.journal_capacity > MAX_JOURNAL_CAPACITY {
            return Err(SequencerError::InvalidConfig(format!(
                "journal_capacity {} exceeds {MAX_JOURNAL_CAPACITY}",
                self.journal_capacity
            )));
        }
        Ok(())
    }
}
