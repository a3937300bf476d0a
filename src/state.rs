//! # Persisted Parameter State
//!
//! A small tagged attribute map keyed by parameter name:
//!
//! ```json
//! {
//!   "tag": "BiasedDelayState",
//!   "attributes": { "Time": 0.2, "Feedback": 0.1, "Bias": 0.5, "Dry/Wet": 0.5 }
//! }
//! ```
//!
//! Restoring is forgiving. A map with another tag is ignored, and any
//! parameter the map does not name (or names with a non-finite value)
//! keeps its current value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parameters::{ParameterId, Parameters};

/// Type identifier carried by every saved state.
pub const STATE_TAG: &str = "BiasedDelayState";

/// Errors from decoding a serialized state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("malformed state: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unrecognized state tag '{0}'")]
    UnrecognizedTag(String),
}

/// Tagged map from parameter name to normalized value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayState {
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, f32>,
}

impl DelayState {
    /// Snapshot all four parameters under their names.
    pub fn capture(params: &Parameters) -> Self {
        let attributes = ParameterId::ALL
            .iter()
            .map(|&id| (id.name().to_owned(), params.get(id)))
            .collect();

        Self {
            tag: STATE_TAG.to_owned(),
            attributes,
        }
    }

    /// Store `value` under `id`'s name.
    ///
    /// Overwrites in place when the attribute already exists, so keeping a
    /// captured state current does not allocate.
    pub fn record(&mut self, id: ParameterId, value: f32) {
        match self.attributes.get_mut(id.name()) {
            Some(slot) => *slot = value,
            None => {
                self.attributes.insert(id.name().to_owned(), value);
            }
        }
    }

    pub fn has_recognized_tag(&self) -> bool {
        self.tag == STATE_TAG
    }

    /// Value stored for `id`, if present and finite.
    pub fn attribute(&self, id: ParameterId) -> Option<f32> {
        self.attributes
            .get(id.name())
            .copied()
            .filter(|v| v.is_finite())
    }

    /// Copy the stored values into `params`.
    ///
    /// Returns `false` and leaves `params` untouched when the tag is not
    /// [`STATE_TAG`]. Missing attributes keep their current value.
    pub fn restore_into(&self, params: &mut Parameters) -> bool {
        if !self.has_recognized_tag() {
            return false;
        }

        for id in ParameterId::ALL {
            if let Some(value) = self.attribute(id) {
                params.set(id, value);
            }
        }
        true
    }

    pub fn to_json(&self) -> Result<String, StateError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a serialized state, rejecting foreign tags.
    pub fn from_json(json: &str) -> Result<Self, StateError> {
        let state: Self = serde_json::from_str(json)?;
        if !state.has_recognized_tag() {
            return Err(StateError::UnrecognizedTag(state.tag));
        }
        Ok(state)
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
