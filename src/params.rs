//! # Host Parameters
//!
//! The four controls as the DAW sees them. Each one is a plain 0..1
//! `FloatParam`; the engine does its own mapping to seconds, gain and
//! exponent, so the host range stays normalized.
//!
//! The string ids (`#[id = "..."]`) are what hosts store in projects and
//! presets. Once published, never change them.
//!
//! No smoothing is applied. The engine reads each value once per block.
//!
//! Besides the host's own per-id values, the state also carries a tagged
//! attribute map (`"BiasedDelayState"`, see [`crate::state`]). Every
//! parameter change is mirrored into it through the parameter callbacks,
//! so whatever the host saves is current.

use std::sync::{Arc, RwLock};

use nih_plug::prelude::*;

use crate::engine::delay_seconds;
use crate::parameters::{ParameterId, Parameters};
use crate::state::DelayState;

/// Host-facing parameter set for the Biased Delay.
#[derive(Params)]
pub struct BiasedDelayParams {
    /// **Time**: 0 → `MIN_DELAY` (10 ms), 1 → `MAX_DELAY` (4 s), linear in
    /// between.
    #[id = "time"]
    pub time: FloatParam,

    /// **Feedback**: how much of the delayed signal is sent back into the
    /// loop. Whatever goes back in is limited to [-1, 1], so even 100%
    /// cannot run away.
    #[id = "fdbk"]
    pub feedback: FloatParam,

    /// **Bias**: shape of the loop's power curve. Centre is neutral. Turning
    /// it *down* compresses the repeats (quiet parts die away first);
    /// turning it *up* expands them (quiet parts are lifted).
    #[id = "bias"]
    pub bias: FloatParam,

    /// **Dry/Wet**: output blend along an S-curve.
    #[id = "mix"]
    pub dry_wet: FloatParam,

    /// Attribute map of all four values, saved with the plugin state.
    #[persist = "BiasedDelayState"]
    pub saved_state: Arc<RwLock<DelayState>>,
}

impl BiasedDelayParams {
    /// Host id of each parameter, in index order.
    pub const IDS: [(ParameterId, &'static str); 4] = [
        (ParameterId::Time, "time"),
        (ParameterId::Feedback, "fdbk"),
        (ParameterId::Bias, "bias"),
        (ParameterId::DryWet, "mix"),
    ];

    /// Current (unsmoothed) values as an engine parameter record.
    pub fn snapshot(&self) -> Parameters {
        Parameters {
            time: self.time.value(),
            feedback: self.feedback.value(),
            bias: self.bias.value(),
            dry_wet: self.dry_wet.value(),
        }
    }
}

impl Default for BiasedDelayParams {
    fn default() -> Self {
        let saved_state = Arc::new(RwLock::new(DelayState::capture(&Parameters::default())));

        Self {
            time: normalized(ParameterId::Time, &saved_state)
                .with_unit(" s")
                .with_value_to_string(Arc::new(|value| {
                    format!("{:.3}", delay_seconds(value))
                })),

            feedback: normalized(ParameterId::Feedback, &saved_state)
                .with_unit("%")
                .with_value_to_string(formatters::v2s_f32_percentage(1))
                .with_string_to_value(formatters::s2v_f32_percentage()),

            bias: normalized(ParameterId::Bias, &saved_state).with_value_to_string(Arc::new(
                |value| format!("{:+.2}", value * 2.0 - 1.0),
            )),

            dry_wet: normalized(ParameterId::DryWet, &saved_state)
                .with_unit("%")
                .with_value_to_string(formatters::v2s_f32_percentage(1))
                .with_string_to_value(formatters::s2v_f32_percentage()),

            saved_state,
        }
    }
}

/// A linear 0..1 parameter with the engine's name and default, mirrored
/// into `saved_state` whenever it changes.
fn normalized(id: ParameterId, saved_state: &Arc<RwLock<DelayState>>) -> FloatParam {
    let saved_state = saved_state.clone();
    FloatParam::new(
        id.name(),
        id.default_value(),
        FloatRange::Linear { min: 0.0, max: 1.0 },
    )
    .with_callback(Arc::new(move |value| {
        record_value(&saved_state, id, value)
    }))
}

/// Write one parameter value into the saved attribute map.
///
/// The callbacks may run on the audio thread. The map already holds every
/// key, so this is a single in-place store under a short write lock.
pub fn record_value(saved_state: &RwLock<DelayState>, id: ParameterId, value: f32) {
    if let Ok(mut state) = saved_state.write() {
        state.record(id, value);
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
