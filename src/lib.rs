//! # Biased Delay — An AU/VST3/CLAP Feedback Delay with a Bias Curve
//!
//! A feedback delay built with [nih-plug](https://github.com/robbert-vdh/nih-plug)
//! whose repeats pass through a sign-preserving power curve every time they
//! go round the loop. Depending on the Bias knob the repeats are either
//! crunched down (quiet detail is gated away first) or lifted into a
//! saturated wash. How it sounds depends heavily on the source material.
//!
//! ## Signal Flow
//!
//! ```text
//! Input ──┬──────────────────────────────────────── × sigmoid(1 - mix) ──┐
//!         │                                                              │
//!         │    ┌─────────────────────────────────────────────────┐       │
//!         │    │                 FEEDBACK LOOP                   │       │
//!         │    │                                                 │       │
//!         └──►(+)──► [Bias curve] ──► [Limit ±1] ──► [Ring Buffer]       │
//!              ▲     sign(v)·|v|^e                        │              │
//!              │                                          ▼              │
//!              └──────────────── × feedback ◄──── delayed_sample         │
//!                                                         │              │
//!                                                         └── × sigmoid(mix) ─►(+)──► Output
//! ```
//!
//! ## Layout
//!
//! - [`dsp`]: the bias curve, the crossfades and the ring buffers
//! - [`parameters`]: the four normalized controls and their index contract
//! - [`engine`]: the per-sample loop and its lifecycle
//! - [`state`]: the tagged attribute map used to persist parameter values
//! - `params`: the same controls exposed to the host through nih-plug

pub mod dsp;
pub mod engine;
pub mod parameters;
mod params;
pub mod state;

use std::num::NonZeroU32;
use std::sync::Arc;

use engine::{BlockSettings, DelayEngine};
use nih_plug::prelude::*;
use nih_plug::wrapper::state::{ParamValue, PluginState};
use parameters::Parameters;
use params::BiasedDelayParams;
use state::{DelayState, STATE_TAG};

/// The plugin: host parameters plus the engine that owns all audio state.
///
/// The parameters are shared with the host through an `Arc` and may be
/// read from any thread. The engine is only touched from `initialize()`,
/// `reset()` and `process()`, which the host never runs concurrently, so
/// it needs no locking.
struct BiasedDelay {
    params: Arc<BiasedDelayParams>,
    engine: DelayEngine,
}

impl Default for BiasedDelay {
    fn default() -> Self {
        Self {
            params: Arc::new(BiasedDelayParams::default()),
            // Buffers are allocated in initialize(), once the sample rate
            // is known.
            engine: DelayEngine::new(),
        }
    }
}

impl Plugin for BiasedDelay {
    const NAME: &'static str = "Biased Delay";
    const VENDOR: &'static str = "Biased Delay";
    const URL: &'static str = "";
    const EMAIL: &'static str = "";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    // Stereo first, mono as a fallback. The engine allocates exactly
    // `MAX_CHANNELS` (2) buffers, one per channel of the widest layout.
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
    ];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;

    // Parameters are read once per block, so there is nothing to gain from
    // splitting blocks at automation points.
    const SAMPLE_ACCURATE_AUTOMATION: bool = false;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    /// Reconcile the host's per-id values with the saved attribute map.
    ///
    /// The `"BiasedDelayState"` field is the persisted
    /// [`BiasedDelayParams::saved_state`]. Every value it names wins over the
    /// host's own entry for that parameter, so a state whose only source of
    /// truth is the map still loads. The field itself is left in place for
    /// nih-plug to restore into `saved_state`. A field that can't be decoded
    /// is logged and dropped.
    fn filter_state(state: &mut PluginState) {
        let Some(json) = state.fields.get(STATE_TAG) else {
            return;
        };

        let saved = match DelayState::from_json(json) {
            Ok(saved) => saved,
            Err(err) => {
                nih_warn!("Dropping unreadable parameter state: {}", err);
                state.fields.remove(STATE_TAG);
                return;
            }
        };

        let mut values = Parameters::default();
        for (id, host_id) in BiasedDelayParams::IDS {
            if let Some(ParamValue::F32(value)) = state.params.get(host_id) {
                values.set(id, *value);
            }
        }
        saved.restore_into(&mut values);

        for (id, host_id) in BiasedDelayParams::IDS {
            state
                .params
                .insert(host_id.to_owned(), ParamValue::F32(values.get(id)));
        }
    }

    /// Size the delay buffers for the host's sample rate.
    ///
    /// Called on load and whenever the audio configuration changes. The
    /// engine only reallocates when the sample rate actually changed; the
    /// buffers are silenced and the cursor rewound either way.
    fn initialize(
        &mut self,
        _audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        self.engine.set_parameters(self.params.snapshot());
        self.engine.prepare_to_play(
            buffer_config.sample_rate,
            buffer_config.max_buffer_size as usize,
        );

        true
    }

    /// Called when playback stops or the plugin is bypassed. Silences the
    /// loop so stale echoes don't bleed into the next playback.
    fn reset(&mut self) {
        self.engine.reset();
    }

    /// Run one block through the engine.
    ///
    /// The host parameters are copied into the engine once, up front, and
    /// the engine then works through the buffer channel by channel. Input
    /// and output share the same buffer (in-place processing), so the
    /// channel counts always match.
    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        self.engine.set_parameters(self.params.snapshot());

        let num_channels = buffer.channels();
        self.engine
            .process_block(buffer.as_slice(), num_channels, num_channels);

        // Keep the host calling process() while the echoes ring out.
        match self.engine.block_settings() {
            Some(settings) => match tail_samples(&settings) {
                Some(samples) => ProcessStatus::Tail(samples),
                None => ProcessStatus::KeepAlive,
            },
            None => ProcessStatus::Normal,
        }
    }
}

/// How long the echoes take to fall to −60 dB, in samples, or `None` if
/// they never do.
///
/// Each trip round the loop scales the signal by `feedback`, so after N
/// trips the level is `feedback^N`. Solving `feedback^N = 0.001`:
///
/// ```text
/// N = log10(0.001) / log10(feedback) = -3 / log10(feedback)
/// ```
///
/// With a compressing bias curve (exponent above 1) the repeats fall away
/// faster than this, so the estimate is an upper bound.
///
/// An expanding curve (exponent below 1) never lets the loop die out: a
/// repeat of level `x` comes back as `(f·x)^e`, which settles at the
/// nonzero level `x = f^(e / (1 - e))` for any feedback `f > 0`. Feedback
/// at or above 1 is held at full scale by the limiter. Both ring forever.
fn tail_samples(settings: &BlockSettings) -> Option<u32> {
    let delay = settings.sample_delay.get() as f32;
    let feedback = settings.feedback.abs();

    if feedback >= 1.0 || (feedback > 0.0 && settings.bias_exponent < 1.0) {
        return None;
    }

    let repeats = if feedback > 0.001 {
        -3.0 / feedback.log10()
    } else {
        // A single echo.
        0.0
    };

    // One period for the first echo to come out, then the decay.
    Some(((repeats + 1.0) * delay).min(u32::MAX as f32) as u32)
}

// ─────────────────────────────────────────────────────────────────────
// Plugin format trait implementations
// ─────────────────────────────────────────────────────────────────────

impl ClapPlugin for BiasedDelay {
    const CLAP_ID: &'static str = "org.biased-delay.biased-delay";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("A feedback delay with a sign-preserving bias curve in the loop");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Mono,
        ClapFeature::Delay,
        ClapFeature::Distortion,
    ];
}

impl Vst3Plugin for BiasedDelay {
    // 16 ASCII bytes, unique to this plugin.
    const VST3_CLASS_ID: [u8; 16] = *b"BiasedDelay_v001";

    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] = &[
        Vst3SubCategory::Fx,
        Vst3SubCategory::Delay,
        Vst3SubCategory::Distortion,
    ];
}

// ─────────────────────────────────────────────────────────────────────
// Export macros
// ─────────────────────────────────────────────────────────────────────
//
// `nih_export_clap!` exports `clap_entry`, `nih_export_vst3!` exports
// `GetPluginFactory`, and clap_wrapper adds `GetPluginFactoryAUV2` so the
// CLAP build also loads as an Audio Unit.

nih_export_clap!(BiasedDelay);
nih_export_vst3!(BiasedDelay);

clap_wrapper::export_auv2!();

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
