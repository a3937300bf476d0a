//! # Delay Engine
//!
//! Ties the parameter record, the delay line, the bias shaper and the
//! dry/wet crossfade together into the per-sample feedback loop.
//!
//! ## Lifecycle
//!
//! ```text
//! new() ──► Uninitialized ──prepare_to_play()──► Prepared ◄─┐
//!                                                  │  │      │
//!                                                  │  └─reset() (silence, same buffers)
//!                                                  └─prepare_to_play() (resize if rate changed)
//! ```
//!
//! Until the first `prepare_to_play()` there are no buffers and
//! [`process_block()`](DelayEngine::process_block) leaves audio untouched.
//!
//! ## Threading
//!
//! The engine does no locking. Block processing and parameter changes
//! must happen on the same thread, or the caller must serialize them.

use std::num::NonZeroUsize;

use nih_plug::{nih_log, nih_warn};

use crate::dsp::bias::{apply_bias, bias_exponent};
use crate::dsp::crossfade::{hard_limit, sigmoid_xfade};
use crate::dsp::delay_line::DelayLine;
use crate::parameters::Parameters;
use crate::state::DelayState;

/// Delay length at Time = 0, in seconds.
pub const MIN_DELAY: f32 = 0.01;

/// Delay length at Time = 1, in seconds. Also sets the buffer capacity.
pub const MAX_DELAY: f32 = 4.0;

/// Number of channel buffers the engine allocates.
pub const MAX_CHANNELS: usize = 2;

/// Values derived from the parameter record, computed once per block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockSettings {
    /// Loop length in samples, clamped to `1..=capacity`.
    pub sample_delay: NonZeroUsize,
    pub feedback: f32,
    /// Bias exponent, already inverted (`bias_exponent(1 - bias)`).
    pub bias_exponent: f32,
    pub dry_wet: f32,
}

impl BlockSettings {
    pub fn derive(params: &Parameters, sample_rate: f32, capacity: usize) -> Self {
        Self {
            sample_delay: sample_delay(params.time, sample_rate, capacity),
            feedback: params.feedback,
            bias_exponent: bias_exponent(1.0 - params.bias),
            dry_wet: params.dry_wet,
        }
    }
}

/// Delay length in seconds for a normalized Time value.
pub fn delay_seconds(time: f32) -> f32 {
    MIN_DELAY + time * (MAX_DELAY - MIN_DELAY)
}

/// Delay length in whole samples, never zero and never more than
/// `capacity` (a `capacity` of 0 is treated as 1).
pub fn sample_delay(time: f32, sample_rate: f32, capacity: usize) -> NonZeroUsize {
    let samples = (delay_seconds(time) * sample_rate).round();
    // `as` saturates: NaN and negatives become 0, huge values usize::MAX.
    let samples = (samples as usize).clamp(1, capacity.max(1));
    NonZeroUsize::new(samples).unwrap_or(NonZeroUsize::MIN)
}

/// Buffer length needed to hold `MAX_DELAY` seconds.
pub fn buffer_capacity(sample_rate: f32) -> NonZeroUsize {
    let samples = (MAX_DELAY * sample_rate).round() as usize;
    NonZeroUsize::new(samples).unwrap_or(NonZeroUsize::MIN)
}

/// The biased feedback delay.
#[derive(Debug)]
pub struct DelayEngine {
    params: Parameters,

    /// Sample rate the buffers were sized for. `None` until prepared.
    sample_rate: Option<f32>,

    delay_line: DelayLine,
}

impl Default for DelayEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DelayEngine {
    /// An unprepared engine with default parameters.
    pub fn new() -> Self {
        Self {
            params: Parameters::default(),
            sample_rate: None,
            delay_line: DelayLine::new(),
        }
    }

    pub fn is_prepared(&self) -> bool {
        self.sample_rate.is_some()
    }

    pub fn sample_rate(&self) -> Option<f32> {
        self.sample_rate
    }

    pub fn delay_line(&self) -> &DelayLine {
        &self.delay_line
    }

    /// Size the buffers for `sample_rate`, silence them and rewind the
    /// cursor.
    ///
    /// Buffers are only reallocated when the sample rate changes. This is
    /// the only place the engine allocates. `_max_block_size` is accepted
    /// for host symmetry; processing works for any block length.
    pub fn prepare_to_play(&mut self, sample_rate: f32, _max_block_size: usize) {
        if self.sample_rate != Some(sample_rate) || !self.delay_line.is_allocated() {
            let capacity = buffer_capacity(sample_rate);
            nih_log!(
                "Allocating {} delay buffers of {} samples for {} Hz",
                MAX_CHANNELS,
                capacity,
                sample_rate
            );
            self.delay_line.allocate(MAX_CHANNELS, capacity);
            self.sample_rate = Some(sample_rate);
        } else {
            self.delay_line.clear();
        }
        self.delay_line.reset_cursor();
    }

    /// Silence all buffers without reallocating.
    ///
    /// The write cursor is left where it is; only `prepare_to_play()`
    /// rewinds it.
    pub fn reset(&mut self) {
        self.delay_line.clear();
    }

    /// Per-block settings derived from the current parameters, or `None`
    /// when unprepared.
    pub fn block_settings(&self) -> Option<BlockSettings> {
        let sample_rate = self.sample_rate?;
        Some(BlockSettings::derive(
            &self.params,
            sample_rate,
            self.delay_line.capacity(),
        ))
    }

    /// Process `channels` in place.
    ///
    /// `num_input_channels` and `num_output_channels` must match. Debug
    /// builds assert this; release builds process only the channels both
    /// sides (and the engine's buffers) have.
    ///
    /// Parameters are read once, at the start of the block. Channels are
    /// processed one after another, all advancing the same cursor.
    pub fn process_block(
        &mut self,
        channels: &mut [&mut [f32]],
        num_input_channels: usize,
        num_output_channels: usize,
    ) {
        debug_assert_eq!(
            num_input_channels, num_output_channels,
            "input and output channel counts must match"
        );

        let Some(settings) = self.block_settings() else {
            return;
        };

        let num_channels = num_input_channels
            .min(num_output_channels)
            .min(channels.len())
            .min(self.delay_line.num_channels());

        for (channel, samples) in channels.iter_mut().take(num_channels).enumerate() {
            self.process_channel(channel, samples, &settings);
        }
    }

    fn process_channel(&mut self, channel: usize, samples: &mut [f32], settings: &BlockSettings) {
        for sample in samples.iter_mut() {
            let input = *sample;
            let delayed = self.delay_line.read(channel);

            let recirculated = input + delayed * settings.feedback;
            let shaped = apply_bias(recirculated, settings.bias_exponent);
            self.delay_line.write(channel, hard_limit(shaped));

            *sample = sigmoid_xfade(input, delayed, settings.dry_wet);

            self.delay_line.advance_cursor(settings.sample_delay);
        }
    }

    // ─── Parameter access ───

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    /// Replace all four parameters at once.
    pub fn set_parameters(&mut self, params: Parameters) {
        self.params = params;
    }

    pub fn get_num_parameters(&self) -> usize {
        Parameters::COUNT
    }

    /// Name at `index`, or `""` when out of range.
    pub fn get_parameter_name(&self, index: usize) -> &'static str {
        Parameters::name(index)
    }

    /// Value at `index`, or `0.0` when out of range.
    pub fn get_parameter_value(&self, index: usize) -> f32 {
        self.params.value(index)
    }

    /// No-op when `index` is out of range.
    pub fn set_parameter_value(&mut self, index: usize, value: f32) {
        self.params.set_value(index, value);
    }

    // ─── State ───

    pub fn save_state(&self) -> DelayState {
        DelayState::capture(&self.params)
    }

    /// Apply a saved state. Foreign tags and missing attributes fall back
    /// to the current values; nothing is reported to the caller.
    pub fn load_state(&mut self, state: &DelayState) {
        if !state.restore_into(&mut self.params) {
            nih_warn!("Ignoring saved state with unrecognized tag '{}'", state.tag);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::bias::MED_BIAS;

    const SAMPLE_RATE: f32 = 44100.0;

    fn prepared(params: Parameters) -> DelayEngine {
        let mut engine = DelayEngine::new();
        engine.set_parameters(params);
        engine.prepare_to_play(SAMPLE_RATE, 512);
        engine
    }

    /// Run a mono signal through the engine in blocks of `block_size`.
    fn run_mono(engine: &mut DelayEngine, input: &[f32], block_size: usize) -> Vec<f32> {
        let mut output = input.to_vec();
        for block in output.chunks_mut(block_size) {
            engine.process_block(&mut [block], 1, 1);
        }
        output
    }

    fn impulse(len: usize) -> Vec<f32> {
        let mut signal = vec![0.0; len];
        signal[0] = 1.0;
        signal
    }

    #[test]
    fn test_delay_mapping() {
        assert!((delay_seconds(0.0) - MIN_DELAY).abs() < 1e-7);
        assert!((delay_seconds(1.0) - MAX_DELAY).abs() < 1e-6);

        let capacity = buffer_capacity(SAMPLE_RATE).get();
        assert_eq!(capacity, 176_400);
        assert_eq!(sample_delay(0.0, SAMPLE_RATE, capacity).get(), 441);
        assert_eq!(sample_delay(1.0, SAMPLE_RATE, capacity).get(), capacity);
    }

    /// A sample rate so low that the delay rounds to zero samples must
    /// still give a loop length of one.
    #[test]
    fn test_sample_delay_never_zero() {
        assert_eq!(sample_delay(0.0, 1.0, 4).get(), 1);
        assert_eq!(sample_delay(-5.0, SAMPLE_RATE, 1000).get(), 1);
        assert_eq!(sample_delay(f32::NAN, SAMPLE_RATE, 1000).get(), 1);
        assert_eq!(sample_delay(0.5, SAMPLE_RATE, 0).get(), 1);
    }

    #[test]
    fn test_out_of_range_time_is_clamped_to_capacity() {
        assert_eq!(sample_delay(3.0, SAMPLE_RATE, 1000).get(), 1000);
    }

    /// Low Bias gives compression, high Bias gives expansion.
    #[test]
    fn test_bias_parameter_is_inverted() {
        let settings = |bias| {
            BlockSettings::derive(
                &Parameters {
                    bias,
                    ..Parameters::default()
                },
                SAMPLE_RATE,
                176_400,
            )
            .bias_exponent
        };

        assert_eq!(settings(0.0), crate::dsp::bias::MAX_BIAS);
        assert_eq!(settings(0.5), MED_BIAS);
        assert_eq!(settings(1.0), crate::dsp::bias::MIN_BIAS);
    }

    #[test]
    fn test_unprepared_engine_passes_audio_through() {
        let mut engine = DelayEngine::new();
        assert!(!engine.is_prepared());
        assert!(engine.block_settings().is_none());

        let mut block = [0.5, -0.5, 0.25];
        engine.process_block(&mut [&mut block[..]], 1, 1);
        assert_eq!(block, [0.5, -0.5, 0.25]);
    }

    /// Feedback 0.5 with a neutral bias: each trip round the loop halves
    /// the recirculated sample.
    #[test]
    fn test_impulse_recirculates_with_geometric_decay() {
        let params = Parameters {
            time: 0.01,
            feedback: 0.5,
            bias: 0.5,
            dry_wet: 0.0,
        };
        let mut engine = prepared(params);
        let delay = engine.block_settings().unwrap().sample_delay.get();
        assert_eq!(delay, 2201);

        // Fully dry: output is the input, untouched.
        let input = impulse(delay + 1);
        let output = run_mono(&mut engine, &input, 256);
        assert_eq!(output, input);

        // One loop later slot 0 has been rewritten with half the impulse.
        let slot = engine.delay_line().slot(0, 0).unwrap();
        assert!((slot - 0.5).abs() < 1e-6, "Expected 0.5, got {slot}");

        run_mono(&mut engine, &vec![0.0; delay], 256);
        let slot = engine.delay_line().slot(0, 0).unwrap();
        assert!((slot - 0.25).abs() < 1e-6, "Expected 0.25, got {slot}");
    }

    #[test]
    fn test_impulse_echoes_when_fully_wet() {
        let params = Parameters {
            time: 0.01,
            feedback: 0.5,
            bias: 0.5,
            dry_wet: 1.0,
        };
        let mut engine = prepared(params);
        let delay = engine.block_settings().unwrap().sample_delay.get();

        let output = run_mono(&mut engine, &impulse(3 * delay + 1), 512);

        for (repeat, expected) in [(1, 1.0), (2, 0.5), (3, 0.25)] {
            let got = output[repeat * delay];
            assert!(
                (got - expected).abs() < 1e-6,
                "Echo {repeat} at sample {}: expected {expected}, got {got}",
                repeat * delay
            );
        }

        let stray = output
            .iter()
            .enumerate()
            .filter(|(i, _)| i % delay != 0)
            .map(|(_, v)| v.abs())
            .fold(0.0_f32, f32::max);
        assert!(stray < 1e-6, "Unexpected output between echoes: {stray}");
    }

    /// Fully wet with no feedback: the first output is the (silent) buffer,
    /// not the dry input.
    #[test]
    fn test_full_wet_routes_only_delayed_signal() {
        let mut engine = prepared(Parameters {
            feedback: 0.0,
            dry_wet: 1.0,
            ..Parameters::default()
        });

        let output = run_mono(&mut engine, &[0.8, 0.6, -0.4], 64);
        assert_eq!(output, [0.0, 0.0, 0.0]);
    }

    /// Low Bias (exponent 3) shrinks what is written into the loop.
    #[test]
    fn test_bias_shapes_recirculated_signal() {
        let mut engine = prepared(Parameters {
            time: 0.0,
            feedback: 0.0,
            bias: 0.0,
            dry_wet: 1.0,
        });
        let delay = engine.block_settings().unwrap().sample_delay.get();

        let mut input = vec![0.0; delay + 1];
        input[0] = -0.5;
        let output = run_mono(&mut engine, &input, 128);

        assert!((output[delay] + 0.125).abs() < 1e-6, "got {}", output[delay]);
    }

    /// The value written back into the loop never exceeds unity.
    #[test]
    fn test_recirculated_signal_is_hard_limited() {
        let mut engine = prepared(Parameters {
            time: 0.0,
            feedback: 1.0,
            bias: 0.5,
            dry_wet: 1.0,
        });
        let delay = engine.block_settings().unwrap().sample_delay.get();

        let output = run_mono(&mut engine, &vec![0.9; 4 * delay], 100);
        assert!(output.iter().all(|v| v.abs() <= 1.0));
        assert_eq!(output[3 * delay], 1.0);
    }

    #[test]
    fn test_reset_silences_loop() {
        let mut engine = prepared(Parameters {
            time: 0.0,
            feedback: 0.9,
            dry_wet: 1.0,
            ..Parameters::default()
        });
        let delay = engine.block_settings().unwrap().sample_delay.get();
        run_mono(&mut engine, &vec![0.5; delay * 2], 64);

        let cursor = engine.delay_line().cursor();
        engine.reset();
        assert_eq!(engine.delay_line().cursor(), cursor, "reset keeps the cursor");

        // A full loop of silence in: nothing comes back out.
        let output = run_mono(&mut engine, &vec![0.0; delay], 64);
        assert!(output.iter().all(|&v| v == 0.0));
    }

    /// Every channel's loop is silent for a full delay period after reset.
    #[test]
    fn test_reset_silences_every_channel() {
        let mut engine = prepared(Parameters {
            time: 0.0,
            feedback: 0.9,
            dry_wet: 1.0,
            ..Parameters::default()
        });
        let delay = engine.block_settings().unwrap().sample_delay.get();

        let mut left = vec![0.5; delay];
        let mut right = vec![-0.5; delay];
        engine.process_block(&mut [&mut left[..], &mut right[..]], 2, 2);
        assert!(
            (0..delay).any(|i| engine.delay_line().slot(1, i) != Some(0.0)),
            "right channel loop should hold signal before reset"
        );

        engine.reset();

        for channel in 0..MAX_CHANNELS {
            for i in 0..engine.delay_line().capacity() {
                assert_eq!(engine.delay_line().slot(channel, i), Some(0.0));
            }
        }

        let mut left = vec![0.0; delay];
        let mut right = vec![0.0; delay];
        engine.process_block(&mut [&mut left[..], &mut right[..]], 2, 2);
        assert!(left.iter().all(|&v| v == 0.0), "left channel not silent");
        assert!(right.iter().all(|&v| v == 0.0), "right channel not silent");
    }

    #[test]
    fn test_prepare_retains_buffer_for_same_rate() {
        let mut engine = prepared(Parameters {
            time: 0.0,
            ..Parameters::default()
        });
        run_mono(&mut engine, &[0.5; 100], 32);
        assert_ne!(engine.delay_line().cursor(), 0);

        engine.prepare_to_play(SAMPLE_RATE, 1024);

        assert_eq!(engine.delay_line().cursor(), 0);
        assert_eq!(engine.delay_line().capacity(), 176_400);
        assert_eq!(engine.delay_line().slot(0, 0), Some(0.0));
    }

    #[test]
    fn test_prepare_resizes_on_rate_change() {
        let mut engine = prepared(Parameters::default());
        engine.prepare_to_play(48000.0, 256);

        assert_eq!(engine.sample_rate(), Some(48000.0));
        assert_eq!(engine.delay_line().capacity(), 192_000);
        assert_eq!(engine.delay_line().num_channels(), MAX_CHANNELS);
    }

    /// Maximum Time loops over the whole buffer without leaving it.
    #[test]
    fn test_max_time_stays_within_capacity() {
        let mut engine = prepared(Parameters {
            time: 1.0,
            ..Parameters::default()
        });
        let capacity = engine.delay_line().capacity();
        assert_eq!(engine.block_settings().unwrap().sample_delay.get(), capacity);

        let mut left = vec![0.1; capacity + 10];
        let mut right = vec![0.1; capacity + 10];
        engine.process_block(&mut [&mut left[..], &mut right[..]], 2, 2);

        assert!(engine.delay_line().cursor() < capacity);
    }

    /// Both channels advance the same cursor, one after the other.
    #[test]
    fn test_channels_share_the_cursor() {
        let mut engine = prepared(Parameters::default());
        let mut left = [0.0; 16];
        let mut right = [0.0; 16];
        engine.process_block(&mut [&mut left[..], &mut right[..]], 2, 2);
        assert_eq!(engine.delay_line().cursor(), 32);
    }

    #[test]
    fn test_extra_buffer_channels_are_untouched() {
        let mut engine = prepared(Parameters {
            dry_wet: 1.0,
            ..Parameters::default()
        });
        let mut a = [0.3; 4];
        let mut b = [0.3; 4];
        let mut c = [0.3; 4];
        engine.process_block(&mut [&mut a[..], &mut b[..], &mut c[..]], 3, 3);

        assert_eq!(a, [0.0; 4]);
        assert_eq!(b, [0.0; 4]);
        assert_eq!(c, [0.3; 4], "channels beyond MAX_CHANNELS pass through");
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "channel counts must match")]
    fn test_channel_mismatch_asserts_in_debug() {
        let mut engine = prepared(Parameters::default());
        let mut left = [0.0; 4];
        let mut right = [0.0; 4];
        engine.process_block(&mut [&mut left[..], &mut right[..]], 2, 1);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_channel_mismatch_processes_common_channels() {
        let mut engine = prepared(Parameters {
            dry_wet: 1.0,
            ..Parameters::default()
        });
        let mut left = [0.3; 4];
        let mut right = [0.3; 4];
        engine.process_block(&mut [&mut left[..], &mut right[..]], 2, 1);
        assert_eq!(left, [0.0; 4]);
        assert_eq!(right, [0.3; 4]);
    }

    #[test]
    fn test_parameter_access() {
        let mut engine = DelayEngine::new();
        assert_eq!(engine.get_num_parameters(), 4);
        assert_eq!(engine.get_parameter_name(3), "Dry/Wet");
        assert_eq!(engine.get_parameter_name(9), "");
        assert_eq!(engine.get_parameter_value(0), 0.2);
        assert_eq!(engine.get_parameter_value(9), 0.0);

        engine.set_parameter_value(1, 0.7);
        engine.set_parameter_value(9, 0.7);
        assert_eq!(engine.parameters().feedback, 0.7);
    }

    #[test]
    fn test_state_save_and_load() {
        let mut engine = DelayEngine::new();
        engine.set_parameter_value(2, 0.9);
        let saved = engine.save_state();

        let mut other = DelayEngine::new();
        other.load_state(&saved);
        assert_eq!(other.parameters(), engine.parameters());

        let mut foreign = saved.clone();
        foreign.tag = "OtherPlugin".to_owned();
        let mut untouched = DelayEngine::new();
        untouched.load_state(&foreign);
        assert_eq!(untouched.parameters(), &Parameters::default());
    }
}
