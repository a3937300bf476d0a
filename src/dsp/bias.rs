//! # Bias Shaper
//!
//! The nonlinearity that sits inside the feedback loop. Every sample that
//! re-enters the delay line has its magnitude raised to a power while its
//! sign is kept:
//!
//! ```text
//! shaped = sign(v) * |v|^exponent
//! ```
//!
//! - `exponent < 1` lifts quiet samples toward the loud ones (expansion,
//!   a saturation-like thickening of the repeats)
//! - `exponent = 1` leaves the signal untouched
//! - `exponent > 1` pushes quiet samples toward zero (a gate-like crunch
//!   that eats the tails of the repeats)
//!
//! Because the curve is odd-symmetric, positive and negative half-waves
//! are treated the same way and no DC offset is introduced.
//!
//! ## Mapping the Knob to an Exponent
//!
//! The control value `p` in [0, 1] is split at the centre. Each half is
//! rescaled to [0, 1] and *squared* before interpolating between two
//! reference exponents:
//!
//! ```text
//! p < 0.5:  p' = 2p          exponent = p'^2 * (MED - MIN) + MIN
//! p ≥ 0.5:  p' = 2(p - 0.5)  exponent = p'^2 * (MAX - MED) + MED
//! ```
//!
//! Squaring flattens the curve around the centre, so the knob is gentle
//! near "no bias" and accelerates toward the extremes.

/// Exponent at curve input 0: strongest expansion.
pub const MIN_BIAS: f32 = 0.5;

/// Exponent at curve input 0.5: the identity curve.
pub const MED_BIAS: f32 = 1.0;

/// Exponent at curve input 1: strongest compression.
pub const MAX_BIAS: f32 = 3.0;

/// Map a normalized curve position `p` in [0, 1] to a shaping exponent.
///
/// Returns exactly [`MIN_BIAS`] at 0, [`MED_BIAS`] at 0.5 and [`MAX_BIAS`]
/// at 1. Both halves evaluate to `MED_BIAS` at the centre, so the curve is
/// continuous there.
///
/// Note that the engine feeds this with `1 - bias_parameter`: a *low* Bias
/// knob gives a *high* exponent (compression), a high knob gives expansion.
pub fn bias_exponent(p: f32) -> f32 {
    if p < 0.5 {
        let p = p * 2.0;
        p * p * (MED_BIAS - MIN_BIAS) + MIN_BIAS
    } else {
        let p = (p - 0.5) * 2.0;
        p * p * (MAX_BIAS - MED_BIAS) + MED_BIAS
    }
}

/// Raise the magnitude of `v` to `exponent` and restore its sign.
///
/// The power is always taken of `|v|`, never of a negative base, so the
/// result is real for any positive exponent. `apply_bias(0.0, e)` is 0.
#[inline]
pub fn apply_bias(v: f32, exponent: f32) -> f32 {
    let magnitude = v.abs().powf(exponent);
    if v < 0.0 {
        -magnitude
    } else {
        magnitude
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
