//! # Crossfades and Limiters
//!
//! Stateless functions that blend two signals `a` and `b` by a mix ratio
//! in [0, 1]. `mix = 0` is all `a`, `mix = 1` is all `b`.
//!
//! | Function | Shape |
//! |----------|-------|
//! | [`linear_xfade`] | straight ramp, dips in loudness mid-fade |
//! | [`sigmoid_xfade`] | S-curve ramp, smaller dip |
//! | [`linear_trans_fade`] | double-speed ramps that plateau at full gain |
//! | [`sigmoid_trans_fade`] | the same plateau shape with S-curve ramps |
//!
//! The engine's dry/wet stage uses [`sigmoid_xfade`].
//!
//! Out-of-range `mix` values never extrapolate: they are clamped, either
//! explicitly or by [`sigmoid`].

use std::f32::consts::{FRAC_PI_2, PI};

/// Half a sine period remapped onto [0, 1] → [0, 1].
///
/// ```text
/// sigmoid(x) = sin(clamp(x, 0, 1) * π - π/2) / 2 + 0.5
/// ```
///
/// Flat at both ends and steepest in the middle. `sigmoid(0) = 0` and
/// `sigmoid(1) = 1` exactly.
#[inline]
pub fn sigmoid(x: f32) -> f32 {
    (x.clamp(0.0, 1.0) * PI - FRAC_PI_2).sin() * 0.5 + 0.5
}

/// `a * (1 - mix) + b * mix`
#[inline]
pub fn linear_xfade(a: f32, b: f32, mix: f32) -> f32 {
    let mix = mix.clamp(0.0, 1.0);
    a * (1.0 - mix) + b * mix
}

/// `a * sigmoid(1 - mix) + b * sigmoid(mix)`
///
/// The S-curve keeps the summed gain closer to constant through the middle
/// of the fade than the linear version does. The weights always sum to
/// 1, so for `a` and `b` in [-1, 1] the output stays in [-1, 1].
#[inline]
pub fn sigmoid_xfade(a: f32, b: f32, mix: f32) -> f32 {
    a * sigmoid(1.0 - mix) + b * sigmoid(mix)
}

/// `a * min(1, 2 - 2·mix) + b * min(1, 2·mix)`
///
/// Each side ramps at double speed and then holds at unity for half the
/// range, so at `mix = 0.5` both signals are at full gain.
#[inline]
pub fn linear_trans_fade(a: f32, b: f32, mix: f32) -> f32 {
    let mix = mix.clamp(0.0, 1.0);
    a * (2.0 - 2.0 * mix).min(1.0) + b * (2.0 * mix).min(1.0)
}

/// [`linear_trans_fade`] with each ramp passed through [`sigmoid`].
#[inline]
pub fn sigmoid_trans_fade(a: f32, b: f32, mix: f32) -> f32 {
    let mix = mix.clamp(0.0, 1.0);
    a * sigmoid(2.0 - 2.0 * mix) + b * sigmoid(2.0 * mix)
}

/// Clamp to [-1, 1].
#[inline]
pub fn hard_limit(v: f32) -> f32 {
    v.clamp(-1.0, 1.0)
}

/// Clamp to [-1, 1].
///
/// Currently the same hard clamp as [`hard_limit`]; kept as a separate
/// name so call sites that want a smoother curve later can switch in one
/// place.
#[inline]
pub fn soft_limit(v: f32) -> f32 {
    v.clamp(-1.0, 1.0)
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
