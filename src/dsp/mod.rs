//! # DSP Primitives
//!
//! The building blocks of the biased delay:
//!
//! - **`bias`**: the sign-preserving power curve applied to every sample
//!   that re-enters the feedback loop, and the knob-to-exponent mapping.
//!
//! - **`crossfade`**: pure dry/wet blend functions and the output limiters.
//!
//! - **`delay_line`**: per-channel ring buffers sharing one write cursor
//!   that wraps at the current delay length.

pub mod bias;
pub mod crossfade;
pub mod delay_line;
