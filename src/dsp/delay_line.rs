//! # Delay Line (Ring Buffers with a Shared Cursor)
//!
//! A delay line stores audio samples and hands them back a fixed number of
//! samples later. Here it holds one buffer per audio channel, all driven by
//! a *single* write cursor.
//!
//! ## How This Ring Buffer Works
//!
//! There is no separate read head. The cursor points at the slot that is
//! about to be overwritten, and whatever is still sitting in that slot is
//! the sample written exactly one loop ago:
//!
//! 1. `read(channel)` returns the old contents of the cursor's slot: the
//!    delayed sample.
//! 2. `write(channel, v)` overwrites the same slot with the new value.
//! 3. `advance_cursor(delay)` moves the cursor forward by one and wraps it
//!    at `delay`, **not** at the allocated capacity.
//!
//! ```text
//!   capacity (MAX_DELAY * sample_rate)
//! ┌───────────────────────────────┬────────────────────────┐
//! │  active window: `delay` slots │  unreferenced slots    │
//! └───────────────────────────────┴────────────────────────┘
//!   ▲ cursor cycles 0..delay
//! ```
//!
//! Because the wrap point is the current delay length, the loop length is
//! exact and no interpolation is needed. The buffers are allocated for the
//! longest possible delay so growing the delay never reallocates.
//!
//! ## Known Limitations
//!
//! - Shrinking the delay does not clear the slots beyond the new window.
//!   They keep their old samples until the window grows back over them.
//! - The cursor is shared. When a block is processed channel by channel,
//!   the second channel starts wherever the first one left the cursor.

use std::num::NonZeroUsize;

/// Per-channel circular buffers with one shared write cursor.
///
/// All memory is allocated in [`allocate()`](Self::allocate); reading,
/// writing and advancing never allocate.
#[derive(Debug, Default)]
pub struct DelayLine {
    /// One buffer per channel, each `capacity` samples long.
    channels: Vec<Vec<f32>>,

    /// Slot that will be read and then overwritten next. Always `< capacity`
    /// once allocated.
    cursor: usize,

    capacity: usize,
}

impl DelayLine {
    /// An empty delay line with no channels. Call
    /// [`allocate()`](Self::allocate) before processing.
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)allocate `num_channels` silent buffers of `capacity` samples and
    /// put the cursor back at the start.
    pub fn allocate(&mut self, num_channels: usize, capacity: NonZeroUsize) {
        let capacity = capacity.get();
        self.channels = (0..num_channels).map(|_| vec![0.0; capacity]).collect();
        self.capacity = capacity;
        self.cursor = 0;
    }

    /// Whether [`allocate()`](Self::allocate) has been called with at least
    /// one channel.
    pub fn is_allocated(&self) -> bool {
        self.capacity > 0 && !self.channels.is_empty()
    }

    /// Allocated length of each channel buffer, in samples.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Current write cursor position.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The sample stored at the cursor for `channel`, i.e. the sample
    /// written one full delay loop ago.
    ///
    /// Returns silence for channels that were never allocated.
    #[inline]
    pub fn read(&self, channel: usize) -> f32 {
        self.channels
            .get(channel)
            .and_then(|buffer| buffer.get(self.cursor))
            .copied()
            .unwrap_or(0.0)
    }

    /// Overwrite the slot at the cursor for `channel`.
    ///
    /// Does NOT move the cursor; call [`advance_cursor()`](Self::advance_cursor)
    /// once the sample is finished. Writes to unallocated channels are
    /// dropped.
    #[inline]
    pub fn write(&mut self, channel: usize, sample: f32) {
        let cursor = self.cursor;
        if let Some(slot) = self
            .channels
            .get_mut(channel)
            .and_then(|buffer| buffer.get_mut(cursor))
        {
            *slot = sample;
        }
    }

    /// Move the cursor forward one slot, wrapping at `delay` samples.
    ///
    /// `delay` is clamped to the capacity so the cursor can never leave the
    /// allocated buffers. `NonZeroUsize` rules out a zero modulus.
    #[inline]
    pub fn advance_cursor(&mut self, delay: NonZeroUsize) {
        let wrap = delay.get().min(self.capacity.max(1));
        self.cursor = (self.cursor + 1) % wrap;
    }

    /// Fill every buffer with silence. The cursor stays where it is and the
    /// memory is kept.
    pub fn clear(&mut self) {
        for buffer in &mut self.channels {
            buffer.fill(0.0);
        }
    }

    /// Put the cursor back at slot 0.
    pub fn reset_cursor(&mut self) {
        self.cursor = 0;
    }

    /// Sample at an absolute slot, for inspecting the buffer contents.
    pub fn slot(&self, channel: usize, index: usize) -> Option<f32> {
        self.channels.get(channel)?.get(index).copied()
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
