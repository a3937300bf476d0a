//! # Parameter Record
//!
//! The four controls of the biased delay, all normalized to [0, 1]:
//!
//! | Index | Name | Default | Drives |
//! |-------|------|---------|--------|
//! | 0 | Time | 0.2 | delay length, `MIN_DELAY..MAX_DELAY` seconds |
//! | 1 | Feedback | 0.1 | gain of the recirculated signal |
//! | 2 | Bias | 0.5 | bias curve position (inverted, see [`crate::dsp::bias`]) |
//! | 3 | Dry/Wet | 0.5 | output blend |
//!
//! The index order is part of the external contract and must not change.
//!
//! Values are stored as given. The record does not clamp; the engine
//! clamps only the quantities it derives from them.

/// Index-addressable identity of each parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterId {
    Time = 0,
    Feedback = 1,
    Bias = 2,
    DryWet = 3,
}

impl ParameterId {
    /// Every parameter, in index order.
    pub const ALL: [Self; 4] = [Self::Time, Self::Feedback, Self::Bias, Self::DryWet];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Display name, also used as the key in persisted state.
    pub fn name(self) -> &'static str {
        match self {
            Self::Time => "Time",
            Self::Feedback => "Feedback",
            Self::Bias => "Bias",
            Self::DryWet => "Dry/Wet",
        }
    }

    pub fn default_value(self) -> f32 {
        match self {
            Self::Time => 0.2,
            Self::Feedback => 0.1,
            Self::Bias => 0.5,
            Self::DryWet => 0.5,
        }
    }
}

/// Current values of all four parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameters {
    pub time: f32,
    pub feedback: f32,
    pub bias: f32,
    pub dry_wet: f32,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            time: ParameterId::Time.default_value(),
            feedback: ParameterId::Feedback.default_value(),
            bias: ParameterId::Bias.default_value(),
            dry_wet: ParameterId::DryWet.default_value(),
        }
    }
}

impl Parameters {
    /// Number of parameters.
    pub const COUNT: usize = ParameterId::ALL.len();

    pub fn get(&self, id: ParameterId) -> f32 {
        match id {
            ParameterId::Time => self.time,
            ParameterId::Feedback => self.feedback,
            ParameterId::Bias => self.bias,
            ParameterId::DryWet => self.dry_wet,
        }
    }

    pub fn set(&mut self, id: ParameterId, value: f32) {
        match id {
            ParameterId::Time => self.time = value,
            ParameterId::Feedback => self.feedback = value,
            ParameterId::Bias => self.bias = value,
            ParameterId::DryWet => self.dry_wet = value,
        }
    }

    /// Name at `index`, or `""` when out of range.
    pub fn name(index: usize) -> &'static str {
        ParameterId::from_index(index).map_or("", ParameterId::name)
    }

    /// Value at `index`, or `0.0` when out of range.
    pub fn value(&self, index: usize) -> f32 {
        ParameterId::from_index(index).map_or(0.0, |id| self.get(id))
    }

    /// Set the value at `index`. Out-of-range indices are ignored.
    pub fn set_value(&mut self, index: usize, value: f32) {
        if let Some(id) = ParameterId::from_index(index) {
            self.set(id, value);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
