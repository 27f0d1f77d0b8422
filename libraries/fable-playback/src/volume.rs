//! Track volume with a fixed ceiling
//!
//! Sliders run 0-100%. Narration maps linearly onto full scale; music maps onto
//! `0.0..=ceiling` so it always sits below narration.

/// Volume level for one track
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    /// Volume level (0-100)
    level: u8,

    /// Gain at 100%
    ceiling: f32,
}

impl Volume {
    /// Create a full-scale volume
    ///
    /// # Arguments
    /// * `level` - Initial volume (0-100, clamped)
    pub fn new(level: u8) -> Self {
        Self::with_ceiling(level, 1.0)
    }

    /// Create a volume whose 100% maps to `ceiling`
    pub fn with_ceiling(level: u8, ceiling: f32) -> Self {
        Self {
            level: level.min(100),
            ceiling: ceiling.clamp(0.0, 1.0),
        }
    }

    /// Set volume level (0-100)
    pub fn set_level(&mut self, level: u8) {
        self.level = level.min(100);
    }

    /// Get current volume level (0-100)
    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn ceiling(&self) -> f32 {
        self.ceiling
    }

    /// Linear gain for the platform
    pub fn gain(&self) -> f32 {
        f32::from(self.level) / 100.0 * self.ceiling
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(100)
    }
}
