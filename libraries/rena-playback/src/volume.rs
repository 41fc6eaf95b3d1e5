//! Volume control with perceptual (cubic) scaling
//!
//! Listeners see a perceptual volume in [0, 1]; the mixer is driven with the
//! linear amplitude. Human loudness perception is roughly cubic in amplitude,
//! so `linear = perceptual³`.

/// Tolerance below which two perceptual volumes are treated as equal
pub(crate) const VOLUME_EPSILON: f64 = 1e-4;

/// Convert a perceptual (cubic) volume to a linear mixer amplitude
pub fn cubic_to_linear(perceptual: f64) -> f64 {
    let v = perceptual.clamp(0.0, 1.0);
    v * v * v
}

/// Convert a linear mixer amplitude to a perceptual (cubic) volume
pub fn linear_to_cubic(linear: f64) -> f64 {
    linear.clamp(0.0, 1.0).cbrt()
}

/// Volume controller
///
/// Keeps the perceptual level and the cached linear gain in sync.
#[derive(Debug, Clone)]
pub struct Volume {
    /// Perceptual level (0.0-1.0)
    level: f64,

    /// Cached linear gain for the mixer
    linear_gain: f64,
}

impl Volume {
    /// Create new volume controller at perceptual `level`
    pub fn new(level: f64) -> Self {
        let level = level.clamp(0.0, 1.0);
        Self {
            level,
            linear_gain: cubic_to_linear(level),
        }
    }

    /// Set perceptual level, clamped to [0, 1]
    pub fn set_level(&mut self, level: f64) {
        self.level = level.clamp(0.0, 1.0);
        self.linear_gain = cubic_to_linear(self.level);
    }

    /// Adopt a linear gain reported by the mixer
    ///
    /// Returns true when the perceptual level actually moved.
    pub fn sync_from_linear(&mut self, linear: f64) -> bool {
        let level = linear_to_cubic(linear);
        if (level - self.level).abs() < VOLUME_EPSILON {
            return false;
        }
        self.level = level;
        self.linear_gain = linear.clamp(0.0, 1.0);
        true
    }

    /// Perceptual level (0.0-1.0)
    pub fn level(&self) -> f64 {
        self.level
    }

    /// Linear gain for the mixer
    pub fn gain(&self) -> f64 {
        self.linear_gain
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(0.5)
    }
}
