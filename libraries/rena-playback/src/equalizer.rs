//! Ten-band graphic equalizer settings and presets

use crate::error::{EngineError, Result};

/// Number of equalizer bands
pub const BAND_COUNT: usize = 10;

/// Lowest accepted band gain (dB)
pub const MIN_GAIN_DB: f64 = -24.0;

/// Highest accepted band gain (dB)
pub const MAX_GAIN_DB: f64 = 12.0;

/// Center frequencies of the bands in Hz
pub const BAND_FREQUENCIES: [u32; BAND_COUNT] =
    [30, 60, 120, 250, 500, 1000, 2000, 4000, 8000, 16000];

/// Built-in presets: name and per-band gains in dB
pub const PRESETS: &[(&str, [f64; BAND_COUNT])] = &[
    ("Disabled", [0.0; BAND_COUNT]),
    ("Classical", [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -7.2, -7.2, -7.2, -9.6]),
    ("Club", [0.0, 0.0, 8.0, 5.6, 5.6, 5.6, 3.2, 0.0, 0.0, 0.0]),
    ("Dance", [9.6, 7.2, 2.4, 0.0, 0.0, -5.6, -7.2, -7.2, 0.0, 0.0]),
    ("Full Bass", [-8.0, 9.6, 9.6, 5.6, 1.6, -4.0, -8.0, -10.4, -11.2, -11.2]),
    ("Full Treble", [-9.6, -9.6, -9.6, -4.0, 2.4, 11.2, 12.0, 12.0, 12.0, 12.0]),
    ("Live", [-4.8, 0.0, 4.0, 5.6, 5.6, 5.6, 4.0, 2.4, 2.4, 2.4]),
    ("Pop", [-1.6, 4.8, 7.2, 8.0, 5.6, 0.0, -2.4, -2.4, -1.6, -1.6]),
    ("Reggae", [0.0, 0.0, 0.0, -5.6, 0.0, 6.4, 6.4, 0.0, 0.0, 0.0]),
    ("Rock", [8.0, 4.8, -5.6, -8.0, -3.2, 4.0, 8.8, 11.2, 11.2, 11.2]),
    ("Soft", [4.8, 1.6, 0.0, -2.4, 0.0, 4.0, 8.0, 9.6, 11.2, 12.0]),
    ("Techno", [8.0, 5.6, 0.0, -5.6, -4.8, 0.0, 8.0, 9.6, 9.6, 8.8]),
];

/// Current equalizer gains
#[derive(Debug, Clone, PartialEq)]
pub struct Equalizer {
    bands: [f64; BAND_COUNT],
}

impl Equalizer {
    /// Create from gains, clamping each band
    pub fn new(bands: [f64; BAND_COUNT]) -> Self {
        Self {
            bands: bands.map(clamp_gain),
        }
    }

    /// Set one band, returning the clamped gain actually stored
    pub fn set_band(&mut self, band: usize, gain_db: f64) -> Result<f64> {
        let slot = self
            .bands
            .get_mut(band)
            .ok_or(EngineError::InvalidBand(band))?;
        *slot = clamp_gain(gain_db);
        Ok(*slot)
    }

    /// Replace all bands with a named preset
    pub fn apply_preset(&mut self, name: &str) -> Result<()> {
        let (_, gains) = PRESETS
            .iter()
            .find(|(preset, _)| preset.eq_ignore_ascii_case(name))
            .ok_or_else(|| EngineError::UnknownPreset(name.to_string()))?;
        self.bands = gains.map(clamp_gain);
        Ok(())
    }

    /// Current gains in dB
    pub fn bands(&self) -> [f64; BAND_COUNT] {
        self.bands
    }
}

impl Default for Equalizer {
    fn default() -> Self {
        Self::new([0.0; BAND_COUNT])
    }
}

fn clamp_gain(gain_db: f64) -> f64 {
    gain_db.clamp(MIN_GAIN_DB, MAX_GAIN_DB)
}
