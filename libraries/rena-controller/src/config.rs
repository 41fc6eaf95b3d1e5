/// Player configuration
use crate::error::{ControllerError, Result};
use rena_playback::{EngineConfig, Equalizer, BAND_COUNT};
use rena_playlist::SequencerConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Default configuration file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "rena.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PlayerConfig {
    #[serde(default)]
    pub playback: PlaybackSettings,

    #[serde(default)]
    pub playlist: PlaylistSettings,

    #[serde(default)]
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaybackSettings {
    /// Perceptual volume, 0.0-1.0
    #[serde(default = "default_volume")]
    pub volume: f64,

    /// Named equalizer preset; wins over `equalizer_bands`
    #[serde(default)]
    pub equalizer_preset: Option<String>,

    /// Ten band gains in dB
    #[serde(default)]
    pub equalizer_bands: Vec<f64>,

    /// Cache network streams to a local file while playing
    #[serde(default)]
    pub local_storage: bool,

    /// Skip to the next track when one fails instead of stopping
    #[serde(default)]
    pub ignore_errors: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PlaylistSettings {
    #[serde(default)]
    pub shuffle: bool,

    #[serde(default)]
    pub repeat: bool,

    /// Restore the previous session's playlist at startup
    #[serde(default = "default_restore_on_start")]
    pub restore_on_start: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl PlayerConfig {
    /// Load configuration from `rena.toml` (if present) and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(Some(Path::new(DEFAULT_CONFIG_FILE)))
    }

    /// Load configuration from `file` (skipped when missing) and the environment
    ///
    /// Environment variables use the `RENA_` prefix and `__` between
    /// section and key, e.g. `RENA_PLAYBACK__IGNORE_ERRORS=true`.
    pub fn load_from(file: Option<&Path>) -> Result<Self> {
        Self::load_with_env(file, None)
    }

    pub(crate) fn load_with_env(
        file: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = file.filter(|p| p.exists()) {
            settings = settings.add_source(config::File::from(path));
        }

        settings = settings.add_source(
            config::Environment::with_prefix("RENA")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let playback = &self.playback;

        if !(0.0..=1.0).contains(&playback.volume) {
            return Err(ControllerError::Config(format!(
                "Volume must be between 0.0 and 1.0, got {}",
                playback.volume
            )));
        }

        if !playback.equalizer_bands.is_empty() && playback.equalizer_bands.len() != BAND_COUNT {
            return Err(ControllerError::Config(format!(
                "Equalizer needs {BAND_COUNT} bands, got {}",
                playback.equalizer_bands.len()
            )));
        }

        if let Some(preset) = &playback.equalizer_preset {
            Equalizer::default()
                .apply_preset(preset)
                .map_err(|e| ControllerError::Config(e.to_string()))?;
        }

        Ok(())
    }

    /// Engine settings derived from the playback section
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let playback = &self.playback;
        let mut equalizer = Equalizer::default();

        if let Some(preset) = &playback.equalizer_preset {
            equalizer.apply_preset(preset)?;
        } else {
            for (band, gain) in playback.equalizer_bands.iter().enumerate() {
                equalizer.set_band(band, *gain)?;
            }
        }

        Ok(EngineConfig {
            volume: playback.volume,
            equalizer: equalizer.bands(),
            local_storage: playback.local_storage,
        })
    }

    /// Sequencer settings derived from the playlist section
    pub fn sequencer_config(&self) -> SequencerConfig {
        SequencerConfig {
            shuffle: self.playlist.shuffle,
            repeat: self.playlist.repeat,
        }
    }
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            equalizer_preset: None,
            equalizer_bands: Vec::new(),
            local_storage: false,
            ignore_errors: false,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

// Default values
fn default_volume() -> f64 {
    0.5
}

fn default_restore_on_start() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults() {
        let config = PlayerConfig::load_with_env(None, env(&[])).unwrap();

        assert!((config.playback.volume - 0.5).abs() < f64::EPSILON);
        assert!(!config.playback.ignore_errors);
        assert!(!config.playlist.shuffle);
        assert!(config.playlist.restore_on_start);
        assert_eq!(config.storage.data_dir, PathBuf::from("./data"));
    }

    #[test]
    fn test_file_then_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rena.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[playback]\nvolume = 0.8\nequalizer_preset = \"Rock\"\n\n[playlist]\nshuffle = true"
        )
        .unwrap();

        let config = PlayerConfig::load_with_env(
            Some(&path),
            env(&[
                ("RENA_PLAYLIST__REPEAT", "true"),
                ("RENA_PLAYBACK__IGNORE_ERRORS", "true"),
            ]),
        )
        .unwrap();

        assert!((config.playback.volume - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.playback.equalizer_preset.as_deref(), Some("Rock"));
        assert!(config.playlist.shuffle);
        assert!(config.playlist.repeat);
        assert!(config.playback.ignore_errors);
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let config =
            PlayerConfig::load_with_env(Some(Path::new("/nonexistent/rena.toml")), env(&[]));
        assert!(config.is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let mut config = PlayerConfig::default();
        config.playback.volume = 1.5;
        assert!(config.validate().is_err());

        let mut config = PlayerConfig::default();
        config.playback.equalizer_bands = vec![0.0; 3];
        assert!(config.validate().is_err());

        let mut config = PlayerConfig::default();
        config.playback.equalizer_preset = Some("Polka".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_engine_config_uses_preset_or_bands() {
        let mut config = PlayerConfig::default();
        config.playback.equalizer_bands = vec![3.0; BAND_COUNT];
        config.playback.local_storage = true;

        let engine = config.engine_config().unwrap();
        assert_eq!(engine.equalizer, [3.0; BAND_COUNT]);
        assert!(engine.local_storage);

        config.playback.equalizer_preset = Some("disabled".to_string());
        let engine = config.engine_config().unwrap();
        assert_eq!(engine.equalizer, [0.0; BAND_COUNT]);
    }
}
