use std::env::var_os;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use serde::{Serialize, Deserialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),
}

/// How much the beeper is allowed to say.
///
/// Ordered from silent to loudest; key clicks sound only above [BeeperMode::NoKey].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeeperMode {
    Quiet,
    NoKey,
    XShort,
    Short,
    #[default]
    Normal,
    Long,
    XLong,
}

impl BeeperMode {
    /// Length of the key click in milliseconds, or `None` if keys are silent.
    pub fn key_beep_ms(self) -> Option<u16> {
        match self {
            BeeperMode::Quiet | BeeperMode::NoKey => None,
            BeeperMode::XShort => Some(10),
            BeeperMode::Short => Some(20),
            BeeperMode::Normal => Some(40),
            BeeperMode::Long => Some(80),
            BeeperMode::XLong => Some(160),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub beeper: BeeperMode,
    /// Pitch of the key click.
    pub key_tone_hz: u16,
}

impl Config {
    fn path() -> PathBuf {
        let config_str = var_os("TXPAD_CONFIG_FILE");
        let config_str: &OsStr = config_str.as_deref().unwrap_or(OsStr::new("txpad.json"));
        Path::new(config_str).to_path_buf()
    }

    /// Loads the config from `TXPAD_CONFIG_FILE` (default `txpad.json`).
    ///
    /// Returns `Ok(None)` if the file does not exist.
    pub fn try_load() -> Result<Option<Self>, ConfigError> {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let reader = BufReader::new(File::open(path)?);
        Ok(Some(serde_json::from_reader(reader)?))
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            beeper: BeeperMode::default(),
            key_tone_hz: 2000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_silent_up_to_no_key() {
        assert_eq!(BeeperMode::Quiet.key_beep_ms(), None);
        assert_eq!(BeeperMode::NoKey.key_beep_ms(), None);
        assert!(BeeperMode::XShort > BeeperMode::NoKey);
        assert_eq!(BeeperMode::XShort.key_beep_ms(), Some(10));
        assert_eq!(BeeperMode::XLong.key_beep_ms(), Some(160));
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let config: Config = serde_json::from_str(r#"{ "beeper": "no_key" }"#).unwrap();
        assert_eq!(config.beeper, BeeperMode::NoKey);
        assert_eq!(config.key_tone_hz, Config::default().key_tone_hz);
    }

    #[test]
    fn saved_config_loads_back() {
        let path = std::env::temp_dir().join(format!("txpad-config-{}.json", std::process::id()));
        let config = Config { beeper: BeeperMode::Long, key_tone_hz: 1500 };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), Some(config));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let path = std::env::temp_dir().join("txpad-config-does-not-exist.json");
        assert!(Config::load_from(&path).unwrap().is_none());
    }
}
