// Player configuration - RON file under the user config directory

use crate::smf::DecodeOptions;
use encoding_rs::Encoding;
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("RON serialization error: {0}")]
    Serialize(#[from] ron::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Player settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Sequencer timer period
    pub interval_ms: u64,
    /// Channels reset on pause (all sound off, pitch bend center)
    pub channel_count: u8,
    /// Charset label used when text detection fails
    pub fallback_charset: String,
    pub message_queue_capacity: usize,
    pub display_queue_capacity: usize,
    /// One of off, error, warn, info, debug, trace
    pub log_level: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 10,
            channel_count: 16,
            fallback_charset: "Shift_JIS".to_string(),
            message_queue_capacity: 1024,
            display_queue_capacity: 256,
            log_level: "info".to_string(),
        }
    }
}

impl PlayerConfig {
    /// `<config dir>/smfplay/config.ron`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("smfplay").join("config.ron"))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron(&text)
    }

    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the default path; a missing file yields the defaults
    pub fn load_or_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => {
                log::debug!("Loading configuration from {}", path.display());
                Self::load(path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = ron::ser::to_string_pretty(self, PrettyConfig::default())?;
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "interval_ms must be at least 1".into(),
            ));
        }
        if self.channel_count > 16 {
            return Err(ConfigError::Invalid(format!(
                "channel_count {} exceeds 16",
                self.channel_count
            )));
        }
        if self.message_queue_capacity == 0 || self.display_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "queue capacities must be non-zero".into(),
            ));
        }
        self.fallback_encoding()?;
        self.log_level_filter()?;
        Ok(())
    }

    pub fn fallback_encoding(&self) -> Result<&'static Encoding, ConfigError> {
        Encoding::for_label(self.fallback_charset.as_bytes()).ok_or_else(|| {
            ConfigError::Invalid(format!("unknown charset '{}'", self.fallback_charset))
        })
    }

    pub fn log_level_filter(&self) -> Result<log::LevelFilter, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("unknown log level '{}'", self.log_level)))
    }

    pub fn decode_options(&self) -> Result<DecodeOptions, ConfigError> {
        Ok(DecodeOptions {
            fallback_encoding: self.fallback_encoding()?,
        })
    }
}
