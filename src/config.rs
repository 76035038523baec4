//! TOML configuration.
//!
//! Missing files fall back to defaults so the demo always starts; a file that
//! exists but does not parse is reported.
//!
//! ```toml
//! kind = "gamepad"
//! poll_interval_ms = 16
//!
//! [link]
//! backend = "i2c"
//! i2c = { bus = 1, address = 8, interrupt_pin = 5 }
//!
//! [gamepad]
//! hold_ms = 100
//! repeat_ms = 10
//! repeat = ["a", "b"]
//!
//! [gamepad.buttons.left]
//! hold_ms = 1000
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, Level};

use crate::face::gamepad::{DEFAULT_HOLD_MS, DEFAULT_REPEAT_MS};
use crate::face::{Button, ButtonTiming, FaceKind, Gamepad, UnknownButton};
use crate::link::{I2cSettings, PeripheralLink};

const CONFIG_DIR: &str = "faces-input";
const CONFIG_FILE: &str = "config.toml";

/// Roughly 60 polls per second.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 16;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error(transparent)]
    UnknownButton(#[from] UnknownButton),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LinkBackend {
    /// Canned input, no hardware needed.
    #[default]
    Scripted,
    I2c,
    Gilrs,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct LinkConfig {
    pub backend: LinkBackend,
    pub i2c: I2cSettings,
}

/// Per-button overrides; unset fields keep the gamepad-wide value.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ButtonOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat: Option<bool>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct GamepadConfig {
    pub hold_ms: u64,
    pub repeat_ms: u64,
    /// Buttons with software repeat enabled.
    pub repeat: Vec<String>,
    pub buttons: BTreeMap<String, ButtonOverride>,
}

impl Default for GamepadConfig {
    fn default() -> Self {
        Self {
            hold_ms: DEFAULT_HOLD_MS,
            repeat_ms: DEFAULT_REPEAT_MS,
            repeat: vec![Button::A.to_string(), Button::B.to_string()],
            buttons: BTreeMap::new(),
        }
    }
}

impl GamepadConfig {
    /// Resolved timing for every button, in [`Button::ALL`] order.
    pub fn timings(&self) -> Result<[ButtonTiming; Button::COUNT], ConfigError> {
        let mut timings = [ButtonTiming {
            hold_ms: self.hold_ms,
            repeat_ms: self.repeat_ms,
            repeat: false,
        }; Button::COUNT];

        for name in &self.repeat {
            let button: Button = name.parse()?;
            timings[button.index()].repeat = true;
        }

        for (name, over) in &self.buttons {
            let button: Button = name.parse()?;
            let timing = &mut timings[button.index()];
            if let Some(hold_ms) = over.hold_ms {
                timing.hold_ms = hold_ms;
            }
            if let Some(repeat_ms) = over.repeat_ms {
                timing.repeat_ms = repeat_ms;
            }
            if let Some(repeat) = over.repeat {
                timing.repeat = repeat;
            }
        }

        Ok(timings)
    }

    /// Pushes the timing into `pad`. Nothing changes if the config is invalid.
    pub fn apply<L: PeripheralLink>(&self, pad: &mut Gamepad<L>) -> Result<(), ConfigError> {
        let timings = self.timings()?;
        for button in Button::ALL {
            pad.set_timing(button, timings[button.index()]);
        }
        debug!("Applied gamepad timing: {:?}", timings);
        Ok(())
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct FacesConfig {
    pub kind: FaceKind,
    pub poll_interval_ms: u64,
    pub log_level: String,
    pub link: LinkConfig,
    pub gamepad: GamepadConfig,
}

impl Default for FacesConfig {
    fn default() -> Self {
        Self {
            kind: FaceKind::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            log_level: "info".to_string(),
            link: LinkConfig::default(),
            gamepad: GamepadConfig::default(),
        }
    }
}

impl FacesConfig {
    /// `<config dir>/faces-input/config.toml`, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Loads `path`, or the default location when `None`. A missing file
    /// yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) => path,
            None => {
                info!("No config directory on this platform, using defaults");
                return Ok(Self::default());
            }
        };

        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_toml(&text)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, self.to_toml()?).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Saved config to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        self.level()?;
        self.gamepad.timings()?;
        Ok(())
    }

    /// `log_level` as a tracing level, e.g. "debug" or "WARN".
    pub fn level(&self) -> Result<Level, ConfigError> {
        Level::from_str(self.log_level.trim())
            .map_err(|_| ConfigError::Invalid(format!("unknown log_level '{}'", self.log_level)))
    }
}
