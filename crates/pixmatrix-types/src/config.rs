use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{correction::CorrectionParams, frame::GridSize, PixmatrixError, Result};

pub const MIN_FPS: u32 = 1;
pub const MAX_FPS: u32 = 60;
pub const DEFAULT_HISTORY_DEPTH: usize = 20;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixConfig {
    pub width: u32,
    pub height: u32,
}

impl MatrixConfig {
    pub fn grid(&self) -> GridSize {
        GridSize::new(self.width, self.height)
    }
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            width: GridSize::DEFAULT_WIDTH,
            height: GridSize::DEFAULT_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub fps: u32,
    pub broadcast: bool,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            fps: 10,
            broadcast: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_HISTORY_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// In-process fan-out, useful for previews and tests.
    #[default]
    Local,
    /// One datagram per wire frame.
    Udp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub mode: TransportMode,
    pub bind_addr: String,
    pub target_addr: Option<String>,
    pub channel_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            mode: TransportMode::Local,
            bind_addr: "0.0.0.0:0".into(),
            target_addr: None,
            channel_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpsConfig {
    pub log_level: String,
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PixmatrixConfig {
    #[serde(default)]
    pub matrix: MatrixConfig,
    #[serde(default)]
    pub correction: CorrectionParams,
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub ops: OpsConfig,
}

impl PixmatrixConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| {
            PixmatrixError::Configuration(format!(
                "unable to read config file {}: {err}",
                path_ref.display()
            ))
        })?;
        toml::from_str(&contents).map_err(|err| {
            PixmatrixError::Configuration(format!(
                "failed to parse config file {}: {err}",
                path_ref.display()
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.matrix.width == 0 || self.matrix.height == 0 {
            return Err(PixmatrixError::Configuration(
                "matrix.width and matrix.height must be greater than zero".into(),
            ));
        }
        if !(MIN_FPS..=MAX_FPS).contains(&self.animation.fps) {
            return Err(PixmatrixError::Configuration(format!(
                "animation.fps must be between {MIN_FPS} and {MAX_FPS}"
            )));
        }
        if self.history.depth == 0 {
            return Err(PixmatrixError::Configuration(
                "history.depth must be greater than zero".into(),
            ));
        }
        if self.transport.channel_capacity == 0 {
            return Err(PixmatrixError::Configuration(
                "transport.channel_capacity must be greater than zero".into(),
            ));
        }
        if self.transport.mode == TransportMode::Udp && self.transport.target_addr.is_none() {
            return Err(PixmatrixError::Configuration(
                "transport.target_addr is required when transport.mode = \"udp\"".into(),
            ));
        }
        self.correction.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correction::ChannelGains;
    use std::fs;

    #[test]
    fn load_pixmatrix_config_from_file() {
        let temp_path = std::env::temp_dir().join("pixmatrix-config-test.toml");
        let config = PixmatrixConfig {
            matrix: MatrixConfig {
                width: 32,
                height: 8,
            },
            correction: CorrectionParams {
                brightness: 0.5,
                gamma: 2.2,
                gains: ChannelGains::new(1.0, 0.8, 0.6),
            },
            animation: AnimationConfig {
                fps: 24,
                broadcast: true,
            },
            history: HistoryConfig { depth: 50 },
            transport: TransportConfig {
                mode: TransportMode::Udp,
                bind_addr: "0.0.0.0:0".into(),
                target_addr: Some("192.168.1.40:5568".into()),
                channel_capacity: 16,
            },
            ops: OpsConfig {
                log_level: "debug".into(),
            },
        };

        let doc = toml::to_string(&config).expect("serialize config");
        fs::write(&temp_path, doc).expect("write temp config");

        let loaded = PixmatrixConfig::from_file(&temp_path).expect("load config");
        assert_eq!(loaded.matrix.grid(), GridSize::new(32, 8));
        assert_eq!(loaded.correction, config.correction);
        assert_eq!(loaded.animation.fps, 24);
        assert_eq!(loaded.history.depth, 50);
        assert_eq!(loaded.transport.mode, TransportMode::Udp);
        assert!(loaded.validate().is_ok());
        fs::remove_file(&temp_path).expect("cleanup temp config");
    }

    #[test]
    fn partial_file_uses_defaults() {
        let loaded: PixmatrixConfig = toml::from_str(
            r#"
            [animation]
            fps = 30
            "#,
        )
        .expect("parse partial config");
        assert_eq!(loaded.animation.fps, 30);
        assert_eq!(loaded.matrix.grid(), GridSize::default());
        assert_eq!(loaded.history.depth, DEFAULT_HISTORY_DEPTH);
        assert_eq!(loaded.transport.mode, TransportMode::Local);
    }

    #[test]
    fn partial_sections_fill_missing_fields() {
        let loaded: PixmatrixConfig = toml::from_str(
            r#"
            [matrix]
            width = 32

            [correction]
            gamma = 2.2

            [correction.gains]
            blue = 0.7

            [transport]
            mode = "udp"
            target_addr = "10.0.0.2:7777"
            "#,
        )
        .expect("parse partial sections");
        assert_eq!(loaded.matrix.grid(), GridSize::new(32, GridSize::DEFAULT_HEIGHT));
        assert_eq!(loaded.correction.gamma, 2.2);
        assert_eq!(loaded.correction.brightness, 1.0);
        assert_eq!(loaded.correction.gains, ChannelGains::new(1.0, 1.0, 0.7));
        assert_eq!(loaded.transport.bind_addr, "0.0.0.0:0");
        assert_eq!(loaded.transport.channel_capacity, 64);
        assert!(loaded.validate().is_ok());
    }

    #[test]
    fn missing_file_is_configuration_error() {
        let err = PixmatrixConfig::from_file("/nonexistent/pixmatrix.toml").unwrap_err();
        assert!(matches!(err, PixmatrixError::Configuration(_)));
    }

    #[test]
    fn validate_configuration_rules() {
        let mut config = PixmatrixConfig::default();
        assert!(config.validate().is_ok());

        config.animation.fps = 0;
        assert!(config.validate().is_err());
        config.animation.fps = 61;
        assert!(config.validate().is_err());
        config.animation.fps = 60;
        config.history.depth = 0;
        assert!(config.validate().is_err());
        config.history.depth = 20;
        config.matrix.width = 0;
        assert!(config.validate().is_err());
        config.matrix.width = 16;
        config.correction.gamma = 3.5;
        assert!(config.validate().is_err());
        config.correction.gamma = 1.0;
        config.transport.mode = TransportMode::Udp;
        assert!(config.validate().is_err());
        config.transport.target_addr = Some("127.0.0.1:5568".into());
        assert!(config.validate().is_ok());
    }
}
