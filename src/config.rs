use config::{Config, ConfigError, File, FileFormat};
use serde::Deserialize;
use tracing::info;

use fetchbot_control::{ArmConfig, SeekConfig};
use fetchbot_drive::DriveConfig;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Typed view of `config/default.toml`. Every section falls back to its
/// crate's defaults, so a missing file or a partial file is fine.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub drive: DriveConfig,
    pub arm: ArmConfig,
    pub seek: SeekConfig,
}

pub fn load() -> Result<RobotConfig, ConfigError> {
    info!("loading configuration from {}", DEFAULT_CONFIG_PATH);

    let settings = Config::builder()
        .add_source(File::new(DEFAULT_CONFIG_PATH, FileFormat::Toml).required(false))
        .build()?;

    let config: RobotConfig = settings.try_deserialize()?;
    info!(?config, "configuration loaded");
    Ok(config)
}
