use serde::{Deserialize, Serialize};

/// 应用配置管理模块
/// 集中管理所有配置项，提供默认值和配置验证

/// 主配置结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub session: SessionConfig,
    pub plot: PlotConfig,
    pub database: DatabaseConfig,
    pub mqtt: MqttConfig,
    pub channels: ChannelConfig,
}

/// 校准会话配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub duration_seconds: f64,
}

/// 实时显示窗口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotConfig {
    pub history_size: usize,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub auto_create_dir: bool,
}

/// MQTT配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub topic: String,
    pub keep_alive: u16,
}

/// 通道配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub sample_channel_capacity: usize,
    pub feature_task_channel_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            plot: PlotConfig::default(),
            database: DatabaseConfig::default(),
            mqtt: MqttConfig::default(),
            channels: ChannelConfig::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 60.0,
        }
    }
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self { history_size: 30 }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/calibration.db".to_string(),
            auto_create_dir: true,
        }
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "calib-client-01".to_string(),
            topic: "sensors".to_string(),
            keep_alive: 5,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            sample_channel_capacity: 5000,
            feature_task_channel_capacity: 16,
        }
    }
}

impl AppConfig {
    /// 从文件加载配置
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::IoError)?;

        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::ParseError)?;

        config.validate()?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::SerializeError)?;

        std::fs::write(path, content).map_err(ConfigError::IoError)?;

        Ok(())
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.duration_seconds <= 0.0 {
            return Err(ConfigError::ValidationError(
                "Session duration must be positive".to_string(),
            ));
        }

        if self.plot.history_size == 0 {
            return Err(ConfigError::ValidationError(
                "Plot history size must be positive".to_string(),
            ));
        }

        if self.channels.sample_channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "Sample channel capacity must be positive".to_string(),
            ));
        }

        if self.channels.feature_task_channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "Feature task channel capacity must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(toml::de::Error),
    #[error("Serialize error: {0}")]
    SerializeError(toml::ser::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// 配置管理器
pub struct ConfigManager {
    config: AppConfig,
}

impl ConfigManager {
    /// 创建配置管理器
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    /// 从文件加载配置
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let config = AppConfig::load_from_file(&path)?;
        Ok(Self { config })
    }

    /// 获取当前配置
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    /// 保存配置到指定文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), ConfigError> {
        self.config.save_to_file(path)
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
