//! 配置 - 默认值 → 配置文件 → 命令行参数
//!
//! 配置文件位于 `~/.config/notification-hub/config.json`，所有字段可选。

use crate::connection::websocket::{WebSocketConfig, DEFAULT_RECONNECT_DELAYS_MS};
use crate::connection::RetryPolicy;
use crate::notification::sound::{DEFAULT_SOUND_PATH, DEFAULT_VOLUME};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const APP_DIR: &str = "notification-hub";

/// 客户端配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Hub 地址
    pub hub_url: String,
    /// 跳过 negotiate
    pub skip_negotiation: bool,
    /// 首次连接的重试策略
    pub retry: RetryPolicy,
    /// 连接中断后传输层的自动重连间隔
    pub reconnect_delays_ms: Vec<u64>,
    /// Toast 显示时长
    pub toast_lifetime_ms: u64,
    /// 是否播放提示音
    pub sound_enabled: bool,
    /// 提示音文件
    pub sound_path: PathBuf,
    /// 音量 0.0..=1.0
    pub sound_volume: f32,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            hub_url: "http://localhost:5000/notificationHub".to_string(),
            skip_negotiation: false,
            retry: RetryPolicy::default(),
            reconnect_delays_ms: DEFAULT_RECONNECT_DELAYS_MS.to_vec(),
            toast_lifetime_ms: 5000,
            sound_enabled: true,
            sound_path: PathBuf::from(DEFAULT_SOUND_PATH),
            sound_volume: DEFAULT_VOLUME,
        }
    }
}

impl HubConfig {
    /// 默认配置文件路径
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("config.json"))
    }

    /// 数据目录（TUI 模式下的日志文件）
    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    /// 从指定文件读取
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow!("Cannot read config {}: {}", path.display(), e))?;
        let config: HubConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow!("Cannot parse config {}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// 读取配置：显式路径必须存在；默认路径不存在时使用默认值
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.parsed_hub_url()?;
        self.retry.validate()?;
        if !(0.0..=1.0).contains(&self.sound_volume) {
            return Err(anyhow!("sound_volume must be within 0.0..=1.0, got {}", self.sound_volume));
        }
        Ok(())
    }

    pub fn parsed_hub_url(&self) -> Result<Url> {
        Url::parse(&self.hub_url).map_err(|e| anyhow!("Invalid hub_url {}: {}", self.hub_url, e))
    }

    pub fn toast_lifetime(&self) -> Duration {
        Duration::from_millis(self.toast_lifetime_ms)
    }

    pub fn reconnect_delays(&self) -> Vec<Duration> {
        self.reconnect_delays_ms
            .iter()
            .map(|ms| Duration::from_millis(*ms))
            .collect()
    }

    /// 构造 websocket 传输配置
    pub fn websocket_config(&self) -> Result<WebSocketConfig> {
        let mut config = WebSocketConfig::new(self.parsed_hub_url()?);
        config.skip_negotiation = self.skip_negotiation;
        config.reconnect_delays = self.reconnect_delays();
        Ok(config)
    }
}
