//! 应用配置
//!
//! JSON 文件，所有字段都有默认值：
//!
//! ```json
//! {
//!   "log_level": "debug",
//!   "map": { "center_lng": 31.208853, "center_lat": 30.013056, "zoom": 12 },
//!   "validation": { "policy": "reject_touching" },
//!   "remote": { "base_url": "https://zones.example.com/api", "timeout_secs": 10 }
//! }
//! ```
//!
//! 没有 `remote` 时使用预置绿区与蓝区的内存仓库。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::Level;
use zonemap_core::math::{lng_lat, Point2};
use zonemap_core::validator::IntersectionPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: String,
    pub map: MapConfig,
    pub validation: ValidationConfig,
    pub remote: Option<RemoteConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            map: MapConfig::default(),
            validation: ValidationConfig::default(),
            remote: None,
        }
    }
}

/// 地图初始视野
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub center_lng: f64,
    pub center_lat: f64,
    pub zoom: u8,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center_lng: 31.208853,
            center_lat: 30.013056,
            zoom: 12,
        }
    }
}

impl MapConfig {
    pub fn center(&self) -> Point2 {
        lng_lat(self.center_lng, self.center_lat)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub policy: IntersectionPolicy,
}

/// 远端区域服务
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl RemoteConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    /// 读取配置文件；未指定路径时使用默认配置
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                Self::from_json(&text)
                    .with_context(|| format!("invalid config {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// 命令行参数覆盖配置文件
    pub fn apply_overrides(&mut self, remote: Option<String>, token: Option<String>) {
        if let Some(base_url) = remote {
            match self.remote.as_mut() {
                Some(existing) => existing.base_url = base_url,
                None => self.remote = Some(RemoteConfig::new(base_url)),
            }
        }
        if let (Some(token), Some(remote)) = (token, self.remote.as_mut()) {
            remote.token = Some(token);
        }
    }

    /// 日志级别；无法识别时为 INFO
    pub fn log_level(&self) -> Level {
        self.log_level.parse().unwrap_or(Level::INFO)
    }
}
