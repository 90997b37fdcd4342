use std::path::PathBuf;

use anyhow::{anyhow, Result};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::logger::parse_level;
use crate::models::{AppConfig, PersistedAppConfig};
use crate::utils::{validate_base_url, validate_duration_ms, validate_progress_increment};

pub struct SettingsManager {
    path: PathBuf,
    data: RwLock<PersistedAppConfig>,
}

impl SettingsManager {
    pub async fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let initial = match tokio::fs::read(&path).await {
            Ok(bytes) if !bytes.is_empty() => {
                serde_json::from_slice::<PersistedAppConfig>(&bytes).unwrap_or_else(|e| {
                    warn!("配置文件解析失败，使用默认配置: {}", e);
                    PersistedAppConfig::default()
                })
            }
            _ => {
                let default = PersistedAppConfig::default();
                let json = serde_json::to_string_pretty(&default)?;
                tokio::fs::write(&path, json).await?;
                info!("已创建默认配置: {:?}", path);
                default
            }
        };

        Ok(Self {
            path,
            data: RwLock::new(initial),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub async fn get(&self) -> PersistedAppConfig {
        self.data.read().await.clone()
    }

    /// 部分更新，任一字段校验失败时不修改任何配置
    pub async fn update(&self, update: AppConfig) -> Result<PersistedAppConfig> {
        let mut config = self.data.write().await;
        let mut next = config.clone();

        if let Some(url) = update.api_base_url {
            next.api_base_url = validate_base_url(&url).map_err(|e| anyhow!(e))?;
        }
        if let Some(ms) = update.request_timeout_ms {
            next.request_timeout_ms =
                validate_duration_ms("request_timeout_ms", ms).map_err(|e| anyhow!(e))?;
        }
        if let Some(ms) = update.initialization_delay_ms {
            next.initialization_delay_ms =
                validate_duration_ms("initialization_delay_ms", ms).map_err(|e| anyhow!(e))?;
        }
        if let Some(ms) = update.progress_tick_ms {
            next.progress_tick_ms =
                validate_duration_ms("progress_tick_ms", ms).map_err(|e| anyhow!(e))?;
        }
        if let Some(value) = update.progress_max_increment {
            next.progress_max_increment =
                validate_progress_increment(value).map_err(|e| anyhow!(e))?;
        }
        if let Some(mode) = update.analysis_mode {
            next.analysis_mode = mode;
        }
        if let Some(sanitizer) = update.sanitizer {
            next.sanitizer = sanitizer;
        }
        if let Some(level) = update.log_level {
            if parse_level(&level).is_none() {
                return Err(anyhow!("无效的日志级别: {}", level));
            }
            next.log_level = level.trim().to_ascii_lowercase();
        }

        self.save(&next).await?;
        *config = next.clone();
        Ok(next)
    }

    async fn save(&self, config: &PersistedAppConfig) -> Result<()> {
        let json = serde_json::to_string_pretty(config)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}
