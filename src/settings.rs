//! 应用设置模块
//!
//! # 设计思路
//!
//! 设置保存在一个 JSON 文件中（图床 Key、上传地址、压缩档位、表单动作地址等），
//! 再叠加环境变量覆盖，方便在部署环境中注入密钥而不落盘。
//!
//! # 实现思路
//!
//! - 文件不存在或解析失败时回退默认值，并记录警告。
//! - 环境变量覆盖通过可注入的查找函数实现，便于测试。
//! - `image_config` 将设置映射为 `ImageConfig`，档位无效时返回错误。

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::image_handler::{CompressionProfile, DEFAULT_UPLOAD_ENDPOINT, ImageConfig};

pub const SETTINGS_PATH_ENV: &str = "CUSTOMER_FORM_SETTINGS";
pub const API_KEY_ENV: &str = "IMGBB_API_KEY";
pub const ENDPOINT_ENV: &str = "IMGBB_ENDPOINT";
pub const FORM_ACTION_ENV: &str = "CUSTOMER_FORM_ACTION";

const DEFAULT_SETTINGS_FILE: &str = "customer-form.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub api_key: String,
    pub upload_endpoint: String,
    pub compression_profile: String,
    pub form_action_url: Option<String>,
    pub auto_upload: bool,
    pub max_file_size: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            upload_endpoint: DEFAULT_UPLOAD_ENDPOINT.to_string(),
            compression_profile: "balanced".to_string(),
            form_action_url: None,
            auto_upload: true,
            max_file_size: ImageConfig::default().max_file_size,
        }
    }
}

impl AppSettings {
    /// 映射为图片流水线配置。
    pub fn image_config(&self) -> Result<ImageConfig, AppError> {
        let mut config = ImageConfig::default();
        config.apply_compression_profile(CompressionProfile::from_str(&self.compression_profile)?);

        if !self.upload_endpoint.trim().is_empty() {
            config.upload_endpoint = self.upload_endpoint.trim().to_string();
        }
        config.api_key = self.api_key.trim().to_string();

        if self.max_file_size == 0 {
            return Err(AppError::Settings("max_file_size 必须大于 0".to_string()));
        }
        config.max_file_size = self.max_file_size;

        Ok(config)
    }
}

/// 设置文件路径：环境变量优先，否则为当前目录下的默认文件名。
pub fn settings_file_path() -> PathBuf {
    std::env::var(SETTINGS_PATH_ENV)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE))
}

fn load_settings_from_path(path: &Path) -> AppSettings {
    if !path.exists() {
        return AppSettings::default();
    }

    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(err) => {
                log::warn!("⚠️ 解析设置文件失败，使用默认设置: {} ({})", path.display(), err);
                AppSettings::default()
            }
        },
        Err(err) => {
            log::warn!("⚠️ 读取设置文件失败，使用默认设置: {} ({})", path.display(), err);
            AppSettings::default()
        }
    }
}

pub fn save_settings_to_path(path: &Path, settings: &AppSettings) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(settings)?;
    fs::write(path, content)?;
    Ok(())
}

fn apply_env_overrides<F>(mut settings: AppSettings, lookup: F) -> AppSettings
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(key) = non_empty(API_KEY_ENV) {
        settings.api_key = key;
    }
    if let Some(endpoint) = non_empty(ENDPOINT_ENV) {
        settings.upload_endpoint = endpoint;
    }
    if let Some(action) = non_empty(FORM_ACTION_ENV) {
        settings.form_action_url = Some(action);
    }

    settings
}

/// 读取设置文件并叠加环境变量覆盖。
pub fn load_settings(path: &Path) -> AppSettings {
    let settings = load_settings_from_path(path);
    apply_env_overrides(settings, |key| std::env::var(key).ok())
}
