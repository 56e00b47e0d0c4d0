//! 设置持久化
//!
//! settings.json 保存模型ID、并发数、模板库和加密后的 API 密钥。
//! 加载时解密（"解锁"）API 密钥，解密失败会直接向调用方报错，
//! 批处理不会启动。

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::credential::CredentialStore;
use crate::template::TemplateStore;

/// settings.json 的磁盘结构，`api_key` 为加密形式
#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    api_key: String,
    #[serde(default)]
    model_id: Option<String>,
    #[serde(default)]
    max_workers: Option<usize>,
    #[serde(default)]
    prompt_templates: BTreeMap<String, String>,
    #[serde(default)]
    current_template_name: Option<String>,
}

/// 运行期设置，API 密钥为内存中的明文
pub struct Settings {
    pub api_key: String,
    pub model_id: String,
    pub max_workers: usize,
    pub templates: TemplateStore,
}

// 不派生 Debug：明文密钥不进入任何输出
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &"<已隐藏>")
            .field("model_id", &self.model_id)
            .field("max_workers", &self.max_workers)
            .field("active_template", &self.templates.active_name())
            .finish()
    }
}

impl Settings {
    /// 按配置构造默认设置（设置文件不存在时）
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_key: config.ark_api_key.clone(),
            model_id: config.model_id.clone(),
            max_workers: config.max_workers,
            templates: TemplateStore::default(),
        }
    }

    /// 加载设置并解锁 API 密钥
    ///
    /// 设置文件不存在时返回配置默认值；存在但密钥无法解密时报错。
    /// 环境变量提供的密钥优先于设置文件中保存的密钥。
    pub fn load(path: &Path, credentials: &CredentialStore, config: &Config) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::from_config(config));
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("读取设置文件失败: {}", path.display()))?;
        let file: SettingsFile =
            serde_json::from_str(&raw).with_context(|| "设置文件格式无效")?;

        let saved_key = credentials
            .decrypt(&file.api_key)
            .context("解锁 API 密钥失败")?;
        let api_key = if config.ark_api_key.is_empty() {
            saved_key
        } else {
            config.ark_api_key.clone()
        };

        Ok(Self {
            api_key,
            model_id: file.model_id.unwrap_or_else(|| config.model_id.clone()),
            max_workers: file.max_workers.unwrap_or(config.max_workers),
            templates: TemplateStore::from_saved(file.prompt_templates, file.current_template_name),
        })
    }

    /// 保存设置，API 密钥加密后写入
    pub fn save(&self, path: &Path, credentials: &CredentialStore) -> Result<()> {
        let file = SettingsFile {
            api_key: credentials.encrypt(&self.api_key).context("加密 API 密钥失败")?,
            model_id: Some(self.model_id.clone()),
            max_workers: Some(self.max_workers),
            prompt_templates: self.templates.templates().clone(),
            current_template_name: Some(self.templates.active_name().to_string()),
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(path, json)
            .with_context(|| format!("写入设置文件失败: {}", path.display()))?;
        Ok(())
    }
}
