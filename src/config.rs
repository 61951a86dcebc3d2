//! 配置模块，负责加载JSON配置文件

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "search_filter.json";

/// 配置错误
#[derive(Debug, Error)]
#[error("配置错误: {message}")]
pub struct ConfigError {
    pub message: String,
}

impl ConfigError {
    pub fn new(message: String) -> Self {
        Self { message }
    }
}

/// 过滤器配置结构
///
/// ```json
/// {
///   "property_aliases": { "email": "EmailAddress" },
///   "max_or_conditions_for_in": 3,
///   "pretty": true
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// DSL 字段名到 API 属性名的映射
    pub property_aliases: HashMap<String, String>,
    /// OR 链中相等条件达到该数量时合并为 IN
    pub max_or_conditions_for_in: usize,
    /// 输出 JSON 时是否格式化
    pub pretty: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            property_aliases: HashMap::new(),
            max_or_conditions_for_in: 3,
            pretty: true,
        }
    }
}

impl FilterConfig {
    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();

        // 检查文件是否存在
        if !path_ref.exists() {
            return Err(ConfigError::new(format!(
                "配置文件不存在: {}",
                path_ref.display()
            )));
        }

        // 读取文件内容
        let content = fs::read_to_string(path_ref)
            .map_err(|e| ConfigError::new(format!(
                "无法读取配置文件 {}: {}",
                path_ref.display(),
                e
            )))?;

        // 解析JSON
        let config: FilterConfig = serde_json::from_str(&content)
            .map_err(|e| ConfigError::new(format!(
                "无法解析JSON配置文件 {}: {}",
                path_ref.display(),
                e
            )))?;

        debug!(
            "loaded {} property aliases from {}",
            config.property_aliases.len(),
            path_ref.display()
        );
        Ok(config)
    }
}
