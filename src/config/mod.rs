//! 配置加载
//!
//! 配置文件按profile命名: `conf.<XQUANT_CONF_ENV>.yaml`, 默认 `conf.local.yaml`。
//! 依次在当前目录与 `~/.xquant/` 下查找; 找不到时使用内置默认值。
//! 解析失败视为致命配置错误, 由入口以非零码退出。

pub mod range;
pub mod strategy_parameter;

pub use range::{RangeError, TimeRange, TradingSession, ValueRange};
pub use strategy_parameter::{RuleParameter, StrategyParameter, TradeFlag};

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::app_config::env::conf_env;
use crate::error::AppError;

/// 定时任务开关与触发规则覆盖
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobParameter {
    pub name: String,
    pub enable: bool,
    /// 自定义触发规则, 覆盖默认cron表达式
    pub trigger: String,
}

/// 行情快照相关参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotParameter {
    /// 并发数, <=0 时按服务器数自动推导
    pub concurrency: i32,
    /// 单分片重试次数
    pub retry_times: usize,
}

impl Default for SnapshotParameter {
    fn default() -> Self {
        Self { concurrency: 0, retry_times: 3 }
    }
}

/// xquant 基础配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct XquantConfig {
    /// 缓存根路径
    pub basedir: String,
    /// 日志级别(可被 XQUANT_LOG_LEVEL 覆盖)
    pub log_level: String,
    /// 节假日表(交易日历 = 周一~周五减去节假日)
    pub holidays: Vec<NaiveDate>,
    /// 快照同步参数
    pub snapshot: SnapshotParameter,
    /// 定时任务覆盖
    pub jobs: Vec<JobParameter>,
    /// 策略参数
    pub strategies: Vec<StrategyParameter>,
}

impl Default for XquantConfig {
    fn default() -> Self {
        Self {
            basedir: "~/.xquant".to_string(),
            log_level: "info".to_string(),
            holidays: Vec::new(),
            snapshot: SnapshotParameter::default(),
            jobs: Vec::new(),
            strategies: Vec::new(),
        }
    }
}

impl XquantConfig {
    /// 按策略编码取策略参数
    pub fn strategy_parameter_by_code(&self, code: u64) -> Option<&StrategyParameter> {
        self.strategies.iter().find(|s| s.code == code)
    }

    /// 按任务名取任务覆盖配置
    pub fn job_parameter(&self, name: &str) -> Option<&JobParameter> {
        self.jobs.iter().find(|j| j.name == name)
    }

    pub fn holiday_set(&self) -> HashSet<NaiveDate> {
        self.holidays.iter().copied().collect()
    }

    /// 缓存根目录, 展开~
    pub fn root_path(&self) -> PathBuf {
        expand_home(&self.basedir)
    }
}

/// 配置文件名
pub fn conf_filename() -> String {
    format!("conf.{}.yaml", conf_env())
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

/// 加载配置
///
/// 文件缺失回落到默认配置; 文件存在但解析失败返回ConfigError(致命)。
pub fn load() -> Result<XquantConfig, AppError> {
    let filename = conf_filename();
    let candidates = [PathBuf::from(&filename), expand_home(&format!("~/.xquant/{}", filename))];
    for path in &candidates {
        if !path.exists() {
            continue;
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::ConfigError(format!("读取{}失败: {}", path.display(), e)))?;
        let config: XquantConfig = serde_yaml::from_str(&text)
            .map_err(|e| AppError::ConfigError(format!("解析{}失败: {}", path.display(), e)))?;
        tracing::debug!(
            "加载配置{}: {}",
            path.display(),
            serde_json::to_string(&config).unwrap_or_default()
        );
        return Ok(config);
    }
    warn!("配置文件{}不存在, 使用默认配置", filename);
    Ok(XquantConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_roundtrip() {
        let text = r#"
basedir: "/tmp/xquant"
log_level: debug
strategies:
  - code: 1
    name: "1号策略"
    enable: true
    buy_enable: true
    total: 2
    weight: 0.5
    session: "09:30:00~11:30:00"
    rules:
      price: "3.0~20.0"
      ignore_rule_group: [2]
"#;
        let config: XquantConfig = serde_yaml::from_str(text).expect("解析yaml");
        assert_eq!(config.basedir, "/tmp/xquant");
        let p = config.strategy_parameter_by_code(1).expect("策略1");
        assert_eq!(p.total, 2);
        assert!(p.buy_enable());
        assert!(p.rules.price.contains(10.0));
        assert!(!p.rules.price.contains(25.0));
        assert_eq!(p.rules.ignore_rule_group, vec![2]);
    }

    #[test]
    fn test_default_when_missing_fields() {
        let config: XquantConfig = serde_yaml::from_str("log_level: warn").expect("解析yaml");
        assert_eq!(config.basedir, "~/.xquant");
        assert_eq!(config.snapshot.retry_times, 3);
    }
}
