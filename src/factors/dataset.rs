use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::AppError;

/// 数据插件类型编码, 高半字节区分类别
pub type PluginKind = u64;

/// 基础数据
pub const PLUGIN_MASK_BASE_DATA: PluginKind = 0x1000000000000000;
/// 特征数据
pub const PLUGIN_MASK_FEATURE: PluginKind = 0x2000000000000000;
/// 策略数据
pub const PLUGIN_MASK_STRATEGY: PluginKind = 0x3000000000000000;

/// 数据集操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Update,
    Repair,
}

/// 数据集插件
///
/// 每个插件维护一类按证券落盘的数据。update/repair以(date, code)为粒度,
/// 由更新器在并发约束内逐证券调度。
#[async_trait]
pub trait DataSet: Send + Sync {
    fn kind(&self) -> PluginKind;
    /// 命令行关键字
    fn key(&self) -> &str;
    /// 显示名称
    fn name(&self) -> &str;
    /// 前置依赖的插件
    fn depend_on(&self) -> Vec<PluginKind> {
        Vec::new()
    }
    /// 按日期初始化(清理过期状态等), 每轮更新前调用一次
    async fn init(&self, date: NaiveDate) -> Result<()>;
    /// 数据文件路径
    fn filename(&self, date: NaiveDate, security_code: &str) -> PathBuf;
    /// 增量更新一只证券
    async fn update(&self, date: NaiveDate, security_code: &str) -> Result<()>;
    /// 修复一只证券的历史数据
    async fn repair(&self, date: NaiveDate, security_code: &str) -> Result<()>;
}

/// 数据插件注册表, kind有序
pub struct DataSetRegistry {
    plugins: Mutex<BTreeMap<PluginKind, Arc<dyn DataSet>>>,
}

impl DataSetRegistry {
    pub fn new() -> Self {
        Self {
            plugins: Mutex::new(BTreeMap::new()),
        }
    }

    /// 注册插件, kind冲突报错
    pub fn register(&self, plugin: Arc<dyn DataSet>) -> Result<(), AppError> {
        let mut guard = self.plugins.lock().expect("插件注册表锁中毒");
        let kind = plugin.kind();
        if guard.contains_key(&kind) {
            return Err(AppError::AlreadyExists(format!("数据插件kind={:#x}", kind)));
        }
        guard.insert(kind, plugin);
        Ok(())
    }

    /// 按类别掩码筛选插件, 按kind升序
    pub fn plugins(&self, mask: PluginKind) -> Vec<Arc<dyn DataSet>> {
        let guard = self.plugins.lock().expect("插件注册表锁中毒");
        guard
            .iter()
            .filter(|(kind, _)| mask == 0 || *kind & mask == mask)
            .map(|(_, plugin)| Arc::clone(plugin))
            .collect()
    }

    /// 按类别掩码+关键字筛选
    pub fn plugins_with_name(&self, mask: PluginKind, keywords: &[&str]) -> Vec<Arc<dyn DataSet>> {
        if keywords.is_empty() {
            return Vec::new();
        }
        let guard = self.plugins.lock().expect("插件注册表锁中毒");
        guard
            .iter()
            .filter(|(kind, plugin)| *kind & mask == mask && keywords.contains(&plugin.key()))
            .map(|(_, plugin)| Arc::clone(plugin))
            .collect()
    }
}

impl Default for DataSetRegistry {
    fn default() -> Self {
        Self::new()
    }
}
