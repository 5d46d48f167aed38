//! 策略框架
//!
//! 策略 = {编码, 名称, 过滤, 排序, 评估}。注册表支持高位强制覆盖:
//! 编码带 MODEL_FORCE_OVERWRITE 位注册时, 去掉标志位后覆盖同码策略,
//! 并屏蔽后续同码的普通注册。

pub mod base;
pub mod model_ma_bull;
pub mod model_no1;
pub mod model_volume;

pub use base::{chain_filters, general_filter, FilterFn};
pub use model_ma_bull::ModelMaBull;
pub use model_no1::ModelNo1;
pub use model_volume::ModelVolume;

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::RuleParameter;
use crate::error::AppError;
use crate::factors::{F10Store, HistoryCache, KlineStore, StrategySnapshotService};
use crate::rules::{RuleError, RuleRegistry};

/// 策略编码
pub type ModelKind = u64;

/// 强制覆盖标志位
pub const MODEL_FORCE_OVERWRITE: ModelKind = 1 << 63;

/// 1号策略编码
pub const MODEL_NO1: ModelKind = 1;
/// 3号策略编码
pub const MODEL_NO3: ModelKind = 3;
/// 8号策略编码
pub const MODEL_NO8: ModelKind = 8;

/// 尾盘委托
pub const ORDER_FLAG_TAIL: &str = "tail";
/// 盘中tick级委托
pub const ORDER_FLAG_TICK: &str = "tick";

/// 排序结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortedStatus {
    /// 使用默认排序
    Default,
    /// 策略未执行排序
    NotExecuted,
    /// 策略已自定义排序
    Custom,
}

/// 策略评估产出的信号
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultInfo {
    pub code: String,
    pub name: String,
    pub date: NaiveDate,
    /// 委托价格
    pub buy: f64,
    /// 目标价格
    pub sell: f64,
    /// 涨跌幅%
    pub rate: f64,
    pub strategy_code: ModelKind,
    pub strategy_name: String,
}

/// 策略评估可见的上下文服务
pub struct StrategyContext {
    pub f10: Arc<F10Store>,
    pub history: Arc<HistoryCache>,
    pub klines: Arc<KlineStore>,
    pub snapshots: Arc<StrategySnapshotService>,
}

/// 策略接口
pub trait Strategy: Send + Sync {
    fn code(&self) -> ModelKind;
    fn name(&self) -> &str;
    fn order_flag(&self) -> &str {
        ORDER_FLAG_TAIL
    }

    /// 过滤一只证券, Ok保留
    fn filter(
        &self,
        rules: &RuleRegistry,
        param: &RuleParameter,
        snapshot: &crate::factors::QuoteSnapshot,
    ) -> Result<(), RuleError>;

    /// 排序结果集; 返回Default/NotExecuted时跟踪器套用规范排序
    fn sort(&self, snapshots: &mut [crate::factors::QuoteSnapshot]) -> SortedStatus {
        let _ = snapshots;
        SortedStatus::NotExecuted
    }

    /// 评估一只证券, 满足条件时写入结果集
    fn evaluate(&self, security_code: &str, ctx: &StrategyContext, results: &mut BTreeMap<String, ResultInfo>);
}

struct RegistryInner {
    strategies: BTreeMap<ModelKind, Arc<dyn Strategy>>,
    overwritten: HashSet<ModelKind>,
}

/// 策略注册表
pub struct StrategyRegistry {
    inner: Mutex<RegistryInner>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                strategies: BTreeMap::new(),
                overwritten: HashSet::new(),
            }),
        }
    }

    /// 注册策略
    ///
    /// 编码带强制覆盖位: 去位后覆盖并记录; 已被覆盖的编码再普通注册时静默忽略。
    pub fn register(&self, strategy: Arc<dyn Strategy>) -> Result<(), AppError> {
        let mut inner = self.inner.lock().expect("策略注册表锁中毒");
        let mut code = strategy.code();
        if inner.overwritten.contains(&(code & !MODEL_FORCE_OVERWRITE)) {
            return Ok(());
        }
        if code < MODEL_FORCE_OVERWRITE {
            if inner.strategies.contains_key(&code) {
                return Err(AppError::AlreadyExists(format!("策略{}", code)));
            }
        } else {
            code &= !MODEL_FORCE_OVERWRITE;
            inner.overwritten.insert(code);
        }
        inner.strategies.insert(code, strategy);
        Ok(())
    }

    /// 按编码取出策略
    pub fn checkout_strategy(&self, code: ModelKind) -> Result<Arc<dyn Strategy>, AppError> {
        let inner = self.inner.lock().expect("策略注册表锁中毒");
        inner
            .strategies
            .get(&code)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("策略{}", code)))
    }

    /// 策略清单: "<编码>: <名称>", 按编码升序
    pub fn usage_strategy_list(&self) -> String {
        let inner = self.inner.lock().expect("策略注册表锁中毒");
        let mut usage = String::new();
        for (code, strategy) in inner.strategies.iter() {
            usage.push_str(&format!("{}: {}\n", code, strategy.name()));
        }
        usage
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("策略注册表锁中毒").strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}
