use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info};

use super::{load_csv, save_csv};
use crate::config::StrategyParameter;
use crate::exchange::Calendar;
use crate::strategies::Strategy;
use crate::tracker::Statistics;
use crate::trader::OrderDispatcher;

/// 股票池文件名
pub const FILENAME_STOCK_POOL: &str = "stock_pool.csv";

/// 策略命中(当日首次出现)
pub const STRATEGY_HIT: u32 = 1;
/// 已存在(仅在合并过程中使用, 不落盘为独立状态)
pub const STRATEGY_ALREADY_EXISTS: u32 = 1 << 1;
/// 召回(后续扫描不再出现)
pub const STRATEGY_CANCEL: u32 = 1 << 2;
/// 已提交委托
pub const STRATEGY_ORDER_PLACED: u32 = 1 << 3;
/// 委托成功
pub const STRATEGY_ORDER_SUCCEEDED: u32 = 1 << 4;
/// 委托失败
pub const STRATEGY_ORDER_FAILED: u32 = 1 << 5;

/// 股票池条目, 身份键 (日期, 策略编码, 证券代码)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockPool {
    pub date: NaiveDate,
    pub code: String,
    pub name: String,
    pub strategy_code: u64,
    pub strategy_name: String,
    /// 信号价格
    pub buy: f64,
    /// 0=观察 1=可买入
    pub order_status: i32,
    /// 状态位图
    pub status: u32,
    pub order_id: i64,
    pub active: u16,
    pub speed: f64,
    pub create_time: String,
    pub update_time: String,
}

impl StockPool {
    pub fn key(&self) -> String {
        format!("{}/{}/{}", self.date.format("%Y-%m-%d"), self.strategy_code, self.code)
    }
}

/// 股票池文件存储, 整写整读, 临时文件+rename保证原子性
pub struct PoolStore {
    filename: PathBuf,
}

impl PoolStore {
    pub fn new(root: &Path) -> Self {
        Self {
            filename: root.join(FILENAME_STOCK_POOL),
        }
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    /// 从本地缓存加载股票池, 文件缺失视为空
    pub fn load(&self) -> Vec<StockPool> {
        if !self.filename.exists() {
            return Vec::new();
        }
        match load_csv(&self.filename) {
            Ok(list) => list,
            Err(e) => {
                error!("加载股票池失败: {}", e);
                Vec::new()
            }
        }
    }

    /// 刷新本地股票池缓存
    pub fn save(&self, list: &[StockPool]) -> anyhow::Result<()> {
        save_csv(&self.filename, list)
    }
}

/// 股票池管理
///
/// 合并+落盘+下单检查在同一把池锁内完成, 跨策略跨节拍串行,
/// 保证"合并-派发"对单次节拍是原子的。
pub struct StockPoolKeeper {
    store: PoolStore,
    calendar: Arc<Calendar>,
    dispatcher: Arc<OrderDispatcher>,
    pool_mutex: Mutex<()>,
}

impl StockPoolKeeper {
    pub fn new(store: PoolStore, calendar: Arc<Calendar>, dispatcher: Arc<OrderDispatcher>) -> Self {
        Self {
            store,
            calendar,
            dispatcher,
            pool_mutex: Mutex::new(()),
        }
    }

    /// 合并策略扫描结果到股票池, 有新增标的时触发买入检查
    ///
    /// 不变量:
    /// - 同一 (日期, 策略, 证券) 至多一条
    /// - 重复合并同一结果集不改变池内容
    /// - 结果集中消失的当日条目置Cancel位
    pub async fn merge(&self, strategy: &dyn Strategy, param: &StrategyParameter, date: NaiveDate, stats: &[Statistics]) {
        if !param.enable() || param.total == 0 {
            // 配置不存在或规则无效, 不执行交易
            return;
        }
        let _guard = self.pool_mutex.lock().await;

        let trade_date = self.calendar.fix_trade_date(date);
        let update_time = self.calendar.now().format("%Y-%m-%d %H:%M:%S%.3f").to_string();
        let mut local_pool = self.store.load();

        // 1. 扫描结果转股票池格式, 前排个股标记可买入
        let mut candidates: Vec<StockPool> = Vec::with_capacity(stats.len());
        let mut key_to_index: HashMap<String, usize> = HashMap::with_capacity(stats.len());
        for (i, v) in stats.iter().enumerate() {
            let sp = StockPool {
                date: trade_date,
                code: v.code.clone(),
                name: v.name.clone(),
                strategy_code: strategy.code(),
                strategy_name: strategy.name().to_string(),
                buy: v.price,
                order_status: if i < param.total { 1 } else { 0 },
                status: STRATEGY_HIT,
                order_id: 0,
                active: v.active,
                speed: v.speed,
                create_time: v.update_time.clone(),
                update_time: update_time.clone(),
            };
            key_to_index.insert(sp.key(), candidates.len());
            candidates.push(sp);
        }

        // 2. 处理本地已有条目: 标记已存在 / 召回
        let mut changed = false;
        for local in local_pool.iter_mut() {
            // 非当日的跳过
            if local.date != trade_date {
                continue;
            }
            if let Some(&idx) = key_to_index.get(&local.key()) {
                // 相同日期+策略+证券, 视为重复, 不再追加
                candidates[idx].status = STRATEGY_ALREADY_EXISTS;
            } else if local.status & STRATEGY_CANCEL == 0 {
                // 没找到, 做召回处理
                local.status |= STRATEGY_CANCEL;
                local.update_time = update_time.clone();
                changed = true;
            }
        }

        // 3. 提取新增标的(保持排名次序)
        let new_stocks: Vec<StockPool> = candidates
            .into_iter()
            .filter(|sp| sp.status != STRATEGY_ALREADY_EXISTS)
            .collect();

        // 4. 新增标的入池并执行买入检查
        if !new_stocks.is_empty() {
            for sp in &new_stocks {
                info!("{}[{}]: buy queue append {}", strategy.name(), strategy.code(), sp.code);
            }
            local_pool.extend(new_stocks);
            info!("检查是否需要委托下单...");
            self.dispatcher
                .check_order_for_buy(&mut local_pool, strategy, param, trade_date)
                .await;
            info!("检查是否需要委托下单...OK");
            changed = true;
        }

        // 5. 有变更才落盘, 失败只记日志, 下次合并会重写
        if changed {
            if let Err(e) = self.store.save(&local_pool) {
                error!("保存股票池失败: {}", e);
            }
        }
    }

    /// 当前池内容(测试与盘后查询用)
    pub async fn snapshot(&self) -> Vec<StockPool> {
        let _guard = self.pool_mutex.lock().await;
        self.store.load()
    }
}
