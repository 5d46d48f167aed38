//! 盘中跟踪
//!
//! 1秒节拍循环: 会话门控 -> 刷新快照缓存 -> 策略并行扇出 ->
//! 过滤/排序/统计 -> 股票池合并(内含下单检查)。
//! 单策略任务内的panic被隔离, 不影响同节拍的其他策略与后续节拍。

pub mod executor;
pub mod sector;
pub mod statistics;

pub use executor::{execute_strategy, save_signals};
pub use sector::{BlockInfo, SectorIndex, SectorIndexService};
pub use statistics::{build_statistics, calculate_win_rate, render_console_table, Statistics};

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{StrategyParameter, XquantConfig};
use crate::exchange::{assert_index_by_security_code, correct_security_code, Calendar, ExchangeStatus};
use crate::factors::{MarginTradingTargets, QuoteSnapshot, StrategySnapshotService};
use crate::market::SnapshotSyncService;
use crate::rules::RuleRegistry;
use crate::storages::StockPoolKeeper;
use crate::strategies::{SortedStatus, Strategy, StrategyRegistry};

/// 跟踪器依赖的服务集合, 启动时装配
pub struct TrackerService {
    pub calendar: Arc<Calendar>,
    pub sync: Arc<SnapshotSyncService>,
    pub snapshots: Arc<StrategySnapshotService>,
    pub strategies: Arc<StrategyRegistry>,
    pub rules: Arc<RuleRegistry>,
    pub margin: Arc<MarginTradingTargets>,
    pub sectors: Arc<SectorIndexService>,
    pub pool: Arc<StockPoolKeeper>,
    pub config: Arc<XquantConfig>,
    /// 快照刷新的证券全集
    pub universe: Vec<String>,
}

impl TrackerService {
    /// 盘中跟踪主循环
    ///
    /// 非实时窗口且非调试时取消并退出; Suspend跳过本节拍。
    pub async fn run(&self, strategy_codes: Vec<u64>, is_debug: bool, cancel: CancellationToken) {
        if strategy_codes.is_empty() {
            warn!("未指定跟踪的策略代码, 终止跟踪");
            return;
        }
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("收到退出信号, 停止跟踪");
                    return;
                }
                _ = ticker.tick() => {
                    self.execute_single_track(&strategy_codes, is_debug, &cancel).await;
                }
            }
        }
    }

    /// 执行单次跟踪
    async fn execute_single_track(&self, strategy_codes: &[u64], is_debug: bool, cancel: &CancellationToken) {
        let (update_in_realtime, status) = self.calendar.can_update_in_realtime();
        let is_allowed = update_in_realtime
            && (status == ExchangeStatus::Trading || status == ExchangeStatus::Suspend);

        // 非交易时段且非调试: 取消循环
        if !is_allowed && !is_debug {
            info!("非交易时段(状态: {:?})且未开启调试模式, 停止跟踪", status);
            cancel.cancel();
            return;
        }
        // 休市暂停: 跳过本节拍, 不刷新快照
        if status == ExchangeStatus::Suspend {
            debug!("休市暂停, 跳过本次跟踪");
            return;
        }

        // 刷新快照缓存, 同一节拍内所有策略看到同一代快照
        self.sync.sync_all_snapshots(&self.universe).await;

        // 策略并行扇出, 节拍间串行
        let mut handles = Vec::with_capacity(strategy_codes.len());
        for &code in strategy_codes {
            let strategy = match self.strategies.checkout_strategy(code) {
                Ok(s) => s,
                Err(_) => continue,
            };
            let Some(param) = self.config.strategy_parameter_by_code(code).cloned() else {
                continue;
            };
            // 非交易时段的策略跳过(调试模式除外)
            if !param.session.is_trading(self.calendar.now().time()) && !is_debug {
                continue;
            }
            let service = self.clone_for_task();
            handles.push(tokio::spawn(async move {
                service.process_strategy(strategy.as_ref(), &param).await;
            }));
        }
        for handle in handles {
            if let Err(e) = handle.await {
                // 单策略任务的panic在此被隔离
                error!("策略任务异常退出: {}", e);
            }
        }
    }

    fn clone_for_task(&self) -> TrackerTask {
        TrackerTask {
            calendar: Arc::clone(&self.calendar),
            snapshots: Arc::clone(&self.snapshots),
            rules: Arc::clone(&self.rules),
            margin: Arc::clone(&self.margin),
            sectors: Arc::clone(&self.sectors),
            pool: Arc::clone(&self.pool),
        }
    }
}

/// 单策略任务的执行体
struct TrackerTask {
    calendar: Arc<Calendar>,
    snapshots: Arc<StrategySnapshotService>,
    rules: Arc<RuleRegistry>,
    margin: Arc<MarginTradingTargets>,
    sectors: Arc<SectorIndexService>,
    pool: Arc<StockPoolKeeper>,
}

impl TrackerTask {
    /// 全市场扫描一个策略
    async fn process_strategy(&self, strategy: &dyn Strategy, param: &StrategyParameter) {
        // 1. 证券候选: 剔除指数, 统一代码形态
        let stock_codes: Vec<String> = param
            .stock_list()
            .into_iter()
            .map(|c| correct_security_code(&c))
            .filter(|c| !assert_index_by_security_code(c))
            .collect();
        if stock_codes.is_empty() {
            return;
        }

        // 2. 取增强快照
        let mut stock_snapshots: Vec<QuoteSnapshot> = Vec::new();
        for code in &stock_codes {
            // 剔除两融: 开关打开时跳过两融标的; 名单为空则不做剔除
            if param.ignore_margin_trading && !self.margin.is_empty() && self.margin.contains(code) {
                continue;
            }
            if let Some(snapshot) = self.snapshots.get_strategy_snapshot(code) {
                stock_snapshots.push(snapshot);
            }
        }
        if stock_snapshots.is_empty() {
            return;
        }

        // 3. 过滤不符合条件的个股
        stock_snapshots.retain(|snapshot| strategy.filter(&self.rules, &param.rules, snapshot).is_ok());
        if stock_snapshots.is_empty() {
            return;
        }

        // 4. 结果集排序, 策略未排序时套用规范排序
        let sorted_status = strategy.sort(&mut stock_snapshots);
        if sorted_status == SortedStatus::Default || sorted_status == SortedStatus::NotExecuted {
            canonical_sort(&mut stock_snapshots);
        }

        // 5. 统计 -> 表格 -> 股票池合并与下单检查
        let (current_date, update_time) = self.current_trade_date_and_time();
        let stats = build_statistics(&stock_snapshots, current_date, &update_time, &self.sectors.snapshot());
        render_console_table(&stats, current_date, &update_time);
        self.pool.merge(strategy, param, current_date, &stats).await;
    }

    /// 当前交易日与更新时间(盘中用当前时刻, 否则定格收盘)
    fn current_trade_date_and_time(&self) -> (chrono::NaiveDate, String) {
        let current_date = self.calendar.current_trade_date();
        let now = self.calendar.now();
        let update_time = if self.calendar.currently_trading() {
            now.format("%H:%M:%S").to_string()
        } else {
            "15:00:59".to_string()
        };
        (current_date, update_time)
    }
}

/// 规范排序: 开盘换手Z降序, 开盘涨幅降序打平
pub fn canonical_sort(snapshots: &mut [QuoteSnapshot]) {
    snapshots.sort_by(|a, b| {
        b.open_turn_z
            .partial_cmp(&a.open_turn_z)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                b.opening_change_rate
                    .partial_cmp(&a.opening_change_rate)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });
}
