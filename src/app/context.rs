use std::sync::Arc;

use crate::config::XquantConfig;
use crate::exchange::Calendar;
use crate::factors::{DataSetRegistry, F10Store, HistoryCache, KlineStore, MarginTradingTargets, StrategySnapshotService};
use crate::market::{QuotesProvider, SnapshotCache, SnapshotSyncService};
use crate::rules::RuleRegistry;
use crate::storages::StockPoolKeeper;
use crate::strategies::{StrategyContext, StrategyRegistry};
use crate::tracker::{SectorIndexService, TrackerService};
use crate::trader::{Broker, OrderDispatcher};

/// 进程级服务集合
///
/// 所有共享状态在启动时显式装配, 不用全局单例; 测试按用例独立构建。
pub struct AppContext {
    pub config: Arc<XquantConfig>,
    pub calendar: Arc<Calendar>,
    pub provider: Arc<dyn QuotesProvider>,
    pub broker: Arc<dyn Broker>,
    pub cache: Arc<SnapshotCache>,
    pub sync: Arc<SnapshotSyncService>,
    pub f10: Arc<F10Store>,
    pub history: Arc<HistoryCache>,
    pub klines: Arc<KlineStore>,
    pub margin: Arc<MarginTradingTargets>,
    pub rules: Arc<RuleRegistry>,
    pub strategies: Arc<StrategyRegistry>,
    pub snapshots: Arc<StrategySnapshotService>,
    pub sectors: Arc<SectorIndexService>,
    pub dispatcher: Arc<OrderDispatcher>,
    pub pool: Arc<StockPoolKeeper>,
    pub datasets: Arc<DataSetRegistry>,
    /// 快照刷新的证券全集
    pub universe: Vec<String>,
}

impl AppContext {
    /// 策略评估上下文
    pub fn strategy_context(&self) -> StrategyContext {
        StrategyContext {
            f10: Arc::clone(&self.f10),
            history: Arc::clone(&self.history),
            klines: Arc::clone(&self.klines),
            snapshots: Arc::clone(&self.snapshots),
        }
    }

    /// 跟踪器服务
    pub fn tracker_service(&self) -> TrackerService {
        TrackerService {
            calendar: Arc::clone(&self.calendar),
            sync: Arc::clone(&self.sync),
            snapshots: Arc::clone(&self.snapshots),
            strategies: Arc::clone(&self.strategies),
            rules: Arc::clone(&self.rules),
            margin: Arc::clone(&self.margin),
            sectors: Arc::clone(&self.sectors),
            pool: Arc::clone(&self.pool),
            config: Arc::clone(&self.config),
            universe: self.universe.clone(),
        }
    }
}
