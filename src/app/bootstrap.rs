use std::sync::Arc;

use anyhow::anyhow;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::context::AppContext;
use crate::config::XquantConfig;
use crate::error::AppError;
use crate::exchange::{self, Calendar};
use crate::factors::dataset_impl::{DataKLine, DataMinutes, DataReport, DataTrans, DataXdxr, FeatureF10, FeatureHistory};
use crate::factors::{DataSetRegistry, F10Store, HistoryCache, KlineStore, MarginTradingTargets, OpKind, StrategySnapshotService};
use crate::market::{QuotesProvider, SnapshotCache, SnapshotSyncService};
use crate::rules::rule_impl::register_base_rules;
use crate::rules::RuleRegistry;
use crate::storages::{self, OrderStateStore, PoolStore, StockPoolKeeper};
use crate::strategies::{ModelMaBull, ModelNo1, ModelVolume, StrategyRegistry};
use crate::tasks::{self, TaskService};
use crate::tracker::SectorIndexService;
use crate::trader::{Broker, OrderDispatcher};

/// 接入行情数据源与交易通道
///
/// 行情网关与券商接口在部署侧实现并通过环境变量选择;
/// 内置 replay/paper 组合供调试联调。未接入视为不可恢复的启动失败。
pub fn connect_gateways(
    config: &XquantConfig,
) -> Result<(Arc<dyn QuotesProvider>, Arc<dyn Broker>), AppError> {
    let datasource = crate::app_config::env::env_or_default("XQUANT_DATASOURCE", "replay");
    let provider: Arc<dyn QuotesProvider> = match datasource.as_str() {
        "replay" => Arc::new(crate::market::LocalReplayProvider::new(config.root_path())),
        other => {
            return Err(AppError::ConfigError(format!(
                "未知行情数据源: {}, 请在部署侧装配对应的QuotesProvider实现",
                other
            )))
        }
    };
    let broker_kind = crate::app_config::env::env_or_default("XQUANT_BROKER", "paper");
    let broker: Arc<dyn Broker> = match broker_kind.as_str() {
        "paper" => {
            let init_funds = crate::app_config::env::env_or_default("XQUANT_PAPER_FUNDS", "1000000");
            let init_funds: f64 = init_funds
                .parse()
                .map_err(|_| AppError::ConfigError(format!("XQUANT_PAPER_FUNDS非法: {}", init_funds)))?;
            Arc::new(crate::trader::PaperBroker::new(init_funds))
        }
        other => {
            return Err(AppError::ConfigError(format!(
                "未知交易通道: {}, 请在部署侧装配对应的Broker实现",
                other
            )))
        }
    };
    Ok((provider, broker))
}

/// 装配进程级服务
///
/// 注册阶段在此显式完成(规则/策略/数据插件), 顺序即覆盖语义的顺序。
pub fn build_context(
    config: XquantConfig,
    provider: Arc<dyn QuotesProvider>,
    broker: Arc<dyn Broker>,
) -> Result<AppContext, AppError> {
    let config = Arc::new(config);
    let root = config.root_path();
    let result_path = storages::result_cache_path(&root);

    let calendar = Arc::new(Calendar::with_system_clock(config.holiday_set()));
    let cache = Arc::new(SnapshotCache::new());
    let sync = Arc::new(SnapshotSyncService::new(
        Arc::clone(&provider),
        Arc::clone(&cache),
        Arc::clone(&calendar),
        config.snapshot.concurrency,
        config.snapshot.retry_times,
    ));

    let f10 = Arc::new(F10Store::new());
    let history = Arc::new(HistoryCache::new());
    let klines = Arc::new(KlineStore::new(root.clone()));
    let margin = Arc::new(MarginTradingTargets::new());
    let snapshots = Arc::new(StrategySnapshotService::new(
        Arc::clone(&cache),
        Arc::clone(&f10),
        Arc::clone(&history),
        Arc::clone(&calendar),
    ));

    // 注册阶段: 规则
    let mut rules = RuleRegistry::new();
    register_base_rules(&mut rules)?;
    let rules = Arc::new(rules);

    // 注册阶段: 策略
    let strategies = Arc::new(StrategyRegistry::new());
    strategies.register(Arc::new(ModelNo1))?;
    strategies.register(Arc::new(ModelMaBull))?;
    strategies.register(Arc::new(ModelVolume))?;

    // 注册阶段: 数据插件
    let datasets = Arc::new(DataSetRegistry::new());
    datasets.register(Arc::new(DataKLine::new(Arc::clone(&provider), root.clone())))?;
    datasets.register(Arc::new(DataXdxr::new(Arc::clone(&provider), root.clone())))?;
    datasets.register(Arc::new(DataTrans::new(Arc::clone(&provider), root.clone())))?;
    datasets.register(Arc::new(DataMinutes::new(Arc::clone(&provider), root.clone())))?;
    datasets.register(Arc::new(DataReport::new(Arc::clone(&provider), root.clone())))?;
    datasets.register(Arc::new(FeatureF10::new(Arc::clone(&provider), root.clone(), Arc::clone(&f10))))?;
    datasets.register(Arc::new(FeatureHistory::new(root.clone(), Arc::clone(&history))))?;

    let sectors = Arc::new(SectorIndexService::new());
    let dispatcher = Arc::new(OrderDispatcher::new(
        Arc::clone(&broker),
        OrderStateStore::new(&result_path),
        Arc::clone(&calendar),
    ));
    let pool = Arc::new(StockPoolKeeper::new(
        PoolStore::new(&result_path),
        Arc::clone(&calendar),
        Arc::clone(&dispatcher),
    ));

    let universe = exchange::get_stock_code_list();

    Ok(AppContext {
        config,
        calendar,
        provider,
        broker,
        cache,
        sync,
        f10,
        history,
        klines,
        margin,
        rules,
        strategies,
        snapshots,
        sectors,
        dispatcher,
        pool,
        datasets,
        universe,
    })
}

/// 盘中跟踪入口: 调度器 + 跟踪循环 + 信号处理
pub async fn run_tracker(ctx: Arc<AppContext>, strategy_codes: Vec<u64>, is_debug: bool) -> anyhow::Result<()> {
    let task_service = Arc::new(TaskService::new(Arc::clone(&ctx.config)).await?);
    tasks::jobs::register_core_jobs(&task_service, Arc::clone(&ctx)).await?;
    task_service.start().await?;

    let cancel = CancellationToken::new();
    let tracker = ctx.tracker_service();
    let tracker_cancel = cancel.clone();
    let tracker_handle = tokio::spawn(async move {
        tracker.run(strategy_codes, is_debug, tracker_cancel).await;
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("收到退出信号, 开始优雅关闭...");
            cancel.cancel();
        }
        _ = cancel.cancelled() => {
            info!("跟踪循环已结束");
        }
    }
    if let Err(e) = tracker_handle.await {
        error!("跟踪任务异常退出: {}", e);
    }
    task_service.shutdown().await;
    info!("应用已优雅退出");
    Ok(())
}

/// 盘后选股入口: 同步一次快照后逐策略评估并落盘信号
pub async fn run_scan(ctx: Arc<AppContext>, strategy_codes: Vec<u64>) -> anyhow::Result<()> {
    ctx.sync.sync_all_snapshots(&ctx.universe).await;
    let date = ctx.calendar.current_trade_date();
    let result_path = storages::result_cache_path(&ctx.config.root_path());
    let strategy_ctx = ctx.strategy_context();
    for code in strategy_codes {
        let strategy = match ctx.strategies.checkout_strategy(code) {
            Ok(s) => s,
            Err(e) => {
                error!("{}", e);
                continue;
            }
        };
        let Some(param) = ctx.config.strategy_parameter_by_code(code) else {
            error!("策略{}无参数配置", code);
            continue;
        };
        let signals = crate::tracker::execute_strategy(strategy.as_ref(), param, &strategy_ctx);
        for signal in &signals {
            println!(
                "{} {} {} buy={:.2} sell={:.2} [{}]",
                signal.date, signal.code, signal.name, signal.buy, signal.sell, signal.strategy_name
            );
        }
        crate::tracker::save_signals(&result_path, code, date, &signals);
    }
    Ok(())
}

/// 数据更新入口
pub async fn run_update(ctx: Arc<AppContext>, op: OpKind, keywords: Vec<String>) -> anyhow::Result<()> {
    let date = ctx.calendar.current_trade_date();
    let plugins = if keywords.is_empty() {
        ctx.datasets.plugins(0)
    } else {
        let refs: Vec<&str> = keywords.iter().map(|s| s.as_str()).collect();
        let mut list = ctx.datasets.plugins_with_name(crate::factors::PLUGIN_MASK_BASE_DATA, &refs);
        list.extend(ctx.datasets.plugins_with_name(crate::factors::PLUGIN_MASK_FEATURE, &refs));
        list
    };
    if plugins.is_empty() {
        return Err(anyhow!("没有匹配的数据插件: {:?}", keywords));
    }
    storages::dataset_update(date, &ctx.universe, &plugins, op).await;
    Ok(())
}
