//! 跟踪循环端到端: 单策略单幸存者 / 休市跳过 / 闭市退出

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{calendar_at, make_tick, trading_calendar, MockProvider, PlainStrategy};
use tokio_util::sync::CancellationToken;
use xquant::config::{StrategyParameter, XquantConfig};
use xquant::exchange::Calendar;
use xquant::factors::{F10Store, HistoryCache, MarginTradingTargets, SecurityHistory, StrategySnapshotService, F10};
use xquant::market::{KlineBar, SnapshotCache, SnapshotSyncService};
use xquant::rules::rule_impl::register_base_rules;
use xquant::rules::RuleRegistry;
use xquant::storages::stock_pool::{STRATEGY_HIT, STRATEGY_ORDER_PLACED};
use xquant::storages::{OrderStateStore, PoolStore, StockPoolKeeper};
use xquant::strategies::StrategyRegistry;
use xquant::tracker::{SectorIndexService, TrackerService};
use xquant::trader::{OrderDispatcher, PaperBroker};

const CODE_A: &str = "sh600111"; // 价格越界, 被基础规则(kind=2)拦下
const CODE_B: &str = "sz002222"; // 全部通过
const CODE_C: &str = "sh000001"; // 指数, 扫描前剔除

struct Fixture {
    _dir: tempfile::TempDir,
    service: TrackerService,
    provider: Arc<MockProvider>,
    broker: Arc<PaperBroker>,
}

fn sample_history() -> SecurityHistory {
    let bars: Vec<KlineBar> = (1..=5)
        .map(|d| KlineBar {
            date: chrono::NaiveDate::from_ymd_opt(2025, 6, d).expect("日期"),
            open: 10.0,
            close: 10.0,
            high: 10.0,
            low: 10.0,
            volume: 240_000.0,
            amount: 2_400_000.0,
        })
        .collect();
    SecurityHistory::from_kline(&bars)
}

fn fixture(calendar: Arc<Calendar>) -> Fixture {
    let dir = tempfile::tempdir().expect("临时目录");
    let provider = Arc::new(MockProvider::new());
    let cache = Arc::new(SnapshotCache::new());
    let sync = Arc::new(SnapshotSyncService::new(
        provider.clone() as Arc<dyn xquant::market::QuotesProvider>,
        Arc::clone(&cache),
        Arc::clone(&calendar),
        1,
        3,
    ));

    // A价格50越过默认价格区间(2~30); B价格10正常
    provider.put_tick(make_tick(CODE_A, 50.0));
    provider.put_tick(make_tick(CODE_B, 10.0));

    let f10 = Arc::new(F10Store::new());
    for code in [CODE_A, CODE_B] {
        f10.put(F10 {
            security_code: code.to_string(),
            name: format!("{}名称", code),
            capital: 10.0,
            free_capital: 5.0,
        });
    }
    let history = Arc::new(HistoryCache::new());
    history.put(CODE_B, sample_history());

    let snapshots = Arc::new(StrategySnapshotService::new(
        Arc::clone(&cache),
        Arc::clone(&f10),
        Arc::clone(&history),
        Arc::clone(&calendar),
    ));

    let mut rules = RuleRegistry::new();
    register_base_rules(&mut rules).expect("注册规则");

    let strategies = Arc::new(StrategyRegistry::new());
    strategies
        .register(Arc::new(PlainStrategy::new(1, "测试策略")))
        .expect("注册策略");

    let mut param = StrategyParameter::default();
    param.code = 1;
    param.name = "测试策略".to_string();
    param.enable = true;
    param.buy_enable = true;
    param.total = 2;
    param.weight = 0.5;
    param.stocks = vec![CODE_A.to_string(), CODE_B.to_string(), CODE_C.to_string()];
    // 只卡价格, 放开其余门槛
    param.rules.open_turn_z = "0~100".parse().expect("范围");
    param.rules.open_quantity_ratio = "0~100".parse().expect("范围");
    param.rules.free_capital = "0~100".parse().expect("范围");

    let mut config = XquantConfig::default();
    config.strategies = vec![param];

    let broker = Arc::new(PaperBroker::new(1_000_000.0));
    let dispatcher = Arc::new(OrderDispatcher::new(
        broker.clone() as Arc<dyn xquant::trader::Broker>,
        OrderStateStore::new(dir.path()),
        Arc::clone(&calendar),
    ));
    let pool = Arc::new(StockPoolKeeper::new(
        PoolStore::new(dir.path()),
        Arc::clone(&calendar),
        dispatcher,
    ));

    let service = TrackerService {
        calendar,
        sync,
        snapshots,
        strategies,
        rules: Arc::new(rules),
        margin: Arc::new(MarginTradingTargets::new()),
        sectors: Arc::new(SectorIndexService::new()),
        pool: Arc::clone(&pool),
        config: Arc::new(config),
        universe: vec![CODE_A.to_string(), CODE_B.to_string()],
    };

    Fixture { _dir: dir, service, provider, broker }
}

/// S1: A被规则拦下, C被指数过滤, 只有B进池且已委托
#[tokio::test]
async fn test_one_strategy_one_survivor() {
    let f = fixture(trading_calendar());
    let cancel = CancellationToken::new();
    let pool = Arc::clone(&f.service.pool);

    let run_cancel = cancel.clone();
    let handle = tokio::spawn(async move {
        f.service.run(vec![1], false, run_cancel).await;
    });
    tokio::time::sleep(Duration::from_millis(1300)).await;
    cancel.cancel();
    handle.await.expect("跟踪任务");

    let entries = pool.snapshot().await;
    assert_eq!(entries.len(), 1, "只应有B一条: {:?}", entries);
    let entry = &entries[0];
    assert_eq!(entry.code, CODE_B);
    assert_eq!(entry.strategy_code, 1);
    assert_eq!(entry.date, common::test_date());
    assert_eq!(entry.status & STRATEGY_HIT, STRATEGY_HIT);
    assert_eq!(entry.status & STRATEGY_ORDER_PLACED, STRATEGY_ORDER_PLACED);
    assert_eq!(f.broker.orders().len(), 1);
    assert_eq!(f.broker.orders()[0].security_code, CODE_B);
}

/// S5: 休市暂停不刷新快照, 但循环不退出
#[tokio::test]
async fn test_suspend_skips_fetch() {
    // 午间休市
    let f = fixture(calendar_at(12, 0, 0));
    let cancel = CancellationToken::new();

    let run_cancel = cancel.clone();
    let provider = Arc::clone(&f.provider);
    let handle = tokio::spawn(async move {
        f.service.run(vec![1], false, run_cancel).await;
    });
    tokio::time::sleep(Duration::from_millis(1500)).await;
    // 循环应仍在运行
    assert!(!handle.is_finished());
    cancel.cancel();
    handle.await.expect("跟踪任务");
    assert_eq!(provider.snapshot_calls(), 0);
}

/// S6/会话门控: 闭市且非调试, 一个节拍内自行退出且不产生策略工作
#[tokio::test]
async fn test_closed_market_exits() {
    let f = fixture(calendar_at(20, 0, 0));
    let cancel = CancellationToken::new();
    let pool = Arc::clone(&f.service.pool);
    let provider = Arc::clone(&f.provider);

    let result = tokio::time::timeout(Duration::from_secs(3), async move {
        f.service.run(vec![1], false, cancel).await;
    })
    .await;
    assert!(result.is_ok(), "闭市后应在一个节拍内退出");
    assert_eq!(provider.snapshot_calls(), 0);
    assert!(pool.snapshot().await.is_empty());
}

/// 调试模式下闭市也继续跑
#[tokio::test]
async fn test_debug_mode_runs_when_closed() {
    let f = fixture(calendar_at(20, 0, 0));
    let cancel = CancellationToken::new();
    let provider = Arc::clone(&f.provider);

    let run_cancel = cancel.clone();
    let handle = tokio::spawn(async move {
        f.service.run(vec![1], true, run_cancel).await;
    });
    tokio::time::sleep(Duration::from_millis(1300)).await;
    assert!(!handle.is_finished());
    cancel.cancel();
    handle.await.expect("跟踪任务");
    assert!(provider.snapshot_calls() > 0);
}
