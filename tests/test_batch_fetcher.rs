//! 批量快照同步: 重试与部分失败语义

mod common;

use std::sync::Arc;

use common::{make_tick, trading_calendar, MockProvider};
use xquant::market::{SnapshotCache, SnapshotSyncService};

fn codes(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("sh60{:04}", i)).collect()
}

/// 供应商抖动: 失败两次后成功, 缓存最终拿到新值
#[tokio::test]
async fn test_retry_then_success() {
    let provider = Arc::new(MockProvider::new());
    let cache = Arc::new(SnapshotCache::new());
    let calendar = trading_calendar();

    let universe = codes(10);
    for code in &universe {
        provider.put_tick(make_tick(code, 2.0));
        cache.put(make_tick(code, 1.0));
    }
    provider.set_fail_first(2);

    let sync = SnapshotSyncService::new(
        provider.clone() as Arc<dyn xquant::market::QuotesProvider>,
        Arc::clone(&cache),
        calendar,
        1, // 单worker, 保证两次失败都落在同一分片上
        3,
    );
    sync.sync_all_snapshots(&universe).await;

    for code in &universe {
        assert_eq!(cache.get(code).expect("读快照").price, 2.0);
    }
    // 2次失败 + 1次成功
    assert_eq!(provider.snapshot_calls(), 3);
}

/// 重试耗尽的分片放弃, 其余分片正常更新, 旧值保留
#[tokio::test]
async fn test_failed_chunk_keeps_stale_values() {
    let provider = Arc::new(MockProvider::new());
    let cache = Arc::new(SnapshotCache::new());
    let calendar = trading_calendar();

    // 100只 -> 2个分片(80+20); 让第二分片的代码永远失败
    let universe = codes(100);
    for code in &universe {
        provider.put_tick(make_tick(code, 2.0));
        cache.put(make_tick(code, 1.0));
    }
    provider.always_fail_for(&universe[99]);

    let sync = SnapshotSyncService::new(
        provider as Arc<dyn xquant::market::QuotesProvider>,
        Arc::clone(&cache),
        calendar,
        2,
        3,
    );
    sync.sync_all_snapshots(&universe).await;

    // 第一分片(前80)更新为新值
    for code in &universe[..80] {
        assert_eq!(cache.get(code).expect("读快照").price, 2.0);
    }
    // 第二分片保留旧值
    for code in &universe[80..] {
        assert_eq!(cache.get(code).expect("读快照").price, 1.0);
    }
}

/// 快照被打上当前交易日
#[tokio::test]
async fn test_ticks_tagged_with_trade_date() {
    let provider = Arc::new(MockProvider::new());
    let cache = Arc::new(SnapshotCache::new());
    let calendar = trading_calendar();

    let mut tick = make_tick("sh600000", 10.0);
    // 数据源给了错的日期, 同步时修正
    tick.date = chrono::NaiveDate::from_ymd_opt(2020, 1, 1).expect("日期");
    provider.put_tick(tick);

    let sync = SnapshotSyncService::new(
        provider as Arc<dyn xquant::market::QuotesProvider>,
        Arc::clone(&cache),
        Arc::clone(&calendar),
        1,
        3,
    );
    sync.sync_all_snapshots(&["sh600000".to_string()]).await;

    assert_eq!(cache.get("sh600000").expect("读快照").date, calendar.current_trade_date());
}
