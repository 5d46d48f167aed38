use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{error, info};

use super::{QuotesProvider, SnapshotCache, SnapshotTick};
use crate::exchange::Calendar;

/// 单次快照请求的证券数上限(行情协议约束)
pub const SECURITY_QUOTES_MAX: usize = 80;
/// 默认重试次数
pub const DEFAULT_RETRY_TIMES: usize = 3;
/// 快照同步的最小并发
pub const DEFAULT_MINIMUM_CONCURRENCY: usize = 4;

/// 快照批量同步
///
/// 把证券列表切成分片, 由固定数量worker带重试拉取,
/// 全部完成后一次性put_batch进缓存。单分片重试耗尽只影响该分片,
/// 对应证券保留旧值, 不向调用方冒错。
pub struct SnapshotSyncService {
    provider: Arc<dyn QuotesProvider>,
    cache: Arc<SnapshotCache>,
    calendar: Arc<Calendar>,
    /// 配置并发数, <=0 时按服务器数自动推导
    concurrency: i32,
    retry_times: usize,
}

impl SnapshotSyncService {
    pub fn new(
        provider: Arc<dyn QuotesProvider>,
        cache: Arc<SnapshotCache>,
        calendar: Arc<Calendar>,
        concurrency: i32,
        retry_times: usize,
    ) -> Self {
        let retry_times = if retry_times == 0 { DEFAULT_RETRY_TIMES } else { retry_times };
        Self { provider, cache, calendar, concurrency, retry_times }
    }

    /// 计算并发数: 配置优先, 否则服务器数的一半且不低于下限
    fn parallel_count(&self) -> usize {
        if self.concurrency > 0 {
            return self.concurrency as usize;
        }
        let count = self.provider.num_servers() / 2;
        count.max(DEFAULT_MINIMUM_CONCURRENCY)
    }

    /// 同步全部证券的快照到缓存
    pub async fn sync_all_snapshots(&self, codes: &[String]) {
        if codes.is_empty() {
            return;
        }
        let chunks: Vec<Vec<String>> = codes
            .chunks(SECURITY_QUOTES_MAX)
            .map(|c| c.to_vec())
            .collect();
        let chunks = Arc::new(chunks);
        let cursor = Arc::new(AtomicUsize::new(0));
        let current_date = self.calendar.current_trade_date();
        let parallel_count = self.parallel_count();

        let mut workers = Vec::with_capacity(parallel_count);
        for worker_id in 0..parallel_count {
            let provider = Arc::clone(&self.provider);
            let chunks = Arc::clone(&chunks);
            let cursor = Arc::clone(&cursor);
            let retry_times = self.retry_times;
            workers.push(tokio::spawn(async move {
                let mut local: Vec<SnapshotTick> = Vec::new();
                loop {
                    let index = cursor.fetch_add(1, Ordering::SeqCst);
                    if index >= chunks.len() {
                        break;
                    }
                    let sub_codes = &chunks[index];
                    let mut fetched: Option<Vec<SnapshotTick>> = None;
                    for retry in 0..retry_times {
                        match provider.get_snapshot(sub_codes).await {
                            Ok(list) => {
                                fetched = Some(list);
                                break;
                            }
                            Err(e) => {
                                error!(
                                    "worker[{}] 网络异常: {}, 重试: {}/{}",
                                    worker_id,
                                    e,
                                    retry + 1,
                                    retry_times
                                );
                            }
                        }
                    }
                    // 重试耗尽放弃该分片, 对应证券保留旧值
                    let Some(mut list) = fetched else { continue };
                    for tick in list.iter_mut() {
                        // 修订日期为当前交易日
                        tick.date = current_date;
                    }
                    local.append(&mut list);
                }
                local
            }));
        }

        let mut all_snapshots: Vec<SnapshotTick> = Vec::new();
        for worker in workers {
            match worker.await {
                Ok(mut list) => all_snapshots.append(&mut list),
                Err(e) => error!("快照worker异常退出: {}", e),
            }
        }

        let count = all_snapshots.len();
        self.cache.put_batch(all_snapshots);
        info!("同步快照完成, 共{}条", count);
    }
}
