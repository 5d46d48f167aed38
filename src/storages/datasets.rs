use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::factors::{DataSet, OpKind};

/// 每个数据集处理证券时的并发上限
///
/// IO密集, 取3倍核数并夹在[20, 100]。
pub fn concurrency_limit() -> usize {
    let cpu_count = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
    (cpu_count * 3).clamp(20, 100)
}

fn module_name(op: OpKind) -> &'static str {
    match op {
        OpKind::Repair => "修复基础数据",
        OpKind::Update => "更新基础数据",
    }
}

/// 更新或修复一批数据集
///
/// 数据集间并行; 数据集内逐证券在信号量约束下并行。
/// 单证券任务的panic被捕获记日志, 其余证券继续。
pub async fn dataset_update(date: NaiveDate, codes: &[String], plugins: &[Arc<dyn DataSet>], op: OpKind) {
    if plugins.is_empty() {
        info!("{}: 没有找到可用的数据集插件", module_name(op));
        return;
    }
    info!("{}: all, begin", module_name(op));
    let total_done = Arc::new(AtomicUsize::new(0));
    let dataset_count = plugins.len();

    let mut dataset_handles = Vec::with_capacity(dataset_count);
    for plugin in plugins {
        let plugin = Arc::clone(plugin);
        let codes = codes.to_vec();
        let total_done = Arc::clone(&total_done);
        dataset_handles.push(tokio::spawn(async move {
            update_one_dataset(plugin, date, &codes, op).await;
            let done = total_done.fetch_add(1, Ordering::SeqCst) + 1;
            info!("{}: 数据集进度 {}/{}", module_name(op), done, dataset_count);
        }));
    }
    for handle in dataset_handles {
        if let Err(e) = handle.await {
            error!("数据集任务异常退出: {}", e);
        }
    }
    info!("{}: all, end", module_name(op));
}

/// 更新单个数据集
async fn update_one_dataset(plugin: Arc<dyn DataSet>, date: NaiveDate, codes: &[String], op: OpKind) {
    let name = plugin.name().to_string();
    info!("{}: {}, begin", module_name(op), name);
    if let Err(e) = plugin.init(date).await {
        error!("{}: {} 初始化失败: {}", module_name(op), name, e);
        return;
    }

    let semaphore = Arc::new(Semaphore::new(concurrency_limit()));
    let progress = Arc::new(AtomicUsize::new(0));
    let count = codes.len();

    let mut handles = Vec::with_capacity(count);
    for code in codes {
        let plugin = Arc::clone(&plugin);
        let semaphore = Arc::clone(&semaphore);
        let progress = Arc::clone(&progress);
        let security_code = code.clone();
        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire().await.expect("信号量已关闭");
            let result = match op {
                OpKind::Update => plugin.update(date, &security_code).await,
                OpKind::Repair => plugin.repair(date, &security_code).await,
            };
            if let Err(e) = result {
                error!("{}[{}]: date={} 失败: {}", plugin.name(), security_code, date, e);
            }
            let done = progress.fetch_add(1, Ordering::SeqCst) + 1;
            // 每1000只输出一次进度
            if done % 1000 == 0 || done == count {
                info!("{}: 进度 {}/{}", plugin.name(), done, count);
            }
        }));
    }
    for handle in handles {
        if let Err(e) = handle.await {
            // 单证券任务的panic在此被隔离
            error!("{}: 单证券任务异常: {}", name, e);
        }
    }
    info!("{}: {}, end", module_name(op), name);
}
