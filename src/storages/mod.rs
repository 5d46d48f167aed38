//! 本地持久化
//!
//! 所有落盘文件(股票池/数据集)都走临时文件+rename的原子写,
//! 避免读方看到半个文件。

pub mod datasets;
pub mod order_state;
pub mod stock_pool;

pub use datasets::{concurrency_limit, dataset_update};
pub use order_state::OrderStateStore;
pub use stock_pool::{PoolStore, StockPool, StockPoolKeeper};

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// 策略结果数据文件存储目录名
pub const STRATEGIES_PATH: &str = "quant";

/// 策略结果缓存路径
pub fn result_cache_path(root: &Path) -> PathBuf {
    root.join(STRATEGIES_PATH)
}

/// 原子写文件: 写临时文件再rename
pub fn write_file_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("创建目录{}失败", parent.display()))?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes).with_context(|| format!("写临时文件{}失败", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("重命名{} -> {}失败", tmp.display(), path.display()))?;
    Ok(())
}

/// 序列化为带表头的CSV并原子落盘
pub fn save_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row).context("序列化CSV行失败")?;
    }
    let bytes = writer.into_inner().context("取CSV缓冲失败")?;
    write_file_atomic(path, &bytes)
}

/// 读取CSV, 逐行解析, 坏行丢弃不中断
pub fn load_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("打开{}失败", path.display()))?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        match record {
            Ok(row) => rows.push(row),
            Err(e) => {
                tracing::error!("{}存在坏行, 跳过: {}", path.display(), e);
            }
        }
    }
    Ok(rows)
}
