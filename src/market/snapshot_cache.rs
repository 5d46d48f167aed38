use std::collections::HashMap;
use std::sync::RwLock;

use super::SnapshotTick;

/// 内存快照缓存: 证券代码 -> 最新tick
///
/// 读多写少。get返回副本, 避免外部持有共享引用;
/// put_batch在一次写锁内整体合并, 读方要么看到整批要么一条都看不到。
pub struct SnapshotCache {
    cache: RwLock<HashMap<String, SnapshotTick>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// 获取指定证券的快照副本
    pub fn get(&self, security_code: &str) -> Option<SnapshotTick> {
        let guard = self.cache.read().expect("快照缓存读锁中毒");
        guard.get(security_code).cloned()
    }

    /// 存入单条快照
    pub fn put(&self, snapshot: SnapshotTick) {
        let mut guard = self.cache.write().expect("快照缓存写锁中毒");
        guard.insert(snapshot.security_code.clone(), snapshot);
    }

    /// 批量合并: 批内条目整体覆盖同码旧值, 批外条目保持不变
    pub fn put_batch(&self, snapshots: Vec<SnapshotTick>) {
        if snapshots.is_empty() {
            return;
        }
        let mut guard = self.cache.write().expect("快照缓存写锁中毒");
        for snapshot in snapshots {
            guard.insert(snapshot.security_code.clone(), snapshot);
        }
    }

    pub fn size(&self) -> usize {
        let guard = self.cache.read().expect("快照缓存读锁中毒");
        guard.len()
    }

    pub fn clear(&self) {
        let mut guard = self.cache.write().expect("快照缓存写锁中毒");
        guard.clear();
    }
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new()
    }
}
