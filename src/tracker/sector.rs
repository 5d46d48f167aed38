use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// 板块行情摘要
#[derive(Debug, Clone, Default)]
pub struct BlockInfo {
    pub code: String,
    pub name: String,
    pub change_rate: f64,
    /// 板块涨幅排名
    pub rank: usize,
    pub top_code: String,
    pub top_name: String,
    pub top_rate: f64,
    pub limit_up_num: usize,
    pub count: usize,
}

/// 板块索引快照, 发布后只读
#[derive(Debug, Default)]
pub struct SectorIndex {
    blocks: HashMap<String, BlockInfo>,
    stock_to_block: HashMap<String, Vec<String>>,
    stock_to_rank: HashMap<String, usize>,
}

impl SectorIndex {
    pub fn new(
        blocks: HashMap<String, BlockInfo>,
        stock_to_block: HashMap<String, Vec<String>>,
        stock_to_rank: HashMap<String, usize>,
    ) -> Self {
        Self { blocks, stock_to_block, stock_to_rank }
    }

    pub fn block(&self, block_code: &str) -> Option<&BlockInfo> {
        self.blocks.get(block_code)
    }

    /// 个股归属的板块(按相关度排序)
    pub fn blocks_of_stock(&self, security_code: &str) -> Option<&Vec<String>> {
        self.stock_to_block.get(security_code)
    }

    /// 个股在板块内的排名
    pub fn rank_of_stock(&self, security_code: &str) -> Option<usize> {
        self.stock_to_rank.get(security_code).copied()
    }
}

/// 板块索引服务
///
/// 单写者(板块扫描任务)整体发布新索引, 读方拿Arc快照,
/// 不会看到半更新状态。
pub struct SectorIndexService {
    current: RwLock<Arc<SectorIndex>>,
}

impl SectorIndexService {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(SectorIndex::default())),
        }
    }

    /// 整体发布新索引
    pub fn publish(&self, index: SectorIndex) {
        let mut guard = self.current.write().expect("板块索引写锁中毒");
        *guard = Arc::new(index);
    }

    /// 当前索引快照
    pub fn snapshot(&self) -> Arc<SectorIndex> {
        Arc::clone(&self.current.read().expect("板块索引读锁中毒"))
    }
}

impl Default for SectorIndexService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_replaces_whole_index() {
        let service = SectorIndexService::new();
        assert!(service.snapshot().block("bk001").is_none());

        let mut blocks = HashMap::new();
        blocks.insert(
            "bk001".to_string(),
            BlockInfo { code: "bk001".to_string(), name: "银行".to_string(), ..Default::default() },
        );
        let mut stock_to_block = HashMap::new();
        stock_to_block.insert("sh600000".to_string(), vec!["bk001".to_string()]);
        service.publish(SectorIndex::new(blocks, stock_to_block, HashMap::new()));

        let old = service.snapshot();
        assert!(old.block("bk001").is_some());

        // 再次发布空索引, 旧快照不受影响
        service.publish(SectorIndex::default());
        assert!(old.block("bk001").is_some());
        assert!(service.snapshot().block("bk001").is_none());
    }
}
