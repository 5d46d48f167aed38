use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

/// F10基本面(每日更新一次)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct F10 {
    pub security_code: String,
    pub name: String,
    /// 总股本, 亿股
    pub capital: f64,
    /// 流通股本, 亿股
    pub free_capital: f64,
}

impl F10 {
    /// 换手Z: 成交量(股)相对流通股本的万分比换手
    ///
    /// 开盘换手Z = 开盘量 / 流通股本 * 100
    pub fn turn_z(&self, volume: i64) -> f64 {
        let free_shares = self.free_capital * 1e8;
        if free_shares <= 0.0 {
            return 0.0;
        }
        volume as f64 / free_shares * 100.0
    }
}

/// F10内存库: 证券代码 -> F10
pub struct F10Store {
    inner: RwLock<HashMap<String, F10>>,
}

impl F10Store {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, security_code: &str) -> Option<F10> {
        let guard = self.inner.read().expect("F10读锁中毒");
        guard.get(security_code).cloned()
    }

    pub fn put(&self, f10: F10) {
        let mut guard = self.inner.write().expect("F10写锁中毒");
        guard.insert(f10.security_code.clone(), f10);
    }

    /// 证券名称, 未知代码返回代码本身
    pub fn stock_name(&self, security_code: &str) -> String {
        self.get(security_code)
            .map(|f| f.name)
            .unwrap_or_else(|| security_code.to_string())
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("F10读锁中毒").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for F10Store {
    fn default() -> Self {
        Self::new()
    }
}
