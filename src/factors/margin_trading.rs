use dashmap::DashMap;
use tracing::error;

use crate::exchange::correct_security_code;
use crate::market::SecurityMarginTrading;

/// 两融标的表
///
/// 交易日9点后用上一交易日的两融名单整体重建, 盘中只读。
pub struct MarginTradingTargets {
    targets: DashMap<String, SecurityMarginTrading>,
}

impl MarginTradingTargets {
    pub fn new() -> Self {
        Self {
            targets: DashMap::new(),
        }
    }

    /// 一次性重建两融名单
    pub fn init(&self, list: Vec<SecurityMarginTrading>) {
        if list.is_empty() {
            error!("两融标的列表为空, 保留旧名单");
            return;
        }
        self.targets.clear();
        for v in list {
            let security_code = correct_security_code(&v.secu_code);
            self.targets.insert(security_code, v);
        }
    }

    pub fn get(&self, code: &str) -> Option<SecurityMarginTrading> {
        let security_code = correct_security_code(code);
        self.targets.get(&security_code).map(|v| v.clone())
    }

    pub fn contains(&self, code: &str) -> bool {
        let security_code = correct_security_code(code);
        self.targets.contains_key(&security_code)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl Default for MarginTradingTargets {
    fn default() -> Self {
        Self::new()
    }
}
