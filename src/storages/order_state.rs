use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::error;

use crate::error::AppError;
use crate::trader::Direction;

/// 委托状态库
///
/// 以 (交易日, 策略, 证券, 方向) 为幂等键落盘标记文件,
/// 下单前先打标记, 崩溃重放不会二次提交。
pub struct OrderStateStore {
    base: PathBuf,
}

impl OrderStateStore {
    pub fn new(root: &Path) -> Self {
        Self {
            base: root.join("orders"),
        }
    }

    fn state_filename(&self, date: NaiveDate, strategy_code: u64, security_code: &str, direction: Direction) -> PathBuf {
        self.base.join(format!(
            "{}-{}-{}-{}.done",
            date.format("%Y%m%d"),
            strategy_code,
            security_code,
            direction.as_str()
        ))
    }

    /// 打提交标记, 已存在返回AlreadyExists
    pub fn push_order_state(
        &self,
        date: NaiveDate,
        strategy_code: u64,
        security_code: &str,
        direction: Direction,
    ) -> Result<(), AppError> {
        if let Err(e) = std::fs::create_dir_all(&self.base) {
            return Err(AppError::Unknown(format!("创建订单状态目录失败: {}", e)));
        }
        let filename = self.state_filename(date, strategy_code, security_code, direction);
        match std::fs::OpenOptions::new().write(true).create_new(true).open(&filename) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(AppError::AlreadyExists(format!("订单状态{}", filename.display())))
            }
            Err(e) => Err(AppError::Unknown(format!("写订单状态失败: {}", e))),
        }
    }

    /// 是否已提交
    pub fn check_order_state(
        &self,
        date: NaiveDate,
        strategy_code: u64,
        security_code: &str,
        direction: Direction,
    ) -> bool {
        self.state_filename(date, strategy_code, security_code, direction).exists()
    }

    /// 统计指定策略当日已提交的订单数
    pub fn count_strategy_orders(&self, date: NaiveDate, strategy_code: u64, direction: Direction) -> usize {
        let prefix = format!("{}-{}-", date.format("%Y%m%d"), strategy_code);
        let suffix = format!("-{}.done", direction.as_str());
        let entries = match std::fs::read_dir(&self.base) {
            Ok(entries) => entries,
            Err(_) => return 0,
        };
        let mut count = 0;
        for entry in entries {
            let Ok(entry) = entry else { continue };
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with(&prefix) && name.ends_with(&suffix) {
                count += 1;
            }
        }
        count
    }

    /// 清理指定日期之前的过期标记
    pub fn clean_expired(&self, before: NaiveDate) {
        let entries = match std::fs::read_dir(&self.base) {
            Ok(entries) => entries,
            Err(_) => return,
        };
        let threshold = before.format("%Y%m%d").to_string();
        for entry in entries {
            let Ok(entry) = entry else { continue };
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.split('-').next().map(|d| d < threshold.as_str()).unwrap_or(false) {
                if let Err(e) = std::fs::remove_file(entry.path()) {
                    error!("清理订单状态{}失败: {}", name, e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_is_idempotent_marker() {
        let dir = tempfile::tempdir().expect("临时目录");
        let store = OrderStateStore::new(dir.path());
        let date = NaiveDate::from_ymd_opt(2025, 6, 10).expect("日期");

        assert!(!store.check_order_state(date, 1, "sh600000", Direction::Buy));
        store.push_order_state(date, 1, "sh600000", Direction::Buy).expect("首次打标记");
        assert!(store.check_order_state(date, 1, "sh600000", Direction::Buy));
        // 第二次打标记失败
        assert!(store.push_order_state(date, 1, "sh600000", Direction::Buy).is_err());
        assert_eq!(store.count_strategy_orders(date, 1, Direction::Buy), 1);
        assert_eq!(store.count_strategy_orders(date, 2, Direction::Buy), 0);
    }

    #[test]
    fn test_clean_expired() {
        let dir = tempfile::tempdir().expect("临时目录");
        let store = OrderStateStore::new(dir.path());
        let old = NaiveDate::from_ymd_opt(2025, 6, 9).expect("日期");
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).expect("日期");
        store.push_order_state(old, 1, "sh600000", Direction::Buy).expect("打标记");
        store.push_order_state(today, 1, "sh600000", Direction::Buy).expect("打标记");
        store.clean_expired(today);
        assert!(!store.check_order_state(old, 1, "sh600000", Direction::Buy));
        assert!(store.check_order_state(today, 1, "sh600000", Direction::Buy));
    }
}
