use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use ta::indicators::SimpleMovingAverage;
use ta::Next;
use tracing::debug;

use crate::market::KlineBar;
use crate::storages;

/// 单日交易分钟数
const MINUTES_PER_DAY: f64 = 240.0;

/// 增量均线: 把最新价并入截止昨日的(period-1)周期均线桶
///
/// MA4/MA9/MA19桶存的是前period-1根收盘价的均值,
/// 并入实时价即得到当日口径的MA5/MA10/MA20。
pub fn incremental_moving_average(prev_bucket: f64, period: usize, latest_price: f64) -> f64 {
    if period == 0 {
        return latest_price;
    }
    (prev_bucket * (period - 1) as f64 + latest_price) / period as f64
}

/// 证券的历史特征: 均线桶 + 5日均量
#[derive(Debug, Clone, Default)]
pub struct SecurityHistory {
    pub ma4: f64,
    pub ma9: f64,
    pub ma19: f64,
    /// 近5日每分钟平均成交量, 股
    mv5: f64,
}

impl SecurityHistory {
    /// 从日K线序列构建
    pub fn from_kline(bars: &[KlineBar]) -> Self {
        let mut history = SecurityHistory::default();
        if bars.is_empty() {
            return history;
        }
        let mut ma4 = SimpleMovingAverage::new(4).expect("MA4参数");
        let mut ma9 = SimpleMovingAverage::new(9).expect("MA9参数");
        let mut ma19 = SimpleMovingAverage::new(19).expect("MA19参数");
        for bar in bars {
            history.ma4 = ma4.next(bar.close);
            history.ma9 = ma9.next(bar.close);
            history.ma19 = ma19.next(bar.close);
        }
        let days = bars.len().min(5);
        let total: f64 = bars[bars.len() - days..].iter().map(|b| b.volume).sum();
        history.mv5 = total / (days as f64 * MINUTES_PER_DAY);
        history
    }

    /// 近5日分钟均量, 量比分母
    pub fn mv5(&self) -> f64 {
        self.mv5
    }
}

/// 历史特征缓存: 证券代码 -> SecurityHistory
pub struct HistoryCache {
    inner: RwLock<HashMap<String, SecurityHistory>>,
}

impl HistoryCache {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, security_code: &str) -> Option<SecurityHistory> {
        let guard = self.inner.read().expect("历史特征读锁中毒");
        guard.get(security_code).cloned()
    }

    pub fn put(&self, security_code: &str, history: SecurityHistory) {
        let mut guard = self.inner.write().expect("历史特征写锁中毒");
        guard.insert(security_code.to_string(), history);
    }

    pub fn clear(&self) {
        self.inner.write().expect("历史特征写锁中毒").clear();
    }
}

impl Default for HistoryCache {
    fn default() -> Self {
        Self::new()
    }
}

/// 日K线文件缓存, 按需从 kline/<code>.csv 加载
pub struct KlineStore {
    base_dir: PathBuf,
    cache: RwLock<HashMap<String, Arc<Vec<KlineBar>>>>,
}

impl KlineStore {
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn filename(&self, security_code: &str) -> PathBuf {
        self.base_dir.join("kline").join(format!("{}.csv", security_code))
    }

    /// 读取日K线, 文件不存在返回空
    pub fn bars(&self, security_code: &str) -> Arc<Vec<KlineBar>> {
        if let Some(bars) = self
            .cache
            .read()
            .expect("K线缓存读锁中毒")
            .get(security_code)
        {
            return Arc::clone(bars);
        }
        let bars: Vec<KlineBar> = match storages::load_csv(&self.filename(security_code)) {
            Ok(list) => list,
            Err(e) => {
                debug!("读取{}日K线失败: {}", security_code, e);
                Vec::new()
            }
        };
        let bars = Arc::new(bars);
        self.cache
            .write()
            .expect("K线缓存写锁中毒")
            .insert(security_code.to_string(), Arc::clone(&bars));
        bars
    }

    /// 文件更新后失效单只证券的缓存
    pub fn invalidate(&self, security_code: &str) {
        self.cache.write().expect("K线缓存写锁中毒").remove(security_code);
    }

    /// 换日重置
    pub fn clear(&self) {
        self.cache.write().expect("K线缓存写锁中毒").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(day: u32, close: f64, volume: f64) -> KlineBar {
        KlineBar {
            date: NaiveDate::from_ymd_opt(2025, 6, day).expect("日期"),
            open: close,
            close,
            high: close,
            low: close,
            volume,
            amount: close * volume,
        }
    }

    #[test]
    fn test_from_kline_mv5() {
        // 5日每日成交量240000股 => 每分钟1000股
        let bars: Vec<KlineBar> = (1..=5).map(|d| bar(d, 10.0, 240_000.0)).collect();
        let history = SecurityHistory::from_kline(&bars);
        assert!((history.mv5() - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_from_kline_ma() {
        let bars: Vec<KlineBar> = (1..=20).map(|d| bar(d, d as f64, 1000.0)).collect();
        let history = SecurityHistory::from_kline(&bars);
        // 最近4日: 17,18,19,20 => 18.5
        assert!((history.ma4 - 18.5).abs() < 1e-9);
        assert!(history.ma4 > history.ma9 && history.ma9 > history.ma19);
    }

    #[test]
    fn test_empty_kline() {
        let history = SecurityHistory::from_kline(&[]);
        assert_eq!(history.mv5(), 0.0);
    }

    #[test]
    fn test_incremental_moving_average() {
        // 前4日均值10, 并入最新价15 => (10*4+15)/5 = 11
        assert!((incremental_moving_average(10.0, 5, 15.0) - 11.0).abs() < 1e-9);
        // 最新价等于桶值时均线不变
        assert!((incremental_moving_average(10.0, 10, 10.0) - 10.0).abs() < 1e-9);
    }
}
