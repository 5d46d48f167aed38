pub mod batch_fetcher;
pub mod provider;
pub mod replay;
pub mod snapshot_cache;

pub use batch_fetcher::SnapshotSyncService;
pub use provider::QuotesProvider;
pub use replay::LocalReplayProvider;
pub use snapshot_cache::SnapshotCache;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 证券交易状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeState {
    /// 正常交易
    Normal,
    /// 停牌
    Suspended,
    /// 退市
    Delisted,
}

/// 五档盘口深度
pub const LADDER_DEPTH: usize = 5;

/// 实时快照(一笔tick), 入缓存后不可变
#[derive(Debug, Clone)]
pub struct SnapshotTick {
    pub security_code: String,
    pub date: NaiveDate,
    pub state: TradeState,
    pub last_close: f64,
    pub open: f64,
    pub price: f64,
    pub high: f64,
    pub low: f64,
    /// 成交量, 股
    pub vol: i64,
    /// 成交额, 元
    pub amount: f64,
    /// 集合竞价成交量, 股
    pub open_volume: i64,
    /// 涨速
    pub rate: f64,
    /// 活跃度
    pub active: u16,
    pub bid_price: [f64; LADDER_DEPTH],
    pub bid_vol: [i64; LADDER_DEPTH],
    pub ask_price: [f64; LADDER_DEPTH],
    pub ask_vol: [i64; LADDER_DEPTH],
}

impl SnapshotTick {
    /// 委托方向: (开盘委托方向, 开盘量方向)
    ///
    /// 以五档委买委卖量差的符号衡量, 一档量差衡量开盘量方向。
    pub fn check_direction(&self) -> (i32, i32) {
        let bid_total: i64 = self.bid_vol.iter().sum();
        let ask_total: i64 = self.ask_vol.iter().sum();
        let bidding = (bid_total - ask_total).signum() as i32;
        let volume = (self.bid_vol[0] - self.ask_vol[0]).signum() as i32;
        (bidding, volume)
    }
}

/// 日K线
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KlineBar {
    pub date: NaiveDate,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    /// 成交量, 股
    pub volume: f64,
    /// 成交额, 元
    pub amount: f64,
}

/// 分时数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinuteBar {
    pub time: String,
    pub price: f64,
    pub volume: f64,
}

/// 分笔成交
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub time: String,
    pub price: f64,
    pub volume: f64,
    /// 买卖方向: 1买 -1卖 0中性
    pub direction: i32,
}

/// 除权除息记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XdxrEvent {
    pub date: NaiveDate,
    /// 分类(送股/配股/分红等)
    pub category: i32,
    pub bonus_shares: f64,
    pub rationed_shares: f64,
    pub rationed_price: f64,
    pub dividend: f64,
}

/// 季报摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarterlyReport {
    pub security_code: String,
    pub quarter: String,
    pub eps: f64,
    pub revenue: f64,
    pub net_profit: f64,
}

/// 证券基础信息(股本结构等)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityInfo {
    pub security_code: String,
    pub name: String,
    /// 总股本, 亿股
    pub capital: f64,
    /// 流通股本, 亿股
    pub free_capital: f64,
}

/// 两融标的
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityMarginTrading {
    pub secu_code: String,
    pub secu_name: String,
    /// 融资余额, 元
    pub fin_balance: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tick(code: &str, price: f64) -> SnapshotTick {
        SnapshotTick {
            security_code: code.to_string(),
            date: NaiveDate::from_ymd_opt(2025, 6, 10).expect("日期"),
            state: TradeState::Normal,
            last_close: price,
            open: price,
            price,
            high: price,
            low: price,
            vol: 1000,
            amount: price * 1000.0,
            open_volume: 100,
            rate: 0.0,
            active: 0,
            bid_price: [price; LADDER_DEPTH],
            bid_vol: [100; LADDER_DEPTH],
            ask_price: [price; LADDER_DEPTH],
            ask_vol: [100; LADDER_DEPTH],
        }
    }

    #[test]
    fn test_check_direction() {
        let mut tick = sample_tick("sh600000", 10.0);
        tick.bid_vol = [300, 100, 100, 100, 100];
        tick.ask_vol = [100, 100, 100, 100, 100];
        assert_eq!(tick.check_direction(), (1, 1));

        tick.bid_vol = [100, 100, 100, 100, 100];
        tick.ask_vol = [500, 100, 100, 100, 100];
        assert_eq!(tick.check_direction(), (-1, -1));

        tick.ask_vol = [100, 100, 100, 100, 100];
        assert_eq!(tick.check_direction(), (0, 0));
    }
}
