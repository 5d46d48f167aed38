use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use super::{
    KlineBar, MinuteBar, QuarterlyReport, QuotesProvider, SecurityInfo, SecurityMarginTrading, SnapshotTick,
    TradeState, Transaction, XdxrEvent, LADDER_DEPTH,
};
use crate::storages;

/// 本地回放数据源
///
/// 调试模式用: 从缓存目录的落盘数据合成行情, 不出网。
/// 快照用日K线最后一根合成, 盘口深度为对称占位。
pub struct LocalReplayProvider {
    base_dir: PathBuf,
}

impl LocalReplayProvider {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    fn kline_path(&self, security_code: &str) -> PathBuf {
        self.base_dir.join("kline").join(format!("{}.csv", security_code))
    }

    fn tick_from_bar(security_code: &str, bar: &KlineBar) -> SnapshotTick {
        // 竞价量近似为全天量的1/48
        let open_volume = (bar.volume / 48.0) as i64;
        SnapshotTick {
            security_code: security_code.to_string(),
            date: bar.date,
            state: TradeState::Normal,
            last_close: bar.open,
            open: bar.open,
            price: bar.close,
            high: bar.high,
            low: bar.low,
            vol: bar.volume as i64,
            amount: bar.amount,
            open_volume,
            rate: 0.0,
            active: 0,
            bid_price: [bar.close; LADDER_DEPTH],
            bid_vol: [open_volume.max(1); LADDER_DEPTH],
            ask_price: [bar.close; LADDER_DEPTH],
            ask_vol: [open_volume.max(1); LADDER_DEPTH],
        }
    }
}

#[async_trait]
impl QuotesProvider for LocalReplayProvider {
    async fn get_snapshot(&self, codes: &[String]) -> Result<Vec<SnapshotTick>> {
        let mut ticks = Vec::new();
        for code in codes {
            let path = self.kline_path(code);
            if !path.exists() {
                continue;
            }
            let bars: Vec<KlineBar> = storages::load_csv(&path)?;
            if let Some(last) = bars.last() {
                ticks.push(Self::tick_from_bar(code, last));
            }
        }
        Ok(ticks)
    }

    fn num_servers(&self) -> usize {
        1
    }

    async fn get_kline(&self, security_code: &str) -> Result<Vec<KlineBar>> {
        let path = self.kline_path(security_code);
        if !path.exists() {
            return Ok(Vec::new());
        }
        storages::load_csv(&path)
    }

    async fn get_minutes(&self, security_code: &str, date: NaiveDate) -> Result<Vec<MinuteBar>> {
        let path = self
            .base_dir
            .join("minutes")
            .join(security_code)
            .join(format!("{}.csv", date.format("%Y-%m-%d")));
        if !path.exists() {
            return Ok(Vec::new());
        }
        storages::load_csv(&path)
    }

    async fn get_transactions(&self, security_code: &str, date: NaiveDate) -> Result<Vec<Transaction>> {
        let path = self
            .base_dir
            .join("trans")
            .join(security_code)
            .join(format!("{}.csv", date.format("%Y-%m-%d")));
        if !path.exists() {
            return Ok(Vec::new());
        }
        storages::load_csv(&path)
    }

    async fn get_xdxr(&self, security_code: &str) -> Result<Vec<XdxrEvent>> {
        let path = self.base_dir.join("xdxr").join(format!("{}.csv", security_code));
        if !path.exists() {
            return Ok(Vec::new());
        }
        storages::load_csv(&path)
    }

    async fn get_security_info(&self, security_code: &str) -> Result<SecurityInfo> {
        let path = self.base_dir.join("f10").join(format!("{}.csv", security_code));
        if path.exists() {
            let rows: Vec<SecurityInfo> = storages::load_csv(&path)?;
            if let Some(info) = rows.into_iter().next() {
                return Ok(info);
            }
        }
        Ok(SecurityInfo {
            security_code: security_code.to_string(),
            name: security_code.to_string(),
            capital: 0.0,
            free_capital: 0.0,
        })
    }

    async fn get_quarterly_reports(&self, quarter: &str) -> Result<Vec<QuarterlyReport>> {
        let path = self.base_dir.join("reports").join(format!("{}.csv", quarter));
        if !path.exists() {
            return Ok(Vec::new());
        }
        storages::load_csv(&path)
    }

    async fn get_margin_trading_list(&self, _date: NaiveDate) -> Result<Vec<SecurityMarginTrading>> {
        let path = self.base_dir.join("margin_trading.csv");
        if !path.exists() {
            return Ok(Vec::new());
        }
        storages::load_csv(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_snapshot_synthesized_from_kline() {
        let dir = tempfile::tempdir().expect("临时目录");
        let bars = vec![KlineBar {
            date: NaiveDate::from_ymd_opt(2025, 6, 10).expect("日期"),
            open: 10.0,
            close: 10.5,
            high: 10.6,
            low: 9.9,
            volume: 480_000.0,
            amount: 4_900_000.0,
        }];
        storages::save_csv(&dir.path().join("kline").join("sh600000.csv"), &bars).expect("写K线");

        let provider = LocalReplayProvider::new(dir.path().to_path_buf());
        let ticks = provider
            .get_snapshot(&["sh600000".to_string(), "sz000001".to_string()])
            .await
            .expect("取快照");
        // 没有K线文件的代码被跳过
        assert_eq!(ticks.len(), 1);
        let tick = &ticks[0];
        assert_eq!(tick.security_code, "sh600000");
        assert_eq!(tick.price, 10.5);
        assert_eq!(tick.state, TradeState::Normal);
        assert_eq!(tick.open_volume, 10_000);
    }
}
