use chrono::NaiveDate;

use super::sector::SectorIndex;
use crate::factors::{net_change_rate, QuoteSnapshot};

/// 策略扫描结果的统计投影, 表格输出与股票池合并都吃这份数据
#[derive(Debug, Clone)]
pub struct Statistics {
    pub date: NaiveDate,
    pub code: String,
    pub name: String,
    /// 活跃度
    pub active: u16,
    pub last_close: f64,
    pub open: f64,
    /// 开盘涨幅%
    pub open_raise: f64,
    pub price: f64,
    /// 涨跌幅%
    pub up_rate: f64,
    /// 集合竞价开盘量, 股
    pub open_volume: i64,
    /// 开盘换手Z
    pub turn_z: f64,
    /// 开盘量比
    pub quantity_ratio: f64,
    /// 均价
    pub average_price: f64,
    /// 涨速
    pub speed: f64,
    /// 短线趋势标签
    pub tendency: String,
    pub block_name: String,
    pub block_rate: f64,
    /// 板块排名
    pub block_top: usize,
    /// 个股在板块内的排名
    pub block_rank: usize,
    pub update_time: String,
}

/// 趋势标签: 低开/平开/高开 + 回落/拉升 + 强势/弱势
fn calculate_tendency(snapshot: &QuoteSnapshot, average_price: f64) -> String {
    let mut tendency = String::new();
    if snapshot.open < snapshot.last_close {
        tendency.push_str("低开");
    } else if snapshot.open == snapshot.last_close {
        tendency.push_str("平开");
    } else {
        tendency.push_str("高开");
    }
    if average_price < snapshot.open {
        tendency.push_str(",回落");
    } else {
        tendency.push_str(",拉升");
    }
    if snapshot.price > average_price {
        tendency.push_str(",强势");
    } else {
        tendency.push_str(",弱势");
    }
    tendency
}

/// 从快照构建统计数据
pub fn build_statistics(
    snapshots: &[QuoteSnapshot],
    date: NaiveDate,
    update_time: &str,
    sectors: &SectorIndex,
) -> Vec<Statistics> {
    let mut stats = Vec::with_capacity(snapshots.len());
    for v in snapshots {
        let average_price = if v.vol > 0 { v.amount / v.vol as f64 } else { 0.0 };
        let mut stat = Statistics {
            date,
            code: v.security_code.clone(),
            name: v.name.clone(),
            active: v.active,
            last_close: v.last_close,
            open: v.open,
            open_raise: v.opening_change_rate,
            price: v.price,
            up_rate: v.change_rate,
            open_volume: v.open_volume,
            turn_z: v.open_turn_z,
            quantity_ratio: v.open_quantity_ratio,
            average_price,
            speed: v.speed,
            tendency: calculate_tendency(v, average_price),
            block_name: String::new(),
            block_rate: 0.0,
            block_top: 0,
            block_rank: 0,
            update_time: update_time.to_string(),
        };
        // 补充板块信息
        if let Some(block_codes) = sectors.blocks_of_stock(&stat.code) {
            if let Some(block) = block_codes.first().and_then(|bc| sectors.block(bc)) {
                stat.block_name = block.name.clone();
                stat.block_rate = block.change_rate;
                stat.block_top = block.rank;
                if let Some(rank) = sectors.rank_of_stock(&stat.code) {
                    stat.block_rank = rank;
                }
            }
        }
        stats.push(stat);
    }
    stats
}

/// 胜率统计
#[derive(Debug, Default, Clone, Copy)]
pub struct WinRateStatistics {
    /// 开盘买入存在溢价的个数
    pub win_count: usize,
    pub over_1percent: usize,
    pub over_2percent: usize,
    pub over_3percent: usize,
    pub over_5percent: usize,
    pub average_yield: f64,
}

pub fn calculate_win_rate(stats: &[Statistics]) -> WinRateStatistics {
    let mut result = WinRateStatistics::default();
    let mut total_yield = 0.0;
    for v in stats {
        let rate = net_change_rate(v.open, v.price);
        if rate > 0.0 {
            result.win_count += 1;
        }
        if rate >= 1.00 {
            result.over_1percent += 1;
        }
        if rate >= 2.00 {
            result.over_2percent += 1;
        }
        if rate >= 3.00 {
            result.over_3percent += 1;
        }
        if rate >= 5.00 {
            result.over_5percent += 1;
        }
        total_yield += rate;
    }
    if !stats.is_empty() {
        result.average_yield = total_yield / stats.len() as f64;
    }
    result
}

/// 控制台表格输出(仅供盯盘, 不参与任何契约)
pub fn render_console_table(stats: &[Statistics], date: NaiveDate, update_time: &str) {
    if stats.is_empty() {
        return;
    }
    println!();
    println!(
        "{:<10} {:<10} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}  {:<16} {:<10}",
        "代码", "名称", "昨收", "开盘", "现价", "涨幅%", "换手Z", "量比", "趋势", "板块"
    );
    for v in stats {
        println!(
            "{:<10} {:<10} {:>8.2} {:>8.2} {:>8.2} {:>8.2} {:>8.3} {:>8.2}  {:<16} {:<10}",
            v.code, v.name, v.last_close, v.open, v.price, v.up_rate, v.turn_z, v.quantity_ratio, v.tendency, v.block_name
        );
    }
    println!();

    let win = calculate_win_rate(stats);
    let count = stats.len();
    println!("{} {}, 胜率统计:", date.format("%Y-%m-%d"), update_time);
    println!(
        "\t==> 胜    率: {}/{}, {:.2}%, 收益率: {:.2}%",
        win.win_count,
        count,
        100.0 * win.win_count as f64 / count as f64,
        win.average_yield
    );
    println!("\t==> 溢价超1%: {}/{}, {:.2}%", win.over_1percent, count, 100.0 * win.over_1percent as f64 / count as f64);
    println!("\t==> 溢价超2%: {}/{}, {:.2}%", win.over_2percent, count, 100.0 * win.over_2percent as f64 / count as f64);
    println!("\t==> 溢价超3%: {}/{}, {:.2}%", win.over_3percent, count, 100.0 * win.over_3percent as f64 / count as f64);
    println!("\t==> 溢价超5%: {}/{}, {:.2}%", win.over_5percent, count, 100.0 * win.over_5percent as f64 / count as f64);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{SnapshotTick, TradeState, LADDER_DEPTH};

    fn snapshot(open: f64, price: f64, last_close: f64, vol: i64, amount: f64) -> QuoteSnapshot {
        let tick = SnapshotTick {
            security_code: "sh600000".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 6, 10).expect("日期"),
            state: TradeState::Normal,
            last_close,
            open,
            price,
            high: price.max(open),
            low: price.min(open),
            vol,
            amount,
            open_volume: 100,
            rate: 0.0,
            active: 0,
            bid_price: [0.0; LADDER_DEPTH],
            bid_vol: [0; LADDER_DEPTH],
            ask_price: [0.0; LADDER_DEPTH],
            ask_vol: [0; LADDER_DEPTH],
        };
        crate::factors::enrich(&tick, "浦发银行", None, None, 0).expect("快照")
    }

    #[test]
    fn test_tendency_tags() {
        // 高开, 均价高于开盘(拉升), 现价高于均价(强势)
        let snap = snapshot(10.5, 11.0, 10.0, 100, 10.7 * 100.0);
        let stats = build_statistics(
            std::slice::from_ref(&snap),
            snap.date,
            "10:00:00",
            &SectorIndex::default(),
        );
        assert_eq!(stats[0].tendency, "高开,拉升,强势");

        // 低开, 均价低于开盘(回落), 现价低于均价(弱势)
        let snap = snapshot(9.5, 9.0, 10.0, 100, 9.2 * 100.0);
        let stats = build_statistics(
            std::slice::from_ref(&snap),
            snap.date,
            "10:00:00",
            &SectorIndex::default(),
        );
        assert_eq!(stats[0].tendency, "低开,回落,弱势");
    }

    #[test]
    fn test_win_rate() {
        let snaps = vec![
            snapshot(10.0, 10.5, 10.0, 100, 1020.0), // +5%
            snapshot(10.0, 10.1, 10.0, 100, 1010.0), // +1%
            snapshot(10.0, 9.9, 10.0, 100, 1000.0),  // -1%
        ];
        let stats = build_statistics(&snaps, snaps[0].date, "10:00:00", &SectorIndex::default());
        let win = calculate_win_rate(&stats);
        assert_eq!(win.win_count, 2);
        assert_eq!(win.over_1percent, 2);
        assert_eq!(win.over_5percent, 1);
    }
}
