use std::sync::Arc;

use chrono::NaiveDate;

use super::{net_change_rate, F10Store, HistoryCache, SecurityHistory, F10};
use crate::exchange::Calendar;
use crate::market::{SnapshotCache, SnapshotTick, TradeState};

/// 策略视角的增强快照
#[derive(Debug, Clone)]
pub struct QuoteSnapshot {
    pub security_code: String,
    pub name: String,
    pub date: NaiveDate,
    pub last_close: f64,
    pub open: f64,
    pub price: f64,
    pub high: f64,
    pub low: f64,
    pub vol: i64,
    pub amount: f64,
    /// 均价 = 成交额/成交量
    pub average_price: f64,
    /// 开盘涨幅%
    pub opening_change_rate: f64,
    /// 涨跌幅%
    pub change_rate: f64,
    /// 集合竞价成交量
    pub open_volume: i64,
    /// 开盘换手Z
    pub open_turn_z: f64,
    /// 开盘量比
    pub open_quantity_ratio: f64,
    /// 实时量比
    pub quantity_ratio: f64,
    /// 开盘委托方向
    pub open_bidding_direction: i32,
    /// 开盘量方向
    pub open_volume_direction: i32,
    /// 总股本, 亿股
    pub capital: f64,
    /// 流通股本, 亿股
    pub free_capital: f64,
    /// 涨速
    pub speed: f64,
    /// 活跃度
    pub active: u16,
}

/// 原始tick -> 增强快照
///
/// 纯函数: 同样输入产出同样输出, 不做IO不改入参。
/// 非正常交易状态不产出; MV5<=0 时量比字段保持0。
pub fn enrich(
    tick: &SnapshotTick,
    name: &str,
    f10: Option<&F10>,
    history: Option<&SecurityHistory>,
    minutes_elapsed: i64,
) -> Option<QuoteSnapshot> {
    if tick.state != TradeState::Normal {
        return None;
    }
    let mut snapshot = QuoteSnapshot {
        security_code: tick.security_code.clone(),
        name: name.to_string(),
        date: tick.date,
        last_close: tick.last_close,
        open: tick.open,
        price: tick.price,
        high: tick.high,
        low: tick.low,
        vol: tick.vol,
        amount: tick.amount,
        average_price: if tick.vol > 0 { tick.amount / tick.vol as f64 } else { 0.0 },
        opening_change_rate: net_change_rate(tick.last_close, tick.open),
        change_rate: net_change_rate(tick.last_close, tick.price),
        open_volume: tick.open_volume,
        open_turn_z: 0.0,
        open_quantity_ratio: 0.0,
        quantity_ratio: 0.0,
        open_bidding_direction: 0,
        open_volume_direction: 0,
        capital: 0.0,
        free_capital: 0.0,
        speed: tick.rate,
        active: tick.active,
    };

    if let Some(f10) = f10 {
        snapshot.capital = f10.capital;
        snapshot.free_capital = f10.free_capital;
        snapshot.open_turn_z = f10.turn_z(tick.open_volume);
    }

    if let Some(history) = history {
        let mv5 = history.mv5();
        if mv5 > 0.0 {
            // 开盘量比
            snapshot.open_quantity_ratio = tick.open_volume as f64 / mv5;
            // 实时量比
            if minutes_elapsed > 0 {
                let minute_volume = tick.vol as f64 / minutes_elapsed as f64;
                snapshot.quantity_ratio = minute_volume / mv5;
            }
        }
    }

    let (bidding, volume) = tick.check_direction();
    snapshot.open_bidding_direction = bidding;
    snapshot.open_volume_direction = volume;

    Some(snapshot)
}

/// 策略快照服务: 缓存取tick + F10/历史联立
pub struct StrategySnapshotService {
    cache: Arc<SnapshotCache>,
    f10: Arc<F10Store>,
    history: Arc<HistoryCache>,
    calendar: Arc<Calendar>,
}

impl StrategySnapshotService {
    pub fn new(
        cache: Arc<SnapshotCache>,
        f10: Arc<F10Store>,
        history: Arc<HistoryCache>,
        calendar: Arc<Calendar>,
    ) -> Self {
        Self { cache, f10, history, calendar }
    }

    /// 从缓存获取策略快照; 缓存未命中或非正常交易状态返回None
    pub fn get_strategy_snapshot(&self, security_code: &str) -> Option<QuoteSnapshot> {
        let tick = self.cache.get(security_code)?;
        let f10 = self.f10.get(security_code);
        let history = self.history.get(security_code);
        let name = self.f10.stock_name(security_code);
        let minutes = self.calendar.minutes_elapsed(tick.date);
        enrich(&tick, &name, f10.as_ref(), history.as_ref(), minutes)
    }
}
