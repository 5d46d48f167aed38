//! 测试共用件: 可编程行情源 + 固定时钟 + 快照构造

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone};

use xquant::exchange::{cn_offset, Calendar, FixedClock};
use xquant::market::{
    KlineBar, MinuteBar, QuarterlyReport, QuotesProvider, SecurityInfo, SecurityMarginTrading, SnapshotTick,
    TradeState, Transaction, XdxrEvent, LADDER_DEPTH,
};

/// 2025-06-10是周二(交易日)
pub const YEAR: i32 = 2025;
pub const MONTH: u32 = 6;
pub const DAY: u32 = 10;

pub fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(YEAR, MONTH, DAY).expect("测试日期")
}

/// 固定在指定时刻的日历
pub fn calendar_at(h: u32, m: u32, s: u32) -> Arc<Calendar> {
    let dt = cn_offset()
        .with_ymd_and_hms(YEAR, MONTH, DAY, h, m, s)
        .single()
        .expect("测试时刻");
    Arc::new(Calendar::new(Arc::new(FixedClock(dt)), HashSet::new()))
}

/// 盘中10点的日历
pub fn trading_calendar() -> Arc<Calendar> {
    calendar_at(10, 0, 0)
}

pub fn make_tick(code: &str, price: f64) -> SnapshotTick {
    SnapshotTick {
        security_code: code.to_string(),
        date: test_date(),
        state: TradeState::Normal,
        last_close: price,
        open: price,
        price,
        high: price,
        low: price,
        vol: 240_000,
        amount: price * 240_000.0,
        open_volume: 5_000,
        rate: 0.0,
        active: 0,
        bid_price: [price; LADDER_DEPTH],
        bid_vol: [200; LADDER_DEPTH],
        ask_price: [price; LADDER_DEPTH],
        ask_vol: [100; LADDER_DEPTH],
    }
}

/// 仅套用通用规则过滤的测试策略
pub struct PlainStrategy {
    pub code: u64,
    pub name: String,
}

impl PlainStrategy {
    pub fn new(code: u64, name: &str) -> Self {
        Self { code, name: name.to_string() }
    }
}

impl xquant::strategies::Strategy for PlainStrategy {
    fn code(&self) -> u64 {
        self.code
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn filter(
        &self,
        rules: &xquant::rules::RuleRegistry,
        param: &xquant::config::RuleParameter,
        snapshot: &xquant::factors::QuoteSnapshot,
    ) -> Result<(), xquant::rules::RuleError> {
        xquant::strategies::general_filter(rules, param, snapshot)
    }
    fn evaluate(
        &self,
        _security_code: &str,
        _ctx: &xquant::strategies::StrategyContext,
        _results: &mut std::collections::BTreeMap<String, xquant::strategies::ResultInfo>,
    ) {
    }
}

/// 构造一条统计记录
pub fn make_stat(code: &str, price: f64) -> xquant::tracker::Statistics {
    xquant::tracker::Statistics {
        date: test_date(),
        code: code.to_string(),
        name: format!("{}名称", code),
        active: 0,
        last_close: price,
        open: price,
        open_raise: 0.0,
        price,
        up_rate: 0.0,
        open_volume: 5_000,
        turn_z: 0.0,
        quantity_ratio: 0.0,
        average_price: price,
        speed: 0.0,
        tendency: String::new(),
        block_name: String::new(),
        block_rate: 0.0,
        block_top: 0,
        block_rank: 0,
        update_time: "10:00:00".to_string(),
    }
}

/// 可编程行情源
pub struct MockProvider {
    ticks: Mutex<HashMap<String, SnapshotTick>>,
    /// 前N次get_snapshot调用直接失败
    fail_first: AtomicUsize,
    /// 包含这些代码的分片永远失败
    fail_codes: Mutex<HashSet<String>>,
    call_count: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            ticks: Mutex::new(HashMap::new()),
            fail_first: AtomicUsize::new(0),
            fail_codes: Mutex::new(HashSet::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn put_tick(&self, tick: SnapshotTick) {
        self.ticks.lock().expect("锁").insert(tick.security_code.clone(), tick);
    }

    pub fn set_fail_first(&self, n: usize) {
        self.fail_first.store(n, Ordering::SeqCst);
    }

    pub fn always_fail_for(&self, code: &str) {
        self.fail_codes.lock().expect("锁").insert(code.to_string());
    }

    pub fn snapshot_calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuotesProvider for MockProvider {
    async fn get_snapshot(&self, codes: &[String]) -> Result<Vec<SnapshotTick>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        loop {
            let remaining = self.fail_first.load(Ordering::SeqCst);
            if remaining == 0 {
                break;
            }
            if self
                .fail_first
                .compare_exchange(remaining, remaining - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return Err(anyhow!("模拟网络异常"));
            }
        }
        {
            let fail_codes = self.fail_codes.lock().expect("锁");
            if codes.iter().any(|c| fail_codes.contains(c)) {
                return Err(anyhow!("模拟分片失败"));
            }
        }
        let ticks = self.ticks.lock().expect("锁");
        Ok(codes.iter().filter_map(|c| ticks.get(c).cloned()).collect())
    }

    fn num_servers(&self) -> usize {
        2
    }

    async fn get_kline(&self, _security_code: &str) -> Result<Vec<KlineBar>> {
        Ok(Vec::new())
    }

    async fn get_minutes(&self, _security_code: &str, _date: NaiveDate) -> Result<Vec<MinuteBar>> {
        Ok(Vec::new())
    }

    async fn get_transactions(&self, _security_code: &str, _date: NaiveDate) -> Result<Vec<Transaction>> {
        Ok(Vec::new())
    }

    async fn get_xdxr(&self, _security_code: &str) -> Result<Vec<XdxrEvent>> {
        Ok(Vec::new())
    }

    async fn get_security_info(&self, security_code: &str) -> Result<SecurityInfo> {
        Ok(SecurityInfo {
            security_code: security_code.to_string(),
            name: format!("{}名称", security_code),
            capital: 10.0,
            free_capital: 5.0,
        })
    }

    async fn get_quarterly_reports(&self, _quarter: &str) -> Result<Vec<QuarterlyReport>> {
        Ok(Vec::new())
    }

    async fn get_margin_trading_list(&self, _date: NaiveDate) -> Result<Vec<SecurityMarginTrading>> {
        Ok(Vec::new())
    }
}
