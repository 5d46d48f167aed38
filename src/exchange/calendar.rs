use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Utc, Weekday};

use super::session::{self, ExchangeStatus};
use super::cn_offset;

/// 时钟抽象, 组件一律通过Calendar取时间, 测试注入固定时刻
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// 系统时钟(北京时间)
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&cn_offset())
    }
}

/// 固定时钟, 测试用
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

/// 交易日历 + 盘口状态
///
/// 交易日 = 周一~周五且不在节假日表内。节假日表来自配置。
pub struct Calendar {
    clock: Arc<dyn Clock>,
    holidays: HashSet<NaiveDate>,
}

impl Calendar {
    pub fn new(clock: Arc<dyn Clock>, holidays: HashSet<NaiveDate>) -> Self {
        Self { clock, holidays }
    }

    pub fn with_system_clock(holidays: HashSet<NaiveDate>) -> Self {
        Self::new(Arc::new(SystemClock), holidays)
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    fn now_time(&self) -> NaiveTime {
        self.clock.now().time()
    }

    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        match date.weekday() {
            Weekday::Sat | Weekday::Sun => false,
            _ => !self.holidays.contains(&date),
        }
    }

    /// 今天是否交易日
    pub fn date_is_trading_day(&self) -> bool {
        self.is_trading_day(self.today())
    }

    /// 修正交易日期: 回退到不晚于date的最近交易日
    pub fn fix_trade_date(&self, date: NaiveDate) -> NaiveDate {
        let mut d = date;
        while !self.is_trading_day(d) {
            d = d.pred_opt().expect("交易日回退越界");
        }
        d
    }

    /// 下一个交易日
    pub fn next_trade_date(&self, date: NaiveDate) -> NaiveDate {
        let mut d = date.succ_opt().expect("交易日前进越界");
        while !self.is_trading_day(d) {
            d = d.succ_opt().expect("交易日前进越界");
        }
        d
    }

    /// [from, to]区间内的全部交易日
    pub fn trading_date_range(&self, from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        let mut d = from;
        while d <= to {
            if self.is_trading_day(d) {
                dates.push(d);
            }
            match d.succ_opt() {
                Some(next) => d = next,
                None => break,
            }
        }
        dates
    }

    /// 当前数据归属的交易日: 盘前取上一交易日, 其余取最近交易日
    pub fn current_trade_date(&self) -> NaiveDate {
        let today = self.today();
        let fixed = self.fix_trade_date(today);
        if fixed == today && self.now_time() < session::trading_start_time() {
            // 未开盘, 数据仍归属上一交易日
            return self.fix_trade_date(today.pred_opt().expect("交易日回退越界"));
        }
        fixed
    }

    /// date当日已经过的交易分钟数, 全天240分钟
    pub fn minutes_elapsed(&self, date: NaiveDate) -> i64 {
        if !self.is_trading_day(date) {
            return 0;
        }
        if date < self.today() {
            return 240;
        }
        if date > self.today() {
            return 0;
        }
        let now = self.now_time();
        let morning_open = NaiveTime::from_hms_opt(9, 30, 0).expect("时间常量");
        let morning_close = NaiveTime::from_hms_opt(11, 30, 0).expect("时间常量");
        let afternoon_open = NaiveTime::from_hms_opt(13, 0, 0).expect("时间常量");
        let afternoon_close = NaiveTime::from_hms_opt(15, 0, 0).expect("时间常量");
        if now <= morning_open {
            0
        } else if now <= morning_close {
            (now - morning_open).num_minutes()
        } else if now <= afternoon_open {
            120
        } else if now <= afternoon_close {
            120 + (now - afternoon_open).num_minutes()
        } else {
            240
        }
    }

    /// 当前盘口状态
    pub fn status(&self) -> ExchangeStatus {
        if !self.date_is_trading_day() {
            return ExchangeStatus::Closed;
        }
        session::status_of_time(self.now_time())
    }

    /// 当前能否实时更新行情, 并返回盘口状态
    pub fn can_update_in_realtime(&self) -> (bool, ExchangeStatus) {
        let status = self.status();
        let ok = matches!(
            status,
            ExchangeStatus::CallAuction | ExchangeStatus::Trading | ExchangeStatus::Suspend
        );
        (ok, status)
    }

    /// 当前是否连续竞价中
    pub fn currently_trading(&self) -> bool {
        self.status() == ExchangeStatus::Trading
    }

    /// 是否处于集合竞价收盘段 9:25~9:30
    pub fn check_call_auction_close(&self) -> bool {
        self.date_is_trading_day() && session::in_call_auction_close(self.now_time())
    }

    /// 是否处于尾盘最后半小时
    pub fn in_tail_market(&self) -> bool {
        self.date_is_trading_day() && session::in_tail_market(self.now_time())
    }
}
