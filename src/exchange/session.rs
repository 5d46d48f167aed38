use chrono::NaiveTime;

/// 交易所盘口状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeStatus {
    /// 休市(非交易日或收盘后)
    Closed,
    /// 盘前
    PreOpen,
    /// 集合竞价
    CallAuction,
    /// 连续竞价
    Trading,
    /// 盘中暂停(9:25~9:30撮合静默 / 午间休市)
    Suspend,
    /// 盘后
    PostClose,
}

fn t(h: u32, m: u32, s: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, s).expect("非法盘口时间常量")
}

/// 按北京时间的时分秒推导盘口状态, 不关心是否交易日
pub fn status_of_time(now: NaiveTime) -> ExchangeStatus {
    if now < t(9, 0, 0) {
        ExchangeStatus::Closed
    } else if now < t(9, 15, 0) {
        ExchangeStatus::PreOpen
    } else if now < t(9, 25, 0) {
        ExchangeStatus::CallAuction
    } else if now < t(9, 30, 0) {
        // 9:25~9:30 撮合静默
        ExchangeStatus::Suspend
    } else if now < t(11, 30, 0) {
        ExchangeStatus::Trading
    } else if now < t(13, 0, 0) {
        // 午间休市
        ExchangeStatus::Suspend
    } else if now < t(15, 0, 0) {
        ExchangeStatus::Trading
    } else if now < t(16, 0, 0) {
        ExchangeStatus::PostClose
    } else {
        ExchangeStatus::Closed
    }
}

/// 早盘开始
pub fn trading_start_time() -> NaiveTime {
    t(9, 30, 0)
}

/// 集合竞价收盘段 9:25~9:30
pub fn in_call_auction_close(now: NaiveTime) -> bool {
    now >= t(9, 25, 0) && now < t(9, 30, 0)
}

/// 尾盘最后半小时 14:30~15:01
pub fn in_tail_market(now: NaiveTime) -> bool {
    now >= t(14, 30, 0) && now <= t(15, 1, 0)
}
