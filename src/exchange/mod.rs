pub mod calendar;
pub mod security;
pub mod session;

pub use calendar::{Calendar, Clock, FixedClock, SystemClock};
pub use security::{assert_index_by_security_code, correct_security_code, get_stock_code_list, price_limit};
pub use session::ExchangeStatus;

use chrono::FixedOffset;

/// 东八区偏移, A股所有时间比较均基于北京时间
pub fn cn_offset() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).expect("CST+8 偏移不合法")
}
