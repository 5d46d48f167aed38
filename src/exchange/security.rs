/// 证券代码规范化与市场判断
///
/// 统一形态: 小写市场前缀 + 6位数字主体, 如 sh600000 / sz000001。

/// 规范化证券代码, 纯数字按号段推断市场
pub fn correct_security_code(code: &str) -> String {
    let code = code.trim();
    let lower = code.to_ascii_lowercase();
    if lower.len() >= 2 {
        let (prefix, body) = lower.split_at(2);
        if (prefix == "sh" || prefix == "sz" || prefix == "bj") && body.chars().all(|c| c.is_ascii_digit()) {
            return lower;
        }
    }
    // 纯数字, 按号段推断
    if lower.chars().all(|c| c.is_ascii_digit()) && lower.len() == 6 {
        if lower.starts_with('6') || lower.starts_with('5') || lower.starts_with("880") {
            return format!("sh{}", lower);
        }
        return format!("sz{}", lower);
    }
    lower
}

/// 是否指数代码
pub fn assert_index_by_security_code(code: &str) -> bool {
    let code = correct_security_code(code);
    // 上证指数 sh000xxx / 板块 sh880xxx, 深证指数 sz399xxx
    code.starts_with("sh000") || code.starts_with("sh880") || code.starts_with("sz399")
}

/// 代码生成规则: 前缀 + 号段 + 格式化模板
struct CodeRule {
    begin: u32,
    end: u32,
    fmt: fn(u32) -> String,
}

/// 全市场股票代码列表(沪市主板/科创板, 深市主板/中小板/创业板)
pub fn get_stock_code_list() -> Vec<String> {
    static ALL_STOCK_CODES: once_cell::sync::Lazy<Vec<String>> =
        once_cell::sync::Lazy::new(build_stock_code_list);
    ALL_STOCK_CODES.clone()
}

fn build_stock_code_list() -> Vec<String> {
    let rules = [
        // 上海主板
        CodeRule { begin: 600000, end: 609999, fmt: |i| format!("sh{}", i) },
        // 科创板
        CodeRule { begin: 688000, end: 689999, fmt: |i| format!("sh{}", i) },
        // 深圳主板
        CodeRule { begin: 0, end: 999, fmt: |i| format!("sz000{:03}", i) },
        // 中小板
        CodeRule { begin: 1000, end: 9999, fmt: |i| format!("sz00{:04}", i) },
        // 创业板
        CodeRule { begin: 300000, end: 309999, fmt: |i| format!("sz{:06}", i) },
    ];
    let mut codes = Vec::with_capacity(rules.iter().map(|r| (r.end - r.begin + 1) as usize).sum());
    for rule in &rules {
        for i in rule.begin..=rule.end {
            codes.push((rule.fmt)(i));
        }
    }
    codes
}

/// 涨跌幅限制比例
pub fn market_limit(security_code: &str) -> f64 {
    let code = correct_security_code(security_code);
    // 科创板/创业板 20%, 其余 10%
    if code.starts_with("sh688") || code.starts_with("sz300") {
        0.20
    } else {
        0.10
    }
}

fn round_to_2decimal(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// 涨停价与跌停价
pub fn price_limit(security_code: &str, last_close: f64) -> (f64, f64) {
    let rate = market_limit(security_code);
    let limit_up = round_to_2decimal(last_close * (1.0 + rate));
    let limit_down = round_to_2decimal(last_close * (1.0 - rate));
    (limit_up, limit_down)
}
