use crate::config::RuleParameter;
use crate::factors::QuoteSnapshot;
use crate::rules::{RuleError, RuleRegistry};

/// 过滤函数类型
pub type FilterFn = fn(&RuleRegistry, &RuleParameter, &QuoteSnapshot) -> Result<(), RuleError>;

/// 通用过滤: 执行全部在册规则
pub fn general_filter(
    rules: &RuleRegistry,
    param: &RuleParameter,
    snapshot: &QuoteSnapshot,
) -> Result<(), RuleError> {
    rules.filter(param, snapshot).into_result()
}

/// 过滤链组合: 依次执行, 第一条失败即短路
pub fn chain_filters(
    filters: &[FilterFn],
    rules: &RuleRegistry,
    param: &RuleParameter,
    snapshot: &QuoteSnapshot,
) -> Result<(), RuleError> {
    for f in filters {
        f(rules, param, snapshot)?;
    }
    Ok(())
}
