use tracing::debug;

use super::{Kind, Rule, RuleError, RuleRegistry, KIND_RULE_BASE, KIND_RULE_F10};
use crate::config::RuleParameter;
use crate::error::AppError;
use crate::factors::QuoteSnapshot;

// 规则错误码, 每组规则预留1000个号段
const ERROR_RULE_F10: i32 = 1000;
const ERROR_RULE_BASE: i32 = 2000;

/// F10基本面规则: 流通股本与开盘换手Z
pub struct RuleF10;

impl Rule for RuleF10 {
    fn kind(&self) -> Kind {
        KIND_RULE_F10
    }
    fn name(&self) -> &str {
        "F10规则"
    }
    fn description(&self) -> &str {
        "流通股本与开盘换手Z约束"
    }
    fn exec(&self, param: &RuleParameter, snapshot: &QuoteSnapshot) -> Result<(), RuleError> {
        if !param.free_capital.contains(snapshot.free_capital) {
            if param.verbose {
                debug!("{}: 流通股本{}亿超出{}", snapshot.security_code, snapshot.free_capital, param.free_capital);
            }
            return Err(RuleError::new(
                ERROR_RULE_F10 + 1,
                format!("流通股本{:.2}亿不在{}内", snapshot.free_capital, param.free_capital),
            ));
        }
        if !param.open_turn_z.contains(snapshot.open_turn_z) {
            return Err(RuleError::new(
                ERROR_RULE_F10 + 2,
                format!("开盘换手Z={:.4}不在{}内", snapshot.open_turn_z, param.open_turn_z),
            ));
        }
        Ok(())
    }
}

/// 基础行情规则: 价格区间 / 开盘涨幅 / 开盘量比
pub struct RuleBase;

impl Rule for RuleBase {
    fn kind(&self) -> Kind {
        KIND_RULE_BASE
    }
    fn name(&self) -> &str {
        "基础规则"
    }
    fn description(&self) -> &str {
        "价格/开盘涨幅/开盘量比门槛"
    }
    fn exec(&self, param: &RuleParameter, snapshot: &QuoteSnapshot) -> Result<(), RuleError> {
        if !param.price.contains(snapshot.price) {
            return Err(RuleError::new(
                ERROR_RULE_BASE + 1,
                format!("现价{:.2}不在{}内", snapshot.price, param.price),
            ));
        }
        if !param.opening_change_rate.contains(snapshot.opening_change_rate) {
            return Err(RuleError::new(
                ERROR_RULE_BASE + 2,
                format!("开盘涨幅{:.2}%不在{}内", snapshot.opening_change_rate, param.opening_change_rate),
            ));
        }
        if !param.open_quantity_ratio.contains(snapshot.open_quantity_ratio) {
            return Err(RuleError::new(
                ERROR_RULE_BASE + 3,
                format!("开盘量比{:.2}不在{}内", snapshot.open_quantity_ratio, param.open_quantity_ratio),
            ));
        }
        Ok(())
    }
}

/// 注册内置规则, 启动时显式调用一次
pub fn register_base_rules(registry: &mut RuleRegistry) -> Result<(), AppError> {
    registry.register(Box::new(RuleF10))?;
    registry.register(Box::new(RuleBase))?;
    Ok(())
}
