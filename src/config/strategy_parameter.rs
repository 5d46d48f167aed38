use serde::{Deserialize, Serialize};

use super::range::{TradingSession, ValueRange};
use crate::exchange;

/// 规则阈值参数, 每条规则Exec时按值传入
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleParameter {
    /// 忽略的规则组(按kind)
    pub ignore_rule_group: Vec<u32>,
    /// 股价范围
    pub price: ValueRange,
    /// 开盘涨幅范围(%)
    pub opening_change_rate: ValueRange,
    /// 开盘换手Z范围
    pub open_turn_z: ValueRange,
    /// 开盘量比范围
    pub open_quantity_ratio: ValueRange,
    /// 流通股本范围(亿股)
    pub free_capital: ValueRange,
    /// 输出规则明细日志
    pub verbose: bool,
}

impl Default for RuleParameter {
    fn default() -> Self {
        Self {
            ignore_rule_group: Vec::new(),
            price: ValueRange::new(2.00, 30.00),
            opening_change_rate: ValueRange::new(-3.00, 5.00),
            open_turn_z: ValueRange::new(0.01, 100.00),
            open_quantity_ratio: ValueRange::new(0.00, 100.00),
            free_capital: ValueRange::new(0.20, 20.00),
            verbose: false,
        }
    }
}

/// 委托下单时机
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeFlag {
    /// 尾盘委托
    Tail,
    /// 盘中tick级委托
    Tick,
}

impl Default for TradeFlag {
    fn default() -> Self {
        TradeFlag::Tail
    }
}

/// 单一策略的交易参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParameter {
    /// 策略编码
    pub code: u64,
    /// 策略名称
    pub name: String,
    /// 是否启用
    pub enable: bool,
    /// 是否允许买入
    pub buy_enable: bool,
    /// 交易时段
    pub session: TradingSession,
    /// 自选证券列表, 为空则全市场扫描
    pub stocks: Vec<String>,
    /// 规则参数
    pub rules: RuleParameter,
    /// 计划买入标的数
    pub total: usize,
    /// 资金权重(0~1)
    pub weight: f64,
    /// 单笔最低费用
    pub fee_min: f64,
    /// 单笔最高费用
    pub fee_max: f64,
    /// 是否忽略两融标的约束
    pub ignore_margin_trading: bool,
    /// 下单时机
    pub flag: TradeFlag,
}

impl Default for StrategyParameter {
    fn default() -> Self {
        Self {
            code: 0,
            name: String::new(),
            enable: false,
            buy_enable: false,
            session: TradingSession::default(),
            stocks: Vec::new(),
            rules: RuleParameter::default(),
            total: 3,
            weight: 0.0,
            fee_min: 5.00,
            fee_max: 500.00,
            ignore_margin_trading: true,
            flag: TradeFlag::Tail,
        }
    }
}

impl StrategyParameter {
    pub fn enable(&self) -> bool {
        self.enable
    }

    pub fn buy_enable(&self) -> bool {
        self.enable && self.buy_enable
    }

    /// 策略的证券候选范围, 未配置自选则取全市场
    pub fn stock_list(&self) -> Vec<String> {
        if self.stocks.is_empty() {
            return exchange::get_stock_code_list();
        }
        self.stocks
            .iter()
            .map(|c| exchange::correct_security_code(c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buy_enable_requires_enable() {
        let mut p = StrategyParameter::default();
        p.buy_enable = true;
        assert!(!p.buy_enable());
        p.enable = true;
        assert!(p.buy_enable());
    }

    #[test]
    fn test_stock_list_corrects_codes() {
        let mut p = StrategyParameter::default();
        p.stocks = vec!["600000".to_string(), "000001".to_string()];
        assert_eq!(p.stock_list(), vec!["sh600000", "sz000001"]);
    }
}
