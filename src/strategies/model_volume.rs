use std::collections::BTreeMap;

use crate::config::RuleParameter;
use crate::factors::QuoteSnapshot;
use crate::market::KlineBar;
use crate::rules::{RuleError, RuleRegistry};

use super::base::general_filter;
use super::{ModelKind, ResultInfo, Strategy, StrategyContext, MODEL_NO8};

/// 8号策略: 放量上涨
///
/// 形态要求:
/// 1. 之前是下跌趋势(收盘价逐日降低)
/// 2. 最近一根K线上涨(收盘价 > 开盘价)
/// 3. 成交量异常放大(当前成交量 > 之前5日均量的5倍)
pub struct ModelVolume;

impl ModelVolume {
    fn is_volume_pattern(bars: &[KlineBar]) -> bool {
        if bars.len() < 10 {
            return false;
        }
        let last = &bars[bars.len() - 1];
        // 最近一根K线上涨
        if last.close <= last.open {
            return false;
        }
        // 之前至少2根K线下跌
        let mut down_count = 0;
        for i in 2..=usize::min(5, bars.len() - 1) {
            let prev = &bars[bars.len() - 1 - i];
            let curr = &bars[bars.len() - i];
            if curr.close < prev.close {
                down_count += 1;
            }
        }
        if down_count < 2 {
            return false;
        }
        // 之前5根K线的平均成交量(不含最新一根)
        let window = &bars[bars.len() - 6..bars.len() - 1];
        let avg_volume: f64 = window.iter().map(|b| b.volume).sum::<f64>() / window.len() as f64;
        avg_volume > 0.0 && last.volume / avg_volume >= 5.0
    }
}

impl Strategy for ModelVolume {
    fn code(&self) -> ModelKind {
        MODEL_NO8
    }

    fn name(&self) -> &str {
        "放量上涨策略"
    }

    fn filter(
        &self,
        rules: &RuleRegistry,
        param: &RuleParameter,
        snapshot: &QuoteSnapshot,
    ) -> Result<(), RuleError> {
        general_filter(rules, param, snapshot)
    }

    fn evaluate(&self, security_code: &str, ctx: &StrategyContext, results: &mut BTreeMap<String, ResultInfo>) {
        let bars = ctx.klines.bars(security_code);
        if !Self::is_volume_pattern(&bars) {
            return;
        }
        let Some(snapshot) = ctx.snapshots.get_strategy_snapshot(security_code) else {
            return;
        };
        let price = snapshot.price;
        results.insert(
            security_code.to_string(),
            ResultInfo {
                code: security_code.to_string(),
                name: snapshot.name.clone(),
                date: snapshot.date,
                buy: price,
                sell: price * 1.12, // 目标涨幅 12%
                rate: 0.00,
                strategy_code: self.code(),
                strategy_name: self.name().to_string(),
            },
        );
    }
}
