use std::collections::BTreeMap;

use crate::config::RuleParameter;
use crate::factors::{incremental_moving_average, QuoteSnapshot};
use crate::rules::{RuleError, RuleRegistry};

use super::base::general_filter;
use super::{ModelKind, ResultInfo, Strategy, StrategyContext, MODEL_NO3};

/// 3号策略: 均线多头排列
///
/// 策略逻辑:
/// 1. 均线多头排列(MA5 > MA10 > MA20)
/// 2. 价格在均线上方(Price > MA5)
/// 3. 均线向上发散(MA5 持续上升)
///
/// 均线用实时价并入MA4/MA9/MA19桶增量计算, 即当日口径的MA5/MA10/MA20。
pub struct ModelMaBull;

impl Strategy for ModelMaBull {
    fn code(&self) -> ModelKind {
        MODEL_NO3
    }

    fn name(&self) -> &str {
        "均线多头排列策略"
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
        // 1. 历史均线桶
        let Some(history) = ctx.history.get(security_code) else {
            return;
        };
        // 2. 策略快照
        let Some(snapshot) = ctx.snapshots.get_strategy_snapshot(security_code) else {
            return;
        };

        // 3. 计算增量均线
        let ma5 = incremental_moving_average(history.ma4, 5, snapshot.price);
        let ma10 = incremental_moving_average(history.ma9, 10, snapshot.price);
        let ma20 = incremental_moving_average(history.ma19, 20, snapshot.price);

        // 4. 均线多头排列: MA5 > MA10 > MA20
        let is_bull_alignment = ma5 > ma10 && ma10 > ma20;

        // 5. 价格在均线上方: Price > MA5
        let is_price_above_ma5 = snapshot.price > ma5;

        // 6. 前一日MA5, 判断均线是否向上发散
        let bars = ctx.klines.bars(security_code);
        if bars.len() < 6 {
            return;
        }
        // 去掉最新一根后取5日收盘均值
        let window = &bars[bars.len() - 6..bars.len() - 1];
        let prev_ma5: f64 = window.iter().map(|b| b.close).sum::<f64>() / window.len() as f64;

        // 7. MA5是否上升
        let is_ma5_rising = ma5 > prev_ma5;

        if is_bull_alignment && is_price_above_ma5 && is_ma5_rising {
            let price = snapshot.price;
            results.insert(
                security_code.to_string(),
                ResultInfo {
                    code: security_code.to_string(),
                    name: snapshot.name.clone(),
                    date: snapshot.date,
                    buy: price,
                    sell: price * 1.10, // 目标涨幅 10%
                    rate: 0.00,
                    strategy_code: self.code(),
                    strategy_name: self.name().to_string(),
                },
            );
        }
    }
}
