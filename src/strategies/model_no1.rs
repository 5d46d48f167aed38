use std::collections::BTreeMap;

use crate::config::RuleParameter;
use crate::factors::QuoteSnapshot;
use crate::rules::{RuleError, RuleRegistry};

use super::base::{chain_filters, general_filter};
use super::{ModelKind, ResultInfo, SortedStatus, Strategy, StrategyContext, MODEL_NO1, ORDER_FLAG_TICK};

/// 1号策略: 竞价抢筹
///
/// 盯集合竞价的承接意愿: 开盘量比和开盘换手Z双高, 且竞价买方占优。
/// tick级委托, 开盘后越早成交越好。
pub struct ModelNo1;

const NO1_ERROR_BASE: i32 = 10_000;

fn no1_gate(
    _rules: &RuleRegistry,
    _param: &RuleParameter,
    snapshot: &QuoteSnapshot,
) -> Result<(), RuleError> {
    // 竞价买方占优
    if snapshot.open_bidding_direction <= 0 {
        return Err(RuleError::new(NO1_ERROR_BASE + 1, "竞价卖方占优"));
    }
    // 开盘量比过低说明承接不足
    if snapshot.open_quantity_ratio < 3.0 {
        return Err(RuleError::new(
            NO1_ERROR_BASE + 2,
            format!("开盘量比{:.2}不足3倍", snapshot.open_quantity_ratio),
        ));
    }
    Ok(())
}

impl Strategy for ModelNo1 {
    fn code(&self) -> ModelKind {
        MODEL_NO1
    }

    fn name(&self) -> &str {
        "1号策略"
    }

    fn order_flag(&self) -> &str {
        ORDER_FLAG_TICK
    }

    fn filter(
        &self,
        rules: &RuleRegistry,
        param: &RuleParameter,
        snapshot: &QuoteSnapshot,
    ) -> Result<(), RuleError> {
        chain_filters(&[general_filter, no1_gate], rules, param, snapshot)
    }

    fn sort(&self, _snapshots: &mut [QuoteSnapshot]) -> SortedStatus {
        SortedStatus::Default
    }

    fn evaluate(&self, security_code: &str, ctx: &StrategyContext, results: &mut BTreeMap<String, ResultInfo>) {
        let Some(snapshot) = ctx.snapshots.get_strategy_snapshot(security_code) else {
            return;
        };
        if snapshot.open_quantity_ratio < 3.0 || snapshot.open_bidding_direction <= 0 {
            return;
        }
        let price = snapshot.price;
        results.insert(
            security_code.to_string(),
            ResultInfo {
                code: security_code.to_string(),
                name: snapshot.name.clone(),
                date: snapshot.date,
                buy: price,
                sell: price * 1.05, // 目标涨幅 5%
                rate: snapshot.change_rate,
                strategy_code: self.code(),
                strategy_name: self.name().to_string(),
            },
        );
    }
}
