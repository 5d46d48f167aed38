use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use tracing::{error, info};

use crate::config::StrategyParameter;
use crate::exchange::{assert_index_by_security_code, correct_security_code};
use crate::storages;
use crate::strategies::{ResultInfo, Strategy, StrategyContext};

/// 执行一轮策略评估(盘后选股路径)
///
/// 逐证券调用Strategy::evaluate, 信号按证券代码有序收集。
pub fn execute_strategy(
    strategy: &dyn Strategy,
    param: &StrategyParameter,
    ctx: &StrategyContext,
) -> Vec<ResultInfo> {
    let mut results: BTreeMap<String, ResultInfo> = BTreeMap::new();
    for code in param.stock_list() {
        let security_code = correct_security_code(&code);
        if assert_index_by_security_code(&security_code) {
            continue;
        }
        strategy.evaluate(&security_code, ctx, &mut results);
    }
    info!("{}[{}]: 评估完成, 信号{}条", strategy.name(), strategy.code(), results.len());
    results.into_values().collect()
}

/// 信号结果文件: quant/<策略编码>/<日期>.csv
pub fn signal_filename(result_path: &PathBuf, strategy_code: u64, date: NaiveDate) -> PathBuf {
    result_path
        .join(strategy_code.to_string())
        .join(format!("{}.csv", date.format("%Y-%m-%d")))
}

/// 落盘信号结果
pub fn save_signals(result_path: &PathBuf, strategy_code: u64, date: NaiveDate, signals: &[ResultInfo]) {
    if signals.is_empty() {
        return;
    }
    let filename = signal_filename(result_path, strategy_code, date);
    if let Err(e) = storages::save_csv(&filename, signals) {
        error!("保存信号结果失败: {}", e);
    }
}
