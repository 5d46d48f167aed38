pub mod dataset;
pub mod dataset_impl;
pub mod f10;
pub mod history;
pub mod margin_trading;
pub mod quote_snapshot;

pub use dataset::{DataSet, DataSetRegistry, OpKind, PluginKind, PLUGIN_MASK_BASE_DATA, PLUGIN_MASK_FEATURE, PLUGIN_MASK_STRATEGY};
pub use f10::{F10Store, F10};
pub use history::{incremental_moving_average, HistoryCache, KlineStore, SecurityHistory};
pub use margin_trading::MarginTradingTargets;
pub use quote_snapshot::{enrich, QuoteSnapshot, StrategySnapshotService};

/// 涨跌幅: (b-a)/a*100
pub fn net_change_rate(base: f64, current: f64) -> f64 {
    if base == 0.0 {
        return 0.0;
    }
    (current - base) / base * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_net_change_rate() {
        assert!((net_change_rate(10.0, 11.0) - 10.0).abs() < 1e-9);
        assert!((net_change_rate(10.0, 9.0) + 10.0).abs() < 1e-9);
        assert_eq!(net_change_rate(0.0, 1.0), 0.0);
    }
}
