pub mod dispatcher;
pub mod paper;

pub use dispatcher::OrderDispatcher;
pub use paper::PaperBroker;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::StrategyParameter;

/// 买卖方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "buy",
            Direction::Sell => "sell",
        }
    }
}

/// 报价类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceType {
    /// 限价
    FixPrice,
    /// 市价
    MarketPrice,
}

/// 无效资金
pub const INVALID_FEE: f64 = 0.0;
/// 无效数量
pub const INVALID_VOLUME: i64 = 0;

/// 买入费用核算结果
#[derive(Debug, Clone, Copy)]
pub struct TradeFee {
    /// 调整后的委托价格
    pub price: f64,
    /// 可买数量, 股
    pub volume: i64,
}

/// 持仓
#[derive(Debug, Clone)]
pub struct Position {
    pub security_code: String,
    pub volume: i64,
    pub available_volume: i64,
    pub cost_price: f64,
}

/// 交易通道
///
/// 具体券商网关在引擎之外注入。下单幂等键由调用方(派发器)用
/// (交易日, 策略, 证券, 方向)的提交锁保证, 通道本身不去重。
#[async_trait]
pub trait Broker: Send + Sync {
    /// 委托下单, 成功返回订单ID
    async fn place(
        &self,
        direction: Direction,
        strategy_code: u64,
        strategy_name: &str,
        security_code: &str,
        price_type: PriceType,
        price: f64,
        volume: i64,
    ) -> Result<i64>;

    /// 标的是否允许买入(黑名单/持仓约束)
    fn permits_buy(&self, security_code: &str) -> bool;

    /// 查询持仓
    async fn query_positions(&self) -> Result<Vec<Position>>;

    /// 单标的可用资金
    fn compute_single_target_funds(&self, count: usize, weight: f64, fee_max: f64, fee_min: f64) -> f64;

    /// 价格笼子: 按交易所规则约束委托价
    fn calculate_price_cage(&self, param: &StrategyParameter, direction: Direction, price: f64) -> f64;

    /// 按资金与价格核算可买数量(含费用与每手股数约束)
    fn evaluate_fee_for_buy(&self, security_code: &str, funds: f64, price: f64) -> TradeFee;
}
