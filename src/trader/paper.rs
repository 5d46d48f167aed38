use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use super::{Broker, Direction, Position, PriceType, TradeFee};
use crate::config::StrategyParameter;
use crate::exchange;

/// 每手股数
const LOT_SIZE: i64 = 100;
/// 买入申报价格笼子: 基准价的102%
const BUY_PRICE_CAGE_RATIO: f64 = 1.02;

/// 模拟委托记录
#[derive(Debug, Clone)]
pub struct PaperOrder {
    pub order_id: i64,
    pub direction: Direction,
    pub strategy_code: u64,
    pub security_code: String,
    pub price: f64,
    pub volume: i64,
}

/// 纸面交易通道
///
/// 调试与联调用: 委托只入内存账本, 资金核算与价格笼子按真实规则走。
pub struct PaperBroker {
    /// 可用资金, 元
    init_funds: f64,
    next_order_id: AtomicI64,
    orders: Mutex<Vec<PaperOrder>>,
}

impl PaperBroker {
    pub fn new(init_funds: f64) -> Self {
        Self {
            init_funds,
            next_order_id: AtomicI64::new(1),
            orders: Mutex::new(Vec::new()),
        }
    }

    /// 已提交的模拟委托
    pub fn orders(&self) -> Vec<PaperOrder> {
        self.orders.lock().expect("模拟账本锁中毒").clone()
    }
}

#[async_trait]
impl Broker for PaperBroker {
    async fn place(
        &self,
        direction: Direction,
        strategy_code: u64,
        strategy_name: &str,
        security_code: &str,
        _price_type: PriceType,
        price: f64,
        volume: i64,
    ) -> Result<i64> {
        let order_id = self.next_order_id.fetch_add(1, Ordering::SeqCst);
        self.orders.lock().expect("模拟账本锁中毒").push(PaperOrder {
            order_id,
            direction,
            strategy_code,
            security_code: security_code.to_string(),
            price,
            volume,
        });
        info!(
            "[paper] {}[{}] {} {} {}股 @{:.2}, 订单ID={}",
            strategy_name,
            strategy_code,
            direction.as_str(),
            security_code,
            volume,
            price,
            order_id
        );
        Ok(order_id)
    }

    fn permits_buy(&self, _security_code: &str) -> bool {
        true
    }

    async fn query_positions(&self) -> Result<Vec<Position>> {
        let orders = self.orders.lock().expect("模拟账本锁中毒");
        Ok(orders
            .iter()
            .filter(|o| o.direction == Direction::Buy)
            .map(|o| Position {
                security_code: o.security_code.clone(),
                volume: o.volume,
                available_volume: 0, // T+1
                cost_price: o.price,
            })
            .collect())
    }

    fn compute_single_target_funds(&self, count: usize, weight: f64, fee_max: f64, fee_min: f64) -> f64 {
        if count == 0 || weight <= 0.0 {
            return 0.0;
        }
        let funds = self.init_funds * weight / count as f64;
        let funds = funds - fee_max.max(fee_min);
        funds.max(0.0)
    }

    fn calculate_price_cage(&self, _param: &StrategyParameter, direction: Direction, price: f64) -> f64 {
        match direction {
            Direction::Buy => {
                let caged = price * BUY_PRICE_CAGE_RATIO;
                (caged * 100.0).round() / 100.0
            }
            Direction::Sell => price,
        }
    }

    fn evaluate_fee_for_buy(&self, security_code: &str, funds: f64, price: f64) -> TradeFee {
        if price <= 0.0 || funds <= 0.0 {
            return TradeFee { price, volume: 0 };
        }
        // 涨停价之上无法成交, 委托价夹回涨停价
        let (limit_up, _) = exchange::price_limit(security_code, price);
        let price = price.min(limit_up);
        let lots = (funds / price / LOT_SIZE as f64).floor() as i64;
        TradeFee {
            price,
            volume: lots * LOT_SIZE,
        }
    }
}
