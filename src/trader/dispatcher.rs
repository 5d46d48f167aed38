use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{error, info};

use super::{Broker, Direction, PriceType, INVALID_FEE, INVALID_VOLUME};
use crate::config::{StrategyParameter, TradeFlag};
use crate::exchange::Calendar;
use crate::storages::order_state::OrderStateStore;
use crate::storages::stock_pool::{StockPool, STRATEGY_ORDER_FAILED, STRATEGY_ORDER_PLACED, STRATEGY_ORDER_SUCCEEDED};
use crate::strategies::Strategy;

/// 委托派发器
///
/// 从股票池可买条目出发, 做配额/资金/价格笼子/可买数量核算,
/// 提交锁先于券商调用落盘, 崩溃重放不会二次提交。
pub struct OrderDispatcher {
    broker: Arc<dyn Broker>,
    order_state: OrderStateStore,
    calendar: Arc<Calendar>,
}

impl OrderDispatcher {
    pub fn new(broker: Arc<dyn Broker>, order_state: OrderStateStore, calendar: Arc<Calendar>) -> Self {
        Self { broker, order_state, calendar }
    }

    pub fn order_state(&self) -> &OrderStateStore {
        &self.order_state
    }

    /// 买入检查与下单
    ///
    /// 同一策略当日的已提交数不超过param.total。
    pub async fn check_order_for_buy(
        &self,
        pool: &mut [StockPool],
        strategy: &dyn Strategy,
        param: &StrategyParameter,
        trade_date: NaiveDate,
    ) {
        // 1. 基础校验: 交易日 / 买入开关 / 交易时段
        if !self.calendar.is_trading_day(trade_date) {
            error!("{}[{}]: 非交易日, 跳过买入检查", strategy.name(), strategy.code());
            return;
        }
        if !param.buy_enable() {
            error!("{}[{}]: 买入未启用, 跳过买入检查", strategy.name(), strategy.code());
            return;
        }
        if !param.session.is_trading(self.calendar.now().time()) {
            error!("{}[{}]: 非交易时段, 跳过买入检查", strategy.name(), strategy.code());
            return;
        }

        // 2. 剩余配额
        let direction = Direction::Buy;
        let max_buy_total = param.total;
        let bought_count = self
            .order_state
            .count_strategy_orders(trade_date, strategy.code(), direction);
        if bought_count >= max_buy_total {
            info!(
                "{}[{}]: 买入配额已用完(计划{}, 已完成{})",
                strategy.name(),
                strategy.code(),
                max_buy_total,
                bought_count
            );
            return;
        }

        // 3. 筛选可买入标的
        let mut target_indexes: Vec<usize> = Vec::new();
        for (i, v) in pool.iter().enumerate() {
            if v.date != trade_date || v.strategy_code != strategy.code() || v.order_status != 1 {
                continue;
            }
            if v.status & STRATEGY_ORDER_PLACED != 0 {
                continue;
            }
            if self
                .order_state
                .check_order_state(trade_date, strategy.code(), &v.code, direction)
            {
                info!("{}[{}]: 标的{}已买入, 跳过", strategy.name(), strategy.code(), v.code);
                continue;
            }
            if !self.broker.permits_buy(&v.code) {
                info!("{}[{}]: 标的{}被禁止买入, 跳过", strategy.name(), strategy.code(), v.code);
                continue;
            }
            target_indexes.push(i);
        }

        // 4. 单标的可用资金
        // tick级订单按策略配额核定; 尾盘订单按实际可买数量核定
        let is_tick_order = param.flag == TradeFlag::Tick;
        let quota_for_targets = if is_tick_order { max_buy_total } else { target_indexes.len() };
        if quota_for_targets < 1 {
            info!("{}[{}]: 无符合条件的买入标的, 跳过", strategy.name(), strategy.code());
            return;
        }
        let single_funds =
            self.broker
                .compute_single_target_funds(quota_for_targets, param.weight, param.fee_max, param.fee_min);
        if single_funds <= INVALID_FEE {
            error!("{}[{}]: 单标的可用资金为0, 跳过", strategy.name(), strategy.code());
            return;
        }

        // 5. 逐标的下单
        let mut completed_count = bought_count;
        for i in target_indexes {
            if completed_count >= max_buy_total {
                break;
            }
            let security_code = pool[i].code.clone();

            // 提交锁先落盘, 防止重复下单
            if let Err(e) = self
                .order_state
                .push_order_state(trade_date, strategy.code(), &security_code, direction)
            {
                error!(
                    "{}[{}]: 标的{}订单状态推送失败: {}, 跳过",
                    strategy.name(),
                    strategy.code(),
                    security_code,
                    e
                );
                continue;
            }

            // 价格笼子
            let buy_price = self.broker.calculate_price_cage(param, direction, pool[i].buy);
            // 费用与可买数量核算
            let trade_fee = self.broker.evaluate_fee_for_buy(&security_code, single_funds, buy_price);
            if trade_fee.volume <= INVALID_VOLUME {
                error!("{}[{}]: 标的{}可买数量为0, 跳过", strategy.name(), strategy.code(), security_code);
                continue;
            }

            match self
                .broker
                .place(
                    direction,
                    strategy.code(),
                    strategy.name(),
                    &security_code,
                    PriceType::FixPrice,
                    trade_fee.price,
                    trade_fee.volume,
                )
                .await
            {
                Ok(order_id) if order_id >= 0 => {
                    pool[i].status |= STRATEGY_ORDER_SUCCEEDED | STRATEGY_ORDER_PLACED;
                    pool[i].order_id = order_id;
                    completed_count += 1;
                    info!(
                        "{}[{}]: 标的{}下单成功, 订单ID: {}",
                        strategy.name(),
                        strategy.code(),
                        security_code,
                        order_id
                    );
                }
                Ok(order_id) => {
                    pool[i].status |= STRATEGY_ORDER_FAILED;
                    error!("{}[{}]: 标的{}下单失败, 非法订单ID: {}", strategy.name(), strategy.code(), security_code, order_id);
                }
                Err(e) => {
                    pool[i].status |= STRATEGY_ORDER_FAILED;
                    error!("{}[{}]: 标的{}下单失败: {}", strategy.name(), strategy.code(), security_code, e);
                }
            }
        }
    }
}
