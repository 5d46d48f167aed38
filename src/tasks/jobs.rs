use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use super::{
    TaskService, CRON_DEFAULT_INTERVAL, CRON_MARGIN_TRADING, CRON_SYNC_ORDERS_INTERVAL, CRON_TICK_INTERVAL,
    CRON_TRIGGER_INIT, KEY_CRON_MARGIN_TRADING, KEY_CRON_REALTIME_KLINE, KEY_CRON_RESET, KEY_CRON_SYNC_ORDERS,
    KEY_CRON_UPDATE_SNAPSHOT,
};
use crate::app::AppContext;
use crate::error::AppError;
use crate::exchange::ExchangeStatus;
use crate::factors::SecurityHistory;
use crate::market::KlineBar;
use crate::storages;

/// 盘口状态是否处于交易中(连续竞价或集合竞价)
fn is_trading(status: ExchangeStatus) -> bool {
    matches!(status, ExchangeStatus::Trading | ExchangeStatus::CallAuction)
}

/// 注册核心定时任务
pub async fn register_core_jobs(tasks: &TaskService, ctx: Arc<AppContext>) -> Result<(), AppError> {
    // 实时更新快照
    {
        let ctx = Arc::clone(&ctx);
        tasks
            .register(KEY_CRON_UPDATE_SNAPSHOT, CRON_TICK_INTERVAL, move || {
                let ctx = Arc::clone(&ctx);
                async move { job_update_snapshot(ctx).await }
            })
            .await?;
    }
    // 实时更新K线
    {
        let ctx = Arc::clone(&ctx);
        tasks
            .register(KEY_CRON_REALTIME_KLINE, CRON_DEFAULT_INTERVAL, move || {
                let ctx = Arc::clone(&ctx);
                async move { job_realtime_kline(ctx).await }
            })
            .await?;
    }
    // 更新融资融券
    {
        let ctx = Arc::clone(&ctx);
        tasks
            .register(KEY_CRON_MARGIN_TRADING, CRON_MARGIN_TRADING, move || {
                let ctx = Arc::clone(&ctx);
                async move { job_update_margin_trading(ctx).await }
            })
            .await?;
    }
    // 交易日数据缓存重置
    {
        let ctx = Arc::clone(&ctx);
        tasks
            .register(KEY_CRON_RESET, CRON_TRIGGER_INIT, move || {
                let ctx = Arc::clone(&ctx);
                async move { job_global_reset(ctx).await }
            })
            .await?;
    }
    // 盘后同步订单
    {
        let ctx = Arc::clone(&ctx);
        tasks
            .register(KEY_CRON_SYNC_ORDERS, CRON_SYNC_ORDERS_INTERVAL, move || {
                let ctx = Arc::clone(&ctx);
                async move { job_sync_orders(ctx).await }
            })
            .await?;
    }
    Ok(())
}

/// 任务 - 更新快照
pub async fn job_update_snapshot(ctx: Arc<AppContext>) {
    let (update_in_realtime, status) = ctx.calendar.can_update_in_realtime();
    // 交易时间更新数据
    if update_in_realtime && (is_trading(status) || ctx.calendar.check_call_auction_close()) {
        ctx.sync.sync_all_snapshots(&ctx.universe).await;
    }
}

/// 任务 - 实时更新K线(尾盘最后半小时)
pub async fn job_realtime_kline(ctx: Arc<AppContext>) {
    let (update_in_realtime, status) = ctx.calendar.can_update_in_realtime();
    if !(update_in_realtime && is_trading(status) && ctx.calendar.in_tail_market()) {
        debug!("非尾盘交易时段: {:?}", status);
        return;
    }

    let semaphore = Arc::new(Semaphore::new(5));
    let mut handles = Vec::new();
    for code in &ctx.universe {
        let ctx = Arc::clone(&ctx);
        let semaphore = Arc::clone(&semaphore);
        let security_code = code.clone();
        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire().await.expect("信号量已关闭");
            if let Some(tick) = ctx.cache.get(&security_code) {
                if let Err(e) = refresh_kline_from_tick(&ctx, &security_code, &tick) {
                    debug!("更新{}实时K线失败: {}", security_code, e);
                }
            }
        }));
    }
    for handle in handles {
        if let Err(e) = handle.await {
            error!("实时K线任务异常: {}", e);
        }
    }
}

/// 用实时tick刷新当日K线的最后一根
fn refresh_kline_from_tick(
    ctx: &AppContext,
    security_code: &str,
    tick: &crate::market::SnapshotTick,
) -> anyhow::Result<()> {
    let path = ctx.klines.filename(security_code);
    let mut bars: Vec<KlineBar> = if path.exists() {
        storages::load_csv(&path)?
    } else {
        Vec::new()
    };
    let today_bar = KlineBar {
        date: tick.date,
        open: tick.open,
        close: tick.price,
        high: tick.high,
        low: tick.low,
        volume: tick.vol as f64,
        amount: tick.amount,
    };
    match bars.last_mut() {
        Some(last) if last.date == tick.date => *last = today_bar,
        _ => bars.push(today_bar),
    }
    storages::save_csv(&path, &bars)?;
    ctx.klines.invalidate(security_code);
    // 同步重建历史特征, 保证量比分母跟上最新K线
    ctx.history.put(security_code, SecurityHistory::from_kline(&bars));
    Ok(())
}

/// 任务 - 更新融资融券标的
pub async fn job_update_margin_trading(ctx: Arc<AppContext>) {
    // 9点后取上一交易日的两融名单
    let date = ctx.calendar.current_trade_date();
    match ctx.provider.get_margin_trading_list(date).await {
        Ok(list) => {
            info!("更新两融标的: {}条", list.len());
            ctx.margin.init(list);
        }
        Err(e) => error!("获取两融标的失败: {}", e),
    }
}

/// 任务 - 交易日数据缓存重置
pub async fn job_global_reset(ctx: Arc<AppContext>) {
    info!("系统初始化...");
    info!("清理过期的更新状态文件...");
    let today = ctx.calendar.today();
    ctx.dispatcher.order_state().clean_expired(today);
    info!("清理过期的更新状态文件...OK");
    info!("重置系统缓存...");
    ctx.klines.clear();
    ctx.history.clear();
    info!("重置系统缓存...OK");
    info!("系统初始化...OK");
}

/// 任务 - 盘后同步订单与持仓
pub async fn job_sync_orders(ctx: Arc<AppContext>) {
    match ctx.broker.query_positions().await {
        Ok(positions) => info!("同步持仓完成, 共{}条", positions.len()),
        Err(e) => error!("同步持仓失败: {}", e),
    }
}
