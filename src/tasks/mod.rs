//! 定时任务调度
//!
//! 基于tokio-cron-scheduler的6位cron(带秒), 另支持 `@every <N>s` 间隔形态。
//! 同名任务重复注册报AlreadyExists; 每个任务外包一把互斥锁,
//! 到点时上一次还没跑完就等待而不是并发执行(延迟不丢弃)。
//! 关停时等待在途任务最多30秒, 超时强制退出。

pub mod jobs;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::XquantConfig;
use crate::error::AppError;

/// 关停宽限期
pub const SHUTDOWN_GRACE_SECS: u64 = 30;

/// 全局重置: 每天9点
pub const CRON_TRIGGER_INIT: &str = "0 0 9 * * *";
/// 默认执行频次
pub const CRON_DEFAULT_INTERVAL: &str = "@every 10s";
/// tick级数据更新频次
pub const CRON_TICK_INTERVAL: &str = "@every 1s";
/// 同步订单: 每交易日15~23点的02分
pub const CRON_SYNC_ORDERS_INTERVAL: &str = "0 2 15-23 * * *";
/// 更新融资融券: 每天9点05分
pub const CRON_MARGIN_TRADING: &str = "0 5 9 * * *";

/// 定时任务关键字
pub const KEY_CRON_RESET: &str = "global_reset";
pub const KEY_CRON_REALTIME_KLINE: &str = "realtime_kline";
pub const KEY_CRON_UPDATE_SNAPSHOT: &str = "update_snapshot";
pub const KEY_CRON_SYNC_ORDERS: &str = "sync_orders";
pub const KEY_CRON_MARGIN_TRADING: &str = "update_rzrq";

/// 调度服务
pub struct TaskService {
    scheduler: Mutex<JobScheduler>,
    jobs: Mutex<HashMap<String, Uuid>>,
    config: Arc<XquantConfig>,
}

impl TaskService {
    pub async fn new(config: Arc<XquantConfig>) -> anyhow::Result<Self> {
        let scheduler = JobScheduler::new().await?;
        Ok(Self {
            scheduler: Mutex::new(scheduler),
            jobs: Mutex::new(HashMap::new()),
            config,
        })
    }

    /// 注册定时任务
    ///
    /// 从配置读取任务开关与自定义触发规则; 被禁用的任务直接跳过(不报错)。
    pub async fn register<F, Fut>(&self, name: &str, spec: &str, callback: F) -> Result<(), AppError>
    where
        F: Fn() -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        {
            let jobs = self.jobs.lock().await;
            if jobs.contains_key(name) {
                return Err(AppError::AlreadyExists(format!("任务{}", name)));
            }
        }

        let mut spec = spec.to_string();
        if let Some(job_param) = self.config.job_parameter(name) {
            if !job_param.enable {
                info!("任务[{}]已被配置禁用", name);
                return Ok(());
            }
            let trigger = job_param.trigger.trim();
            if !trigger.is_empty() {
                spec = trigger.to_string();
            }
        }

        // 任务互斥锁: 到点未跑完则等待, 不并发执行同一任务
        let running = Arc::new(Mutex::new(()));
        let task_name = name.to_string();
        let make_run = move || {
            let running = Arc::clone(&running);
            let callback = callback.clone();
            async move {
                let _guard = running.lock().await;
                callback().await;
            }
        };

        let job = if let Some(interval) = parse_every(&spec) {
            Job::new_repeated_async(interval, move |_uuid, _lock| Box::pin(make_run()))
                .map_err(|e| AppError::BizError(format!("创建间隔任务{}失败: {}", task_name, e)))?
        } else {
            Job::new_async(spec.as_str(), move |_uuid, _lock| Box::pin(make_run()))
                .map_err(|e| AppError::BizError(format!("创建定时任务{}失败: {}", task_name, e)))?
        };

        let job_id = {
            let scheduler = self.scheduler.lock().await;
            scheduler
                .add(job)
                .await
                .map_err(|e| AppError::BizError(format!("添加任务{}到调度器失败: {}", name, e)))?
        };
        self.jobs.lock().await.insert(name.to_string(), job_id);
        info!("任务[{}]注册成功, spec: [{}]", name, spec);
        Ok(())
    }

    /// 启动调度器
    pub async fn start(&self) -> anyhow::Result<()> {
        let scheduler = self.scheduler.lock().await;
        scheduler.start().await?;
        info!("调度器启动成功, 共{}个任务", self.jobs.lock().await.len());
        Ok(())
    }

    /// 优雅关停: 等待在途任务, 超过宽限期放弃
    pub async fn shutdown(&self) {
        info!("关停调度器...");
        let mut scheduler = self.scheduler.lock().await;
        let result = tokio::time::timeout(Duration::from_secs(SHUTDOWN_GRACE_SECS), scheduler.shutdown()).await;
        match result {
            Ok(Ok(())) => info!("在途任务完成, 调度器已停止"),
            Ok(Err(e)) => error!("调度器关停失败: {}", e),
            Err(_) => warn!("调度器关停超时({}秒), 强制退出", SHUTDOWN_GRACE_SECS),
        }
    }

    /// 已注册任务清单
    pub async fn job_list(&self) -> Vec<String> {
        let jobs = self.jobs.lock().await;
        let mut names: Vec<String> = jobs.keys().cloned().collect();
        names.sort();
        names
    }
}

/// 解析 `@every <N>s|<N>m|<N>h` 间隔形态
fn parse_every(spec: &str) -> Option<Duration> {
    let rest = spec.strip_prefix("@every ")?.trim();
    let (value, unit) = rest.split_at(rest.len().checked_sub(1)?);
    let value: u64 = value.parse().ok()?;
    match unit {
        "s" => Some(Duration::from_secs(value)),
        "m" => Some(Duration::from_secs(value * 60)),
        "h" => Some(Duration::from_secs(value * 3600)),
        _ => None,
    }
}
