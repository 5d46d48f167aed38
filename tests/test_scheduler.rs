//! 调度服务: 不重叠执行 / 重名拒绝 / 配置开关

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use xquant::config::{JobParameter, XquantConfig};
use xquant::tasks::TaskService;

fn config_with_jobs(jobs: Vec<JobParameter>) -> Arc<XquantConfig> {
    let mut config = XquantConfig::default();
    config.jobs = jobs;
    Arc::new(config)
}

/// 任务耗时超过周期时不并发执行, 到点的触发排队等待
#[tokio::test]
async fn test_job_never_overlaps_itself() {
    let tasks = TaskService::new(config_with_jobs(Vec::new())).await.expect("调度器");

    let running = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));
    let runs = Arc::new(AtomicUsize::new(0));

    let (running_c, max_c, runs_c) = (Arc::clone(&running), Arc::clone(&max_seen), Arc::clone(&runs));
    tasks
        .register("slow_job", "@every 1s", move || {
            let running = Arc::clone(&running_c);
            let max_seen = Arc::clone(&max_c);
            let runs = Arc::clone(&runs_c);
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                // 运行时长超过触发周期
                tokio::time::sleep(Duration::from_millis(1500)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                runs.fetch_add(1, Ordering::SeqCst);
            }
        })
        .await
        .expect("注册任务");

    tasks.start().await.expect("启动调度器");
    tokio::time::sleep(Duration::from_millis(4500)).await;
    tasks.shutdown().await;

    assert!(runs.load(Ordering::SeqCst) >= 2, "任务应执行多次");
    assert_eq!(max_seen.load(Ordering::SeqCst), 1, "同一任务不得并发执行");
}

#[tokio::test]
async fn test_duplicate_name_rejected() {
    let tasks = TaskService::new(config_with_jobs(Vec::new())).await.expect("调度器");
    tasks.register("job_a", "@every 10s", || async {}).await.expect("首次注册");
    let result = tasks.register("job_a", "@every 10s", || async {}).await;
    assert!(result.is_err(), "同名任务应拒绝");
}

#[tokio::test]
async fn test_disabled_job_not_scheduled() {
    let tasks = TaskService::new(config_with_jobs(vec![JobParameter {
        name: "job_off".to_string(),
        enable: false,
        trigger: String::new(),
    }]))
    .await
    .expect("调度器");

    let fired = Arc::new(AtomicUsize::new(0));
    let fired_c = Arc::clone(&fired);
    tasks
        .register("job_off", "@every 1s", move || {
            let fired = Arc::clone(&fired_c);
            async move {
                fired.fetch_add(1, Ordering::SeqCst);
            }
        })
        .await
        .expect("注册返回Ok但不入调度");

    assert!(tasks.job_list().await.is_empty());
    tasks.start().await.expect("启动调度器");
    tokio::time::sleep(Duration::from_millis(2200)).await;
    tasks.shutdown().await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_trigger_override_from_config() {
    let tasks = TaskService::new(config_with_jobs(vec![JobParameter {
        name: "job_fast".to_string(),
        enable: true,
        // 配置覆盖默认的10秒间隔
        trigger: "@every 1s".to_string(),
    }]))
    .await
    .expect("调度器");

    let fired = Arc::new(AtomicUsize::new(0));
    let fired_c = Arc::clone(&fired);
    tasks
        .register("job_fast", "@every 10s", move || {
            let fired = Arc::clone(&fired_c);
            async move {
                fired.fetch_add(1, Ordering::SeqCst);
            }
        })
        .await
        .expect("注册任务");

    tasks.start().await.expect("启动调度器");
    tokio::time::sleep(Duration::from_millis(2500)).await;
    tasks.shutdown().await;
    assert!(fired.load(Ordering::SeqCst) >= 1, "覆盖后的1秒间隔应已触发");
}
