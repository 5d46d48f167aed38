pub mod app;
pub mod app_config;
pub mod config;
pub mod error;
pub mod exchange;
pub mod factors;
pub mod market;
pub mod rules;
pub mod storages;
pub mod strategies;
pub mod tasks;
pub mod tracker;
pub mod trader;

use dotenv::dotenv;

/// 应用初始化: 加载env + 日志
pub fn app_init() -> anyhow::Result<()> {
    //设置env
    dotenv().ok();
    // 设置日志
    app_config::log::setup_logging()?;
    Ok(())
}

pub const ENVIRONMENT_LOCAL: &str = "local";
pub const ENVIRONMENT_DEV: &str = "dev";
pub const ENVIRONMENT_TEST: &str = "test";
pub const ENVIRONMENT_PROD: &str = "prod";
