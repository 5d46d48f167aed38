use std::process::ExitCode;
use std::sync::Arc;

use tracing::error;

use xquant::app::bootstrap;
use xquant::config;
use xquant::factors::OpKind;

fn usage() {
    println!("用法: xquant <command> [args]");
    println!("  tracker <策略编码>...    盘中跟踪指定策略, --debug 非交易时段也执行");
    println!("  scan <策略编码>...       盘后选股, 评估并落盘信号");
    println!("  update [数据集]...       更新基础/特征数据");
    println!("  repair [数据集]...       修复基础/特征数据");
    println!("  list                     列出已注册策略与规则");
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = xquant::app_init() {
        eprintln!("初始化失败: {}", e);
        return ExitCode::FAILURE;
    }

    // 配置错误致命, 非零退出
    let config = match config::load() {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(|s| s.as_str()) else {
        usage();
        return ExitCode::SUCCESS;
    };

    // 行情数据源与交易通道由网关接入层注入, 未接入时视为启动失败
    let (provider, broker) = match bootstrap::connect_gateways(&config) {
        Ok(pair) => pair,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let ctx = match bootstrap::build_context(config, provider, broker) {
        Ok(ctx) => Arc::new(ctx),
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match command {
        "tracker" => {
            let is_debug = args.iter().any(|a| a == "--debug")
                || xquant::app_config::env::env_is_true("XQUANT_DEBUG", false);
            let codes: Vec<u64> = args[1..]
                .iter()
                .filter_map(|a| a.parse().ok())
                .collect();
            bootstrap::run_tracker(ctx, codes, is_debug).await
        }
        "scan" => {
            let codes: Vec<u64> = args[1..].iter().filter_map(|a| a.parse().ok()).collect();
            bootstrap::run_scan(ctx, codes).await
        }
        "update" => bootstrap::run_update(ctx, OpKind::Update, args[1..].to_vec()).await,
        "repair" => bootstrap::run_update(ctx, OpKind::Repair, args[1..].to_vec()).await,
        "list" => {
            println!("策略列表:");
            print!("{}", ctx.strategies.usage_strategy_list());
            println!("规则列表:");
            print!("{}", ctx.rules.usage_list());
            Ok(())
        }
        _ => {
            usage();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
