use std::env;

/// 配置profile选择, 如 conf.local.yaml / conf.prod.yaml
pub const ENV_CONF_ENV: &str = "XQUANT_CONF_ENV";
/// 日志级别覆盖
pub const ENV_LOG_LEVEL: &str = "XQUANT_LOG_LEVEL";

/// 读取布尔型环境变量, 支持 true/1 (大小写不敏感), 未设置时取default
pub fn env_is_true(key: &str, default: bool) -> bool {
    let Ok(value) = env::var(key) else {
        return default;
    };
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1")
}

/// 读取字符串环境变量, 未设置时取default
pub fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}


/// 当前配置profile, 默认local
pub fn conf_env() -> String {
    env_or_default(ENV_CONF_ENV, crate::ENVIRONMENT_LOCAL)
}
