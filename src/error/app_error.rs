use thiserror::Error;

/// 应用错误
#[derive(Error, Debug)]
pub enum AppError {
    /// 业务错误
    #[error("业务错误: {0}")]
    BizError(String),

    /// 配置错误, 启动阶段遇到视为致命
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 行情数据源错误
    #[error("行情数据源错误: {0}")]
    ProviderError(String),

    /// 交易通道错误
    #[error("交易通道错误: {0}")]
    BrokerError(String),

    /// 对象已存在
    #[error("已存在: {0}")]
    AlreadyExists(String),

    /// 对象不存在
    #[error("不存在: {0}")]
    NotFound(String),

    /// 未知错误
    #[error("未知错误: {0}")]
    Unknown(String),
}

/// RPC/CLI边界的结构化错误, 携带HTTP风格状态码
#[derive(Error, Debug, Clone)]
#[error("Code: {code}, Message: {message}, Param: {param}")]
pub struct ApiError {
    pub code: String,
    pub message: String,
    pub param: String,
    pub status_code: u16,
}

impl ApiError {
    pub fn invalid_parameter(field: &str, reason: &str) -> Self {
        Self {
            code: "InvalidParameter".to_string(),
            message: format!(
                "The parameter `{}` specified in the request is not valid: {}",
                field, reason
            ),
            param: field.to_string(),
            status_code: 400,
        }
    }

    pub fn authentication_error() -> Self {
        Self {
            code: "AuthenticationError".to_string(),
            message: "The API key in the request is missing or invalid".to_string(),
            param: String::new(),
            status_code: 401,
        }
    }

    pub fn access_denied() -> Self {
        Self {
            code: "AccessDenied".to_string(),
            message: "The request failed because you do not have access to the requested resource"
                .to_string(),
            param: String::new(),
            status_code: 403,
        }
    }

    pub fn internal_service_error() -> Self {
        Self {
            code: "InternalServiceError".to_string(),
            message: "The service encountered an unexpected internal error".to_string(),
            param: String::new(),
            status_code: 500,
        }
    }

    pub fn http_status_code(&self) -> u16 {
        self.status_code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_codes() {
        let e = ApiError::invalid_parameter("strategy_code", "必须为正整数");
        assert_eq!(e.code, "InvalidParameter");
        assert_eq!(e.http_status_code(), 400);
        assert_eq!(ApiError::authentication_error().http_status_code(), 401);
        assert_eq!(ApiError::access_denied().http_status_code(), 403);
        assert_eq!(ApiError::internal_service_error().http_status_code(), 500);
    }
}
