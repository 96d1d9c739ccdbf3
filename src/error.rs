//! 错误类型
//!
//! 按作用域划分：
//! - `AuthError` - 平台级，本轮放弃该平台
//! - `SearchQueryError` - 单个 标题×地点 组合级，搜索流继续
//! - `FlowError` - 单个职位级，由状态机折叠为 ApplicationRecord
//! - `AppError` - 进程级，只有调度循环本身的缺陷才会向上传播

use thiserror::Error;

use crate::models::Platform;

/// 登录失败原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// 凭据被拒绝
    CredentialsRejected,
    /// 需要人工验证（验证码 / 二次验证 / checkpoint）
    VerificationRequired,
    /// 请求频率限制
    RateLimited,
    /// 未配置凭据
    MissingCredentials,
    /// 浏览器无法启动或连接
    BrowserUnavailable,
}

impl AuthFailure {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthFailure::CredentialsRejected => "credentials_rejected",
            AuthFailure::VerificationRequired => "verification_required",
            AuthFailure::RateLimited => "rate_limited",
            AuthFailure::MissingCredentials => "missing_credentials",
            AuthFailure::BrowserUnavailable => "browser_unavailable",
        }
    }
}

impl std::fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 登录错误，本轮内不重试
#[derive(Debug, Error)]
#[error("{platform} 登录失败 ({reason}): {detail}")]
pub struct AuthError {
    pub platform: Platform,
    pub reason: AuthFailure,
    pub detail: String,
}

impl AuthError {
    pub fn new(platform: Platform, reason: AuthFailure, detail: impl Into<String>) -> Self {
        Self {
            platform,
            reason,
            detail: detail.into(),
        }
    }
}

/// 单个搜索组合失败
#[derive(Debug, Error)]
#[error("搜索 '{title}' @ '{location}' 失败: {source}")]
pub struct SearchQueryError {
    pub title: String,
    pub location: String,
    #[source]
    pub source: anyhow::Error,
}

/// 投递流程中的终止性错误
#[derive(Debug, Error)]
pub enum FlowError {
    /// 平台出现验证 / 验证码 / 限流信号
    #[error("platform_blocked: {0}")]
    PlatformBlocked(String),
    /// 页面结构与预期不符
    #[error("{0}")]
    Structural(String),
}

impl From<anyhow::Error> for FlowError {
    fn from(err: anyhow::Error) -> Self {
        FlowError::Structural(format!("{:#}", err))
    }
}

/// 应用程序错误
#[derive(Debug, Error)]
pub enum AppError {
    #[error("配置错误: {0}")]
    Config(String),
    #[error("去重账本写入失败: {0}")]
    Ledger(#[source] anyhow::Error),
    #[error("健康检查服务错误: {0}")]
    Health(#[source] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failure_wire_names() {
        assert_eq!(AuthFailure::CredentialsRejected.as_str(), "credentials_rejected");
        assert_eq!(AuthFailure::VerificationRequired.as_str(), "verification_required");
        assert_eq!(AuthFailure::RateLimited.to_string(), "rate_limited");
    }

    #[test]
    fn test_flow_error_from_anyhow_keeps_chain() {
        let err = anyhow::anyhow!("inner").context("outer");
        let flow: FlowError = err.into();
        assert_eq!(flow.to_string(), "outer: inner");
    }
}
