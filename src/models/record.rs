use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::posting::JobPosting;

/// 被平台拦截时写入的失败原因
pub const PLATFORM_BLOCKED: &str = "platform_blocked";

/// 未能匹配到筛选问题答案时的跳过原因
pub const UNRESOLVED_QUESTION: &str = "unresolved question";

/// 投递结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Submitted,
    Skipped,
    Duplicate,
    Failed,
}

impl ApplicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Skipped => "skipped",
            ApplicationStatus::Duplicate => "duplicate",
            ApplicationStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单次投递尝试的记录
///
/// 每轮每个职位只创建一次，创建后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub posting: JobPosting,
    pub timestamp: DateTime<Utc>,
    pub status: ApplicationStatus,
    pub detail: Option<String>,
}

impl ApplicationRecord {
    fn new(posting: JobPosting, status: ApplicationStatus, detail: Option<String>) -> Self {
        Self {
            posting,
            timestamp: Utc::now(),
            status,
            detail,
        }
    }

    pub fn submitted(posting: JobPosting) -> Self {
        Self::new(posting, ApplicationStatus::Submitted, None)
    }

    pub fn skipped(posting: JobPosting, reason: impl Into<String>) -> Self {
        Self::new(posting, ApplicationStatus::Skipped, Some(reason.into()))
    }

    pub fn duplicate(posting: JobPosting) -> Self {
        Self::new(posting, ApplicationStatus::Duplicate, None)
    }

    pub fn failed(posting: JobPosting, detail: impl Into<String>) -> Self {
        Self::new(posting, ApplicationStatus::Failed, Some(detail.into()))
    }

    pub fn blocked(posting: JobPosting) -> Self {
        Self::failed(posting, PLATFORM_BLOCKED)
    }

    /// 是否为平台拦截信号
    pub fn is_blocked(&self) -> bool {
        self.status == ApplicationStatus::Failed && self.detail.as_deref() == Some(PLATFORM_BLOCKED)
    }

    pub fn url(&self) -> &str {
        &self.posting.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApplyMode, Platform};

    fn posting() -> JobPosting {
        JobPosting::new(
            Platform::Indeed,
            "Optimization Engineer",
            "Acme",
            "Toronto, ON",
            "https://ca.indeed.com/viewjob?jk=1",
            ApplyMode::QuickApply,
        )
    }

    #[test]
    fn test_blocked_record() {
        let record = ApplicationRecord::blocked(posting());
        assert!(record.is_blocked());
        assert_eq!(record.status, ApplicationStatus::Failed);
        assert_eq!(record.detail.as_deref(), Some("platform_blocked"));
    }

    #[test]
    fn test_ordinary_failure_is_not_blocked() {
        let record = ApplicationRecord::failed(posting(), "no actionable control at step 2");
        assert!(!record.is_blocked());
    }
}
