use chrono::{DateTime, Utc};
use serde::Serialize;

use super::posting::Platform;
use super::record::{ApplicationRecord, ApplicationStatus};

/// 平台提前停止的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HaltReason {
    /// 达到单轮投递上限
    CapReached,
    /// 平台出现拦截信号
    Blocked,
    /// 去重账本无法写入
    LedgerUnavailable,
}

impl HaltReason {
    pub fn as_str(self) -> &'static str {
        match self {
            HaltReason::CapReached => "cap_reached",
            HaltReason::Blocked => "platform_blocked",
            HaltReason::LedgerUnavailable => "ledger_unavailable",
        }
    }
}

/// 单个平台的本轮统计
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformCounts {
    pub platform: Platform,
    pub submitted: usize,
    pub skipped: usize,
    pub duplicate: usize,
    pub failed: usize,
    /// 登录失败说明，存在时该平台本轮没有任何职位
    pub auth_failure: Option<String>,
    pub halted: Option<HaltReason>,
}

impl PlatformCounts {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            submitted: 0,
            skipped: 0,
            duplicate: 0,
            failed: 0,
            auth_failure: None,
            halted: None,
        }
    }

    pub fn count(&mut self, status: ApplicationStatus) {
        match status {
            ApplicationStatus::Submitted => self.submitted += 1,
            ApplicationStatus::Skipped => self.skipped += 1,
            ApplicationStatus::Duplicate => self.duplicate += 1,
            ApplicationStatus::Failed => self.failed += 1,
        }
    }

    /// 计入投递上限的记录数
    pub fn capped_attempts(&self) -> usize {
        self.submitted + self.failed + self.duplicate
    }
}

/// 单轮汇总，仅在内存中传递
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub platforms: Vec<PlatformCounts>,
    pub total_applied: usize,
}

impl CycleSummary {
    pub fn begin(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            platforms: Vec::new(),
            total_applied: 0,
        }
    }

    pub fn push(&mut self, counts: PlatformCounts) {
        self.total_applied += counts.submitted;
        self.platforms.push(counts);
    }

    pub fn finish(mut self, finished_at: DateTime<Utc>) -> Self {
        self.finished_at = finished_at;
        self
    }

    pub fn platform(&self, platform: Platform) -> Option<&PlatformCounts> {
        self.platforms.iter().find(|p| p.platform == platform)
    }

    pub fn total_failed(&self) -> usize {
        self.platforms.iter().map(|p| p.failed).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.platforms.iter().map(|p| p.skipped).sum()
    }

    pub fn total_duplicate(&self) -> usize {
        self.platforms.iter().map(|p| p.duplicate).sum()
    }

    /// 没有投递也没有失败时无需通知
    pub fn is_noteworthy(&self) -> bool {
        self.total_applied > 0 || self.total_failed() > 0
    }
}

/// 一轮的完整产出
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub summary: CycleSummary,
    pub records: Vec<ApplicationRecord>,
}
