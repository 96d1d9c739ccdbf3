use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 招聘平台
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    /// LinkedIn Easy Apply
    LinkedIn,
    /// Indeed Apply
    Indeed,
}

impl Platform {
    pub fn name(self) -> &'static str {
        match self {
            Platform::LinkedIn => "LinkedIn",
            Platform::Indeed => "Indeed",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "linkedin" => Some(Platform::LinkedIn),
            "indeed" => Some(Platform::Indeed),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 投递方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyMode {
    /// 平台内快速投递（Easy Apply / Indeed Apply）
    QuickApply,
    /// 跳转到公司官网
    External,
    /// 列表页无法判断，打开详情页后再确认
    Unknown,
}

/// 搜索到的职位
///
/// 发现后不可变，`url` 是唯一键
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    pub platform: Platform,
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
    pub apply_mode: ApplyMode,
    pub discovered_at: DateTime<Utc>,
}

impl JobPosting {
    pub fn new(
        platform: Platform,
        title: impl Into<String>,
        company: impl Into<String>,
        location: impl Into<String>,
        url: impl Into<String>,
        apply_mode: ApplyMode,
    ) -> Self {
        Self {
            platform,
            title: title.into(),
            company: company.into(),
            location: location.into(),
            url: url.into(),
            apply_mode,
            discovered_at: Utc::now(),
        }
    }

    /// 日志用的简短描述
    pub fn label(&self) -> String {
        format!("{} @ {}", self.title, self.company)
    }
}
