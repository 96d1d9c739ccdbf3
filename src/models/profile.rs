use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 申请人联系方式
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactInfo {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state_province: String,
    #[serde(default)]
    pub country: String,
}

impl ContactInfo {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// 一条筛选问题规则：问题中包含 `pattern` 时回答 `answer`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRule {
    pub pattern: String,
    pub answer: String,
}

impl AnswerRule {
    pub fn new(pattern: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            answer: answer.into(),
        }
    }
}

/// 是/否 问题未匹配时的默认立场
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultStance {
    #[default]
    Yes,
    No,
}

impl DefaultStance {
    pub fn answer(self) -> &'static str {
        match self {
            DefaultStance::Yes => "Yes",
            DefaultStance::No => "No",
        }
    }
}

/// 搜索计划：职位名称 × 地点
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchPlan {
    pub titles: Vec<String>,
    pub locations: Vec<String>,
}

/// 地点偏好
#[derive(Debug, Clone)]
pub struct LocationBias {
    pub enabled: bool,
    pub preferred: String,
    pub prefer_remote: bool,
}

impl SearchPlan {
    /// 按地点偏好排序后的地点列表
    ///
    /// 开启时：首选地点 → Remote（若偏好远程）→ 其余按原顺序
    pub fn ordered_locations(&self, bias: &LocationBias) -> Vec<String> {
        if !bias.enabled {
            return self.locations.clone();
        }

        let mut ordered: Vec<String> = Vec::with_capacity(self.locations.len() + 1);
        let mut push_unique = |loc: &str| {
            if !loc.trim().is_empty() && !ordered.iter().any(|l| l.eq_ignore_ascii_case(loc)) {
                ordered.push(loc.to_string());
            }
        };

        push_unique(&bias.preferred);
        if bias.prefer_remote {
            push_unique("Remote");
        }
        for loc in &self.locations {
            push_unique(loc);
        }
        ordered
    }
}

/// 申请人档案
///
/// 进程启动时加载一次，之后只读
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicantProfile {
    pub contact: ContactInfo,
    #[serde(default)]
    pub resume_path: Option<PathBuf>,
    /// 有序规则表，越具体的规则越靠前，先匹配先得
    #[serde(default)]
    pub answers: Vec<AnswerRule>,
    #[serde(default)]
    pub default_stance: DefaultStance,
    #[serde(default)]
    pub search: SearchPlan,
}

impl ApplicantProfile {
    /// 用运行时配置补全档案中留空的字段
    pub fn with_overrides(
        mut self,
        phone: Option<&str>,
        email: Option<&str>,
        resume_path: Option<&PathBuf>,
    ) -> Self {
        if self.contact.phone.is_empty() {
            if let Some(phone) = phone.filter(|p| !p.is_empty()) {
                self.contact.phone = phone.to_string();
            }
        }
        if self.contact.email.is_empty() {
            if let Some(email) = email.filter(|e| !e.is_empty()) {
                self.contact.email = email.to_string();
            }
        }
        if let Some(path) = resume_path {
            self.resume_path = Some(path.clone());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> SearchPlan {
        SearchPlan {
            titles: vec!["Applied Scientist".into()],
            locations: vec![
                "Canada".into(),
                "Remote".into(),
                "Toronto, ON".into(),
                "India".into(),
            ],
        }
    }

    #[test]
    fn test_locations_unchanged_without_bias() {
        let bias = LocationBias {
            enabled: false,
            preferred: "Toronto, ON".into(),
            prefer_remote: true,
        };
        assert_eq!(plan().ordered_locations(&bias), plan().locations);
    }

    #[test]
    fn test_locations_with_bias() {
        let bias = LocationBias {
            enabled: true,
            preferred: "Toronto, ON".into(),
            prefer_remote: true,
        };
        assert_eq!(
            plan().ordered_locations(&bias),
            vec!["Toronto, ON", "Remote", "Canada", "India"]
        );
    }

    #[test]
    fn test_preferred_location_added_when_missing() {
        let bias = LocationBias {
            enabled: true,
            preferred: "Vancouver, BC".into(),
            prefer_remote: false,
        };
        let ordered = plan().ordered_locations(&bias);
        assert_eq!(ordered[0], "Vancouver, BC");
        assert_eq!(ordered.len(), 5);
    }

    #[test]
    fn test_overrides_only_fill_blanks() {
        let profile = ApplicantProfile {
            contact: ContactInfo {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                phone: "555-0100".into(),
                ..Default::default()
            },
            resume_path: None,
            answers: Vec::new(),
            default_stance: DefaultStance::Yes,
            search: SearchPlan::default(),
        }
        .with_overrides(Some("555-9999"), Some("ada@example.com"), None);

        assert_eq!(profile.contact.phone, "555-0100");
        assert_eq!(profile.contact.email, "ada@example.com");
        assert_eq!(profile.contact.full_name(), "Ada Lovelace");
    }
}
