use crate::models::profile::ApplicantProfile;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

/// 从 TOML 文件加载申请人档案
pub async fn load_profile(toml_file_path: &Path) -> Result<ApplicantProfile> {
    if !toml_file_path.exists() {
        anyhow::bail!("档案文件不存在: {}", toml_file_path.display());
    }

    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取TOML文件: {}", toml_file_path.display()))?;

    let profile = parse_profile(&content)
        .with_context(|| format!("无法解析TOML文件: {}", toml_file_path.display()))?;

    tracing::info!(
        "成功加载档案: {} 条答案规则, {} 个职位 × {} 个地点",
        profile.answers.len(),
        profile.search.titles.len(),
        profile.search.locations.len()
    );

    Ok(profile)
}

/// 解析档案内容并校验
pub fn parse_profile(content: &str) -> Result<ApplicantProfile> {
    let profile: ApplicantProfile = toml::from_str(content)?;

    if let Some(rule) = profile.answers.iter().find(|r| r.pattern.trim().is_empty()) {
        anyhow::bail!("答案规则的 pattern 不能为空 (answer = {:?})", rule.answer);
    }
    if profile.search.titles.is_empty() {
        tracing::warn!("档案中没有配置搜索职位，本进程不会产生任何投递");
    }

    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DefaultStance;

    const SAMPLE: &str = r#"
resume_path = "resume.pdf"
default_stance = "no"

[contact]
first_name = "Ada"
last_name = "Lovelace"
city = "Toronto"

[search]
titles = ["Optimization Engineer", "Applied Scientist"]
locations = ["Toronto, ON", "Remote"]

[[answers]]
pattern = "sponsorship"
answer = "No"

[[answers]]
pattern = "relocate"
answer = "Yes"
"#;

    #[test]
    fn test_parse_profile_keeps_rule_order() {
        let profile = parse_profile(SAMPLE).unwrap();
        assert_eq!(profile.answers.len(), 2);
        assert_eq!(profile.answers[0].pattern, "sponsorship");
        assert_eq!(profile.answers[1].pattern, "relocate");
        assert_eq!(profile.default_stance, DefaultStance::No);
        assert_eq!(profile.search.titles.len(), 2);
        assert_eq!(profile.contact.city, "Toronto");
    }

    #[test]
    fn test_parse_profile_rejects_blank_pattern() {
        let content = format!("{}\n[[answers]]\npattern = \"  \"\nanswer = \"x\"\n", SAMPLE);
        assert!(parse_profile(&content).is_err());
    }

    #[tokio::test]
    async fn test_load_profile_missing_file() {
        let result = load_profile(Path::new("definitely/not/here.toml")).await;
        assert!(result.is_err());
    }
}
