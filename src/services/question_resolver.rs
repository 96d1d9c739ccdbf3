//! 筛选问题解析服务 - 业务能力层
//!
//! 只负责"这道问题该怎么答"，不接触页面
//!
//! ## 匹配顺序
//! 1. 联系方式字段（姓名 / 邮箱 / 电话 / 城市 …），是/否 问题不参与
//! 2. 档案中的有序规则表，先匹配先得
//! 3. 兜底：是/否 → 默认立场；单选 → 最接近的选项或第一个选项；
//!    文本 / 数字 → 无法解析，整个职位跳过

use std::sync::Arc;

use crate::models::{ApplicantProfile, InputShape, Question};

/// 联系方式字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactField {
    FirstName,
    LastName,
    FullName,
    Email,
    Phone,
    City,
    StateProvince,
    Country,
}

/// 联系方式关键词表，顺序即优先级
static CONTACT_KEYWORDS: phf::OrderedMap<&'static str, ContactField> = phf::phf_ordered_map! {
    "first name" => ContactField::FirstName,
    "given name" => ContactField::FirstName,
    "last name" => ContactField::LastName,
    "surname" => ContactField::LastName,
    "family name" => ContactField::LastName,
    "full name" => ContactField::FullName,
    "email" => ContactField::Email,
    "email address" => ContactField::Email,
    "phone" => ContactField::Phone,
    "mobile" => ContactField::Phone,
    "telephone" => ContactField::Phone,
    "cell" => ContactField::Phone,
    "city" => ContactField::City,
    "location city" => ContactField::City,
    "state" => ContactField::StateProvince,
    "province" => ContactField::StateProvince,
    "country" => ContactField::Country,
};

/// 下拉框中的占位选项，永远不会被选中
const PLACEHOLDER_OPTIONS: &[&str] = &["", "select", "select an option", "please select", "choose", "none selected"];

/// 单选兜底时参与比较的关键词最短长度
const MIN_KEYWORD_LEN: usize = 4;

/// 答案来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    Contact(ContactField),
    /// 规则表中的下标
    Rule(usize),
    DefaultStance,
    ClosestOption,
    FirstOption,
}

/// 解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Answer { value: String, source: AnswerSource },
    /// 无法可靠作答，调用方必须放弃整个职位
    Unresolved { question: String },
}

impl Resolution {
    pub fn value(&self) -> Option<&str> {
        match self {
            Resolution::Answer { value, .. } => Some(value),
            Resolution::Unresolved { .. } => None,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Resolution::Unresolved { .. })
    }
}

#[derive(Debug, Clone)]
struct NormalizedRule {
    pattern: String,
    answer: String,
    keywords: Vec<String>,
}

/// 筛选问题解析器
pub struct QuestionResolver {
    profile: Arc<ApplicantProfile>,
    rules: Vec<NormalizedRule>,
}

impl QuestionResolver {
    pub fn new(profile: Arc<ApplicantProfile>) -> Self {
        let rules = profile
            .answers
            .iter()
            .map(|rule| {
                let pattern = normalize(&rule.pattern);
                let keywords = pattern
                    .split(' ')
                    .filter(|w| w.chars().count() >= MIN_KEYWORD_LEN)
                    .map(str::to_string)
                    .collect();
                NormalizedRule {
                    pattern,
                    answer: rule.answer.clone(),
                    keywords,
                }
            })
            .collect();

        Self { profile, rules }
    }

    pub fn profile(&self) -> &ApplicantProfile {
        &self.profile
    }

    /// 解析单个问题
    pub fn resolve(&self, question: &Question) -> Resolution {
        let text = normalize(&question.text);

        if question.shape != InputShape::YesNo {
            if let Some((field, value)) = self.match_contact(&text) {
                return self.coerce(question, &value, AnswerSource::Contact(field));
            }
        }

        if let Some((index, rule)) = self.match_rule(&text) {
            return self.coerce(question, &rule.answer, AnswerSource::Rule(index));
        }

        self.fallback(question, &text)
    }

    fn match_contact(&self, text: &str) -> Option<(ContactField, String)> {
        let contact = &self.profile.contact;
        let (_, field) = CONTACT_KEYWORDS
            .entries()
            .find(|(keyword, _)| contains_words(text, keyword))?;

        let value = match field {
            ContactField::FirstName => contact.first_name.clone(),
            ContactField::LastName => contact.last_name.clone(),
            ContactField::FullName => contact.full_name(),
            ContactField::Email => contact.email.clone(),
            ContactField::Phone => contact.phone.clone(),
            ContactField::City => contact.city.clone(),
            ContactField::StateProvince => contact.state_province.clone(),
            ContactField::Country => contact.country.clone(),
        };

        // 档案里没填的联系方式交给规则表
        if value.trim().is_empty() {
            None
        } else {
            Some((*field, value))
        }
    }

    fn match_rule(&self, text: &str) -> Option<(usize, &NormalizedRule)> {
        self.rules
            .iter()
            .enumerate()
            .find(|(_, rule)| contains_text(text, &rule.pattern))
    }

    /// 把匹配到的答案转换成问题要求的形态
    fn coerce(&self, question: &Question, answer: &str, source: AnswerSource) -> Resolution {
        match &question.shape {
            InputShape::YesNo => match yes_no_of(answer) {
                Some(value) => Resolution::Answer {
                    value: value.to_string(),
                    source,
                },
                None => self.default_stance(),
            },
            InputShape::FreeText => Resolution::Answer {
                value: answer.to_string(),
                source,
            },
            InputShape::Numeric => {
                let trimmed = answer.trim();
                if trimmed.parse::<f64>().is_ok() {
                    Resolution::Answer {
                        value: trimmed.to_string(),
                        source,
                    }
                } else {
                    unresolved(question)
                }
            }
            InputShape::SingleChoice(options) => match pick_option(options, answer) {
                Some(option) => Resolution::Answer {
                    value: option,
                    source,
                },
                None => unresolved(question),
            },
        }
    }

    fn fallback(&self, question: &Question, text: &str) -> Resolution {
        match &question.shape {
            InputShape::YesNo => self.default_stance(),
            InputShape::SingleChoice(options) => {
                let keywords: Vec<&str> = self
                    .rules
                    .iter()
                    .flat_map(|rule| rule.keywords.iter())
                    .filter(|kw| contains_text(text, kw))
                    .map(String::as_str)
                    .collect();

                if !keywords.is_empty() {
                    if let Some(option) = closest_option(options, &keywords) {
                        return Resolution::Answer {
                            value: option,
                            source: AnswerSource::ClosestOption,
                        };
                    }
                }

                match usable_options(options).next() {
                    Some(first) => Resolution::Answer {
                        value: first.clone(),
                        source: AnswerSource::FirstOption,
                    },
                    None => unresolved(question),
                }
            }
            InputShape::FreeText | InputShape::Numeric => unresolved(question),
        }
    }

    fn default_stance(&self) -> Resolution {
        Resolution::Answer {
            value: self.profile.default_stance.answer().to_string(),
            source: AnswerSource::DefaultStance,
        }
    }
}

fn unresolved(question: &Question) -> Resolution {
    Resolution::Unresolved {
        question: question.text.clone(),
    }
}

/// 归一化：小写、去标点、合并空白
pub fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// 规则模式按子串匹配，"degree" 也能命中 "degrees"
fn contains_text(haystack: &str, needle: &str) -> bool {
    !needle.is_empty() && haystack.contains(needle)
}

/// 按整词判断包含关系，两侧都应已归一化
///
/// 联系方式关键词很短（"cell"、"state"），按子串会误中 "excellent"、"statement"
fn contains_words(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    format!(" {} ", haystack).contains(&format!(" {} ", needle))
}

fn yes_no_of(answer: &str) -> Option<&'static str> {
    let normalized = normalize(answer);
    match normalized.split(' ').next() {
        Some("yes") | Some("y") | Some("true") => Some("Yes"),
        Some("no") | Some("n") | Some("false") => Some("No"),
        _ => None,
    }
}

fn is_placeholder(option: &str) -> bool {
    PLACEHOLDER_OPTIONS.contains(&normalize(option).as_str())
}

fn usable_options(options: &[String]) -> impl Iterator<Item = &String> {
    options.iter().filter(|o| !is_placeholder(o))
}

/// 为答案在选项中找到对应项
fn pick_option(options: &[String], answer: &str) -> Option<String> {
    let target = normalize(answer);
    if target.is_empty() {
        return None;
    }

    if let Some(exact) = usable_options(options).find(|o| normalize(o) == target) {
        return Some(exact.clone());
    }

    if let Some(containing) = usable_options(options).find(|o| {
        let option = normalize(o);
        contains_words(&option, &target) || contains_words(&target, &option)
    }) {
        return Some(containing.clone());
    }

    closest_option(options, &[target.as_str()])
}

/// 与任意关键词字面相似度最高的选项
fn closest_option(options: &[String], keywords: &[&str]) -> Option<String> {
    usable_options(options)
        .map(|option| {
            let normalized = normalize(option);
            let score = keywords
                .iter()
                .map(|kw| strsim::normalized_levenshtein(&normalized, kw))
                .fold(0.0_f64, f64::max);
            (option, score)
        })
        .fold(None, |best: Option<(&String, f64)>, (option, score)| match best {
            Some((_, best_score)) if best_score >= score => best,
            _ => Some((option, score)),
        })
        .map(|(option, _)| option.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnswerRule, ContactInfo, DefaultStance, SearchPlan};

    fn create_test_profile(answers: Vec<AnswerRule>) -> Arc<ApplicantProfile> {
        Arc::new(ApplicantProfile {
            contact: ContactInfo {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                email: "ada@example.com".into(),
                phone: "".into(),
                city: "Toronto".into(),
                state_province: "Ontario".into(),
                country: "Canada".into(),
            },
            resume_path: None,
            answers,
            default_stance: DefaultStance::Yes,
            search: SearchPlan::default(),
        })
    }

    fn create_test_resolver() -> QuestionResolver {
        QuestionResolver::new(create_test_profile(vec![
            AnswerRule::new("sponsorship", "No"),
            AnswerRule::new("relocate", "Yes"),
            AnswerRule::new("years of experience", "3"),
            AnswerRule::new("highest level of education", "Master's Degree"),
            AnswerRule::new("salary", "Open to discussion"),
            AnswerRule::new("cover letter", ""),
        ]))
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Do you require VISA sponsorship?? "), "do you require visa sponsorship");
        assert_eq!(normalize("Master's Degree"), "master s degree");
    }

    #[test]
    fn test_sponsorship_resolves_to_no() {
        let resolver = create_test_resolver();
        let resolution = resolver.resolve(&Question::yes_no("Do you require visa sponsorship?"));
        assert_eq!(resolution.value(), Some("No"));
    }

    #[test]
    fn test_unmatched_free_text_is_unresolved() {
        let resolver = create_test_resolver();
        let resolution = resolver.resolve(&Question::free_text("Describe your ideal team"));
        assert!(resolution.is_unresolved());
    }

    #[test]
    fn test_first_match_wins() {
        let resolver = QuestionResolver::new(create_test_profile(vec![
            AnswerRule::new("visa sponsorship", "No"),
            AnswerRule::new("sponsorship", "Yes"),
        ]));
        let resolution = resolver.resolve(&Question::yes_no("Will you need visa sponsorship?"));
        assert_eq!(
            resolution,
            Resolution::Answer {
                value: "No".into(),
                source: AnswerSource::Rule(0)
            }
        );
    }

    #[test]
    fn test_rule_pattern_matches_substring() {
        let resolver = QuestionResolver::new(create_test_profile(vec![AnswerRule::new("degree", "Master's Degree")]));
        let resolution = resolver.resolve(&Question::free_text("Which degrees do you hold?"));
        assert_eq!(
            resolution,
            Resolution::Answer {
                value: "Master's Degree".into(),
                source: AnswerSource::Rule(0)
            }
        );
    }

    #[test]
    fn test_contact_keywords_match_whole_words() {
        let mut profile = (*create_test_profile(vec![])).clone();
        profile.contact.phone = "416-555-0100".into();
        let resolver = QuestionResolver::new(Arc::new(profile));
        // "excellent" 里有 "cell"，但不是电话字段
        assert!(resolver
            .resolve(&Question::free_text("What makes you an excellent fit?"))
            .is_unresolved());
    }

    #[test]
    fn test_contact_fields() {
        let resolver = create_test_resolver();
        assert_eq!(resolver.resolve(&Question::free_text("First name")).value(), Some("Ada"));
        assert_eq!(resolver.resolve(&Question::free_text("Full Name")).value(), Some("Ada Lovelace"));
        assert_eq!(resolver.resolve(&Question::free_text("Email address")).value(), Some("ada@example.com"));
        assert_eq!(resolver.resolve(&Question::free_text("City")).value(), Some("Toronto"));
    }

    #[test]
    fn test_blank_contact_field_is_not_guessed() {
        let resolver = create_test_resolver();
        // 档案中电话为空，规则表也没有，不能编造
        assert!(resolver.resolve(&Question::free_text("Mobile phone number")).is_unresolved());
    }

    #[test]
    fn test_yes_no_default_stance() {
        let resolver = create_test_resolver();
        let resolution = resolver.resolve(&Question::yes_no("Are you comfortable commuting?"));
        assert_eq!(
            resolution,
            Resolution::Answer {
                value: "Yes".into(),
                source: AnswerSource::DefaultStance
            }
        );
    }

    #[test]
    fn test_numeric_requires_number() {
        let resolver = create_test_resolver();
        assert_eq!(
            resolver.resolve(&Question::numeric("How many years of experience do you have with Python?")).value(),
            Some("3")
        );
        // 规则答案不是数字
        assert!(resolver.resolve(&Question::numeric("Desired salary")).is_unresolved());
        // 没有规则
        assert!(resolver.resolve(&Question::numeric("Your GPA")).is_unresolved());
    }

    #[test]
    fn test_single_choice_maps_answer_to_option() {
        let resolver = create_test_resolver();
        let question = Question::single_choice(
            "What is your highest level of education?",
            ["Select an option", "Bachelor's Degree", "Master’s Degree", "Doctorate"],
        );
        assert_eq!(resolver.resolve(&question).value(), Some("Master’s Degree"));
    }

    #[test]
    fn test_single_choice_yes_no_options() {
        let resolver = create_test_resolver();
        let question = Question::single_choice("Are you willing to relocate?", ["Select an option", "Yes", "No"]);
        assert_eq!(resolver.resolve(&question).value(), Some("Yes"));
    }

    #[test]
    fn test_single_choice_closest_to_keyword() {
        let resolver = create_test_resolver();
        // 没有完整命中规则，但出现了 "education" 关键词
        let question = Question::single_choice(
            "Education completed",
            ["Select an option", "High school", "Education degree", "Other"],
        );
        let resolution = resolver.resolve(&question);
        assert_eq!(
            resolution,
            Resolution::Answer {
                value: "Education degree".into(),
                source: AnswerSource::ClosestOption
            }
        );
    }

    #[test]
    fn test_single_choice_first_option_fallback() {
        let resolver = create_test_resolver();
        let question = Question::single_choice("Preferred shift", ["Select an option", "Day", "Night"]);
        assert_eq!(
            resolver.resolve(&question),
            Resolution::Answer {
                value: "Day".into(),
                source: AnswerSource::FirstOption
            }
        );
    }

    #[test]
    fn test_single_choice_only_placeholders() {
        let resolver = create_test_resolver();
        let question = Question::single_choice("Preferred shift", ["Select an option"]);
        assert!(resolver.resolve(&question).is_unresolved());
    }

    #[test]
    fn test_blank_rule_answer_leaves_text_empty() {
        let resolver = create_test_resolver();
        assert_eq!(resolver.resolve(&Question::free_text("Cover letter")).value(), Some(""));
    }

    #[test]
    fn test_non_boolean_answer_on_yes_no_uses_default() {
        let resolver = create_test_resolver();
        let resolution = resolver.resolve(&Question::yes_no("Is the salary range acceptable?"));
        assert_eq!(
            resolution,
            Resolution::Answer {
                value: "Yes".into(),
                source: AnswerSource::DefaultStance
            }
        );
    }
}
