use serde::{Deserialize, Serialize};

/// 表单字段的输入形态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "options", rename_all = "snake_case")]
pub enum InputShape {
    /// 是 / 否（单选按钮或两项下拉）
    YesNo,
    /// 自由文本
    FreeText,
    /// 从给定选项中单选
    SingleChoice(Vec<String>),
    /// 数字
    Numeric,
}

/// 页面上观察到的一个筛选问题
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub shape: InputShape,
}

impl Question {
    pub fn new(text: impl Into<String>, shape: InputShape) -> Self {
        Self {
            text: text.into(),
            shape,
        }
    }

    pub fn yes_no(text: impl Into<String>) -> Self {
        Self::new(text, InputShape::YesNo)
    }

    pub fn free_text(text: impl Into<String>) -> Self {
        Self::new(text, InputShape::FreeText)
    }

    pub fn numeric(text: impl Into<String>) -> Self {
        Self::new(text, InputShape::Numeric)
    }

    pub fn single_choice<I, S>(text: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            text,
            InputShape::SingleChoice(options.into_iter().map(Into::into).collect()),
        )
    }
}
