//! 投递表单的抽象描述
//!
//! 平台驱动把真实页面翻译成这些类型，状态机只认识它们

use async_trait::async_trait;
use std::path::Path;

use crate::error::FlowError;
use crate::models::{JobPosting, Question};

/// 表单中的一个字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    /// 平台内定位该字段的句柄（选择器或标记 id）
    pub handle: String,
    pub question: Question,
    /// 页面已经预填了值
    pub prefilled: bool,
}

/// 当前步骤可用的推进按钮
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepControl {
    Next,
    Review,
    Submit,
}

/// 页面上的全局信号
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSignal {
    None,
    /// 验证 / 验证码 / 限流
    Blocked(String),
    /// 已出现投递成功提示
    Confirmation,
    /// 页面显示已经投递过
    AlreadyApplied,
}

/// 表单的一个步骤（一页）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormStep {
    pub fields: Vec<FormField>,
    pub resume_input: bool,
    pub control: Option<StepControl>,
    pub signal: PageSignal,
}

impl FormStep {
    pub fn confirmation() -> Self {
        Self {
            fields: Vec::new(),
            resume_input: false,
            control: None,
            signal: PageSignal::Confirmation,
        }
    }
}

/// 打开职位详情后的资格判断
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Ineligible(String),
    Blocked(String),
}

/// 投递页面的能力抽象
///
/// 每个平台各自实现；测试中用脚本化的页面序列代替真实浏览器
#[async_trait]
pub trait ApplySurface: Send {
    /// 打开职位详情
    async fn open(&mut self, posting: &JobPosting) -> Result<(), FlowError>;

    /// 判断是否可以站内投递
    async fn check_eligibility(&mut self, posting: &JobPosting) -> Result<Eligibility, FlowError>;

    /// 点击投递按钮，进入表单
    async fn start(&mut self) -> Result<(), FlowError>;

    /// 读取当前步骤
    async fn read_step(&mut self) -> Result<FormStep, FlowError>;

    /// 填写一个字段
    async fn fill(&mut self, field: &FormField, value: &str) -> Result<(), FlowError>;

    /// 上传简历
    async fn upload_resume(&mut self, path: &Path) -> Result<(), FlowError>;

    /// 点击推进按钮
    async fn advance(&mut self, control: StepControl) -> Result<(), FlowError>;

    /// 放弃当前表单（关闭弹窗 / 丢弃草稿）
    async fn abandon(&mut self) -> Result<(), FlowError>;
}
