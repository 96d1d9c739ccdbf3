//! 单个职位的投递流程 - 流程层
//!
//! 核心职责：把"一个职位"的投递过程建模为显式状态机
//!
//! ```text
//! Discovered → Opened → (Eligible | Ineligible) → FormFilling{step} → (Submitted | Blocked | Error)
//!                                                       ↓
//!                                                   Unresolved（整份表单放弃，不提交）
//! ```
//!
//! - 不持有任何资源（page），只通过 `ApplySurface` 操作页面
//! - 每个终止状态都对应唯一的 `ApplicationRecord`

use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::FlowError;
use crate::models::{ApplicationRecord, JobPosting, UNRESOLVED_QUESTION};
use crate::services::{Pacer, QuestionResolver, Resolution};
use crate::utils::logging::truncate_text;
use crate::workflow::apply_ctx::ApplyCtx;
use crate::workflow::form::{ApplySurface, Eligibility, FormField, PageSignal, StepControl};

/// 失败原因的最大长度
const MAX_DETAIL_LEN: usize = 200;

/// 状态机状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyState {
    Discovered,
    Opened,
    Eligible,
    Ineligible(String),
    FormFilling { step: usize },
    /// 有问题无法作答，表单已放弃
    Unresolved(String),
    Submitted,
    Blocked(String),
    Error(String),
}

impl ApplyState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ApplyState::Ineligible(_)
                | ApplyState::Unresolved(_)
                | ApplyState::Submitted
                | ApplyState::Blocked(_)
                | ApplyState::Error(_)
        )
    }
}

/// 流程产出
#[derive(Debug, Clone)]
pub struct FlowOutcome {
    pub record: ApplicationRecord,
    /// 依次经过的状态，最后一个为终止状态
    pub trace: Vec<ApplyState>,
}

/// 单个职位的投递流程
pub struct ApplyFlow<'a> {
    resolver: &'a QuestionResolver,
    pacer: Pacer,
    max_steps: usize,
    resume_path: Option<PathBuf>,
}

impl<'a> ApplyFlow<'a> {
    pub fn new(resolver: &'a QuestionResolver, pacer: Pacer, max_steps: usize) -> Self {
        Self {
            resolver,
            pacer,
            max_steps,
            resume_path: resolver.profile().resume_path.clone(),
        }
    }

    /// 运行状态机直到终止
    pub async fn run<S>(&self, surface: &mut S, posting: JobPosting, ctx: &ApplyCtx) -> FlowOutcome
    where
        S: ApplySurface + ?Sized,
    {
        info!("{} 📝 开始投递: {}", ctx, posting.label());

        let mut state = ApplyState::Discovered;
        let mut trace = vec![state.clone()];

        while !state.is_terminal() {
            state = match state {
                ApplyState::Discovered => match surface.open(&posting).await {
                    Ok(()) => ApplyState::Opened,
                    Err(e) => on_error(e),
                },
                ApplyState::Opened => match surface.check_eligibility(&posting).await {
                    Ok(Eligibility::Eligible) => ApplyState::Eligible,
                    Ok(Eligibility::Ineligible(reason)) => ApplyState::Ineligible(reason),
                    Ok(Eligibility::Blocked(reason)) => ApplyState::Blocked(reason),
                    Err(e) => on_error(e),
                },
                ApplyState::Eligible => match surface.start().await {
                    Ok(()) => {
                        self.pacer.pause(1.0).await;
                        ApplyState::FormFilling { step: 0 }
                    }
                    Err(e) => on_error(e),
                },
                ApplyState::FormFilling { step } => self.fill_step(surface, step, ctx).await,
                terminal => terminal,
            };
            trace.push(state.clone());
        }

        let record = self.finish(&state, posting, ctx);
        FlowOutcome { record, trace }
    }

    /// 处理表单的一个步骤，返回下一个状态
    async fn fill_step<S>(&self, surface: &mut S, step: usize, ctx: &ApplyCtx) -> ApplyState
    where
        S: ApplySurface + ?Sized,
    {
        if step >= self.max_steps {
            discard(surface, ctx).await;
            return ApplyState::Error(format!("exceeded max form steps ({})", self.max_steps));
        }

        self.pacer.pause(0.8).await;

        let form = match surface.read_step().await {
            Ok(form) => form,
            Err(e) => return on_error(e),
        };

        match form.signal {
            PageSignal::Blocked(reason) => return ApplyState::Blocked(reason),
            // 还没点过提交就出现成功提示，说明是以前投过的
            PageSignal::Confirmation | PageSignal::AlreadyApplied => {
                return ApplyState::Ineligible("already applied".into())
            }
            PageSignal::None => {}
        }

        // 先解析本页全部字段，有任何一个答不上就整份放弃
        let mut answers: Vec<(&FormField, String)> = Vec::new();
        for field in form.fields.iter().filter(|f| !f.prefilled) {
            match self.resolver.resolve(&field.question) {
                Resolution::Answer { value, source } => {
                    debug!("{} 字段 '{}' → '{}' ({:?})", ctx, field.question.text, value, source);
                    answers.push((field, value));
                }
                Resolution::Unresolved { question } => {
                    warn!("{} ⚠️ 无法回答的问题: {}", ctx, truncate_text(&question, 80));
                    discard(surface, ctx).await;
                    return ApplyState::Unresolved(question);
                }
            }
        }

        for (field, value) in &answers {
            if let Err(e) = surface.fill(field, value).await {
                discard(surface, ctx).await;
                return on_error(e);
            }
            self.pacer.pause(0.2).await;
        }

        if form.resume_input {
            if let Some(path) = &self.resume_path {
                match surface.upload_resume(path).await {
                    Ok(()) => info!("{} 📎 简历已上传", ctx),
                    Err(FlowError::PlatformBlocked(reason)) => return ApplyState::Blocked(reason),
                    Err(e) => warn!("{} ⚠️ 简历上传失败: {}", ctx, e),
                }
            }
        }

        match form.control {
            Some(StepControl::Submit) => {
                info!("{} 📤 正在提交...", ctx);
                if let Err(e) = surface.advance(StepControl::Submit).await {
                    return on_error(e);
                }
                self.pacer.pause(1.5).await;
                self.confirm(surface, ctx).await
            }
            Some(control) => match surface.advance(control).await {
                Ok(()) => ApplyState::FormFilling { step: step + 1 },
                Err(e) => {
                    discard(surface, ctx).await;
                    on_error(e)
                }
            },
            None => {
                warn!("{} ⚠️ 第 {} 步没有可点击的按钮", ctx, step + 1);
                discard(surface, ctx).await;
                ApplyState::Error(format!("no actionable control at step {}", step + 1))
            }
        }
    }

    /// 提交后检查结果
    ///
    /// 提交按钮已经点下，除非出现拦截信号，否则按已提交处理
    async fn confirm<S>(&self, surface: &mut S, ctx: &ApplyCtx) -> ApplyState
    where
        S: ApplySurface + ?Sized,
    {
        match surface.read_step().await {
            Ok(form) => match form.signal {
                PageSignal::Blocked(reason) => ApplyState::Blocked(reason),
                PageSignal::Confirmation => ApplyState::Submitted,
                _ => {
                    warn!("{} ⚠️ 已点击提交但未检测到成功提示", ctx);
                    ApplyState::Submitted
                }
            },
            Err(FlowError::PlatformBlocked(reason)) => ApplyState::Blocked(reason),
            Err(e) => {
                warn!("{} ⚠️ 提交后读取页面失败: {}", ctx, e);
                ApplyState::Submitted
            }
        }
    }

    fn finish(&self, state: &ApplyState, posting: JobPosting, ctx: &ApplyCtx) -> ApplicationRecord {
        match state {
            ApplyState::Submitted => {
                info!("{} ✓ 投递成功: {}", ctx, posting.label());
                ApplicationRecord::submitted(posting)
            }
            ApplyState::Ineligible(reason) => {
                info!("{} 跳过 ({}): {}", ctx, reason, posting.label());
                ApplicationRecord::skipped(posting, reason.clone())
            }
            ApplyState::Unresolved(question) => ApplicationRecord::skipped(
                posting,
                format!("{}: {}", UNRESOLVED_QUESTION, truncate_text(question, 120)),
            ),
            ApplyState::Blocked(reason) => {
                warn!("{} ⛔ 平台拦截: {}", ctx, reason);
                ApplicationRecord::blocked(posting)
            }
            ApplyState::Error(detail) => {
                warn!("{} ❌ 投递失败: {}", ctx, detail);
                ApplicationRecord::failed(posting, truncate_text(detail, MAX_DETAIL_LEN))
            }
            other => ApplicationRecord::failed(posting, format!("flow stopped in state {:?}", other)),
        }
    }
}

fn on_error(err: FlowError) -> ApplyState {
    match err {
        FlowError::PlatformBlocked(reason) => ApplyState::Blocked(reason),
        FlowError::Structural(detail) => ApplyState::Error(detail),
    }
}

async fn discard<S>(surface: &mut S, ctx: &ApplyCtx)
where
    S: ApplySurface + ?Sized,
{
    if let Err(e) = surface.abandon().await {
        debug!("{} 关闭表单失败: {}", ctx, e);
    }
}
