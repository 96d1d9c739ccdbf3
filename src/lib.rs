//! # auto_apply
//!
//! 按固定节奏在 LinkedIn Easy Apply 与 Indeed Apply 上自动投递职位，
//! 按 url 去重，并根据申请人档案回答每个职位的筛选问题。
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `browser/` - 启动或连接浏览器
//! - `infrastructure/` - `JsExecutor` 持有 page，只暴露能力（eval / 等待 / 点击 / 上传）
//!
//! ### ② 业务能力层（Services）
//! - `QuestionResolver` - 筛选问题 → 档案答案
//! - `Ledger` - 去重账本
//! - `Pacer` - 操作间的随机延迟
//!
//! ### ③ 流程层（Workflow）
//! - `ApplyFlow` - "一个职位"的投递状态机，运行在 `ApplySurface` 之上
//!
//! ### ④ 平台与编排（Platforms / Orchestration）
//! - `platforms/` - `PlatformDriver` 的两个实现
//! - `orchestrator/` - `CycleRunner`（单轮）与 `Scheduler`（循环）
//!
//! ### 适配层
//! - `storage/` - CSV 记录与账本
//! - `notify/` - 通知格式化与发送
//! - `status` / `health` - 状态快照与健康检查

pub mod browser;
pub mod config;
pub mod error;
pub mod health;
pub mod infrastructure;
pub mod models;
pub mod notify;
pub mod orchestrator;
pub mod platforms;
pub mod services;
pub mod status;
pub mod storage;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::JsExecutor;
pub use models::{ApplicantProfile, ApplicationRecord, CycleReport, JobPosting, Platform};
pub use orchestrator::{CycleRunner, CycleSettings, Scheduler};
pub use platforms::PlatformDriver;
pub use workflow::{ApplyCtx, ApplyFlow};
