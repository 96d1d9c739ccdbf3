//! 编排层（Orchestration Layer）
//!
//! ```text
//! scheduler (循环 / 通知 / 状态)
//!     ↓
//! cycle_runner (逐平台：登录 → 搜索 → 查重 → 投递)
//!     ↓
//! platforms::PlatformDriver
//!     ↓
//! workflow::ApplyFlow (单个职位)
//!     ↓
//! services (能力层：question_resolver / ledger / pacer)
//!     ↓
//! infrastructure (基础设施：JsExecutor)
//! ```
//!
//! 只做调度和统计，不做页面层面的判断。

pub mod cycle_runner;
pub mod scheduler;

pub use cycle_runner::{CycleRunner, CycleSettings};
pub use scheduler::Scheduler;
