//! 通知
//!
//! 发送失败只会被调度循环记录，不会中断投递。

pub mod formatter;
pub mod webhook;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{ApplicationRecord, CycleReport};

pub use formatter::{application_message, summary_message, Message};
pub use webhook::{LogNotifier, WebhookNotifier};

#[async_trait]
pub trait Notifier: Send + Sync {
    /// 单条投递成功
    async fn notify_application(&self, record: &ApplicationRecord) -> Result<()>;

    /// 一轮结束的汇总
    async fn notify_summary(&self, report: &CycleReport) -> Result<()>;
}

/// 按配置选择通知方式
pub fn from_webhook(url: Option<&str>) -> Result<Box<dyn Notifier>> {
    match url.map(str::trim).filter(|u| !u.is_empty()) {
        Some(url) => Ok(Box::new(WebhookNotifier::new(url)?)),
        None => Ok(Box::new(LogNotifier)),
    }
}
