//! 通知发送方式

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

use super::formatter::{application_message, summary_message, Message};
use super::Notifier;
use crate::models::{ApplicationRecord, CycleReport};

const WEBHOOK_TIMEOUT_SECS: u64 = 15;

/// 以 JSON `{subject, text, html}` POST 到 webhook
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(WEBHOOK_TIMEOUT_SECS))
            .build()
            .context("无法创建 HTTP 客户端")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn send(&self, message: &Message) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(message)
            .send()
            .await
            .context("通知请求失败")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("webhook 返回 {}: {}", status, crate::utils::truncate_text(&body, 200));
        }
        debug!("📨 通知已发送: {}", message.subject);
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify_application(&self, record: &ApplicationRecord) -> Result<()> {
        self.send(&application_message(record)).await
    }

    async fn notify_summary(&self, report: &CycleReport) -> Result<()> {
        self.send(&summary_message(report)).await
    }
}

/// 未配置 webhook 时只写日志
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_application(&self, record: &ApplicationRecord) -> Result<()> {
        info!("📨 {}", application_message(record).subject);
        Ok(())
    }

    async fn notify_summary(&self, report: &CycleReport) -> Result<()> {
        let message = summary_message(report);
        info!("📨 {}", message.subject);
        debug!("\n{}", message.text);
        Ok(())
    }
}
