//! 调度循环 - 编排层
//!
//! 运行一轮 → 发送通知 → 发布状态 → 休眠，直到收到退出信号。
//! 退出信号只在休眠期间生效，正在进行的一轮不会被打断。

use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::models::{ApplicationStatus, CycleReport};
use crate::notify::Notifier;
use crate::orchestrator::cycle_runner::CycleRunner;
use crate::status::{ServiceStatus, StatusPublisher, StatusSnapshot};
use crate::utils::logging::{log_cycle_complete, log_cycle_start};

pub struct Scheduler {
    runner: CycleRunner,
    notifier: Box<dyn Notifier>,
    status: Arc<dyn StatusPublisher>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(
        runner: CycleRunner,
        notifier: Box<dyn Notifier>,
        status: Arc<dyn StatusPublisher>,
        interval: Duration,
    ) -> Self {
        Self {
            runner,
            notifier,
            status,
            interval,
        }
    }

    pub fn runner(&self) -> &CycleRunner {
        &self.runner
    }

    /// 只运行一轮，结束后释放资源
    pub async fn run_once(&mut self) -> CycleReport {
        let report = self.cycle().await;
        self.stop().await;
        report
    }

    /// 循环运行，`shutdown` 完成后在下一次休眠时退出
    pub async fn run_forever<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        self.set_status(ServiceStatus::Running);

        loop {
            self.cycle().await;

            info!("😴 休眠 {} 秒后开始下一轮", self.interval.as_secs());
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = &mut shutdown => {
                    info!("⛔ 收到退出信号");
                    break;
                }
            }
        }

        self.stop().await;
    }

    async fn cycle(&mut self) -> CycleReport {
        let cycle_no = self.status.current().cycles + 1;
        log_cycle_start(cycle_no);
        self.set_status(ServiceStatus::Applying);

        let report = self.runner.run_cycle().await;
        log_cycle_complete(cycle_no, &report.summary);

        self.notify(&report).await;

        let previous = self.status.current();
        self.status.publish(StatusSnapshot {
            status: ServiceStatus::Sleeping,
            started_at: previous.started_at,
            last_cycle: Some(Utc::now()),
            total_applied: previous.total_applied + report.summary.total_applied,
            cycles: cycle_no,
        });

        report
    }

    async fn notify(&self, report: &CycleReport) {
        for record in report
            .records
            .iter()
            .filter(|r| r.status == ApplicationStatus::Submitted)
        {
            if let Err(e) = self.notifier.notify_application(record).await {
                warn!("⚠️ 投递通知发送失败 ({}): {:#}", record.posting.label(), e);
            }
        }

        if !report.summary.is_noteworthy() {
            info!("本轮没有投递也没有失败，不发送汇总");
            return;
        }
        if let Err(e) = self.notifier.notify_summary(report).await {
            warn!("⚠️ 汇总通知发送失败: {:#}", e);
        }
    }

    async fn stop(&mut self) {
        self.runner.shutdown().await;
        self.set_status(ServiceStatus::Stopped);
        info!("👋 服务已停止");
    }

    fn set_status(&self, status: ServiceStatus) {
        self.status.publish(self.status.current().with_status(status));
    }
}
