//! 单轮投递 - 编排层
//!
//! 依次处理每个平台：登录 → 惰性搜索 → 逐个职位查重 / 投递。
//!
//! 平台提前停止的条件：
//! - 本平台计入上限的记录数达到 `max_per_platform`
//! - 出现拦截记录（验证 / 验证码 / 限流）
//! - 去重账本写入失败
//!
//! 每条记录产生后立即写入记录出口；提交成功的 url 先写入账本再继续。

use chrono::Utc;
use futures::StreamExt;
use tracing::{error, info, warn};

use crate::models::{
    ApplicationRecord, ApplicationStatus, CycleReport, CycleSummary, HaltReason, LocationBias,
    PlatformCounts, SearchPlan,
};
use crate::platforms::PlatformDriver;
use crate::services::{Ledger, QuestionResolver};
use crate::storage::RecordSink;
use crate::workflow::ApplyCtx;

/// 单轮运行参数
#[derive(Debug, Clone)]
pub struct CycleSettings {
    /// 每个平台每轮最多计入的投递数
    pub max_per_platform: usize,
    pub bias: LocationBias,
}

pub struct CycleRunner {
    drivers: Vec<Box<dyn PlatformDriver>>,
    ledger: Ledger,
    resolver: QuestionResolver,
    sink: Box<dyn RecordSink>,
    settings: CycleSettings,
}

impl CycleRunner {
    pub fn new(
        drivers: Vec<Box<dyn PlatformDriver>>,
        ledger: Ledger,
        resolver: QuestionResolver,
        sink: Box<dyn RecordSink>,
        settings: CycleSettings,
    ) -> Self {
        Self {
            drivers,
            ledger,
            resolver,
            sink,
            settings,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// 运行一轮，任何平台级错误都折叠进汇总
    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut summary = CycleSummary::begin(Utc::now());
        let mut records = Vec::new();

        let plan = self.resolver.profile().search.clone();
        let locations = plan.ordered_locations(&self.settings.bias);
        let plan = SearchPlan {
            titles: plan.titles,
            locations,
        };

        let Self {
            drivers,
            ledger,
            resolver,
            sink,
            settings,
        } = self;

        for driver in drivers.iter_mut() {
            let counts = run_platform(
                driver.as_mut(),
                &plan,
                ledger,
                resolver,
                sink.as_mut(),
                settings.max_per_platform,
                &mut records,
            )
            .await;
            summary.push(counts);
        }

        CycleReport {
            summary: summary.finish(Utc::now()),
            records,
        }
    }

    /// 释放所有驱动持有的浏览器
    pub async fn shutdown(&mut self) {
        for driver in self.drivers.iter_mut() {
            driver.shutdown().await;
        }
    }
}

async fn run_platform(
    driver: &mut dyn PlatformDriver,
    plan: &SearchPlan,
    ledger: &mut Ledger,
    resolver: &QuestionResolver,
    sink: &mut dyn RecordSink,
    max_per_platform: usize,
    records: &mut Vec<ApplicationRecord>,
) -> PlatformCounts {
    let platform = driver.platform();
    let mut counts = PlatformCounts::new(platform);

    info!("[{}] 🚀 开始处理", platform);

    if let Err(e) = driver.authenticate().await {
        error!("[{}] ❌ {}", platform, e);
        counts.auth_failure = Some(format!("{}: {}", e.reason, e.detail));
        return counts;
    }

    if max_per_platform == 0 {
        counts.halted = Some(HaltReason::CapReached);
        return counts;
    }

    let mut postings = driver.search(&plan.titles, &plan.locations);
    let mut index = 0;

    while let Some(posting) = postings.next().await {
        index += 1;
        let ctx = ApplyCtx::new(platform, index);

        let record = if ledger.contains(&posting.url) {
            info!("{} 已投递过，跳过: {}", ctx, posting.label());
            ApplicationRecord::duplicate(posting)
        } else {
            driver.apply(posting, resolver, &ctx).await
        };

        counts.count(record.status);

        let mut halt = None;
        if record.status == ApplicationStatus::Submitted {
            if let Err(e) = ledger.record(record.url()) {
                error!("{} ❌ 去重账本写入失败，停止该平台: {:#}", ctx, e);
                halt = Some(HaltReason::LedgerUnavailable);
            }
        }
        if record.is_blocked() {
            warn!("{} ⛔ 平台拦截，本轮停止 {}", ctx, platform);
            halt = Some(HaltReason::Blocked);
        }

        if let Err(e) = sink.append(&record) {
            warn!("{} ⚠️ 投递记录写入失败: {:#}", ctx, e);
        }
        records.push(record);

        if halt.is_none() && counts.capped_attempts() >= max_per_platform {
            info!("[{}] ⛔ 已达到本轮上限 {}", platform, max_per_platform);
            halt = Some(HaltReason::CapReached);
        }
        if halt.is_some() {
            counts.halted = halt;
            break;
        }
    }

    info!(
        "[{}] ✓ 完成: 投递 {} / 跳过 {} / 重复 {} / 失败 {}",
        platform, counts.submitted, counts.skipped, counts.duplicate, counts.failed
    );
    counts
}
