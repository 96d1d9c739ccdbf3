use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use auto_apply::models::load_profile;
use auto_apply::notify;
use auto_apply::platforms::{IndeedDriver, LinkedInDriver, PlatformDriver};
use auto_apply::services::{Ledger, QuestionResolver};
use auto_apply::status::{StatusBoard, StatusPublisher};
use auto_apply::storage::{CsvLedgerStore, CsvRecordSink};
use auto_apply::utils::logging;
use auto_apply::{AppError, Config, CycleRunner, CycleSettings, Scheduler};

#[derive(Parser, Debug)]
#[command(
    name = "auto_apply",
    about = "Submit LinkedIn Easy Apply / Indeed Apply applications on a fixed cadence",
    version
)]
struct Cli {
    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
    /// Only run the LinkedIn driver
    #[arg(long, conflicts_with = "indeed_only")]
    linkedin_only: bool,
    /// Only run the Indeed driver
    #[arg(long)]
    indeed_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = Config::from_env();
    logging::init(config.verbose_logging);

    let profile = load_profile(&config.profile_path)
        .await?
        .with_overrides(
            config.applicant_phone.as_deref(),
            config.contact_email(),
            config.resume_path.as_ref(),
        );
    let resolver = QuestionResolver::new(Arc::new(profile));

    let mut drivers: Vec<Box<dyn PlatformDriver>> = Vec::new();
    if !cli.indeed_only {
        drivers.push(Box::new(LinkedInDriver::new(
            config.linkedin_credentials(),
            config.browser_settings(),
            config.pacer(),
        )));
    }
    if !cli.linkedin_only {
        drivers.push(Box::new(IndeedDriver::new(
            config.indeed_credentials(),
            config.browser_settings(),
            config.pacer(),
        )));
    }
    if drivers.is_empty() {
        return Err(AppError::Config("没有启用任何平台".to_string()).into());
    }

    let platforms: Vec<_> = drivers.iter().map(|d| d.platform()).collect();
    logging::log_startup(
        config.cycle_interval_seconds,
        config.max_applications_per_run,
        &platforms,
    );

    let ledger = Ledger::open(Box::new(
        CsvLedgerStore::new(config.ledger_csv()).with_seed(config.applications_csv()),
    ))
    .map_err(AppError::Ledger)?;
    info!("📒 去重账本: {} 条", ledger.len());

    let runner = CycleRunner::new(
        drivers,
        ledger,
        resolver,
        Box::new(CsvRecordSink::new(config.applications_csv())),
        CycleSettings {
            max_per_platform: config.max_applications_per_run,
            bias: config.location_bias(),
        },
    );

    let status = Arc::new(StatusBoard::default());
    let _health = auto_apply::health::spawn(config.port, status.subscribe());

    let notifier = notify::from_webhook(config.notify_webhook_url.as_deref())
        .context("无法初始化通知")?;
    let publisher: Arc<dyn StatusPublisher> = status.clone();
    let mut scheduler = Scheduler::new(
        runner,
        notifier,
        publisher,
        Duration::from_secs(config.cycle_interval_seconds),
    );

    if cli.once {
        let report = scheduler.run_once().await;
        info!("✓ 单次运行完成，投递 {} 个", report.summary.total_applied);
    } else {
        scheduler.run_forever(shutdown_signal()?).await;
    }

    Ok(())
}

/// SIGINT / SIGTERM；信号处理在返回前就已注册
#[cfg(unix)]
fn shutdown_signal() -> Result<impl std::future::Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt()).context("无法监听 SIGINT")?;
    let mut terminate = signal(SignalKind::terminate()).context("无法监听 SIGTERM")?;
    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => {}
            _ = terminate.recv() => {}
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl std::future::Future<Output = ()>> {
    Ok(async {
        let _ = tokio::signal::ctrl_c().await;
    })
}
