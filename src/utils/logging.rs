/// 日志工具模块
///
/// 初始化 tracing 订阅者，以及启动 / 每轮的横幅输出
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::models::{CycleSummary, Platform};

/// 初始化日志
///
/// 优先使用 `RUST_LOG`，否则 `info`（`verbose` 时为 `debug`）
pub fn init(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `interval_secs`: 每轮间隔（秒）
/// - `max_per_platform`: 每平台每轮上限
/// - `platforms`: 启用的平台
pub fn log_startup(interval_secs: u64, max_per_platform: usize, platforms: &[Platform]) {
    let names: Vec<&str> = platforms.iter().map(|p| p.name()).collect();
    info!("{}", "=".repeat(60));
    info!("🚀 自动投递服务启动");
    info!("⏱️ 每轮间隔: {} 分钟", interval_secs / 60);
    info!("📊 每平台每轮上限: {}", max_per_platform);
    info!("🌐 平台: {}", names.join(", "));
    info!("{}", "=".repeat(60));
}

/// 记录一轮开始
pub fn log_cycle_start(cycle: u64) {
    info!("\n{}", "=".repeat(60));
    info!(
        "📦 第 {} 轮开始 - {}",
        cycle,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
}

/// 打印一轮的统计信息
pub fn log_cycle_complete(cycle: u64, summary: &CycleSummary) {
    let elapsed = (summary.finished_at - summary.started_at).num_seconds();
    info!("\n{}", "─".repeat(60));
    info!("📊 第 {} 轮完成，用时 {} 秒", cycle, elapsed);
    for counts in &summary.platforms {
        if let Some(note) = &counts.auth_failure {
            warn!("❌ {}: 登录失败 ({})", counts.platform, note);
            continue;
        }
        info!(
            "  {}: ✅ {}  ⏭️ {}  🔁 {}  ❌ {}",
            counts.platform, counts.submitted, counts.skipped, counts.duplicate, counts.failed
        );
        if let Some(halt) = counts.halted {
            info!("  {}: ⛔ 提前停止 ({})", counts.platform, halt.as_str());
        }
    }
    info!("✅ 本轮投递: {}", summary.total_applied);
    info!("{}", "─".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
