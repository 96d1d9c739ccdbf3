use anyhow::Result;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use super::BrowserSettings;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// 启动一个新的浏览器进程
pub async fn launch_browser(settings: &BrowserSettings) -> Result<Browser> {
    info!(
        "🚀 启动浏览器 ({})...",
        if settings.headless { "无头" } else { "有界面" }
    );

    let mut builder = BrowserConfig::builder()
        .window_size(1366, 900)
        .args(vec![
            "--disable-gpu",
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--disable-blink-features=AutomationControlled",
            "--remote-debugging-port=0",
        ])
        .arg(format!("--user-agent={}", USER_AGENT));

    if settings.headless {
        builder = builder.new_headless_mode();
    } else {
        builder = builder.with_head();
    }
    if let Some(path) = &settings.chrome_executable {
        debug!("使用浏览器: {}", path.display());
        builder = builder.chrome_executable(path);
    }

    let config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        anyhow::anyhow!("配置浏览器失败: {}", e)
    })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        anyhow::anyhow!("启动浏览器失败: {}", e)
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    sleep(tokio::time::Duration::from_millis(300)).await;

    Ok(browser)
}
