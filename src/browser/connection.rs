use anyhow::Result;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// 连接到已经打开调试端口的浏览器
pub async fn connect_to_browser(port: u16) -> Result<Browser> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        e
    })?;
    debug!("浏览器连接成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    Ok(browser)
}

/// 打开一个新标签页
pub async fn open_tab(browser: &Browser, url: &str) -> Result<Page> {
    debug!("创建新标签页: {}", url);
    let page = browser.new_page(url).await.map_err(|e| {
        error!("创建新标签页失败: {}", e);
        e
    })?;
    Ok(page)
}
