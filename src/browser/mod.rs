//! 浏览器接入
//!
//! 配置了调试端口时连接已有浏览器，否则启动一个新进程

pub mod connection;
pub mod headless;

use anyhow::Result;
use chromiumoxide::Browser;
use std::path::PathBuf;

pub use connection::{connect_to_browser, open_tab};
pub use headless::launch_browser;

/// 浏览器启动参数
#[derive(Debug, Clone, Default)]
pub struct BrowserSettings {
    pub debug_port: Option<u16>,
    pub chrome_executable: Option<PathBuf>,
    pub headless: bool,
}

/// 按配置获取浏览器
pub async fn open_browser(settings: &BrowserSettings) -> Result<Browser> {
    match settings.debug_port {
        Some(port) => connect_to_browser(port).await,
        None => launch_browser(settings).await,
    }
}
