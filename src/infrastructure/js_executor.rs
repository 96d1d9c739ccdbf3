//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"执行 JS / 等待 / 点击 / 上传"这些能力

use anyhow::{Context, Result};
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::path::Path;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// 轮询间隔
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 eval() 能力
/// - 不认识 JobPosting / 表单
/// - 不处理业务流程
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 获取 page 的引用（用于其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 导航并等待文档加载完成
    pub async fn goto(&self, url: &str, timeout: Duration) -> Result<()> {
        debug!("导航到: {}", url);
        self.page
            .goto(url)
            .await
            .with_context(|| format!("导航到 {} 失败", url))?;
        let loaded = self
            .wait_until("document.readyState === 'complete'", timeout)
            .await?;
        if !loaded {
            warn!("⚠️ 页面在 {:?} 内未加载完成: {}", timeout, url);
        }
        Ok(())
    }

    /// 当前页面地址
    pub async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    /// 轮询一个返回布尔值的 JS 表达式，直到为真或超时
    ///
    /// 超时返回 `Ok(false)`，由调用方决定是否视为错误
    pub async fn wait_until(&self, predicate_js: &str, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        let js = format!("(() => {{ try {{ return !!({}); }} catch (e) {{ return false; }} }})()", predicate_js);
        loop {
            if self.eval_as::<bool>(js.as_str()).await.unwrap_or(false) {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// 点击第一个匹配选择器且可见的元素
    ///
    /// 返回是否找到并点击
    pub async fn click(&self, selector: &str) -> Result<bool> {
        let js = format!(
            r#"(() => {{
                const el = Array.from(document.querySelectorAll({sel}))
                    .find(e => !e.disabled && e.offsetParent !== null);
                if (!el) return false;
                el.scrollIntoView({{ block: 'center' }});
                el.click();
                return true;
            }})()"#,
            sel = serde_json::to_string(selector)?
        );
        self.eval_as(js).await
    }

    /// 点击第一个文本包含 `text`（忽略大小写）的按钮或链接
    pub async fn click_text(&self, scope_selector: &str, text: &str) -> Result<bool> {
        let js = format!(
            r#"(() => {{
                const needle = {text}.toLowerCase();
                const scope = document.querySelector({scope}) || document;
                const el = Array.from(scope.querySelectorAll('button, a, [role="button"]'))
                    .find(e => e.offsetParent !== null
                        && ((e.innerText || '') + ' ' + (e.getAttribute('aria-label') || ''))
                            .toLowerCase().includes(needle));
                if (!el) return false;
                el.click();
                return true;
            }})()"#,
            text = serde_json::to_string(text)?,
            scope = serde_json::to_string(scope_selector)?
        );
        self.eval_as(js).await
    }

    /// 给文件输入框设置文件
    pub async fn set_input_files(&self, selector: &str, path: &Path) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .with_context(|| format!("未找到文件输入框: {}", selector))?;
        let absolute = std::fs::canonicalize(path)
            .with_context(|| format!("简历文件不存在: {}", path.display()))?;
        let params = SetFileInputFilesParams::builder()
            .file(absolute.to_string_lossy().to_string())
            .backend_node_id(element.backend_node_id)
            .build()
            .map_err(|e| anyhow::anyhow!("构造上传参数失败: {}", e))?;
        self.page.execute(params).await?;
        Ok(())
    }

    /// 写入一个 cookie
    pub async fn set_cookie(&self, name: &str, value: &str, domain: &str) -> Result<()> {
        let cookie = CookieParam::builder()
            .name(name)
            .value(value)
            .domain(domain)
            .path("/")
            .secure(true)
            .http_only(true)
            .build()
            .map_err(|e| anyhow::anyhow!("构造 cookie 失败: {}", e))?;
        self.page.set_cookie(cookie).await?;
        Ok(())
    }
}
