//! LinkedIn Easy Apply 驱动
//!
//! - 登录：优先使用 `li_at` cookie，失败再用邮箱密码
//! - 搜索：只搜 Easy Apply（`f_AL=true`），按时间倒序
//! - 投递：在 Easy Apply 弹窗内逐步填写，最多 10 步

use async_trait::async_trait;
use chromiumoxide::Browser;
use futures::stream::{self, BoxStream, StreamExt};
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::browser::{open_browser, open_tab, BrowserSettings};
use crate::error::{AuthError, AuthFailure, FlowError};
use crate::infrastructure::JsExecutor;
use crate::models::{ApplicationRecord, ApplyMode, JobPosting, Platform, PlatformSession};
use crate::platforms::dom::{self, ControlLabels, PageState};
use crate::platforms::search::{search_stream, SearchBackend, MAX_RESULT_PAGES};
use crate::platforms::{PlatformDriver, SESSION_TTL_MINUTES};
use crate::services::{Pacer, QuestionResolver};
use crate::workflow::{
    ApplyCtx, ApplyFlow, ApplySurface, Eligibility, FormField, FormStep, StepControl,
};

const HOME_URL: &str = "https://www.linkedin.com/";
const LOGIN_URL: &str = "https://www.linkedin.com/login";
const FEED_URL: &str = "https://www.linkedin.com/feed/";
const JOBS_SEARCH_URL: &str = "https://www.linkedin.com/jobs/search/";

/// Easy Apply 弹窗最多步数
pub const MAX_FORM_STEPS: usize = 10;
/// 每页结果数（`start` 参数步长）
const RESULTS_PER_PAGE: usize = 25;

const NAV_TIMEOUT: Duration = Duration::from_secs(20);
const ELEMENT_TIMEOUT: Duration = Duration::from_secs(10);
const LOGIN_TIMEOUT: Duration = Duration::from_secs(30);

const MODAL: &str = ".jobs-easy-apply-modal, [role=\"dialog\"]";
const RESUME_INPUT: &str = ".jobs-easy-apply-modal input[type=\"file\"], [role=\"dialog\"] input[type=\"file\"]";

const CONTROLS: ControlLabels = ControlLabels {
    submit: &["submit application"],
    review: &["review your application", "review"],
    next: &["continue to next step", "next"],
};

const CONFIRMATIONS: &[&str] = &["application was sent", "application sent"];

const CARDS_SCRIPT: &str = r#"(() => {
  const clean = s => (s || '').replace(/\s+/g, ' ').trim();
  const text = (card, sel) => { const el = card.querySelector(sel); return el ? clean(el.innerText) : ''; };
  const list = document.querySelector('.jobs-search-results-list, .scaffold-layout__list');
  if (list) list.scrollTop = list.scrollHeight;
  return Array.from(document.querySelectorAll('.jobs-search-results__list-item, .job-card-container, li[data-occludable-job-id]'))
    .map(card => {
      const link = card.querySelector('a[href*="/jobs/view/"]') || card.querySelector('a');
      return {
        job_id: card.getAttribute('data-occludable-job-id') || card.getAttribute('data-job-id') || '',
        href: link ? (link.getAttribute('href') || '') : '',
        title: text(card, '.job-card-list__title, .job-card-container__link'),
        company: text(card, '.job-card-container__primary-description, .job-card-container__company-name, .artdeco-entity-lockup__subtitle'),
        location: text(card, '.job-card-container__metadata-wrapper, .artdeco-entity-lockup__caption'),
        easy_apply: /easy apply/i.test(card.innerText || '')
      };
    });
})()"#;

const JOB_PAGE_SCRIPT: &str = r#"(() => {
  const clean = s => (s || '').replace(/\s+/g, ' ').trim();
  const btn = document.querySelector('.jobs-apply-button, .jobs-s-apply button');
  const feedback = document.querySelector('.artdeco-inline-feedback--success, .jobs-s-apply__application-link');
  return {
    apply_text: btn ? clean((btn.innerText || '') + ' ' + (btn.getAttribute('aria-label') || '')).toLowerCase() : '',
    applied: !!feedback && /applied/i.test(feedback.innerText || ''),
    url: location.href,
    text: clean(document.body ? document.body.innerText : '').toLowerCase().slice(0, 4000)
  };
})()"#;

/// LinkedIn 凭据
#[derive(Debug, Clone, Default)]
pub struct LinkedInCredentials {
    pub email: String,
    pub password: String,
    /// `li_at` 会话 cookie
    pub session_cookie: Option<String>,
}

impl LinkedInCredentials {
    fn has_password(&self) -> bool {
        !self.email.trim().is_empty() && !self.password.is_empty()
    }

    fn is_configured(&self) -> bool {
        self.has_password() || self.session_cookie.as_deref().is_some_and(|c| !c.trim().is_empty())
    }
}

/// 搜索页地址
pub fn search_url(title: &str, location: &str, page: usize) -> String {
    let start = (page * RESULTS_PER_PAGE).to_string();
    let mut params = vec![
        ("keywords", title),
        ("location", location),
        ("f_AL", "true"),
        ("sortBy", "DD"),
    ];
    if page > 0 {
        params.push(("start", start.as_str()));
    }
    match Url::parse_with_params(JOBS_SEARCH_URL, &params) {
        Ok(url) => url.to_string(),
        Err(_) => JOBS_SEARCH_URL.to_string(),
    }
}

/// 规范化职位地址为 `/jobs/view/<id>/`，去掉追踪参数
pub fn canonical_job_url(job_id: &str, href: &str) -> Option<String> {
    let id = if !job_id.trim().is_empty() && job_id.chars().all(|c| c.is_ascii_digit()) {
        job_id.trim().to_string()
    } else if let Ok(re) = Regex::new(r"/jobs/view/(?:[^/?]*-)?(\d+)") {
        re.captures(href)?.get(1)?.as_str().to_string()
    } else {
        return None;
    };
    Some(format!("https://www.linkedin.com/jobs/view/{}/", id))
}

/// 登录后页面判断
pub fn classify_login(state: &PageState) -> Result<(), AuthFailure> {
    if let Some(reason) = state.blocked() {
        return Err(block_failure(&reason));
    }
    let path = Url::parse(&state.url)
        .map(|u| u.path().to_lowercase())
        .unwrap_or_default();
    let signed_in = ["/feed", "/jobs", "/mynetwork", "/in/"]
        .iter()
        .any(|prefix| path.starts_with(prefix));
    if signed_in {
        Ok(())
    } else {
        Err(AuthFailure::CredentialsRejected)
    }
}

fn block_failure(reason: &str) -> AuthFailure {
    if reason == "rate_limited" {
        AuthFailure::RateLimited
    } else {
        AuthFailure::VerificationRequired
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawCard {
    #[serde(default)]
    job_id: String,
    #[serde(default)]
    href: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    company: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    easy_apply: bool,
}

impl RawCard {
    fn into_posting(self) -> Option<JobPosting> {
        let url = canonical_job_url(&self.job_id, &self.href)?;
        if self.title.is_empty() {
            return None;
        }
        let mode = if self.easy_apply {
            ApplyMode::QuickApply
        } else {
            ApplyMode::Unknown
        };
        Some(JobPosting::new(
            Platform::LinkedIn,
            self.title,
            self.company,
            self.location,
            url,
            mode,
        ))
    }
}

/// 详情页探测结果
#[derive(Debug, Clone, Deserialize, Default)]
pub struct JobPage {
    pub apply_text: String,
    pub applied: bool,
    pub url: String,
    pub text: String,
}

/// 详情页 → 资格判断
pub fn eligibility_from(page: &JobPage) -> Eligibility {
    if let Some(reason) = dom::detect_block(&page.url, &page.text) {
        return Eligibility::Blocked(reason);
    }
    if page.applied {
        return Eligibility::Ineligible("already applied".into());
    }
    if page.apply_text.contains("easy apply") {
        return Eligibility::Eligible;
    }
    if page.apply_text.is_empty() {
        Eligibility::Ineligible("no easy apply button".into())
    } else {
        Eligibility::Ineligible("external application".into())
    }
}

/// LinkedIn 驱动
pub struct LinkedInDriver {
    credentials: LinkedInCredentials,
    browser_settings: BrowserSettings,
    pacer: Pacer,
    session: PlatformSession,
    browser: Option<Browser>,
    search_tab: Option<Arc<JsExecutor>>,
    apply_tab: Option<JsExecutor>,
}

impl LinkedInDriver {
    pub fn new(credentials: LinkedInCredentials, browser_settings: BrowserSettings, pacer: Pacer) -> Self {
        Self {
            credentials,
            browser_settings,
            pacer,
            session: PlatformSession::default(),
            browser: None,
            search_tab: None,
            apply_tab: None,
        }
    }

    fn auth_error(reason: AuthFailure, detail: impl Into<String>) -> AuthError {
        AuthError::new(Platform::LinkedIn, reason, detail)
    }

    /// 启动浏览器并打开搜索 / 投递两个标签页
    async fn ensure_browser(&mut self) -> Result<(), AuthError> {
        if self.browser.is_some() && self.apply_tab.is_some() {
            return Ok(());
        }

        let unavailable = |e: anyhow::Error| Self::auth_error(AuthFailure::BrowserUnavailable, format!("{:#}", e));
        let browser = open_browser(&self.browser_settings).await.map_err(unavailable)?;
        let search_page = open_tab(&browser, "about:blank").await.map_err(unavailable)?;
        let apply_page = open_tab(&browser, "about:blank").await.map_err(unavailable)?;

        self.search_tab = Some(Arc::new(JsExecutor::new(search_page)));
        self.apply_tab = Some(JsExecutor::new(apply_page));
        self.browser = Some(browser);
        Ok(())
    }
}

async fn login_with_cookie(exec: &JsExecutor, cookie: &str, pacer: Pacer) -> Result<(), AuthError> {
    info!("[LinkedIn] 🔑 使用会话 cookie 登录...");
    let nav = |e: anyhow::Error| LinkedInDriver::auth_error(AuthFailure::BrowserUnavailable, format!("{:#}", e));

    exec.goto(HOME_URL, NAV_TIMEOUT).await.map_err(nav)?;
    exec.set_cookie("li_at", cookie.trim(), ".linkedin.com").await.map_err(nav)?;
    exec.goto(FEED_URL, NAV_TIMEOUT).await.map_err(nav)?;
    pacer.pause(0.5).await;

    let state = dom::page_state(exec).await.map_err(nav)?;
    classify_login(&state).map_err(|reason| {
        LinkedInDriver::auth_error(reason, format!("cookie 登录后停留在 {}", state.url))
    })
}

async fn login_with_password(
    exec: &JsExecutor,
    credentials: &LinkedInCredentials,
    pacer: Pacer,
) -> Result<(), AuthError> {
    info!("[LinkedIn] 🔑 使用账号密码登录...");
    let nav = |e: anyhow::Error| LinkedInDriver::auth_error(AuthFailure::BrowserUnavailable, format!("{:#}", e));

    exec.goto(LOGIN_URL, NAV_TIMEOUT).await.map_err(nav)?;
    if !exec
        .wait_until("document.querySelector('input#username')", ELEMENT_TIMEOUT)
        .await
        .map_err(nav)?
    {
        let state = dom::page_state(exec).await.map_err(nav)?;
        let reason = state
            .blocked()
            .map(|r| block_failure(&r))
            .unwrap_or(AuthFailure::VerificationRequired);
        return Err(LinkedInDriver::auth_error(reason, "登录表单没有出现"));
    }

    dom::set_value(exec, "input#username", &credentials.email).await.map_err(nav)?;
    pacer.pause(0.1).await;
    dom::set_value(exec, "input#password", &credentials.password).await.map_err(nav)?;
    pacer.pause(0.1).await;
    exec.click("button[type=\"submit\"]").await.map_err(nav)?;

    exec.wait_until("!location.pathname.includes('/login')", LOGIN_TIMEOUT)
        .await
        .map_err(nav)?;
    pacer.pause(0.3).await;

    let state = dom::page_state(exec).await.map_err(nav)?;
    classify_login(&state).map_err(|reason| {
        LinkedInDriver::auth_error(reason, format!("登录后停留在 {}", state.url))
    })
}

#[async_trait]
impl PlatformDriver for LinkedInDriver {
    fn platform(&self) -> Platform {
        Platform::LinkedIn
    }

    async fn authenticate(&mut self) -> Result<(), AuthError> {
        let ttl = chrono::Duration::minutes(SESSION_TTL_MINUTES);
        if self.apply_tab.is_some() && self.session.is_reusable(ttl) {
            debug!("[LinkedIn] 复用已登录会话");
            return Ok(());
        }
        if !self.credentials.is_configured() {
            return Err(Self::auth_error(
                AuthFailure::MissingCredentials,
                "LINKEDIN_COOKIE 或 LINKEDIN_EMAIL/LINKEDIN_PASSWORD 未配置",
            ));
        }

        self.ensure_browser().await?;
        let exec = self
            .apply_tab
            .as_ref()
            .ok_or_else(|| Self::auth_error(AuthFailure::BrowserUnavailable, "投递标签页不可用"))?;

        let cookie = self
            .credentials
            .session_cookie
            .as_deref()
            .filter(|c| !c.trim().is_empty());
        let result = match cookie {
            Some(cookie) => match login_with_cookie(exec, cookie, self.pacer).await {
                Err(e) if e.reason == AuthFailure::CredentialsRejected && self.credentials.has_password() => {
                    warn!("[LinkedIn] ⚠️ cookie 已失效，改用账号密码");
                    login_with_password(exec, &self.credentials, self.pacer).await
                }
                other => other,
            },
            None => login_with_password(exec, &self.credentials, self.pacer).await,
        };

        match &result {
            Ok(()) => {
                info!("[LinkedIn] ✓ 登录成功");
                self.session.mark_authenticated();
            }
            Err(_) => self.session.invalidate(),
        }
        result
    }

    fn search(&self, titles: &[String], locations: &[String]) -> BoxStream<'static, JobPosting> {
        match &self.search_tab {
            Some(exec) => search_stream(
                Arc::new(LinkedInSearch {
                    exec: exec.clone(),
                    pacer: self.pacer,
                }),
                titles,
                locations,
                MAX_RESULT_PAGES,
            ),
            None => {
                warn!("[LinkedIn] ⚠️ 未登录，跳过搜索");
                stream::empty().boxed()
            }
        }
    }

    async fn apply(
        &mut self,
        posting: JobPosting,
        resolver: &QuestionResolver,
        ctx: &ApplyCtx,
    ) -> ApplicationRecord {
        let Some(exec) = self.apply_tab.as_ref() else {
            return ApplicationRecord::failed(posting, "not authenticated");
        };

        let mut surface = LinkedInSurface {
            exec,
            pacer: self.pacer,
        };
        let outcome = ApplyFlow::new(resolver, self.pacer, MAX_FORM_STEPS)
            .run(&mut surface, posting, ctx)
            .await;

        if outcome.record.is_blocked() {
            self.session.invalidate();
        } else {
            self.session.touch();
        }
        outcome.record
    }

    async fn shutdown(&mut self) {
        self.search_tab = None;
        self.apply_tab = None;
        self.session.invalidate();
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                debug!("[LinkedIn] 关闭浏览器失败: {}", e);
            }
        }
    }
}

/// 搜索标签页
struct LinkedInSearch {
    exec: Arc<JsExecutor>,
    pacer: Pacer,
}

#[async_trait]
impl SearchBackend for LinkedInSearch {
    fn platform(&self) -> Platform {
        Platform::LinkedIn
    }

    async fn fetch_page(&self, title: &str, location: &str, page: usize) -> anyhow::Result<Vec<JobPosting>> {
        self.exec.goto(&search_url(title, location, page), NAV_TIMEOUT).await?;
        self.pacer.pause(0.5).await;

        let has_cards = self
            .exec
            .wait_until(
                "document.querySelector('.jobs-search-results__list-item, .job-card-container')",
                ELEMENT_TIMEOUT,
            )
            .await?;
        if !has_cards {
            let state = dom::page_state(&self.exec).await?;
            if let Some(reason) = state.blocked() {
                anyhow::bail!("搜索页被拦截: {}", reason);
            }
            return Ok(Vec::new());
        }

        // 结果列表是懒加载的，先滚动一次再读取
        let _ = self.exec.eval(CARDS_SCRIPT).await?;
        self.pacer.pause(0.3).await;
        let cards: Vec<RawCard> = self.exec.eval_as(CARDS_SCRIPT).await?;

        Ok(cards.into_iter().filter_map(RawCard::into_posting).collect())
    }
}

/// 投递标签页上的 Easy Apply 弹窗
struct LinkedInSurface<'a> {
    exec: &'a JsExecutor,
    pacer: Pacer,
}

#[async_trait]
impl ApplySurface for LinkedInSurface<'_> {
    async fn open(&mut self, posting: &JobPosting) -> Result<(), FlowError> {
        if posting.apply_mode == ApplyMode::External {
            return Ok(());
        }
        self.exec.goto(&posting.url, NAV_TIMEOUT).await?;
        self.exec
            .wait_until(
                "document.querySelector('.jobs-apply-button, .jobs-details, .jobs-unified-top-card')",
                ELEMENT_TIMEOUT,
            )
            .await?;
        self.pacer.pause(0.5).await;
        Ok(())
    }

    async fn check_eligibility(&mut self, posting: &JobPosting) -> Result<Eligibility, FlowError> {
        if posting.apply_mode == ApplyMode::External {
            return Ok(Eligibility::Ineligible("external application".into()));
        }
        let page: JobPage = self.exec.eval_as(JOB_PAGE_SCRIPT).await?;
        Ok(eligibility_from(&page))
    }

    async fn start(&mut self) -> Result<(), FlowError> {
        let clicked = self.exec.click(".jobs-apply-button").await?
            || dom::click_any(self.exec, "body", &["easy apply"]).await?;
        if !clicked {
            return Err(FlowError::Structural("easy apply button not found".into()));
        }

        let opened = self
            .exec
            .wait_until("document.querySelector('.jobs-easy-apply-modal, [role=\"dialog\"]')", ELEMENT_TIMEOUT)
            .await?;
        if !opened {
            let state = dom::page_state(self.exec).await?;
            if let Some(reason) = state.blocked() {
                return Err(FlowError::PlatformBlocked(reason));
            }
            return Err(FlowError::Structural("easy apply modal did not open".into()));
        }
        Ok(())
    }

    async fn read_step(&mut self) -> Result<FormStep, FlowError> {
        let scan = dom::scan(self.exec, MODAL).await?;
        Ok(scan.into_step(&CONTROLS, CONFIRMATIONS))
    }

    async fn fill(&mut self, field: &FormField, value: &str) -> Result<(), FlowError> {
        dom::fill(self.exec, &field.handle, value).await?;
        Ok(())
    }

    async fn upload_resume(&mut self, path: &Path) -> Result<(), FlowError> {
        self.exec.set_input_files(RESUME_INPUT, path).await?;
        self.pacer.pause(0.5).await;
        Ok(())
    }

    async fn advance(&mut self, control: StepControl) -> Result<(), FlowError> {
        if !dom::click_any(self.exec, MODAL, CONTROLS.labels_for(control)).await? {
            return Err(FlowError::Structural(format!("{:?} button not clickable", control)));
        }
        self.pacer.pause(0.5).await;
        Ok(())
    }

    async fn abandon(&mut self) -> Result<(), FlowError> {
        self.exec.click("button[aria-label=\"Dismiss\"]").await?;
        self.pacer.pause(0.3).await;
        dom::click_any(self.exec, "body", &["discard"]).await?;
        Ok(())
    }
}
