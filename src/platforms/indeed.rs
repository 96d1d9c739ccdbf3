//! Indeed Apply 驱动
//!
//! 与 LinkedIn 驱动互相独立，只共用 `dom` 中的无状态脚本。
//! 加拿大地点走 `ca.indeed.com`，其余走 `www.indeed.com`。

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
use crate::services::question_resolver::normalize;
use crate::services::{Pacer, QuestionResolver};
use crate::workflow::{
    ApplyCtx, ApplyFlow, ApplySurface, Eligibility, FormField, FormStep, StepControl,
};

const LOGIN_URL: &str = "https://secure.indeed.com/auth";
const US_HOST: &str = "www.indeed.com";
const CA_HOST: &str = "ca.indeed.com";

/// 申请表最多步数
pub const MAX_FORM_STEPS: usize = 12;
const RESULTS_PER_PAGE: usize = 10;

const NAV_TIMEOUT: Duration = Duration::from_secs(20);
const ELEMENT_TIMEOUT: Duration = Duration::from_secs(10);

const FORM_ROOT: &str = ".ia-BasePage-main, main";

const CONTROLS: ControlLabels = ControlLabels {
    submit: &["submit your application", "submit application", "submit"],
    review: &["review your application"],
    next: &["continue", "next"],
};

const CONFIRMATIONS: &[&str] = &[
    "application has been submitted",
    "application submitted",
    "you applied",
    "application sent",
];

const CANADIAN_PLACES: &[&str] = &[
    "canada",
    "ontario",
    "quebec",
    "british columbia",
    "alberta",
    "manitoba",
    "saskatchewan",
    "nova scotia",
    "new brunswick",
    "newfoundland",
    "prince edward island",
    "toronto",
    "vancouver",
    "montreal",
    "ottawa",
    "calgary",
    "edmonton",
    "winnipeg",
    "waterloo",
    "mississauga",
];

const PROVINCE_CODES: &[&str] = &["on", "qc", "bc", "ab", "mb", "sk", "ns", "nb", "nl", "pe", "yt", "nt", "nu"];

const CARDS_SCRIPT: &str = r#"(() => {
  const clean = s => (s || '').replace(/\s+/g, ' ').trim();
  const text = (card, sel) => { const el = card.querySelector(sel); return el ? clean(el.innerText) : ''; };
  return Array.from(document.querySelectorAll('.job_seen_beacon, .resultContent')).map(card => {
    const link = card.querySelector('a[href*="/viewjob"], a[href*="jk="], h2.jobTitle a');
    const holder = card.querySelector('[data-jk]') || card.closest('[data-jk]');
    return {
      jk: holder ? (holder.getAttribute('data-jk') || '') : '',
      href: link ? (link.getAttribute('href') || '') : '',
      title: text(card, 'h2.jobTitle a, h2.jobTitle span, .jcs-JobTitle'),
      company: text(card, '[data-testid="company-name"], .companyName, .company'),
      location: text(card, '[data-testid="text-location"], .companyLocation, .location'),
      easily_apply: !!card.querySelector('.ialbl, .indeed-apply-widget') || /easily apply/i.test(card.innerText || '')
    };
  });
})()"#;

const JOB_PAGE_SCRIPT: &str = r#"(() => {
  const clean = s => (s || '').replace(/\s+/g, ' ').trim();
  const btn = document.querySelector('#indeedApplyButton, .indeed-apply-button, #applyButtonLinkContainer a, #applyButtonLinkContainer button, button[id*="apply"]');
  return {
    apply_text: btn ? clean((btn.innerText || '') + ' ' + (btn.getAttribute('aria-label') || '')).toLowerCase() : '',
    apply_href: btn && btn.tagName === 'A' ? (btn.href || '') : '',
    indeed_apply: !!btn && (btn.id === 'indeedApplyButton' || (btn.className || '').toString().includes('indeed-apply')),
    url: location.href,
    text: clean(document.body ? document.body.innerText : '').toLowerCase().slice(0, 4000)
  };
})()"#;

/// Indeed 凭据
#[derive(Debug, Clone, Default)]
pub struct IndeedCredentials {
    pub email: String,
    pub password: String,
}

impl IndeedCredentials {
    fn is_configured(&self) -> bool {
        !self.email.trim().is_empty() && !self.password.is_empty()
    }
}

/// 地点是否在加拿大
pub fn is_canadian(location: &str) -> bool {
    let norm = format!(" {} ", normalize(location));
    if CANADIAN_PLACES.iter().any(|place| norm.contains(&format!(" {} ", place))) {
        return true;
    }
    location
        .rsplit(',')
        .next()
        .filter(|_| location.contains(','))
        .map(|tail| PROVINCE_CODES.contains(&tail.trim().to_lowercase().as_str()))
        .unwrap_or(false)
}

fn host_for(location: &str) -> &'static str {
    if is_canadian(location) {
        CA_HOST
    } else {
        US_HOST
    }
}

/// 搜索页地址
pub fn search_url(title: &str, location: &str, page: usize) -> String {
    let base = format!("https://{}/jobs", host_for(location));
    let start = (page * RESULTS_PER_PAGE).to_string();
    let mut params = vec![("q", title), ("l", location), ("sort", "date"), ("fromage", "7")];
    if page > 0 {
        params.push(("start", start.as_str()));
    }
    match Url::parse_with_params(&base, &params) {
        Ok(url) => url.to_string(),
        Err(_) => base,
    }
}

/// 规范化职位地址为 `/viewjob?jk=<id>`
pub fn canonical_job_url(host: &str, jk: &str, href: &str) -> Option<String> {
    let key = if !jk.trim().is_empty() {
        jk.trim().to_string()
    } else if let Ok(re) = Regex::new(r"[?&]jk=([0-9A-Za-z]+)") {
        re.captures(href)?.get(1)?.as_str().to_string()
    } else {
        return None;
    };
    Some(format!("https://{}/viewjob?jk={}", host, key))
}

/// 登录后页面判断
pub fn classify_login(state: &PageState) -> Result<(), AuthFailure> {
    if let Some(reason) = state.blocked() {
        return Err(if reason == "rate_limited" {
            AuthFailure::RateLimited
        } else {
            AuthFailure::VerificationRequired
        });
    }
    let on_auth_page = Url::parse(&state.url)
        .map(|u| u.host_str() == Some("secure.indeed.com") && u.path().starts_with("/auth"))
        .unwrap_or(true);
    if !on_auth_page {
        return Ok(());
    }
    if dom::contains_any(&state.text, &["verification code", "one-time code", "check your email", "verify"]) {
        Err(AuthFailure::VerificationRequired)
    } else {
        Err(AuthFailure::CredentialsRejected)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawCard {
    #[serde(default)]
    jk: String,
    #[serde(default)]
    href: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    company: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    easily_apply: bool,
}

impl RawCard {
    fn into_posting(self, host: &str) -> Option<JobPosting> {
        let url = canonical_job_url(host, &self.jk, &self.href)?;
        if self.title.is_empty() {
            return None;
        }
        let mode = if self.easily_apply {
            ApplyMode::QuickApply
        } else {
            ApplyMode::Unknown
        };
        Some(JobPosting::new(
            Platform::Indeed,
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
    pub apply_href: String,
    pub indeed_apply: bool,
    pub url: String,
    pub text: String,
}

/// 详情页 → 资格判断
pub fn eligibility_from(page: &JobPage) -> Eligibility {
    if let Some(reason) = dom::detect_block(&page.url, &page.text) {
        return Eligibility::Blocked(reason);
    }
    if page.apply_text.contains("applied") {
        return Eligibility::Ineligible("already applied".into());
    }
    if page.apply_text.contains("company site") {
        return Eligibility::Ineligible("external application".into());
    }
    if page.indeed_apply || page.apply_text.contains("apply now") {
        return Eligibility::Eligible;
    }
    if page.apply_text.is_empty() {
        Eligibility::Ineligible("no apply button".into())
    } else {
        Eligibility::Ineligible("external application".into())
    }
}

/// Indeed 驱动
pub struct IndeedDriver {
    credentials: IndeedCredentials,
    browser_settings: BrowserSettings,
    pacer: Pacer,
    session: PlatformSession,
    browser: Option<Browser>,
    search_tab: Option<Arc<JsExecutor>>,
    apply_tab: Option<JsExecutor>,
}

impl IndeedDriver {
    pub fn new(credentials: IndeedCredentials, browser_settings: BrowserSettings, pacer: Pacer) -> Self {
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
        AuthError::new(Platform::Indeed, reason, detail)
    }

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

/// 邮箱 → 密码 两段式登录
async fn login(exec: &JsExecutor, credentials: &IndeedCredentials, pacer: Pacer) -> Result<(), AuthError> {
    info!("[Indeed] 🔑 使用账号密码登录...");
    let nav = |e: anyhow::Error| IndeedDriver::auth_error(AuthFailure::BrowserUnavailable, format!("{:#}", e));
    let stuck = |state: PageState, detail: &str| {
        let reason = match state.blocked().as_deref() {
            Some("rate_limited") => AuthFailure::RateLimited,
            _ => AuthFailure::VerificationRequired,
        };
        IndeedDriver::auth_error(reason, detail)
    };

    exec.goto(LOGIN_URL, NAV_TIMEOUT).await.map_err(nav)?;
    let email_selector = "input[type=\"email\"], input[name=\"__email\"]";
    if !exec
        .wait_until(&format!("document.querySelector('{}')", email_selector.replace('\'', "\\'")), ELEMENT_TIMEOUT)
        .await
        .map_err(nav)?
    {
        let state = dom::page_state(exec).await.map_err(nav)?;
        return Err(stuck(state, "邮箱输入框没有出现"));
    }

    dom::set_value(exec, email_selector, &credentials.email).await.map_err(nav)?;
    pacer.pause(0.2).await;
    exec.click("button[type=\"submit\"]").await.map_err(nav)?;
    pacer.pause(0.7).await;

    let password_selector = "input[type=\"password\"], input[name=\"__password\"]";
    if !exec
        .wait_until(
            &format!("document.querySelector('{}')", password_selector.replace('\'', "\\'")),
            ELEMENT_TIMEOUT,
        )
        .await
        .map_err(nav)?
    {
        // 没有密码框通常意味着要求邮箱验证码或验证码挑战
        let state = dom::page_state(exec).await.map_err(nav)?;
        return Err(stuck(state, "密码输入框没有出现"));
    }

    dom::set_value(exec, password_selector, &credentials.password).await.map_err(nav)?;
    pacer.pause(0.2).await;
    exec.click("button[type=\"submit\"]").await.map_err(nav)?;

    exec.wait_until("!location.host.startsWith('secure.indeed.com')", NAV_TIMEOUT)
        .await
        .map_err(nav)?;
    pacer.pause(0.5).await;

    let state = dom::page_state(exec).await.map_err(nav)?;
    classify_login(&state).map_err(|reason| IndeedDriver::auth_error(reason, format!("登录后停留在 {}", state.url)))
}

#[async_trait]
impl PlatformDriver for IndeedDriver {
    fn platform(&self) -> Platform {
        Platform::Indeed
    }

    async fn authenticate(&mut self) -> Result<(), AuthError> {
        let ttl = chrono::Duration::minutes(SESSION_TTL_MINUTES);
        if self.apply_tab.is_some() && self.session.is_reusable(ttl) {
            debug!("[Indeed] 复用已登录会话");
            return Ok(());
        }
        if !self.credentials.is_configured() {
            return Err(Self::auth_error(
                AuthFailure::MissingCredentials,
                "INDEED_EMAIL/INDEED_PASSWORD 未配置",
            ));
        }

        self.ensure_browser().await?;
        let exec = self
            .apply_tab
            .as_ref()
            .ok_or_else(|| Self::auth_error(AuthFailure::BrowserUnavailable, "投递标签页不可用"))?;

        let result = login(exec, &self.credentials, self.pacer).await;
        match &result {
            Ok(()) => {
                info!("[Indeed] ✓ 登录成功");
                self.session.mark_authenticated();
            }
            Err(_) => self.session.invalidate(),
        }
        result
    }

    fn search(&self, titles: &[String], locations: &[String]) -> BoxStream<'static, JobPosting> {
        match &self.search_tab {
            Some(exec) => search_stream(
                Arc::new(IndeedSearch {
                    exec: exec.clone(),
                    pacer: self.pacer,
                }),
                titles,
                locations,
                MAX_RESULT_PAGES,
            ),
            None => {
                warn!("[Indeed] ⚠️ 未登录，跳过搜索");
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

        let mut surface = IndeedSurface {
            exec,
            pacer: self.pacer,
            apply_href: String::new(),
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
                debug!("[Indeed] 关闭浏览器失败: {}", e);
            }
        }
    }
}

struct IndeedSearch {
    exec: Arc<JsExecutor>,
    pacer: Pacer,
}

#[async_trait]
impl SearchBackend for IndeedSearch {
    fn platform(&self) -> Platform {
        Platform::Indeed
    }

    async fn fetch_page(&self, title: &str, location: &str, page: usize) -> anyhow::Result<Vec<JobPosting>> {
        self.exec.goto(&search_url(title, location, page), NAV_TIMEOUT).await?;
        self.pacer.pause(0.7).await;

        let has_cards = self
            .exec
            .wait_until("document.querySelector('.job_seen_beacon, .resultContent')", ELEMENT_TIMEOUT)
            .await?;
        if !has_cards {
            let state = dom::page_state(&self.exec).await?;
            if let Some(reason) = state.blocked() {
                anyhow::bail!("搜索页被拦截: {}", reason);
            }
            return Ok(Vec::new());
        }

        let host = host_for(location);
        let cards: Vec<RawCard> = self.exec.eval_as(CARDS_SCRIPT).await?;
        Ok(cards.into_iter().filter_map(|card| card.into_posting(host)).collect())
    }
}

/// 投递标签页上的 Indeed Apply 流程
struct IndeedSurface<'a> {
    exec: &'a JsExecutor,
    pacer: Pacer,
    /// 投递按钮直接给出的地址（有的话直接导航，避免新窗口）
    apply_href: String,
}

#[async_trait]
impl ApplySurface for IndeedSurface<'_> {
    async fn open(&mut self, posting: &JobPosting) -> Result<(), FlowError> {
        if posting.apply_mode == ApplyMode::External {
            return Ok(());
        }
        self.exec.goto(&posting.url, NAV_TIMEOUT).await?;
        self.exec
            .wait_until(
                "document.querySelector('#indeedApplyButton, #applyButtonLinkContainer, .jobsearch-JobInfoHeader-title')",
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
        self.apply_href = page.apply_href.clone();
        Ok(eligibility_from(&page))
    }

    async fn start(&mut self) -> Result<(), FlowError> {
        if self.apply_href.contains("smartapply") {
            self.exec.goto(&self.apply_href, NAV_TIMEOUT).await?;
        } else {
            // 去掉新窗口打开，让申请表留在当前标签页
            self.exec
                .eval("document.querySelectorAll('a[target=\"_blank\"]').forEach(a => a.removeAttribute('target'))")
                .await?;
            let clicked = self.exec.click("#indeedApplyButton, .indeed-apply-button").await?
                || dom::click_any(self.exec, "body", &["apply now"]).await?;
            if !clicked {
                return Err(FlowError::Structural("apply button not found".into()));
            }
        }

        let opened = self
            .exec
            .wait_until(
                "location.host.includes('smartapply') || document.querySelector('.ia-BasePage')",
                ELEMENT_TIMEOUT,
            )
            .await?;
        if !opened {
            let state = dom::page_state(self.exec).await?;
            if let Some(reason) = state.blocked() {
                return Err(FlowError::PlatformBlocked(reason));
            }
            return Err(FlowError::Structural("application form did not open".into()));
        }
        Ok(())
    }

    async fn read_step(&mut self) -> Result<FormStep, FlowError> {
        let scan = dom::scan(self.exec, FORM_ROOT).await?;
        Ok(scan.into_step(&CONTROLS, CONFIRMATIONS))
    }

    async fn fill(&mut self, field: &FormField, value: &str) -> Result<(), FlowError> {
        dom::fill(self.exec, &field.handle, value).await?;
        Ok(())
    }

    async fn upload_resume(&mut self, path: &Path) -> Result<(), FlowError> {
        self.exec.set_input_files("input[type=\"file\"]", path).await?;
        self.pacer.pause(1.0).await;
        Ok(())
    }

    async fn advance(&mut self, control: StepControl) -> Result<(), FlowError> {
        if !dom::click_any(self.exec, FORM_ROOT, CONTROLS.labels_for(control)).await? {
            return Err(FlowError::Structural(format!("{:?} button not clickable", control)));
        }
        self.pacer.pause(1.0).await;
        Ok(())
    }

    /// Indeed 会自动保存草稿，离开页面即可
    async fn abandon(&mut self) -> Result<(), FlowError> {
        self.exec.goto("about:blank", ELEMENT_TIMEOUT).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canadian_locations_use_ca_host() {
        assert!(is_canadian("Toronto, ON"));
        assert!(is_canadian("Remote in Canada"));
        assert!(is_canadian("Vancouver"));
        assert!(is_canadian("Halifax, NS"));
        assert!(!is_canadian("Remote"));
        assert!(!is_canadian("New York, NY"));
        assert!(!is_canadian("Boston"));

        assert!(search_url("Analyst", "Ottawa, ON", 0).starts_with("https://ca.indeed.com/jobs?"));
        assert!(search_url("Analyst", "Austin, TX", 0).starts_with("https://www.indeed.com/jobs?"));
    }

    #[test]
    fn test_search_url_params() {
        let url = search_url("Operations Research", "Remote", 1);
        assert!(url.contains("q=Operations+Research"));
        assert!(url.contains("l=Remote"));
        assert!(url.contains("sort=date"));
        assert!(url.contains("fromage=7"));
        assert!(url.contains("start=10"));
    }

    #[test]
    fn test_canonical_job_url() {
        assert_eq!(
            canonical_job_url(CA_HOST, "", "/rc/clk?jk=a1b2c3d4e5f6&from=serp&vjs=3"),
            Some("https://ca.indeed.com/viewjob?jk=a1b2c3d4e5f6".to_string())
        );
        assert_eq!(
            canonical_job_url(US_HOST, "ff00", "/pagead/clk?mo=r"),
            Some("https://www.indeed.com/viewjob?jk=ff00".to_string())
        );
        assert_eq!(canonical_job_url(US_HOST, "", "/cmp/acme"), None);
    }

    #[test]
    fn test_eligibility_from_job_page() {
        let page = |apply_text: &str, indeed_apply: bool| JobPage {
            apply_text: apply_text.into(),
            indeed_apply,
            url: "https://ca.indeed.com/viewjob?jk=1".into(),
            ..Default::default()
        };
        assert_eq!(eligibility_from(&page("apply now", true)), Eligibility::Eligible);
        assert_eq!(
            eligibility_from(&page("apply on company site", false)),
            Eligibility::Ineligible("external application".into())
        );
        assert_eq!(
            eligibility_from(&page("applied", true)),
            Eligibility::Ineligible("already applied".into())
        );

        let blocked = JobPage {
            url: "https://ca.indeed.com/viewjob?jk=1".into(),
            text: "please verify you are human".into(),
            ..Default::default()
        };
        assert_eq!(eligibility_from(&blocked), Eligibility::Blocked("captcha".into()));
    }

    #[test]
    fn test_classify_login() {
        let home = PageState {
            url: "https://www.indeed.com/".into(),
            text: String::new(),
        };
        assert_eq!(classify_login(&home), Ok(()));

        let code = PageState {
            url: "https://secure.indeed.com/auth?continue=x".into(),
            text: "we sent a verification code to your email".into(),
        };
        assert_eq!(classify_login(&code), Err(AuthFailure::VerificationRequired));

        let rejected = PageState {
            url: "https://secure.indeed.com/auth".into(),
            text: "incorrect password".into(),
        };
        assert_eq!(classify_login(&rejected), Err(AuthFailure::CredentialsRejected));
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_without_browser() {
        let mut driver = IndeedDriver::new(IndeedCredentials::default(), BrowserSettings::default(), Pacer::disabled());
        let err = driver.authenticate().await.unwrap_err();
        assert_eq!(err.reason, AuthFailure::MissingCredentials);
    }
}
