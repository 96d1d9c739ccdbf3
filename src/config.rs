use std::path::PathBuf;

use crate::browser::BrowserSettings;
use crate::models::LocationBias;
use crate::platforms::{IndeedCredentials, LinkedInCredentials};
use crate::services::Pacer;

/// 程序配置，启动时从环境变量读取一次
#[derive(Clone, Debug)]
pub struct Config {
    /// 每轮间隔（秒）
    pub cycle_interval_seconds: u64,
    /// 每个平台每轮最多投递数
    pub max_applications_per_run: usize,
    /// 页面操作之间的基础延迟（秒）
    pub action_delay_seconds: f64,
    /// 延迟抖动比例
    pub action_delay_jitter: f64,
    /// 是否按首选地点重排搜索地点
    pub prefer_location_bias: bool,
    pub preferred_location: String,
    pub prefer_remote: bool,
    /// 健康检查端口
    pub port: u16,
    /// applications.csv / ledger.csv 所在目录
    pub data_dir: PathBuf,
    pub profile_path: PathBuf,
    pub resume_path: Option<PathBuf>,
    // --- 浏览器 ---
    /// 设置后连接已有浏览器，否则自行启动
    pub browser_debug_port: Option<u16>,
    pub chrome_executable: Option<PathBuf>,
    pub headless: bool,
    // --- 平台凭据 ---
    pub linkedin_email: String,
    pub linkedin_password: String,
    pub linkedin_cookie: Option<String>,
    pub indeed_email: String,
    pub indeed_password: String,
    // --- 其他 ---
    pub applicant_phone: Option<String>,
    pub notify_webhook_url: Option<String>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cycle_interval_seconds: 600,
            max_applications_per_run: 50,
            action_delay_seconds: 3.0,
            action_delay_jitter: 0.3,
            prefer_location_bias: true,
            preferred_location: "Toronto, ON, Canada".to_string(),
            prefer_remote: true,
            port: 8080,
            data_dir: PathBuf::from("data"),
            profile_path: PathBuf::from("profile.toml"),
            resume_path: None,
            browser_debug_port: None,
            chrome_executable: None,
            headless: true,
            linkedin_email: String::new(),
            linkedin_password: String::new(),
            linkedin_cookie: None,
            indeed_email: String::new(),
            indeed_password: String::new(),
            applicant_phone: None,
            notify_webhook_url: None,
            verbose_logging: false,
        }
    }
}

fn var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    var(key).and_then(|v| v.trim().parse().ok())
}

fn flag(key: &str) -> Option<bool> {
    var(key).and_then(|v| match v.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    })
}

impl Config {
    /// 读取 `.env`（若存在）后从环境变量构建，无法解析的值回退到默认值
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let default = Self::default();
        Self {
            cycle_interval_seconds: parsed("CYCLE_INTERVAL_SECONDS").unwrap_or(default.cycle_interval_seconds),
            max_applications_per_run: parsed("MAX_APPLICATIONS_PER_RUN").unwrap_or(default.max_applications_per_run),
            action_delay_seconds: parsed("ACTION_DELAY_SECONDS").unwrap_or(default.action_delay_seconds),
            action_delay_jitter: parsed("ACTION_DELAY_JITTER").unwrap_or(default.action_delay_jitter),
            prefer_location_bias: flag("PREFER_LOCATION_BIAS").unwrap_or(default.prefer_location_bias),
            preferred_location: var("PREFERRED_LOCATION").unwrap_or(default.preferred_location),
            prefer_remote: flag("PREFER_REMOTE").unwrap_or(default.prefer_remote),
            port: parsed("PORT").unwrap_or(default.port),
            data_dir: var("DATA_DIR").map(PathBuf::from).unwrap_or(default.data_dir),
            profile_path: var("PROFILE_PATH").map(PathBuf::from).unwrap_or(default.profile_path),
            resume_path: var("RESUME_PATH").map(PathBuf::from),
            browser_debug_port: parsed("BROWSER_DEBUG_PORT"),
            chrome_executable: var("CHROME_EXECUTABLE").map(PathBuf::from),
            headless: flag("HEADLESS").unwrap_or(default.headless),
            linkedin_email: var("LINKEDIN_EMAIL").unwrap_or_default(),
            linkedin_password: var("LINKEDIN_PASSWORD").unwrap_or_default(),
            linkedin_cookie: var("LINKEDIN_COOKIE"),
            indeed_email: var("INDEED_EMAIL").unwrap_or_default(),
            indeed_password: var("INDEED_PASSWORD").unwrap_or_default(),
            applicant_phone: var("APPLICANT_PHONE"),
            notify_webhook_url: var("NOTIFY_WEBHOOK_URL"),
            verbose_logging: flag("VERBOSE_LOGGING").unwrap_or(default.verbose_logging),
        }
    }

    pub fn applications_csv(&self) -> PathBuf {
        self.data_dir.join("applications.csv")
    }

    pub fn ledger_csv(&self) -> PathBuf {
        self.data_dir.join("ledger.csv")
    }

    pub fn browser_settings(&self) -> BrowserSettings {
        BrowserSettings {
            debug_port: self.browser_debug_port,
            chrome_executable: self.chrome_executable.clone(),
            headless: self.headless,
        }
    }

    pub fn pacer(&self) -> Pacer {
        Pacer::new(self.action_delay_seconds, self.action_delay_jitter)
    }

    pub fn location_bias(&self) -> LocationBias {
        LocationBias {
            enabled: self.prefer_location_bias,
            preferred: self.preferred_location.clone(),
            prefer_remote: self.prefer_remote,
        }
    }

    pub fn linkedin_credentials(&self) -> LinkedInCredentials {
        LinkedInCredentials {
            email: self.linkedin_email.clone(),
            password: self.linkedin_password.clone(),
            session_cookie: self.linkedin_cookie.clone(),
        }
    }

    pub fn indeed_credentials(&self) -> IndeedCredentials {
        IndeedCredentials {
            email: self.indeed_email.clone(),
            password: self.indeed_password.clone(),
        }
    }

    /// 档案中留空时用作联系邮箱
    pub fn contact_email(&self) -> Option<&str> {
        [&self.linkedin_email, &self.indeed_email]
            .into_iter()
            .map(|s| s.as_str())
            .find(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.cycle_interval_seconds, 600);
        assert_eq!(config.max_applications_per_run, 50);
        assert_eq!(config.ledger_csv(), PathBuf::from("data").join("ledger.csv"));
        assert!(config.location_bias().enabled);
        assert!(config.browser_settings().debug_port.is_none());
    }

    #[test]
    fn test_contact_email_prefers_linkedin() {
        let config = Config {
            linkedin_email: String::new(),
            indeed_email: "me@example.com".to_string(),
            ..Config::default()
        };
        assert_eq!(config.contact_email(), Some("me@example.com"));
    }
}
