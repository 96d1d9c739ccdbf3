use chrono::{DateTime, Duration, Utc};

/// 平台会话状态，只属于单个驱动实例
#[derive(Debug, Clone, Default)]
pub struct PlatformSession {
    pub authenticated: bool,
    pub last_activity: Option<DateTime<Utc>>,
}

impl PlatformSession {
    pub fn mark_authenticated(&mut self) {
        self.authenticated = true;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_activity = Some(Utc::now());
    }

    pub fn invalidate(&mut self) {
        self.authenticated = false;
    }

    /// 会话是否可以复用
    pub fn is_reusable(&self, ttl: Duration) -> bool {
        match (self.authenticated, self.last_activity) {
            (true, Some(last)) => Utc::now() - last < ttl,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_session_is_reusable() {
        let mut session = PlatformSession::default();
        assert!(!session.is_reusable(Duration::minutes(30)));

        session.mark_authenticated();
        assert!(session.is_reusable(Duration::minutes(30)));

        session.invalidate();
        assert!(!session.is_reusable(Duration::minutes(30)));
    }

    #[test]
    fn test_stale_session_is_not_reusable() {
        let session = PlatformSession {
            authenticated: true,
            last_activity: Some(Utc::now() - Duration::hours(2)),
        };
        assert!(!session.is_reusable(Duration::minutes(30)));
    }
}
