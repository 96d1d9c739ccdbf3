//! 操作节奏控制
//!
//! 每次页面操作之间等待 `base * multiplier ± jitter`，避免固定间隔

use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

/// 最短等待时间（秒），只在配置了基础延迟时生效
const MIN_DELAY_SECS: f64 = 0.5;

#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    base_secs: f64,
    jitter_fraction: f64,
}

impl Pacer {
    pub fn new(base_secs: f64, jitter_fraction: f64) -> Self {
        Self {
            base_secs: base_secs.max(0.0),
            jitter_fraction: jitter_fraction.clamp(0.0, 1.0),
        }
    }

    /// 不等待（测试用）
    pub fn disabled() -> Self {
        Self::new(0.0, 0.0)
    }

    /// 计算一次等待时长
    pub fn delay_for(&self, multiplier: f64) -> Duration {
        let base = self.base_secs * multiplier.max(0.0);
        if base <= 0.0 {
            return Duration::ZERO;
        }

        let jitter = base * self.jitter_fraction;
        let offset = if jitter > 0.0 {
            rand::rng().random_range(-jitter..=jitter)
        } else {
            0.0
        };

        Duration::from_secs_f64((base + offset).max(MIN_DELAY_SECS))
    }

    /// 按倍数等待
    pub async fn pause(&self, multiplier: f64) {
        let delay = self.delay_for(multiplier);
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_pacer_never_waits() {
        let pacer = Pacer::disabled();
        assert_eq!(pacer.delay_for(1.0), Duration::ZERO);
        assert_eq!(pacer.delay_for(5.0), Duration::ZERO);
    }

    #[test]
    fn test_delay_stays_within_jitter_band() {
        let pacer = Pacer::new(3.0, 0.3);
        for _ in 0..200 {
            let secs = pacer.delay_for(1.0).as_secs_f64();
            assert!((2.09..=3.91).contains(&secs), "delay {} out of band", secs);
        }
    }

    #[test]
    fn test_delay_has_floor() {
        let pacer = Pacer::new(3.0, 0.0);
        assert_eq!(pacer.delay_for(0.1), Duration::from_secs_f64(0.5));
    }

    #[test]
    fn test_pause_disabled_returns_immediately() {
        tokio_test::block_on(Pacer::disabled().pause(10.0));
    }
}
