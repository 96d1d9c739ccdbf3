//! 服务状态快照
//!
//! 只有调度循环写入，健康检查等读者通过 `watch::Receiver` 并发读取。

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tokio::sync::watch;

/// 服务当前所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Starting,
    Running,
    Applying,
    Sleeping,
    Stopped,
}

impl ServiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceStatus::Starting => "starting",
            ServiceStatus::Running => "running",
            ServiceStatus::Applying => "applying",
            ServiceStatus::Sleeping => "sleeping",
            ServiceStatus::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 对外暴露的状态快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub status: ServiceStatus,
    pub started_at: DateTime<Utc>,
    pub last_cycle: Option<DateTime<Utc>>,
    pub total_applied: usize,
    pub cycles: u64,
}

impl StatusSnapshot {
    pub fn starting(started_at: DateTime<Utc>) -> Self {
        Self {
            status: ServiceStatus::Starting,
            started_at,
            last_cycle: None,
            total_applied: 0,
            cycles: 0,
        }
    }

    pub fn with_status(&self, status: ServiceStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

/// 状态发布出口
pub trait StatusPublisher: Send + Sync {
    fn publish(&self, snapshot: StatusSnapshot);
    fn current(&self) -> StatusSnapshot;
}

/// 基于 `tokio::sync::watch` 的状态板
#[derive(Debug)]
pub struct StatusBoard {
    tx: watch::Sender<StatusSnapshot>,
}

impl StatusBoard {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        let (tx, _) = watch::channel(StatusSnapshot::starting(started_at));
        Self { tx }
    }

    /// 新的只读订阅者
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.tx.subscribe()
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl StatusPublisher for StatusBoard {
    fn publish(&self, snapshot: StatusSnapshot) {
        // 没有订阅者时也要保留最新值
        self.tx.send_replace(snapshot);
    }

    fn current(&self) -> StatusSnapshot {
        self.tx.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_starts_in_starting_state() {
        let board = StatusBoard::default();
        let snapshot = board.current();
        assert_eq!(snapshot.status, ServiceStatus::Starting);
        assert_eq!(snapshot.cycles, 0);
        assert!(snapshot.last_cycle.is_none());
    }

    #[test]
    fn test_subscribers_see_latest_snapshot() {
        let board = StatusBoard::default();
        let rx = board.subscribe();

        let next = StatusSnapshot {
            cycles: 3,
            total_applied: 7,
            last_cycle: Some(Utc::now()),
            ..board.current().with_status(ServiceStatus::Sleeping)
        };
        board.publish(next.clone());

        assert_eq!(*rx.borrow(), next);
    }

    #[test]
    fn test_publish_without_subscribers_is_kept() {
        let board = StatusBoard::default();
        board.publish(board.current().with_status(ServiceStatus::Running));
        assert_eq!(board.current().status, ServiceStatus::Running);
    }

    #[test]
    fn test_snapshot_serializes_snake_case() {
        let snapshot = StatusSnapshot::starting(Utc::now()).with_status(ServiceStatus::Applying);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["status"], "applying");
        assert!(json["last_cycle"].is_null());
    }
}
