//! 健康检查 HTTP 服务
//!
//! `GET /` 与 `GET /health` 返回当前状态快照。

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::error::{AppError, AppResult};
use crate::status::StatusSnapshot;

type StatusRx = watch::Receiver<StatusSnapshot>;

pub fn router(status: StatusRx) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .with_state(status)
}

async fn health(State(status): State<StatusRx>) -> Json<Value> {
    let snapshot = status.borrow().clone();
    Json(json!({
        "status": snapshot.status,
        "started_at": snapshot.started_at.to_rfc3339(),
        "last_cycle": snapshot.last_cycle.map(|t| t.to_rfc3339()),
        "total_applied": snapshot.total_applied,
        "cycles": snapshot.cycles,
    }))
}

/// 在 `port` 上提供健康检查，直到进程退出
pub async fn serve(port: u16, status: StatusRx) -> AppResult<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await.map_err(AppError::Health)?;
    info!("🩺 健康检查服务: http://{}/health", addr);
    axum::serve(listener, router(status))
        .await
        .map_err(AppError::Health)
}

/// 后台启动健康检查；失败只记录日志，不影响投递循环
pub fn spawn(port: u16, status: StatusRx) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = serve(port, status).await {
            error!("❌ 健康检查服务退出: {}", e);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{ServiceStatus, StatusBoard, StatusPublisher};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_reports_snapshot() {
        let board = StatusBoard::default();
        let mut snapshot = board.current().with_status(ServiceStatus::Sleeping);
        snapshot.cycles = 2;
        snapshot.total_applied = 5;
        board.publish(snapshot);

        let (code, body) = get_json(router(board.subscribe()), "/health").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["status"], "sleeping");
        assert_eq!(body["cycles"], 2);
        assert_eq!(body["total_applied"], 5);
        assert!(body["last_cycle"].is_null());
    }

    #[tokio::test]
    async fn test_root_is_alias_of_health() {
        let board = StatusBoard::default();
        let (code, body) = get_json(router(board.subscribe()), "/").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["status"], "starting");
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let board = StatusBoard::default();
        let response = router(board.subscribe())
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_serve_reports_bind_failure() {
        // 先占住端口
        let taken = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let board = StatusBoard::default();
        let result = serve(port, board.subscribe()).await;
        assert!(matches!(result, Err(AppError::Health(_))));
    }
}
