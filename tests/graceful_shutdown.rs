//! Shutdown driven through the control channel, as SIGTERM would.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{client, named, start_server, ConfigSource};
use reloadable_server::lifecycle::{ControlEvent, ShutdownOutcome, ShutdownState};
use reloadable_server::HttpServer;
use tower::ServiceExt;

mod common;

#[tokio::test]
async fn idle_server_exits_without_waiting_for_grace_period() {
    let server = start_server(ConfigSource::new(named("idle")), Duration::from_secs(30)).await;

    let res = client().get(server.url("/")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    let started = std::time::Instant::now();
    assert!(server.ctx.control.send(ControlEvent::Shutdown));
    let outcome = tokio::time::timeout(Duration::from_secs(5), server.ctx.shutdown.terminated())
        .await
        .expect("drain should finish quickly");

    assert_eq!(outcome, ShutdownOutcome::Drained);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(server.exit_count(), 1);
}

#[tokio::test]
async fn in_flight_work_holds_shutdown_until_done() {
    let server = start_server(ConfigSource::new(named("busy")), Duration::from_secs(30)).await;
    let work = server.ctx.shutdown.register_work();

    server.ctx.control.send(ControlEvent::Shutdown);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(server.ctx.shutdown.state(), ShutdownState::Draining);
    assert_eq!(server.exit_count(), 0);

    drop(work);
    let outcome = tokio::time::timeout(Duration::from_secs(5), server.ctx.shutdown.terminated())
        .await
        .unwrap();
    assert_eq!(outcome, ShutdownOutcome::Drained);
    assert_eq!(server.exit_count(), 1);
}

#[tokio::test]
async fn stuck_work_is_abandoned_after_grace_period() {
    let server = start_server(ConfigSource::new(named("stuck")), Duration::from_millis(300)).await;
    let _stuck = server.ctx.shutdown.register_work();

    server.ctx.control.send(ControlEvent::Shutdown);
    let outcome = tokio::time::timeout(Duration::from_secs(5), server.ctx.shutdown.terminated())
        .await
        .unwrap();

    assert_eq!(outcome, ShutdownOutcome::TimedOut);
    assert_eq!(server.exit_count(), 1);
}

#[tokio::test]
async fn new_requests_are_refused_while_draining() {
    let server = start_server(ConfigSource::new(named("draining")), Duration::from_secs(30)).await;
    let _work = server.ctx.shutdown.register_work();

    server.ctx.control.send(ControlEvent::Shutdown);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let response = HttpServer::new(&server.ctx)
        .into_router()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = HttpServer::new(&server.ctx)
        .into_router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/admin/reload")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    assert_eq!(
        &body[..],
        b"Error reloading configuration: server is shutting down\n"
    );
}

#[tokio::test]
async fn pid_file_is_removed_and_reload_cannot_undo_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let pid_path = dir.path().join("server.pid");
    let mut config = named("pid");
    config.pid_file = Some(pid_path.clone());
    let server = start_server(ConfigSource::new(config), Duration::from_secs(30)).await;
    assert!(pid_path.exists());

    server.ctx.control.send(ControlEvent::Shutdown);
    server.ctx.control.send(ControlEvent::Reload);
    server.ctx.control.send(ControlEvent::Shutdown);
    server.ctx.shutdown.terminated().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(!pid_path.exists());
    assert_eq!(server.ctx.shutdown.state(), ShutdownState::Terminated);
    assert_eq!(server.ctx.config.generation(), 1);
    assert_eq!(server.exit_count(), 1);
}
