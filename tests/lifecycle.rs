//! Lifecycle and drain behaviour of the HTTPS server.

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use webhook_server::lifecycle::LifecycleState;
use webhook_server::net::ListenerBindError;
use webhook_server::{DrainTimeoutError, ServeError};

mod common;

use common::{https_client, new_server, start_server, test_router, wait_for_connections, TestCerts};

/// Give an accepted connection time to finish its handshake and reach the handler.
const SETTLE: Duration = Duration::from_millis(300);

#[tokio::test]
async fn serves_requests_over_tls() {
    let running = start_server().await;

    let response = https_client().get(running.url("/")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.text().await.unwrap(), "ok");

    running.server.drain(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn drain_with_no_connections_completes_immediately() {
    let running = start_server().await;

    let started = Instant::now();
    let outcome = running.server.drain(Duration::from_secs(5)).await;

    assert_eq!(outcome, Ok(()));
    assert!(started.elapsed() < Duration::from_secs(1), "took {:?}", started.elapsed());
    assert_eq!(running.server.state(), LifecycleState::Stopped);
    assert!(running.task.await.unwrap().is_ok());
}

#[tokio::test]
async fn drain_before_start_skips_binding() {
    let certs = TestCerts::generate();
    let server = new_server(&certs).await;

    assert_eq!(server.drain(Duration::from_secs(5)).await, Ok(()));
    assert_eq!(server.state(), LifecycleState::Stopped);

    server.start("127.0.0.1:0", test_router()).await.unwrap();
    assert_eq!(server.local_addr(), None);
}

#[tokio::test]
async fn address_in_use_is_a_bind_error() {
    let certs = TestCerts::generate();
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let taken = occupied.local_addr().unwrap().to_string();

    let server = new_server(&certs).await;
    let err = server.start(&taken, test_router()).await.unwrap_err();

    assert!(matches!(err, ServeError::Bind(ListenerBindError::Bind { .. })));
    assert_eq!(server.state(), LifecycleState::Stopped);
    assert_eq!(server.local_addr(), None);
    assert_eq!(server.drain(Duration::from_secs(5)).await, Ok(()));
}

#[tokio::test]
async fn start_runs_once_per_instance() {
    let running = start_server().await;

    let err = running
        .server
        .start("127.0.0.1:0", test_router())
        .await
        .unwrap_err();
    assert!(matches!(err, ServeError::AlreadyStarted));

    running.server.drain(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn handler_failures_do_not_touch_lifecycle() {
    let certs = TestCerts::generate();
    let server = new_server(&certs).await;
    let router = Router::new().route(
        "/",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );

    let task = {
        let server = server.clone();
        tokio::spawn(async move { server.start("127.0.0.1:0", router).await })
    };
    server.wait_for_state(LifecycleState::Serving).await;
    let url = format!("https://{}/", server.local_addr().unwrap());

    let response = https_client().get(&url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(server.state(), LifecycleState::Serving);

    server.drain(Duration::from_secs(5)).await.unwrap();
    assert!(task.await.unwrap().is_ok());
}

#[tokio::test]
async fn in_flight_request_finishes_during_drain() {
    let running = start_server().await;

    let request = tokio::spawn(https_client().get(running.url("/sleep/700")).send());
    wait_for_connections(&running.server, 1).await;
    tokio::time::sleep(SETTLE).await;

    let outcome = running.server.drain(Duration::from_secs(5)).await;
    assert_eq!(outcome, Ok(()));

    let response = request.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "slept");
    assert!(running.task.await.unwrap().is_ok());
}

#[tokio::test]
async fn connections_after_drain_are_rejected() {
    let running = start_server().await;

    let slow = tokio::spawn(https_client().get(running.url("/sleep/1500")).send());
    wait_for_connections(&running.server, 1).await;
    tokio::time::sleep(SETTLE).await;

    let drain = {
        let server = running.server.clone();
        tokio::spawn(async move { server.drain(Duration::from_secs(5)).await })
    };
    running.server.wait_for_state(LifecycleState::Draining).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let late = https_client()
        .get(running.url("/"))
        .timeout(Duration::from_secs(1))
        .send()
        .await;
    assert!(late.is_err(), "request after drain was served: {late:?}");

    let response = slow.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(drain.await.unwrap(), Ok(()));
}

#[tokio::test]
async fn drain_deadline_force_closes_slow_connections() {
    let running = start_server().await;

    let request = tokio::spawn(https_client().get(running.url("/sleep/10000")).send());
    wait_for_connections(&running.server, 1).await;
    tokio::time::sleep(SETTLE).await;

    let deadline = Duration::from_millis(500);
    let started = Instant::now();
    let outcome = running.server.drain(deadline).await;
    let elapsed = started.elapsed();

    assert_eq!(
        outcome,
        Err(DrainTimeoutError {
            deadline,
            forced: 1
        })
    );
    assert!(elapsed >= deadline, "closed early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "closed late: {elapsed:?}");
    assert!(request.await.unwrap().is_err());
    assert_eq!(running.server.state(), LifecycleState::Stopped);
}

#[tokio::test]
async fn concurrent_drains_share_one_sequence() {
    let running = start_server().await;

    let _request = tokio::spawn(https_client().get(running.url("/sleep/10000")).send());
    wait_for_connections(&running.server, 1).await;
    tokio::time::sleep(SETTLE).await;

    let deadline = Duration::from_millis(800);
    let started = Instant::now();
    let (first, second) = tokio::join!(
        running.server.drain(deadline),
        running.server.drain(Duration::from_secs(30)),
    );
    let elapsed = started.elapsed();

    assert!(first.is_err());
    assert_eq!(first, second);
    // One pass of the deadline, not two and not the second caller's 30s.
    assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");

    // A later call replays the recorded outcome without waiting.
    let replay_started = Instant::now();
    assert_eq!(running.server.drain(deadline).await, first);
    assert!(replay_started.elapsed() < Duration::from_millis(100));
}

#[tokio::test]
async fn drain_returns_once_work_is_done() {
    let running = start_server().await;

    let request = tokio::spawn(https_client().get(running.url("/sleep/1000")).send());
    wait_for_connections(&running.server, 1).await;
    tokio::time::sleep(SETTLE).await;

    let started = Instant::now();
    let outcome = running.server.drain(Duration::from_secs(5)).await;
    let elapsed = started.elapsed();

    assert_eq!(outcome, Ok(()));
    assert!(elapsed < Duration::from_secs(2), "waited {elapsed:?}");
    assert_eq!(request.await.unwrap().unwrap().status(), StatusCode::OK);
}

#[tokio::test]
async fn drain_times_out_at_the_deadline() {
    let running = start_server().await;

    let request = tokio::spawn(https_client().get(running.url("/sleep/10000")).send());
    wait_for_connections(&running.server, 1).await;
    tokio::time::sleep(SETTLE).await;

    let deadline = Duration::from_secs(5);
    let started = Instant::now();
    let outcome = running.server.drain(deadline).await;
    let elapsed = started.elapsed();

    assert!(matches!(outcome, Err(DrainTimeoutError { forced: 1, .. })));
    assert!(elapsed >= deadline, "closed early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(6500), "closed late: {elapsed:?}");
    assert!(request.await.unwrap().is_err());
}

#[tokio::test]
async fn drain_deadline_closes_connections_stuck_in_handshake() {
    let running = start_server().await;

    // A client that connects and never sends a ClientHello.
    let mut stalled = tokio::net::TcpStream::connect(running.addr).await.unwrap();
    wait_for_connections(&running.server, 1).await;

    let deadline = Duration::from_millis(500);
    let outcome = running.server.drain(deadline).await;
    assert_eq!(
        outcome,
        Err(DrainTimeoutError {
            deadline,
            forced: 1
        })
    );
    assert_eq!(running.server.state(), LifecycleState::Stopped);
    assert_eq!(running.server.active_connections(), 0);

    let mut buf = [0u8; 16];
    let read = tokio::time::timeout(Duration::from_secs(1), stalled.read(&mut buf)).await;
    assert!(
        matches!(read, Ok(Ok(0)) | Ok(Err(_))),
        "socket still open after drain: {read:?}"
    );
}

#[tokio::test]
async fn binds_host_name_addresses() {
    let certs = TestCerts::generate();
    let server = new_server(&certs).await;

    let task = {
        let server = server.clone();
        tokio::spawn(async move { server.start("localhost:0", test_router()).await })
    };
    assert_eq!(
        server.wait_for_state(LifecycleState::Serving).await,
        LifecycleState::Serving
    );
    let addr = server.local_addr().unwrap();
    assert!(addr.ip().is_loopback());

    let url = format!("https://{addr}/");
    let response = https_client().get(&url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    server.drain(Duration::from_secs(5)).await.unwrap();
    assert!(task.await.unwrap().is_ok());
}
