//! Shared utilities for integration testing.

#![allow(dead_code)]

use axum::extract::Path;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use webhook_server::lifecycle::LifecycleState;
use webhook_server::net::load_tls_config;
use webhook_server::{HttpServer, ServeError};

/// Self-signed certificate and key written to a scratch directory.
pub struct TestCerts {
    dir: PathBuf,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl TestCerts {
    pub fn generate() -> Self {
        let dir = std::env::temp_dir().join(format!("webhook-server-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();

        let certified =
            rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let cert_path = dir.join("cert.pem");
        let key_path = dir.join("key.pem");
        std::fs::write(&cert_path, certified.cert.pem()).unwrap();
        std::fs::write(&key_path, certified.key_pair.serialize_pem()).unwrap();

        Self {
            dir,
            cert_path,
            key_path,
        }
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }
}

impl Drop for TestCerts {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

/// Router with `/` answering immediately and `/sleep/{ms}` answering after a delay.
pub fn test_router() -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route(
            "/sleep/{ms}",
            get(|Path(ms): Path<u64>| async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                "slept"
            }),
        )
}

/// A server started on an ephemeral localhost port.
pub struct RunningServer {
    pub server: HttpServer,
    pub addr: SocketAddr,
    pub task: JoinHandle<Result<(), ServeError>>,
    _certs: TestCerts,
}

impl RunningServer {
    pub fn url(&self, path: &str) -> String {
        format!("https://{}{}", self.addr, path)
    }
}

pub async fn new_server(certs: &TestCerts) -> HttpServer {
    let tls = load_tls_config(&certs.cert_path, &certs.key_path)
        .await
        .unwrap();
    HttpServer::new(tls)
}

pub async fn start_server() -> RunningServer {
    let certs = TestCerts::generate();
    let server = new_server(&certs).await;

    let task = {
        let server = server.clone();
        tokio::spawn(async move { server.start("127.0.0.1:0", test_router()).await })
    };

    assert_eq!(
        server.wait_for_state(LifecycleState::Serving).await,
        LifecycleState::Serving
    );
    let addr = server.local_addr().unwrap();

    RunningServer {
        server,
        addr,
        task,
        _certs: certs,
    }
}

/// HTTPS client that trusts the self-signed test certificate. Connections are
/// not pooled so every request opens its own connection.
pub fn https_client() -> reqwest::Client {
    reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Wait until the server has at least `count` open connections.
pub async fn wait_for_connections(server: &HttpServer, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while server.active_connections() < count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("connections never opened");
}
