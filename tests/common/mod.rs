//! Loopback server shared by the integration tests.
#![allow(dead_code, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use auth_rpc::config::AuthConfig;
use auth_rpc::directory::ServiceRegistry;
use auth_rpc::error::Result;
use auth_rpc::protocol::dispatcher::Dispatcher;
use auth_rpc::transport::tcp::{start_server_with_shutdown, ServeOptions};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub struct TestServer {
    pub address: String,
    pub dispatcher: Arc<Dispatcher>,
    shutdown: mpsc::Sender<()>,
    handle: JoinHandle<Result<()>>,
}

impl TestServer {
    pub async fn stop(self) {
        let _ = self.shutdown.send(()).await;
        self.handle
            .await
            .expect("server task")
            .expect("server result");
    }
}

pub async fn spawn_server() -> TestServer {
    spawn_server_with(AuthConfig::default()).await
}

pub async fn spawn_server_with(auth: AuthConfig) -> TestServer {
    let registry = Arc::new(ServiceRegistry::new(&auth).expect("registry"));
    let dispatcher = Arc::new(Dispatcher::for_registry(registry).expect("dispatcher"));
    spawn_dispatcher(dispatcher).await
}

pub async fn spawn_dispatcher(dispatcher: Arc<Dispatcher>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address = listener.local_addr().expect("local addr").to_string();

    let options = ServeOptions {
        shutdown_timeout: Duration::from_secs(2),
        ..ServeOptions::default()
    };
    let (shutdown, shutdown_rx) = mpsc::channel(1);
    let handle = tokio::spawn(start_server_with_shutdown(
        listener,
        Arc::clone(&dispatcher),
        options,
        shutdown_rx,
    ));

    TestServer {
        address,
        dispatcher,
        shutdown,
        handle,
    }
}
