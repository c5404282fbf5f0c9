//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use switchyard::config::{DispatchConfig, TimeoutConfig};
use switchyard::error::MappingError;
use switchyard::resource::{ResourceRegistry, ResourceType};
use switchyard::routing::MappingTable;
use switchyard::{Application, Dispatcher, HttpServer};

/// blanket, smurf, and quilt (a kind of blanket).
pub fn resources() -> ResourceRegistry {
    ResourceRegistry::default()
        .with(ResourceType::new("blanket").action("list", |_| Ok("blankets".into())))
        .with(ResourceType::new("smurf"))
        .with(ResourceType::new("quilt").parent("blanket"))
}

/// An application configured by `configure`, with default settings.
pub fn application<F>(configure: F) -> Arc<Application>
where
    F: Fn(&mut MappingTable) -> Result<(), MappingError> + Send + Sync + 'static,
{
    application_with(DispatchConfig::default(), configure)
}

pub fn application_with<F>(settings: DispatchConfig, configure: F) -> Arc<Application>
where
    F: Fn(&mut MappingTable) -> Result<(), MappingError> + Send + Sync + 'static,
{
    let app = Application::new(resources(), settings);
    app.configure(configure).unwrap();
    Arc::new(app)
}

/// Ordered log of pipeline events, shareable with closures.
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == event).count()
    }
}

/// Serve `dispatcher` on an ephemeral port. The server lives until the
/// runtime shuts down.
pub async fn start_server(dispatcher: Dispatcher) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(dispatcher, &TimeoutConfig::default());

    tokio::spawn(async move {
        let _ = server.run(listener, std::future::pending()).await;
    });
    addr
}

/// Send a bare HTTP/1.1 request and return the raw response text.
pub async fn raw_request(addr: SocketAddr, method: &str, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "{method} {path} HTTP/1.1\r\nHost: localhost:{}\r\nConnection: close\r\n\r\n",
        addr.port()
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}
