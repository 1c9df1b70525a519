//! Shared helpers: a log recorder and an in-process server.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use noteworthy::middleware::{Fields, LoggerFactory, RequestLogger, RequestLogging};
use noteworthy::{Router, Server};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

#[derive(Clone, Debug)]
pub struct Entry {
    pub level: Level,
    pub request_id: String,
    pub method: String,
    pub path: String,
    pub fields: Fields,
    pub message: String,
}

/// Captures every entry the middleware emits.
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<Entry>>>);

impl Recorder {
    pub fn logging(&self) -> RequestLogging {
        RequestLogging::new().logger_factory(self.clone())
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.0.lock().unwrap().clone()
    }

    pub fn for_request(&self, request_id: &str) -> Vec<Entry> {
        self.entries().into_iter().filter(|e| e.request_id == request_id).collect()
    }
}

struct Logger {
    request_id: String,
    method: String,
    path: String,
    out: Recorder,
}

impl Logger {
    fn push(&self, level: Level, fields: Fields, message: &str) {
        self.out.0.lock().unwrap().push(Entry {
            level,
            request_id: self.request_id.clone(),
            method: self.method.clone(),
            path: self.path.clone(),
            fields,
            message: message.to_owned(),
        });
    }
}

impl RequestLogger for Logger {
    fn info(&self, fields: Fields, message: &str) { self.push(Level::Info, fields, message) }
    fn warn(&self, fields: Fields, message: &str) { self.push(Level::Warn, fields, message) }
    fn error(&self, fields: Fields, message: &str) { self.push(Level::Error, fields, message) }
}

impl LoggerFactory for Recorder {
    fn request_logger(&self, request_id: &str, method: &str, path: &str) -> Box<dyn RequestLogger> {
        Box::new(Logger {
            request_id: request_id.to_owned(),
            method: method.to_owned(),
            path: path.to_owned(),
            out: self.clone(),
        })
    }
}

/// A running server; dropping `shutdown` (or sending on it) stops it.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: oneshot::Sender<()>,
    pub handle: JoinHandle<Result<(), noteworthy::Error>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn spawn(router: Router) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown, rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(Server::serve_with_shutdown(listener, router, async move {
        let _ = rx.await;
    }));

    TestServer { addr, shutdown, handle }
}

/// A pooled client that ignores proxy settings from the environment.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .unwrap()
}
