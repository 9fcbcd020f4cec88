//! Test doubles shared by unit and integration tests.
//!
//! Available under `cfg(test)` and the `test-utils` feature.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Url;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::error::{Result, UpdaterError};
use crate::host::{CommandExecutor, HostUi, StateStore, INSTALL_COMMAND};
use crate::package_info::{ExtensionManifest, VersionInfo};
use crate::source::VersionSource;
use crate::state::MemoryStateStore;

/// One-shot HTTP responder bound to a loopback port.
pub struct TestServer {
    addr: SocketAddr,
    request: oneshot::Receiver<String>,
}

impl TestServer {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> Url {
        Url::parse(&format!("{}{path}", self.base_url())).unwrap()
    }

    /// Head of the request received (request line and headers).
    pub async fn request(self) -> String {
        self.request.await.unwrap_or_default()
    }
}

/// Answer the first connection with `status` and `body`, then stop.
pub async fn serve_once(status: u16, body: Vec<u8>) -> TestServer {
    serve_response(status, Vec::new(), body).await
}

/// Answer the first connection with a redirect to `location`.
pub async fn serve_redirect(status: u16, location: &Url) -> TestServer {
    serve_response(status, vec![("Location", location.to_string())], Vec::new()).await
}

async fn serve_response(status: u16, headers: Vec<(&'static str, String)>, body: Vec<u8>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut head = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => head.extend_from_slice(&buf[..n]),
            }
        }
        let _ = tx.send(String::from_utf8_lossy(&head).into_owned());

        let reason = match status {
            200 => "OK",
            302 => "Found",
            304 => "Not Modified",
            404 => "Not Found",
            500 => "Internal Server Error",
            _ => "Status",
        };
        let mut response = format!("HTTP/1.1 {status} {reason}\r\n");
        for (name, value) in &headers {
            response.push_str(&format!("{name}: {value}\r\n"));
        }
        response.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        ));
        let mut response = response.into_bytes();
        response.extend_from_slice(&body);
        let _ = socket.write_all(&response).await;
        let _ = socket.shutdown().await;
    });

    TestServer { addr, request: rx }
}

/// Accept one connection and never answer it.
pub async fn serve_stalled() -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        if let Ok((socket, _)) = listener.accept().await {
            let _ = tx.send(String::new());
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            drop(socket);
        }
    });

    TestServer { addr, request: rx }
}

/// Base URL of a loopback port nothing listens on.
pub async fn closed_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn sample_manifest() -> ExtensionManifest {
    ExtensionManifest {
        display_name: "PDDL".into(),
        name: "pddl".into(),
        publisher: "jan-dolejsi".into(),
    }
}

/// Ordered record of collaborator calls.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        if let Ok(mut entries) = self.0.lock() {
            entries.push(entry.into());
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().map(|entries| entries.clone()).unwrap_or_default()
    }
}

/// Source returning a canned release, or failing when none is set.
pub struct StaticSource {
    release: Option<VersionInfo>,
    journal: Journal,
}

impl StaticSource {
    pub fn new(release: VersionInfo, journal: Journal) -> Self {
        Self {
            release: Some(release),
            journal,
        }
    }

    pub fn failing(journal: Journal) -> Self {
        Self {
            release: None,
            journal,
        }
    }
}

#[async_trait]
impl VersionSource for StaticSource {
    fn describe(&self) -> String {
        "static".into()
    }

    async fn latest_version(&self) -> Result<VersionInfo> {
        self.journal.push("fetch");
        self.release
            .clone()
            .ok_or_else(|| UpdaterError::RemoteFetch("no attachment results".into()))
    }
}

/// UI answering warning prompts from a script; unscripted prompts are dismissed.
pub struct ScriptedUi {
    answers: Mutex<VecDeque<Option<String>>>,
    journal: Journal,
    pub messages: Mutex<Vec<String>>,
}

impl ScriptedUi {
    pub fn new(answers: &[Option<&str>], journal: Journal) -> Self {
        Self {
            answers: Mutex::new(answers.iter().map(|a| a.map(str::to_string)).collect()),
            journal,
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl HostUi for ScriptedUi {
    async fn show_information(&self, message: &str) {
        self.journal.push("notify");
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }

    async fn show_warning(&self, message: &str, actions: &[&str]) -> Option<String> {
        self.journal.push(format!("prompt[{}]", actions.join("|")));
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
        self.answers.lock().ok()?.pop_front().flatten()
    }

    fn progress_begin(&self, _title: &str) {}

    fn progress_end(&self, _title: &str) {}
}

/// Executor recording commands; install fails when configured to.
pub struct RecordingExecutor {
    fail_install: bool,
    journal: Journal,
    pub calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl RecordingExecutor {
    pub fn new(journal: Journal) -> Self {
        Self {
            fail_install: false,
            journal,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_install(journal: Journal) -> Self {
        Self {
            fail_install: true,
            ..Self::new(journal)
        }
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CommandExecutor for RecordingExecutor {
    async fn execute(&self, command: &str, args: &[String]) -> Result<()> {
        self.journal.push(format!("exec[{command}]"));
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((command.to_string(), args.to_vec()));
        }
        if self.fail_install && command == INSTALL_COMMAND {
            return Err(UpdaterError::CommandFailure {
                command: command.into(),
                status: 1,
                stderr: "Failed Installing Extensions: corrupt package".into(),
            });
        }
        Ok(())
    }
}

/// Memory store that journals writes.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryStateStore,
    journal: Journal,
}

impl RecordingStore {
    pub fn new(journal: Journal) -> Self {
        Self {
            inner: MemoryStateStore::new(),
            journal,
        }
    }

    /// Store pre-populated without journaling.
    pub fn seeded(key: &str, value: i64, journal: Journal) -> Self {
        Self {
            inner: MemoryStateStore::with_value(key, value),
            journal,
        }
    }
}

impl StateStore for RecordingStore {
    fn get(&self, key: &str) -> Option<i64> {
        self.inner.get(key)
    }

    fn update(&self, key: &str, value: Option<i64>) -> Result<()> {
        match value {
            Some(value) => self.journal.push(format!("persist({value})")),
            None => self.journal.push("clear"),
        }
        self.inner.update(key, value)
    }
}
