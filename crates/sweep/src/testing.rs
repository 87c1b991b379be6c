//! Scripted stand-ins for the device and the echo transport.

use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use common::{Error, ErrorReport, Result};
use probe::EchoTransport;
use ssh::{Failure, FailureKind, RemoteShell};

enum Reply {
    Text(String),
    Fail(FailureKind),
}

struct Rule {
    pattern: String,
    reply: Reply,
}

/// Answers commands by the first rule whose pattern the command contains.
/// Unmatched commands get an empty response.
pub struct ScriptedShell {
    rules: Vec<Rule>,
    sent: Arc<Mutex<Vec<String>>>,
    cancel_on: Option<(String, CancellationToken)>,
    last_failure: Option<Failure>,
}

impl ScriptedShell {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            sent: Arc::new(Mutex::new(Vec::new())),
            cancel_on: None,
            last_failure: None,
        }
    }

    pub fn respond(mut self, pattern: &str, text: &str) -> Self {
        self.rules.push(Rule {
            pattern: pattern.to_string(),
            reply: Reply::Text(text.to_string()),
        });
        self
    }

    pub fn fail(mut self, pattern: &str, kind: FailureKind) -> Self {
        self.rules.push(Rule {
            pattern: pattern.to_string(),
            reply: Reply::Fail(kind),
        });
        self
    }

    /// Trip `token` when a command containing `pattern` is sent.
    pub fn cancel_on(mut self, pattern: &str, token: CancellationToken) -> Self {
        self.cancel_on = Some((pattern.to_string(), token));
        self
    }

    /// Shared view of every command sent, in order.
    pub fn log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.sent)
    }
}

#[async_trait]
impl RemoteShell for ScriptedShell {
    async fn send_command(&mut self, command: &str, timeout: Duration) -> String {
        self.last_failure = None;
        self.sent.lock().unwrap().push(command.to_string());

        if let Some((pattern, token)) = &self.cancel_on {
            if command.contains(pattern.as_str()) {
                token.cancel();
            }
        }

        match self.rules.iter().find(|r| command.contains(r.pattern.as_str())) {
            Some(Rule {
                reply: Reply::Text(text),
                ..
            }) => text.clone(),
            Some(Rule {
                reply: Reply::Fail(kind),
                ..
            }) => {
                let err = match kind {
                    FailureKind::Reconnect => Error::SessionLost("connection reset".into()),
                    _ => Error::Timeout(timeout),
                };
                self.last_failure = Some(Failure {
                    kind: *kind,
                    report: ErrorReport::from_error(command, &err),
                });
                String::new()
            }
            None => String::new(),
        }
    }

    fn is_connected(&self) -> bool {
        !matches!(
            self.last_failure,
            Some(Failure {
                kind: FailureKind::Reconnect,
                ..
            })
        )
    }

    fn last_failure(&self) -> Option<&Failure> {
        self.last_failure.as_ref()
    }
}

/// Replies to every echo after a fixed delay.
pub struct FakeEcho {
    pub rtt: Duration,
    pub targets: Arc<Mutex<Vec<IpAddr>>>,
}

impl FakeEcho {
    pub fn new(rtt_ms: u64) -> Self {
        Self {
            rtt: Duration::from_millis(rtt_ms),
            targets: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl EchoTransport for FakeEcho {
    async fn echo(&self, target: IpAddr, _seq: u16, _timeout: Duration) -> Result<Duration> {
        self.targets.lock().unwrap().push(target);
        Ok(self.rtt)
    }
}

/// A peer that never answers: every echo runs into its timeout.
pub struct SilentEcho;

#[async_trait]
impl EchoTransport for SilentEcho {
    async fn echo(&self, _target: IpAddr, _seq: u16, timeout: Duration) -> Result<Duration> {
        tokio::time::sleep(timeout).await;
        Err(Error::Timeout(timeout))
    }
}
