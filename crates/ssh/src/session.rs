use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use common::{Error, ErrorReport, Result};

use crate::clean::combine_output;
use crate::client::{Credentials, SshSession};
use crate::events::{Failure, FailureKind, SessionEvent, SessionListener};

/// Printed by RouterOS as an empty line; proves the shell accepts commands.
pub const DEFAULT_LIVENESS_COMMAND: &str = ":put \"\"";

/// Default bound for connect and the liveness check.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// The command channel the scan drives.
///
/// `send_command` never fails: transport problems yield an empty string and
/// are kept in [`RemoteShell::last_failure`] until the next command.
#[async_trait]
pub trait RemoteShell: Send {
    async fn send_command(&mut self, command: &str, timeout: Duration) -> String;

    fn is_connected(&self) -> bool;

    /// Failure recorded by the most recent `send_command`, if any.
    fn last_failure(&self) -> Option<&Failure>;
}

/// One persistent SSH connection with a single reconnect attempt per
/// command.
pub struct Session {
    credentials: Option<Credentials>,
    connect_timeout: Duration,
    liveness_command: String,
    inner: Option<SshSession>,
    listener: Option<Arc<dyn SessionListener>>,
    last_failure: Option<Failure>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            credentials: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            liveness_command: DEFAULT_LIVENESS_COMMAND.to_string(),
            inner: None,
            listener: None,
            last_failure: None,
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn SessionListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn with_liveness_command(mut self, command: impl Into<String>) -> Self {
        self.liveness_command = command.into();
        self
    }

    /// Open the connection and check that the shell answers.
    ///
    /// The credentials are kept for later reconnects even when this attempt
    /// fails. On failure the connection is torn down, a `Failed` event is
    /// emitted and `false` is returned.
    pub async fn connect(&mut self, credentials: Credentials, timeout: Duration) -> bool {
        self.teardown().await;
        self.connect_timeout = timeout;
        self.credentials = Some(credentials);
        self.last_failure = None;

        match self.establish().await {
            Ok(()) => true,
            Err(e) => {
                self.record_failure(FailureKind::classify(&e), "connect", &e);
                self.teardown().await;
                false
            }
        }
    }

    /// Close the connection and forget the stored credentials.
    pub async fn disconnect(&mut self) {
        self.credentials = None;
        self.teardown().await;
        info!("session disconnected");
    }

    pub fn is_connected(&self) -> bool {
        self.inner.as_ref().is_some_and(|s| !s.is_closed())
    }

    pub fn last_failure(&self) -> Option<&Failure> {
        self.last_failure.as_ref()
    }

    /// Run `command` and return its cleaned stdout, followed by stderr when
    /// both are non-empty. Returns `""` on any failure.
    pub async fn send_command(&mut self, command: &str, timeout: Duration) -> String {
        self.last_failure = None;
        self.emit(SessionEvent::CommandSent(command.to_string()));

        if !self.is_connected() {
            if let Err(e) = self.reconnect().await {
                let lost = Error::SessionLost(e.to_string());
                self.record_failure(FailureKind::Reconnect, command, &lost);
                return String::new();
            }
        }

        let Some(inner) = self.inner.as_ref() else {
            return String::new();
        };

        match inner.exec(command, timeout).await {
            Ok((stdout, stderr, exit_code)) => {
                let response = combine_output(&stdout, &stderr);
                debug!(command, ?exit_code, len = response.len(), "response received");
                self.emit(SessionEvent::ResponseReceived(response.clone()));
                response
            }
            Err(e) => {
                self.record_failure(FailureKind::classify(&e), command, &e);
                if self.inner.as_ref().is_some_and(SshSession::is_closed) {
                    self.teardown().await;
                }
                String::new()
            }
        }
    }

    async fn reconnect(&mut self) -> Result<()> {
        if self.credentials.is_none() {
            return Err(Error::SessionLost("never connected".into()));
        }
        warn!("session is down, attempting one reconnect");
        self.teardown().await;
        match self.establish().await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.teardown().await;
                Err(e)
            }
        }
    }

    async fn establish(&mut self) -> Result<()> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| Error::SessionLost("no stored credentials".into()))?;

        let session = SshSession::connect(credentials, self.connect_timeout).await?;
        session
            .exec(&self.liveness_command, self.connect_timeout)
            .await?;

        info!(peer = %session.peer(), "session ready");
        self.inner = Some(session);
        Ok(())
    }

    async fn teardown(&mut self) {
        if let Some(session) = self.inner.take() {
            if let Err(e) = session.close().await {
                debug!(%e, "error while closing session");
            }
        }
    }

    fn record_failure(&mut self, kind: FailureKind, context: &str, err: &Error) {
        warn!(?kind, context, %err, "session failure");
        let failure = Failure {
            kind,
            report: ErrorReport::from_error(context, err),
        };
        self.emit(SessionEvent::Failed(failure.clone()));
        self.last_failure = Some(failure);
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(listener) = &self.listener {
            listener.on_event(&event);
        }
    }
}

#[async_trait]
impl RemoteShell for Session {
    async fn send_command(&mut self, command: &str, timeout: Duration) -> String {
        Session::send_command(self, command, timeout).await
    }

    fn is_connected(&self) -> bool {
        Session::is_connected(self)
    }

    fn last_failure(&self) -> Option<&Failure> {
        Session::last_failure(self)
    }
}
