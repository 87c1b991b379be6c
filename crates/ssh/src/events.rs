use common::{Error, ErrorReport};
use tokio::sync::mpsc;

/// How a session operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connect, handshake, authentication or command exceeded its deadline.
    Timeout,
    /// Address resolution or TCP connect failed.
    Socket,
    /// Credentials were rejected.
    Auth,
    /// Channel open or command execution failed on a live connection.
    Channel,
    /// The connection was gone and could not be re-established.
    Reconnect,
}

impl FailureKind {
    pub fn classify(err: &Error) -> Self {
        match err {
            Error::Timeout(_) => Self::Timeout,
            Error::Connection(_) | Error::Io(_) => Self::Socket,
            Error::Auth(_) => Self::Auth,
            Error::SessionLost(_) => Self::Reconnect,
            _ => Self::Channel,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub report: ErrorReport,
}

/// Everything the session reports to the outside world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    CommandSent(String),
    ResponseReceived(String),
    Failed(Failure),
}

/// Push-only receiver of session events.
pub trait SessionListener: Send + Sync {
    fn on_event(&self, event: &SessionEvent);
}

impl SessionListener for mpsc::UnboundedSender<SessionEvent> {
    fn on_event(&self, event: &SessionEvent) {
        // Receiver gone means nobody is listening any more.
        let _ = self.send(event.clone());
    }
}
