use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use russh::keys::{PrivateKeyWithHashAlg, PublicKey};
use russh::{ChannelMsg, client};
use tokio::net::TcpStream;
use tracing::{debug, info};

use common::{Error, Result};

/// Where and how to log in. Kept by [`crate::Session`] for reconnects.
#[derive(Clone, Default)]
pub struct Credentials {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub identity_file: Option<PathBuf>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("identity_file", &self.identity_file)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// SSH Handler (russh callback impl)
// ---------------------------------------------------------------------------

struct Handler;

impl client::Handler for Handler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        // Routers are addressed by IP on a management network and rotate
        // keys on reinstall; no known_hosts check is performed.
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// SshSession
// ---------------------------------------------------------------------------

/// An authenticated SSH connection; every command runs on a fresh channel.
pub struct SshSession {
    handle: client::Handle<Handler>,
    peer: SocketAddr,
}

impl SshSession {
    /// Resolve, connect and authenticate. Each stage is bounded by `timeout`.
    pub async fn connect(credentials: &Credentials, timeout: Duration) -> Result<Self> {
        let addr_str = format!("{}:{}", credentials.host, credentials.port);
        let peer: SocketAddr = tokio::net::lookup_host(&addr_str)
            .await
            .map_err(|e| Error::Connection(format!("failed to resolve '{addr_str}': {e}")))?
            .next()
            .ok_or_else(|| Error::Connection(format!("no addresses found for '{addr_str}'")))?;

        let stream = tokio::time::timeout(timeout, TcpStream::connect(peer))
            .await
            .map_err(|_| Error::Timeout(timeout))?
            .map_err(|e| Error::Connection(format!("TCP connection to {peer} failed: {e}")))?;

        let config = Arc::new(client::Config {
            inactivity_timeout: None,
            keepalive_interval: Some(Duration::from_secs(15)),
            keepalive_max: 3,
            ..Default::default()
        });

        let handle = tokio::time::timeout(timeout, client::connect_stream(config, stream, Handler))
            .await
            .map_err(|_| Error::Timeout(timeout))?
            .map_err(|e| Error::Connection(format!("SSH handshake with {peer} failed: {e}")))?;

        info!(%peer, user = %credentials.user, "SSH connection established");

        let mut session = SshSession { handle, peer };
        tokio::time::timeout(timeout, session.authenticate(credentials))
            .await
            .map_err(|_| Error::Timeout(timeout))??;

        Ok(session)
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Whether the underlying transport has shut down.
    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }

    async fn authenticate(&mut self, credentials: &Credentials) -> Result<()> {
        let user = credentials.user.as_str();

        if let Some(key_path) = &credentials.identity_file {
            debug!(key = %key_path.display(), "trying SSH key");
            match russh::keys::load_secret_key(key_path, None) {
                Ok(key_pair) => {
                    let key_with_hash = PrivateKeyWithHashAlg::new(Arc::new(key_pair), None);
                    match self.handle.authenticate_publickey(user, key_with_hash).await {
                        Ok(result) if result.success() => {
                            info!(user, key = %key_path.display(), "SSH key authentication successful");
                            return Ok(());
                        }
                        Ok(_) => debug!(key = %key_path.display(), "key not accepted"),
                        Err(e) => debug!(key = %key_path.display(), %e, "key auth attempt failed"),
                    }
                }
                Err(e) => debug!(key = %key_path.display(), %e, "failed to load key"),
            }
        }

        let Some(password) = credentials.password.as_deref() else {
            return Err(Error::Auth(format!("no accepted credentials for {user}")));
        };

        let result = self
            .handle
            .authenticate_password(user, password)
            .await
            .map_err(|e| Error::Auth(format!("password auth failed: {e}")))?;

        if !result.success() {
            return Err(Error::Auth(format!("password rejected for {user}")));
        }

        info!(user, "SSH password authentication successful");
        Ok(())
    }

    /// Execute a command, returning (stdout, stderr, exit_code).
    ///
    /// The whole exchange, from channel open to close, must finish within
    /// `timeout`.
    pub async fn exec(
        &self,
        command: &str,
        timeout: Duration,
    ) -> Result<(String, String, Option<u32>)> {
        let deadline = tokio::time::Instant::now() + timeout;

        let mut channel = tokio::time::timeout_at(deadline, self.handle.channel_open_session())
            .await
            .map_err(|_| Error::Timeout(timeout))?
            .map_err(|e| Error::Channel(format!("failed to open SSH channel: {e}")))?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| Error::Channel(format!("failed to exec command: {e}")))?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_code = None;

        // Read until Close: ExitStatus often arrives after Eof.
        loop {
            match tokio::time::timeout_at(deadline, channel.wait()).await {
                Ok(Some(msg)) => match msg {
                    ChannelMsg::Data { data } => stdout.extend_from_slice(&data),
                    ChannelMsg::ExtendedData { data, ext } => {
                        if ext == 1 {
                            stderr.extend_from_slice(&data);
                        }
                    }
                    ChannelMsg::ExitStatus { exit_status } => exit_code = Some(exit_status),
                    ChannelMsg::Close => break,
                    _ => {}
                },
                Ok(None) => break,
                Err(_) => return Err(Error::Timeout(timeout)),
            }
        }

        let stdout_str = String::from_utf8_lossy(&stdout).into_owned();
        let stderr_str = String::from_utf8_lossy(&stderr).into_owned();

        debug!(
            command,
            exit_code,
            stdout_len = stdout_str.len(),
            stderr_len = stderr_str.len(),
            "SSH command completed"
        );

        Ok((stdout_str, stderr_str, exit_code))
    }

    /// Close the SSH connection gracefully.
    pub async fn close(self) -> Result<()> {
        self.handle
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(|e| Error::Channel(format!("SSH disconnect failed: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials {
            host: "10.0.0.1".into(),
            port: 22,
            user: "admin".into(),
            password: Some("hunter2".into()),
            identity_file: None,
        };
        let debug_str = format!("{:?}", creds);
        assert!(debug_str.contains("admin"));
        assert!(debug_str.contains("<redacted>"));
        assert!(!debug_str.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_connect_refused_is_connection_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let creds = Credentials {
            host: "127.0.0.1".into(),
            port,
            user: "admin".into(),
            password: Some("secret".into()),
            identity_file: None,
        };

        let err = SshSession::connect(&creds, Duration::from_secs(2))
            .await
            .err()
            .expect("connect to a closed port must fail");
        assert!(matches!(err, Error::Connection(_)), "got {err:?}");
    }
}
