//! SSH command session for router telemetry.
//!
//! This crate provides:
//! - A russh-backed client that runs one command per channel ([`SshSession`])
//! - A reconnecting wrapper whose commands never fail ([`Session`])
//! - The [`RemoteShell`] seam the scan orchestrator drives
//! - Output cleaning and the command/response event stream

pub mod clean;
pub mod client;
pub mod events;
pub mod session;

pub use client::{Credentials, SshSession};
pub use events::{Failure, FailureKind, SessionEvent, SessionListener};
pub use session::{RemoteShell, Session};
