//! Radio link sweep: walk a device through frequency, protocol and
//! channel-width combinations and record link telemetry for each.
//!
//! The [`Orchestrator`] owns a [`ssh::RemoteShell`] and a
//! [`probe::Prober`], reports through a [`ScanObserver`] and persists
//! through a [`ResultSink`].

pub mod observer;
pub mod orchestrator;
pub mod result;
pub mod settings;
pub mod sink;
pub mod state;
pub mod validate;

#[cfg(test)]
mod testing;

pub use observer::{NullObserver, ScanEvent, ScanObserver};
pub use orchestrator::Orchestrator;
pub use result::{ScanResult, ScanStatus};
pub use settings::{CommandTemplates, ScanCombination, ScanSettings};
pub use sink::{MemorySink, ResultSink};
pub use state::{BaselineSettings, ScanOutcome, ScanState};
pub use validate::{InterfaceCheck, validate_interface};
