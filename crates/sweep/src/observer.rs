use tokio::sync::mpsc;

use common::ErrorReport;

use crate::result::ScanResult;
use crate::state::ScanState;

/// Receives progress from a running scan. Every method defaults to a no-op.
pub trait ScanObserver: Send + Sync {
    fn state_changed(&self, _state: ScanState) {}

    /// Percentage in `0.0..=100.0`, never decreasing within a run.
    fn progress(&self, _percent: f64) {}

    fn status(&self, _message: &str) {}

    /// One command or response line.
    fn trace(&self, _line: &str) {}

    fn result(&self, _result: &ScanResult) {}

    fn error(&self, _report: &ErrorReport) {}
}

pub struct NullObserver;

impl ScanObserver for NullObserver {}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    State(ScanState),
    Progress(f64),
    Status(String),
    Trace(String),
    Result(Box<ScanResult>),
    Error(ErrorReport),
}

impl ScanObserver for mpsc::UnboundedSender<ScanEvent> {
    fn state_changed(&self, state: ScanState) {
        let _ = self.send(ScanEvent::State(state));
    }

    fn progress(&self, percent: f64) {
        let _ = self.send(ScanEvent::Progress(percent));
    }

    fn status(&self, message: &str) {
        let _ = self.send(ScanEvent::Status(message.to_string()));
    }

    fn trace(&self, line: &str) {
        let _ = self.send(ScanEvent::Trace(line.to_string()));
    }

    fn result(&self, result: &ScanResult) {
        let _ = self.send(ScanEvent::Result(Box::new(result.clone())));
    }

    fn error(&self, report: &ErrorReport) {
        let _ = self.send(ScanEvent::Error(report.clone()));
    }
}
