//! Terminal reporting. Progress and status go to stderr, one summary line
//! per result goes to stdout.

use common::ErrorReport;
use ssh::{SessionEvent, SessionListener};
use sweep::{ScanObserver, ScanResult, ScanState, ScanStatus};
use tracing::{debug, warn};

pub struct ConsoleObserver {
    /// Echo every command and response line.
    pub verbose: bool,
}

impl ScanObserver for ConsoleObserver {
    fn state_changed(&self, state: ScanState) {
        debug!(%state, "scan state");
    }

    fn progress(&self, percent: f64) {
        eprintln!("[{percent:5.1}%]");
    }

    fn status(&self, message: &str) {
        eprintln!("{message}");
    }

    fn trace(&self, line: &str) {
        if self.verbose {
            eprintln!("  {line}");
        }
    }

    fn result(&self, result: &ScanResult) {
        println!("{}", summary_line(result));
    }

    fn error(&self, report: &ErrorReport) {
        eprintln!("error: {report}");
    }
}

/// Forwards the raw session stream into the log file.
pub struct LogListener;

impl SessionListener for LogListener {
    fn on_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::CommandSent(command) => debug!(command, "command sent"),
            SessionEvent::ResponseReceived(response) => {
                debug!(len = response.len(), "response received")
            }
            SessionEvent::Failed(failure) => {
                warn!(kind = ?failure.kind, report = %failure.report, "session failure")
            }
        }
    }
}

fn summary_line(result: &ScanResult) -> String {
    let tag = match result.status {
        ScanStatus::Base => "base",
        ScanStatus::Success => "ok",
        ScanStatus::Error => "error",
        ScanStatus::Status => "status",
    };
    let mut line = format!(
        "{tag:<6} {:>6} MHz  {:<10} {:<10}",
        number(result.frequency, 0),
        result.protocol.as_deref().unwrap_or("-"),
        result.channel_width.as_deref().unwrap_or("-"),
    );

    if let Some(error) = &result.error {
        line.push_str("  ");
        line.push_str(error.lines().next().unwrap_or_default());
        return line;
    }

    line.push_str(&format!(
        "  signal {:>4} dBm  noise {:>4} dBm  snr {:>3} dB  ccq {:>3}%",
        number(result.signal_strength, 0),
        number(result.noise_floor, 0),
        number(result.snr, 0),
        number(result.ccq, 0),
    ));
    if result.remote.has_peer() {
        line.push_str(&format!(
            "  remote {:>4} dBm",
            number(result.remote.signal_strength, 0)
        ));
    } else {
        line.push_str("  no peer");
    }
    if let Some(ping) = &result.ping {
        match ping.avg_ms {
            Some(avg) => line.push_str(&format!("  ping {avg} ms, {:.0}% loss", ping.loss_percent)),
            None => line.push_str("  ping lost"),
        }
    }
    line
}

fn number(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.precision$}"))
}
