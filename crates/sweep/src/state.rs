use std::fmt;

use serde::Serialize;

use common::ErrorReport;
use telemetry::LocalRadio;

/// Where a run currently is. `Done`, `Cancelled` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    Idle,
    ValidatingInterface,
    CapturingBaseline,
    /// `index` counts from 1.
    Sweeping { index: usize, total: usize },
    Restoring,
    Done,
    Cancelled,
    Failed,
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::ValidatingInterface => write!(f, "validating interface"),
            Self::CapturingBaseline => write!(f, "capturing baseline"),
            Self::Sweeping { index, total } => write!(f, "sweeping {index}/{total}"),
            Self::Restoring => write!(f, "restoring baseline"),
            Self::Done => write!(f, "done"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// The radio configuration found before sweeping, restored afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BaselineSettings {
    pub frequency: Option<f64>,
    pub protocol: Option<String>,
    pub channel_width: Option<String>,
}

impl BaselineSettings {
    pub fn from_radio(radio: &LocalRadio) -> Self {
        Self {
            frequency: radio.frequency,
            protocol: radio.protocol.clone(),
            channel_width: radio.channel_width.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frequency.is_none() && self.protocol.is_none() && self.channel_width.is_none()
    }
}

/// Summary handed back once a run has finished.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOutcome {
    pub state: ScanState,
    /// Results delivered, the baseline record included.
    pub emitted: usize,
    pub baseline: Option<BaselineSettings>,
    pub failure: Option<ErrorReport>,
}
