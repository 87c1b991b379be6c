use serde::{Serialize, Serializer};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use probe::PingStats;
use telemetry::{LocalRadio, RemoteAntennaInfo};

use crate::settings::ScanCombination;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    /// Captured before sweeping, from the untouched configuration.
    Base,
    Success,
    Error,
    /// Ad-hoc query outside a sweep.
    Status,
}

/// One telemetry record. Built up while a combination is processed and
/// left untouched once emitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanResult {
    #[serde(serialize_with = "rfc3339")]
    pub timestamp: OffsetDateTime,
    pub status: ScanStatus,

    pub frequency: Option<f64>,
    pub protocol: Option<String>,
    pub channel_width: Option<String>,
    pub band: Option<String>,
    pub signal_strength: Option<f64>,
    pub noise_floor: Option<f64>,
    pub snr: Option<f64>,
    pub tx_rate: Option<f64>,
    pub rx_rate: Option<f64>,
    pub ccq: Option<f64>,

    pub remote: RemoteAntennaInfo,
    pub ping: Option<PingStats>,
    pub error: Option<String>,
}

impl ScanResult {
    pub fn new(status: ScanStatus) -> Self {
        Self {
            timestamp: OffsetDateTime::now_utc(),
            status,
            frequency: None,
            protocol: None,
            channel_width: None,
            band: None,
            signal_strength: None,
            noise_floor: None,
            snr: None,
            tx_rate: None,
            rx_rate: None,
            ccq: None,
            remote: RemoteAntennaInfo::default(),
            ping: None,
            error: None,
        }
    }

    /// A record pre-filled with the requested settings of a combination.
    pub fn for_combination(combo: &ScanCombination) -> Self {
        Self {
            frequency: Some(f64::from(combo.frequency)),
            protocol: combo.protocol.clone(),
            channel_width: combo.channel_width.clone(),
            ..Self::new(ScanStatus::Success)
        }
    }

    /// Take every local value the radio reported. Values the device did not
    /// report keep what is already there. A requested frequency is kept so
    /// records stay keyed by their combination.
    pub fn apply_local(&mut self, radio: &LocalRadio) {
        if self.frequency.is_none() {
            self.frequency = radio.frequency;
        }
        replace(&mut self.protocol, radio.protocol.clone());
        replace(&mut self.channel_width, radio.channel_width.clone());
        replace(&mut self.band, radio.band.clone());
        replace(&mut self.signal_strength, radio.signal_strength);
        replace(&mut self.noise_floor, radio.noise_floor);
        replace(&mut self.tx_rate, radio.tx_rate);
        replace(&mut self.rx_rate, radio.rx_rate);
        replace(&mut self.ccq, radio.ccq);
        self.update_snr();
    }

    /// Recompute SNR from the current signal and noise floor.
    pub fn update_snr(&mut self) {
        self.snr = match (self.signal_strength, self.noise_floor) {
            (Some(signal), Some(noise)) => Some(signal - noise),
            _ => None,
        };
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = ScanStatus::Error;
        self.error = Some(message.into());
    }
}

fn replace<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

fn rfc3339<S: Serializer>(ts: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    let formatted = ts.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&formatted)
}
