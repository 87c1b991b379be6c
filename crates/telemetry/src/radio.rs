use serde::Serialize;

use crate::parser::TelemetryParser;

/// Keys tried, in order, for the local CCQ reading.
const CCQ_KEYS: &[&str] = &["overall-tx-ccq", "tx-ccq", "ccq"];

/// Local radio metrics read from the interface-info or live-monitor output.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocalRadio {
    pub frequency: Option<f64>,
    pub signal_strength: Option<f64>,
    pub noise_floor: Option<f64>,
    pub tx_rate: Option<f64>,
    pub rx_rate: Option<f64>,
    pub ccq: Option<f64>,
    pub band: Option<String>,
    pub channel_width: Option<String>,
    pub protocol: Option<String>,
}

impl LocalRadio {
    /// Read every local field the output carries. Both the interface-info
    /// and the monitor command print the same key names.
    pub fn parse(parser: &TelemetryParser, output: &str) -> Self {
        Self {
            frequency: parser.parse_numeric(output, "frequency"),
            signal_strength: parser.parse_numeric(output, "signal-strength"),
            noise_floor: parser.parse_numeric(output, "noise-floor"),
            tx_rate: parser.parse_numeric(output, "tx-rate"),
            rx_rate: parser.parse_numeric(output, "rx-rate"),
            ccq: CCQ_KEYS
                .iter()
                .find_map(|key| parser.parse_numeric(output, key)),
            band: parser.parse_string(output, "band"),
            channel_width: parser.parse_string(output, "channel-width"),
            protocol: parser.parse_string(output, "wireless-protocol"),
        }
    }

    /// Fold a live-monitor sample into interface-info values.
    ///
    /// The monitor is sampled closer to real time, so its noise floor, CCQ,
    /// protocol, channel width and band replace ours whenever present. The
    /// remaining fields only fill gaps.
    pub fn merge_monitor(&mut self, monitor: LocalRadio) {
        override_with(&mut self.noise_floor, monitor.noise_floor);
        override_with(&mut self.ccq, monitor.ccq);
        override_with(&mut self.protocol, monitor.protocol);
        override_with(&mut self.channel_width, monitor.channel_width);
        override_with(&mut self.band, monitor.band);

        fill_gap(&mut self.frequency, monitor.frequency);
        fill_gap(&mut self.signal_strength, monitor.signal_strength);
        fill_gap(&mut self.tx_rate, monitor.tx_rate);
        fill_gap(&mut self.rx_rate, monitor.rx_rate);
    }

    /// Signal-to-noise ratio, when both operands are known.
    pub fn snr(&self) -> Option<f64> {
        Some(self.signal_strength? - self.noise_floor?)
    }
}

fn override_with<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

fn fill_gap<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}
