use std::collections::HashMap;

use serde::Serialize;

use crate::parser::{TelemetryParser, parse_counter_pair};

/// A `received,transmitted` counter as printed by the registration table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterPair {
    pub rx: Option<u64>,
    pub tx: Option<u64>,
}

/// The remote peer as seen through the registration table.
///
/// Parsed once per combination and moved into that combination's result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RemoteAntennaInfo {
    pub radio_name: Option<String>,
    pub mac_address: Option<String>,
    pub interface: Option<String>,
    pub uptime: Option<String>,
    pub last_activity: Option<String>,
    pub routeros_version: Option<String>,
    pub last_ip: Option<String>,

    pub signal_strength: Option<f64>,
    pub signal_strength_ch0: Option<f64>,
    pub signal_strength_ch1: Option<f64>,
    pub signal_strength_ch2: Option<f64>,
    pub tx_signal_strength: Option<f64>,
    pub tx_signal_strength_ch0: Option<f64>,
    pub tx_signal_strength_ch1: Option<f64>,
    pub tx_signal_strength_ch2: Option<f64>,
    pub signal_to_noise: Option<f64>,
    pub tx_rate: Option<f64>,
    pub rx_rate: Option<f64>,
    pub tx_ccq: Option<f64>,
    pub p_throughput: Option<f64>,
    pub distance: Option<f64>,
    pub ack_timeout: Option<f64>,

    pub packets: CounterPair,
    pub bytes: CounterPair,
    pub frames: CounterPair,
    pub frame_bytes: CounterPair,
    pub hw_frames: CounterPair,
    pub hw_frame_bytes: CounterPair,

    pub nstreme: Option<bool>,
    pub compression: Option<bool>,
    pub wmm_enabled: Option<bool>,
    pub dot1x_port_enabled: Option<bool>,

    pub framing_mode: Option<String>,
    pub authentication_type: Option<String>,
    pub encryption: Option<String>,
    pub group_encryption: Option<String>,
    pub management_protection: Option<String>,
    pub tx_rate_set: Option<String>,
}

impl RemoteAntennaInfo {
    /// Parse a registration-table listing. When several peers are listed the
    /// first one wins.
    pub fn parse(parser: &TelemetryParser, output: &str) -> Self {
        let fields = Fields {
            parser,
            output,
            pairs: parser.key_values(output),
        };

        Self {
            radio_name: fields.text("radio-name"),
            mac_address: fields.text("mac-address"),
            interface: fields.text("interface"),
            uptime: fields.text("uptime"),
            last_activity: fields.text("last-activity"),
            routeros_version: fields.text("routeros-version"),
            last_ip: fields.text("last-ip"),

            signal_strength: fields.number("signal-strength"),
            signal_strength_ch0: fields.number("signal-strength-ch0"),
            signal_strength_ch1: fields.number("signal-strength-ch1"),
            signal_strength_ch2: fields.number("signal-strength-ch2"),
            tx_signal_strength: fields.number("tx-signal-strength"),
            tx_signal_strength_ch0: fields.number("tx-signal-strength-ch0"),
            tx_signal_strength_ch1: fields.number("tx-signal-strength-ch1"),
            tx_signal_strength_ch2: fields.number("tx-signal-strength-ch2"),
            signal_to_noise: fields.number("signal-to-noise"),
            tx_rate: fields.number("tx-rate"),
            rx_rate: fields.number("rx-rate"),
            tx_ccq: fields.number("tx-ccq"),
            p_throughput: fields.number("p-throughput"),
            distance: fields.number("distance"),
            ack_timeout: fields.number("ack-timeout"),

            packets: fields.counter("packets"),
            bytes: fields.counter("bytes"),
            frames: fields.counter("frames"),
            frame_bytes: fields.counter("frame-bytes"),
            hw_frames: fields.counter("hw-frames"),
            hw_frame_bytes: fields.counter("hw-frame-bytes"),

            nstreme: fields.flag("nstreme"),
            compression: fields.flag("compression"),
            wmm_enabled: fields.flag("wmm-enabled"),
            dot1x_port_enabled: fields.flag("802.1x-port-enabled"),

            framing_mode: fields.text("framing-mode"),
            authentication_type: fields.text("authentication-type"),
            encryption: fields.text("encryption"),
            group_encryption: fields.text("group-encryption"),
            management_protection: fields.text("management-protection"),
            tx_rate_set: fields.text("tx-rate-set"),
        }
    }

    /// Whether the listing named a peer at all.
    pub fn has_peer(&self) -> bool {
        self.mac_address.is_some() || self.radio_name.is_some()
    }
}

/// Field lookup: a direct key search first, then the pairs found by the
/// line tokenizer for layouts the key search cannot anchor on.
struct Fields<'a> {
    parser: &'a TelemetryParser,
    output: &'a str,
    pairs: HashMap<String, String>,
}

impl Fields<'_> {
    fn raw(&self, key: &str) -> Option<String> {
        self.parser.parse_string(self.output, key).or_else(|| {
            self.pairs
                .get(key)
                .filter(|v| !v.is_empty())
                .cloned()
        })
    }

    fn text(&self, key: &str) -> Option<String> {
        self.raw(key)
    }

    fn number(&self, key: &str) -> Option<f64> {
        self.raw(key).and_then(|v| self.parser.numeric_value(&v))
    }

    fn counter(&self, key: &str) -> CounterPair {
        self.raw(key)
            .map(|v| parse_counter_pair(&v))
            .unwrap_or_default()
    }

    fn flag(&self, key: &str) -> Option<bool> {
        self.raw(key).map(|v| self.parser.flag(&v))
    }
}
