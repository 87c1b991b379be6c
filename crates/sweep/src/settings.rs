use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use common::{Error, Result};
use ssh::Credentials;
use telemetry::Vocabulary;

/// Command strings sent to the device. Placeholders are substituted by
/// [`telemetry::render`].
///
/// Defaults target RouterOS wireless interfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandTemplates {
    pub set_frequency: String,
    pub set_protocol: String,
    pub set_channel_width: String,
    pub interface_info: String,
    /// Sent only when `interface_info` returns nothing.
    pub interface_info_fallback: String,
    pub registration_table: String,
    pub monitor: String,
    pub validate_interface: String,
}

impl Default for CommandTemplates {
    fn default() -> Self {
        Self {
            set_frequency: "/interface wireless set {interface} frequency={frequency}".into(),
            set_protocol: "/interface wireless set {interface} wireless-protocol={protocol}"
                .into(),
            set_channel_width: "/interface wireless set {interface} channel-width={channelWidth}"
                .into(),
            interface_info: "/interface wireless print detail where name=\"{interface}\"".into(),
            interface_info_fallback:
                "/interface wireless print detail where default-name=\"{interface}\"".into(),
            registration_table:
                "/interface wireless registration-table print stats where interface=\"{interface}\""
                    .into(),
            monitor: "/interface wireless monitor {interface} once".into(),
            validate_interface: "/interface wireless print terse".into(),
        }
    }
}

/// Everything one run needs. Read once at start and never mutated by the
/// scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub identity_file: Option<PathBuf>,
    pub interface: String,

    /// Sweep range in MHz, both ends inclusive.
    pub start_frequency: u32,
    pub end_frequency: u32,
    pub step: u32,
    pub protocols: Vec<String>,
    pub channel_widths: Vec<String>,

    pub stabilization_minutes: f64,
    /// Echo target; when unset the peer's `last-ip` is used if reported.
    pub ping_target: Option<IpAddr>,
    pub ping_count: u32,
    pub ping_timeout_ms: u64,

    /// Bound for set commands.
    pub command_timeout_ms: u64,
    /// Bound for telemetry and validation queries.
    pub query_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    /// No-op run right after connecting to prove the shell answers.
    pub liveness_command: String,

    pub templates: CommandTemplates,
    pub vocabulary: Vocabulary,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 22,
            user: "admin".into(),
            password: None,
            identity_file: None,
            interface: "wlan1".into(),
            start_frequency: 5180,
            end_frequency: 5320,
            step: 20,
            protocols: Vec::new(),
            channel_widths: Vec::new(),
            stabilization_minutes: 1.0,
            ping_target: None,
            ping_count: probe::DEFAULT_COUNT,
            ping_timeout_ms: probe::DEFAULT_TIMEOUT.as_millis() as u64,
            command_timeout_ms: 5000,
            query_timeout_ms: 8000,
            connect_timeout_ms: 10_000,
            liveness_command: ssh::session::DEFAULT_LIVENESS_COMMAND.to_string(),
            templates: CommandTemplates::default(),
            vocabulary: Vocabulary::default(),
        }
    }
}

/// One point of the sweep. `None` leaves that setting untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCombination {
    pub frequency: u32,
    pub protocol: Option<String>,
    pub channel_width: Option<String>,
}

impl ScanSettings {
    /// Load settings from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&raw)?;
        debug!(path = %path.display(), "loaded settings file");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.interface.trim().is_empty() {
            return Err(Error::Config("interface must not be empty".into()));
        }
        if self.start_frequency >= self.end_frequency {
            return Err(Error::Config(format!(
                "start frequency {} must be below end frequency {}",
                self.start_frequency, self.end_frequency
            )));
        }
        if self.step == 0 {
            return Err(Error::Config("frequency step must be positive".into()));
        }
        if self.step > self.end_frequency - self.start_frequency {
            return Err(Error::Config(format!(
                "frequency step {} exceeds the range {}..{}",
                self.step, self.start_frequency, self.end_frequency
            )));
        }
        if self.liveness_command.trim().is_empty() {
            return Err(Error::Config("liveness command must not be empty".into()));
        }
        if !self.stabilization_minutes.is_finite() || self.stabilization_minutes < 0.0 {
            return Err(Error::Config(
                "stabilization time must be a non-negative number of minutes".into(),
            ));
        }
        Ok(())
    }

    /// Frequencies from start to end inclusive, ascending by `step`.
    pub fn frequencies(&self) -> Vec<u32> {
        if self.step == 0 || self.start_frequency > self.end_frequency {
            return Vec::new();
        }
        (self.start_frequency..=self.end_frequency)
            .step_by(self.step as usize)
            .collect()
    }

    /// Full cross product: frequency outermost, channel width innermost.
    pub fn combinations(&self) -> Vec<ScanCombination> {
        let protocols = candidates(&self.protocols);
        let widths = candidates(&self.channel_widths);

        let mut combos = Vec::new();
        for frequency in self.frequencies() {
            for protocol in &protocols {
                for channel_width in &widths {
                    combos.push(ScanCombination {
                        frequency,
                        protocol: protocol.clone(),
                        channel_width: channel_width.clone(),
                    });
                }
            }
        }
        combos
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
            identity_file: self.identity_file.clone(),
        }
    }

    pub fn stabilization(&self) -> Duration {
        Duration::from_secs_f64(self.stabilization_minutes.max(0.0) * 60.0)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }
}

/// Trimmed, non-empty entries; an empty list means "leave unchanged".
fn candidates(list: &[String]) -> Vec<Option<String>> {
    let values: Vec<Option<String>> = list
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| Some(s.to_string()))
        .collect();

    if values.is_empty() { vec![None] } else { values }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: u32, end: u32, step: u32) -> ScanSettings {
        ScanSettings {
            start_frequency: start,
            end_frequency: end,
            step,
            ..ScanSettings::default()
        }
    }

    #[test]
    fn test_frequencies_ordered_within_bounds() {
        for (start, end, step) in [(5180, 5320, 20), (5000, 5001, 1), (2412, 2472, 7), (100, 200, 100)] {
            let freqs = range(start, end, step).frequencies();
            assert!(!freqs.is_empty());
            assert_eq!(freqs[0], start);
            assert!(freqs.windows(2).all(|w| w[0] < w[1]));
            assert!(freqs.iter().all(|f| (start..=end).contains(f)));
        }
        assert_eq!(
            range(5180, 5240, 20).frequencies(),
            vec![5180, 5200, 5220, 5240]
        );
        assert_eq!(range(2412, 2430, 7).frequencies(), vec![2412, 2419, 2426]);
    }

    #[test]
    fn test_validate_rejects_bad_ranges() {
        assert!(range(5180, 5320, 20).validate().is_ok());
        assert!(matches!(range(5320, 5180, 20).validate(), Err(Error::Config(_))));
        assert!(matches!(range(5180, 5180, 20).validate(), Err(Error::Config(_))));
        assert!(matches!(range(5180, 5320, 0).validate(), Err(Error::Config(_))));
        assert!(matches!(range(5180, 5200, 40).validate(), Err(Error::Config(_))));

        let no_interface = ScanSettings {
            interface: "  ".into(),
            ..ScanSettings::default()
        };
        assert!(matches!(no_interface.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_combination_order() {
        let settings = ScanSettings {
            protocols: vec!["nv2".into(), "802.11".into()],
            channel_widths: vec!["20mhz".into(), "40mhz".into()],
            ..range(5180, 5200, 20)
        };
        let combos = settings.combinations();
        assert_eq!(combos.len(), 8);

        let keys: Vec<(u32, &str, &str)> = combos
            .iter()
            .map(|c| {
                (
                    c.frequency,
                    c.protocol.as_deref().unwrap(),
                    c.channel_width.as_deref().unwrap(),
                )
            })
            .collect();
        assert_eq!(keys[0], (5180, "nv2", "20mhz"));
        assert_eq!(keys[1], (5180, "nv2", "40mhz"));
        assert_eq!(keys[2], (5180, "802.11", "20mhz"));
        assert_eq!(keys[4], (5200, "nv2", "20mhz"));
        assert_eq!(keys[7], (5200, "802.11", "40mhz"));
    }

    #[test]
    fn test_empty_candidates_are_unspecified() {
        let settings = ScanSettings {
            protocols: vec![" ".into()],
            ..range(5180, 5200, 20)
        };
        let combos = settings.combinations();
        assert_eq!(combos.len(), 2);
        assert!(combos.iter().all(|c| c.protocol.is_none() && c.channel_width.is_none()));
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let json = r#"{ "host": "192.168.88.1", "interface": "wlan2", "protocols": ["nv2"] }"#;
        let settings: ScanSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.host, "192.168.88.1");
        assert_eq!(settings.interface, "wlan2");
        assert_eq!(settings.port, 22);
        assert_eq!(settings.query_timeout(), Duration::from_secs(8));
        assert_eq!(settings.templates, CommandTemplates::default());
        assert_eq!(settings.vocabulary.truthy_literal, "yes");
    }

    #[test]
    fn test_liveness_command_is_configurable() {
        assert_eq!(ScanSettings::default().liveness_command, ":put \"\"");

        let json = r#"{ "host": "10.0.0.1", "liveness_command": "/system identity print" }"#;
        let settings: ScanSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.liveness_command, "/system identity print");

        let blank = ScanSettings {
            liveness_command: "  ".into(),
            ..settings
        };
        assert!(matches!(blank.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_password_is_never_serialized() {
        let settings = ScanSettings {
            password: Some("hunter2".into()),
            ..ScanSettings::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert!(!json.contains("hunter2"));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = ScanSettings::load(Path::new("/nonexistent/linkscan.json")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
