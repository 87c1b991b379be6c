use tracing::{info, warn};

use common::Error;
use ssh::RemoteShell;
use telemetry::{TelemetryParser, TemplateValues, parse_interface_names, render};

use crate::settings::ScanSettings;

/// Verdict of an interface lookup on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceCheck {
    pub is_valid: bool,
    pub error: Option<String>,
    /// Names the device reported, in listing order.
    pub available: Vec<String>,
}

impl InterfaceCheck {
    pub fn into_error(self, interface: &str) -> Error {
        Error::InterfaceNotFound {
            interface: interface.to_string(),
            available: self.available,
        }
    }
}

/// Ask the device for its interface names and look for `interface`,
/// ignoring case.
pub async fn validate_interface<S: RemoteShell>(
    shell: &mut S,
    settings: &ScanSettings,
    interface: &str,
) -> InterfaceCheck {
    let parser = TelemetryParser::new(settings.vocabulary.clone());
    let command = render(
        &settings.templates.validate_interface,
        &TemplateValues::new(interface),
        &settings.vocabulary.placeholders,
    );

    let output = shell.send_command(&command, settings.query_timeout()).await;
    if output.is_empty() {
        if let Some(failure) = shell.last_failure() {
            warn!(interface, report = %failure.report, "interface listing failed");
            return InterfaceCheck {
                is_valid: false,
                error: Some(failure.report.to_string()),
                available: Vec::new(),
            };
        }
    }

    let available = parse_interface_names(&parser, &output);
    let is_valid = available.iter().any(|name| name.eq_ignore_ascii_case(interface));

    if is_valid {
        info!(interface, "interface found");
        InterfaceCheck {
            is_valid,
            error: None,
            available,
        }
    } else {
        warn!(interface, ?available, "interface not found");
        InterfaceCheck {
            is_valid,
            error: Some(format!("interface '{interface}' not found")),
            available,
        }
    }
}
