use serde::{Deserialize, Serialize};

use crate::template::Placeholders;

/// Textual protocol constants the parser and orchestrator rely on.
///
/// Firmware versions disagree on units and error wording, so none of this is
/// hard-coded; every list can be replaced from the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    /// Unit suffixes removed (case-insensitively) before reading a number.
    /// Longer suffixes must come before their prefixes (`dBm` before `dB`).
    pub unit_suffixes: Vec<String>,
    /// Substrings that mark a device response as a failed command.
    pub failure_keywords: Vec<String>,
    /// The literal that boolean-coded fields use for "true".
    pub truthy_literal: String,
    /// Line prefixes that introduce comments in device output.
    pub comment_prefixes: Vec<String>,
    pub placeholders: Placeholders,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            unit_suffixes: strings(&["dBm", "dB", "%", "MHz", "GHz", "Mbps", "Kbps", "bps"]),
            failure_keywords: strings(&[
                "invalid",
                "error",
                "failure",
                "failed",
                "not found",
                "no such",
            ]),
            truthy_literal: "yes".to_string(),
            comment_prefixes: strings(&["#", ";;;"]),
            placeholders: Placeholders::default(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
