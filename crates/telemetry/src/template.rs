use serde::{Deserialize, Serialize};

/// Placeholder tokens recognised in command templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Placeholders {
    pub interface: String,
    pub frequency: String,
    pub protocol: String,
    pub channel_width: String,
}

impl Default for Placeholders {
    fn default() -> Self {
        Self {
            interface: "{interface}".to_string(),
            frequency: "{frequency}".to_string(),
            protocol: "{protocol}".to_string(),
            channel_width: "{channelWidth}".to_string(),
        }
    }
}

/// Values substituted into a template. Only `interface` is mandatory.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateValues<'a> {
    pub interface: &'a str,
    pub frequency: Option<f64>,
    pub protocol: Option<&'a str>,
    pub channel_width: Option<&'a str>,
}

impl<'a> TemplateValues<'a> {
    pub fn new(interface: &'a str) -> Self {
        Self {
            interface,
            ..Self::default()
        }
    }

    pub fn frequency(mut self, mhz: f64) -> Self {
        self.frequency = Some(mhz);
        self
    }

    pub fn protocol(mut self, protocol: &'a str) -> Self {
        self.protocol = Some(protocol);
        self
    }

    pub fn channel_width(mut self, width: &'a str) -> Self {
        self.channel_width = Some(width);
        self
    }
}

/// Fill a command template.
///
/// `{interface}` is always replaced; the other placeholders only when a
/// value is supplied, so an unused placeholder stays visible in the output.
/// Frequencies are rounded to the nearest whole MHz. Templates come from the
/// operator and are trusted; no escaping is applied.
pub fn render(template: &str, values: &TemplateValues<'_>, placeholders: &Placeholders) -> String {
    let mut command = template.replace(&placeholders.interface, values.interface);

    if let Some(mhz) = values.frequency {
        let rounded = format!("{}", mhz.round() as i64);
        command = command.replace(&placeholders.frequency, &rounded);
    }
    if let Some(protocol) = values.protocol {
        command = command.replace(&placeholders.protocol, protocol);
    }
    if let Some(width) = values.channel_width {
        command = command.replace(&placeholders.channel_width, width);
    }

    command
}
