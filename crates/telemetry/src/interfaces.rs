use crate::parser::TelemetryParser;

/// Collect interface names from an interface listing.
///
/// Each line is searched for a `name=` token; quoted multi-word names are
/// kept whole. Duplicates are dropped, listing order is preserved.
pub fn parse_interface_names(parser: &TelemetryParser, output: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();

    for line in output.lines() {
        if let Some(name) = parser.parse_string(line, "name") {
            if !names.iter().any(|n| n == &name) {
                names.push(name);
            }
        }
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names_from_detail_listing() {
        let output = r#"Flags: X - disabled, R - running
 0  R name="wlan1" mtu=1500 mac-address=4C:5E:0C:7F:D4:B1 default-name="wlan1"
 1  X name="backhaul link" mtu=1500 default-name="wlan2"
"#;
        let names = parse_interface_names(&TelemetryParser::default(), output);
        assert_eq!(names, vec!["wlan1".to_string(), "backhaul link".to_string()]);
    }

    #[test]
    fn test_parse_names_ignores_name_in_comment() {
        let output = " 0  R comment=\"old name=uplink\" name=\"wlan1\" mtu=1500\n";
        let names = parse_interface_names(&TelemetryParser::default(), output);
        assert_eq!(names, vec!["wlan1".to_string()]);
    }

    #[test]
    fn test_parse_names_ignores_radio_name() {
        let output = "radio-name=\"NTK O\" name=wlan1\n";
        let names = parse_interface_names(&TelemetryParser::default(), output);
        assert_eq!(names, vec!["wlan1".to_string()]);
    }

    #[test]
    fn test_parse_names_dedup_and_empty() {
        let output = "name=wlan1\nname=wlan1\n\n[admin@MikroTik] > name=bogus\n";
        let names = parse_interface_names(&TelemetryParser::default(), output);
        assert_eq!(names, vec!["wlan1".to_string()]);
        assert!(parse_interface_names(&TelemetryParser::default(), "").is_empty());
    }
}
