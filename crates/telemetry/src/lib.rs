//! Text telemetry extraction for wireless router CLIs.
//!
//! This crate provides:
//! - Key/value extraction from free-form command output ([`TelemetryParser`])
//! - Command templating with `{interface}`-style placeholders
//! - Interface-name discovery from interface listings
//! - Typed records for the local radio and the remote peer

pub mod interfaces;
pub mod parser;
pub mod radio;
pub mod remote;
pub mod template;
pub mod vocab;

pub use interfaces::parse_interface_names;
pub use parser::{TelemetryParser, parse_counter_pair, parse_key_value_line};
pub use radio::LocalRadio;
pub use remote::{CounterPair, RemoteAntennaInfo};
pub use template::{Placeholders, TemplateValues, render};
pub use vocab::Vocabulary;
