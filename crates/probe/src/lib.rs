//! Reachability and latency probing for the far end of a radio link.
//!
//! - [`EchoTransport`]: one echo request/reply exchange
//! - [`IcmpEcho`]: the surge-ping backed transport
//! - [`Prober`]: sequential probes folded into [`PingStats`]

pub mod echo;
pub mod prober;
pub mod stats;

pub use echo::{EchoTransport, IcmpEcho};
pub use prober::{DEFAULT_COUNT, DEFAULT_TIMEOUT, Prober};
pub use stats::PingStats;
