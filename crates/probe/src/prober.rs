use std::net::IpAddr;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::echo::EchoTransport;
use crate::stats::PingStats;

pub const DEFAULT_COUNT: u32 = 4;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Pause between consecutive probes.
const PROBE_INTERVAL: Duration = Duration::from_millis(100);

/// Sends sequential echoes and aggregates the replies.
pub struct Prober<T> {
    transport: T,
    interval: Duration,
}

impl<T: EchoTransport> Prober<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            interval: PROBE_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Send `count` echoes to `target`. A failed echo counts as lost; this
    /// never returns an error.
    ///
    /// `cancel` is checked before each echo and interrupts both the echo
    /// and the pause between echoes. The stats then cover only the echoes
    /// that completed.
    pub async fn probe(
        &self,
        target: IpAddr,
        count: u32,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> PingStats {
        let mut samples = Vec::with_capacity(count as usize);

        for i in 0..count {
            if cancel.is_cancelled() {
                break;
            }
            if i > 0 {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.interval) => {}
                }
            }
            let seq = (i % u32::from(u16::MAX)) as u16;
            let reply = tokio::select! {
                _ = cancel.cancelled() => break,
                reply = self.transport.echo(target, seq, timeout) => reply,
            };
            match reply {
                Ok(rtt) => samples.push(Some(rtt)),
                Err(e) => {
                    debug!(%target, seq, %e, "echo lost");
                    samples.push(None);
                }
            }
        }

        if cancel.is_cancelled() {
            debug!(%target, completed = samples.len(), "probe cancelled");
        }

        let stats = PingStats::from_samples(&samples);
        info!(
            %target,
            sent = stats.sent,
            received = stats.received,
            loss = stats.loss_percent,
            avg_ms = ?stats.avg_ms,
            "probe finished"
        );
        stats
    }
}
