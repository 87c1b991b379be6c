use std::time::Duration;

use serde::Serialize;

/// Aggregated outcome of one probe run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PingStats {
    pub sent: u32,
    pub received: u32,
    pub lost: u32,
    pub loss_percent: f64,
    pub min_ms: Option<u64>,
    pub max_ms: Option<u64>,
    /// Mean round trip, truncated to whole milliseconds.
    pub avg_ms: Option<u64>,
    pub success: bool,
}

impl PingStats {
    /// Fold per-probe outcomes; `None` is a lost probe.
    pub fn from_samples(samples: &[Option<Duration>]) -> Self {
        let rtts: Vec<u64> = samples
            .iter()
            .flatten()
            .map(|rtt| rtt.as_millis() as u64)
            .collect();

        let sent = samples.len() as u32;
        let received = rtts.len() as u32;
        let lost = sent.saturating_sub(received);
        let loss_percent = if sent == 0 {
            0.0
        } else {
            f64::from(lost) / f64::from(sent) * 100.0
        };

        let avg_ms = if rtts.is_empty() {
            None
        } else {
            Some(rtts.iter().sum::<u64>() / rtts.len() as u64)
        };

        Self {
            sent,
            received,
            lost,
            loss_percent,
            min_ms: rtts.iter().copied().min(),
            max_ms: rtts.iter().copied().max(),
            avg_ms,
            success: received > 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Option<Duration> {
        Some(Duration::from_millis(v))
    }

    #[test]
    fn test_all_replies() {
        let stats = PingStats::from_samples(&[ms(10), ms(20), ms(15), ms(16)]);
        assert_eq!(stats.sent, 4);
        assert_eq!(stats.received, 4);
        assert_eq!(stats.lost, 0);
        assert_eq!(stats.loss_percent, 0.0);
        assert_eq!(stats.min_ms, Some(10));
        assert_eq!(stats.max_ms, Some(20));
        // 61 / 4 = 15.25, truncated.
        assert_eq!(stats.avg_ms, Some(15));
        assert!(stats.success);
    }

    #[test]
    fn test_partial_loss() {
        let stats = PingStats::from_samples(&[ms(5), None, ms(7), None]);
        assert_eq!(stats.lost, 2);
        assert_eq!(stats.loss_percent, 50.0);
        assert_eq!(stats.avg_ms, Some(6));
        assert!(stats.success);
    }

    #[test]
    fn test_total_loss() {
        let stats = PingStats::from_samples(&[None, None, None]);
        assert_eq!(stats.received, 0);
        assert_eq!(stats.loss_percent, 100.0);
        assert_eq!(stats.min_ms, None);
        assert_eq!(stats.avg_ms, None);
        assert!(!stats.success);
    }

    #[test]
    fn test_no_samples() {
        let stats = PingStats::from_samples(&[]);
        assert_eq!(stats.sent, 0);
        assert_eq!(stats.loss_percent, 0.0);
        assert!(!stats.success);
    }
}
