use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use surge_ping::{Client, Config, ICMP, PingIdentifier, PingSequence};
use tracing::debug;

use common::{Error, Result};

/// 56 bytes, the payload size of the classic `ping`.
const PAYLOAD: [u8; 56] = [0; 56];

/// A single echo exchange. Returns the round-trip time of the reply.
#[async_trait]
pub trait EchoTransport: Send + Sync {
    async fn echo(&self, target: IpAddr, seq: u16, timeout: Duration) -> Result<Duration>;
}

/// A missing transport loses every probe, so a host without ICMP sockets
/// still scans with empty ping statistics.
#[async_trait]
impl<T: EchoTransport> EchoTransport for Option<T> {
    async fn echo(&self, target: IpAddr, seq: u16, timeout: Duration) -> Result<Duration> {
        match self {
            Some(transport) => transport.echo(target, seq, timeout).await,
            None => Err(Error::Probe("no echo transport available".into())),
        }
    }
}

/// ICMP echo over surge-ping, one client per address family.
pub struct IcmpEcho {
    v4: Client,
    v6: Client,
    ident: u16,
}

impl IcmpEcho {
    pub fn new() -> Result<Self> {
        let v4 = Client::new(&Config::default())
            .map_err(|e| Error::Probe(format!("failed to open ICMPv4 socket: {e}")))?;
        let v6 = Client::new(&Config::builder().kind(ICMP::V6).build())
            .map_err(|e| Error::Probe(format!("failed to open ICMPv6 socket: {e}")))?;

        Ok(Self {
            v4,
            v6,
            ident: common::random_u64() as u16,
        })
    }
}

#[async_trait]
impl EchoTransport for IcmpEcho {
    async fn echo(&self, target: IpAddr, seq: u16, timeout: Duration) -> Result<Duration> {
        let client = match target {
            IpAddr::V4(_) => &self.v4,
            IpAddr::V6(_) => &self.v6,
        };

        let mut pinger = client.pinger(target, PingIdentifier(self.ident)).await;
        pinger.timeout(timeout);

        let (_packet, rtt) = pinger
            .ping(PingSequence(seq), &PAYLOAD)
            .await
            .map_err(|e| Error::Probe(format!("echo {seq} to {target}: {e}")))?;

        debug!(%target, seq, rtt_ms = rtt.as_millis() as u64, "echo reply");
        Ok(rtt)
    }
}
