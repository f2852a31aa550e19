//! Management-interface client fetching statistics from OpenSIPS.
//!
//! The exporter talks JSON-RPC 2.0 to the `mi_datagram` UDP socket of the
//! monitored instance, one `get_statistics` round-trip per scrape cycle.

use std::future::Future;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::trace;

use crate::snapshot::{Snapshot, Statistic, StatisticKey};

/// Largest UDP payload `mi_datagram` will send.
const MAX_DATAGRAM: usize = 65_507;

/// Errors talking to the management interface. Any of these fails the whole
/// scrape cycle.
#[derive(Debug, Error)]
pub enum MiError {
    #[error("I/O error talking to the management interface: {0}")]
    Io(#[from] std::io::Error),

    #[error("management interface did not answer within {0:?}")]
    Timeout(Duration),

    #[error("management interface returned error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed management interface response: {0}")]
    Response(String),

    #[error("failed to decode management interface response: {0}")]
    Json(#[from] serde_json::Error),
}

/// Source of statistic snapshots, invoked once per scrape cycle.
pub trait StatisticsProvider: Send + Sync {
    fn snapshot(&self) -> Pin<Box<dyn Future<Output = Result<Snapshot, MiError>> + Send + '_>>;
}

/// Shareable provider handle.
pub type SharedProvider = Arc<dyn StatisticsProvider>;

/// JSON-RPC client for the `mi_datagram` transport.
pub struct DatagramClient {
    target: SocketAddr,
    timeout: Duration,
}

impl DatagramClient {
    pub fn new(target: SocketAddr, timeout: Duration) -> Self {
        Self { target, timeout }
    }

    async fn fetch(&self) -> Result<Snapshot, MiError> {
        let bind_addr: SocketAddr = if self.target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(self.target).await?;

        let request = serde_json::to_vec(&json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "get_statistics",
            "params": { "statistics": ["all"] },
        }))?;
        socket.send(&request).await?;

        let mut buf = vec![0u8; MAX_DATAGRAM];
        let received = timeout(self.timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| MiError::Timeout(self.timeout))??;

        trace!(bytes = received, target = %self.target, "management interface reply");
        parse_statistics(&buf[..received])
    }
}

impl StatisticsProvider for DatagramClient {
    fn snapshot(&self) -> Pin<Box<dyn Future<Output = Result<Snapshot, MiError>> + Send + '_>> {
        Box::pin(self.fetch())
    }
}

#[derive(Debug, Deserialize)]
struct RpcReply {
    #[serde(default)]
    result: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Parse a `get_statistics` reply into a snapshot.
///
/// The result object maps `module:name` identifiers to readings, which
/// arrive as JSON numbers or as decimal strings depending on the OpenSIPS
/// version. An entry whose value is not numeric is dropped (a data gap for
/// its owner, not a failed cycle).
pub fn parse_statistics(raw: &[u8]) -> Result<Snapshot, MiError> {
    let reply: RpcReply = serde_json::from_slice(raw)?;

    if let Some(error) = reply.error {
        return Err(MiError::Rpc {
            code: error.code,
            message: error.message,
        });
    }
    let result = reply
        .result
        .ok_or_else(|| MiError::Response("neither result nor error present".to_string()))?;

    let mut snapshot = Snapshot::new();
    for (raw_key, value) in &result {
        let Some(value) = numeric(value) else {
            trace!(statistic = %raw_key, "ignoring non-numeric statistic");
            continue;
        };
        let key = StatisticKey::parse(raw_key);
        snapshot.insert(Statistic::new(key.module(), key.name(), value));
    }
    Ok(snapshot)
}

fn numeric(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
