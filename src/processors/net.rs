//! Metrics for the network transport statistics.

use std::sync::Arc;

use super::Processor;
use crate::metric::{MetricDesc, Sample, ValueKind};
use crate::registry::{Registry, RegistryError};
use crate::snapshot::Snapshot;

const MODULE: &str = "net";

/// Per-transport waiting buffers onto the `protocol` label.
const WAITING: &[(&str, &str)] = &[
    ("waiting_udp", "udp"),
    ("waiting_tcp", "tcp"),
    ("waiting_tls", "tls"),
];

struct Metrics {
    waiting: Arc<MetricDesc>,
}

pub(crate) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    let table = registry.descriptors();
    let metrics = Arc::new(Metrics {
        waiting: table.intern(
            MODULE,
            "waiting_bytes",
            "Bytes waiting to be consumed on a transport interface.",
            &["protocol"],
            ValueKind::Gauge,
        )?,
    });

    let claimed: Vec<&'static str> = WAITING.iter().map(|(name, _)| *name).collect();
    registry.register(MODULE, &claimed, move |snapshot| {
        Box::new(NetProcessor {
            metrics: metrics.clone(),
            snapshot,
        })
    })
}

struct NetProcessor {
    metrics: Arc<Metrics>,
    snapshot: Arc<Snapshot>,
}

impl Processor for NetProcessor {
    fn describe(&self) -> Vec<Arc<MetricDesc>> {
        vec![self.metrics.waiting.clone()]
    }

    fn collect(&self) -> Vec<Sample> {
        let mut samples = Vec::new();
        for (name, protocol) in WAITING {
            if let Some(value) = self.snapshot.value(MODULE, name) {
                samples.push(Sample::with_label(&self.metrics.waiting, value, *protocol));
            }
        }
        samples
    }
}
