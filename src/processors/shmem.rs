//! Metrics for the shared-memory allocator statistics.

use std::sync::Arc;

use super::Processor;
use crate::metric::{MetricDesc, Sample, ValueKind};
use crate::registry::{Registry, RegistryError};
use crate::snapshot::Snapshot;

const MODULE: &str = "shmem";

struct Metrics {
    total: Arc<MetricDesc>,
    used: Arc<MetricDesc>,
    real_used: Arc<MetricDesc>,
    max_used: Arc<MetricDesc>,
    free: Arc<MetricDesc>,
    fragments: Arc<MetricDesc>,
}

pub(crate) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    let table = registry.descriptors();
    let metrics = Arc::new(Metrics {
        total: table.intern(
            MODULE,
            "total_bytes",
            "Total size of shared memory available to OpenSIPS processes.",
            &[],
            ValueKind::Gauge,
        )?,
        used: table.intern(
            MODULE,
            "used_bytes",
            "Shared memory requested and used by OpenSIPS processes.",
            &[],
            ValueKind::Gauge,
        )?,
        real_used: table.intern(
            MODULE,
            "real_used_bytes",
            "Shared memory used, including allocator overhead.",
            &[],
            ValueKind::Gauge,
        )?,
        max_used: table.intern(
            MODULE,
            "max_used_bytes",
            "Maximum shared memory ever used by OpenSIPS processes.",
            &[],
            ValueKind::Gauge,
        )?,
        free: table.intern(
            MODULE,
            "free_bytes",
            "Free shared memory.",
            &[],
            ValueKind::Gauge,
        )?,
        fragments: table.intern(
            MODULE,
            "fragments",
            "Number of fragments in shared memory.",
            &[],
            ValueKind::Gauge,
        )?,
    });

    registry.register(
        MODULE,
        &[
            "total_size",
            "used_size",
            "real_used_size",
            "max_used_size",
            "free_size",
            "fragments",
        ],
        move |snapshot| {
            Box::new(ShmemProcessor {
                metrics: metrics.clone(),
                snapshot,
            })
        },
    )
}

/// Allocator gauges, looked up by exact name.
struct ShmemProcessor {
    metrics: Arc<Metrics>,
    snapshot: Arc<Snapshot>,
}

impl ShmemProcessor {
    fn push(&self, name: &str, desc: &Arc<MetricDesc>, samples: &mut Vec<Sample>) {
        if let Some(value) = self.snapshot.value(MODULE, name) {
            samples.push(Sample::new(desc, value));
        }
    }
}

impl Processor for ShmemProcessor {
    fn describe(&self) -> Vec<Arc<MetricDesc>> {
        vec![
            self.metrics.total.clone(),
            self.metrics.used.clone(),
            self.metrics.real_used.clone(),
            self.metrics.max_used.clone(),
            self.metrics.free.clone(),
            self.metrics.fragments.clone(),
        ]
    }

    fn collect(&self) -> Vec<Sample> {
        let mut samples = Vec::new();
        self.push("total_size", &self.metrics.total, &mut samples);
        self.push("used_size", &self.metrics.used, &mut samples);
        self.push("real_used_size", &self.metrics.real_used, &mut samples);
        self.push("max_used_size", &self.metrics.max_used, &mut samples);
        self.push("free_size", &self.metrics.free, &mut samples);
        self.push("fragments", &self.metrics.fragments, &mut samples);
        samples
    }
}
