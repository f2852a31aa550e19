//! Metrics for the registrar module (SIP registration handling).
//!
//! doc: https://opensips.org/html/docs/modules/3.4.x/registrar.html

use std::sync::Arc;

use super::Processor;
use crate::metric::{MetricDesc, Sample, ValueKind};
use crate::registry::{Registry, RegistryError};
use crate::snapshot::Snapshot;

const MODULE: &str = "registrar";

struct Metrics {
    max_expires: Arc<MetricDesc>,
    max_contacts: Arc<MetricDesc>,
    default_expire: Arc<MetricDesc>,
    registrations: Arc<MetricDesc>,
}

pub(crate) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    let table = registry.descriptors();
    let metrics = Arc::new(Metrics {
        max_expires: table.intern(
            MODULE,
            "max_expires",
            "Value of the max_expires module parameter.",
            &[],
            ValueKind::Gauge,
        )?,
        max_contacts: table.intern(
            MODULE,
            "max_contacts",
            "Value of the max_contacts module parameter.",
            &[],
            ValueKind::Gauge,
        )?,
        default_expire: table.intern(
            MODULE,
            "default_expire",
            "Value of the default_expire module parameter.",
            &[],
            ValueKind::Gauge,
        )?,
        registrations: table.intern(
            MODULE,
            "registrations",
            "Number of registrations.",
            &["type"],
            ValueKind::Counter,
        )?,
    });

    registry.register(
        MODULE,
        &[
            "max_expires",
            "max_contacts",
            "default_expire",
            "accepted_regs",
            "rejected_regs",
        ],
        move |snapshot| {
            Box::new(RegistrarProcessor {
                metrics: metrics.clone(),
                snapshot,
            })
        },
    )
}

/// Registration statistics, looked up by exact name; a parameter or counter
/// missing from the snapshot is omitted for the cycle.
struct RegistrarProcessor {
    metrics: Arc<Metrics>,
    snapshot: Arc<Snapshot>,
}

impl RegistrarProcessor {
    fn push_plain(&self, name: &str, desc: &Arc<MetricDesc>, samples: &mut Vec<Sample>) {
        if let Some(value) = self.snapshot.value(MODULE, name) {
            samples.push(Sample::new(desc, value));
        }
    }

    fn push_registration(&self, name: &str, label: &str, samples: &mut Vec<Sample>) {
        if let Some(value) = self.snapshot.value(MODULE, name) {
            samples.push(Sample::with_label(&self.metrics.registrations, value, label));
        }
    }
}

impl Processor for RegistrarProcessor {
    fn describe(&self) -> Vec<Arc<MetricDesc>> {
        vec![
            self.metrics.max_expires.clone(),
            self.metrics.max_contacts.clone(),
            self.metrics.default_expire.clone(),
            self.metrics.registrations.clone(),
        ]
    }

    fn collect(&self) -> Vec<Sample> {
        let mut samples = Vec::new();
        self.push_plain("max_expires", &self.metrics.max_expires, &mut samples);
        self.push_plain("max_contacts", &self.metrics.max_contacts, &mut samples);
        self.push_plain("default_expire", &self.metrics.default_expire, &mut samples);
        self.push_registration("accepted_regs", "accepted", &mut samples);
        self.push_registration("rejected_regs", "rejected", &mut samples);
        samples
    }
}
