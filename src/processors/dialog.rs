//! Metrics for the dialog module (SIP dialog tracking).
//!
//! doc: https://opensips.org/html/docs/modules/3.4.x/dialog.html

use std::sync::Arc;

use super::Processor;
use crate::metric::{MetricDesc, Sample, ValueKind};
use crate::registry::{Registry, RegistryError};
use crate::snapshot::Snapshot;

const MODULE: &str = "dialog";

/// Terminal dialog counters onto the `status` label of `dialogs_total`.
const DIALOG_STATUSES: &[(&str, &str)] = &[
    ("processed_dialogs", "processed"),
    ("expired_dialogs", "expired"),
    ("failed_dialogs", "failed"),
];

struct Metrics {
    active: Arc<MetricDesc>,
    early: Arc<MetricDesc>,
    dialogs: Arc<MetricDesc>,
}

pub(crate) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    let table = registry.descriptors();
    let metrics = Arc::new(Metrics {
        active: table.intern(
            MODULE,
            "active_dialogs",
            "Number of dialogs currently in the confirmed state.",
            &[],
            ValueKind::Gauge,
        )?,
        early: table.intern(
            MODULE,
            "early_dialogs",
            "Number of dialogs currently in the early state.",
            &[],
            ValueKind::Gauge,
        )?,
        dialogs: table.intern(
            MODULE,
            "dialogs_total",
            "Total number of dialogs by terminal status.",
            &["status"],
            ValueKind::Counter,
        )?,
    });

    let mut claimed = vec!["active_dialogs", "early_dialogs"];
    claimed.extend(DIALOG_STATUSES.iter().map(|(name, _)| *name));

    registry.register(MODULE, &claimed, move |snapshot| {
        Box::new(DialogProcessor {
            metrics: metrics.clone(),
            snapshot,
        })
    })
}

struct DialogProcessor {
    metrics: Arc<Metrics>,
    snapshot: Arc<Snapshot>,
}

impl Processor for DialogProcessor {
    fn describe(&self) -> Vec<Arc<MetricDesc>> {
        vec![
            self.metrics.active.clone(),
            self.metrics.early.clone(),
            self.metrics.dialogs.clone(),
        ]
    }

    fn collect(&self) -> Vec<Sample> {
        let mut samples = Vec::new();
        if let Some(value) = self.snapshot.value(MODULE, "active_dialogs") {
            samples.push(Sample::new(&self.metrics.active, value));
        }
        if let Some(value) = self.snapshot.value(MODULE, "early_dialogs") {
            samples.push(Sample::new(&self.metrics.early, value));
        }
        for (name, status) in DIALOG_STATUSES {
            if let Some(value) = self.snapshot.value(MODULE, name) {
                samples.push(Sample::with_label(&self.metrics.dialogs, value, *status));
            }
        }
        samples
    }
}
