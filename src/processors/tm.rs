//! Metrics for the tm module (stateful SIP transaction processing).
//!
//! doc: https://opensips.org/html/docs/modules/3.4.x/tm.html

use std::sync::Arc;

use super::Processor;
use crate::metric::{MetricDesc, Sample, ValueKind};
use crate::registry::{Registry, RegistryError};
use crate::snapshot::Snapshot;

const MODULE: &str = "tm";

/// Classification of per-outcome transaction counters onto the `type` label
/// of the shared `transactions_total` metric.
const TRANSACTION_TYPES: &[(&str, &str)] = &[
    ("UAS_transactions", "UAS"),
    ("UAC_transactions", "UAC"),
    ("2xx_transactions", "2xx"),
    ("3xx_transactions", "3xx"),
    ("4xx_transactions", "4xx"),
    ("5xx_transactions", "5xx"),
    ("6xx_transactions", "6xx"),
];

struct Metrics {
    received_replies: Arc<MetricDesc>,
    relayed_replies: Arc<MetricDesc>,
    local_replies: Arc<MetricDesc>,
    transactions: Arc<MetricDesc>,
    inuse_transactions: Arc<MetricDesc>,
}

pub(crate) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    let table = registry.descriptors();
    let metrics = Arc::new(Metrics {
        received_replies: table.intern(
            MODULE,
            "received_replies_total",
            "Total number of replies received by the TM module.",
            &[],
            ValueKind::Counter,
        )?,
        relayed_replies: table.intern(
            MODULE,
            "relayed_replies_total",
            "Total number of replies received and relayed by the TM module.",
            &[],
            ValueKind::Counter,
        )?,
        local_replies: table.intern(
            MODULE,
            "local_replies_total",
            "Total number of replies generated locally by the TM module.",
            &[],
            ValueKind::Counter,
        )?,
        transactions: table.intern(
            MODULE,
            "transactions_total",
            "Total number of transactions.",
            &["type"],
            ValueKind::Counter,
        )?,
        inuse_transactions: table.intern(
            MODULE,
            "inuse_transactions",
            "Number of transactions existing in memory at current time.",
            &[],
            ValueKind::Gauge,
        )?,
    });

    let mut claimed = vec![
        "received_replies",
        "relayed_replies",
        "local_replies",
        "inuse_transactions",
    ];
    claimed.extend(TRANSACTION_TYPES.iter().map(|(name, _)| *name));

    registry.register(MODULE, &claimed, move |snapshot| {
        Box::new(TmProcessor {
            metrics: metrics.clone(),
            snapshot,
        })
    })
}

/// Transaction statistics, dispatched by name over everything the tm module
/// reported this cycle; names outside the classification are skipped.
struct TmProcessor {
    metrics: Arc<Metrics>,
    snapshot: Arc<Snapshot>,
}

impl Processor for TmProcessor {
    fn describe(&self) -> Vec<Arc<MetricDesc>> {
        vec![
            self.metrics.received_replies.clone(),
            self.metrics.relayed_replies.clone(),
            self.metrics.local_replies.clone(),
            self.metrics.transactions.clone(),
            self.metrics.inuse_transactions.clone(),
        ]
    }

    fn collect(&self) -> Vec<Sample> {
        let mut plain = Vec::new();
        let mut transactions = Vec::new();

        for statistic in self.snapshot.module(MODULE) {
            match statistic.name.as_str() {
                "received_replies" => {
                    plain.push(Sample::new(&self.metrics.received_replies, statistic.value));
                }
                "relayed_replies" => {
                    plain.push(Sample::new(&self.metrics.relayed_replies, statistic.value));
                }
                "local_replies" => {
                    plain.push(Sample::new(&self.metrics.local_replies, statistic.value));
                }
                "inuse_transactions" => {
                    plain.push(Sample::new(&self.metrics.inuse_transactions, statistic.value));
                }
                name => {
                    if let Some((_, label)) =
                        TRANSACTION_TYPES.iter().find(|(stat, _)| *stat == name)
                    {
                        transactions.push(Sample::with_label(
                            &self.metrics.transactions,
                            statistic.value,
                            *label,
                        ));
                    }
                }
            }
        }

        // Keep the type-labeled series adjacent and deterministic.
        transactions.sort_by(|a, b| a.label_values.cmp(&b.label_values));
        plain.extend(transactions);
        plain
    }
}
