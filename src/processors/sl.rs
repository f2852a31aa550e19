//! Metrics for the sl module (stateless SIP replies).
//!
//! doc: https://opensips.org/html/docs/modules/3.4.x/sl.html

use std::sync::Arc;

use super::Processor;
use crate::metric::{MetricDesc, Sample, ValueKind};
use crate::registry::{Registry, RegistryError};
use crate::snapshot::Snapshot;

const MODULE: &str = "sl";

/// Reply-class counters onto the `type` label of `replies_total`. The module
/// also exports per-code counters (`200_replies`, `404_replies`, ...); those
/// fall through the classification and are skipped.
const REPLY_TYPES: &[(&str, &str)] = &[
    ("1xx_replies", "1xx"),
    ("2xx_replies", "2xx"),
    ("3xx_replies", "3xx"),
    ("4xx_replies", "4xx"),
    ("5xx_replies", "5xx"),
    ("6xx_replies", "6xx"),
];

struct Metrics {
    replies: Arc<MetricDesc>,
    sent_replies: Arc<MetricDesc>,
    sent_err_replies: Arc<MetricDesc>,
    received_acks: Arc<MetricDesc>,
}

pub(crate) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    let table = registry.descriptors();
    let metrics = Arc::new(Metrics {
        replies: table.intern(
            MODULE,
            "replies_total",
            "Total number of stateless replies by reply class.",
            &["type"],
            ValueKind::Counter,
        )?,
        sent_replies: table.intern(
            MODULE,
            "sent_replies_total",
            "Total number of stateless replies sent.",
            &[],
            ValueKind::Counter,
        )?,
        sent_err_replies: table.intern(
            MODULE,
            "sent_err_replies_total",
            "Total number of stateless error replies sent.",
            &[],
            ValueKind::Counter,
        )?,
        received_acks: table.intern(
            MODULE,
            "received_acks_total",
            "Total number of ACKs received by the sl module.",
            &[],
            ValueKind::Counter,
        )?,
    });

    let mut claimed = vec!["sent_replies", "sent_err_replies", "received_ACKs"];
    claimed.extend(REPLY_TYPES.iter().map(|(name, _)| *name));

    registry.register(MODULE, &claimed, move |snapshot| {
        Box::new(SlProcessor {
            metrics: metrics.clone(),
            snapshot,
        })
    })
}

struct SlProcessor {
    metrics: Arc<Metrics>,
    snapshot: Arc<Snapshot>,
}

impl Processor for SlProcessor {
    fn describe(&self) -> Vec<Arc<MetricDesc>> {
        vec![
            self.metrics.replies.clone(),
            self.metrics.sent_replies.clone(),
            self.metrics.sent_err_replies.clone(),
            self.metrics.received_acks.clone(),
        ]
    }

    fn collect(&self) -> Vec<Sample> {
        let mut plain = Vec::new();
        let mut replies = Vec::new();

        for statistic in self.snapshot.module(MODULE) {
            match statistic.name.as_str() {
                "sent_replies" => {
                    plain.push(Sample::new(&self.metrics.sent_replies, statistic.value));
                }
                "sent_err_replies" => {
                    plain.push(Sample::new(&self.metrics.sent_err_replies, statistic.value));
                }
                "received_ACKs" => {
                    plain.push(Sample::new(&self.metrics.received_acks, statistic.value));
                }
                name => {
                    if let Some((_, label)) = REPLY_TYPES.iter().find(|(stat, _)| *stat == name) {
                        replies.push(Sample::with_label(
                            &self.metrics.replies,
                            statistic.value,
                            *label,
                        ));
                    }
                }
            }
        }

        replies.sort_by(|a, b| a.label_values.cmp(&b.label_values));
        replies.extend(plain);
        replies
    }
}
