//! Metrics for the OpenSIPS core statistics.
//!
//! doc: https://www.opensips.org/Documentation/Interface-CoreStatistics-3-4

use std::sync::Arc;

use super::Processor;
use crate::metric::{MetricDesc, Sample, ValueKind};
use crate::registry::{Registry, RegistryError};
use crate::snapshot::Snapshot;

const MODULE: &str = "core";

const REQUEST_TYPES: &[(&str, &str)] = &[
    ("rcv_requests", "received"),
    ("fwd_requests", "forwarded"),
    ("drop_requests", "dropped"),
    ("err_requests", "error"),
];

const REPLY_TYPES: &[(&str, &str)] = &[
    ("rcv_replies", "received"),
    ("fwd_replies", "forwarded"),
    ("drop_replies", "dropped"),
    ("err_replies", "error"),
];

struct Metrics {
    requests: Arc<MetricDesc>,
    replies: Arc<MetricDesc>,
    bad_uris: Arc<MetricDesc>,
    unsupported_methods: Arc<MetricDesc>,
    bad_msg_hdr: Arc<MetricDesc>,
    uptime: Arc<MetricDesc>,
}

pub(crate) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    let table = registry.descriptors();
    let metrics = Arc::new(Metrics {
        requests: table.intern(
            MODULE,
            "requests_total",
            "Total number of SIP requests handled by the core.",
            &["type"],
            ValueKind::Counter,
        )?,
        replies: table.intern(
            MODULE,
            "replies_total",
            "Total number of SIP replies handled by the core.",
            &["type"],
            ValueKind::Counter,
        )?,
        bad_uris: table.intern(
            MODULE,
            "bad_uris_total",
            "Total number of URIs that failed to parse.",
            &[],
            ValueKind::Counter,
        )?,
        unsupported_methods: table.intern(
            MODULE,
            "unsupported_methods_total",
            "Total number of non-standard methods encountered.",
            &[],
            ValueKind::Counter,
        )?,
        bad_msg_hdr: table.intern(
            MODULE,
            "bad_msg_hdr_total",
            "Total number of SIP headers that failed to parse.",
            &[],
            ValueKind::Counter,
        )?,
        uptime: table.intern(
            MODULE,
            "uptime_seconds",
            "Seconds elapsed since OpenSIPS started.",
            &[],
            ValueKind::Gauge,
        )?,
    });

    let mut claimed = vec![
        "bad_URIs_rcvd",
        "unsupported_methods",
        "bad_msg_hdr",
        "timestamp",
    ];
    claimed.extend(REQUEST_TYPES.iter().map(|(name, _)| *name));
    claimed.extend(REPLY_TYPES.iter().map(|(name, _)| *name));

    registry.register(MODULE, &claimed, move |snapshot| {
        Box::new(CoreProcessor {
            metrics: metrics.clone(),
            snapshot,
        })
    })
}

struct CoreProcessor {
    metrics: Arc<Metrics>,
    snapshot: Arc<Snapshot>,
}

impl Processor for CoreProcessor {
    fn describe(&self) -> Vec<Arc<MetricDesc>> {
        vec![
            self.metrics.requests.clone(),
            self.metrics.replies.clone(),
            self.metrics.bad_uris.clone(),
            self.metrics.unsupported_methods.clone(),
            self.metrics.bad_msg_hdr.clone(),
            self.metrics.uptime.clone(),
        ]
    }

    fn collect(&self) -> Vec<Sample> {
        let mut plain = Vec::new();
        let mut requests = Vec::new();
        let mut replies = Vec::new();

        for statistic in self.snapshot.module(MODULE) {
            let name = statistic.name.as_str();
            if let Some((_, label)) = REQUEST_TYPES.iter().find(|(stat, _)| *stat == name) {
                requests.push(Sample::with_label(
                    &self.metrics.requests,
                    statistic.value,
                    *label,
                ));
            } else if let Some((_, label)) = REPLY_TYPES.iter().find(|(stat, _)| *stat == name) {
                replies.push(Sample::with_label(
                    &self.metrics.replies,
                    statistic.value,
                    *label,
                ));
            } else {
                match name {
                    "bad_URIs_rcvd" => {
                        plain.push(Sample::new(&self.metrics.bad_uris, statistic.value));
                    }
                    "unsupported_methods" => {
                        plain.push(Sample::new(
                            &self.metrics.unsupported_methods,
                            statistic.value,
                        ));
                    }
                    "bad_msg_hdr" => {
                        plain.push(Sample::new(&self.metrics.bad_msg_hdr, statistic.value));
                    }
                    "timestamp" => {
                        plain.push(Sample::new(&self.metrics.uptime, statistic.value));
                    }
                    _ => {}
                }
            }
        }

        requests.sort_by(|a, b| a.label_values.cmp(&b.label_values));
        replies.sort_by(|a, b| a.label_values.cmp(&b.label_values));
        requests.extend(replies);
        requests.extend(plain);
        requests
    }
}
