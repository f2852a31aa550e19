//! Metrics for the usrloc module (in-memory user location database).
//!
//! Besides the fixed `registered_users` gauge, usrloc exports one statistic
//! triple per location domain, named after the domain table
//! (`location-users`, `location-contacts`, `location-expires`). The domain
//! set is configuration-dependent, so samples here carry a `domain` label
//! extracted from the statistic name.

use std::sync::Arc;

use super::Processor;
use crate::metric::{MetricDesc, Sample, ValueKind};
use crate::registry::{Registry, RegistryError};
use crate::snapshot::Snapshot;

const MODULE: &str = "usrloc";

struct Metrics {
    registered_users: Arc<MetricDesc>,
    domain_users: Arc<MetricDesc>,
    domain_contacts: Arc<MetricDesc>,
    domain_expires: Arc<MetricDesc>,
}

pub(crate) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    let table = registry.descriptors();
    let metrics = Arc::new(Metrics {
        registered_users: table.intern(
            MODULE,
            "registered_users",
            "Total number of users registered across all domains.",
            &[],
            ValueKind::Gauge,
        )?,
        domain_users: table.intern(
            MODULE,
            "domain_users",
            "Number of addresses-of-record in a location domain.",
            &["domain"],
            ValueKind::Gauge,
        )?,
        domain_contacts: table.intern(
            MODULE,
            "domain_contacts",
            "Number of contacts in a location domain.",
            &["domain"],
            ValueKind::Gauge,
        )?,
        domain_expires: table.intern(
            MODULE,
            "domain_expires_total",
            "Total number of expired contacts in a location domain.",
            &["domain"],
            ValueKind::Counter,
        )?,
    });

    // Domain statistics have configuration-dependent names; the module
    // wildcard routes them here.
    registry.register(MODULE, &["registered_users"], move |snapshot| {
        Box::new(UsrlocProcessor {
            metrics: metrics.clone(),
            snapshot,
        })
    })
}

struct UsrlocProcessor {
    metrics: Arc<Metrics>,
    snapshot: Arc<Snapshot>,
}

impl Processor for UsrlocProcessor {
    fn describe(&self) -> Vec<Arc<MetricDesc>> {
        vec![
            self.metrics.registered_users.clone(),
            self.metrics.domain_users.clone(),
            self.metrics.domain_contacts.clone(),
            self.metrics.domain_expires.clone(),
        ]
    }

    fn collect(&self) -> Vec<Sample> {
        let mut plain = Vec::new();
        let mut users = Vec::new();
        let mut contacts = Vec::new();
        let mut expires = Vec::new();

        for statistic in self.snapshot.module(MODULE) {
            let name = statistic.name.as_str();
            if name == "registered_users" {
                plain.push(Sample::new(&self.metrics.registered_users, statistic.value));
            } else if let Some(domain) = name.strip_suffix("-users") {
                users.push(Sample::with_label(
                    &self.metrics.domain_users,
                    statistic.value,
                    domain,
                ));
            } else if let Some(domain) = name.strip_suffix("-contacts") {
                contacts.push(Sample::with_label(
                    &self.metrics.domain_contacts,
                    statistic.value,
                    domain,
                ));
            } else if let Some(domain) = name.strip_suffix("-expires") {
                expires.push(Sample::with_label(
                    &self.metrics.domain_expires,
                    statistic.value,
                    domain,
                ));
            }
        }

        for group in [&mut users, &mut contacts, &mut expires] {
            group.sort_by(|a, b| a.label_values.cmp(&b.label_values));
        }
        plain.extend(users);
        plain.extend(contacts);
        plain.extend(expires);
        plain
    }
}
