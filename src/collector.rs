//! Scrape cycle orchestration.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::metric::{MetricDesc, Sample};
use crate::registry::Registry;
use crate::snapshot::Snapshot;

/// Everything one scrape cycle produced: the advertised metric set and the
/// samples backing it.
#[derive(Debug)]
pub struct ScrapeOutput {
    /// Each distinct descriptor exactly once, however many processors or
    /// statistics refer to it.
    pub descriptors: Vec<Arc<MetricDesc>>,
    pub samples: Vec<Sample>,
}

/// Running totals across scrape cycles.
#[derive(Debug, Clone, Default)]
pub struct CollectorStats {
    /// Scrape cycles attempted, including failed ones.
    pub scrapes: u64,
    /// Cycles that failed to obtain a snapshot.
    pub scrape_failures: u64,
    /// Raw statistics in the last successful snapshot.
    pub last_statistics: u64,
    /// Samples emitted by the last successful cycle.
    pub last_samples: u64,
    /// Statistics in the last snapshot no processor claimed.
    pub last_unmatched: u64,
}

/// Drives one full collection cycle against an immutable snapshot.
///
/// The registry is read-only after startup, every cycle gets its own
/// snapshot, and processors live only for the duration of one call, so
/// concurrent cycles never share mutable state.
pub struct Collector {
    registry: Registry,
    stats: RwLock<CollectorStats>,
}

/// Shareable collector handle.
pub type SharedCollector = Arc<Collector>;

impl Collector {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            stats: RwLock::new(CollectorStats::default()),
        }
    }

    pub fn namespace(&self) -> &str {
        self.registry.namespace()
    }

    /// Run one collection cycle.
    pub fn collect(&self, snapshot: Snapshot) -> ScrapeOutput {
        let snapshot = Arc::new(snapshot);

        let mut unmatched = 0u64;
        for key in snapshot.keys() {
            if !self.registry.is_claimed(key) {
                trace!(statistic = %key, "no processor for statistic");
                unmatched += 1;
            }
        }

        let mut descriptors = Vec::new();
        let mut advertised: HashSet<*const MetricDesc> = HashSet::new();
        let mut samples = Vec::new();

        for entry in self.registry.resolve(&snapshot) {
            let processor = entry.build(snapshot.clone());
            for desc in processor.describe() {
                if advertised.insert(Arc::as_ptr(&desc)) {
                    descriptors.push(desc);
                }
            }
            samples.extend(processor.collect());
        }

        debug!(
            statistics = snapshot.len(),
            samples = samples.len(),
            unmatched,
            "collection cycle complete"
        );

        let mut stats = self.stats.write();
        stats.scrapes += 1;
        stats.last_statistics = snapshot.len() as u64;
        stats.last_samples = samples.len() as u64;
        stats.last_unmatched = unmatched;
        drop(stats);

        ScrapeOutput {
            descriptors,
            samples,
        }
    }

    /// Record a cycle that failed to obtain a snapshot.
    pub fn record_failure(&self) {
        let mut stats = self.stats.write();
        stats.scrapes += 1;
        stats.scrape_failures += 1;
    }

    pub fn stats(&self) -> CollectorStats {
        self.stats.read().clone()
    }
}
