//! Dispatch table from statistic keys to processor constructors.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use thiserror::Error;

use crate::metric::{DescriptorError, DescriptorTable};
use crate::processors::{self, Processor};
use crate::snapshot::{Snapshot, StatisticKey};

/// Constructor building a processor bound to one cycle's snapshot.
type ProcessorCtor = Box<dyn Fn(Arc<Snapshot>) -> Box<dyn Processor> + Send + Sync>;

/// One registered processor type.
pub struct ProcessorEntry {
    module: &'static str,
    ctor: ProcessorCtor,
}

impl ProcessorEntry {
    /// The OpenSIPS module this processor covers.
    pub fn module(&self) -> &'static str {
        self.module
    }

    /// Instantiate the processor for a cycle.
    pub fn build(&self, snapshot: Arc<Snapshot>) -> Box<dyn Processor> {
        (self.ctor)(snapshot)
    }
}

/// Errors detected while populating the registry at startup.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error("processor for {module} claims statistic {key} twice")]
    DuplicateKey { module: &'static str, key: String },
}

/// Process-wide table mapping statistic keys to processor constructors.
///
/// Populated once during startup by [`Registry::with_default_processors`]
/// and read-only afterwards, so concurrent scrape cycles can resolve against
/// it without locking.
pub struct Registry {
    descriptors: DescriptorTable,
    entries: Vec<ProcessorEntry>,
    exact: HashMap<StatisticKey, usize>,
    wildcard: HashMap<&'static str, usize>,
}

impl Registry {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            descriptors: DescriptorTable::new(namespace),
            entries: Vec::new(),
            exact: HashMap::new(),
            wildcard: HashMap::new(),
        }
    }

    /// Registry with every processor this exporter ships.
    pub fn with_default_processors(namespace: impl Into<String>) -> Result<Self, RegistryError> {
        let mut registry = Self::new(namespace);
        processors::core::register(&mut registry)?;
        processors::dialog::register(&mut registry)?;
        processors::net::register(&mut registry)?;
        processors::registrar::register(&mut registry)?;
        processors::shmem::register(&mut registry)?;
        processors::sl::register(&mut registry)?;
        processors::tm::register(&mut registry)?;
        processors::usrloc::register(&mut registry)?;
        Ok(registry)
    }

    /// The descriptor catalog processors intern their metrics into.
    pub fn descriptors(&mut self) -> &mut DescriptorTable {
        &mut self.descriptors
    }

    pub fn namespace(&self) -> &str {
        self.descriptors.namespace()
    }

    /// Register a processor for `module`.
    ///
    /// Each name in `statistics` becomes an exact-match entry under the
    /// module, and a wildcard entry for the module itself is always added so
    /// the processor still runs when none of its specific statistics made it
    /// into a snapshot. Re-registering a key claimed by an earlier call
    /// rebinds it (last registration wins); claiming the same key twice in
    /// one call is a broken claim table and is refused.
    pub fn register(
        &mut self,
        module: &'static str,
        statistics: &[&'static str],
        ctor: impl Fn(Arc<Snapshot>) -> Box<dyn Processor> + Send + Sync + 'static,
    ) -> Result<(), RegistryError> {
        let index = self.entries.len();
        self.entries.push(ProcessorEntry {
            module,
            ctor: Box::new(ctor),
        });

        for name in statistics {
            let key = StatisticKey::new(module, *name);
            if self.exact.get(&key) == Some(&index) {
                return Err(RegistryError::DuplicateKey {
                    module,
                    key: key.to_string(),
                });
            }
            self.exact.insert(key, index);
        }
        self.wildcard.insert(module, index);
        Ok(())
    }

    /// Whether any entry would handle this key.
    pub fn is_claimed(&self, key: &StatisticKey) -> bool {
        self.exact.contains_key(key) || self.wildcard.contains_key(key.module())
    }

    /// Resolve the set of processors applicable to a snapshot.
    ///
    /// For every key present, an exact match wins over the module wildcard;
    /// keys matching neither are ignored. Each entry is returned at most
    /// once, however many keys resolved to it, in registration order.
    pub fn resolve(&self, snapshot: &Snapshot) -> Vec<&ProcessorEntry> {
        let mut selected = BTreeSet::new();
        for key in snapshot.keys() {
            if let Some(&index) = self.exact.get(key) {
                selected.insert(index);
            } else if let Some(&index) = self.wildcard.get(key.module()) {
                selected.insert(index);
            }
        }
        selected.into_iter().map(|i| &self.entries[i]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Statistic;

    fn snapshot(stats: &[(&str, &str, f64)]) -> Snapshot {
        stats
            .iter()
            .map(|(module, name, value)| Statistic::new(*module, *name, *value))
            .collect()
    }

    #[test]
    fn test_resolve_deduplicates_exact_and_wildcard() {
        let registry = Registry::with_default_processors("opensips").unwrap();
        // Three registrar keys plus the module wildcard all map to the same
        // entry; it must be instantiated once.
        let snapshot = snapshot(&[
            ("registrar", "max_expires", 3600.0),
            ("registrar", "accepted_regs", 10.0),
            ("registrar", "some_future_stat", 1.0),
        ]);

        let entries = registry.resolve(&snapshot);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].module(), "registrar");
    }

    #[test]
    fn test_resolve_unknown_module_ignored() {
        let registry = Registry::with_default_processors("opensips").unwrap();
        let snapshot = snapshot(&[("mysterious", "things_total", 4.0)]);

        assert!(registry.resolve(&snapshot).is_empty());
    }

    #[test]
    fn test_resolve_empty_snapshot() {
        let registry = Registry::with_default_processors("opensips").unwrap();
        assert!(registry.resolve(&Snapshot::new()).is_empty());
    }

    #[test]
    fn test_resolve_wildcard_only() {
        let registry = Registry::with_default_processors("opensips").unwrap();
        // No tm statistic the processor claims by name, but the module is
        // present, so the wildcard still selects the processor.
        let snapshot = snapshot(&[("tm", "brand_new_counter", 9.0)]);

        let entries = registry.resolve(&snapshot);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].module(), "tm");
    }

    #[test]
    fn test_resolve_multiple_modules() {
        let registry = Registry::with_default_processors("opensips").unwrap();
        let snapshot = snapshot(&[
            ("registrar", "max_expires", 3600.0),
            ("tm", "inuse_transactions", 12.0),
            ("shmem", "used_size", 1024.0),
        ]);

        let entries = registry.resolve(&snapshot);
        let mut modules: Vec<_> = entries.iter().map(|e| e.module()).collect();
        modules.sort_unstable();
        assert_eq!(modules, vec!["registrar", "shmem", "tm"]);
    }

    #[test]
    fn test_duplicate_claim_in_one_registration_fails() {
        let mut registry = Registry::new("opensips");
        let result = registry.register("demo", &["a_stat", "a_stat"], |snapshot| {
            struct Nop;
            impl Processor for Nop {
                fn describe(&self) -> Vec<std::sync::Arc<crate::metric::MetricDesc>> {
                    Vec::new()
                }
                fn collect(&self) -> Vec<crate::metric::Sample> {
                    Vec::new()
                }
            }
            let _ = snapshot;
            Box::new(Nop)
        });

        assert!(matches!(result, Err(RegistryError::DuplicateKey { .. })));
    }

    #[test]
    fn test_conflicting_descriptor_schemas_fail_startup() {
        let mut registry = Registry::new("opensips");
        registry
            .descriptors()
            .intern("registrar", "max_expires", "help", &[], crate::metric::ValueKind::Gauge)
            .unwrap();

        // A second processor claiming the same metric with a label schema
        // must be rejected before any scrape can happen.
        let conflict = registry.descriptors().intern(
            "registrar",
            "max_expires",
            "help",
            &["type"],
            crate::metric::ValueKind::Gauge,
        );
        assert!(conflict.is_err());
    }
}
