//! Raw statistics model for one scrape cycle.

use std::collections::HashMap;
use std::fmt;

/// Identifier of a single statistic, `module:name` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatisticKey {
    module: String,
    name: String,
}

impl StatisticKey {
    /// Create a key from its module and name components.
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }

    /// Parse a raw `module:name` identifier.
    ///
    /// OpenSIPS reports a handful of legacy names without a module
    /// component; those belong to `core`.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((module, name)) => Self::new(module, name),
            None => Self::new("core", raw),
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for StatisticKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.name)
    }
}

/// A single counter or gauge reading reported by OpenSIPS.
#[derive(Debug, Clone, PartialEq)]
pub struct Statistic {
    pub module: String,
    pub name: String,
    pub value: f64,
}

impl Statistic {
    pub fn new(module: impl Into<String>, name: impl Into<String>, value: f64) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
            value,
        }
    }

    /// The key this statistic is filed under.
    pub fn key(&self) -> StatisticKey {
        StatisticKey::new(self.module.clone(), self.name.clone())
    }
}

/// The complete set of statistics fetched in one scrape cycle.
///
/// Rebuilt from scratch on every cycle and never mutated once handed to the
/// collector; concurrent cycles each hold their own snapshot.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    statistics: HashMap<StatisticKey, Statistic>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a statistic, replacing any previous reading for the same key.
    pub fn insert(&mut self, statistic: Statistic) {
        self.statistics.insert(statistic.key(), statistic);
    }

    /// Exact lookup by module and statistic name.
    pub fn get(&self, module: &str, name: &str) -> Option<&Statistic> {
        self.statistics.get(&StatisticKey::new(module, name))
    }

    /// Value of a statistic, if present this cycle.
    pub fn value(&self, module: &str, name: &str) -> Option<f64> {
        self.get(module, name).map(|s| s.value)
    }

    /// All statistics reported by one module.
    pub fn module<'a>(&'a self, module: &'a str) -> impl Iterator<Item = &'a Statistic> {
        self.statistics
            .values()
            .filter(move |s| s.module == module)
    }

    pub fn keys(&self) -> impl Iterator<Item = &StatisticKey> {
        self.statistics.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Statistic> {
        self.statistics.values()
    }

    pub fn len(&self) -> usize {
        self.statistics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statistics.is_empty()
    }
}

impl FromIterator<Statistic> for Snapshot {
    fn from_iter<I: IntoIterator<Item = Statistic>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for statistic in iter {
            snapshot.insert(statistic);
        }
        snapshot
    }
}
