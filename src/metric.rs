//! Output metric identity, schema, and samples.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

/// Whether a metric reports a monotonically increasing total or a
/// point-in-time level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Counter,
    Gauge,
}

impl ValueKind {
    /// The TYPE comment string for the exposition format.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Counter => "counter",
            ValueKind::Gauge => "gauge",
        }
    }
}

/// Identity and schema of one logical output metric, independent of any
/// particular sample value.
#[derive(Debug, PartialEq, Eq)]
pub struct MetricDesc {
    fq_name: String,
    help: String,
    label_names: Vec<&'static str>,
    kind: ValueKind,
}

impl MetricDesc {
    /// Fully-qualified metric name (`namespace_subsystem_name`).
    pub fn fq_name(&self) -> &str {
        &self.fq_name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn label_names(&self) -> &[&'static str] {
        &self.label_names
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }
}

/// One emitted value for a descriptor, with concrete label values in the
/// order of the descriptor's label schema.
#[derive(Debug, Clone)]
pub struct Sample {
    pub desc: Arc<MetricDesc>,
    pub value: f64,
    pub label_values: Vec<String>,
}

impl Sample {
    /// Sample for an unlabeled metric.
    pub fn new(desc: &Arc<MetricDesc>, value: f64) -> Self {
        Self {
            desc: desc.clone(),
            value,
            label_values: Vec::new(),
        }
    }

    /// Sample for a metric with a single label.
    pub fn with_label(desc: &Arc<MetricDesc>, value: f64, label: impl Into<String>) -> Self {
        Self {
            desc: desc.clone(),
            value,
            label_values: vec![label.into()],
        }
    }
}

/// Errors detected while building the descriptor catalog.
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("metric {fq_name} registered twice with different schemas")]
    SchemaConflict { fq_name: String },
}

/// Startup-time catalog of every metric the exporter can emit.
///
/// Interning the same `(subsystem, name)` twice with an identical schema
/// returns the cached descriptor, so every processor referring to a shared
/// metric holds the same instance; descriptor identity is therefore pointer
/// identity. A second registration with a different schema is refused, which
/// fails startup.
#[derive(Debug)]
pub struct DescriptorTable {
    namespace: String,
    by_name: HashMap<String, Arc<MetricDesc>>,
}

impl DescriptorTable {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            by_name: HashMap::new(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Number of distinct descriptors interned so far.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Look up or create the descriptor for `subsystem`/`name`.
    pub fn intern(
        &mut self,
        subsystem: &str,
        name: &str,
        help: &str,
        label_names: &[&'static str],
        kind: ValueKind,
    ) -> Result<Arc<MetricDesc>, DescriptorError> {
        let fq_name = fq_name(&self.namespace, subsystem, name);

        if let Some(existing) = self.by_name.get(&fq_name) {
            if existing.help == help && existing.label_names == label_names && existing.kind == kind
            {
                return Ok(existing.clone());
            }
            return Err(DescriptorError::SchemaConflict { fq_name });
        }

        let desc = Arc::new(MetricDesc {
            fq_name: fq_name.clone(),
            help: help.to_string(),
            label_names: label_names.to_vec(),
            kind,
        });
        self.by_name.insert(fq_name, desc.clone());
        Ok(desc)
    }
}

/// Join name components, skipping empty parts.
fn fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    [namespace, subsystem, name]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}
