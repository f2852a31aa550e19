//! Domain processors translating raw OpenSIPS statistics into samples.
//!
//! One processor covers one OpenSIPS module. Processors are constructed
//! fresh for every scrape cycle with a shared reference to that cycle's
//! snapshot and dropped once the cycle's samples are emitted; they keep no
//! state across cycles and never mutate the snapshot.

pub mod core;
pub mod dialog;
pub mod net;
pub mod registrar;
pub mod shmem;
pub mod sl;
pub mod tm;
pub mod usrloc;

use std::sync::Arc;

use crate::metric::{MetricDesc, Sample};

/// Per-cycle adapter for the statistics of one OpenSIPS module.
pub trait Processor: Send + Sync {
    /// Every descriptor this processor can emit, regardless of what the
    /// current snapshot contains. Stable across calls and across instances.
    fn describe(&self) -> Vec<Arc<MetricDesc>>;

    /// Samples for the statistics present in this cycle's snapshot. A
    /// statistic absent from the snapshot yields no sample; an unrecognized
    /// name under the module is skipped without error.
    fn collect(&self) -> Vec<Sample>;
}
