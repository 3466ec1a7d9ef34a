use std::sync::Arc;

use crate::error::InfoUnavailable;

/// The four profiling timestamps of one completed operation, in
/// nanoseconds of the device clock domain.
///
/// Only `started` and `ended` take part in aggregation and overlap
/// detection; `queued` and `submitted` are carried through to the
/// per-event information table so callers can inspect queueing latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpTimes {
    /// Instant at which the operation was enqueued by the host.
    pub queued: u64,
    /// Instant at which the operation was submitted to the device.
    pub submitted: u64,
    /// Instant at which the operation started executing.
    pub started: u64,
    /// Instant at which the operation finished executing.
    pub ended: u64,
}

impl OpTimes {
    /// Timestamps for an operation that only reports execution instants.
    ///
    /// `queued` and `submitted` are set equal to `started`.
    pub fn span(started: u64, ended: u64) -> Self {
        OpTimes {
            queued: started,
            submitted: started,
            started,
            ended,
        }
    }
}

/// One operation recorded on a command queue: a caller-meaningful name
/// plus its profiling timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpRecord {
    /// Operation name. Operations sharing a name are aggregated together.
    pub name: String,
    /// Profiling timestamps.
    pub times: OpTimes,
}

impl OpRecord {
    /// Creates a record from a name and execution start/end instants.
    pub fn new(name: impl Into<String>, times: OpTimes) -> Self {
        OpRecord {
            name: name.into(),
            times,
        }
    }
}

/// A source of recorded, completed operations, typically a thin wrapper
/// around a compute runtime's command queue.
///
/// Implementations must yield a finite sequence of operations whose
/// device work has already completed (profiling timestamps are only
/// valid for completed operations). The sequence may be lazy; yielding
/// an `Err` aborts the whole calculation of any
/// [`Profile`](crate::Profile) the source is attached to.
///
/// Sources are attached to sessions behind an [`Arc`], so a session and
/// its caller share ownership: either side may drop its handle first.
pub trait EventSource {
    /// Returns an iterator over the operations recorded on this source.
    ///
    /// Called at most once per [`Profile::calc`](crate::Profile::calc);
    /// implementations backed by single-pass cursors are fine.
    fn records(&self) -> Box<dyn Iterator<Item = Result<OpRecord, InfoUnavailable>> + '_>;
}

impl std::fmt::Debug for dyn EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn EventSource")
    }
}

impl<S: EventSource + ?Sized> EventSource for Arc<S> {
    fn records(&self) -> Box<dyn Iterator<Item = Result<OpRecord, InfoUnavailable>> + '_> {
        (**self).records()
    }
}

/// An in-memory [`EventSource`] over an already-materialized list of
/// records.
///
/// Useful both as a test double and as the adapter for runtimes whose
/// interop layer extracts timestamps eagerly.
#[derive(Debug, Clone, Default)]
pub struct VecSource {
    records: Vec<OpRecord>,
}

impl VecSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        VecSource::default()
    }

    /// Appends one record.
    pub fn push(&mut self, record: OpRecord) {
        self.records.push(record);
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the source holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<Vec<OpRecord>> for VecSource {
    fn from(records: Vec<OpRecord>) -> Self {
        VecSource { records }
    }
}

impl EventSource for VecSource {
    fn records(&self) -> Box<dyn Iterator<Item = Result<OpRecord, InfoUnavailable>> + '_> {
        Box::new(self.records.iter().cloned().map(Ok))
    }
}
