use std::io;

use thiserror::Error;

/// Alias for a `Result` with [`Error`] as its error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while building or querying a [`Profile`](crate::Profile).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// An event source could not supply a profiling timestamp.
    ///
    /// This aborts [`Profile::calc`](crate::Profile::calc) for the whole
    /// session: partially aggregated totals would silently misrepresent
    /// relative percentages, so there is no partial-results mode.
    #[error("queue `{queue}`: {source}")]
    ProfilingInfo {
        /// Name under which the failing queue was attached.
        queue: String,
        /// The underlying source error.
        source: InfoUnavailable,
    },

    /// [`Profile::calc`](crate::Profile::calc) was invoked a second time.
    #[error("profiling data has already been calculated")]
    AlreadyCalculated,

    /// A query or export was attempted before
    /// [`Profile::calc`](crate::Profile::calc) ran successfully.
    #[error("profiling data has not been calculated yet")]
    NotCalculated,

    /// A previous [`Profile::calc`](crate::Profile::calc) failed, leaving
    /// the session unusable. Build a fresh [`Profile`](crate::Profile) and
    /// re-attach the queues to retry.
    #[error("a previous calculation failed; the profile must be rebuilt")]
    Failed,

    /// Writing the export stream failed.
    ///
    /// Local to the export call: already-computed results remain valid and
    /// the export may be retried.
    #[error("failed to write profiling export")]
    StreamWrite(#[from] io::Error),
}

/// Error returned by an [`EventSource`](crate::EventSource) when a
/// profiling timestamp cannot be retrieved, e.g. because profiling was
/// not enabled on the underlying queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("profiling info unavailable: {0}")]
pub struct InfoUnavailable(pub String);

impl InfoUnavailable {
    /// Creates a new error from anything string-like.
    pub fn new(reason: impl Into<String>) -> Self {
        InfoUnavailable(reason.into())
    }
}
