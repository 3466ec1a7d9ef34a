//! qprof is a host-side profiling layer for the command queues of a
//! compute runtime (OpenCL-style GPUs and other accelerators). It
//! ingests the timestamped start/end events that completed operations
//! leave behind on their queues and answers two questions: how much
//! wall-clock time did each *kind* of operation consume, and how much of
//! that time did different kinds of operation spend executing
//! concurrently?
//!
//! The answers come as aggregate statistics (absolute nanoseconds and
//! share of the grand total per operation name) and as a symmetric
//! overlap matrix (total overlapping nanoseconds for every pair of
//! names, the diagonal covering operations concurrent with other
//! instances of themselves). Application code typically uses them to
//! compare accelerated execution against a CPU baseline and to see
//! where speedups come from, or where scheduling eats them.
//!
//! # Feeding a profile
//!
//! qprof does not talk to any device. The runtime interop layer is
//! abstracted behind the [`EventSource`] trait: anything that can
//! produce a finite sequence of [`OpRecord`]s (a name plus four
//! profiling timestamps) can be attached to a [`Profile`] as a named
//! queue. [`VecSource`] is a ready-made in-memory implementation for
//! runtimes that extract timestamps eagerly, and the test double of
//! choice.
//!
//! Events may arrive in any order (queues run independently, and the
//! calculation re-sorts everything it needs), but all device work must
//! have completed, since profiling timestamps are only valid for
//! completed operations.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use qprof::{report, AggSort, OpRecord, OpTimes, OverlapSort, Profile, SortOrder, VecSource};
//!
//! let uploads = VecSource::from(vec![
//!     OpRecord::new("write_buffer", OpTimes::span(10, 45)),
//!     OpRecord::new("write_buffer", OpTimes::span(50, 80)),
//! ]);
//! let compute = VecSource::from(vec![
//!     OpRecord::new("simulate", OpTimes::span(40, 95)),
//! ]);
//!
//! let mut prof = Profile::new();
//! prof.add_queue("upload", Arc::new(uploads))?;
//! prof.add_queue("compute", Arc::new(compute))?;
//! prof.calc()?;
//!
//! // 35 ns of uploading overlapped with simulation.
//! assert_eq!(prof.overlap_time()?, 35);
//! assert_eq!(prof.effective_time()?, prof.total_time()? - 35);
//!
//! let text = report::summary(
//!     &mut prof,
//!     (AggSort::Time, SortOrder::Descending),
//!     (OverlapSort::Duration, SortOrder::Descending),
//! )?;
//! assert!(text.contains("write_buffer"));
//! # Ok::<(), qprof::Error>(())
//! ```
//!
//! # What this crate is not
//!
//! This crate never schedules or dispatches work and keeps no state
//! beyond the in-memory session; the delimited [`report::export`] stream
//! is a serialization of already-computed facts. Profiles are plain
//! single-threaded values: presentation sorting reorders the stored
//! collections in place, so share one across threads only behind your
//! own synchronization.

#![deny(missing_docs)]
#![warn(rust_2018_idioms)]

mod error;
mod profile;
mod source;

pub mod report;

pub use error::{Error, InfoUnavailable, Result};
pub use profile::{
    AggSort, Aggregate, EventInfo, EventInstant, InfoSort, InstantKind, InstantSort, Overlap,
    OverlapSort, Profile, SortOrder,
};
pub use source::{EventSource, OpRecord, OpTimes, VecSource};
