mod agg;
mod intern;
mod overlap;

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant as WallInstant};

use ahash::RandomState;
use indexmap::IndexMap;
use log::{debug, warn};

use crate::error::{Error, Result};
use crate::source::{EventSource, OpRecord, OpTimes};

use self::intern::NameTable;

/// Whether an [`EventInstant`] marks the start or the end of an
/// operation's execution interval.
///
/// The derived order (`Start` before `End`) is load-bearing: it is the
/// tie-break that keeps a start instant ahead of its matching end when
/// instants are sorted by sequence id, and ahead of coincident ends when
/// sorted by timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InstantKind {
    /// The operation started executing at this instant.
    Start,
    /// The operation finished executing at this instant.
    End,
}

/// A single start or end instant of a recorded operation.
///
/// Two instants are created per operation, sharing the operation's
/// sequence id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventInstant {
    event_name: Arc<str>,
    queue_name: Arc<str>,
    name_id: u32,
    id: u32,
    instant: u64,
    kind: InstantKind,
}

impl EventInstant {
    /// Name of the operation this instant belongs to.
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Name of the queue the operation was recorded on.
    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Sequence id pairing this instant with its counterpart.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// The instant value in nanoseconds.
    pub fn instant(&self) -> u64 {
        self.instant
    }

    /// Whether this is a start or an end instant.
    pub fn kind(&self) -> InstantKind {
        self.kind
    }
}

/// Full profiling information for one recorded operation, including the
/// queue-side timestamps that do not take part in aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventInfo {
    event_name: Arc<str>,
    queue_name: Arc<str>,
    times: OpTimes,
}

impl EventInfo {
    /// Operation name.
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Queue the operation was recorded on.
    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// All four profiling timestamps.
    pub fn times(&self) -> OpTimes {
        self.times
    }
}

/// Aggregate timing statistics for all operations sharing a name.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    event_name: Arc<str>,
    absolute_time: u64,
    relative_time: f64,
}

impl Aggregate {
    /// Operation name.
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Total nanoseconds spent in operations with this name.
    pub fn absolute_time(&self) -> u64 {
        self.absolute_time
    }

    /// Fraction of the grand total event time spent in operations with
    /// this name, or 0 if no time was recorded at all.
    pub fn relative_time(&self) -> f64 {
        self.relative_time
    }
}

/// Total time during which two named operation types executed
/// concurrently.
///
/// One entry exists per unordered name pair with a nonzero overlap; the
/// pair is stored with `event1_name() <= event2_name()` in interned-id
/// order (first-seen order). The two names may be equal: two concurrent
/// instances of the same operation type are reported as that name
/// overlapping itself, which deliberately conflates "inherently
/// self-concurrent" with cross-type overlap, as the numbers are computed
/// the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlap {
    event1_name: Arc<str>,
    event2_name: Arc<str>,
    duration: u64,
}

impl Overlap {
    /// First operation name of the pair.
    pub fn event1_name(&self) -> &str {
        &self.event1_name
    }

    /// Second operation name of the pair.
    pub fn event2_name(&self) -> &str {
        &self.event2_name
    }

    /// Total overlapping nanoseconds between the two names.
    pub fn duration(&self) -> u64 {
        self.duration
    }
}

/// Ascending or descending presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

impl SortOrder {
    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortOrder::Ascending => ord,
            SortOrder::Descending => ord.reverse(),
        }
    }
}

/// Sort criterion for [`Profile::aggregates`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggSort {
    /// By operation name.
    Name,
    /// By absolute time.
    Time,
}

/// Sort criterion for [`Profile::overlaps`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapSort {
    /// By the pair of operation names.
    Name,
    /// By overlap duration.
    Duration,
}

/// Sort criterion for [`Profile::infos`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoSort {
    /// By operation name.
    EventName,
    /// By queue name.
    QueueName,
    /// By the queued timestamp.
    Queued,
    /// By the submitted timestamp.
    Submitted,
    /// By the execution start timestamp.
    Started,
    /// By the execution end timestamp.
    Ended,
}

/// Sort criterion for [`Profile::instants`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstantSort {
    /// By instant value.
    Instant,
    /// By sequence id, starts before ends.
    Id,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Calculated,
    Failed,
}

#[derive(Debug)]
struct Stopwatch {
    begun: WallInstant,
    stopped: Option<Duration>,
}

/// A profiling session over the events recorded on one or more command
/// queues.
///
/// A profile is created empty, has queues attached to it, and is then
/// calculated exactly once; afterwards the aggregate statistics, overlap
/// matrix and raw event data can be queried and exported any number of
/// times:
///
/// ```
/// use std::sync::Arc;
/// use qprof::{AggSort, OpRecord, OpTimes, Profile, SortOrder, VecSource};
///
/// let queue = VecSource::from(vec![
///     OpRecord::new("write", OpTimes::span(0, 10)),
///     OpRecord::new("kernel", OpTimes::span(8, 30)),
/// ]);
///
/// let mut prof = Profile::new();
/// prof.add_queue("Q0", Arc::new(queue))?;
/// prof.calc()?;
///
/// for agg in prof.aggregates(AggSort::Time, SortOrder::Descending)? {
///     println!("{}: {} ns", agg.event_name(), agg.absolute_time());
/// }
/// assert_eq!(prof.overlap_time()?, 2);
/// # Ok::<(), qprof::Error>(())
/// ```
///
/// Instances are not thread-safe: the presentation-sorting queries take
/// `&mut self` because they reorder the stored collections in place.
#[derive(Debug)]
pub struct Profile {
    state: State,
    queues: IndexMap<Arc<str>, Arc<dyn EventSource>, RandomState>,
    names: NameTable,
    num_events: u32,
    instants: Vec<EventInstant>,
    infos: Vec<EventInfo>,
    aggs: Vec<Aggregate>,
    overlaps: Vec<Overlap>,
    total_time: u64,
    total_overlap: u64,
    effective_time: u64,
    earliest_start: u64,
    timer: Option<Stopwatch>,
}

impl Default for Profile {
    fn default() -> Self {
        Profile::new()
    }
}

impl Profile {
    /// Creates an empty profiling session.
    pub fn new() -> Self {
        Profile {
            state: State::Open,
            queues: IndexMap::default(),
            names: NameTable::default(),
            num_events: 0,
            instants: Vec::new(),
            infos: Vec::new(),
            aggs: Vec::new(),
            overlaps: Vec::new(),
            total_time: 0,
            total_overlap: 0,
            effective_time: 0,
            earliest_start: u64::MAX,
            timer: None,
        }
    }

    /// Attaches a named queue whose recorded operations will be profiled.
    ///
    /// The session shares ownership of the source with the caller; either
    /// side may drop its handle first. Attaching a second source under an
    /// already-used name replaces the previous one.
    ///
    /// Fails with [`Error::AlreadyCalculated`] once [`Profile::calc`] has
    /// run.
    pub fn add_queue(
        &mut self,
        name: impl AsRef<str>,
        source: Arc<dyn EventSource>,
    ) -> Result<()> {
        self.ensure_open()?;
        self.queues.insert(Arc::from(name.as_ref()), source);
        Ok(())
    }

    /// Starts the optional wall-clock stopwatch.
    ///
    /// The stopwatch is independent of device timestamps; it measures
    /// host-side elapsed time for the session and shows up in the summary
    /// report. Only valid before [`Profile::calc`].
    pub fn start(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.timer = Some(Stopwatch {
            begun: WallInstant::now(),
            stopped: None,
        });
        Ok(())
    }

    /// Stops the wall-clock stopwatch. A no-op if it never started.
    pub fn stop(&mut self) -> Result<()> {
        self.ensure_open()?;
        if let Some(timer) = &mut self.timer {
            timer.stopped = Some(timer.begun.elapsed());
        }
        Ok(())
    }

    /// Wall-clock time measured by the stopwatch, if it ran.
    ///
    /// Returns the time between [`Profile::start`] and [`Profile::stop`],
    /// or the time since [`Profile::start`] if the stopwatch is still
    /// running.
    pub fn elapsed(&self) -> Option<Duration> {
        self.timer
            .as_ref()
            .map(|t| t.stopped.unwrap_or_else(|| t.begun.elapsed()))
    }

    /// Ingests all attached queues and computes aggregate statistics and
    /// the overlap matrix.
    ///
    /// Must be called exactly once. If any source fails to produce a
    /// record, the whole calculation is aborted, no partial results are
    /// kept, and the session transitions to a failed state from which
    /// only rebuilding a fresh [`Profile`] recovers.
    pub fn calc(&mut self) -> Result<()> {
        self.ensure_open()?;
        if let Err(e) = self.process_queues() {
            self.state = State::Failed;
            self.instants.clear();
            self.infos.clear();
            return Err(e);
        }

        let (aggs, total_time) = agg::aggregate(&mut self.instants, &self.names);
        self.aggs = aggs;
        self.total_time = total_time;

        let (overlaps, total_overlap) = overlap::overlaps(&mut self.instants, &self.names);
        self.overlaps = overlaps;
        self.total_overlap = total_overlap;
        // With three or more operations open at once the pairwise overlap
        // sum can exceed the grand total, so saturate instead of wrapping.
        self.effective_time = total_time.saturating_sub(total_overlap);

        self.state = State::Calculated;
        debug!(
            "calculated profile: {} events, {} names, {} overlapping pairs",
            self.num_events,
            self.names.len(),
            self.overlaps.len()
        );
        Ok(())
    }

    /// Aggregate statistics for one operation name, or `None` if the name
    /// was never seen.
    pub fn aggregate(&self, name: &str) -> Result<Option<&Aggregate>> {
        self.ensure_calculated()?;
        // A linear scan, not an id-indexed lookup: presentation sorting
        // reorders `aggs` in place.
        Ok(self.aggs.iter().find(|a| &*a.event_name == name))
    }

    /// All aggregate statistics, sorted as requested.
    ///
    /// Sorting reorders the stored collection in place; it never
    /// recomputes any value, and repeated calls with the same criterion
    /// yield the same sequence.
    pub fn aggregates(&mut self, sort: AggSort, order: SortOrder) -> Result<&[Aggregate]> {
        self.ensure_calculated()?;
        self.aggs.sort_unstable_by(|a, b| {
            let ord = match sort {
                AggSort::Name => a.event_name.cmp(&b.event_name),
                AggSort::Time => a
                    .absolute_time
                    .cmp(&b.absolute_time)
                    .then_with(|| a.event_name.cmp(&b.event_name)),
            };
            order.apply(ord)
        });
        Ok(&self.aggs)
    }

    /// All nonzero pairwise overlaps, sorted as requested.
    pub fn overlaps(&mut self, sort: OverlapSort, order: SortOrder) -> Result<&[Overlap]> {
        self.ensure_calculated()?;
        self.overlaps.sort_unstable_by(|a, b| {
            let by_name = |x: &Overlap, y: &Overlap| {
                x.event1_name
                    .cmp(&y.event1_name)
                    .then_with(|| x.event2_name.cmp(&y.event2_name))
            };
            let ord = match sort {
                OverlapSort::Name => by_name(a, b),
                OverlapSort::Duration => a.duration.cmp(&b.duration).then_with(|| by_name(a, b)),
            };
            order.apply(ord)
        });
        Ok(&self.overlaps)
    }

    /// Full per-event profiling information, sorted as requested.
    pub fn infos(&mut self, sort: InfoSort, order: SortOrder) -> Result<&[EventInfo]> {
        self.ensure_calculated()?;
        self.infos.sort_by(|a, b| {
            let ord = match sort {
                InfoSort::EventName => a.event_name.cmp(&b.event_name),
                InfoSort::QueueName => a.queue_name.cmp(&b.queue_name),
                InfoSort::Queued => a.times.queued.cmp(&b.times.queued),
                InfoSort::Submitted => a.times.submitted.cmp(&b.times.submitted),
                InfoSort::Started => a.times.started.cmp(&b.times.started),
                InfoSort::Ended => a.times.ended.cmp(&b.times.ended),
            };
            order.apply(ord)
        });
        Ok(&self.infos)
    }

    /// Raw start/end instants, sorted as requested.
    pub fn instants(&mut self, sort: InstantSort, order: SortOrder) -> Result<&[EventInstant]> {
        self.ensure_calculated()?;
        self.instants.sort_unstable_by(|a, b| {
            let ord = match sort {
                InstantSort::Instant => a
                    .instant
                    .cmp(&b.instant)
                    .then_with(|| a.kind.cmp(&b.kind))
                    .then_with(|| a.id.cmp(&b.id)),
                InstantSort::Id => a.id.cmp(&b.id).then_with(|| a.kind.cmp(&b.kind)),
            };
            order.apply(ord)
        });
        Ok(&self.instants)
    }

    /// Grand total of all recorded execution time, in nanoseconds.
    pub fn total_time(&self) -> Result<u64> {
        self.ensure_calculated()?;
        Ok(self.total_time)
    }

    /// Total time during which any two operations overlapped, in
    /// nanoseconds.
    pub fn overlap_time(&self) -> Result<u64> {
        self.ensure_calculated()?;
        Ok(self.total_overlap)
    }

    /// Total recorded time discounting overlaps, in nanoseconds.
    pub fn effective_time(&self) -> Result<u64> {
        self.ensure_calculated()?;
        Ok(self.effective_time)
    }

    /// The earliest execution start instant across all recorded
    /// operations, or 0 if nothing was recorded.
    ///
    /// This is the zero point used by the export's `zero_start` option;
    /// it plays no role in aggregation or overlap math.
    pub fn earliest_start(&self) -> Result<u64> {
        self.ensure_calculated()?;
        Ok(if self.earliest_start == u64::MAX {
            0
        } else {
            self.earliest_start
        })
    }

    /// Number of operations recorded across all queues.
    pub fn event_count(&self) -> u32 {
        self.num_events
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            State::Open => Ok(()),
            State::Calculated => Err(Error::AlreadyCalculated),
            State::Failed => Err(Error::Failed),
        }
    }

    fn ensure_calculated(&self) -> Result<()> {
        match self.state {
            State::Calculated => Ok(()),
            State::Open => Err(Error::NotCalculated),
            State::Failed => Err(Error::Failed),
        }
    }

    fn process_queues(&mut self) -> Result<()> {
        // Queues are visited in attachment order, so sequence ids are
        // deterministic for a given attachment sequence. Cloning the Arcs
        // sidesteps borrowing the queue table while events are appended.
        let queues: Vec<(Arc<str>, Arc<dyn EventSource>)> = self
            .queues
            .iter()
            .map(|(name, source)| (Arc::clone(name), Arc::clone(source)))
            .collect();

        for (queue_name, source) in queues {
            let mut count = 0u32;
            for record in source.records() {
                let record = record.map_err(|source| Error::ProfilingInfo {
                    queue: queue_name.to_string(),
                    source,
                })?;
                self.add_event(&queue_name, record);
                count += 1;
            }
            debug!("queue `{}`: ingested {} events", queue_name, count);
        }
        Ok(())
    }

    fn add_event(&mut self, queue_name: &Arc<str>, record: OpRecord) {
        let (name_id, event_name) = self.names.intern(&record.name);

        // Sequence ids are global across queues and start at 1.
        self.num_events += 1;
        let id = self.num_events;

        let times = record.times;
        if times.ended >= times.started {
            self.instants.push(EventInstant {
                event_name: Arc::clone(&event_name),
                queue_name: Arc::clone(queue_name),
                name_id,
                id,
                instant: times.started,
                kind: InstantKind::Start,
            });
            self.instants.push(EventInstant {
                event_name: Arc::clone(&event_name),
                queue_name: Arc::clone(queue_name),
                name_id,
                id,
                instant: times.ended,
                kind: InstantKind::End,
            });
            if times.started < self.earliest_start {
                self.earliest_start = times.started;
            }
        } else {
            // The device clock produced an end instant before the start
            // instant, typically because the operation never actually used
            // device time. Keep its info record but leave it out of the
            // interval math.
            warn!(
                "event `{}` reports end before start ({} < {}); excluded from timing",
                record.name, times.ended, times.started
            );
        }

        self.infos.push(EventInfo {
            event_name,
            queue_name: Arc::clone(queue_name),
            times,
        });
    }
}
