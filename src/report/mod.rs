//! Human-readable summaries and delimited exports of calculated
//! profiles.
//!
//! Everything in this module is a pure function of already-computed
//! [`Profile`] state: it formats, it never recomputes. The `&mut`
//! borrows exist only because presentation sorting reorders the stored
//! collections in place.

mod export;

pub use export::{
    export, export_default, export_defaults, set_export_defaults, ExportOptions,
};

use std::io::{self, Write};

use crate::error::Result;
use crate::profile::{AggSort, OverlapSort, Profile, SortOrder};

/// Writes a multi-section plain-text summary of a calculated profile.
///
/// Sections, in order: elapsed wall time (only if the session stopwatch
/// ran), the grand total of event time, a table of aggregate statistics
/// sorted by `agg_sort`, and either a table of pairwise overlaps sorted
/// by `overlap_sort` preceded by the overlap-discounted effective total,
/// or an explicit "no overlapping events" line.
///
/// Fails with [`Error::NotCalculated`](crate::Error::NotCalculated)
/// before [`Profile::calc`], and with
/// [`Error::StreamWrite`](crate::Error::StreamWrite) on I/O failure.
pub fn write_summary<W>(
    prof: &mut Profile,
    agg_sort: (AggSort, SortOrder),
    overlap_sort: (OverlapSort, SortOrder),
    mut writer: W,
) -> Result<()>
where
    W: Write,
{
    let total = prof.total_time()?;
    let effective = prof.effective_time()?;

    writeln!(writer)?;
    if let Some(elapsed) = prof.elapsed() {
        writeln!(
            writer,
            " Total elapsed time        : {:e} s",
            elapsed.as_secs_f64()
        )?;
    }
    writeln!(writer, " Total of all events       : {:e} s", ns(total))?;

    writeln!(writer, " Aggregate times by event  :")?;
    rule(&mut writer)?;
    writeln!(
        writer,
        "   | Event name                     | Rel. time (%) | Abs. time (s) |"
    )?;
    rule(&mut writer)?;
    for agg in prof.aggregates(agg_sort.0, agg_sort.1)? {
        writeln!(
            writer,
            "   | {:<30.30} | {:>13.4} | {:>13.4e} |",
            agg.event_name(),
            agg.relative_time() * 100.0,
            ns(agg.absolute_time())
        )?;
    }
    rule(&mut writer)?;

    let overlaps = prof.overlaps(overlap_sort.0, overlap_sort.1)?;
    if overlaps.is_empty() {
        writeln!(writer, " Event overlaps            : no overlapping events")?;
    } else {
        writeln!(
            writer,
            " Tot. of all events (eff.) : {:e} s",
            ns(effective)
        )?;
        writeln!(writer, " Event overlap times       :")?;
        rule(&mut writer)?;
        writeln!(
            writer,
            "   | Event 1                | Event 2                | Overlap (s)   |"
        )?;
        rule(&mut writer)?;
        for ovlp in overlaps {
            writeln!(
                writer,
                "   | {:<22.22} | {:<22.22} | {:>13.4e} |",
                ovlp.event1_name(),
                ovlp.event2_name(),
                ns(ovlp.duration())
            )?;
        }
        rule(&mut writer)?;
    }

    Ok(())
}

/// Convenience wrapper around [`write_summary`] returning the summary as
/// a `String`.
pub fn summary(
    prof: &mut Profile,
    agg_sort: (AggSort, SortOrder),
    overlap_sort: (OverlapSort, SortOrder),
) -> Result<String> {
    let mut buf = Vec::new();
    write_summary(prof, agg_sort, overlap_sort, &mut buf)?;
    Ok(String::from_utf8(buf).expect("summary is written as UTF-8"))
}

fn rule<W: Write>(writer: &mut W) -> io::Result<()> {
    writeln!(
        writer,
        "   ------------------------------------------------------------------"
    )
}

fn ns(nanos: u64) -> f64 {
    nanos as f64 * 1e-9
}
