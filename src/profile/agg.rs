use std::sync::Arc;

use super::intern::NameTable;
use super::{Aggregate, EventInstant, InstantKind};

/// Computes per-name and grand-total execution times.
///
/// Sorts `instants` in place by `(sequence id, start before end)`. Each
/// sequence id contributes exactly one start/end pair, and the kind
/// tie-break puts the start first even when both instants carry the same
/// timestamp, so the sorted stream can be walked strictly pairwise.
///
/// Returns one [`Aggregate`] per interned name (in id order) and the
/// total nanoseconds across all recorded intervals. Relative times are
/// defined as 0 when the total is 0.
pub(super) fn aggregate(
    instants: &mut [EventInstant],
    names: &NameTable,
) -> (Vec<Aggregate>, u64) {
    instants.sort_unstable_by(|a, b| a.id.cmp(&b.id).then_with(|| a.kind.cmp(&b.kind)));

    let mut absolute = vec![0u64; names.len()];
    let mut total = 0u64;
    for pair in instants.chunks_exact(2) {
        let (start, end) = (&pair[0], &pair[1]);
        debug_assert_eq!(start.id, end.id);
        debug_assert_eq!(start.kind, InstantKind::Start);
        debug_assert_eq!(end.kind, InstantKind::End);

        let duration = end.instant - start.instant;
        absolute[start.name_id as usize] += duration;
        total += duration;
    }

    let aggs = absolute
        .into_iter()
        .enumerate()
        .map(|(name_id, absolute_time)| Aggregate {
            event_name: Arc::clone(names.name(name_id as u32)),
            absolute_time,
            relative_time: if total == 0 {
                0.0
            } else {
                absolute_time as f64 / total as f64
            },
        })
        .collect();

    (aggs, total)
}
