use std::sync::Arc;

use ahash::AHashMap;

use super::intern::NameTable;
use super::{EventInstant, InstantKind, Overlap};

/// Computes the pairwise overlap matrix with a sweep over the instants
/// sorted by timestamp.
///
/// The sweep keeps the set of currently-open operations and, for every
/// pair of simultaneously-open sequence ids, the instant at which the
/// pair became simultaneously open (the start of the later member). When
/// the earlier-ending member of a pair ends, the elapsed overlap is
/// attributed to the cell `[min(name a, name b)][max(name a, name b)]`,
/// so only the upper triangle (diagonal included) of the matrix is ever
/// populated. Self-pairs (two instances of the same name) land on the
/// diagonal.
///
/// Instants sharing a timestamp are processed starts first, then ends,
/// then by sequence id. An end/start pair of touching intervals thus
/// opens an overlap and immediately closes it with 0 ns, which the
/// sparse result drops (the same numbers as treating touching intervals
/// as non-overlapping), while a zero-duration operation still has its
/// start processed before its own end, keeping the open set consistent.
///
/// Returns the sparse list of nonzero overlaps (in name-id order) and
/// the total overlap across the session.
pub(super) fn overlaps(
    instants: &mut [EventInstant],
    names: &NameTable,
) -> (Vec<Overlap>, u64) {
    instants.sort_unstable_by(|a, b| {
        a.instant
            .cmp(&b.instant)
            .then_with(|| a.kind.cmp(&b.kind))
            .then_with(|| a.id.cmp(&b.id))
    });

    let num_names = names.len();
    let mut matrix = vec![0u64; num_names * num_names];
    let mut total_overlap = 0u64;

    // Currently-open operations: sequence id -> name id.
    let mut occurring: AHashMap<u32, u32> = AHashMap::new();
    // Pair of open sequence ids (smaller first) -> instant at which the
    // pair became simultaneously open.
    let mut pending: AHashMap<(u32, u32), u64> = AHashMap::new();

    for inst in instants.iter() {
        match inst.kind {
            InstantKind::Start => {
                for &open_id in occurring.keys() {
                    pending.insert(pair_key(inst.id, open_id), inst.instant);
                }
                occurring.insert(inst.id, inst.name_id);
            }
            InstantKind::End => {
                occurring.remove(&inst.id);
                for (&open_id, &open_name) in occurring.iter() {
                    let opened = pending
                        .remove(&pair_key(inst.id, open_id))
                        .expect("pair was recorded when its later member started");
                    let overlap = inst.instant - opened;
                    let (lo, hi) = if inst.name_id <= open_name {
                        (inst.name_id, open_name)
                    } else {
                        (open_name, inst.name_id)
                    };
                    matrix[lo as usize * num_names + hi as usize] += overlap;
                    total_overlap += overlap;
                }
            }
        }
    }

    let mut result = Vec::new();
    for i in 0..num_names {
        for j in i..num_names {
            let duration = matrix[i * num_names + j];
            if duration > 0 {
                result.push(Overlap {
                    event1_name: Arc::clone(names.name(i as u32)),
                    event2_name: Arc::clone(names.name(j as u32)),
                    duration,
                });
            }
        }
    }

    (result, total_overlap)
}

fn pair_key(a: u32, b: u32) -> (u32, u32) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn instants(ops: &[(&str, u32, u64, u64)]) -> (Vec<EventInstant>, NameTable) {
        let mut names = NameTable::default();
        let queue: Arc<str> = Arc::from("q");
        let mut out = Vec::new();
        for &(name, id, start, end) in ops {
            let (name_id, event_name) = names.intern(name);
            for (instant, kind) in [(start, InstantKind::Start), (end, InstantKind::End)] {
                out.push(EventInstant {
                    event_name: Arc::clone(&event_name),
                    queue_name: Arc::clone(&queue),
                    name_id,
                    id,
                    instant,
                    kind,
                });
            }
        }
        (out, names)
    }

    fn pairs(overlaps: &[Overlap]) -> Vec<(&str, &str, u64)> {
        overlaps
            .iter()
            .map(|o| (o.event1_name(), o.event2_name(), o.duration()))
            .collect()
    }

    #[test]
    fn disjoint_intervals_do_not_overlap() {
        let (mut insts, names) = instants(&[("a", 1, 0, 5), ("b", 2, 6, 9)]);
        let (result, total) = overlaps(&mut insts, &names);
        assert!(result.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn touching_intervals_do_not_overlap() {
        // a ends at the very instant b starts.
        let (mut insts, names) = instants(&[("a", 1, 0, 5), ("b", 2, 5, 9)]);
        let (result, total) = overlaps(&mut insts, &names);
        assert!(result.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn containment_counts_the_inner_interval() {
        let (mut insts, names) = instants(&[("a", 1, 0, 20), ("b", 2, 5, 9)]);
        let (result, total) = overlaps(&mut insts, &names);
        assert_eq!(pairs(&result), vec![("a", "b", 4)]);
        assert_eq!(total, 4);
    }

    #[test]
    fn self_overlap_lands_on_the_diagonal() {
        let (mut insts, names) = instants(&[("a", 1, 0, 10), ("a", 2, 4, 8)]);
        let (result, total) = overlaps(&mut insts, &names);
        assert_eq!(pairs(&result), vec![("a", "a", 4)]);
        assert_eq!(total, 4);
    }

    #[test]
    fn attribution_is_symmetric_in_sequence_ids() {
        // Swapping which operation got the smaller sequence id must not
        // change the matrix.
        let (mut fwd, names_fwd) = instants(&[("a", 1, 0, 10), ("b", 2, 5, 15)]);
        let (mut rev, names_rev) = instants(&[("a", 2, 0, 10), ("b", 1, 5, 15)]);
        let (result_fwd, total_fwd) = overlaps(&mut fwd, &names_fwd);
        let (result_rev, total_rev) = overlaps(&mut rev, &names_rev);
        assert_eq!(pairs(&result_fwd), pairs(&result_rev));
        assert_eq!(total_fwd, total_rev);
        assert_eq!(total_fwd, 5);
    }

    #[test]
    fn three_way_overlap_counts_every_pair() {
        // Three intervals all open during [4, 6).
        let (mut insts, names) =
            instants(&[("a", 1, 0, 6), ("b", 2, 2, 8), ("c", 3, 4, 10)]);
        let (result, total) = overlaps(&mut insts, &names);
        assert_eq!(
            pairs(&result),
            vec![("a", "b", 4), ("a", "c", 2), ("b", "c", 4)]
        );
        assert_eq!(total, 10);
    }

    #[test]
    fn zero_duration_operation_keeps_the_sweep_consistent() {
        // The zero-duration operation opens and closes at 5, inside a;
        // it must not linger in the open set and break later pairs.
        let (mut insts, names) =
            instants(&[("a", 1, 0, 10), ("z", 2, 5, 5), ("b", 3, 7, 12)]);
        let (result, total) = overlaps(&mut insts, &names);
        assert_eq!(pairs(&result), vec![("a", "b", 3)]);
        assert_eq!(total, 3);
    }
}
