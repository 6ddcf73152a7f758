//! Single-stream dedup over a timestamp-sorted index.
//!
//! Given a sorted index, collapse every equal-timestamp group to one
//! survivor. Without key columns the last entry of each timestamp run wins.
//! With key columns the tie region is first totally ordered by
//! `(timestamp, key)` with a stable sort, then one survivor per
//! `(timestamp, key)` class is kept: again the last occurrence, so a newer
//! row in the batch overwrites an older one with the same key.

use std::cmp::Ordering;

use tempo_result::{Error, Result};
use tempo_types::IndexEntry;

use crate::compare::{KeyColumn, cmp_keys_tagged, with_typed_column};
use crate::sort::{SortedIn, merge_sort_in_place, merge_sort_range};

/// Result of a single-stream dedup call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DedupOutcome {
    /// No timestamp occurs twice; the output buffer was not written and the
    /// caller can skip the rewrite.
    NoDedupNeeded,
    /// The deduplicated stream was written with this many entries.
    Deduped(usize),
}

/// Dedups a sorted index stream into `index_out`.
///
/// With an empty `keys` slice every equal-timestamp run collapses to its
/// last entry and the outcome always carries the new count. With key
/// columns, rows are distinct per `(timestamp, key)` class and
/// [`DedupOutcome::NoDedupNeeded`] is reported when no timestamp repeats.
///
/// `index_out` and `index_tmp` must each hold at least `index_in.len()`
/// entries. Returns [`Error::Unsorted`] if a timestamp strictly decreases
/// anywhere in the input.
pub fn dedup_sorted_timestamp_index(
    index_in: &[IndexEntry],
    index_out: &mut [IndexEntry],
    index_tmp: &mut [IndexEntry],
    keys: &[KeyColumn<'_>],
) -> Result<DedupOutcome> {
    match keys {
        [] => dedup_last_per_timestamp(index_in, index_out).map(DedupOutcome::Deduped),
        [key] => with_typed_column!(key, col => {
            dedup_with_cmp(index_in, index_out, index_tmp, &|l, r| col.cmp_tagged(l, r))
        }),
        _ => dedup_with_cmp(index_in, index_out, index_tmp, &|l, r| {
            cmp_keys_tagged(keys, l, r)
        }),
    }
}

/// Like [`dedup_sorted_timestamp_index`], but rewrites `index` in place.
///
/// The prefix before the first duplicate is never touched and the tail move
/// is overlap-safe.
pub fn dedup_sorted_timestamp_index_in_place(
    index: &mut [IndexEntry],
    index_tmp: &mut [IndexEntry],
    keys: &[KeyColumn<'_>],
) -> Result<DedupOutcome> {
    match keys {
        [] => dedup_last_per_timestamp_in_place(index).map(DedupOutcome::Deduped),
        [key] => with_typed_column!(key, col => {
            dedup_with_cmp_in_place(index, index_tmp, &|l, r| col.cmp_tagged(l, r))
        }),
        _ => dedup_with_cmp_in_place(index, index_tmp, &|l, r| cmp_keys_tagged(keys, l, r)),
    }
}

/// Keeps the last entry of every equal-timestamp run. Unlike a standard
/// unique pass, which keeps the first, the newest row within the batch wins.
fn dedup_last_per_timestamp(index_in: &[IndexEntry], index_out: &mut [IndexEntry]) -> Result<usize> {
    let count = index_in.len();
    if count == 0 {
        return Ok(0);
    }
    let mut copy_to = 0;
    let mut last_timestamp = index_in[0].ts;
    for i in 1..count {
        if index_in[i].ts > last_timestamp {
            index_out[copy_to] = index_in[i - 1];
            copy_to += 1;
            last_timestamp = index_in[i].ts;
        } else if index_in[i].ts < last_timestamp {
            return Err(Error::Unsorted(format!("timestamp decreases at entry {i}")));
        }
    }
    index_out[copy_to] = index_in[count - 1];
    Ok(copy_to + 1)
}

/// In-place twin of [`dedup_last_per_timestamp`]. Safe because the write
/// cursor never passes the read cursor.
fn dedup_last_per_timestamp_in_place(index: &mut [IndexEntry]) -> Result<usize> {
    let count = index.len();
    if count == 0 {
        return Ok(0);
    }
    let mut copy_to = 0;
    let mut last_timestamp = index[0].ts;
    for i in 1..count {
        if index[i].ts > last_timestamp {
            last_timestamp = index[i].ts;
            index[copy_to] = index[i - 1];
            copy_to += 1;
        } else if index[i].ts < last_timestamp {
            return Err(Error::Unsorted(format!("timestamp decreases at entry {i}")));
        }
    }
    index[copy_to] = index[count - 1];
    Ok(copy_to + 1)
}

fn dedup_with_cmp<C>(
    index_in: &[IndexEntry],
    index_out: &mut [IndexEntry],
    index_tmp: &mut [IndexEntry],
    cmp: &C,
) -> Result<DedupOutcome>
where
    C: Fn(u64, u64) -> Ordering,
{
    let count = index_in.len();
    if count < 2 {
        return Ok(DedupOutcome::NoDedupNeeded);
    }
    let Some((dup_start, dup_end)) = find_duplicate_range(index_in)? else {
        return Ok(DedupOutcome::NoDedupNeeded);
    };

    let sorted = merge_sort_range(index_in, index_out, index_tmp, dup_start, dup_end, cmp);
    let mid_end = match sorted {
        SortedIn::Tmp => compact_tie_groups(index_tmp, index_out, dup_start, dup_end, cmp)?,
        SortedIn::Dest => compact_tie_groups_in_place(index_out, dup_start, dup_end, cmp)?,
    };

    index_out[..dup_start].copy_from_slice(&index_in[..dup_start]);
    let tail = count - dup_end;
    index_out[mid_end..mid_end + tail].copy_from_slice(&index_in[dup_end..count]);
    Ok(DedupOutcome::Deduped(mid_end + tail))
}

fn dedup_with_cmp_in_place<C>(
    index: &mut [IndexEntry],
    index_tmp: &mut [IndexEntry],
    cmp: &C,
) -> Result<DedupOutcome>
where
    C: Fn(u64, u64) -> Ordering,
{
    let count = index.len();
    if count < 2 {
        return Ok(DedupOutcome::NoDedupNeeded);
    }
    let Some((dup_start, dup_end)) = find_duplicate_range(index)? else {
        return Ok(DedupOutcome::NoDedupNeeded);
    };

    let sorted = merge_sort_in_place(index, index_tmp, dup_start, dup_end, cmp);
    let mid_end = match sorted {
        SortedIn::Tmp => compact_tie_groups(index_tmp, index, dup_start, dup_end, cmp)?,
        SortedIn::Dest => compact_tie_groups_in_place(index, dup_start, dup_end, cmp)?,
    };

    // Prefix is already in place; the tail may overlap its source.
    let tail = count - dup_end;
    index.copy_within(dup_end..count, mid_end);
    Ok(DedupOutcome::Deduped(mid_end + tail))
}

/// Finds the window `[dup_start, dup_end)` spanning every timestamp tie
/// group of length two or more, or `None` when the stream has no
/// duplicates.
fn find_duplicate_range(index: &[IndexEntry]) -> Result<Option<(usize, usize)>> {
    let count = index.len();
    let mut dup_start: Option<usize> = None;
    let mut dup_end = 0usize;
    let mut ts_index = 0usize;

    for i in 1..count {
        match index[i].ts.cmp(&index[ts_index].ts) {
            Ordering::Greater => {
                if i > ts_index + 1 {
                    dup_start.get_or_insert(ts_index);
                    dup_end = i;
                }
                ts_index = i;
            }
            Ordering::Less => {
                return Err(Error::Unsorted(format!("timestamp decreases at entry {i}")));
            }
            Ordering::Equal => {}
        }
    }
    if ts_index + 1 < count && index[ts_index].ts == index[count - 1].ts {
        // The stream ends on a tie group.
        dup_start.get_or_insert(ts_index);
        dup_end = count;
    }

    match dup_start {
        Some(start) if dup_end > start => {
            tracing::trace!(start, dup_end, count, "deduplicating timestamp tie range");
            Ok(Some((start, dup_end)))
        }
        _ => Ok(None),
    }
}

/// Emits the last entry of every `(timestamp, key)` class in the sorted
/// window `merged[dup_start..dup_end)` into `out` at the same offset.
/// Returns the index one past the last survivor.
fn compact_tie_groups<C>(
    merged: &[IndexEntry],
    out: &mut [IndexEntry],
    dup_start: usize,
    dup_end: usize,
    cmp: &C,
) -> Result<usize>
where
    C: Fn(u64, u64) -> Ordering,
{
    let mut copy_to = dup_start;
    let mut last = dup_start;
    for i in dup_start + 1..dup_end {
        if merged[i].ts > merged[last].ts || cmp(merged[last].row, merged[i].row) != Ordering::Equal
        {
            out[copy_to] = merged[i - 1];
            copy_to += 1;
            last = i;
        } else if merged[i].ts != merged[last].ts {
            debug_assert!(false, "tie-group sort produced unsorted timestamps");
            return Err(Error::Internal(
                "tie-group sort produced unsorted timestamps".into(),
            ));
        }
    }
    out[copy_to] = merged[dup_end - 1];
    Ok(copy_to + 1)
}

/// Twin of [`compact_tie_groups`] for the case where the sorted window and
/// the output share a buffer. The write cursor trails the read cursor, so
/// every read still sees the sorted data.
fn compact_tie_groups_in_place<C>(
    buf: &mut [IndexEntry],
    dup_start: usize,
    dup_end: usize,
    cmp: &C,
) -> Result<usize>
where
    C: Fn(u64, u64) -> Ordering,
{
    let mut copy_to = dup_start;
    let mut last = dup_start;
    for i in dup_start + 1..dup_end {
        if buf[i].ts > buf[last].ts || cmp(buf[last].row, buf[i].row) != Ordering::Equal {
            buf[copy_to] = buf[i - 1];
            copy_to += 1;
            last = i;
        } else if buf[i].ts != buf[last].ts {
            debug_assert!(false, "tie-group sort produced unsorted timestamps");
            return Err(Error::Internal(
                "tie-group sort produced unsorted timestamps".into(),
            ));
        }
    }
    buf[copy_to] = buf[dup_end - 1];
    Ok(copy_to + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: &[(u64, u64)]) -> Vec<IndexEntry> {
        pairs.iter().map(|&(ts, row)| IndexEntry::new(ts, row)).collect()
    }

    #[test]
    fn test_no_key_keeps_last_of_each_run() {
        let input = entries(&[(1, 0), (1, 1), (1, 2), (2, 3), (2, 4)]);
        let mut out = vec![IndexEntry::default(); input.len()];
        let written = dedup_last_per_timestamp(&input, &mut out).unwrap();
        assert_eq!(written, 2);
        assert_eq!(out[0], IndexEntry::new(1, 2));
        assert_eq!(out[1], IndexEntry::new(2, 4));
    }

    #[test]
    fn test_no_key_unsorted_is_error() {
        let input = entries(&[(2, 0), (1, 1)]);
        let mut out = vec![IndexEntry::default(); input.len()];
        assert!(matches!(
            dedup_last_per_timestamp(&input, &mut out),
            Err(Error::Unsorted(_))
        ));
    }

    #[test]
    fn test_duplicate_range_spans_first_to_last_group() {
        let index = entries(&[(1, 0), (2, 1), (2, 2), (3, 3), (4, 4), (4, 5), (5, 6)]);
        let range = find_duplicate_range(&index).unwrap();
        assert_eq!(range, Some((1, 6)));
    }

    #[test]
    fn test_duplicate_range_trailing_group() {
        let index = entries(&[(1, 0), (2, 1), (2, 2)]);
        assert_eq!(find_duplicate_range(&index).unwrap(), Some((1, 3)));
    }

    #[test]
    fn test_duplicate_range_none() {
        let index = entries(&[(1, 0), (2, 1), (5, 2)]);
        assert_eq!(find_duplicate_range(&index).unwrap(), None);
    }
}
