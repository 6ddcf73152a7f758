//! Two-input merge-dedup: persisted partition timestamps against an O3
//! index.
//!
//! The persisted side arrives as a packed `u64` timestamp array (the row
//! index is the array position); the O3 side as `{timestamp, row id}`
//! entries. Both sides are windowed by half-open ranges over the full
//! buffers so that identifiers synthesized for persisted rows are absolute
//! positions. Every synthesized identifier carries the bit-63 origin tag;
//! O3 index entries pass through untouched.
//!
//! On an equal timestamp the merge enters a conflict band: the maximal run
//! of O3 entries at that timestamp. Without keys, each persisted row in the
//! band is replaced by the last O3 entry of the band. With keys, each
//! persisted row probes the band for a key match (the O3 entry wins when
//! one exists) and band entries with no persisted counterpart survive as
//! new rows, in band order.

use std::cmp::Ordering;
use std::ops::Range;

use bitvec::vec::BitVec;
use tempo_types::IndexEntry;

use crate::compare::{KeyColumn, cmp_keys_merge, with_typed_column};
use crate::probe::branch_free_search;

/// Merges a packed timestamp window with an O3 index window into `dest`,
/// deduplicating on timestamp alone. Returns the number of entries written.
///
/// `dest` must not alias either input and must hold at least
/// `src_range.len() + index_range.len()` entries. Inputs must be
/// timestamp-sorted.
pub fn merge_dedup_timestamp_index(
    src: &[u64],
    src_range: Range<usize>,
    index: &[IndexEntry],
    index_range: Range<usize>,
    dest: &mut [IndexEntry],
) -> usize {
    debug_assert!(src_range.end <= src.len());
    debug_assert!(index_range.end <= index.len());

    let mut src_pos = src_range.start;
    let mut index_pos = index_range.start;
    let mut out = 0usize;

    while src_pos < src_range.end && index_pos < index_range.end {
        if src[src_pos] < index[index_pos].ts {
            dest[out] = IndexEntry::tagged(src[src_pos], src_pos as u64);
            out += 1;
            src_pos += 1;
        } else if src[src_pos] > index[index_pos].ts {
            dest[out] = index[index_pos];
            out += 1;
            index_pos += 1;
        } else {
            let conflict_ts = src[src_pos];
            while index_pos < index_range.end && index[index_pos].ts == conflict_ts {
                index_pos += 1;
            }
            // Replace every persisted row at this timestamp with the last
            // version from the O3 index.
            while src_pos < src_range.end && src[src_pos] == conflict_ts {
                dest[out] = index[index_pos - 1];
                out += 1;
                src_pos += 1;
            }
        }
    }

    out + drain(src, src_pos, src_range.end, index, index_pos, index_range.end, &mut dest[out..])
}

/// Key-aware variant of [`merge_dedup_timestamp_index`].
///
/// Within a conflict band each persisted row keeps its own identity unless
/// an O3 entry matches it on every key column. An empty `keys` slice
/// degrades to the no-key merge.
pub fn merge_dedup_timestamp_index_with_keys(
    src: &[u64],
    src_range: Range<usize>,
    index: &[IndexEntry],
    index_range: Range<usize>,
    dest: &mut [IndexEntry],
    keys: &[KeyColumn<'_>],
) -> usize {
    match keys {
        [] => merge_dedup_timestamp_index(src, src_range, index, index_range, dest),
        [key] => with_typed_column!(key, col => {
            merge_dedup_keyed(src, src_range, index, index_range, dest, &|l, r| {
                col.cmp_merge(l, r)
            })
        }),
        _ => merge_dedup_keyed(src, src_range, index, index_range, dest, &|l, r| {
            cmp_keys_merge(keys, l, r)
        }),
    }
}

fn merge_dedup_keyed<C>(
    src: &[u64],
    src_range: Range<usize>,
    index: &[IndexEntry],
    index_range: Range<usize>,
    dest: &mut [IndexEntry],
    cmp: &C,
) -> usize
where
    C: Fn(u64, u64) -> Ordering,
{
    debug_assert!(src_range.end <= src.len());
    debug_assert!(index_range.end <= index.len());

    let mut src_pos = src_range.start;
    let mut index_pos = index_range.start;
    let mut out = 0usize;

    // Reused across bands; resized to the band length on entry.
    let mut used: BitVec = BitVec::new();

    while src_pos < src_range.end && index_pos < index_range.end {
        if src[src_pos] < index[index_pos].ts {
            dest[out] = IndexEntry::tagged(src[src_pos], src_pos as u64);
            out += 1;
            src_pos += 1;
        } else if src[src_pos] > index[index_pos].ts {
            dest[out] = index[index_pos];
            out += 1;
            index_pos += 1;
        } else {
            let conflict_ts = src[src_pos];
            let conflict_start = index_pos;
            while index_pos < index_range.end && index[index_pos].ts == conflict_ts {
                index_pos += 1;
            }
            let band = &index[conflict_start..index_pos];

            used.clear();
            used.resize(band.len(), false);

            while src_pos < src_range.end && src[src_pos] == conflict_ts {
                match branch_free_search(src_pos as u64, band, cmp) {
                    Some(matched) => {
                        used.set(matched, true);
                        dest[out] = band[matched];
                    }
                    None => {
                        dest[out] = IndexEntry::tagged(conflict_ts, src_pos as u64);
                    }
                }
                out += 1;
                src_pos += 1;
            }

            // Band entries with no persisted counterpart survive as new
            // rows, in band order.
            for (band_pos, entry) in band.iter().enumerate() {
                if !used[band_pos] {
                    dest[out] = *entry;
                    out += 1;
                }
            }
        }
    }

    out + drain(src, src_pos, src_range.end, index, index_pos, index_range.end, &mut dest[out..])
}

/// Copies whichever side is not exhausted, tagging synthesized persisted
/// identifiers exactly as the merge body does.
fn drain(
    src: &[u64],
    mut src_pos: usize,
    src_end: usize,
    index: &[IndexEntry],
    index_pos: usize,
    index_end: usize,
    dest: &mut [IndexEntry],
) -> usize {
    let mut out = 0usize;
    if index_pos < index_end {
        let rest = index_end - index_pos;
        dest[..rest].copy_from_slice(&index[index_pos..index_end]);
        out += rest;
    } else {
        while src_pos < src_end {
            dest[out] = IndexEntry::tagged(src[src_pos], src_pos as u64);
            out += 1;
            src_pos += 1;
        }
    }
    out
}
