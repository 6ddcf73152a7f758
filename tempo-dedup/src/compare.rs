//! Dedup key columns and the row comparators built from them.
//!
//! Focus: fixed-width key compare with no dispatch in hot loops.
//! - One typed view per value width; single-column callers get a
//!   monomorphized comparator with no per-row width switch
//! - Multi-column callers loop the columns lexicographically and dispatch
//!   per column
//! - Rows below a column's materialization top read as the null sentinel

use std::cmp::Ordering;

use tempo_result::{Error, Result};
use tempo_types::{I256, is_tagged, untag};
use zerocopy::{FromBytes, Immutable, KnownLayout};

/// One column participating in the dedup key.
///
/// `column` slices are indexed by absolute persisted row id; elements below
/// `column_top` are never read. `o3` slices are dense from row 0 of the O3
/// batch.
#[derive(Clone, Copy, Debug)]
pub struct KeyColumn<'a> {
    /// Row index at which the column was first materialized; persisted rows
    /// strictly below it compare as the null sentinel.
    pub column_top: u64,
    pub values: KeyValues<'a>,
}

/// Width-typed key column data: persisted values, O3 values, null sentinel.
#[derive(Clone, Copy, Debug)]
pub enum KeyValues<'a> {
    I8 {
        column: &'a [i8],
        o3: &'a [i8],
        null: i8,
    },
    I16 {
        column: &'a [i16],
        o3: &'a [i16],
        null: i16,
    },
    I32 {
        column: &'a [i32],
        o3: &'a [i32],
        null: i32,
    },
    I64 {
        column: &'a [i64],
        o3: &'a [i64],
        null: i64,
    },
    I128 {
        column: &'a [i128],
        o3: &'a [i128],
        null: i128,
    },
    I256 {
        column: &'a [I256],
        o3: &'a [I256],
        null: I256,
    },
}

impl<'a> KeyColumn<'a> {
    /// Builds a typed key column from the raw descriptor fields the commit
    /// pipeline hands over: a value width, little-endian data buffers and a
    /// 32-byte null sentinel buffer (low bytes hold the value).
    ///
    /// Widths outside {1, 2, 4, 8, 16, 32} are rejected with
    /// [`Error::UnsupportedKeyWidth`]; buffers whose length or alignment do
    /// not match the width are rejected with
    /// [`Error::InvalidArgumentError`].
    pub fn from_raw_parts(
        value_size_bytes: usize,
        column_top: u64,
        column_data: &'a [u8],
        o3_data: &'a [u8],
        null_value: &[u8; 32],
    ) -> Result<Self> {
        let values = match value_size_bytes {
            1 => KeyValues::I8 {
                column: cast_values(column_data)?,
                o3: cast_values(o3_data)?,
                null: i8::from_le_bytes(null_prefix::<1>(null_value)),
            },
            2 => KeyValues::I16 {
                column: cast_values(column_data)?,
                o3: cast_values(o3_data)?,
                null: i16::from_le_bytes(null_prefix::<2>(null_value)),
            },
            4 => KeyValues::I32 {
                column: cast_values(column_data)?,
                o3: cast_values(o3_data)?,
                null: i32::from_le_bytes(null_prefix::<4>(null_value)),
            },
            8 => KeyValues::I64 {
                column: cast_values(column_data)?,
                o3: cast_values(o3_data)?,
                null: i64::from_le_bytes(null_prefix::<8>(null_value)),
            },
            16 => KeyValues::I128 {
                column: cast_values(column_data)?,
                o3: cast_values(o3_data)?,
                null: i128::from_le_bytes(null_prefix::<16>(null_value)),
            },
            32 => KeyValues::I256 {
                column: cast_values(column_data)?,
                o3: cast_values(o3_data)?,
                null: I256::from_le_bytes(*null_value),
            },
            width => return Err(Error::UnsupportedKeyWidth(width)),
        };
        Ok(Self { column_top, values })
    }
}

fn cast_values<T>(bytes: &[u8]) -> Result<&[T]>
where
    T: FromBytes + Immutable + KnownLayout,
{
    <[T]>::ref_from_bytes(bytes).map_err(|_| {
        Error::InvalidArgumentError(
            "key column buffer length or alignment does not match its value width".into(),
        )
    })
}

#[inline]
fn null_prefix<const N: usize>(null_value: &[u8; 32]) -> [u8; N] {
    let mut bytes = [0u8; N];
    bytes.copy_from_slice(&null_value[..N]);
    bytes
}

/// Monomorphized view of one key column at a concrete value width.
#[derive(Clone, Copy)]
pub(crate) struct TypedKeyColumn<'a, T> {
    pub(crate) column: &'a [T],
    pub(crate) o3: &'a [T],
    pub(crate) column_top: u64,
    pub(crate) null: T,
}

impl<'a, T: Copy + Ord> TypedKeyColumn<'a, T> {
    #[inline]
    fn column_value(&self, row: u64) -> T {
        if row >= self.column_top {
            self.column[row as usize]
        } else {
            self.null
        }
    }

    /// Merge-side compare: left operand is a persisted stream position,
    /// right operand an O3 row from the index being merged in.
    ///
    /// Either value can be the type's MIN (a legal null sentinel), so the
    /// compare is ordered relational, never subtraction.
    #[inline]
    pub(crate) fn cmp_merge(&self, column_row: u64, o3_row: u64) -> Ordering {
        self.column_value(column_row).cmp(&self.o3[o3_row as usize])
    }

    #[inline]
    fn tagged_value(&self, row_id: u64) -> T {
        if is_tagged(row_id) {
            self.o3[untag(row_id) as usize]
        } else {
            self.column_value(row_id)
        }
    }

    /// Sorted-stream compare: bit 63 of each identifier selects the O3
    /// buffer; untagged identifiers honor the column top.
    #[inline]
    pub(crate) fn cmp_tagged(&self, l: u64, r: u64) -> Ordering {
        self.tagged_value(l).cmp(&self.tagged_value(r))
    }
}

/// Expands `$body` once per value width with `$col` bound to the matching
/// [`TypedKeyColumn`]. The single-column entry points go through this so the
/// hot path carries no width dispatch.
macro_rules! with_typed_column {
    ($key:expr, $col:ident => $body:expr) => {
        match $key.values {
            $crate::compare::KeyValues::I8 { column, o3, null } => {
                let $col = $crate::compare::TypedKeyColumn {
                    column,
                    o3,
                    column_top: $key.column_top,
                    null,
                };
                $body
            }
            $crate::compare::KeyValues::I16 { column, o3, null } => {
                let $col = $crate::compare::TypedKeyColumn {
                    column,
                    o3,
                    column_top: $key.column_top,
                    null,
                };
                $body
            }
            $crate::compare::KeyValues::I32 { column, o3, null } => {
                let $col = $crate::compare::TypedKeyColumn {
                    column,
                    o3,
                    column_top: $key.column_top,
                    null,
                };
                $body
            }
            $crate::compare::KeyValues::I64 { column, o3, null } => {
                let $col = $crate::compare::TypedKeyColumn {
                    column,
                    o3,
                    column_top: $key.column_top,
                    null,
                };
                $body
            }
            $crate::compare::KeyValues::I128 { column, o3, null } => {
                let $col = $crate::compare::TypedKeyColumn {
                    column,
                    o3,
                    column_top: $key.column_top,
                    null,
                };
                $body
            }
            $crate::compare::KeyValues::I256 { column, o3, null } => {
                let $col = $crate::compare::TypedKeyColumn {
                    column,
                    o3,
                    column_top: $key.column_top,
                    null,
                };
                $body
            }
        }
    };
}
pub(crate) use with_typed_column;

/// Lexicographic merge-side compare over several key columns; returns on the
/// first column that orders the rows.
pub(crate) fn cmp_keys_merge(keys: &[KeyColumn<'_>], column_row: u64, o3_row: u64) -> Ordering {
    for key in keys {
        let diff = with_typed_column!(key, col => col.cmp_merge(column_row, o3_row));
        if diff != Ordering::Equal {
            return diff;
        }
    }
    Ordering::Equal
}

/// Lexicographic tagged compare over several key columns.
pub(crate) fn cmp_keys_tagged(keys: &[KeyColumn<'_>], l: u64, r: u64) -> Ordering {
    for key in keys {
        let diff = with_typed_column!(key, col => col.cmp_tagged(l, r));
        if diff != Ordering::Equal {
            return diff;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempo_types::ROW_ID_TAG;

    fn i32_key<'a>(column: &'a [i32], o3: &'a [i32], column_top: u64, null: i32) -> KeyColumn<'a> {
        KeyColumn {
            column_top,
            values: KeyValues::I32 { column, o3, null },
        }
    }

    #[test]
    fn test_rows_below_column_top_read_as_null() {
        let column = [0, 0, 0, 0, 0, 42];
        let o3 = [i32::MIN, 7];
        let key = i32_key(&column, &o3, 5, i32::MIN);

        // Persisted row 3 is below the top; it must equal the O3 null at
        // row 0 and order below the O3 value 7.
        let diff = with_typed_column!(&key, col => col.cmp_merge(3, 0));
        assert_eq!(diff, Ordering::Equal);
        let diff = with_typed_column!(&key, col => col.cmp_merge(3, 1));
        assert_eq!(diff, Ordering::Less);
        let diff = with_typed_column!(&key, col => col.cmp_merge(5, 1));
        assert_eq!(diff, Ordering::Greater);
    }

    #[test]
    fn test_null_sentinel_never_subtracted() {
        // MIN vs MAX would overflow a subtraction-based compare.
        let column = [i32::MIN];
        let o3 = [i32::MAX];
        let key = i32_key(&column, &o3, 0, i32::MIN);
        let diff = with_typed_column!(&key, col => col.cmp_merge(0, 0));
        assert_eq!(diff, Ordering::Less);
    }

    #[test]
    fn test_tagged_compare_selects_o3_side() {
        let column = [10, 20];
        let o3 = [20, 30];
        let key = i32_key(&column, &o3, 0, i32::MIN);

        // Persisted row 1 (20) vs tagged O3 row 0 (20).
        let diff = with_typed_column!(&key, col => col.cmp_tagged(1, ROW_ID_TAG));
        assert_eq!(diff, Ordering::Equal);
        // Tagged O3 row 1 (30) vs persisted row 0 (10).
        let diff = with_typed_column!(&key, col => col.cmp_tagged(ROW_ID_TAG | 1, 0));
        assert_eq!(diff, Ordering::Greater);
    }

    #[test]
    fn test_multi_column_first_diff_wins() {
        let c0 = [1, 1];
        let o0 = [1, 1];
        let c1 = [5i64, 9];
        let o1 = [9i64, 5];
        let keys = [
            KeyColumn {
                column_top: 0,
                values: KeyValues::I32 {
                    column: &c0,
                    o3: &o0,
                    null: i32::MIN,
                },
            },
            KeyColumn {
                column_top: 0,
                values: KeyValues::I64 {
                    column: &c1,
                    o3: &o1,
                    null: i64::MIN,
                },
            },
        ];
        assert_eq!(cmp_keys_merge(&keys, 0, 0), Ordering::Less);
        assert_eq!(cmp_keys_merge(&keys, 1, 1), Ordering::Greater);
        assert_eq!(cmp_keys_merge(&keys, 0, 1), Ordering::Equal);
    }

    #[test]
    fn test_from_raw_parts_widths() {
        let column = 42i64.to_le_bytes();
        let o3 = 43i64.to_le_bytes();
        let mut null = [0u8; 32];
        null[..8].copy_from_slice(&i64::MIN.to_le_bytes());

        let key = KeyColumn::from_raw_parts(8, 0, &column, &o3, &null).unwrap();
        let diff = with_typed_column!(&key, col => col.cmp_merge(0, 0));
        assert_eq!(diff, Ordering::Less);

        match key.values {
            KeyValues::I64 { null, .. } => assert_eq!(null, i64::MIN),
            _ => panic!("expected 8-byte key"),
        }
    }

    #[test]
    fn test_from_raw_parts_rejects_unsupported_width() {
        let err = KeyColumn::from_raw_parts(3, 0, &[], &[], &[0u8; 32]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedKeyWidth(3)));
    }

    #[test]
    fn test_from_raw_parts_rejects_ragged_buffer() {
        let err = KeyColumn::from_raw_parts(4, 0, &[0u8; 6], &[], &[0u8; 32]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgumentError(_)));
    }

    #[test]
    fn test_i256_key_orders_by_high_half() {
        let column = [I256::new(1, 0)];
        let o3 = [I256::new(0, i128::MAX)];
        let key = KeyColumn {
            column_top: 0,
            values: KeyValues::I256 {
                column: &column,
                o3: &o3,
                null: I256::new(i128::MIN, 0),
            },
        };
        let diff = with_typed_column!(&key, col => col.cmp_merge(0, 0));
        assert_eq!(diff, Ordering::Greater);
    }
}
