//! The per-attribute index table.
//!
//! An [`IndexTable`] maps object ids to `(offset, count)` windows inside one
//! shared array. The table is kept dense: removing a range shifts every
//! range above it down by the removed count, so the backing array never has
//! holes. All operations are in-memory; splicing the backing array itself is
//! the caller's responsibility.

use serde::{Deserialize, Serialize};
use strata_types::ObjectId;

use crate::entry::IndexRange;
use crate::error::{IndexError, IndexResult};

fn to_i32(n: usize) -> IndexResult<i32> {
    i32::try_from(n).map_err(|_| IndexError::Overflow(n))
}

/// Mapping from object id to a window of a shared array.
///
/// Ranges are stored in insertion order; offsets are monotonically
/// non-decreasing in that order, and the union of all ranges covers the
/// backing array exactly (`sum(count) == total_len`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexTable {
    ranges: Vec<IndexRange>,
}

impl IndexTable {
    /// Create a new empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ranges in the table.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Returns `true` if the table has no ranges.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Total rows covered, which equals the backing array length.
    pub fn total_len(&self) -> i32 {
        self.ranges.iter().map(|r| r.count).sum()
    }

    /// All ranges, in insertion order.
    pub fn ranges(&self) -> &[IndexRange] {
        &self.ranges
    }

    /// Ids of all objects with a range, in insertion order.
    pub fn object_ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.ranges.iter().map(|r| r.object_id)
    }

    /// The `(offset, count)` window for `object_id`, if present.
    pub fn lookup(&self, object_id: ObjectId) -> Option<(i32, i32)> {
        self.range(object_id).map(|r| (r.offset, r.count))
    }

    /// The full range entry for `object_id`, if present.
    pub fn range(&self, object_id: ObjectId) -> Option<&IndexRange> {
        self.ranges.iter().find(|r| r.object_id == object_id)
    }

    /// Append a new range of `count` rows at the current end of the backing
    /// array and return its offset.
    pub fn append(&mut self, object_id: ObjectId, count: usize) -> IndexResult<i32> {
        if self.lookup(object_id).is_some() {
            return Err(IndexError::DuplicateRange(object_id));
        }
        if count == 0 {
            return Err(IndexError::EmptyRange(object_id));
        }
        let count = to_i32(count)?;
        let offset = self.total_len();
        offset
            .checked_add(count)
            .ok_or(IndexError::Overflow(offset as usize + count as usize))?;
        self.ranges.push(IndexRange::new(object_id, offset, count));
        Ok(offset)
    }

    /// Remove the range for `object_id` and compact: every range whose
    /// offset exceeds the removed offset shifts down by the removed count.
    ///
    /// Returns the removed range so the caller can splice the backing array.
    pub fn remove(&mut self, object_id: ObjectId) -> IndexResult<IndexRange> {
        let pos = self
            .ranges
            .iter()
            .position(|r| r.object_id == object_id)
            .ok_or(IndexError::RangeNotFound(object_id))?;
        let removed = self.ranges.remove(pos);
        for range in &mut self.ranges {
            if range.offset > removed.offset {
                range.offset -= removed.count;
            }
        }
        Ok(removed)
    }

    /// Grow an existing range in place by `added` rows.
    ///
    /// Only the last range in offset order can grow without relocating other
    /// objects' rows; extending any other range fails.
    pub fn extend(&mut self, object_id: ObjectId, added: usize) -> IndexResult<()> {
        let added = to_i32(added)?;
        let total = self.total_len();
        let range = self
            .ranges
            .iter_mut()
            .find(|r| r.object_id == object_id)
            .ok_or(IndexError::RangeNotFound(object_id))?;
        if range.end() != total {
            return Err(IndexError::NonTerminalExtend(object_id));
        }
        range.count = range
            .count
            .checked_add(added)
            .ok_or(IndexError::Overflow(added as usize))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<ObjectId> {
        (0..n).map(|_| ObjectId::new()).collect()
    }

    #[test]
    fn append_returns_running_offset() {
        let [a, b] = [ObjectId::new(), ObjectId::new()];
        let mut table = IndexTable::new();
        assert_eq!(table.append(a, 5).unwrap(), 0);
        assert_eq!(table.append(b, 3).unwrap(), 5);
        assert_eq!(table.total_len(), 8);
        assert_eq!(table.lookup(a), Some((0, 5)));
        assert_eq!(table.lookup(b), Some((5, 3)));
    }

    #[test]
    fn append_rejects_duplicate() {
        let a = ObjectId::new();
        let mut table = IndexTable::new();
        table.append(a, 5).unwrap();
        assert!(matches!(
            table.append(a, 2),
            Err(IndexError::DuplicateRange(_))
        ));
    }

    #[test]
    fn append_rejects_empty_range() {
        let mut table = IndexTable::new();
        assert!(matches!(
            table.append(ObjectId::new(), 0),
            Err(IndexError::EmptyRange(_))
        ));
    }

    #[test]
    fn lookup_missing_is_none() {
        let table = IndexTable::new();
        assert_eq!(table.lookup(ObjectId::new()), None);
    }

    #[test]
    fn remove_shifts_later_ranges() {
        let ids = ids(3);
        let mut table = IndexTable::new();
        table.append(ids[0], 4).unwrap();
        table.append(ids[1], 2).unwrap();
        table.append(ids[2], 6).unwrap();

        let removed = table.remove(ids[1]).unwrap();
        assert_eq!((removed.offset, removed.count), (4, 2));

        // First range untouched, third shifted down by the removed count.
        assert_eq!(table.lookup(ids[0]), Some((0, 4)));
        assert_eq!(table.lookup(ids[2]), Some((4, 6)));
        assert_eq!(table.total_len(), 10);
    }

    #[test]
    fn remove_missing_errors() {
        let mut table = IndexTable::new();
        assert!(matches!(
            table.remove(ObjectId::new()),
            Err(IndexError::RangeNotFound(_))
        ));
    }

    #[test]
    fn extend_terminal_range() {
        let ids = ids(2);
        let mut table = IndexTable::new();
        table.append(ids[0], 4).unwrap();
        table.append(ids[1], 2).unwrap();

        table.extend(ids[1], 3).unwrap();
        assert_eq!(table.lookup(ids[1]), Some((4, 5)));
        assert_eq!(table.total_len(), 9);
    }

    #[test]
    fn extend_non_terminal_fails() {
        let ids = ids(2);
        let mut table = IndexTable::new();
        table.append(ids[0], 4).unwrap();
        table.append(ids[1], 2).unwrap();

        assert!(matches!(
            table.extend(ids[0], 1),
            Err(IndexError::NonTerminalExtend(_))
        ));
        // Relocation: remove, re-append at the end.
        table.remove(ids[0]).unwrap();
        let offset = table.append(ids[0], 5).unwrap();
        assert_eq!(offset, 2);
        assert_eq!(table.lookup(ids[0]), Some((2, 5)));
    }

    #[test]
    fn extend_missing_errors() {
        let mut table = IndexTable::new();
        assert!(matches!(
            table.extend(ObjectId::new(), 1),
            Err(IndexError::RangeNotFound(_))
        ));
    }

    #[test]
    fn ranges_stay_contiguous_after_interleaved_ops() {
        let ids = ids(4);
        let mut table = IndexTable::new();
        table.append(ids[0], 3).unwrap();
        table.append(ids[1], 7).unwrap();
        table.append(ids[2], 1).unwrap();
        table.remove(ids[0]).unwrap();
        table.append(ids[3], 2).unwrap();
        table.remove(ids[2]).unwrap();

        let mut sorted: Vec<_> = table.ranges().to_vec();
        sorted.sort_by_key(|r| r.offset);
        let mut expected_offset = 0;
        for range in &sorted {
            assert_eq!(range.offset, expected_offset);
            expected_offset = range.end();
        }
        assert_eq!(expected_offset, table.total_len());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        /// Replay a sequence of appends and removes against a pool of ids,
        /// checking density after every operation: offsets sorted by range
        /// start exactly tile [0, total_len), so ranges never overlap and
        /// counts sum to the backing array length.
        fn check_dense(table: &IndexTable) {
            let mut sorted: Vec<_> = table.ranges().to_vec();
            sorted.sort_by_key(|r| r.offset);
            let mut cursor = 0;
            for range in &sorted {
                assert_eq!(range.offset, cursor, "hole or overlap at {range:?}");
                assert!(range.count > 0);
                cursor = range.end();
            }
            assert_eq!(cursor, table.total_len());
        }

        proptest! {
            #[test]
            fn append_remove_sequences_stay_dense(
                ops in proptest::collection::vec((0usize..8, 1usize..20, any::<bool>()), 1..60)
            ) {
                let pool: Vec<ObjectId> = (0..8).map(|_| ObjectId::new()).collect();
                let mut table = IndexTable::new();
                for (slot, count, is_append) in ops {
                    let id = pool[slot];
                    if is_append {
                        let had_range = table.lookup(id).is_some();
                        let result = table.append(id, count);
                        prop_assert_eq!(result.is_err(), had_range);
                    } else {
                        let had_range = table.lookup(id).is_some();
                        let result = table.remove(id);
                        prop_assert_eq!(result.is_ok(), had_range);
                    }
                    check_dense(&table);
                }
            }
        }
    }
}
