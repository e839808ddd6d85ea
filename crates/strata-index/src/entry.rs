//! Range entries mapping objects to windows of a shared array.

use serde::{Deserialize, Serialize};
use strata_types::ObjectId;

/// One object's `(offset, count)` window inside a shared array.
///
/// Offsets and counts are 32-bit signed to match the persisted index format;
/// `count` is always at least 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRange {
    /// The object owning this window.
    pub object_id: ObjectId,
    /// First row of the window.
    pub offset: i32,
    /// Number of rows in the window.
    pub count: i32,
}

impl IndexRange {
    pub fn new(object_id: ObjectId, offset: i32, count: i32) -> Self {
        Self {
            object_id,
            offset,
            count,
        }
    }

    /// One past the last row of the window.
    pub fn end(&self) -> i32 {
        self.offset + self.count
    }

    /// Returns `true` if the windows share any row.
    pub fn overlaps(&self, other: &IndexRange) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }
}
