//! Property groups: column-oriented tables over one support slice.
//!
//! Columns that were added against the same depth or from-to coordinates are
//! grouped into one table. A group records a snapshot of the owner's support
//! slice at creation time; a later column whose coordinates changed the
//! support gets a new group, so membership always reflects the coordinates a
//! column was actually added with.

use serde::{Deserialize, Serialize};
use strata_types::{Interval, SupportKind};

/// A snapshot of one object's support rows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SupportSlice {
    Depth(Vec<f64>),
    Interval(Vec<Interval>),
}

impl SupportSlice {
    /// The support kind this slice belongs to.
    pub fn kind(&self) -> SupportKind {
        match self {
            Self::Depth(_) => SupportKind::Depth,
            Self::Interval(_) => SupportKind::Interval,
        }
    }

    /// Number of rows in the slice.
    pub fn row_count(&self) -> usize {
        match self {
            Self::Depth(d) => d.len(),
            Self::Interval(p) => p.len(),
        }
    }
}

/// A group of columns sharing one support slice.
///
/// A column belongs to at most one property group at a time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyGroup {
    name: String,
    support: SupportSlice,
    members: Vec<String>,
}

impl PropertyGroup {
    pub(crate) fn new(name: impl Into<String>, support: SupportSlice) -> Self {
        Self {
            name: name.into(),
            support,
            members: Vec::new(),
        }
    }

    /// Group name, unique per owning object.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The support kind of this group.
    pub fn kind(&self) -> SupportKind {
        self.support.kind()
    }

    /// The support slice the group was created against.
    pub fn support(&self) -> &SupportSlice {
        &self.support
    }

    /// Number of support rows.
    pub fn row_count(&self) -> usize {
        self.support.row_count()
    }

    /// Member column names, in join order.
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Returns `true` if `name` is a member.
    pub fn contains(&self, name: &str) -> bool {
        self.members.iter().any(|m| m == name)
    }

    /// Returns `true` if the group has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub(crate) fn add_member(&mut self, name: &str) {
        if !self.contains(name) {
            self.members.push(name.to_string());
        }
    }

    pub(crate) fn remove_member(&mut self, name: &str) {
        self.members.retain(|m| m != name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_is_deduplicated() {
        let mut group = PropertyGroup::new("depth_1", SupportSlice::Depth(vec![0.0, 1.0]));
        group.add_member("log_a");
        group.add_member("log_b");
        group.add_member("log_a");
        assert_eq!(group.members(), ["log_a", "log_b"]);
        assert!(group.contains("log_a"));

        group.remove_member("log_a");
        assert!(!group.contains("log_a"));
        assert!(!group.is_empty());
    }

    #[test]
    fn slice_kind_and_rows() {
        let depth = SupportSlice::Depth(vec![0.0, 1.0, 2.0]);
        assert_eq!(depth.kind(), SupportKind::Depth);
        assert_eq!(depth.row_count(), 3);

        let intervals = SupportSlice::Interval(vec![Interval::new(0.0, 10.0)]);
        assert_eq!(intervals.kind(), SupportKind::Interval);
        assert_eq!(intervals.row_count(), 1);
    }
}
