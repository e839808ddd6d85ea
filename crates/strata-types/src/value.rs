use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Missing-value sentinel for float columns.
pub const FLOAT_NO_DATA: f64 = f64::NAN;

/// Missing-value sentinel for integer columns.
pub const INTEGER_NO_DATA: i32 = i32::MIN;

/// Missing-value sentinel for referenced columns (the reserved "Unknown" code).
pub const REFERENCED_NO_DATA: i32 = 0;

/// Which support array a column's rows are aligned to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SupportKind {
    /// Depth-indexed rows (one coordinate per row).
    Depth,
    /// From-to interval rows (two bounds per row).
    Interval,
    /// Rows carry no support alignment.
    None,
}

impl fmt::Display for SupportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Depth => write!(f, "depth"),
            Self::Interval => write!(f, "interval"),
            Self::None => write!(f, "none"),
        }
    }
}

/// A from-to interval. Two intervals are identical only on exact equality
/// of both bounds; no tolerance is applied.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub from: f64,
    pub to: f64,
}

impl Interval {
    pub fn new(from: f64, to: f64) -> Self {
        Self { from, to }
    }

    /// Exact equality of both bounds.
    pub fn bounds_eq(&self, other: &Interval) -> bool {
        self.from == other.from && self.to == other.to
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.from, self.to)
    }
}

/// Mapping from integer codes to names for referenced columns.
///
/// Code 0 is reserved for "Unknown" and doubles as the missing-value
/// sentinel of referenced columns; it cannot be redefined.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueMap {
    entries: BTreeMap<i32, String>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a code. Fails on the reserved code 0.
    pub fn insert(&mut self, code: i32, name: impl Into<String>) -> Result<(), TypeError> {
        if code == REFERENCED_NO_DATA {
            return Err(TypeError::ReservedCode);
        }
        self.entries.insert(code, name.into());
        Ok(())
    }

    /// Name for a code. Code 0 always resolves to "Unknown".
    pub fn name_of(&self, code: i32) -> Option<&str> {
        if code == REFERENCED_NO_DATA {
            return Some("Unknown");
        }
        self.entries.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&i32, &String)> {
        self.entries.iter()
    }
}

/// Primitive type of a value column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ValueKind {
    Float,
    Integer,
    /// Integer codes resolved through a value map.
    Referenced(ValueMap),
}

impl ValueKind {
    /// Name of the array variant this kind is stored as.
    pub fn array_kind(&self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Integer | Self::Referenced(_) => "integer",
        }
    }

    /// Returns `true` if `values` can carry columns of this kind.
    pub fn accepts(&self, values: &ArrayValues) -> bool {
        self.array_kind() == values.kind_name()
    }

    /// An array of `n` missing-value sentinels for this kind.
    pub fn sentinel_array(&self, n: usize) -> ArrayValues {
        match self {
            Self::Float => ArrayValues::Float(vec![FLOAT_NO_DATA; n]),
            Self::Integer => ArrayValues::Integer(vec![INTEGER_NO_DATA; n]),
            Self::Referenced(_) => ArrayValues::Integer(vec![REFERENCED_NO_DATA; n]),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float => write!(f, "float"),
            Self::Integer => write!(f, "integer"),
            Self::Referenced(_) => write!(f, "referenced"),
        }
    }
}

/// A contiguous buffer of column or coordinate values.
///
/// This is both the payload of a single write and the backing storage of a
/// shared array spanning all member objects. Depth and interval bounds are
/// stored as `Float`; referenced columns store their codes as `Integer`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ArrayValues {
    Float(Vec<f64>),
    Integer(Vec<i32>),
}

impl ArrayValues {
    pub fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Integer(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Variant name, for kind checks and error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Float(_) => "float",
            Self::Integer(_) => "integer",
        }
    }

    /// An empty buffer of the same variant.
    pub fn empty_like(&self) -> Self {
        match self {
            Self::Float(_) => Self::Float(Vec::new()),
            Self::Integer(_) => Self::Integer(Vec::new()),
        }
    }

    /// Append all values from `other`. Fails when variants differ.
    pub fn append(&mut self, other: &ArrayValues) -> Result<(), TypeError> {
        match (self, other) {
            (Self::Float(dst), Self::Float(src)) => dst.extend_from_slice(src),
            (Self::Integer(dst), Self::Integer(src)) => dst.extend_from_slice(src),
            (dst, src) => {
                return Err(TypeError::KindMismatch {
                    expected: dst.kind_name(),
                    actual: src.kind_name(),
                })
            }
        }
        Ok(())
    }

    /// Overwrite `other.len()` values starting at `offset`.
    pub fn overwrite(&mut self, offset: usize, other: &ArrayValues) -> Result<(), TypeError> {
        let (count, len) = (other.len(), self.len());
        if offset + count > len {
            return Err(TypeError::OutOfBounds { offset, count, len });
        }
        match (self, other) {
            (Self::Float(dst), Self::Float(src)) => {
                dst[offset..offset + count].copy_from_slice(src);
            }
            (Self::Integer(dst), Self::Integer(src)) => {
                dst[offset..offset + count].copy_from_slice(src);
            }
            (dst, src) => {
                return Err(TypeError::KindMismatch {
                    expected: dst.kind_name(),
                    actual: src.kind_name(),
                })
            }
        }
        Ok(())
    }

    /// Remove `count` values starting at `offset`, closing the gap.
    pub fn splice_out(&mut self, offset: usize, count: usize) -> Result<(), TypeError> {
        let len = self.len();
        if offset + count > len {
            return Err(TypeError::OutOfBounds { offset, count, len });
        }
        match self {
            Self::Float(v) => {
                v.drain(offset..offset + count);
            }
            Self::Integer(v) => {
                v.drain(offset..offset + count);
            }
        }
        Ok(())
    }

    /// Copy of the `count` values starting at `offset`.
    pub fn slice(&self, offset: usize, count: usize) -> Result<ArrayValues, TypeError> {
        let len = self.len();
        if offset + count > len {
            return Err(TypeError::OutOfBounds { offset, count, len });
        }
        Ok(match self {
            Self::Float(v) => Self::Float(v[offset..offset + count].to_vec()),
            Self::Integer(v) => Self::Integer(v[offset..offset + count].to_vec()),
        })
    }

    /// Copy one value from `src[src_idx]` into `self[dst_idx]`.
    pub fn copy_row_from(
        &mut self,
        dst_idx: usize,
        src: &ArrayValues,
        src_idx: usize,
    ) -> Result<(), TypeError> {
        if dst_idx >= self.len() {
            return Err(TypeError::OutOfBounds {
                offset: dst_idx,
                count: 1,
                len: self.len(),
            });
        }
        if src_idx >= src.len() {
            return Err(TypeError::OutOfBounds {
                offset: src_idx,
                count: 1,
                len: src.len(),
            });
        }
        match (self, src) {
            (Self::Float(dst), Self::Float(s)) => dst[dst_idx] = s[src_idx],
            (Self::Integer(dst), Self::Integer(s)) => dst[dst_idx] = s[src_idx],
            (dst, s) => {
                return Err(TypeError::KindMismatch {
                    expected: dst.kind_name(),
                    actual: s.kind_name(),
                })
            }
        }
        Ok(())
    }

    /// Reordered copy: `out[k] = self[perm[k]]`.
    pub fn permuted(&self, perm: &[usize]) -> Result<ArrayValues, TypeError> {
        let len = self.len();
        if let Some(&bad) = perm.iter().find(|&&p| p >= len) {
            return Err(TypeError::OutOfBounds {
                offset: bad,
                count: 1,
                len,
            });
        }
        Ok(match self {
            Self::Float(v) => Self::Float(perm.iter().map(|&p| v[p]).collect()),
            Self::Integer(v) => Self::Integer(perm.iter().map(|&p| v[p]).collect()),
        })
    }
}
