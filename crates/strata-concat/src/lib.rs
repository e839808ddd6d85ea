//! Concatenated storage core.
//!
//! Stores many logical child objects inside a small number of shared,
//! contiguous arrays. Each attribute name has one array spanning all objects
//! and one index table mapping each object to its `(offset, count)` window.
//! New columns reconcile their depth or interval coordinates against the
//! object's stored support, sibling columns pad with missing-value sentinels
//! when the support grows, and removals compact the arrays in place.
//!
//! # Key Types
//!
//! - [`ConcatenatedStore`]: owner of the shared arrays, index tables,
//!   attribute blobs, column registry, and property groups
//! - [`ConcatenatedObject`]: mutable handle to one registered object
//! - [`ConcatenatedData`]: descriptor of one named column
//! - [`PropertyGroup`]: columns sharing one support slice
//! - [`ConcatError`]: everything that can go wrong

mod data;
mod error;
mod group;
mod object;
mod store;

pub use data::{ColumnMeta, ConcatenatedData};
pub use error::{ConcatError, ConcatResult};
pub use group::{PropertyGroup, SupportSlice};
pub use object::{ConcatenatedObject, SupportData};
pub use store::{
    ConcatenatedStore, IdRemap, DEFAULT_COLLOCATION_DISTANCE, DEPTH_ARRAY, FROM_ARRAY, TO_ARRAY,
};
