//! Range index for Strata.
//!
//! Many logical objects live inside one shared array; the index records,
//! per attribute, which `(offset, count)` window each object owns. Tables
//! stay dense across removals so the shared arrays never develop holes.
//!
//! # Key Types
//!
//! - [`IndexTable`] — the per-attribute table with append/lookup/remove/extend
//! - [`IndexRange`] — one `(object_id, offset, count)` entry

pub mod entry;
pub mod error;
pub mod table;

pub use entry::IndexRange;
pub use error::{IndexError, IndexResult};
pub use table::IndexTable;
