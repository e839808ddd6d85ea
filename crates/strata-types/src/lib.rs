//! Foundation types for Strata.
//!
//! This crate provides the identifier, attribute, and value primitives used
//! throughout the Strata system. Every other Strata crate depends on
//! `strata-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`] — stable UUID identifier for a concatenated child object
//! - [`AttributeBlob`] — validated key/value metadata block per object
//! - [`ArrayValues`] — float or integer value buffer (columns and coordinates)
//! - [`SupportKind`] / [`Interval`] — depth and from-to row alignment
//! - [`ValueKind`] / [`ValueMap`] — column primitive types, referenced codes

pub mod attr;
pub mod error;
pub mod id;
pub mod value;

pub use attr::{AttrKey, AttrValue, AttributeBlob};
pub use error::TypeError;
pub use id::ObjectId;
pub use value::{
    ArrayValues, Interval, SupportKind, ValueKind, ValueMap, FLOAT_NO_DATA, INTEGER_NO_DATA,
    REFERENCED_NO_DATA,
};
