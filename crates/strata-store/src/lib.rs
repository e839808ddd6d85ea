//! Persistence collaborator for Strata.
//!
//! The concatenated core never performs file I/O itself; it reads and writes
//! named byte keys through the [`ContainerStore`] trait. This crate provides
//! the trait, the in-memory implementation used by tests and embedders, and
//! the key naming scheme for persisted store state.
//!
//! # Key Types
//!
//! - [`ContainerStore`] — read/write/exists/delete over named byte keys
//! - [`InMemoryContainer`] — BTreeMap-backed implementation
//! - [`keys`] — the `strata/` key namespace

pub mod error;
pub mod keys;
pub mod memory;
pub mod traits;

pub use error::{ContainerError, ContainerResult};
pub use memory::InMemoryContainer;
pub use traits::ContainerStore;
