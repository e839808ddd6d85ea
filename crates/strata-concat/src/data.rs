//! Column handles.
//!
//! A [`ConcatenatedData`] is a lightweight descriptor of one named column
//! bound to one object; its values live inside the store's shared arrays and
//! are resolved lazily on demand.

use serde::{Deserialize, Serialize};
use strata_types::{ArrayValues, ObjectId, SupportKind, ValueKind};

use crate::error::ConcatResult;
use crate::group::PropertyGroup;
use crate::store::ConcatenatedStore;

/// Per-column metadata kept in the store's column registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    /// Which support array the column's rows are aligned to.
    pub support_kind: SupportKind,
    /// Primitive type of the column's values.
    pub value_kind: ValueKind,
}

/// Handle to one named column of one object.
#[derive(Clone, Debug, PartialEq)]
pub struct ConcatenatedData {
    name: String,
    owner: ObjectId,
    meta: ColumnMeta,
}

impl ConcatenatedData {
    pub(crate) fn new(name: impl Into<String>, owner: ObjectId, meta: ColumnMeta) -> Self {
        Self {
            name: name.into(),
            owner,
            meta,
        }
    }

    /// Column name, unique per owning object.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The object this column belongs to.
    pub fn owner(&self) -> ObjectId {
        self.owner
    }

    pub fn support_kind(&self) -> SupportKind {
        self.meta.support_kind
    }

    pub fn value_kind(&self) -> &ValueKind {
        &self.meta.value_kind
    }

    /// Resolve the column's value slice from the store's shared array.
    pub fn values(&self, store: &ConcatenatedStore) -> ConcatResult<ArrayValues> {
        store.read_array(&self.name, self.owner)
    }

    /// Number of rows the column currently spans.
    pub fn row_count(&self, store: &ConcatenatedStore) -> ConcatResult<usize> {
        let (_, count) = store.fetch_index(self.owner, &self.name)?;
        Ok(count as usize)
    }

    /// The property group this column belongs to, if any.
    pub fn property_group<'s>(
        &self,
        store: &'s ConcatenatedStore,
    ) -> ConcatResult<Option<&'s PropertyGroup>> {
        Ok(store
            .property_groups(self.owner)?
            .iter()
            .find(|g| g.contains(&self.name)))
    }
}
