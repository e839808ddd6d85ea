//! Per-object handles.
//!
//! A [`ConcatenatedObject`] borrows the store mutably and exposes one
//! object's view of it: adding columns with depth or interval coordinates,
//! updating and removing them, property groups, and attributes. All layout
//! work (merging coordinates, padding siblings, scattering values into the
//! combined support) happens here; the store only moves ranges.

use tracing::debug;

use strata_types::{
    ArrayValues, AttrKey, AttrValue, AttributeBlob, Interval, ObjectId, SupportKind, TypeError,
    ValueKind, ValueMap,
};

use crate::data::{ColumnMeta, ConcatenatedData};
use crate::error::{ConcatError, ConcatResult};
use crate::group::{PropertyGroup, SupportSlice};
use crate::store::{
    ConcatenatedStore, IdRemap, DEPTH_ARRAY, FROM_ARRAY, TO_ARRAY,
};

/// Support coordinates supplied with a new column.
#[derive(Clone, Debug, PartialEq)]
pub enum SupportData {
    /// One depth coordinate per row.
    Depth(Vec<f64>),
    /// One from-to interval per row.
    Interval(Vec<Interval>),
    /// Rows carry no support alignment.
    None,
}

impl SupportData {
    fn kind(&self) -> SupportKind {
        match self {
            Self::Depth(_) => SupportKind::Depth,
            Self::Interval(_) => SupportKind::Interval,
            Self::None => SupportKind::None,
        }
    }

    fn row_count(&self) -> Option<usize> {
        match self {
            Self::Depth(d) => Some(d.len()),
            Self::Interval(p) => Some(p.len()),
            Self::None => None,
        }
    }
}

/// Mutable handle to one registered object.
///
/// Obtained from [`ConcatenatedStore::object`]. The handle borrows the store
/// mutably, so at most one object is manipulated at a time.
pub struct ConcatenatedObject<'s> {
    store: &'s mut ConcatenatedStore,
    id: ObjectId,
}

impl<'s> ConcatenatedObject<'s> {
    pub(crate) fn new(store: &'s mut ConcatenatedStore, id: ObjectId) -> Self {
        Self { store, id }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    // ---------------------------------------------------------------
    // Attributes
    // ---------------------------------------------------------------

    /// Upsert one scalar attribute.
    pub fn write_attribute(&mut self, key: AttrKey, value: AttrValue) -> ConcatResult<()> {
        self.store.write_attribute(self.id, key, value)
    }

    /// One scalar attribute, if set.
    pub fn attribute(&self, key: AttrKey) -> ConcatResult<Option<&AttrValue>> {
        self.store.attribute(self.id, key)
    }

    /// The object's full attribute blob.
    pub fn attributes(&self) -> ConcatResult<&AttributeBlob> {
        self.store.attributes(self.id)
    }

    // ---------------------------------------------------------------
    // Adding columns
    // ---------------------------------------------------------------

    /// Add a named column with its support coordinates.
    ///
    /// Depth coordinates are reconciled against the object's stored depths
    /// with the collocation `tolerance` (the store default when `None`);
    /// interval coordinates match on exact bound equality. Values land at
    /// their matched support rows; rows of the combined support that the new
    /// column says nothing about hold the missing-value sentinel, and
    /// sibling columns are padded when the support grows.
    pub fn add_data(
        &mut self,
        name: &str,
        support: SupportData,
        values: ArrayValues,
        tolerance: Option<f64>,
    ) -> ConcatResult<ConcatenatedData> {
        let value_kind = match &values {
            ArrayValues::Float(_) => ValueKind::Float,
            ArrayValues::Integer(_) => ValueKind::Integer,
        };
        self.add_column(name, support, values, value_kind, tolerance)
    }

    /// Add a referenced column: integer codes resolved through `value_map`.
    pub fn add_referenced_data(
        &mut self,
        name: &str,
        support: SupportData,
        codes: Vec<i32>,
        value_map: ValueMap,
        tolerance: Option<f64>,
    ) -> ConcatResult<ConcatenatedData> {
        self.add_column(
            name,
            support,
            ArrayValues::Integer(codes),
            ValueKind::Referenced(value_map),
            tolerance,
        )
    }

    fn add_column(
        &mut self,
        name: &str,
        support: SupportData,
        values: ArrayValues,
        value_kind: ValueKind,
        tolerance: Option<f64>,
    ) -> ConcatResult<ConcatenatedData> {
        self.check_new_column(name, &values, &value_kind)?;
        if let Some(rows) = support.row_count() {
            if rows == 0 {
                return Err(ConcatError::MissingSupport(support.kind()));
            }
            if rows != values.len() {
                return Err(ConcatError::ShapeMismatch {
                    expected: rows,
                    actual: values.len(),
                });
            }
        }

        let support_kind = support.kind();
        match support {
            SupportData::Depth(coords) => {
                let tolerance = tolerance.unwrap_or(self.store.default_tolerance());
                self.add_aligned_column(
                    name,
                    sort_by_depth(coords, values)?,
                    value_kind.clone(),
                    tolerance,
                )?;
            }
            SupportData::Interval(pairs) => {
                // Tolerance never applies to intervals; matching is exact.
                self.add_aligned_column(
                    name,
                    (SupportSlice::Interval(pairs), values),
                    value_kind.clone(),
                    0.0,
                )?;
            }
            SupportData::None => {
                self.store.write_array(name, self.id, values)?;
                self.store.register_column(
                    self.id,
                    name,
                    ColumnMeta {
                        support_kind: SupportKind::None,
                        value_kind: value_kind.clone(),
                    },
                )?;
            }
        }

        debug!(object = %self.id.short_id(), column = name, kind = %support_kind, "added column");
        Ok(ConcatenatedData::new(
            name,
            self.id,
            ColumnMeta {
                support_kind,
                value_kind,
            },
        ))
    }

    /// Common path for support-aligned columns: merge the coordinates into
    /// the stored support, pad siblings if the support grew, scatter the
    /// values, register the column, and join its property group.
    fn add_aligned_column(
        &mut self,
        name: &str,
        (incoming, values): (SupportSlice, ArrayValues),
        value_kind: ValueKind,
        tolerance: f64,
    ) -> ConcatResult<()> {
        let kind = incoming.kind();
        let siblings: Vec<String> = self
            .store
            .column_map(self.id)?
            .iter()
            .filter(|(_, meta)| meta.support_kind == kind)
            .map(|(n, _)| n.clone())
            .collect();

        let (combined, placement, appended) =
            self.store.reconcile_support(self.id, &incoming, tolerance)?;
        if appended > 0 {
            self.pad_columns(&siblings, appended)?;
        }

        let column = scatter(&values, &placement, combined.row_count(), &value_kind)?;
        self.store.write_array(name, self.id, column)?;
        self.store.register_column(
            self.id,
            name,
            ColumnMeta {
                support_kind: kind,
                value_kind,
            },
        )?;

        let group_idx = self.store.find_or_create_group(self.id, kind)?;
        self.store.add_group_member(self.id, group_idx, name);
        Ok(())
    }

    /// Append `appended` missing-value rows to each named column.
    fn pad_columns(&mut self, names: &[String], appended: usize) -> ConcatResult<()> {
        for name in names {
            let meta = self
                .store
                .column_map(self.id)?
                .get(name)
                .cloned()
                .ok_or_else(|| ConcatError::MissingAttribute {
                    object: self.id,
                    name: name.clone(),
                })?;
            let mut slice = self.store.read_array(name, self.id)?;
            slice.append(&meta.value_kind.sentinel_array(appended))?;
            self.store.write_array(name, self.id, slice)?;
        }
        Ok(())
    }

    fn check_new_column(
        &self,
        name: &str,
        values: &ArrayValues,
        value_kind: &ValueKind,
    ) -> ConcatResult<()> {
        if name == DEPTH_ARRAY || name == FROM_ARRAY || name == TO_ARRAY {
            return Err(ConcatError::ReservedName(name.to_string()));
        }
        if self.store.column_map(self.id)?.contains_key(name) {
            return Err(ConcatError::DuplicateColumn {
                object: self.id,
                name: name.to_string(),
            });
        }
        if !value_kind.accepts(values) {
            return Err(ConcatError::Type(TypeError::KindMismatch {
                expected: value_kind.array_kind(),
                actual: values.kind_name(),
            }));
        }
        // Other objects may already store this attribute; the shared array
        // fixes its primitive type.
        if let Some(existing) = self.store.array_kind(name) {
            if existing != value_kind.array_kind() {
                return Err(ConcatError::Type(TypeError::KindMismatch {
                    expected: existing,
                    actual: value_kind.array_kind(),
                }));
            }
        }
        Ok(())
    }

    /// Add a column directly to an existing property group, one value per
    /// group row, without supplying coordinates.
    pub fn add_values_to_group(
        &mut self,
        name: &str,
        values: ArrayValues,
        group_name: &str,
    ) -> ConcatResult<ConcatenatedData> {
        let value_kind = match &values {
            ArrayValues::Float(_) => ValueKind::Float,
            ArrayValues::Integer(_) => ValueKind::Integer,
        };
        self.check_new_column(name, &values, &value_kind)?;

        let groups = self.store.property_groups(self.id)?;
        let group_idx = groups
            .iter()
            .position(|g| g.name() == group_name)
            .ok_or_else(|| ConcatError::GroupNotFound {
                object: self.id,
                name: group_name.to_string(),
            })?;
        let kind = groups[group_idx].kind();
        // The group's snapshot is the table the column joins; a support that
        // grew since the group was created does not change its width.
        let rows = groups[group_idx].row_count();
        if values.len() != rows {
            return Err(ConcatError::ShapeMismatch {
                expected: rows,
                actual: values.len(),
            });
        }

        self.store.write_array(name, self.id, values)?;
        self.store.register_column(
            self.id,
            name,
            ColumnMeta {
                support_kind: kind,
                value_kind: value_kind.clone(),
            },
        )?;
        self.store.add_group_member(self.id, group_idx, name);
        Ok(ConcatenatedData::new(
            name,
            self.id,
            ColumnMeta {
                support_kind: kind,
                value_kind,
            },
        ))
    }

    // ---------------------------------------------------------------
    // Updating and removing columns
    // ---------------------------------------------------------------

    /// Overwrite a column's values in place. The replacement must match the
    /// column's primitive type and current row count.
    pub fn update_values(&mut self, name: &str, values: ArrayValues) -> ConcatResult<()> {
        let meta = self
            .store
            .column_map(self.id)?
            .get(name)
            .cloned()
            .ok_or_else(|| ConcatError::MissingAttribute {
                object: self.id,
                name: name.to_string(),
            })?;
        if !meta.value_kind.accepts(&values) {
            return Err(ConcatError::Type(TypeError::KindMismatch {
                expected: meta.value_kind.array_kind(),
                actual: values.kind_name(),
            }));
        }
        let (_, count) = self.store.fetch_index(self.id, name)?;
        if values.len() != count as usize {
            return Err(ConcatError::ShapeMismatch {
                expected: count as usize,
                actual: values.len(),
            });
        }
        self.store.write_array(name, self.id, values)
    }

    /// Remove a column. The shared array compacts; when the last column of a
    /// support kind goes, the object's support rows of that kind go too.
    pub fn remove_data(&mut self, name: &str) -> ConcatResult<()> {
        let meta = self
            .store
            .column_map(self.id)?
            .get(name)
            .cloned()
            .ok_or_else(|| ConcatError::MissingAttribute {
                object: self.id,
                name: name.to_string(),
            })?;
        self.store.clear_array(name, self.id)?;
        self.store.remove_column(self.id, name);
        self.store.remove_group_member(self.id, name);

        if meta.support_kind != SupportKind::None {
            let orphaned = !self
                .store
                .column_map(self.id)?
                .values()
                .any(|m| m.support_kind == meta.support_kind);
            if orphaned {
                match meta.support_kind {
                    SupportKind::Depth => {
                        self.store.clear_array(DEPTH_ARRAY, self.id)?;
                    }
                    SupportKind::Interval => {
                        self.store.clear_array(FROM_ARRAY, self.id)?;
                        self.store.clear_array(TO_ARRAY, self.id)?;
                    }
                    SupportKind::None => {}
                }
            }
        }
        debug!(object = %self.id.short_id(), column = name, "removed column");
        Ok(())
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    /// Handle to one named column, if present.
    pub fn data(&self, name: &str) -> Option<ConcatenatedData> {
        self.store
            .column_map(self.id)
            .ok()?
            .get(name)
            .map(|meta| ConcatenatedData::new(name, self.id, meta.clone()))
    }

    /// Handles to all columns, in name order.
    pub fn data_list(&self) -> ConcatResult<Vec<ConcatenatedData>> {
        Ok(self
            .store
            .column_map(self.id)?
            .iter()
            .map(|(name, meta)| ConcatenatedData::new(name.clone(), self.id, meta.clone()))
            .collect())
    }

    /// A column's current values.
    pub fn values(&self, name: &str) -> ConcatResult<ArrayValues> {
        self.store.read_array(name, self.id)
    }

    /// The object's `(offset, count)` window for one attribute.
    pub fn fetch_index(&self, name: &str) -> ConcatResult<(i32, i32)> {
        self.store.fetch_index(self.id, name)
    }

    /// The object's stored depth coordinates, if any.
    pub fn depth(&self) -> ConcatResult<Option<Vec<f64>>> {
        match self.store.support_slice(self.id, SupportKind::Depth)? {
            Some(SupportSlice::Depth(depths)) => Ok(Some(depths)),
            _ => Ok(None),
        }
    }

    /// The object's stored from-to intervals, if any.
    pub fn intervals(&self) -> ConcatResult<Option<Vec<Interval>>> {
        match self.store.support_slice(self.id, SupportKind::Interval)? {
            Some(SupportSlice::Interval(pairs)) => Ok(Some(pairs)),
            _ => Ok(None),
        }
    }

    /// All property groups on the object.
    pub fn property_groups(&self) -> ConcatResult<&[PropertyGroup]> {
        self.store.property_groups(self.id)
    }

    /// The group matching the object's current support of `kind`, created
    /// empty when none matches.
    pub fn find_or_create_property_group(
        &mut self,
        kind: SupportKind,
    ) -> ConcatResult<&PropertyGroup> {
        let idx = self.store.find_or_create_group(self.id, kind)?;
        Ok(&self.store.property_groups(self.id)?[idx])
    }

    /// Duplicate this object into `target`.
    pub fn copy_to(
        &self,
        target: &mut ConcatenatedStore,
        remap: &mut IdRemap,
    ) -> ConcatResult<ObjectId> {
        self.store.copy_object(target, self.id, remap)
    }
}

/// Sort depth samples ascending, carrying the values along.
fn sort_by_depth(
    coords: Vec<f64>,
    values: ArrayValues,
) -> ConcatResult<(SupportSlice, ArrayValues)> {
    let mut order: Vec<usize> = (0..coords.len()).collect();
    order.sort_by(|&a, &b| coords[a].total_cmp(&coords[b]));
    let sorted: Vec<f64> = order.iter().map(|&i| coords[i]).collect();
    let values = values.permuted(&order)?;
    Ok((SupportSlice::Depth(sorted), values))
}

/// Build the stored column: `rows` missing-value sentinels with each input
/// value landed at its placement row. Later duplicates of a row win, which
/// is how repeated interval bounds update in place.
fn scatter(
    values: &ArrayValues,
    placement: &[usize],
    rows: usize,
    value_kind: &ValueKind,
) -> ConcatResult<ArrayValues> {
    let mut column = value_kind.sentinel_array(rows);
    for (src_idx, &dst_idx) in placement.iter().enumerate() {
        column.copy_row_from(dst_idx, values, src_idx)?;
    }
    Ok(column)
}
