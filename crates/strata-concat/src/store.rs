//! The concatenated store: shared arrays, index tables, and the registry of
//! member objects.
//!
//! Many logically distinct child objects (e.g. individual drillholes) live
//! inside a small number of shared, contiguous arrays. The store owns those
//! arrays together with one [`IndexTable`] per attribute name mapping each
//! object to its `(offset, count)` window, the per-object attribute blobs,
//! the column registry, and the property groups. It is the unit of
//! persistence: [`ConcatenatedStore::save`] and [`ConcatenatedStore::load`]
//! move the whole state through the external [`ContainerStore`].
//!
//! The store is single-writer: all mutation goes through `&mut self` on the
//! calling thread. `write_array` mutates staged copies of the affected array
//! and index table and commits both only after every step has succeeded, so
//! a failed write never leaves a half-updated index behind.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use strata_index::IndexTable;
use strata_merge::{merge_depths, merge_intervals};
use strata_store::{keys, ContainerStore};
use strata_types::{
    ArrayValues, AttrKey, AttrValue, AttributeBlob, Interval, ObjectId, SupportKind,
};

use crate::data::ColumnMeta;
use crate::error::{ConcatError, ConcatResult};
use crate::group::{PropertyGroup, SupportSlice};
use crate::object::ConcatenatedObject;

/// Shared array holding depth coordinates.
pub const DEPTH_ARRAY: &str = "DEPTH";
/// Shared array holding interval lower bounds.
pub const FROM_ARRAY: &str = "FROM";
/// Shared array holding interval upper bounds.
pub const TO_ARRAY: &str = "TO";

/// Default collocation tolerance for depth matching, in depth units.
pub const DEFAULT_COLLOCATION_DISTANCE: f64 = 0.01;

/// Mapping from source to destination object ids, built up during copies.
///
/// Cross-references inside attribute blobs (e.g. `Parent`) that point at an
/// original id are rewritten through this map in the destination store.
#[derive(Clone, Debug, Default)]
pub struct IdRemap {
    map: BTreeMap<ObjectId, ObjectId>,
}

impl IdRemap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: ObjectId, target: ObjectId) {
        self.map.insert(source, target);
    }

    pub fn get(&self, source: ObjectId) -> Option<ObjectId> {
        self.map.get(&source).copied()
    }

    pub fn remove(&mut self, source: ObjectId) {
        self.map.remove(&source);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<ObjectId, ObjectId> {
        &self.map
    }
}

/// Persisted registry record: object order and store settings.
#[derive(Serialize, Deserialize)]
struct RegistryRecord {
    object_ids: Vec<ObjectId>,
    default_tolerance: f64,
}

/// Owner of the shared arrays for a collection of concatenated children.
pub struct ConcatenatedStore {
    /// Member object ids; insertion order is the persisted order.
    object_ids: Vec<ObjectId>,
    /// Attribute blob per object.
    attributes: BTreeMap<ObjectId, AttributeBlob>,
    /// Column registry per object.
    columns: BTreeMap<ObjectId, BTreeMap<String, ColumnMeta>>,
    /// Property groups per object.
    groups: BTreeMap<ObjectId, Vec<PropertyGroup>>,
    /// One shared array per attribute name, spanning all member objects.
    arrays: BTreeMap<String, ArrayValues>,
    /// One index table per attribute name.
    index: BTreeMap<String, IndexTable>,
    /// External persistence collaborator.
    container: Arc<dyn ContainerStore>,
    /// Depth collocation tolerance used when `add_data` is called without one.
    default_tolerance: f64,
}

impl std::fmt::Debug for ConcatenatedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcatenatedStore")
            .field("objects", &self.object_ids.len())
            .field("arrays", &self.arrays.len())
            .finish()
    }
}

impl ConcatenatedStore {
    /// Create a new empty store backed by the given container.
    pub fn new(container: Arc<dyn ContainerStore>) -> Self {
        Self {
            object_ids: Vec::new(),
            attributes: BTreeMap::new(),
            columns: BTreeMap::new(),
            groups: BTreeMap::new(),
            arrays: BTreeMap::new(),
            index: BTreeMap::new(),
            container,
            default_tolerance: DEFAULT_COLLOCATION_DISTANCE,
        }
    }

    /// Override the default depth collocation tolerance.
    pub fn with_default_tolerance(mut self, tolerance: f64) -> Self {
        self.default_tolerance = tolerance;
        self
    }

    pub fn default_tolerance(&self) -> f64 {
        self.default_tolerance
    }

    /// Member object ids, in registration order.
    pub fn object_ids(&self) -> &[ObjectId] {
        &self.object_ids
    }

    pub fn object_count(&self) -> usize {
        self.object_ids.len()
    }

    pub fn is_registered(&self, object_id: ObjectId) -> bool {
        self.attributes.contains_key(&object_id)
    }

    fn ensure_registered(&self, object_id: ObjectId) -> ConcatResult<()> {
        if self.is_registered(object_id) {
            Ok(())
        } else {
            Err(ConcatError::UnknownObject(object_id))
        }
    }

    // ---------------------------------------------------------------
    // Object lifecycle
    // ---------------------------------------------------------------

    /// Register a new logical child and return its identifier.
    pub fn register_object(&mut self) -> ObjectId {
        let id = ObjectId::new();
        self.object_ids.push(id);
        self.attributes.insert(id, AttributeBlob::new());
        self.columns.insert(id, BTreeMap::new());
        self.groups.insert(id, Vec::new());
        debug!(object = %id.short_id(), "registered object");
        id
    }

    /// Handle to one registered object.
    pub fn object(&mut self, object_id: ObjectId) -> ConcatResult<ConcatenatedObject<'_>> {
        self.ensure_registered(object_id)?;
        Ok(ConcatenatedObject::new(self, object_id))
    }

    /// Remove an object: every attribute range it owns is compacted out of
    /// the shared arrays, and its blob, columns, and groups are dropped.
    pub fn delete_object(&mut self, object_id: ObjectId) -> ConcatResult<()> {
        self.ensure_registered(object_id)?;
        let names: Vec<String> = self
            .index
            .iter()
            .filter(|(_, table)| table.lookup(object_id).is_some())
            .map(|(name, _)| name.clone())
            .collect();
        for name in &names {
            self.clear_array(name, object_id)?;
        }
        self.attributes.remove(&object_id);
        self.columns.remove(&object_id);
        self.groups.remove(&object_id);
        self.object_ids.retain(|&id| id != object_id);
        debug!(object = %object_id.short_id(), attributes = names.len(), "deleted object");
        Ok(())
    }

    // ---------------------------------------------------------------
    // Attribute blobs
    // ---------------------------------------------------------------

    /// Upsert one field in the object's attribute blob. The value shape is
    /// validated against the key.
    pub fn write_attribute(
        &mut self,
        object_id: ObjectId,
        key: AttrKey,
        value: AttrValue,
    ) -> ConcatResult<()> {
        let blob = self
            .attributes
            .get_mut(&object_id)
            .ok_or(ConcatError::UnknownObject(object_id))?;
        blob.insert(key, value)?;
        Ok(())
    }

    /// One field of the object's attribute blob.
    pub fn attribute(&self, object_id: ObjectId, key: AttrKey) -> ConcatResult<Option<&AttrValue>> {
        self.ensure_registered(object_id)?;
        Ok(self.attributes.get(&object_id).and_then(|b| b.get(key)))
    }

    /// The object's full attribute blob.
    pub fn attributes(&self, object_id: ObjectId) -> ConcatResult<&AttributeBlob> {
        self.attributes
            .get(&object_id)
            .ok_or(ConcatError::UnknownObject(object_id))
    }

    // ---------------------------------------------------------------
    // Shared arrays
    // ---------------------------------------------------------------

    /// Variant name of the shared array under `name`, if it exists.
    pub fn array_kind(&self, name: &str) -> Option<&'static str> {
        self.arrays.get(name).map(ArrayValues::kind_name)
    }

    /// Names of all shared arrays, in sorted order.
    pub fn array_names(&self) -> impl Iterator<Item = &str> {
        self.arrays.keys().map(String::as_str)
    }

    /// Write one object's slice of a shared array.
    ///
    /// This is the central layout entry point. A fresh object/attribute pair
    /// appends at the end of the array; a same-length write updates in
    /// place; a longer write extends in place when the object's range is the
    /// last one, and otherwise relocates the range (remove, re-append at the
    /// end, copy forward). The affected array and index table are staged and
    /// committed together only after every step has succeeded.
    pub fn write_array(
        &mut self,
        name: &str,
        object_id: ObjectId,
        values: ArrayValues,
    ) -> ConcatResult<()> {
        self.ensure_registered(object_id)?;

        let mut array = match self.arrays.get(name) {
            Some(existing) => existing.clone(),
            None => values.empty_like(),
        };
        let mut table = self.index.get(name).cloned().unwrap_or_default();

        match table.lookup(object_id) {
            None => {
                table.append(object_id, values.len())?;
                array.append(&values)?;
            }
            Some((offset, count)) => {
                let (offset, count) = (offset as usize, count as usize);
                let terminal = offset + count == table.total_len() as usize;
                if values.len() == count {
                    array.overwrite(offset, &values)?;
                } else if terminal && values.len() > count {
                    table.extend(object_id, values.len() - count)?;
                    array.splice_out(offset, count)?;
                    array.append(&values)?;
                } else {
                    let removed = table.remove(object_id)?;
                    array.splice_out(removed.offset as usize, removed.count as usize)?;
                    table.append(object_id, values.len())?;
                    array.append(&values)?;
                }
            }
        }

        debug!(
            attribute = name,
            object = %object_id.short_id(),
            rows = values.len(),
            "array write committed"
        );
        self.arrays.insert(name.to_string(), array);
        self.index.insert(name.to_string(), table);
        Ok(())
    }

    /// The object's slice of a shared array.
    pub fn read_array(&self, name: &str, object_id: ObjectId) -> ConcatResult<ArrayValues> {
        let (offset, count) = self.fetch_index(object_id, name)?;
        let array = self.arrays.get(name).ok_or_else(|| {
            ConcatError::Corrupt(format!("array '{name}' missing for indexed attribute"))
        })?;
        Ok(array.slice(offset as usize, count as usize)?)
    }

    /// Raw `(offset, count)` window of one object's slice. Diagnostic
    /// accessor for callers that need positions inside the shared array.
    pub fn fetch_index(&self, object_id: ObjectId, name: &str) -> ConcatResult<(i32, i32)> {
        self.ensure_registered(object_id)?;
        self.index
            .get(name)
            .and_then(|table| table.lookup(object_id))
            .ok_or_else(|| ConcatError::MissingAttribute {
                object: object_id,
                name: name.to_string(),
            })
    }

    /// Remove one object's slice of a shared array, compacting the array and
    /// shifting every later range down. Drops the array entirely when the
    /// last range goes.
    pub fn clear_array(&mut self, name: &str, object_id: ObjectId) -> ConcatResult<()> {
        self.fetch_index(object_id, name)?;
        let mut table = self.index.get(name).cloned().unwrap_or_default();
        let mut array = self.arrays.get(name).cloned().ok_or_else(|| {
            ConcatError::Corrupt(format!("array '{name}' missing for indexed attribute"))
        })?;

        let removed = table.remove(object_id)?;
        array.splice_out(removed.offset as usize, removed.count as usize)?;

        debug!(
            attribute = name,
            object = %object_id.short_id(),
            rows = removed.count,
            "array range cleared"
        );
        if table.is_empty() {
            self.arrays.remove(name);
            self.index.remove(name);
        } else {
            self.arrays.insert(name.to_string(), array);
            self.index.insert(name.to_string(), table);
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Support reconciliation
    // ---------------------------------------------------------------

    /// The object's support slice of the given kind, if it has one.
    pub fn support_slice(
        &self,
        object_id: ObjectId,
        kind: SupportKind,
    ) -> ConcatResult<Option<SupportSlice>> {
        self.ensure_registered(object_id)?;
        match kind {
            SupportKind::Depth => {
                if self.fetch_index(object_id, DEPTH_ARRAY).is_err() {
                    return Ok(None);
                }
                match self.read_array(DEPTH_ARRAY, object_id)? {
                    ArrayValues::Float(depths) => Ok(Some(SupportSlice::Depth(depths))),
                    other => Err(ConcatError::Corrupt(format!(
                        "depth support stored as {} values",
                        other.kind_name()
                    ))),
                }
            }
            SupportKind::Interval => {
                if self.fetch_index(object_id, FROM_ARRAY).is_err() {
                    return Ok(None);
                }
                let from = self.read_array(FROM_ARRAY, object_id)?;
                let to = self.read_array(TO_ARRAY, object_id)?;
                match (from, to) {
                    (ArrayValues::Float(from), ArrayValues::Float(to)) => {
                        if from.len() != to.len() {
                            return Err(ConcatError::Corrupt(
                                "FROM and TO slices differ in length".to_string(),
                            ));
                        }
                        Ok(Some(SupportSlice::Interval(
                            from.iter()
                                .zip(&to)
                                .map(|(&f, &t)| Interval::new(f, t))
                                .collect(),
                        )))
                    }
                    _ => Err(ConcatError::Corrupt(
                        "interval support stored as integer values".to_string(),
                    )),
                }
            }
            SupportKind::None => Ok(None),
        }
    }

    /// Reconcile new support coordinates against the object's stored support
    /// and commit the combined support. Returns the merged slice and the
    /// placement vector for the incoming samples.
    ///
    /// Delegated to by the object-level add path; depth matching uses the
    /// given tolerance, interval matching is exact.
    pub(crate) fn reconcile_support(
        &mut self,
        object_id: ObjectId,
        incoming: &SupportSlice,
        tolerance: f64,
    ) -> ConcatResult<(SupportSlice, Vec<usize>, usize)> {
        let existing = self.support_slice(object_id, incoming.kind())?;
        match incoming {
            SupportSlice::Depth(samples) => {
                let base = match &existing {
                    Some(SupportSlice::Depth(depths)) => depths.as_slice(),
                    _ => &[],
                };
                let merge = merge_depths(base, samples, tolerance)?;
                if existing.is_none() || merge.appended > 0 {
                    self.write_array(
                        DEPTH_ARRAY,
                        object_id,
                        ArrayValues::Float(merge.combined.clone()),
                    )?;
                }
                Ok((
                    SupportSlice::Depth(merge.combined),
                    merge.placement,
                    merge.appended,
                ))
            }
            SupportSlice::Interval(pairs) => {
                let base = match &existing {
                    Some(SupportSlice::Interval(known)) => known.as_slice(),
                    _ => &[],
                };
                let merge = merge_intervals(base, pairs);
                if existing.is_none() || merge.appended > 0 {
                    let from: Vec<f64> = merge.combined.iter().map(|p| p.from).collect();
                    let to: Vec<f64> = merge.combined.iter().map(|p| p.to).collect();
                    self.write_array(FROM_ARRAY, object_id, ArrayValues::Float(from))?;
                    self.write_array(TO_ARRAY, object_id, ArrayValues::Float(to))?;
                }
                Ok((
                    SupportSlice::Interval(merge.combined),
                    merge.placement,
                    merge.appended,
                ))
            }
        }
    }

    // ---------------------------------------------------------------
    // Column registry and groups (crate-internal mutation)
    // ---------------------------------------------------------------

    pub(crate) fn column_map(
        &self,
        object_id: ObjectId,
    ) -> ConcatResult<&BTreeMap<String, ColumnMeta>> {
        self.ensure_registered(object_id)?;
        Ok(self
            .columns
            .get(&object_id)
            .expect("registered object has a column map"))
    }

    pub(crate) fn register_column(
        &mut self,
        object_id: ObjectId,
        name: &str,
        meta: ColumnMeta,
    ) -> ConcatResult<()> {
        self.ensure_registered(object_id)?;
        self.columns
            .entry(object_id)
            .or_default()
            .insert(name.to_string(), meta);
        Ok(())
    }

    pub(crate) fn remove_column(&mut self, object_id: ObjectId, name: &str) {
        if let Some(map) = self.columns.get_mut(&object_id) {
            map.remove(name);
        }
    }

    /// Property groups owned by one object.
    pub fn property_groups(&self, object_id: ObjectId) -> ConcatResult<&[PropertyGroup]> {
        self.ensure_registered(object_id)?;
        Ok(self.groups.get(&object_id).map(Vec::as_slice).unwrap_or(&[]))
    }

    /// Index of the group whose snapshot matches the object's current
    /// support of `kind`, creating a new empty group when none matches.
    pub(crate) fn find_or_create_group(
        &mut self,
        object_id: ObjectId,
        kind: SupportKind,
    ) -> ConcatResult<usize> {
        let support = self
            .support_slice(object_id, kind)?
            .ok_or(ConcatError::MissingSupport(kind))?;
        let groups = self.groups.entry(object_id).or_default();
        if let Some(idx) = groups
            .iter()
            .position(|g| g.kind() == kind && *g.support() == support)
        {
            return Ok(idx);
        }
        let ordinal = groups.iter().filter(|g| g.kind() == kind).count() + 1;
        let name = format!("{kind}_{ordinal}");
        debug!(object = %object_id.short_id(), group = %name, "created property group");
        groups.push(PropertyGroup::new(name, support));
        Ok(groups.len() - 1)
    }

    pub(crate) fn add_group_member(
        &mut self,
        object_id: ObjectId,
        group_idx: usize,
        name: &str,
    ) {
        if let Some(group) = self
            .groups
            .get_mut(&object_id)
            .and_then(|groups| groups.get_mut(group_idx))
        {
            group.add_member(name);
        }
    }

    /// Drop `name` from whichever group holds it; empty groups are removed.
    pub(crate) fn remove_group_member(&mut self, object_id: ObjectId, name: &str) {
        if let Some(groups) = self.groups.get_mut(&object_id) {
            for group in groups.iter_mut() {
                group.remove_member(name);
            }
            groups.retain(|g| !g.is_empty());
        }
    }

    // ---------------------------------------------------------------
    // Copy
    // ---------------------------------------------------------------

    /// Duplicate one object into `target` under a fresh identifier.
    ///
    /// The attribute blob is copied with its cross-references rewritten
    /// through `remap`; every array slice is appended into the target's
    /// shared arrays; property groups carry over with the same column names.
    /// On failure the partially created destination object is deleted, so
    /// the target never holds a dangling id.
    pub fn copy_object(
        &self,
        target: &mut ConcatenatedStore,
        object_id: ObjectId,
        remap: &mut IdRemap,
    ) -> ConcatResult<ObjectId> {
        self.ensure_registered(object_id)?;
        let new_id = target.register_object();
        remap.insert(object_id, new_id);
        if let Err(err) = self.populate_copy(target, object_id, new_id, remap) {
            let _ = target.delete_object(new_id);
            remap.remove(object_id);
            return Err(err);
        }
        debug!(
            source = %object_id.short_id(),
            target = %new_id.short_id(),
            "copied object"
        );
        Ok(new_id)
    }

    fn populate_copy(
        &self,
        target: &mut ConcatenatedStore,
        source_id: ObjectId,
        new_id: ObjectId,
        remap: &IdRemap,
    ) -> ConcatResult<()> {
        let mut blob = self
            .attributes
            .get(&source_id)
            .cloned()
            .unwrap_or_default();
        blob.rewrite_references(remap.as_map());
        target.attributes.insert(new_id, blob);

        if let Some(meta) = self.columns.get(&source_id) {
            target.columns.insert(new_id, meta.clone());
        }
        if let Some(groups) = self.groups.get(&source_id) {
            target.groups.insert(new_id, groups.clone());
        }
        for (name, table) in &self.index {
            if table.lookup(source_id).is_some() {
                let slice = self.read_array(name, source_id)?;
                target.write_array(name, new_id, slice)?;
            }
        }
        Ok(())
    }

    /// Copy every member object into `target`, in registration order.
    pub fn copy_all(&self, target: &mut ConcatenatedStore) -> ConcatResult<IdRemap> {
        let mut remap = IdRemap::new();
        for &object_id in &self.object_ids {
            self.copy_object(target, object_id, &mut remap)?;
        }
        Ok(remap)
    }

    // ---------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------

    /// Write the full store state through the container.
    ///
    /// Keys written by the previous save that no longer exist (deleted
    /// objects, dropped arrays) are removed from the container.
    pub fn save(&self) -> ConcatResult<()> {
        let mut payloads: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        let registry = RegistryRecord {
            object_ids: self.object_ids.clone(),
            default_tolerance: self.default_tolerance,
        };
        payloads.insert(keys::REGISTRY.to_string(), to_json(&registry)?);
        for (id, blob) in &self.attributes {
            payloads.insert(keys::attributes(id), to_json(blob)?);
        }
        for (id, columns) in &self.columns {
            payloads.insert(keys::columns(id), to_json(columns)?);
        }
        for (id, groups) in &self.groups {
            payloads.insert(keys::groups(id), to_json(groups)?);
        }
        for (name, array) in &self.arrays {
            payloads.insert(keys::array(name), to_bincode(array)?);
        }
        for (name, table) in &self.index {
            payloads.insert(keys::index(name), to_bincode(table)?);
        }

        if let Some(bytes) = self.container.read(keys::MANIFEST)? {
            let previous: Vec<String> = from_json(&bytes)?;
            for key in previous {
                if !payloads.contains_key(&key) {
                    self.container.delete(&key)?;
                }
            }
        }
        for (key, bytes) in &payloads {
            self.container.write(key, bytes)?;
        }
        let manifest: Vec<String> = payloads.keys().cloned().collect();
        self.container.write(keys::MANIFEST, &to_json(&manifest)?)?;
        debug!(keys = manifest.len(), "store saved");
        Ok(())
    }

    /// Reconstruct a store from a container. A container without a registry
    /// record loads as an empty store.
    pub fn load(container: Arc<dyn ContainerStore>) -> ConcatResult<Self> {
        let mut store = Self::new(Arc::clone(&container));
        let Some(bytes) = container.read(keys::REGISTRY)? else {
            return Ok(store);
        };
        let registry: RegistryRecord = from_json(&bytes)?;
        store.default_tolerance = registry.default_tolerance;

        for id in &registry.object_ids {
            store.attributes.insert(
                *id,
                read_json_or_default(container.as_ref(), &keys::attributes(id))?,
            );
            store.columns.insert(
                *id,
                read_json_or_default(container.as_ref(), &keys::columns(id))?,
            );
            store.groups.insert(
                *id,
                read_json_or_default(container.as_ref(), &keys::groups(id))?,
            );
        }
        store.object_ids = registry.object_ids;

        let manifest: Vec<String> = match container.read(keys::MANIFEST)? {
            Some(bytes) => from_json(&bytes)?,
            None => return Err(ConcatError::Corrupt("manifest record missing".to_string())),
        };
        for key in &manifest {
            if let Some(name) = keys::array_name(key) {
                let bytes = container.read(key)?.ok_or_else(|| {
                    ConcatError::Corrupt(format!("manifest names missing key '{key}'"))
                })?;
                store.arrays.insert(name.to_string(), from_bincode(&bytes)?);
            } else if let Some(name) = keys::index_name(key) {
                let bytes = container.read(key)?.ok_or_else(|| {
                    ConcatError::Corrupt(format!("manifest names missing key '{key}'"))
                })?;
                store.index.insert(name.to_string(), from_bincode(&bytes)?);
            }
        }

        // Every indexed attribute must cover its array exactly.
        for (name, table) in &store.index {
            let array_len = store.arrays.get(name).map(ArrayValues::len).ok_or_else(
                || ConcatError::Corrupt(format!("index without array for '{name}'")),
            )?;
            if table.total_len() as usize != array_len {
                return Err(ConcatError::Corrupt(format!(
                    "index for '{name}' covers {} rows but array has {array_len}",
                    table.total_len()
                )));
            }
        }
        debug!(objects = store.object_ids.len(), "store loaded");
        Ok(store)
    }
}

fn to_json<T: Serialize>(value: &T) -> ConcatResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| ConcatError::Serialization(e.to_string()))
}

fn from_json<T: DeserializeOwned>(bytes: &[u8]) -> ConcatResult<T> {
    serde_json::from_slice(bytes).map_err(|e| ConcatError::Serialization(e.to_string()))
}

fn to_bincode<T: Serialize>(value: &T) -> ConcatResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| ConcatError::Serialization(e.to_string()))
}

fn from_bincode<T: DeserializeOwned>(bytes: &[u8]) -> ConcatResult<T> {
    bincode::deserialize(bytes).map_err(|e| ConcatError::Serialization(e.to_string()))
}

fn read_json_or_default<T: DeserializeOwned + Default>(
    container: &dyn ContainerStore,
    key: &str,
) -> ConcatResult<T> {
    match container.read(key)? {
        Some(bytes) => from_json(&bytes),
        None => Ok(T::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_store::InMemoryContainer;
    use strata_types::ValueKind;

    use crate::object::SupportData;

    fn new_store() -> ConcatenatedStore {
        ConcatenatedStore::new(Arc::new(InMemoryContainer::new()))
    }

    fn floats(values: &ArrayValues) -> Vec<f64> {
        match values {
            ArrayValues::Float(v) => v.clone(),
            other => panic!("expected float values, got {other:?}"),
        }
    }

    // ---------------------------------------------------------------
    // Object lifecycle
    // ---------------------------------------------------------------

    #[test]
    fn register_and_lookup() {
        let mut store = new_store();
        let a = store.register_object();
        let b = store.register_object();

        assert!(store.is_registered(a));
        assert_eq!(store.object_ids(), [a, b]);
        assert_eq!(store.object_count(), 2);

        let unknown = ObjectId::new();
        assert!(matches!(
            store.object(unknown),
            Err(ConcatError::UnknownObject(id)) if id == unknown
        ));
    }

    #[test]
    fn delete_object_compacts_survivors() {
        let mut store = new_store();
        let a = store.register_object();
        let b = store.register_object();
        store
            .write_array("assay", a, ArrayValues::Float(vec![1.0, 2.0]))
            .unwrap();
        store
            .write_array("assay", b, ArrayValues::Float(vec![3.0, 4.0, 5.0]))
            .unwrap();

        store.delete_object(a).unwrap();

        assert!(!store.is_registered(a));
        assert_eq!(store.fetch_index(b, "assay").unwrap(), (0, 3));
        assert_eq!(
            floats(&store.read_array("assay", b).unwrap()),
            [3.0, 4.0, 5.0]
        );
        assert!(matches!(
            store.attributes(a),
            Err(ConcatError::UnknownObject(_))
        ));
    }

    // ---------------------------------------------------------------
    // Attribute blobs
    // ---------------------------------------------------------------

    #[test]
    fn attribute_writes_are_validated() {
        let mut store = new_store();
        let a = store.register_object();

        store
            .write_attribute(a, AttrKey::Name, AttrValue::from("DH-001"))
            .unwrap();
        assert_eq!(
            store
                .attribute(a, AttrKey::Name)
                .unwrap()
                .and_then(AttrValue::as_text),
            Some("DH-001")
        );

        let err = store
            .write_attribute(a, AttrKey::EndDepth, AttrValue::from("deep"))
            .unwrap_err();
        assert!(matches!(err, ConcatError::Type(_)));
        assert!(store.attribute(a, AttrKey::EndDepth).unwrap().is_none());
    }

    // ---------------------------------------------------------------
    // Shared array layout
    // ---------------------------------------------------------------

    #[test]
    fn writes_append_per_object() {
        let mut store = new_store();
        let a = store.register_object();
        let b = store.register_object();

        store
            .write_array("assay", a, ArrayValues::Float(vec![1.0, 2.0]))
            .unwrap();
        store
            .write_array("assay", b, ArrayValues::Float(vec![3.0]))
            .unwrap();

        assert_eq!(store.fetch_index(a, "assay").unwrap(), (0, 2));
        assert_eq!(store.fetch_index(b, "assay").unwrap(), (2, 1));
        assert_eq!(floats(&store.read_array("assay", a).unwrap()), [1.0, 2.0]);
        assert_eq!(floats(&store.read_array("assay", b).unwrap()), [3.0]);
    }

    #[test]
    fn same_length_write_updates_in_place() {
        let mut store = new_store();
        let a = store.register_object();
        let b = store.register_object();
        store
            .write_array("assay", a, ArrayValues::Float(vec![1.0, 2.0]))
            .unwrap();
        store
            .write_array("assay", b, ArrayValues::Float(vec![3.0]))
            .unwrap();

        store
            .write_array("assay", a, ArrayValues::Float(vec![9.0, 8.0]))
            .unwrap();

        // Neither range moved.
        assert_eq!(store.fetch_index(a, "assay").unwrap(), (0, 2));
        assert_eq!(store.fetch_index(b, "assay").unwrap(), (2, 1));
        assert_eq!(floats(&store.read_array("assay", a).unwrap()), [9.0, 8.0]);
        assert_eq!(floats(&store.read_array("assay", b).unwrap()), [3.0]);
    }

    #[test]
    fn terminal_range_grows_in_place() {
        let mut store = new_store();
        let a = store.register_object();
        let b = store.register_object();
        store
            .write_array("assay", a, ArrayValues::Float(vec![1.0]))
            .unwrap();
        store
            .write_array("assay", b, ArrayValues::Float(vec![2.0, 3.0]))
            .unwrap();

        store
            .write_array("assay", b, ArrayValues::Float(vec![4.0, 5.0, 6.0]))
            .unwrap();

        assert_eq!(store.fetch_index(a, "assay").unwrap(), (0, 1));
        assert_eq!(store.fetch_index(b, "assay").unwrap(), (1, 3));
        assert_eq!(
            floats(&store.read_array("assay", b).unwrap()),
            [4.0, 5.0, 6.0]
        );
    }

    #[test]
    fn non_terminal_growth_relocates_to_end() {
        let mut store = new_store();
        let a = store.register_object();
        let b = store.register_object();
        store
            .write_array("assay", a, ArrayValues::Float(vec![1.0, 2.0]))
            .unwrap();
        store
            .write_array("assay", b, ArrayValues::Float(vec![3.0]))
            .unwrap();

        store
            .write_array("assay", a, ArrayValues::Float(vec![7.0, 8.0, 9.0]))
            .unwrap();

        // b compacted down, a re-appended at the end.
        assert_eq!(store.fetch_index(b, "assay").unwrap(), (0, 1));
        assert_eq!(store.fetch_index(a, "assay").unwrap(), (1, 3));
        assert_eq!(floats(&store.read_array("assay", b).unwrap()), [3.0]);
        assert_eq!(
            floats(&store.read_array("assay", a).unwrap()),
            [7.0, 8.0, 9.0]
        );
    }

    #[test]
    fn failed_write_leaves_store_unchanged() {
        let mut store = new_store();
        let a = store.register_object();
        let b = store.register_object();
        store
            .write_array("assay", a, ArrayValues::Float(vec![1.0, 2.0]))
            .unwrap();

        // Shared array is float; integer payload must be rejected without
        // touching the index.
        let err = store
            .write_array("assay", b, ArrayValues::Integer(vec![7]))
            .unwrap_err();
        assert!(matches!(err, ConcatError::Type(_)));

        assert!(store.fetch_index(b, "assay").is_err());
        assert_eq!(store.fetch_index(a, "assay").unwrap(), (0, 2));
        assert_eq!(floats(&store.read_array("assay", a).unwrap()), [1.0, 2.0]);
    }

    #[test]
    fn clear_array_compacts_the_middle() {
        let mut store = new_store();
        let ids: Vec<ObjectId> = (0..3).map(|_| store.register_object()).collect();
        store
            .write_array("assay", ids[0], ArrayValues::Float(vec![1.0]))
            .unwrap();
        store
            .write_array("assay", ids[1], ArrayValues::Float(vec![2.0, 3.0]))
            .unwrap();
        store
            .write_array("assay", ids[2], ArrayValues::Float(vec![4.0]))
            .unwrap();

        store.clear_array("assay", ids[1]).unwrap();

        assert_eq!(store.fetch_index(ids[0], "assay").unwrap(), (0, 1));
        assert_eq!(store.fetch_index(ids[2], "assay").unwrap(), (1, 1));
        assert_eq!(floats(&store.read_array("assay", ids[2]).unwrap()), [4.0]);
        assert!(matches!(
            store.fetch_index(ids[1], "assay"),
            Err(ConcatError::MissingAttribute { .. })
        ));
    }

    #[test]
    fn clearing_the_last_range_drops_the_array() {
        let mut store = new_store();
        let a = store.register_object();
        store
            .write_array("assay", a, ArrayValues::Float(vec![1.0]))
            .unwrap();

        store.clear_array("assay", a).unwrap();

        assert_eq!(store.array_kind("assay"), None);
        assert!(store.fetch_index(a, "assay").is_err());
    }

    // ---------------------------------------------------------------
    // Copy
    // ---------------------------------------------------------------

    #[test]
    fn copy_rewrites_parent_references() {
        let mut source = new_store();
        let parent = source.register_object();
        let child = source.register_object();
        source
            .write_attribute(child, AttrKey::Parent, AttrValue::Text(parent.to_string()))
            .unwrap();
        source
            .write_array("assay", child, ArrayValues::Float(vec![1.0, 2.0]))
            .unwrap();

        let mut target = new_store();
        let remap = source.copy_all(&mut target).unwrap();

        let new_parent = remap.get(parent).unwrap();
        let new_child = remap.get(child).unwrap();
        assert_eq!(target.object_ids(), [new_parent, new_child]);
        assert_eq!(
            target
                .attribute(new_child, AttrKey::Parent)
                .unwrap()
                .and_then(AttrValue::as_text),
            Some(new_parent.to_string().as_str())
        );
        assert_eq!(
            floats(&target.read_array("assay", new_child).unwrap()),
            [1.0, 2.0]
        );
    }

    #[test]
    fn failed_copy_removes_the_partial_object() {
        let mut source = new_store();
        let hole = source.register_object();
        source
            .write_array("assay", hole, ArrayValues::Float(vec![1.0]))
            .unwrap();

        // Target already stores "assay" as integers, so the slice write fails.
        let mut target = new_store();
        let occupant = target.register_object();
        target
            .write_array("assay", occupant, ArrayValues::Integer(vec![7]))
            .unwrap();

        let mut remap = IdRemap::new();
        let err = source.copy_object(&mut target, hole, &mut remap).unwrap_err();
        assert!(matches!(err, ConcatError::Type(_)));

        assert_eq!(target.object_ids(), [occupant]);
        assert!(remap.is_empty());
        assert_eq!(target.fetch_index(occupant, "assay").unwrap(), (0, 1));
    }

    // ---------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------

    #[test]
    fn save_load_roundtrip() {
        let container = Arc::new(InMemoryContainer::new());
        let mut store =
            ConcatenatedStore::new(Arc::clone(&container) as Arc<dyn ContainerStore>)
                .with_default_tolerance(0.05);
        let id = {
            let id = store.register_object();
            let mut hole = store.object(id).unwrap();
            hole.write_attribute(AttrKey::Name, AttrValue::from("DH-001"))
                .unwrap();
            hole.add_data(
                "gamma",
                SupportData::Depth(vec![0.0, 1.0, 2.0]),
                ArrayValues::Float(vec![10.0, 11.0, 12.0]),
                None,
            )
            .unwrap();
            hole.add_data(
                "lithology",
                SupportData::Interval(vec![Interval::new(0.0, 1.0), Interval::new(1.0, 2.0)]),
                ArrayValues::Integer(vec![3, 4]),
                None,
            )
            .unwrap();
            id
        };
        store.save().unwrap();

        let loaded = ConcatenatedStore::load(container).unwrap();

        assert_eq!(loaded.object_ids(), [id]);
        assert_eq!(loaded.default_tolerance(), 0.05);
        assert_eq!(
            loaded
                .attribute(id, AttrKey::Name)
                .unwrap()
                .and_then(AttrValue::as_text),
            Some("DH-001")
        );
        assert_eq!(
            floats(&loaded.read_array("gamma", id).unwrap()),
            [10.0, 11.0, 12.0]
        );
        assert_eq!(
            loaded.read_array("lithology", id).unwrap(),
            ArrayValues::Integer(vec![3, 4])
        );
        assert_eq!(
            floats(&loaded.read_array(DEPTH_ARRAY, id).unwrap()),
            [0.0, 1.0, 2.0]
        );
        assert_eq!(loaded.property_groups(id).unwrap().len(), 2);
        assert_eq!(
            loaded.column_map(id).unwrap().get("gamma").map(|m| &m.value_kind),
            Some(&ValueKind::Float)
        );
    }

    #[test]
    fn second_save_prunes_stale_keys() {
        let container = Arc::new(InMemoryContainer::new());
        let mut store = ConcatenatedStore::new(Arc::clone(&container) as Arc<dyn ContainerStore>);
        let a = store.register_object();
        let b = store.register_object();
        store
            .write_array("assay", a, ArrayValues::Float(vec![1.0]))
            .unwrap();
        store
            .write_array("gamma", b, ArrayValues::Float(vec![2.0]))
            .unwrap();
        store.save().unwrap();
        assert!(container.read(&keys::array("gamma")).unwrap().is_some());

        store.delete_object(b).unwrap();
        store.save().unwrap();

        assert!(container.read(&keys::array("gamma")).unwrap().is_none());
        assert!(container.read(&keys::attributes(&b)).unwrap().is_none());
        let loaded = ConcatenatedStore::load(container).unwrap();
        assert_eq!(loaded.object_ids(), [a]);
        assert_eq!(floats(&loaded.read_array("assay", a).unwrap()), [1.0]);
    }

    #[test]
    fn loading_an_empty_container_gives_an_empty_store() {
        let container = Arc::new(InMemoryContainer::new());
        let store = ConcatenatedStore::load(container).unwrap();
        assert_eq!(store.object_count(), 0);
        assert_eq!(store.default_tolerance(), DEFAULT_COLLOCATION_DISTANCE);
    }

    #[test]
    fn load_rejects_index_array_length_mismatch() {
        let container = Arc::new(InMemoryContainer::new());
        let mut store = ConcatenatedStore::new(Arc::clone(&container) as Arc<dyn ContainerStore>);
        let a = store.register_object();
        store
            .write_array("assay", a, ArrayValues::Float(vec![1.0, 2.0]))
            .unwrap();
        store.save().unwrap();

        // Truncate the persisted array behind the index's back.
        let short = bincode::serialize(&ArrayValues::Float(vec![1.0])).unwrap();
        container.write(&keys::array("assay"), &short).unwrap();

        let err = ConcatenatedStore::load(container).unwrap_err();
        assert!(matches!(err, ConcatError::Corrupt(_)));
    }
}
