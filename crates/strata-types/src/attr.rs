//! Typed attribute blobs.
//!
//! Each concatenated object carries a flat key/value block of non-array
//! metadata. Keys are a closed enum rather than free-form strings, and each
//! key declares the value shape it accepts; writes are validated against
//! that shape. Values are restricted to JSON-compatible scalars and lists.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::id::ObjectId;

/// The closed set of attribute keys an object blob may carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttrKey {
    /// Display name of the object.
    Name,
    /// Collar location, a list of exactly three numbers.
    Collar,
    /// Final depth of the hole.
    EndDepth,
    /// Unit label for depth coordinates.
    DepthUnits,
    /// Identifier of the parent entity, rendered as a UUID string.
    Parent,
    /// Free-form note.
    Comment,
    /// Whether the object is active.
    Active,
}

impl AttrKey {
    /// All keys, in declaration order.
    pub fn all() -> &'static [AttrKey] {
        &[
            Self::Name,
            Self::Collar,
            Self::EndDepth,
            Self::DepthUnits,
            Self::Parent,
            Self::Comment,
            Self::Active,
        ]
    }

    /// Returns `true` if `value` has the shape this key requires.
    pub fn accepts(&self, value: &AttrValue) -> bool {
        match self {
            Self::Name | Self::DepthUnits => matches!(value, AttrValue::Text(_)),
            Self::Collar => match value {
                AttrValue::List(items) => {
                    items.len() == 3 && items.iter().all(|v| matches!(v, AttrValue::Number(_)))
                }
                _ => false,
            },
            Self::EndDepth => matches!(value, AttrValue::Number(_)),
            Self::Parent => match value {
                AttrValue::Text(s) => ObjectId::parse(s).is_ok(),
                _ => false,
            },
            Self::Comment => matches!(value, AttrValue::Text(_) | AttrValue::Null),
            Self::Active => matches!(value, AttrValue::Bool(_)),
        }
    }
}

impl fmt::Display for AttrKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Name => "Name",
            Self::Collar => "Collar",
            Self::EndDepth => "EndDepth",
            Self::DepthUnits => "DepthUnits",
            Self::Parent => "Parent",
            Self::Comment => "Comment",
            Self::Active => "Active",
        };
        write!(f, "{name}")
    }
}

/// A JSON-compatible attribute value: string, number, bool, list, or null.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<AttrValue>),
}

impl AttrValue {
    /// Variant name, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Text(_) => "text",
            Self::List(_) => "list",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<f64> for AttrValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// An object's attribute block: validated key/value fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeBlob {
    fields: BTreeMap<AttrKey, AttrValue>,
}

impl AttributeBlob {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a field, validating the value shape against the key.
    pub fn insert(&mut self, key: AttrKey, value: AttrValue) -> Result<(), TypeError> {
        if !key.accepts(&value) {
            return Err(TypeError::AttributeType {
                key: key.to_string(),
                kind: value.kind_name().to_string(),
            });
        }
        self.fields.insert(key, value);
        Ok(())
    }

    pub fn get(&self, key: AttrKey) -> Option<&AttrValue> {
        self.fields.get(&key)
    }

    pub fn remove(&mut self, key: AttrKey) -> Option<AttrValue> {
        self.fields.remove(&key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AttrKey, &AttrValue)> {
        self.fields.iter()
    }

    /// Rewrite object references through an id remap.
    ///
    /// Fields holding an object id as text (currently `Parent`) are replaced
    /// with the remapped id when the original appears in `remap`. Used when
    /// copying objects between stores so cross-references follow the copy.
    pub fn rewrite_references(&mut self, remap: &BTreeMap<ObjectId, ObjectId>) {
        if let Some(AttrValue::Text(s)) = self.fields.get(&AttrKey::Parent) {
            if let Ok(old) = ObjectId::parse(s) {
                if let Some(new) = remap.get(&old) {
                    self.fields
                        .insert(AttrKey::Parent, AttrValue::Text(new.to_string()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_validates_shape() {
        let mut blob = AttributeBlob::new();
        blob.insert(AttrKey::Name, AttrValue::from("bullseye")).unwrap();
        blob.insert(AttrKey::Active, AttrValue::from(true)).unwrap();

        let err = blob
            .insert(AttrKey::EndDepth, AttrValue::from("not a number"))
            .unwrap_err();
        assert!(matches!(err, TypeError::AttributeType { .. }));
        assert_eq!(blob.len(), 2);
    }

    #[test]
    fn collar_requires_three_numbers() {
        let mut blob = AttributeBlob::new();
        let good = AttrValue::List(vec![0.0.into(), 10.0.into(), 10.0.into()]);
        blob.insert(AttrKey::Collar, good).unwrap();

        let short = AttrValue::List(vec![0.0.into(), 10.0.into()]);
        assert!(blob.insert(AttrKey::Collar, short).is_err());

        let mixed = AttrValue::List(vec![0.0.into(), AttrValue::from("ten"), 10.0.into()]);
        assert!(blob.insert(AttrKey::Collar, mixed).is_err());
    }

    #[test]
    fn parent_must_be_an_id() {
        let mut blob = AttributeBlob::new();
        let id = ObjectId::new();
        blob.insert(AttrKey::Parent, AttrValue::Text(id.to_string()))
            .unwrap();
        assert!(blob
            .insert(AttrKey::Parent, AttrValue::from("not-an-id"))
            .is_err());
    }

    #[test]
    fn comment_accepts_null() {
        let mut blob = AttributeBlob::new();
        blob.insert(AttrKey::Comment, AttrValue::Null).unwrap();
        blob.insert(AttrKey::Comment, AttrValue::from("drilled twice"))
            .unwrap();
    }

    #[test]
    fn rewrite_parent_reference() {
        let old = ObjectId::new();
        let new = ObjectId::new();
        let mut blob = AttributeBlob::new();
        blob.insert(AttrKey::Parent, AttrValue::Text(old.to_string()))
            .unwrap();

        let mut remap = BTreeMap::new();
        remap.insert(old, new);
        blob.rewrite_references(&remap);

        assert_eq!(
            blob.get(AttrKey::Parent).and_then(AttrValue::as_text),
            Some(new.to_string().as_str())
        );
    }

    #[test]
    fn rewrite_leaves_unmapped_parent() {
        let old = ObjectId::new();
        let mut blob = AttributeBlob::new();
        blob.insert(AttrKey::Parent, AttrValue::Text(old.to_string()))
            .unwrap();

        blob.rewrite_references(&BTreeMap::new());
        assert_eq!(
            blob.get(AttrKey::Parent).and_then(AttrValue::as_text),
            Some(old.to_string().as_str())
        );
    }

    #[test]
    fn json_roundtrip_is_flat() {
        let mut blob = AttributeBlob::new();
        blob.insert(AttrKey::Name, AttrValue::from("well")).unwrap();
        blob.insert(AttrKey::EndDepth, AttrValue::from(120.5)).unwrap();
        blob.insert(
            AttrKey::Collar,
            AttrValue::List(vec![0.0.into(), 10.0.into(), 10.0.into()]),
        )
        .unwrap();

        let json = serde_json::to_string(&blob).unwrap();
        let back: AttributeBlob = serde_json::from_str(&json).unwrap();
        assert_eq!(blob, back);
        // Values encode as plain JSON scalars/lists, no enum tagging.
        assert!(json.contains("\"Name\":\"well\""));
        assert!(json.contains("\"EndDepth\":120.5"));
    }
}
