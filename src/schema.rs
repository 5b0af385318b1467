//! CBOR annotations for serde structures.
//!
//! serde's derive already tells the codec which fields a struct has and in which
//! order. What it cannot express are the CBOR-specific annotations: integer
//! labels, tag numbers on keys, values and whole objects, byte-string fields,
//! array framing and the empty-map null encoding. Those are registered here,
//! keyed by the struct name serde reports (after `#[serde(rename)]`).
//!
//! ```
//! use cbor_codec::{Cbor, CborConfig, FieldDescriptor, Schema, StructDescriptor};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Header {
//!     alg: i64,
//! }
//!
//! let schema = Schema::new().with(
//!     StructDescriptor::new("Header").field(FieldDescriptor::new("alg").label(1)),
//! );
//! let cbor = Cbor::new(CborConfig::cose_compliant(), schema);
//! assert_eq!(cbor.to_vec(&Header { alg: -7 }).unwrap(), vec![0xa1, 0x01, 0x26]);
//! ```

use std::collections::HashMap;

/// Annotations of one structure field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub(crate) name: String,
    pub(crate) label: Option<i64>,
    pub(crate) key_tags: Vec<u64>,
    pub(crate) value_tags: Vec<u64>,
    pub(crate) byte_string: bool,
    pub(crate) null_as_empty_map: bool,
}

impl FieldDescriptor {
    /// `name` is the serialized field name.
    pub fn new(name: impl Into<String>) -> Self {
        FieldDescriptor {
            name: name.into(),
            ..FieldDescriptor::default()
        }
    }

    /// Integer key written instead of the name when labels are preferred.
    pub fn label(mut self, label: i64) -> Self {
        self.label = Some(label);
        self
    }

    /// Tags written before (and verified on) the field's key.
    pub fn key_tags(mut self, tags: impl Into<Vec<u64>>) -> Self {
        self.key_tags = tags.into();
        self
    }

    /// Tags written before (and verified on) the field's value.
    pub fn value_tags(mut self, tags: impl Into<Vec<u64>>) -> Self {
        self.value_tags = tags.into();
        self
    }

    /// Encode a sequence of `u8` as one CBOR byte string; on decode a byte string
    /// is accepted where a sequence is expected.
    pub fn byte_string(mut self) -> Self {
        self.byte_string = true;
        self
    }

    /// Write `None` as an empty map (`0xA0`) instead of null. Used for optional
    /// nested structures whose peers expect `{}` for absence.
    pub fn null_as_empty_map(mut self) -> Self {
        self.null_as_empty_map = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Annotations of one structure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructDescriptor {
    pub(crate) name: String,
    pub(crate) fields: Vec<FieldDescriptor>,
    pub(crate) object_tags: Vec<u64>,
    pub(crate) as_array: bool,
}

impl StructDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        StructDescriptor {
            name: name.into(),
            ..StructDescriptor::default()
        }
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Tags written before every instance of the structure, after any value
    /// tags of the field holding it.
    pub fn object_tags(mut self, tags: impl Into<Vec<u64>>) -> Self {
        self.object_tags = tags.into();
        self
    }

    /// Frame the structure as a CBOR array of field values, without keys.
    pub fn as_array(mut self) -> Self {
        self.as_array = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn field_named(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub(crate) fn field_labelled(&self, label: i64) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.label == Some(label))
    }
}

/// Registry of [`StructDescriptor`]s, looked up by struct name. A struct
/// variant is registered as `"Enum::Variant"`, so it never shares annotations
/// with a struct that happens to have the variant's name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    structs: HashMap<String, StructDescriptor>,
}

impl Schema {
    pub fn new() -> Self {
        Schema::default()
    }

    pub fn with(mut self, descriptor: StructDescriptor) -> Self {
        self.insert(descriptor);
        self
    }

    /// Registers `descriptor`, replacing any previous one with the same name.
    pub fn insert(&mut self, descriptor: StructDescriptor) {
        self.structs.insert(descriptor.name.clone(), descriptor);
    }

    pub fn get(&self, name: &str) -> Option<&StructDescriptor> {
        self.structs.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.structs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let schema = Schema::new().with(
            StructDescriptor::new("Point")
                .field(FieldDescriptor::new("x").label(1))
                .field(FieldDescriptor::new("y").label(-2).value_tags([7]))
                .object_tags([100]),
        );
        let point = schema.get("Point").unwrap();
        assert_eq!(point.field_named("y").unwrap().value_tags, vec![7]);
        assert_eq!(point.field_labelled(1).unwrap().name(), "x");
        assert!(point.field_labelled(3).is_none());
        assert!(schema.get("Line").is_none());
    }

    #[test]
    fn test_insert_replaces() {
        let mut schema = Schema::new().with(StructDescriptor::new("A").as_array());
        schema.insert(StructDescriptor::new("A"));
        assert!(!schema.get("A").unwrap().as_array);
    }
}
