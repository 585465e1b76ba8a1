//! User-facing schema descriptions.
//!
//! A [`SchemaDefinition`] is an ordered mapping from field name to
//! [`FieldDefinition`], usually loaded from JSON:
//!
//! ```json
//! {
//!   "name":  { "type": "UTF8" },
//!   "price": { "type": "DOUBLE", "optional": true },
//!   "tags":  { "type": "UTF8", "repeated": true, "compression": "SNAPPY" }
//! }
//! ```
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::encodings::Encoding;
use crate::Compression;

/// Ordered field definitions. Declaration order is column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDefinition {
    fields: Vec<(String, FieldDefinition)>,
}

impl SchemaDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, definition: FieldDefinition) -> Self {
        self.insert(name, definition);
        self
    }

    /// Inserts or replaces a field, keeping the position of a replaced one.
    pub fn insert(&mut self, name: impl Into<String>, definition: FieldDefinition) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = definition,
            None => self.fields.push((name, definition)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldDefinition)> {
        self.fields.iter().map(|(n, f)| (n.as_str(), f))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, FieldDefinition)> for SchemaDefinition {
    fn from_iter<I: IntoIterator<Item = (K, FieldDefinition)>>(iter: I) -> Self {
        let mut def = SchemaDefinition::new();
        for (name, field) in iter {
            def.insert(name, field);
        }
        def
    }
}

impl Serialize for SchemaDefinition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, field) in &self.fields {
            map.serialize_entry(name, field)?;
        }
        map.end()
    }
}

struct SchemaDefinitionVisitor;

impl<'de> Visitor<'de> for SchemaDefinitionVisitor {
    type Value = SchemaDefinition;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of field names to field definitions")
    }

    fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Self::Value, M::Error> {
        let mut def = SchemaDefinition::new();
        while let Some((name, field)) = access.next_entry::<String, FieldDefinition>()? {
            def.insert(name, field);
        }
        Ok(def)
    }
}

impl<'de> Deserialize<'de> for SchemaDefinition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(SchemaDefinitionVisitor)
    }
}

/// One field of a schema definition. A definition with `fields` is a group;
/// otherwise it is a leaf and `type` is required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldDefinition {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub repeated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<Encoding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression: Option<Compression>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<SchemaDefinition>,
}

impl FieldDefinition {
    /// A leaf of the given type tag, e.g. `"INT64"` or `"UTF8"`.
    pub fn leaf(type_: impl Into<String>) -> Self {
        Self {
            type_: Some(type_.into()),
            ..Default::default()
        }
    }

    pub fn group(fields: SchemaDefinition) -> Self {
        Self {
            fields: Some(fields),
            ..Default::default()
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }

    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn with_type_length(mut self, type_length: usize) -> Self {
        self.type_length = Some(type_length);
        self
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }
}

pub fn string_field(optional: bool) -> FieldDefinition {
    FieldDefinition::leaf("UTF8").with_optional(optional)
}

pub fn boolean_field(optional: bool) -> FieldDefinition {
    FieldDefinition::leaf("BOOLEAN").with_optional(optional)
}

/// `size` is 32 or 64.
pub fn int_field(size: u8, optional: bool) -> FieldDefinition {
    FieldDefinition::leaf(format!("INT{size}")).with_optional(optional)
}

pub fn float_field(optional: bool) -> FieldDefinition {
    FieldDefinition::leaf("FLOAT").with_optional(optional)
}

pub fn double_field(optional: bool) -> FieldDefinition {
    FieldDefinition::leaf("DOUBLE").with_optional(optional)
}

pub fn decimal_field(precision: u32, scale: u32, optional: bool) -> FieldDefinition {
    FieldDefinition {
        precision: Some(precision),
        scale: Some(scale),
        ..FieldDefinition::leaf("DECIMAL")
    }
    .with_optional(optional)
}

pub fn timestamp_field(optional: bool) -> FieldDefinition {
    FieldDefinition::leaf("TIMESTAMP_MILLIS").with_optional(optional)
}

pub fn struct_field(fields: SchemaDefinition, optional: bool) -> FieldDefinition {
    FieldDefinition::group(fields).with_optional(optional)
}

/// `LIST` group of the standard three-level shape:
/// `<name> (LIST) -> list (repeated) -> element`.
pub fn list_field(element: FieldDefinition, optional: bool) -> FieldDefinition {
    FieldDefinition {
        type_: Some("LIST".to_owned()),
        optional,
        fields: Some(SchemaDefinition::new().field(
            "list",
            FieldDefinition::group(SchemaDefinition::new().field("element", element)).repeated(),
        )),
        ..Default::default()
    }
}

/// A list of optional scalar elements of `type_`.
pub fn scalar_list_field(type_: &str, optional: bool) -> FieldDefinition {
    list_field(FieldDefinition::leaf(type_).optional(), optional)
}

/// A list whose elements are required structs of `fields`.
pub fn struct_list_field(fields: SchemaDefinition, optional: bool) -> FieldDefinition {
    list_field(FieldDefinition::group(fields), optional)
}
