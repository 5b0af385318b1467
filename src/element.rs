use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, EnumAccess, VariantAccess, Visitor},
    ser::{SerializeMap, SerializeSeq, SerializeTupleVariant},
};
use std::fmt;

/// Reserved enum name under which CBOR tags cross the serde data model.
///
/// A tagged item is presented as the tuple variant `@@TAG@@::@@TAGGED@@(tag, item)`.
/// Several tags nest, outermost first. Only this crate's serializers and
/// deserializers know how to turn the variant back into major type 6 headers.
pub(crate) const TAG_ENUM: &str = "@@TAG@@";
pub(crate) const TAG_VARIANT: &str = "@@TAGGED@@";

/// Sign of a [`CborElement::Integer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    Positive,
    /// The element's value is `-(magnitude + 1)`.
    Negative,
}

/// Generic in-memory CBOR item.
///
/// Every variant carries the tag numbers attached to it, outermost first, so
/// `tag(100) tag(200) 1` is an integer with tags `[100, 200]`.
///
/// # Example
/// ```
/// use cbor_codec::{CborElement, CborMap, to_vec, from_slice};
///
/// let mut map = CborMap::new();
/// map.insert(CborElement::from("name"), CborElement::from("Alice"));
/// map.insert(CborElement::from(1), CborElement::from(-30).with_tags([7]));
/// let value = CborElement::map(map).with_tags([100, 200]);
///
/// let bytes = to_vec(&value).unwrap();
/// let decoded: CborElement = from_slice(&bytes).unwrap();
/// assert_eq!(value, decoded);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum CborElement {
    Integer {
        magnitude: u64,
        sign: Sign,
        tags: Vec<u64>,
    },
    /// Half, single and double precision all widen to `f64`.
    Float { value: f64, tags: Vec<u64> },
    Text { value: String, tags: Vec<u64> },
    ByteString { value: Vec<u8>, tags: Vec<u64> },
    Boolean { value: bool, tags: Vec<u64> },
    Null { tags: Vec<u64> },
    List {
        items: Vec<CborElement>,
        tags: Vec<u64>,
    },
    Map { entries: CborMap, tags: Vec<u64> },
}

impl CborElement {
    pub fn integer(value: i64) -> Self {
        if value >= 0 {
            CborElement::unsigned(value as u64)
        } else {
            CborElement::negative((-1 - value) as u64)
        }
    }

    pub fn unsigned(value: u64) -> Self {
        CborElement::Integer {
            magnitude: value,
            sign: Sign::Positive,
            tags: Vec::new(),
        }
    }

    /// The negative integer `-(magnitude + 1)`, as carried by major type 1.
    pub fn negative(magnitude: u64) -> Self {
        CborElement::Integer {
            magnitude,
            sign: Sign::Negative,
            tags: Vec::new(),
        }
    }

    pub fn float(value: f64) -> Self {
        CborElement::Float {
            value,
            tags: Vec::new(),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        CborElement::Text {
            value: value.into(),
            tags: Vec::new(),
        }
    }

    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        CborElement::ByteString {
            value: value.into(),
            tags: Vec::new(),
        }
    }

    pub fn boolean(value: bool) -> Self {
        CborElement::Boolean {
            value,
            tags: Vec::new(),
        }
    }

    pub fn null() -> Self {
        CborElement::Null { tags: Vec::new() }
    }

    pub fn list(items: Vec<CborElement>) -> Self {
        CborElement::List {
            items,
            tags: Vec::new(),
        }
    }

    pub fn map(entries: CborMap) -> Self {
        CborElement::Map {
            entries,
            tags: Vec::new(),
        }
    }

    /// Replaces the element's tags.
    pub fn with_tags(mut self, tags: impl Into<Vec<u64>>) -> Self {
        *self.tags_mut() = tags.into();
        self
    }

    /// Tags attached to this element, outermost first.
    pub fn tags(&self) -> &[u64] {
        match self {
            CborElement::Integer { tags, .. }
            | CborElement::Float { tags, .. }
            | CborElement::Text { tags, .. }
            | CborElement::ByteString { tags, .. }
            | CborElement::Boolean { tags, .. }
            | CborElement::Null { tags }
            | CborElement::List { tags, .. }
            | CborElement::Map { tags, .. } => tags,
        }
    }

    pub(crate) fn tags_mut(&mut self) -> &mut Vec<u64> {
        match self {
            CborElement::Integer { tags, .. }
            | CborElement::Float { tags, .. }
            | CborElement::Text { tags, .. }
            | CborElement::ByteString { tags, .. }
            | CborElement::Boolean { tags, .. }
            | CborElement::Null { tags }
            | CborElement::List { tags, .. }
            | CborElement::Map { tags, .. } => tags,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CborElement::Null { .. })
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CborElement::Boolean { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// The integer value as `i128`, which holds every CBOR integer.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            CborElement::Integer {
                magnitude,
                sign: Sign::Positive,
                ..
            } => Some(*magnitude as i128),
            CborElement::Integer {
                magnitude,
                sign: Sign::Negative,
                ..
            } => Some(-1 - *magnitude as i128),
            _ => None,
        }
    }

    /// The integer value, if it fits an `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_i128().and_then(|v| i64::try_from(v).ok())
    }

    /// The integer value, if it is non-negative.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            CborElement::Integer {
                magnitude,
                sign: Sign::Positive,
                ..
            } => Some(*magnitude),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CborElement::Float { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CborElement::Text { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            CborElement::ByteString { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[CborElement]> {
        match self {
            CborElement::List { items, .. } => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&CborMap> {
        match self {
            CborElement::Map { entries, .. } => Some(entries),
            _ => None,
        }
    }

    /// Short name of the variant, used in diagnostics.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            CborElement::Integer { .. } => "integer",
            CborElement::Float { .. } => "float",
            CborElement::Text { .. } => "text string",
            CborElement::ByteString { .. } => "byte string",
            CborElement::Boolean { .. } => "boolean",
            CborElement::Null { .. } => "null",
            CborElement::List { .. } => "list",
            CborElement::Map { .. } => "map",
        }
    }
}

impl From<i64> for CborElement {
    fn from(value: i64) -> Self {
        CborElement::integer(value)
    }
}

impl From<i32> for CborElement {
    fn from(value: i32) -> Self {
        CborElement::integer(value as i64)
    }
}

impl From<u64> for CborElement {
    fn from(value: u64) -> Self {
        CborElement::unsigned(value)
    }
}

impl From<f64> for CborElement {
    fn from(value: f64) -> Self {
        CborElement::float(value)
    }
}

impl From<bool> for CborElement {
    fn from(value: bool) -> Self {
        CborElement::boolean(value)
    }
}

impl From<&str> for CborElement {
    fn from(value: &str) -> Self {
        CborElement::text(value)
    }
}

impl From<String> for CborElement {
    fn from(value: String) -> Self {
        CborElement::text(value)
    }
}

impl From<Vec<CborElement>> for CborElement {
    fn from(items: Vec<CborElement>) -> Self {
        CborElement::list(items)
    }
}

impl From<CborMap> for CborElement {
    fn from(entries: CborMap) -> Self {
        CborElement::map(entries)
    }
}

/// Insertion-ordered map with arbitrary element keys.
///
/// Inserting an existing key replaces its value in place. Equality ignores order.
#[derive(Debug, Clone, Default)]
pub struct CborMap {
    entries: Vec<(CborElement, CborElement)>,
}

impl CborMap {
    pub fn new() -> Self {
        CborMap::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        CborMap {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Inserts an entry, returning the previous value of an equal key.
    pub fn insert(&mut self, key: CborElement, value: CborElement) -> Option<CborElement> {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &CborElement) -> Option<&CborElement> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Looks up a text key.
    pub fn get_str(&self, key: &str) -> Option<&CborElement> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CborElement, &CborElement)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &CborElement> {
        self.entries.iter().map(|(k, _)| k)
    }
}

impl PartialEq for CborMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|o| o == v))
    }
}

impl FromIterator<(CborElement, CborElement)> for CborMap {
    fn from_iter<I: IntoIterator<Item = (CborElement, CborElement)>>(iter: I) -> Self {
        let mut map = CborMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl IntoIterator for CborMap {
    type Item = (CborElement, CborElement);
    type IntoIter = std::vec::IntoIter<(CborElement, CborElement)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

// Diagnostic notation, RFC 8949 section 8
impl fmt::Display for CborElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for tag in self.tags() {
            write!(f, "{tag}(")?;
        }
        match self {
            CborElement::Integer { .. } => match self.as_i128() {
                Some(v) => write!(f, "{v}")?,
                None => f.write_str("?")?,
            },
            CborElement::Float { value, .. } => {
                if value.is_nan() {
                    f.write_str("NaN")?
                } else if value.is_infinite() {
                    f.write_str(if *value > 0.0 { "Infinity" } else { "-Infinity" })?
                } else {
                    write!(f, "{value:?}")?
                }
            }
            CborElement::Text { value, .. } => write!(f, "{value:?}")?,
            CborElement::ByteString { value, .. } => {
                f.write_str("h'")?;
                for b in value {
                    write!(f, "{b:02x}")?;
                }
                f.write_str("'")?;
            }
            CborElement::Boolean { value, .. } => write!(f, "{value}")?,
            CborElement::Null { .. } => f.write_str("null")?,
            CborElement::List { items, .. } => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")?;
            }
            CborElement::Map { entries, .. } => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")?;
            }
        }
        for _ in self.tags() {
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Serializes `element` wrapped in the remaining `tags`, outermost first.
struct WithTags<'a> {
    tags: &'a [u64],
    element: &'a CborElement,
}

impl Serialize for WithTags<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.tags.split_first() {
            Some((tag, rest)) => {
                let mut tv = serializer.serialize_tuple_variant(TAG_ENUM, 0, TAG_VARIANT, 2)?;
                tv.serialize_field(tag)?;
                tv.serialize_field(&WithTags {
                    tags: rest,
                    element: self.element,
                })?;
                tv.end()
            }
            None => self.element.serialize_untagged(serializer),
        }
    }
}

impl CborElement {
    fn serialize_untagged<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CborElement::Integer {
                magnitude,
                sign: Sign::Positive,
                ..
            } => serializer.serialize_u64(*magnitude),
            CborElement::Integer {
                magnitude,
                sign: Sign::Negative,
                ..
            } => match i64::try_from(*magnitude) {
                Ok(m) => serializer.serialize_i64(-1 - m),
                Err(_) => serializer.serialize_i128(-1 - *magnitude as i128),
            },
            CborElement::Float { value, .. } => serializer.serialize_f64(*value),
            CborElement::Text { value, .. } => serializer.serialize_str(value),
            CborElement::ByteString { value, .. } => serializer.serialize_bytes(value),
            CborElement::Boolean { value, .. } => serializer.serialize_bool(*value),
            CborElement::Null { .. } => serializer.serialize_none(),
            CborElement::List { items, .. } => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            CborElement::Map { entries, .. } => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries.iter() {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

impl Serialize for CborElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WithTags {
            tags: self.tags(),
            element: self,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CborElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_newtype_struct(TAG_ENUM, ElementVisitor)
    }
}

struct ElementVisitor;

impl<'de> Visitor<'de> for ElementVisitor {
    type Value = CborElement;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("any valid CBOR value")
    }

    fn visit_bool<E>(self, value: bool) -> Result<CborElement, E> {
        Ok(CborElement::boolean(value))
    }

    fn visit_i64<E>(self, value: i64) -> Result<CborElement, E> {
        Ok(CborElement::integer(value))
    }

    fn visit_u64<E>(self, value: u64) -> Result<CborElement, E> {
        Ok(CborElement::unsigned(value))
    }

    fn visit_i128<E: de::Error>(self, value: i128) -> Result<CborElement, E> {
        if value >= 0 {
            u64::try_from(value)
                .map(CborElement::unsigned)
                .map_err(|_| E::custom(format!("integer {value} does not fit CBOR")))
        } else {
            u64::try_from(-1 - value)
                .map(CborElement::negative)
                .map_err(|_| E::custom(format!("integer {value} does not fit CBOR")))
        }
    }

    fn visit_u128<E: de::Error>(self, value: u128) -> Result<CborElement, E> {
        u64::try_from(value)
            .map(CborElement::unsigned)
            .map_err(|_| E::custom(format!("integer {value} does not fit CBOR")))
    }

    fn visit_f32<E>(self, value: f32) -> Result<CborElement, E> {
        Ok(CborElement::float(value as f64))
    }

    fn visit_f64<E>(self, value: f64) -> Result<CborElement, E> {
        Ok(CborElement::float(value))
    }

    fn visit_str<E>(self, value: &str) -> Result<CborElement, E> {
        Ok(CborElement::text(value))
    }

    fn visit_string<E>(self, value: String) -> Result<CborElement, E> {
        Ok(CborElement::text(value))
    }

    fn visit_bytes<E>(self, value: &[u8]) -> Result<CborElement, E> {
        Ok(CborElement::bytes(value))
    }

    fn visit_byte_buf<E>(self, value: Vec<u8>) -> Result<CborElement, E> {
        Ok(CborElement::bytes(value))
    }

    fn visit_none<E>(self) -> Result<CborElement, E> {
        Ok(CborElement::null())
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<CborElement, D::Error> {
        Deserialize::deserialize(deserializer)
    }

    // formats without tags report the reserved name as a plain newtype
    fn visit_newtype_struct<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> Result<CborElement, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_unit<E>(self) -> Result<CborElement, E> {
        Ok(CborElement::null())
    }

    fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<CborElement, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(1024));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(CborElement::list(items))
    }

    fn visit_map<A: de::MapAccess<'de>>(self, mut map: A) -> Result<CborElement, A::Error> {
        let mut entries = CborMap::with_capacity(map.size_hint().unwrap_or(0).min(1024));
        while let Some((k, v)) = map.next_entry()? {
            entries.insert(k, v);
        }
        Ok(CborElement::map(entries))
    }

    fn visit_enum<A: EnumAccess<'de>>(self, data: A) -> Result<CborElement, A::Error> {
        let (TagVariant, variant) = data.variant()?;
        variant.tuple_variant(2, TaggedElementVisitor)
    }
}

/// Identifier of the reserved tag variant; any other variant name is rejected.
pub(crate) struct TagVariant;

impl<'de> Deserialize<'de> for TagVariant {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NameVisitor;

        impl Visitor<'_> for NameVisitor {
            type Value = TagVariant;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(formatter, "the variant name {TAG_VARIANT}")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<TagVariant, E> {
                if value == TAG_VARIANT {
                    Ok(TagVariant)
                } else {
                    Err(E::unknown_variant(value, &[TAG_VARIANT]))
                }
            }
        }

        deserializer.deserialize_identifier(NameVisitor)
    }
}

struct TaggedElementVisitor;

impl<'de> Visitor<'de> for TaggedElementVisitor {
    type Value = CborElement;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a tag number followed by a CBOR value")
    }

    fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<CborElement, A::Error> {
        let tag: u64 = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let mut element: CborElement = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
        element.tags_mut().insert(0, tag);
        Ok(element)
    }
}
