use crate::element::{TAG_ENUM, TAG_VARIANT, TagVariant};
use serde::de::{self, EnumAccess, VariantAccess, Visitor};
use serde::ser::SerializeTupleVariant;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;

/// A value with the CBOR tags in front of it, outermost first.
///
/// Reads from tagged or plain input: a value without tags comes back with an
/// empty tag list, so the same type works with self-describing formats that
/// have no tags at all.
#[derive(Debug, Clone, PartialEq)]
pub struct Tagged<T> {
    pub tags: Vec<u64>,
    pub value: T,
}

impl<T> Tagged<T> {
    pub fn new(tags: impl Into<Vec<u64>>, value: T) -> Self {
        Tagged {
            tags: tags.into(),
            value,
        }
    }

    pub fn untagged(value: T) -> Self {
        Tagged {
            tags: Vec::new(),
            value,
        }
    }

    /// The outermost tag, if any.
    pub fn tag(&self) -> Option<u64> {
        self.tags.first().copied()
    }
}

struct Layers<'a, T> {
    tags: &'a [u64],
    value: &'a T,
}

impl<T: Serialize> Serialize for Layers<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.tags.split_first() {
            Some((tag, rest)) => {
                let mut tv = serializer.serialize_tuple_variant(TAG_ENUM, 0, TAG_VARIANT, 2)?;
                tv.serialize_field(tag)?;
                tv.serialize_field(&Layers {
                    tags: rest,
                    value: self.value,
                })?;
                tv.end()
            }
            None => self.value.serialize(serializer),
        }
    }
}

impl<T: Serialize> Serialize for Tagged<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Layers {
            tags: &self.tags,
            value: &self.value,
        }
        .serialize(serializer)
    }
}

// Plain values are handed on to T; tag layers are peeled one at a time.
impl<'de, T> Deserialize<'de> for Tagged<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_newtype_struct(
            TAG_ENUM,
            TaggedVisitor {
                marker: PhantomData,
            },
        )
    }
}

struct TaggedVisitor<T> {
    marker: PhantomData<T>,
}

macro_rules! plain {
    ($($method:ident($ty:ty) => $de:ident;)*) => {
        $(
            fn $method<E: de::Error>(self, v: $ty) -> Result<Tagged<T>, E> {
                T::deserialize(de::value::$de::new(v)).map(Tagged::untagged)
            }
        )*
    };
}

impl<'de, T> Visitor<'de> for TaggedVisitor<T>
where
    T: Deserialize<'de>,
{
    type Value = Tagged<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a tagged value or a plain value")
    }

    plain! {
        visit_bool(bool) => BoolDeserializer;
        visit_i64(i64) => I64Deserializer;
        visit_i128(i128) => I128Deserializer;
        visit_u64(u64) => U64Deserializer;
        visit_f64(f64) => F64Deserializer;
        visit_str(&str) => StrDeserializer;
        visit_borrowed_str(&'de str) => BorrowedStrDeserializer;
        visit_string(String) => StringDeserializer;
        visit_bytes(&[u8]) => BytesDeserializer;
        visit_borrowed_bytes(&'de [u8]) => BorrowedBytesDeserializer;
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Tagged<T>, E> {
        T::deserialize(de::value::BytesDeserializer::new(&v)).map(Tagged::untagged)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Tagged<T>, E> {
        T::deserialize(de::value::UnitDeserializer::new()).map(Tagged::untagged)
    }

    fn visit_seq<A: de::SeqAccess<'de>>(self, seq: A) -> Result<Tagged<T>, A::Error> {
        T::deserialize(de::value::SeqAccessDeserializer::new(seq)).map(Tagged::untagged)
    }

    fn visit_map<A: de::MapAccess<'de>>(self, map: A) -> Result<Tagged<T>, A::Error> {
        T::deserialize(de::value::MapAccessDeserializer::new(map)).map(Tagged::untagged)
    }

    fn visit_newtype_struct<D: Deserializer<'de>>(self, deserializer: D) -> Result<Tagged<T>, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_enum<A: EnumAccess<'de>>(self, data: A) -> Result<Tagged<T>, A::Error> {
        let (TagVariant, variant) = data.variant()?;
        variant.tuple_variant(2, LayerVisitor { marker: PhantomData })
    }
}

struct LayerVisitor<T> {
    marker: PhantomData<T>,
}

impl<'de, T> Visitor<'de> for LayerVisitor<T>
where
    T: Deserialize<'de>,
{
    type Value = Tagged<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a tag number followed by a value")
    }

    fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Tagged<T>, A::Error> {
        let tag: u64 = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let mut inner: Tagged<T> = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
        inner.tags.insert(0, tag);
        Ok(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_deserialize_from_json_string() {
        // From JSON: plain string should deserialize to Tagged with no tag
        let json = r#""https://example.com""#;
        let tagged: Tagged<String> = serde_json::from_str(json).unwrap();

        assert_eq!(tagged.tag(), None);
        assert_eq!(tagged.value, "https://example.com");
    }

    #[test]
    fn test_tagged_deserialize_plain_number() {
        let tagged: Tagged<u32> = serde_json::from_str("42").unwrap();
        assert!(tagged.tags.is_empty());
        assert_eq!(tagged.value, 42);
    }

    #[test]
    fn test_tagged_round_trip() {
        let original = Tagged::new([32], "https://example.com".to_string());
        let cbor = crate::to_vec(&original).unwrap();
        assert_eq!(&cbor[..2], &[0xd8, 0x20]);
        let decoded: Tagged<String> = crate::from_slice(&cbor).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_nested_tags_outermost_first() {
        let original = Tagged::new([1, 2], vec![5u8, 6]);
        let cbor = crate::to_vec(&original).unwrap();
        assert_eq!(&cbor[..2], &[0xc1, 0xc2]);
        let decoded: Tagged<Vec<u8>> = crate::from_slice(&cbor).unwrap();
        assert_eq!(decoded.tags, vec![1, 2]);
        assert_eq!(decoded.value, vec![5, 6]);
    }

    #[test]
    fn test_tagged_from_untagged_cbor() {
        let decoded: Tagged<i64> = crate::from_slice(&[0x38, 0x63]).unwrap();
        assert_eq!(decoded, Tagged::untagged(-100));
    }
}
