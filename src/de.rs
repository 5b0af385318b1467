use crate::Cbor;
use crate::element::{TAG_ENUM, TAG_VARIANT};
use crate::error::{CborError, Result};
use crate::parser::{Key, Kind, Parser, describe_kind};
use crate::schema::{FieldDescriptor, StructDescriptor};
use serde::de::value::{SeqDeserializer, StrDeserializer, U64Deserializer};
use serde::de::{self, DeserializeSeed, IntoDeserializer, Visitor};
use std::borrow::Cow;

/// serde `Deserializer` reading from a [`Parser`].
///
/// Works the same over encoded bytes and over a decoded element tree; only the
/// parser differs.
pub(crate) struct Deserializer<'c, P> {
    parser: P,
    cbor: &'c Cbor,
    /// Annotation of the field whose value is read next.
    field: Option<&'c FieldDescriptor>,
    depth: usize,
}

impl<'de, 'c, P: Parser<'de>> Deserializer<'c, P> {
    pub fn new(parser: P, cbor: &'c Cbor) -> Self {
        Deserializer {
            parser,
            cbor,
            field: None,
            depth: 0,
        }
    }

    pub fn parser_mut(&mut self) -> &mut P {
        &mut self.parser
    }

    /// Fails if anything follows the value that was read.
    pub fn end(&self) -> Result<()> {
        if self.parser.is_eof() {
            Ok(())
        } else {
            Err(CborError::TrailingData(self.parser.remaining()))
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.cbor.config.max_depth {
            tracing::debug!(max_depth = self.cbor.config.max_depth, "CBOR nesting too deep");
            return Err(CborError::DepthLimitExceeded(self.cbor.config.max_depth));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Declared value tags of `field`, if they are to be verified.
    fn expected_value_tags(&self, field: Option<&'c FieldDescriptor>) -> &'c [u64] {
        match field {
            Some(field) if self.cbor.config.verify_value_tags => &field.value_tags,
            _ => &[],
        }
    }

    /// Checks the tags in front of the current item against the field's value
    /// tags and leaves them pending.
    fn pending_value_tags(&mut self, field: Option<&'c FieldDescriptor>) -> Result<()> {
        self.parser.collect_tags()?;
        let expected = self.expected_value_tags(field);
        if !expected.is_empty() && self.parser.pending_tags() != expected {
            return Err(CborError::tags(
                self.parser.pending_tags(),
                expected,
                "match expected",
            ));
        }
        Ok(())
    }

    /// Consumes the tags in front of a scalar, list or map and checks them
    /// against the field's value tags.
    fn value_tags(&mut self, field: Option<&'c FieldDescriptor>) -> Result<()> {
        let expected = self.expected_value_tags(field);
        self.parser.process_tags(expected, !expected.is_empty())
    }

    /// Consumes the tags in front of a structure. Object tags, when verified,
    /// must follow the value tags exactly; otherwise the value tags only have to
    /// be a prefix.
    fn structure_tags(
        &mut self,
        field: Option<&'c FieldDescriptor>,
        descriptor: Option<&'c StructDescriptor>,
    ) -> Result<()> {
        let value_tags = self.expected_value_tags(field);
        let object_tags = match descriptor {
            Some(descriptor) if self.cbor.config.verify_object_tags => &descriptor.object_tags[..],
            _ => &[],
        };
        if object_tags.is_empty() {
            return self.parser.process_tags(value_tags, false);
        }
        let expected: Vec<u64> = value_tags.iter().chain(object_tags).copied().collect();
        self.parser.process_tags(&expected, true)
    }

    fn integer(&mut self) -> Result<i128> {
        let field = self.field.take();
        self.value_tags(field)?;
        self.parser.next_integer()
    }

    fn scalar(&mut self) -> Result<()> {
        let field = self.field.take();
        self.value_tags(field)
    }

    fn read_seq<V: Visitor<'de>>(&mut self, visitor: V) -> Result<V::Value> {
        self.enter()?;
        let length = self.parser.start_array()?;
        let mut access = Access::new(self, length);
        let value = visitor.visit_seq(&mut access)?;
        access.finish()?;
        Ok(value)
    }

    fn read_map<V: Visitor<'de>>(&mut self, visitor: V) -> Result<V::Value> {
        self.enter()?;
        let length = self.parser.start_map()?;
        let mut access = Access::new(self, length);
        let value = visitor.visit_map(&mut access)?;
        access.finish()?;
        Ok(value)
    }

    fn read_struct<V: Visitor<'de>>(
        &mut self,
        name: &str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        let field = self.field.take();
        let descriptor = self.cbor.schema.get(name);
        self.structure_tags(field, descriptor)?;
        self.enter()?;
        if descriptor.is_some_and(|d| d.as_array) {
            let length = self.parser.start_array()?;
            let mut access = Access::new(self, length);
            access.positional = Some((descriptor, fields));
            let value = visitor.visit_seq(&mut access)?;
            access.finish()?;
            return Ok(value);
        }
        let length = self.parser.start_map()?;
        let mut access = Access::new(self, length);
        access.structure = Some(StructInfo {
            name: name.to_string(),
            descriptor,
            fields,
        });
        let value = visitor.visit_map(&mut access)?;
        access.finish()?;
        Ok(value)
    }
}

macro_rules! deserialize_integer {
    ($($method:ident => $ty:ty, $visit:ident, $range:literal;)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
                let value = self.integer()?;
                let narrowed = <$ty>::try_from(value).map_err(|_| CborError::OutOfRange {
                    value,
                    target: stringify!($ty),
                    range: $range,
                })?;
                visitor.$visit(narrowed)
            }
        )*
    };
}

impl<'de, 'c, P: Parser<'de>> de::Deserializer<'de> for &mut Deserializer<'c, P> {
    type Error = CborError;

    // Tags are passed over here; only the tag-aware types ask for them, through
    // `deserialize_newtype_struct` with the reserved name.
    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let field = self.field.take();
        self.pending_value_tags(field)?;
        self.parser.take_tags();

        match self.parser.kind() {
            Kind::Unsigned => {
                let value = self.parser.next_integer()?;
                visitor.visit_u64(value as u64)
            }
            Kind::Negative => {
                let value = self.parser.next_integer()?;
                match i64::try_from(value) {
                    Ok(value) => visitor.visit_i64(value),
                    Err(_) => visitor.visit_i128(value),
                }
            }
            Kind::Bytes => match self.parser.next_bytes()? {
                Cow::Borrowed(bytes) => visitor.visit_borrowed_bytes(bytes),
                Cow::Owned(bytes) => visitor.visit_byte_buf(bytes),
            },
            Kind::Text => match self.parser.next_text()? {
                Cow::Borrowed(text) => visitor.visit_borrowed_str(text),
                Cow::Owned(text) => visitor.visit_string(text),
            },
            Kind::Array => self.read_seq(visitor),
            Kind::Map => self.read_map(visitor),
            Kind::Float => visitor.visit_f64(self.parser.next_double()?),
            Kind::Bool => visitor.visit_bool(self.parser.next_bool()?),
            Kind::Null => {
                self.parser.next_null()?;
                visitor.visit_unit()
            }
            Kind::Eof => Err(CborError::eof()),
            other => Err(CborError::UnexpectedItem {
                expected: "data item".into(),
                found: describe_kind(other),
            }),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.scalar()?;
        visitor.visit_bool(self.parser.next_bool()?)
    }

    deserialize_integer! {
        deserialize_i8 => i8, visit_i8, "[-128..127]";
        deserialize_i16 => i16, visit_i16, "[-32768..32767]";
        deserialize_i32 => i32, visit_i32, "[-2147483648..2147483647]";
        deserialize_i64 => i64, visit_i64, "[-9223372036854775808..9223372036854775807]";
        deserialize_u8 => u8, visit_u8, "[0..255]";
        deserialize_u16 => u16, visit_u16, "[0..65535]";
        deserialize_u32 => u32, visit_u32, "[0..4294967295]";
        deserialize_u64 => u64, visit_u64, "[0..18446744073709551615]";
        deserialize_u128 => u128, visit_u128, "[0..18446744073709551615]";
    }

    fn deserialize_i128<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let value = self.integer()?;
        visitor.visit_i128(value)
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.scalar()?;
        visitor.visit_f32(self.parser.next_float()?)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.scalar()?;
        visitor.visit_f64(self.parser.next_double()?)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.scalar()?;
        let text = self.parser.next_text()?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => visitor.visit_char(c),
            _ => Err(CborError::UnexpectedItem {
                expected: "single character".into(),
                found: "text string",
            }),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.scalar()?;
        match self.parser.next_text()? {
            Cow::Borrowed(text) => visitor.visit_borrowed_str(text),
            Cow::Owned(text) => visitor.visit_string(text),
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.scalar()?;
        match self.parser.next_bytes()? {
            Cow::Borrowed(bytes) => visitor.visit_borrowed_bytes(bytes),
            Cow::Owned(bytes) => visitor.visit_byte_buf(bytes),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.parser.collect_tags()?;
        if self.parser.is_null() {
            self.field = None;
            self.parser.take_tags();
            self.parser.next_null()?;
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.scalar()?;
        self.parser.next_null()?;
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        if name != TAG_ENUM {
            return visitor.visit_newtype_struct(self);
        }
        let field = self.field.take();
        self.pending_value_tags(field)?;
        if self.parser.pending_tags().is_empty() {
            return self.deserialize_any(visitor);
        }
        self.enter()?;
        let value = visitor.visit_enum(TagAccess { de: &mut *self })?;
        self.leave();
        Ok(value)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let field = self.field.take();
        self.value_tags(field)?;
        if field.is_some_and(|f| f.byte_string) && self.parser.kind() == Kind::Bytes {
            let bytes = self.parser.next_bytes()?;
            let mut seq = SeqDeserializer::<_, CborError>::new(bytes.iter().copied());
            let value = visitor.visit_seq(&mut seq)?;
            seq.end()?;
            return Ok(value);
        }
        self.read_seq(visitor)
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.scalar()?;
        self.read_map(visitor)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        self.read_struct(name, fields, visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        self.scalar()?;
        match self.parser.kind() {
            Kind::Text => {
                let variant = self.parser.next_text()?;
                visitor.visit_enum(StrDeserializer::<CborError>::new(&variant))
            }
            Kind::Map => {
                self.enter()?;
                let length = self.parser.start_map()?;
                if length.is_some_and(|pairs| pairs != 1) {
                    return Err(CborError::InvalidLength {
                        length: length.unwrap_or(0) as u64,
                        reason: "an enum variant map holds exactly one entry",
                    });
                }
                let value = visitor.visit_enum(VariantAccess {
                    de: &mut *self,
                    name,
                    variant: String::new(),
                })?;
                if length.is_none() {
                    self.parser.end()?;
                }
                self.leave();
                Ok(value)
            }
            other => Err(CborError::UnexpectedItem {
                expected: "enum variant name or one-entry map".into(),
                found: describe_kind(other),
            }),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.scalar()?;
        match self.parser.kind() {
            Kind::Unsigned | Kind::Negative => {
                let value = self.parser.next_integer()?;
                match u64::try_from(value) {
                    Ok(value) => visitor.visit_u64(value),
                    Err(_) => visitor.visit_i64(value as i64),
                }
            }
            _ => self.deserialize_str(visitor),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.field = None;
        self.parser.skip_element()?;
        visitor.visit_unit()
    }

    fn is_human_readable(&self) -> bool {
        false
    }
}

/// Struct being read as a map: keys resolve to serde field names.
struct StructInfo<'c> {
    name: String,
    descriptor: Option<&'c StructDescriptor>,
    fields: &'static [&'static str],
}

/// Items of one array, map or structure.
struct Access<'a, 'c, P> {
    de: &'a mut Deserializer<'c, P>,
    /// Items (pairs for maps) left in a definite container; `None` when the
    /// container ends with a break.
    remaining: Option<usize>,
    structure: Option<StructInfo<'c>>,
    /// Array-framed structure: each position is the next declared field.
    positional: Option<(Option<&'c StructDescriptor>, &'static [&'static str])>,
    index: usize,
}

impl<'de, 'a, 'c, P: Parser<'de>> Access<'a, 'c, P> {
    fn new(de: &'a mut Deserializer<'c, P>, remaining: Option<usize>) -> Self {
        Access {
            de,
            remaining,
            structure: None,
            positional: None,
            index: 0,
        }
    }

    fn has_next(&mut self) -> bool {
        match &mut self.remaining {
            Some(0) => false,
            Some(n) => {
                *n -= 1;
                true
            }
            None => !self.de.parser.is_end(),
        }
    }

    fn finish(self) -> Result<()> {
        match self.remaining {
            None => self.de.parser.end()?,
            Some(0) => {}
            Some(n) => {
                return Err(CborError::Message(format!(
                    "{n} items left in a container after the value was complete"
                )));
            }
        }
        self.de.leave();
        Ok(())
    }

    fn structure_name(&self) -> &str {
        self.structure.as_ref().map_or("", |s| s.name.as_str())
    }

    /// Maps a key to a field name of the structure being read, skipping
    /// unknown entries if configured to. `None` at the end of the map.
    fn next_field(&mut self) -> Result<Option<(&'static str, Option<&'c FieldDescriptor>)>> {
        let Some((descriptor, fields)) = self.structure.as_ref().map(|s| (s.descriptor, s.fields))
        else {
            return Ok(None);
        };
        loop {
            if !self.has_next() {
                return Ok(None);
            }
            let (key, tags) = self.de.parser.next_key()?;
            let name = match &key {
                Key::Name(name) => Some(name.as_ref()),
                Key::Label(label) => i64::try_from(*label)
                    .ok()
                    .and_then(|label| descriptor.and_then(|d| d.field_labelled(label)))
                    .map(|f| f.name()),
            };
            let found = name.and_then(|name| fields.iter().copied().find(|f| *f == name));
            let Some(found) = found else {
                let structure = self.structure_name();
                if self.de.cbor.config.ignore_unknown_keys {
                    tracing::debug!(structure, %key, "skipping unknown key");
                    self.de.parser.skip_element()?;
                    continue;
                }
                return Err(CborError::UnknownKey {
                    structure: structure.to_string(),
                    key: key.to_string(),
                });
            };
            let field = descriptor.and_then(|d| d.field_named(found));
            if let Some(field) = field {
                if self.de.cbor.config.verify_key_tags
                    && !field.key_tags.is_empty()
                    && tags != field.key_tags
                {
                    return Err(CborError::tags(&tags, &field.key_tags, "match expected"));
                }
            }
            return Ok(Some((found, field)));
        }
    }
}

impl<'de, P: Parser<'de>> de::SeqAccess<'de> for Access<'_, '_, P> {
    type Error = CborError;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        if !self.has_next() {
            return Ok(None);
        }
        self.de.field = match self.positional {
            Some((descriptor, fields)) => fields
                .get(self.index)
                .and_then(|name| descriptor.and_then(|d| d.field_named(name))),
            None => None,
        };
        self.index += 1;
        seed.deserialize(&mut *self.de).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        self.remaining
    }
}

impl<'de, P: Parser<'de>> de::MapAccess<'de> for Access<'_, '_, P> {
    type Error = CborError;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        if self.structure.is_some() {
            let Some((name, field)) = self.next_field()? else {
                return Ok(None);
            };
            let key = seed.deserialize(StrDeserializer::<CborError>::new(name))?;
            self.de.field = field;
            return Ok(Some(key));
        }
        if !self.has_next() {
            return Ok(None);
        }
        self.de.field = None;
        seed.deserialize(&mut *self.de).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        seed.deserialize(&mut *self.de)
    }

    fn size_hint(&self) -> Option<usize> {
        self.remaining
    }
}

/// The `{variant: payload}` form of an enum.
struct VariantAccess<'a, 'c, P> {
    de: &'a mut Deserializer<'c, P>,
    name: &'static str,
    variant: String,
}

impl<'de, 'a, 'c, P: Parser<'de>> de::EnumAccess<'de> for VariantAccess<'a, 'c, P> {
    type Error = CborError;
    type Variant = Self;

    fn variant_seed<V: DeserializeSeed<'de>>(mut self, seed: V) -> Result<(V::Value, Self)> {
        self.de.scalar()?;
        self.variant = self.de.parser.next_text()?.into_owned();
        let value = seed.deserialize(StrDeserializer::<CborError>::new(&self.variant))?;
        Ok((value, self))
    }
}

impl<'de, 'a, 'c, P: Parser<'de>> de::VariantAccess<'de> for VariantAccess<'a, 'c, P> {
    type Error = CborError;

    fn unit_variant(self) -> Result<()> {
        self.de.scalar()?;
        self.de.parser.next_null()
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value> {
        seed.deserialize(&mut *self.de)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        de::Deserializer::deserialize_seq(&mut *self.de, visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        let qualified = format!("{}::{}", self.name, self.variant);
        self.de.read_struct(&qualified, fields, visitor)
    }
}

/// Hands the pending tags to the visitor one at a time, as the reserved tag
/// variant: `(tag number, tagged value)`.
struct TagAccess<'a, 'c, P> {
    de: &'a mut Deserializer<'c, P>,
}

impl<'de, 'a, 'c, P: Parser<'de>> de::EnumAccess<'de> for TagAccess<'a, 'c, P> {
    type Error = CborError;
    type Variant = Self;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self)> {
        let value = seed.deserialize(StrDeserializer::<CborError>::new(TAG_VARIANT))?;
        Ok((value, self))
    }
}

impl<'de, 'a, 'c, P: Parser<'de>> de::VariantAccess<'de> for TagAccess<'a, 'c, P> {
    type Error = CborError;

    fn unit_variant(self) -> Result<()> {
        Err(de::Error::custom("a tagged item cannot be read as a unit variant"))
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, _seed: T) -> Result<T::Value> {
        Err(de::Error::custom("a tagged item cannot be read as a newtype variant"))
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        visitor.visit_seq(TagSeq {
            de: self.de,
            position: 0,
        })
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value> {
        Err(de::Error::custom("a tagged item cannot be read as a struct variant"))
    }
}

struct TagSeq<'a, 'c, P> {
    de: &'a mut Deserializer<'c, P>,
    position: u8,
}

impl<'de, P: Parser<'de>> de::SeqAccess<'de> for TagSeq<'_, '_, P> {
    type Error = CborError;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        self.position += 1;
        match self.position {
            1 => {
                let tag = self.de.parser.take_tag().ok_or_else(|| {
                    CborError::Message("tag number requested with no tag pending".into())
                })?;
                let tag: U64Deserializer<CborError> = tag.into_deserializer();
                seed.deserialize(tag).map(Some)
            }
            2 => seed.deserialize(&mut *self.de).map(Some),
            _ => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(2usize.saturating_sub(self.position as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ByteParser, TreeParser};
    use crate::{CborConfig, CborElement, FieldDescriptor, Schema, StructDescriptor};
    use serde::Deserialize;

    fn decode<'de, T: Deserialize<'de>>(cbor: &Cbor, data: &'de [u8]) -> Result<T> {
        let mut de = Deserializer::new(ByteParser::new(data), cbor);
        let value = T::deserialize(&mut de)?;
        de.end()?;
        Ok(value)
    }

    #[derive(Deserialize, Debug, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn test_definite_and_indefinite_struct() {
        let cbor = Cbor::default();
        let definite = [0xa2, 0x61, b'x', 0x01, 0x61, b'y', 0x20];
        let indefinite = [0xbf, 0x61, b'y', 0x20, 0x61, b'x', 0x01, 0xff];
        let expected = Point { x: 1, y: -1 };
        assert_eq!(decode::<Point>(&cbor, &definite).unwrap(), expected);
        assert_eq!(decode::<Point>(&cbor, &indefinite).unwrap(), expected);
    }

    #[test]
    fn test_unknown_key() {
        let data = [0xa2, 0x61, b'x', 0x01, 0x61, b'z', 0x82, 0x01, 0x02];
        let err = decode::<Point>(&Cbor::default(), &data).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Point does not contain element with name 'z'. You can enable 'ignore_unknown_keys' to ignore unknown keys"
        );
    }

    #[test]
    fn test_narrowing_error() {
        let err = decode::<i8>(&Cbor::default(), &[0x18, 0xc8]).unwrap_err();
        assert_eq!(err.to_string(), "value 200 is out of range for i8 [-128..127]");
        assert_eq!(decode::<u8>(&Cbor::default(), &[0x18, 0xc8]).unwrap(), 200);
    }

    #[test]
    fn test_trailing_data() {
        assert!(matches!(
            decode::<u8>(&Cbor::default(), &[0x01, 0x02]).unwrap_err(),
            CborError::TrailingData(1)
        ));
    }

    #[test]
    fn test_labels_resolve_to_fields() {
        let cbor = Cbor::new(
            CborConfig::default(),
            Schema::new().with(
                StructDescriptor::new("Point")
                    .field(FieldDescriptor::new("x").label(1))
                    .field(FieldDescriptor::new("y").label(-2)),
            ),
        );
        let data = [0xa2, 0x01, 0x05, 0x21, 0x06];
        assert_eq!(decode::<Point>(&cbor, &data).unwrap(), Point { x: 5, y: 6 });
    }

    #[test]
    fn test_array_framed_struct() {
        let cbor = Cbor::new(
            CborConfig::default(),
            Schema::new().with(StructDescriptor::new("Point").as_array()),
        );
        assert_eq!(
            decode::<Point>(&cbor, &[0x82, 0x03, 0x04]).unwrap(),
            Point { x: 3, y: 4 }
        );
        assert!(decode::<Point>(&cbor, &[0x83, 0x03, 0x04, 0x05]).is_err());
    }

    #[test]
    fn test_enum_forms() {
        #[derive(Deserialize, Debug, PartialEq)]
        enum Op {
            Stop,
            Move(i32),
            Jump { h: u8 },
        }
        let cbor = Cbor::default();
        assert_eq!(decode::<Op>(&cbor, &[0x64, b'S', b't', b'o', b'p']).unwrap(), Op::Stop);
        assert_eq!(
            decode::<Op>(&cbor, &[0xa1, 0x64, b'M', b'o', b'v', b'e', 0x22]).unwrap(),
            Op::Move(-3)
        );
        assert_eq!(
            decode::<Op>(&cbor, &[0xbf, 0x64, b'J', b'u', b'm', b'p', 0xa1, 0x61, b'h', 0x07, 0xff])
                .unwrap(),
            Op::Jump { h: 7 }
        );
    }

    #[test]
    fn test_depth_limit() {
        let cbor = Cbor::new(CborConfig::builder().max_depth(2).build(), Schema::new());
        let data = [0x81, 0x81, 0x81, 0x01];
        assert!(matches!(
            decode::<CborElement>(&cbor, &data).unwrap_err(),
            CborError::DepthLimitExceeded(2)
        ));
        assert!(decode::<CborElement>(&cbor, &data[1..]).is_ok());
    }

    #[test]
    fn test_tags_become_element_tags() {
        let data = [0xd8, 0x64, 0xd8, 0xc8, 0xa1, 0x01, 0x61, b'a'];
        let element: CborElement = decode(&Cbor::default(), &data).unwrap();
        assert_eq!(element.tags(), &[100, 200]);
        assert_eq!(element.to_string(), "100(200({1: \"a\"}))");
    }

    #[test]
    fn test_tree_replay() {
        let element = CborElement::list(vec![CborElement::from(1), CborElement::from(-2)]);
        let cbor = Cbor::default();
        let mut de = Deserializer::new(TreeParser::new(&element), &cbor);
        let value = <(u8, i64)>::deserialize(&mut de).unwrap();
        de.end().unwrap();
        assert_eq!(value, (1, -2));
    }
}
