//! # CBOR codec
//!
//! A CBOR (Concise Binary Object Representation, RFC 8949) codec for serde, with
//! an in-memory element tree and per-field CBOR annotations.
//!
//! ## Features
//! - All major types, including tags (major type 6) on any item
//! - Indefinite-length (default) or definite-length containers on write; both on read
//! - Half, single and double precision floats on read; single and double on write
//! - Chunked (indefinite-length) byte and text strings on read
//! - [`CborElement`]: a tree of decoded items that keeps their tags, readable and
//!   writable like any serde type, or directly with [`decode_element`] and
//!   [`encode_element`]
//! - A [`Schema`] of struct annotations: integer labels as keys, key/value/object
//!   tags written and verified, byte-string fields, array-framed structs, and the
//!   empty map as null
//! - Unknown structure keys skipped on request, whatever their nesting
//! - Custom tag support via `write_tag()` and `read_tag()` methods, and [`Tagged`]
//!
//! ## Byte strings
//! serde serializes `Vec<u8>` as a sequence, which is written as an array of
//! integers. Use `serde_bytes::ByteBuf` or `#[serde(with = "serde_bytes")]`, or mark
//! the field `byte_string` in the schema, to get a CBOR byte string instead.
//!
//! ## Example
//! ```rust
//! use cbor_codec::{Decoder, Encoder, from_slice};
//! use serde_bytes::ByteBuf;
//!
//! // Tag a byte string with 64 (RFC 8746 uint8 array)
//! let data = ByteBuf::from(vec![1, 2, 3, 4, 5]);
//! let mut buf = Vec::new();
//! let mut encoder = Encoder::new(&mut buf);
//! encoder.write_tag(64).unwrap();
//! encoder.encode(&data).unwrap();
//! assert_eq!(&buf[..3], &[0xd8, 0x40, 0x45]);
//!
//! // The tag can be read back explicitly, or is skipped when not asked for
//! let mut decoder = Decoder::new(&buf);
//! assert_eq!(decoder.read_tag().unwrap(), 64);
//! let decoded: ByteBuf = decoder.decode().unwrap();
//! assert_eq!(decoded, data);
//! let decoded: ByteBuf = from_slice(&buf).unwrap();
//! assert_eq!(decoded, data);
//! ```

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::LazyLock;

mod capture;
mod config;
mod de;
mod element;
mod error;
mod io;
mod parser;
mod primitive;
mod schema;
mod ser;
mod sink;
mod skip;
mod tags;
mod tree_reader;
mod tree_writer;

pub use config::{CborConfig, CborConfigBuilder};
pub use element::{CborElement, CborMap, Sign};
pub use error::{CborError, EofContext, Result, TagList};
pub use schema::{FieldDescriptor, Schema, StructDescriptor};
pub use tags::Tagged;

use de::Deserializer;
use parser::{ByteParser, Parser, TreeParser, describe_kind};
use ser::Serializer;
use sink::ByteSink;
use tree_reader::TreeReader;
use tree_writer::TreeSink;

static DEFAULT: LazyLock<Cbor> = LazyLock::new(Cbor::default);

/// A codec instance: behaviour switches plus the struct annotations.
///
/// Immutable once built, so it can be shared between threads and reused for
/// any number of calls. The free functions of this crate use
/// `Cbor::default()`.
#[derive(Debug, Clone, Default)]
pub struct Cbor {
    pub(crate) config: CborConfig,
    pub(crate) schema: Schema,
}

impl Cbor {
    pub fn new(config: CborConfig, schema: Schema) -> Self {
        Cbor { config, schema }
    }

    pub fn config(&self) -> &CborConfig {
        &self.config
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn to_vec<T: ?Sized + Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.to_writer(&mut buf, value)?;
        Ok(buf)
    }

    pub fn to_writer<W: Write, T: ?Sized + Serialize>(&self, writer: W, value: &T) -> Result<()> {
        let mut encoder = Encoder::with_cbor(writer, self);
        encoder.encode(value)?;
        encoder.into_inner()?;
        Ok(())
    }

    /// Decodes exactly one item; bytes left after it are an error.
    pub fn from_slice<'de, T: Deserialize<'de>>(&self, data: &'de [u8]) -> Result<T> {
        let mut decoder = Decoder::with_cbor(data, self);
        let value = decoder.decode()?;
        decoder.end()?;
        Ok(value)
    }

    /// Writes `value` into an element tree instead of bytes.
    pub fn to_element<T: ?Sized + Serialize>(&self, value: &T) -> Result<CborElement> {
        let mut ser = Serializer::new(TreeSink::new(), self);
        value.serialize(&mut ser)?;
        ser.finish()
    }

    /// Reads `T` from an element tree, with the same rules as reading bytes.
    pub fn from_element<'de, T: Deserialize<'de>>(&self, element: &'de CborElement) -> Result<T> {
        let mut de = Deserializer::new(TreeParser::new(element), self);
        let value = T::deserialize(&mut de)?;
        de.end()?;
        Ok(value)
    }

    /// Reads bytes straight into an element tree.
    pub fn decode_element(&self, data: &[u8]) -> Result<CborElement> {
        TreeReader::new(data, &self.config).read_root()
    }

    pub fn encode_element(&self, element: &CborElement) -> Result<Vec<u8>> {
        self.to_vec(element)
    }
}

/// Streaming encoder. Tags written with [`Encoder::write_tag`] apply to the
/// next encoded value.
pub struct Encoder<'c, W: Write> {
    ser: Serializer<'c, ByteSink<W>>,
}

impl<W: Write> Encoder<'static, W> {
    pub fn new(writer: W) -> Self {
        Encoder::with_cbor(writer, &DEFAULT)
    }
}

impl<'c, W: Write> Encoder<'c, W> {
    pub fn with_cbor(writer: W, cbor: &'c Cbor) -> Self {
        let sink = ByteSink::new(writer, cbor.config.definite_lengths);
        Encoder {
            ser: Serializer::new(sink, cbor),
        }
    }

    pub fn write_tag(&mut self, tag: u64) -> Result<()> {
        self.ser.write_tag(tag)
    }

    pub fn encode<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut self.ser)
    }

    pub fn into_inner(self) -> Result<W> {
        self.ser.finish()
    }
}

/// Decoder over a byte slice. Strings and byte strings borrow from it where
/// the target type allows.
pub struct Decoder<'de, 'c> {
    de: Deserializer<'c, ByteParser<'de>>,
}

impl<'de> Decoder<'de, 'static> {
    pub fn new(data: &'de [u8]) -> Self {
        Decoder::with_cbor(data, &DEFAULT)
    }
}

impl<'de, 'c> Decoder<'de, 'c> {
    pub fn with_cbor(data: &'de [u8], cbor: &'c Cbor) -> Self {
        Decoder {
            de: Deserializer::new(ByteParser::new(data), cbor),
        }
    }

    /// Reads the outermost tag in front of the next item.
    pub fn read_tag(&mut self) -> Result<u64> {
        let parser = self.de.parser_mut();
        parser.collect_tags()?;
        parser.take_tag().ok_or_else(|| CborError::UnexpectedItem {
            expected: "tag".into(),
            found: describe_kind(parser.kind()),
        })
    }

    pub fn decode<T: Deserialize<'de>>(&mut self) -> Result<T> {
        T::deserialize(&mut self.de)
    }

    /// Fails if input is left over.
    pub fn end(&self) -> Result<()> {
        self.de.end()
    }
}

macro_rules! forward_to_inner {
    ($($method:ident($($arg:ident: $ty:ty),*);)*) => {
        $(
            fn $method<V: serde::de::Visitor<'de>>(self, $($arg: $ty,)* visitor: V) -> Result<V::Value> {
                serde::Deserializer::$method(&mut self.de, $($arg,)* visitor)
            }
        )*
    };
}

/// Lets other serde tools, such as `serde-transcode`, drive the decoder.
impl<'de> serde::Deserializer<'de> for &mut Decoder<'de, '_> {
    type Error = CborError;

    forward_to_inner! {
        deserialize_any();
        deserialize_bool();
        deserialize_i8();
        deserialize_i16();
        deserialize_i32();
        deserialize_i64();
        deserialize_i128();
        deserialize_u8();
        deserialize_u16();
        deserialize_u32();
        deserialize_u64();
        deserialize_u128();
        deserialize_f32();
        deserialize_f64();
        deserialize_char();
        deserialize_str();
        deserialize_string();
        deserialize_bytes();
        deserialize_byte_buf();
        deserialize_option();
        deserialize_unit();
        deserialize_unit_struct(name: &'static str);
        deserialize_newtype_struct(name: &'static str);
        deserialize_seq();
        deserialize_tuple(len: usize);
        deserialize_tuple_struct(name: &'static str, len: usize);
        deserialize_map();
        deserialize_struct(name: &'static str, fields: &'static [&'static str]);
        deserialize_enum(name: &'static str, variants: &'static [&'static str]);
        deserialize_identifier();
        deserialize_ignored_any();
    }

    fn is_human_readable(&self) -> bool {
        false
    }
}

// Convenience functions
pub fn to_vec<T: ?Sized + Serialize>(value: &T) -> Result<Vec<u8>> {
    DEFAULT.to_vec(value)
}

pub fn to_writer<W: Write, T: ?Sized + Serialize>(writer: W, value: &T) -> Result<()> {
    DEFAULT.to_writer(writer, value)
}

pub fn from_slice<'de, T: Deserialize<'de>>(data: &'de [u8]) -> Result<T> {
    DEFAULT.from_slice(data)
}

pub fn to_element<T: ?Sized + Serialize>(value: &T) -> Result<CborElement> {
    DEFAULT.to_element(value)
}

pub fn from_element<'de, T: Deserialize<'de>>(element: &'de CborElement) -> Result<T> {
    DEFAULT.from_element(element)
}

pub fn decode_element(data: &[u8]) -> Result<CborElement> {
    DEFAULT.decode_element(data)
}

pub fn encode_element(element: &CborElement) -> Result<Vec<u8>> {
    DEFAULT.encode_element(element)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Person {
        name: String,
        age: u32,
        emails: Vec<String>,
    }

    #[test]
    fn test_basic_types() {
        assert_eq!(from_slice::<u32>(&to_vec(&42u32).unwrap()).unwrap(), 42);
        assert_eq!(from_slice::<i32>(&to_vec(&-42i32).unwrap()).unwrap(), -42);
        assert!(from_slice::<bool>(&to_vec(&true).unwrap()).unwrap());
        assert_eq!(
            from_slice::<String>(&to_vec(&"hello".to_string()).unwrap()).unwrap(),
            "hello"
        );
        assert_eq!(from_slice::<f32>(&to_vec(&1.5f32).unwrap()).unwrap(), 1.5);
        assert_eq!(from_slice::<char>(&to_vec(&'é').unwrap()).unwrap(), 'é');
    }

    #[test]
    fn test_struct() {
        let person = Person {
            name: "Alice".to_string(),
            age: 30,
            emails: vec!["alice@example.com".to_string()],
        };
        let encoded = to_vec(&person).unwrap();
        assert_eq!(encoded[0], primitive::BEGIN_MAP);
        let decoded: Person = from_slice(&encoded).unwrap();
        assert_eq!(person, decoded);

        let definite = Cbor::new(
            CborConfig::builder().definite_lengths(true).build(),
            Schema::new(),
        );
        let encoded = definite.to_vec(&person).unwrap();
        assert_eq!(encoded[0], 0xa3);
        assert_eq!(from_slice::<Person>(&encoded).unwrap(), person);
    }

    #[test]
    fn test_map() {
        let mut map = HashMap::new();
        map.insert("key1".to_string(), 100);
        map.insert("key2".to_string(), 200);
        let encoded = to_vec(&map).unwrap();
        let decoded: HashMap<String, i32> = from_slice(&encoded).unwrap();
        assert_eq!(map, decoded);
    }

    #[test]
    fn test_manual_tag_encoding() {
        let mut buf = Vec::new();
        let mut encoder = Encoder::new(&mut buf);

        // Tag 100 is encoded as 0xD8 0x64
        encoder.write_tag(100).unwrap();
        encoder.encode("custom tagged value").unwrap();
        assert_eq!(&buf[..2], &[0xd8, 100]);

        // Decode should give us the string content
        let decoded: String = from_slice(&buf).unwrap();
        assert_eq!(decoded, "custom tagged value");
    }

    #[test]
    fn test_read_tag_method() {
        let mut buf = Vec::new();
        let mut encoder = Encoder::new(&mut buf);
        encoder.write_tag(42).unwrap();
        encoder.encode("test").unwrap();

        let mut decoder = Decoder::new(&buf);
        assert_eq!(decoder.read_tag().unwrap(), 42);
        let content: &str = decoder.decode().unwrap();
        assert_eq!(content, "test");
        decoder.end().unwrap();

        let mut decoder = Decoder::new(&buf[2..]);
        assert!(decoder.read_tag().is_err());
    }

    #[test]
    fn test_vec_u8_as_array() {
        // Without serde_bytes, Vec<u8> serializes as an array
        let data: Vec<u8> = vec![1, 2, 3];
        let encoded = to_vec(&data).unwrap();
        assert_eq!(encoded, vec![0x9f, 0x01, 0x02, 0x03, 0xff]);
        let decoded: Vec<u8> = from_slice(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_byte_array_zero_copy() {
        let data = [0x42, 0xff, 0x00, 0xaa, 0x55];
        let encoded = to_vec(serde_bytes::Bytes::new(&data)).unwrap();
        assert_eq!(encoded[0], 0x45);
        assert_eq!(&encoded[1..], &data);

        let decoded: &[u8] = from_slice::<&serde_bytes::Bytes>(&encoded).unwrap();
        assert_eq!(decoded, &data);
    }

    #[test]
    fn test_element_entry_points() {
        let person = Person {
            name: "Bob".to_string(),
            age: 7,
            emails: vec![],
        };
        let element = to_element(&person).unwrap();
        assert_eq!(
            element.as_map().unwrap().get_str("age"),
            Some(&CborElement::from(7))
        );
        assert_eq!(from_element::<Person>(&element).unwrap(), person);

        let bytes = encode_element(&element).unwrap();
        assert_eq!(decode_element(&bytes).unwrap(), element);
        assert_eq!(from_slice::<Person>(&bytes).unwrap(), person);
    }

    #[test]
    fn test_to_writer() {
        let mut out = Vec::new();
        to_writer(&mut out, &[1u8, 2]).unwrap();
        assert_eq!(out, to_vec(&[1u8, 2]).unwrap());
    }
}
