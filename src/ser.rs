use crate::Cbor;
use crate::capture::{UnsignedCapture, capture_byte};
use crate::element::{TAG_ENUM, TAG_VARIANT};
use crate::error::{CborError, Result};
use crate::schema::{FieldDescriptor, StructDescriptor};
use crate::sink::Sink;
use serde::Serialize;

/// serde `Serializer` writing into a [`Sink`].
///
/// Struct fields are looked up in the schema so that labels, key tags, value
/// tags and the other per-field annotations apply to the value written next.
pub(crate) struct Serializer<'c, S> {
    sink: S,
    cbor: &'c Cbor,
    /// Annotation of the field whose value is written next.
    field: Option<&'c FieldDescriptor>,
}

impl<'c, S: Sink> Serializer<'c, S> {
    pub fn new(sink: S, cbor: &'c Cbor) -> Self {
        Serializer {
            sink,
            cbor,
            field: None,
        }
    }

    pub fn write_tag(&mut self, tag: u64) -> Result<()> {
        self.sink.tag(tag)
    }

    pub fn finish(self) -> Result<S::Output> {
        self.sink.finish()
    }

    /// Takes the pending field annotation and writes its value tags.
    fn begin_value(&mut self) -> Result<Option<&'c FieldDescriptor>> {
        let field = self.field.take();
        if self.cbor.config.write_value_tags {
            if let Some(field) = field {
                for tag in &field.value_tags {
                    self.sink.tag(*tag)?;
                }
            }
        }
        Ok(field)
    }

    fn open_struct(&mut self, descriptor: Option<&'c StructDescriptor>, len: usize) -> Result<()> {
        if let Some(descriptor) = descriptor {
            if self.cbor.config.write_object_tags {
                for tag in &descriptor.object_tags {
                    self.sink.tag(*tag)?;
                }
            }
            if descriptor.as_array {
                return self.sink.begin_array(Some(len));
            }
        }
        self.sink.begin_map(Some(len))
    }

    /// Opens the one-entry map `{variant: ...}` that carries a non-unit variant.
    fn open_variant(&mut self, variant: &str) -> Result<()> {
        self.begin_value()?;
        self.sink.begin_map(Some(1))?;
        self.sink.text(variant)
    }

    fn write_key(&mut self, descriptor: Option<&'c StructDescriptor>, key: &str) -> Result<()> {
        let field = descriptor.and_then(|d| d.field_named(key));
        if descriptor.is_some_and(|d| d.as_array) {
            self.field = field;
            return Ok(());
        }
        if let Some(field) = field {
            if self.cbor.config.write_key_tags {
                for tag in &field.key_tags {
                    self.sink.tag(*tag)?;
                }
            }
        }
        match field.and_then(|f| f.label) {
            Some(label) if self.cbor.config.prefer_labels => self.sink.integer(label)?,
            _ => self.sink.text(key)?,
        }
        self.field = field;
        Ok(())
    }
}

enum State<'c> {
    /// An array or map; `closes` containers are ended when done.
    Container {
        descriptor: Option<&'c StructDescriptor>,
        closes: usize,
    },
    /// A `u8` sequence gathered into one byte string.
    Bytes(Vec<u8>),
    /// The reserved tag variant: first the tag number, then the tagged item.
    Tag { number_written: bool },
}

pub(crate) struct Compound<'a, 'c, S> {
    ser: &'a mut Serializer<'c, S>,
    state: State<'c>,
}

impl<'a, 'c, S: Sink> Compound<'a, 'c, S> {
    fn container(ser: &'a mut Serializer<'c, S>, descriptor: Option<&'c StructDescriptor>, closes: usize) -> Self {
        Compound {
            ser,
            state: State::Container { descriptor, closes },
        }
    }

    fn element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        match &mut self.state {
            State::Bytes(buf) => {
                buf.push(capture_byte(value)?);
                Ok(())
            }
            State::Tag { number_written } if !*number_written => {
                let tag = value.serialize(UnsignedCapture::new("tag number"))?;
                *number_written = true;
                self.ser.sink.tag(tag)
            }
            _ => {
                self.ser.field = None;
                value.serialize(&mut *self.ser)
            }
        }
    }

    fn field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<()> {
        let descriptor = match self.state {
            State::Container { descriptor, .. } => descriptor,
            _ => None,
        };
        self.ser.write_key(descriptor, key)?;
        value.serialize(&mut *self.ser)
    }

    fn finish(self) -> Result<()> {
        match self.state {
            State::Container { closes, .. } => {
                for _ in 0..closes {
                    self.ser.sink.end()?;
                }
                Ok(())
            }
            State::Bytes(buf) => self.ser.sink.bytes(&buf),
            State::Tag { .. } => Ok(()),
        }
    }
}

impl<'a, 'c, S: Sink> serde::Serializer for &'a mut Serializer<'c, S> {
    type Ok = ();
    type Error = CborError;
    type SerializeSeq = Compound<'a, 'c, S>;
    type SerializeTuple = Compound<'a, 'c, S>;
    type SerializeTupleStruct = Compound<'a, 'c, S>;
    type SerializeTupleVariant = Compound<'a, 'c, S>;
    type SerializeMap = Compound<'a, 'c, S>;
    type SerializeStruct = Compound<'a, 'c, S>;
    type SerializeStructVariant = Compound<'a, 'c, S>;

    fn serialize_bool(self, v: bool) -> Result<()> {
        self.begin_value()?;
        self.sink.boolean(v)
    }

    fn serialize_i8(self, v: i8) -> Result<()> {
        self.serialize_i64(v as i64)
    }

    fn serialize_i16(self, v: i16) -> Result<()> {
        self.serialize_i64(v as i64)
    }

    fn serialize_i32(self, v: i32) -> Result<()> {
        self.serialize_i64(v as i64)
    }

    fn serialize_i64(self, v: i64) -> Result<()> {
        self.begin_value()?;
        self.sink.integer(v)
    }

    fn serialize_i128(self, v: i128) -> Result<()> {
        self.begin_value()?;
        let out_of_range = || CborError::OutOfRange {
            value: v,
            target: "CBOR integer",
            range: "[-18446744073709551616..18446744073709551615]",
        };
        if v >= 0 {
            self.sink.unsigned(u64::try_from(v).map_err(|_| out_of_range())?)
        } else {
            self.sink
                .negative(u64::try_from(-1 - v).map_err(|_| out_of_range())?)
        }
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.serialize_u64(v as u64)
    }

    fn serialize_u16(self, v: u16) -> Result<()> {
        self.serialize_u64(v as u64)
    }

    fn serialize_u32(self, v: u32) -> Result<()> {
        self.serialize_u64(v as u64)
    }

    fn serialize_u64(self, v: u64) -> Result<()> {
        self.begin_value()?;
        self.sink.unsigned(v)
    }

    fn serialize_u128(self, v: u128) -> Result<()> {
        match u64::try_from(v) {
            Ok(v) => self.serialize_u64(v),
            Err(_) => Err(CborError::OutOfRange {
                value: i128::try_from(v).unwrap_or(i128::MAX),
                target: "CBOR integer",
                range: "[0..18446744073709551615]",
            }),
        }
    }

    fn serialize_f32(self, v: f32) -> Result<()> {
        self.begin_value()?;
        self.sink.float32(v)
    }

    fn serialize_f64(self, v: f64) -> Result<()> {
        self.begin_value()?;
        self.sink.float64(v)
    }

    fn serialize_char(self, v: char) -> Result<()> {
        let mut buf = [0u8; 4];
        self.serialize_str(v.encode_utf8(&mut buf))
    }

    fn serialize_str(self, v: &str) -> Result<()> {
        self.begin_value()?;
        self.sink.text(v)
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        self.begin_value()?;
        self.sink.bytes(v)
    }

    fn serialize_none(self) -> Result<()> {
        let field = self.begin_value()?;
        if field.is_some_and(|f| f.null_as_empty_map) {
            self.sink.empty_map()
        } else {
            self.sink.null()
        }
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        self.begin_value()?;
        self.sink.null()
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        self.serialize_unit()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<()> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<()> {
        self.open_variant(variant)?;
        value.serialize(&mut *self)?;
        self.sink.end()
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
        let field = self.begin_value()?;
        if field.is_some_and(|f| f.byte_string) {
            return Ok(Compound {
                ser: self,
                state: State::Bytes(Vec::with_capacity(len.unwrap_or(0))),
            });
        }
        self.sink.begin_array(len)?;
        Ok(Compound::container(self, None, 1))
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        if name == TAG_ENUM && variant == TAG_VARIANT && len == 2 {
            // field value tags go in front of the carried tags
            self.begin_value()?;
            return Ok(Compound {
                ser: self,
                state: State::Tag {
                    number_written: false,
                },
            });
        }
        self.open_variant(variant)?;
        self.sink.begin_array(Some(len))?;
        Ok(Compound::container(self, None, 2))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap> {
        self.begin_value()?;
        self.sink.begin_map(len)?;
        Ok(Compound::container(self, None, 1))
    }

    fn serialize_struct(self, name: &'static str, len: usize) -> Result<Self::SerializeStruct> {
        self.begin_value()?;
        let descriptor = self.cbor.schema.get(name);
        self.open_struct(descriptor, len)?;
        Ok(Compound::container(self, descriptor, 1))
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        self.open_variant(variant)?;
        let descriptor = self.cbor.schema.get(&format!("{name}::{variant}"));
        self.open_struct(descriptor, len)?;
        Ok(Compound::container(self, descriptor, 2))
    }

    fn is_human_readable(&self) -> bool {
        false
    }
}

impl<S: Sink> serde::ser::SerializeSeq for Compound<'_, '_, S> {
    type Ok = ();
    type Error = CborError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl<S: Sink> serde::ser::SerializeTuple for Compound<'_, '_, S> {
    type Ok = ();
    type Error = CborError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl<S: Sink> serde::ser::SerializeTupleStruct for Compound<'_, '_, S> {
    type Ok = ();
    type Error = CborError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl<S: Sink> serde::ser::SerializeTupleVariant for Compound<'_, '_, S> {
    type Ok = ();
    type Error = CborError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl<S: Sink> serde::ser::SerializeMap for Compound<'_, '_, S> {
    type Ok = ();
    type Error = CborError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<()> {
        self.element(key)
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl<S: Sink> serde::ser::SerializeStruct for Compound<'_, '_, S> {
    type Ok = ();
    type Error = CborError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<()> {
        self.field(key, value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl<S: Sink> serde::ser::SerializeStructVariant for Compound<'_, '_, S> {
    type Ok = ();
    type Error = CborError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<()> {
        self.field(key, value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}
