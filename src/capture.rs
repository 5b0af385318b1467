use crate::error::{CborError, Result};
use serde::Serialize;
use serde::ser::Impossible;

/// Serializer that accepts a single unsigned integer and returns it.
///
/// Used to pull tag numbers out of the reserved tag variant and to gather the
/// elements of a `u8` sequence written as one byte string.
pub(crate) struct UnsignedCapture {
    what: &'static str,
}

impl UnsignedCapture {
    pub fn new(what: &'static str) -> Self {
        UnsignedCapture { what }
    }

    fn reject<T>(&self, found: &str) -> Result<T> {
        Err(CborError::Message(format!(
            "expected {} as an unsigned integer, found {found}",
            self.what
        )))
    }

    fn signed(self, value: i64) -> Result<u64> {
        u64::try_from(value).or_else(|_| self.reject("a negative integer"))
    }
}

/// Captures the values of a `u8` sequence.
pub(crate) fn capture_byte<T: ?Sized + Serialize>(value: &T) -> Result<u8> {
    let value = value.serialize(UnsignedCapture::new("byte string element"))?;
    u8::try_from(value).map_err(|_| CborError::OutOfRange {
        value: value as i128,
        target: "u8",
        range: "[0..255]",
    })
}

macro_rules! reject {
    ($($method:ident($($arg:ty),*) => $found:expr;)*) => {
        $(
            fn $method(self, $(_: $arg),*) -> Result<u64> {
                self.reject($found)
            }
        )*
    };
}

impl serde::Serializer for UnsignedCapture {
    type Ok = u64;
    type Error = CborError;
    type SerializeSeq = Impossible<u64, CborError>;
    type SerializeTuple = Impossible<u64, CborError>;
    type SerializeTupleStruct = Impossible<u64, CborError>;
    type SerializeTupleVariant = Impossible<u64, CborError>;
    type SerializeMap = Impossible<u64, CborError>;
    type SerializeStruct = Impossible<u64, CborError>;
    type SerializeStructVariant = Impossible<u64, CborError>;

    fn serialize_u8(self, v: u8) -> Result<u64> {
        Ok(v as u64)
    }

    fn serialize_u16(self, v: u16) -> Result<u64> {
        Ok(v as u64)
    }

    fn serialize_u32(self, v: u32) -> Result<u64> {
        Ok(v as u64)
    }

    fn serialize_u64(self, v: u64) -> Result<u64> {
        Ok(v)
    }

    fn serialize_i8(self, v: i8) -> Result<u64> {
        self.signed(v as i64)
    }

    fn serialize_i16(self, v: i16) -> Result<u64> {
        self.signed(v as i64)
    }

    fn serialize_i32(self, v: i32) -> Result<u64> {
        self.signed(v as i64)
    }

    fn serialize_i64(self, v: i64) -> Result<u64> {
        self.signed(v)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<u64> {
        value.serialize(self)
    }

    reject! {
        serialize_bool(bool) => "a boolean";
        serialize_f32(f32) => "a float";
        serialize_f64(f64) => "a float";
        serialize_char(char) => "a character";
        serialize_str(&str) => "a string";
        serialize_bytes(&[u8]) => "a byte string";
        serialize_none() => "null";
        serialize_unit() => "unit";
        serialize_unit_struct(&'static str) => "a unit struct";
        serialize_unit_variant(&'static str, u32, &'static str) => "an enum";
    }

    fn serialize_some<T: ?Sized + Serialize>(self, _value: &T) -> Result<u64> {
        self.reject("an option")
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<u64> {
        self.reject("an enum")
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        self.reject("a sequence")
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        self.reject("a tuple")
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        self.reject("a tuple struct")
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        self.reject("an enum")
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        self.reject("a map")
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        self.reject("a struct")
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        self.reject("an enum")
    }
}
