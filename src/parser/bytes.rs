use super::{Kind, Parser};
use crate::error::{CborError, Result};
use crate::io::ByteInput;
use crate::primitive::*;
use crate::skip::LengthStack;
use std::borrow::Cow;

/// Single-pass parser over encoded bytes.
///
/// `current` holds the header byte of the item under the cursor; it is refilled
/// after every successful read, so `None` means end of input.
pub(crate) struct ByteParser<'de> {
    input: ByteInput<'de>,
    current: Option<u8>,
    pending: Vec<u64>,
}

impl<'de> ByteParser<'de> {
    pub fn new(data: &'de [u8]) -> Self {
        let mut input = ByteInput::new(data);
        let current = input.read();
        ByteParser {
            input,
            current,
            pending: Vec::new(),
        }
    }

    fn advance(&mut self) {
        self.current = self.input.read();
    }

    fn header(&self, expected: &str) -> Result<u8> {
        self.current
            .ok_or_else(|| CborError::unexpected(expected, None))
    }

    /// Reads the argument of `header` from the bytes following it.
    fn read_argument(&mut self, header: u8) -> Result<u64> {
        let info = additional_info(header);
        Ok(match argument_width(info) {
            Some(0) => info as u64,
            Some(1) => self.input.read_array::<1>()?[0] as u64,
            Some(2) => u16::from_be_bytes(self.input.read_array()?) as u64,
            Some(4) => u32::from_be_bytes(self.input.read_array()?) as u64,
            Some(_) => u64::from_be_bytes(self.input.read_array()?),
            None => {
                return Err(CborError::unexpected(
                    format!("argument of {}", describe_major(major_type(header))),
                    Some(header),
                ));
            }
        })
    }

    fn read_length(&mut self, header: u8, ceiling: u64) -> Result<usize> {
        let length = self.read_argument(header)?;
        if length > ceiling {
            return Err(CborError::InvalidLength {
                length,
                reason: "exceeds the maximum supported length",
            });
        }
        Ok(length as usize)
    }

    /// Definite strings borrow from the input; chunked ones are concatenated.
    fn read_string(&mut self, major: u8, expected: &'static str) -> Result<Cow<'de, [u8]>> {
        let header = self.header(expected)?;
        if major_type(header) != major {
            return Err(CborError::unexpected(expected, Some(header)));
        }
        if additional_info(header) != INDEFINITE {
            let length = self.read_length(header, MAX_LENGTH)?;
            let bytes = self.input.read_exact(length)?;
            self.advance();
            return Ok(Cow::Borrowed(bytes));
        }

        let mut buf = Vec::new();
        self.advance();
        while self.current != Some(BREAK) {
            let chunk = self.header(expected)?;
            if major_type(chunk) != major || additional_info(chunk) == INDEFINITE {
                return Err(CborError::unexpected(
                    format!("definite-length chunk of {}", describe_major(major)),
                    Some(chunk),
                ));
            }
            let length = self.read_length(chunk, MAX_LENGTH)?;
            buf.extend_from_slice(self.input.read_exact(length)?);
            self.advance();
        }
        self.advance();
        Ok(Cow::Owned(buf))
    }

    fn start_sized(&mut self, begin: u8, major: u8, ceiling: u64, what: &str) -> Result<Option<usize>> {
        let expected = format!("start of {what}");
        let header = self.header(&expected)?;
        if header == begin {
            self.advance();
            return Ok(None);
        }
        if major_type(header) != major {
            let expected = if major_type(header) == MAJOR_BYTES {
                format!("{expected} (found a byte string: is the field missing a byte_string annotation?)")
            } else {
                expected
            };
            return Err(CborError::unexpected(expected, Some(header)));
        }
        let length = self.read_length(header, ceiling)?;
        self.advance();
        Ok(Some(length))
    }
}

impl<'de> Parser<'de> for ByteParser<'de> {
    fn kind(&self) -> Kind {
        let Some(header) = self.current else {
            return Kind::Eof;
        };
        match major_type(header) {
            MAJOR_UNSIGNED => Kind::Unsigned,
            MAJOR_NEGATIVE => Kind::Negative,
            MAJOR_BYTES => Kind::Bytes,
            MAJOR_TEXT => Kind::Text,
            MAJOR_ARRAY => Kind::Array,
            MAJOR_MAP => Kind::Map,
            MAJOR_SIMPLE => match header {
                FALSE | TRUE => Kind::Bool,
                NULL | UNDEFINED => Kind::Null,
                NEXT_HALF | NEXT_FLOAT | NEXT_DOUBLE => Kind::Float,
                BREAK => Kind::End,
                _ => Kind::Unsupported,
            },
            _ => Kind::Unsupported,
        }
    }

    fn collect_tags(&mut self) -> Result<()> {
        while let Some(header) = self.current {
            if major_type(header) != MAJOR_TAG {
                break;
            }
            let tag = self.read_argument(header)?;
            self.pending.push(tag);
            self.advance();
        }
        Ok(())
    }

    fn pending_tags(&self) -> &[u64] {
        &self.pending
    }

    fn take_tags(&mut self) -> Vec<u64> {
        std::mem::take(&mut self.pending)
    }

    fn take_tag(&mut self) -> Option<u64> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending.remove(0))
        }
    }

    fn is_eof(&self) -> bool {
        self.current.is_none()
    }

    fn remaining(&self) -> usize {
        self.input.available() + usize::from(self.current.is_some())
    }

    fn is_null(&self) -> bool {
        matches!(self.current, Some(NULL | UNDEFINED | EMPTY_MAP))
    }

    fn next_null(&mut self) -> Result<()> {
        if !self.is_null() {
            return Err(CborError::unexpected("null", self.current));
        }
        self.advance();
        Ok(())
    }

    fn is_end(&self) -> bool {
        self.current == Some(BREAK)
    }

    fn end(&mut self) -> Result<()> {
        if !self.is_end() {
            return Err(CborError::unexpected("break byte", self.current));
        }
        self.advance();
        Ok(())
    }

    fn start_array(&mut self) -> Result<Option<usize>> {
        self.start_sized(BEGIN_ARRAY, MAJOR_ARRAY, MAX_LENGTH, "array")
    }

    fn start_map(&mut self) -> Result<Option<usize>> {
        self.start_sized(BEGIN_MAP, MAJOR_MAP, MAX_MAP_PAIRS, "map")
    }

    fn next_bool(&mut self) -> Result<bool> {
        let value = match self.current {
            Some(TRUE) => true,
            Some(FALSE) => false,
            other => return Err(CborError::unexpected("boolean value", other)),
        };
        self.advance();
        Ok(value)
    }

    fn next_integer(&mut self) -> Result<i128> {
        let header = self.header("integer")?;
        let value = match major_type(header) {
            MAJOR_UNSIGNED => self.read_argument(header)? as i128,
            MAJOR_NEGATIVE => -1 - self.read_argument(header)? as i128,
            _ => return Err(CborError::unexpected("integer", Some(header))),
        };
        self.advance();
        Ok(value)
    }

    fn next_float(&mut self) -> Result<f32> {
        let value = match self.current {
            Some(NEXT_HALF) => f32_from_half_bits(u16::from_be_bytes(self.input.read_array()?)),
            Some(NEXT_FLOAT) => f32::from_bits(u32::from_be_bytes(self.input.read_array()?)),
            other => return Err(CborError::unexpected("float header", other)),
        };
        self.advance();
        Ok(value)
    }

    fn next_double(&mut self) -> Result<f64> {
        let value = match self.current {
            Some(NEXT_DOUBLE) => f64::from_bits(u64::from_be_bytes(self.input.read_array()?)),
            Some(NEXT_HALF | NEXT_FLOAT) => return self.next_float().map(f64::from),
            other => return Err(CborError::unexpected("double header", other)),
        };
        self.advance();
        Ok(value)
    }

    fn next_text(&mut self) -> Result<Cow<'de, str>> {
        match self.read_string(MAJOR_TEXT, "start of string")? {
            Cow::Borrowed(bytes) => std::str::from_utf8(bytes)
                .map(Cow::Borrowed)
                .map_err(|_| CborError::InvalidUtf8),
            Cow::Owned(buf) => String::from_utf8(buf)
                .map(Cow::Owned)
                .map_err(|_| CborError::InvalidUtf8),
        }
    }

    fn next_bytes(&mut self) -> Result<Cow<'de, [u8]>> {
        self.read_string(MAJOR_BYTES, "start of byte string")
    }

    fn skip_element(&mut self) -> Result<()> {
        let mut lengths = LengthStack::new();
        loop {
            // tags belong to the item that follows and need no frame
            self.collect_tags()?;
            self.pending.clear();

            let header = self.current.ok_or_else(CborError::eof)?;
            if is_indefinite_start(header) {
                self.advance();
                lengths.push_indefinite();
            } else if header == BREAK {
                if !lengths.close_indefinite() {
                    return Err(CborError::unexpected("next data item", Some(header)));
                }
                self.advance();
            } else {
                match major_type(header) {
                    MAJOR_ARRAY => {
                        let count = self.read_length(header, MAX_LENGTH)?;
                        self.advance();
                        lengths.push_finite(count);
                    }
                    MAJOR_MAP => {
                        let pairs = self.read_length(header, MAX_MAP_PAIRS)?;
                        self.advance();
                        lengths.push_finite(pairs * 2);
                    }
                    MAJOR_BYTES | MAJOR_TEXT => {
                        let length = self.read_length(header, MAX_LENGTH)?;
                        self.input.skip(length)?;
                        self.advance();
                        lengths.prune();
                    }
                    _ => {
                        self.read_argument(header)?;
                        self.advance();
                        lengths.prune();
                    }
                }
            }
            if lengths.is_empty() {
                return Ok(());
            }
        }
    }
}
