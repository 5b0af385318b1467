//! The read side shared by the byte-stream and tree-replay decoders.
//!
//! A parser sits on one "current item". Tag headers in front of it are gathered
//! with [`Parser::collect_tags`] and handed out with [`Parser::take_tags`]; every
//! other read consumes the current item and moves to the next sibling or to the
//! container terminator.

use crate::error::{CborError, Result};
use std::borrow::Cow;

mod bytes;
mod tree;

pub(crate) use bytes::ByteParser;
pub(crate) use tree::TreeParser;

/// What the current item is, as far as dispatching on it is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kind {
    Unsigned,
    Negative,
    Bytes,
    Text,
    Array,
    Map,
    Float,
    Bool,
    Null,
    /// A break byte, or the end of the enclosing container in a tree.
    End,
    Eof,
    /// Anything this codec does not model, e.g. unassigned simple values.
    Unsupported,
}

/// A structure key: a field name or an integer label.
///
/// Labels are declared as `i64`; a key outside that range names no field, but
/// is kept whole so that it can still be skipped or reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Key<'de> {
    Name(Cow<'de, str>),
    Label(i128),
}

impl std::fmt::Display for Key<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Name(name) => f.write_str(name),
            Key::Label(label) => write!(f, "{label}"),
        }
    }
}

pub(crate) trait Parser<'de> {
    fn kind(&self) -> Kind;

    /// Reads any tags in front of the current item into the pending list.
    fn collect_tags(&mut self) -> Result<()>;

    /// Collected tags not handed out yet, outermost first.
    fn pending_tags(&self) -> &[u64];

    fn take_tags(&mut self) -> Vec<u64>;

    /// Hands out the outermost pending tag.
    fn take_tag(&mut self) -> Option<u64>;

    /// Consumes the tags in front of the current item. With `exact` they must
    /// equal `expected`, otherwise they only have to start with it.
    fn process_tags(&mut self, expected: &[u64], exact: bool) -> Result<()> {
        self.collect_tags()?;
        let found = self.take_tags();
        if exact && found != expected {
            return Err(CborError::tags(&found, expected, "match expected"));
        }
        if !exact && !found.starts_with(expected) {
            return Err(CborError::tags(&found, expected, "start with specified"));
        }
        Ok(())
    }

    /// Whether the whole input has been consumed.
    fn is_eof(&self) -> bool;

    /// Bytes left after the current position; zero for trees.
    fn remaining(&self) -> usize;

    /// True for null, undefined, and the empty map that stands in for a null
    /// structure.
    fn is_null(&self) -> bool;

    fn next_null(&mut self) -> Result<()>;

    /// True when the enclosing indefinite container has no more items.
    fn is_end(&self) -> bool;

    /// Closes the enclosing indefinite container.
    fn end(&mut self) -> Result<()>;

    /// Opens an array; `None` means indefinite length.
    fn start_array(&mut self) -> Result<Option<usize>>;

    /// Opens a map; the length is counted in key/value pairs.
    fn start_map(&mut self) -> Result<Option<usize>>;

    fn next_bool(&mut self) -> Result<bool>;

    /// Any CBOR integer; major types 0 and 1 both fit in `i128`.
    fn next_integer(&mut self) -> Result<i128>;

    /// Half or single precision.
    fn next_float(&mut self) -> Result<f32>;

    /// Half, single or double precision.
    fn next_double(&mut self) -> Result<f64>;

    fn next_text(&mut self) -> Result<Cow<'de, str>>;

    fn next_bytes(&mut self) -> Result<Cow<'de, [u8]>>;

    /// Consumes the current item, nested containers included, with its tags.
    fn skip_element(&mut self) -> Result<()>;

    /// Reads a structure key and the tags in front of it.
    fn next_key(&mut self) -> Result<(Key<'de>, Vec<u64>)> {
        self.collect_tags()?;
        let tags = self.take_tags();
        let key = match self.kind() {
            Kind::Text => Key::Name(self.next_text()?),
            Kind::Unsigned | Kind::Negative => Key::Label(self.next_integer()?),
            other => {
                return Err(CborError::UnexpectedItem {
                    expected: "text string or integer key".into(),
                    found: describe_kind(other),
                });
            }
        };
        Ok((key, tags))
    }
}

pub(crate) fn describe_kind(kind: Kind) -> &'static str {
    match kind {
        Kind::Unsigned => "unsigned integer",
        Kind::Negative => "negative integer",
        Kind::Bytes => "byte string",
        Kind::Text => "text string",
        Kind::Array => "array",
        Kind::Map => "map",
        Kind::Float => "float",
        Kind::Bool => "boolean",
        Kind::Null => "null",
        Kind::End => "end of container",
        Kind::Eof => "EOF",
        Kind::Unsupported => "unsupported item",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_tags() {
        // 1(2(3))
        let data = [0xc1, 0xc2, 0x03];

        let mut parser = ByteParser::new(&data);
        parser.process_tags(&[1, 2], true).unwrap();
        assert_eq!(parser.next_integer().unwrap(), 3);

        let mut parser = ByteParser::new(&data);
        parser.process_tags(&[1], false).unwrap();
        assert!(parser.pending_tags().is_empty());

        let mut parser = ByteParser::new(&data);
        let err = parser.process_tags(&[1], true).unwrap_err();
        assert_eq!(err.to_string(), "CBOR tags [1, 2] do not match expected tags [1]");

        let mut parser = ByteParser::new(&data);
        let err = parser.process_tags(&[2], false).unwrap_err();
        assert_eq!(err.to_string(), "CBOR tags [1, 2] do not start with specified tags [2]");
    }
}
