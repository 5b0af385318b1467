use std::fmt;
use std::io;

/// The single error type of the crate.
///
/// Every decoding failure aborts the whole call; there is no partial result.
#[derive(thiserror::Error, Debug)]
pub enum CborError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Unexpected EOF{0}")]
    UnexpectedEof(EofContext),

    /// A header byte did not match what the caller asked for.
    #[error("Expected {expected}, but found {}", describe_byte(.found))]
    UnexpectedByte {
        expected: String,
        found: Option<u8>,
    },

    /// Same as `UnexpectedByte`, for reads that have no header byte at hand.
    #[error("Expected {expected}, but found {found}")]
    UnexpectedItem {
        expected: String,
        found: &'static str,
    },

    #[error("Invalid length {length}: {reason}")]
    InvalidLength { length: u64, reason: &'static str },

    #[error("value {value} is out of range for {target} {range}")]
    OutOfRange {
        value: i128,
        target: &'static str,
        range: &'static str,
    },

    #[error("CBOR tags {found} do not {relation} tags {expected}")]
    TagMismatch {
        found: TagList,
        expected: TagList,
        relation: &'static str,
    },

    #[error(
        "{structure} does not contain element with name '{key}'. You can enable 'ignore_unknown_keys' to ignore unknown keys"
    )]
    UnknownKey { structure: String, key: String },

    #[error("Invalid UTF-8 in text string")]
    InvalidUtf8,

    #[error("Nesting depth exceeds the configured maximum of {0}")]
    DepthLimitExceeded(usize),

    #[error("Trailing data: {0} bytes remain after the top-level item")]
    TrailingData(usize),

    #[error("{0}")]
    Message(String),
}

impl CborError {
    pub(crate) fn unexpected(expected: impl Into<String>, found: Option<u8>) -> Self {
        CborError::UnexpectedByte {
            expected: expected.into(),
            found,
        }
    }

    pub(crate) fn eof() -> Self {
        CborError::UnexpectedEof(EofContext(None))
    }

    pub(crate) fn eof_requesting(requested: usize, available: usize) -> Self {
        CborError::UnexpectedEof(EofContext(Some((requested, available))))
    }

    pub(crate) fn tags(found: &[u64], expected: &[u64], relation: &'static str) -> Self {
        CborError::TagMismatch {
            found: TagList(found.to_vec()),
            expected: TagList(expected.to_vec()),
            relation,
        }
    }
}

fn describe_byte(found: &Option<u8>) -> String {
    match found {
        Some(b) => format!("{b:#04x}"),
        None => "EOF".to_string(),
    }
}

/// Extra detail for [`CborError::UnexpectedEof`]: requested vs. available bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EofContext(Option<(usize, usize)>);

impl fmt::Display for EofContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some((requested, available)) => {
                write!(f, ", available {available} bytes, requested: {requested}")
            }
            None => Ok(()),
        }
    }
}

/// A list of tag numbers printed as `[1, 2, 3]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagList(pub Vec<u64>);

impl fmt::Display for TagList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, tag) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{tag}")?;
        }
        f.write_str("]")
    }
}

impl serde::ser::Error for CborError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        CborError::Message(msg.to_string())
    }
}

impl serde::de::Error for CborError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        CborError::Message(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CborError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_byte_message() {
        let err = CborError::unexpected("start of string", Some(0x1a));
        assert_eq!(err.to_string(), "Expected start of string, but found 0x1a");
        let err = CborError::unexpected("boolean value", None);
        assert_eq!(err.to_string(), "Expected boolean value, but found EOF");
    }

    #[test]
    fn test_tag_mismatch_message() {
        let err = CborError::tags(&[55], &[56], "match expected");
        assert_eq!(err.to_string(), "CBOR tags [55] do not match expected tags [56]");
        let err = CborError::tags(&[], &[19], "match expected");
        assert_eq!(err.to_string(), "CBOR tags [] do not match expected tags [19]");
    }

    #[test]
    fn test_eof_message() {
        assert_eq!(CborError::eof().to_string(), "Unexpected EOF");
        assert_eq!(
            CborError::eof_requesting(4, 1).to_string(),
            "Unexpected EOF, available 1 bytes, requested: 4"
        );
    }
}
