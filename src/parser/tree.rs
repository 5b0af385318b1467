use super::{Kind, Parser};
use crate::element::CborElement;
use crate::error::{CborError, Result};
use std::borrow::Cow;

/// Items of one open container. Maps are flattened to key, value, key, value.
struct Frame<'de> {
    items: Vec<&'de CborElement>,
    position: usize,
}

/// Replays an already decoded [`CborElement`] through the [`Parser`] interface.
///
/// Containers always report indefinite length, so the bridge closes each of them
/// with [`Parser::end`].
pub(crate) struct TreeParser<'de> {
    stack: Vec<Frame<'de>>,
    pending: Vec<u64>,
    tags_loaded: bool,
}

impl<'de> TreeParser<'de> {
    pub fn new(root: &'de CborElement) -> Self {
        TreeParser {
            stack: vec![Frame {
                items: vec![root],
                position: 0,
            }],
            pending: Vec::new(),
            tags_loaded: false,
        }
    }

    fn current(&self) -> Option<&'de CborElement> {
        let frame = self.stack.last()?;
        frame.items.get(frame.position).copied()
    }

    fn expect(&self, expected: &str) -> Result<&'de CborElement> {
        self.current().ok_or_else(|| CborError::UnexpectedItem {
            expected: expected.into(),
            found: "end of container",
        })
    }

    fn mismatch(&self, expected: &str, found: &CborElement) -> CborError {
        CborError::UnexpectedItem {
            expected: expected.into(),
            found: found.kind(),
        }
    }

    fn advance(&mut self) {
        if let Some(frame) = self.stack.last_mut() {
            frame.position += 1;
        }
        self.pending.clear();
        self.tags_loaded = false;
    }

    fn enter(&mut self, items: Vec<&'de CborElement>) {
        self.advance();
        self.stack.push(Frame { items, position: 0 });
    }
}

impl<'de> Parser<'de> for TreeParser<'de> {
    fn kind(&self) -> Kind {
        match self.current() {
            None if self.stack.len() > 1 => Kind::End,
            None => Kind::Eof,
            Some(element @ CborElement::Integer { .. }) => {
                if element.as_u64().is_some() {
                    Kind::Unsigned
                } else {
                    Kind::Negative
                }
            }
            Some(CborElement::Float { .. }) => Kind::Float,
            Some(CborElement::Text { .. }) => Kind::Text,
            Some(CborElement::ByteString { .. }) => Kind::Bytes,
            Some(CborElement::Boolean { .. }) => Kind::Bool,
            Some(CborElement::Null { .. }) => Kind::Null,
            Some(CborElement::List { .. }) => Kind::Array,
            Some(CborElement::Map { .. }) => Kind::Map,
        }
    }

    fn collect_tags(&mut self) -> Result<()> {
        if !self.tags_loaded {
            if let Some(element) = self.current() {
                self.pending.extend_from_slice(element.tags());
            }
            self.tags_loaded = true;
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
        self.stack.len() == 1 && self.current().is_none()
    }

    fn remaining(&self) -> usize {
        0
    }

    fn is_null(&self) -> bool {
        match self.current() {
            Some(CborElement::Null { .. }) => true,
            Some(CborElement::Map { entries, .. }) => entries.is_empty(),
            _ => false,
        }
    }

    fn next_null(&mut self) -> Result<()> {
        if !self.is_null() {
            let found = self.expect("null")?;
            return Err(self.mismatch("null", found));
        }
        self.advance();
        Ok(())
    }

    fn is_end(&self) -> bool {
        self.stack.len() > 1 && self.current().is_none()
    }

    fn end(&mut self) -> Result<()> {
        if let Some(element) = self.current() {
            return Err(self.mismatch("end of container", element));
        }
        if self.stack.len() == 1 {
            return Err(CborError::UnexpectedItem {
                expected: "end of container".into(),
                found: "EOF",
            });
        }
        self.stack.pop();
        Ok(())
    }

    fn start_array(&mut self) -> Result<Option<usize>> {
        match self.expect("start of array")? {
            CborElement::List { items, .. } => {
                self.enter(items.iter().collect());
                Ok(None)
            }
            other => Err(self.mismatch("start of array", other)),
        }
    }

    fn start_map(&mut self) -> Result<Option<usize>> {
        match self.expect("start of map")? {
            CborElement::Map { entries, .. } => {
                let items = entries.iter().flat_map(|(k, v)| [k, v]).collect();
                self.enter(items);
                Ok(None)
            }
            other => Err(self.mismatch("start of map", other)),
        }
    }

    fn next_bool(&mut self) -> Result<bool> {
        match self.expect("boolean value")? {
            CborElement::Boolean { value, .. } => {
                let value = *value;
                self.advance();
                Ok(value)
            }
            other => Err(self.mismatch("boolean value", other)),
        }
    }

    fn next_integer(&mut self) -> Result<i128> {
        let element = self.expect("integer")?;
        match element.as_i128() {
            Some(value) => {
                self.advance();
                Ok(value)
            }
            None => Err(self.mismatch("integer", element)),
        }
    }

    /// Trees keep every float as `f64`. Narrowing may round, but a finite value
    /// beyond the `f32` range is refused rather than turned into infinity.
    fn next_float(&mut self) -> Result<f32> {
        let value = match self.expect("float")? {
            CborElement::Float { value, .. } => *value,
            other => return Err(self.mismatch("float", other)),
        };
        let narrowed = value as f32;
        if value.is_finite() && narrowed.is_infinite() {
            return Err(CborError::UnexpectedItem {
                expected: "float within single precision range".into(),
                found: "larger double",
            });
        }
        self.advance();
        Ok(narrowed)
    }

    fn next_double(&mut self) -> Result<f64> {
        match self.expect("float")? {
            CborElement::Float { value, .. } => {
                let value = *value;
                self.advance();
                Ok(value)
            }
            other => Err(self.mismatch("float", other)),
        }
    }

    fn next_text(&mut self) -> Result<Cow<'de, str>> {
        match self.expect("start of string")? {
            CborElement::Text { value, .. } => {
                self.advance();
                Ok(Cow::Borrowed(value.as_str()))
            }
            other => Err(self.mismatch("start of string", other)),
        }
    }

    fn next_bytes(&mut self) -> Result<Cow<'de, [u8]>> {
        match self.expect("start of byte string")? {
            CborElement::ByteString { value, .. } => {
                self.advance();
                Ok(Cow::Borrowed(value.as_slice()))
            }
            other => Err(self.mismatch("start of byte string", other)),
        }
    }

    fn skip_element(&mut self) -> Result<()> {
        self.expect("data item")?;
        self.advance();
        Ok(())
    }
}
