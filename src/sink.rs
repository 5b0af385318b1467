//! Output strategies for the serializer.
//!
//! The serializer only knows items and container boundaries. A [`Sink`] decides
//! what they turn into: streamed indefinite-length bytes, definite-length bytes,
//! or a [`CborElement`](crate::CborElement) tree (see `tree_writer`).

use crate::error::{CborError, Result};
use crate::primitive::*;
use std::io::Write;

pub(crate) trait Sink {
    type Output;

    /// Tags apply to the next item, which may be a container.
    fn tag(&mut self, tag: u64) -> Result<()>;
    fn unsigned(&mut self, value: u64) -> Result<()>;
    /// The negative integer `-(magnitude + 1)`.
    fn negative(&mut self, magnitude: u64) -> Result<()>;
    fn float32(&mut self, value: f32) -> Result<()>;
    fn float64(&mut self, value: f64) -> Result<()>;
    fn text(&mut self, value: &str) -> Result<()>;
    fn bytes(&mut self, value: &[u8]) -> Result<()>;
    fn boolean(&mut self, value: bool) -> Result<()>;
    fn null(&mut self) -> Result<()>;
    fn empty_map(&mut self) -> Result<()>;

    /// `len` is a hint; sinks may ignore it.
    fn begin_array(&mut self, len: Option<usize>) -> Result<()>;
    fn begin_map(&mut self, len: Option<usize>) -> Result<()>;
    fn end(&mut self) -> Result<()>;

    fn finish(self) -> Result<Self::Output>;

    /// Major type 0 or 1. `-1 - value` cannot overflow, `i64::MIN` included.
    fn integer(&mut self, value: i64) -> Result<()> {
        if value >= 0 {
            self.unsigned(value as u64)
        } else {
            self.negative((-1 - value) as u64)
        }
    }
}

/// Streams containers with the indefinite-length start bytes and a break at the
/// end, so nothing is buffered.
pub(crate) struct IndefiniteSink<W: Write> {
    writer: W,
}

impl<W: Write> IndefiniteSink<W> {
    pub fn new(writer: W) -> Self {
        IndefiniteSink { writer }
    }
}

impl<W: Write> Sink for IndefiniteSink<W> {
    type Output = W;

    fn tag(&mut self, tag: u64) -> Result<()> {
        write_tag(&mut self.writer, tag)
    }

    fn unsigned(&mut self, value: u64) -> Result<()> {
        write_type_value(&mut self.writer, MAJOR_UNSIGNED, value)
    }

    fn negative(&mut self, magnitude: u64) -> Result<()> {
        write_type_value(&mut self.writer, MAJOR_NEGATIVE, magnitude)
    }

    fn float32(&mut self, value: f32) -> Result<()> {
        write_f32(&mut self.writer, value)
    }

    fn float64(&mut self, value: f64) -> Result<()> {
        write_f64(&mut self.writer, value)
    }

    fn text(&mut self, value: &str) -> Result<()> {
        write_text(&mut self.writer, value)
    }

    fn bytes(&mut self, value: &[u8]) -> Result<()> {
        write_bytes(&mut self.writer, value)
    }

    fn boolean(&mut self, value: bool) -> Result<()> {
        write_bool(&mut self.writer, value)
    }

    fn null(&mut self) -> Result<()> {
        write_byte(&mut self.writer, NULL)
    }

    fn empty_map(&mut self) -> Result<()> {
        write_byte(&mut self.writer, EMPTY_MAP)
    }

    fn begin_array(&mut self, _len: Option<usize>) -> Result<()> {
        write_byte(&mut self.writer, BEGIN_ARRAY)
    }

    fn begin_map(&mut self, _len: Option<usize>) -> Result<()> {
        write_byte(&mut self.writer, BEGIN_MAP)
    }

    fn end(&mut self) -> Result<()> {
        write_byte(&mut self.writer, BREAK)
    }

    fn finish(self) -> Result<W> {
        Ok(self.writer)
    }
}

/// One open container: its encoded children and how many there were.
struct Frame {
    buf: Vec<u8>,
    children: usize,
    map: bool,
}

/// Writes containers with their item count in the header.
///
/// The count is only known once the container is closed, so each open container
/// collects its children in a scratch buffer. On `end` the header goes to the
/// parent (or the writer), followed by the buffered bytes. Top-level items are
/// written straight through.
pub(crate) struct DefiniteSink<W: Write> {
    writer: W,
    frames: Vec<Frame>,
}

impl<W: Write> DefiniteSink<W> {
    pub fn new(writer: W) -> Self {
        DefiniteSink {
            writer,
            frames: Vec::new(),
        }
    }

    /// Output for the next child of the innermost container; counts it.
    fn item(&mut self) -> &mut dyn Write {
        match self.frames.last_mut() {
            Some(frame) => {
                frame.children += 1;
                &mut frame.buf
            }
            None => &mut self.writer,
        }
    }

    /// Output of the innermost container, without counting.
    fn raw(&mut self) -> &mut dyn Write {
        match self.frames.last_mut() {
            Some(frame) => &mut frame.buf,
            None => &mut self.writer,
        }
    }

    fn begin(&mut self, map: bool, len: Option<usize>) -> Result<()> {
        if let Some(parent) = self.frames.last_mut() {
            parent.children += 1;
        }
        self.frames.push(Frame {
            buf: Vec::with_capacity(len.unwrap_or(0) * 2),
            children: 0,
            map,
        });
        Ok(())
    }
}

impl<W: Write> Sink for DefiniteSink<W> {
    type Output = W;

    fn tag(&mut self, tag: u64) -> Result<()> {
        write_tag(self.raw(), tag)
    }

    fn unsigned(&mut self, value: u64) -> Result<()> {
        write_type_value(self.item(), MAJOR_UNSIGNED, value)
    }

    fn negative(&mut self, magnitude: u64) -> Result<()> {
        write_type_value(self.item(), MAJOR_NEGATIVE, magnitude)
    }

    fn float32(&mut self, value: f32) -> Result<()> {
        write_f32(self.item(), value)
    }

    fn float64(&mut self, value: f64) -> Result<()> {
        write_f64(self.item(), value)
    }

    fn text(&mut self, value: &str) -> Result<()> {
        write_text(self.item(), value)
    }

    fn bytes(&mut self, value: &[u8]) -> Result<()> {
        write_bytes(self.item(), value)
    }

    fn boolean(&mut self, value: bool) -> Result<()> {
        write_bool(self.item(), value)
    }

    fn null(&mut self) -> Result<()> {
        write_byte(self.item(), NULL)
    }

    fn empty_map(&mut self) -> Result<()> {
        write_byte(self.item(), EMPTY_MAP)
    }

    fn begin_array(&mut self, len: Option<usize>) -> Result<()> {
        self.begin(false, len)
    }

    fn begin_map(&mut self, len: Option<usize>) -> Result<()> {
        self.begin(true, len)
    }

    fn end(&mut self) -> Result<()> {
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| CborError::Message("end of container without a start".into()))?;
        let (major, count) = if frame.map {
            if frame.children % 2 != 0 {
                return Err(CborError::Message("map closed after a key without value".into()));
            }
            (MAJOR_MAP, frame.children / 2)
        } else {
            (MAJOR_ARRAY, frame.children)
        };
        let out = self.raw();
        write_type_value(&mut *out, major, count as u64)?;
        out.write_all(&frame.buf)?;
        Ok(())
    }

    fn finish(self) -> Result<W> {
        if !self.frames.is_empty() {
            return Err(CborError::Message(format!(
                "{} containers left open",
                self.frames.len()
            )));
        }
        Ok(self.writer)
    }
}

/// Byte output with the framing picked at runtime from the config.
pub(crate) enum ByteSink<W: Write> {
    Indefinite(IndefiniteSink<W>),
    Definite(DefiniteSink<W>),
}

impl<W: Write> ByteSink<W> {
    pub fn new(writer: W, definite_lengths: bool) -> Self {
        if definite_lengths {
            ByteSink::Definite(DefiniteSink::new(writer))
        } else {
            ByteSink::Indefinite(IndefiniteSink::new(writer))
        }
    }
}

macro_rules! forward {
    ($($method:ident($($arg:ident: $ty:ty),*);)*) => {
        $(
            fn $method(&mut self, $($arg: $ty),*) -> Result<()> {
                match self {
                    ByteSink::Indefinite(sink) => sink.$method($($arg),*),
                    ByteSink::Definite(sink) => sink.$method($($arg),*),
                }
            }
        )*
    };
}

impl<W: Write> Sink for ByteSink<W> {
    type Output = W;

    forward! {
        tag(tag: u64);
        unsigned(value: u64);
        negative(magnitude: u64);
        float32(value: f32);
        float64(value: f64);
        text(value: &str);
        bytes(value: &[u8]);
        boolean(value: bool);
        null();
        empty_map();
        begin_array(len: Option<usize>);
        begin_map(len: Option<usize>);
        end();
    }

    fn finish(self) -> Result<W> {
        match self {
            ByteSink::Indefinite(sink) => sink.finish(),
            ByteSink::Definite(sink) => sink.finish(),
        }
    }
}
