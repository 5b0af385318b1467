use crate::element::{CborElement, CborMap};
use crate::error::{CborError, Result};
use crate::sink::Sink;

enum Container {
    List(Vec<CborElement>),
    Map {
        entries: CborMap,
        key: Option<CborElement>,
    },
}

/// A container being filled, with the tags that preceded it.
struct Open {
    container: Container,
    tags: Vec<u64>,
}

/// Builds a [`CborElement`] tree instead of bytes.
pub(crate) struct TreeSink {
    stack: Vec<Open>,
    pending_tags: Vec<u64>,
    root: Option<CborElement>,
}

impl TreeSink {
    pub fn new() -> Self {
        TreeSink {
            stack: Vec::new(),
            pending_tags: Vec::new(),
            root: None,
        }
    }

    fn push(&mut self, element: CborElement) -> Result<()> {
        let element = if self.pending_tags.is_empty() {
            element
        } else {
            element.with_tags(std::mem::take(&mut self.pending_tags))
        };
        self.attach(element)
    }

    fn attach(&mut self, element: CborElement) -> Result<()> {
        match self.stack.last_mut() {
            None if self.root.is_some() => Err(CborError::Message(
                "tree writer received a second top-level value".into(),
            )),
            None => {
                self.root = Some(element);
                Ok(())
            }
            Some(open) => {
                match &mut open.container {
                    Container::List(items) => items.push(element),
                    Container::Map { entries, key } => match key.take() {
                        None => *key = Some(element),
                        Some(k) => {
                            entries.insert(k, element);
                        }
                    },
                }
                Ok(())
            }
        }
    }

    fn begin(&mut self, container: Container) -> Result<()> {
        if self.stack.is_empty() && self.root.is_some() {
            return Err(CborError::Message(
                "tree writer received a second top-level value".into(),
            ));
        }
        self.stack.push(Open {
            container,
            tags: std::mem::take(&mut self.pending_tags),
        });
        Ok(())
    }
}

impl Sink for TreeSink {
    type Output = CborElement;

    fn tag(&mut self, tag: u64) -> Result<()> {
        self.pending_tags.push(tag);
        Ok(())
    }

    fn unsigned(&mut self, value: u64) -> Result<()> {
        self.push(CborElement::unsigned(value))
    }

    fn negative(&mut self, magnitude: u64) -> Result<()> {
        self.push(CborElement::negative(magnitude))
    }

    fn float32(&mut self, value: f32) -> Result<()> {
        self.push(CborElement::float(value as f64))
    }

    fn float64(&mut self, value: f64) -> Result<()> {
        self.push(CborElement::float(value))
    }

    fn text(&mut self, value: &str) -> Result<()> {
        self.push(CborElement::text(value))
    }

    fn bytes(&mut self, value: &[u8]) -> Result<()> {
        self.push(CborElement::bytes(value))
    }

    fn boolean(&mut self, value: bool) -> Result<()> {
        self.push(CborElement::boolean(value))
    }

    fn null(&mut self) -> Result<()> {
        self.push(CborElement::null())
    }

    fn empty_map(&mut self) -> Result<()> {
        self.push(CborElement::map(CborMap::new()))
    }

    fn begin_array(&mut self, len: Option<usize>) -> Result<()> {
        self.begin(Container::List(Vec::with_capacity(len.unwrap_or(0))))
    }

    fn begin_map(&mut self, len: Option<usize>) -> Result<()> {
        self.begin(Container::Map {
            entries: CborMap::with_capacity(len.unwrap_or(0)),
            key: None,
        })
    }

    fn end(&mut self) -> Result<()> {
        let open = self
            .stack
            .pop()
            .ok_or_else(|| CborError::Message("end of container without a start".into()))?;
        let element = match open.container {
            Container::List(items) => CborElement::List {
                items,
                tags: open.tags,
            },
            Container::Map { key: Some(_), .. } => {
                return Err(CborError::Message("map closed after a key without value".into()));
            }
            Container::Map { entries, key: None } => CborElement::Map {
                entries,
                tags: open.tags,
            },
        };
        self.attach(element)
    }

    fn finish(self) -> Result<CborElement> {
        if !self.stack.is_empty() {
            return Err(CborError::Message(format!(
                "{} containers left open",
                self.stack.len()
            )));
        }
        self.root
            .ok_or_else(|| CborError::Message("no value was written".into()))
    }
}
