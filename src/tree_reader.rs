use crate::config::CborConfig;
use crate::element::{CborElement, CborMap};
use crate::error::{CborError, Result};
use crate::parser::{ByteParser, Kind, Parser, describe_kind};

/// Reads encoded bytes straight into a [`CborElement`] tree, without going
/// through serde. Tags are attached to the node they precede.
pub(crate) struct TreeReader<'de, 'c> {
    parser: ByteParser<'de>,
    config: &'c CborConfig,
    depth: usize,
}

impl<'de, 'c> TreeReader<'de, 'c> {
    pub fn new(data: &'de [u8], config: &'c CborConfig) -> Self {
        TreeReader {
            parser: ByteParser::new(data),
            config,
            depth: 0,
        }
    }

    /// Reads exactly one top-level item; anything after it is an error.
    pub fn read_root(mut self) -> Result<CborElement> {
        let element = self.read()?;
        if !self.parser.is_eof() {
            return Err(CborError::TrailingData(self.parser.remaining()));
        }
        Ok(element)
    }

    fn read(&mut self) -> Result<CborElement> {
        self.parser.collect_tags()?;
        let tags = self.parser.take_tags();
        let element = match self.parser.kind() {
            Kind::Unsigned | Kind::Negative => {
                let value = self.parser.next_integer()?;
                if value >= 0 {
                    CborElement::unsigned(value as u64)
                } else {
                    CborElement::negative((-1 - value) as u64)
                }
            }
            Kind::Bytes => CborElement::bytes(self.parser.next_bytes()?.into_owned()),
            Kind::Text => CborElement::text(self.parser.next_text()?.into_owned()),
            Kind::Float => CborElement::float(self.parser.next_double()?),
            Kind::Bool => CborElement::boolean(self.parser.next_bool()?),
            Kind::Null => {
                self.parser.next_null()?;
                CborElement::null()
            }
            Kind::Array => self.read_list()?,
            Kind::Map => self.read_map()?,
            Kind::Eof => return Err(CborError::eof()),
            other => {
                return Err(CborError::UnexpectedItem {
                    expected: "data item".into(),
                    found: describe_kind(other),
                });
            }
        };
        Ok(if tags.is_empty() {
            element
        } else {
            element.with_tags(tags)
        })
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.config.max_depth {
            tracing::debug!(max_depth = self.config.max_depth, "CBOR nesting too deep");
            return Err(CborError::DepthLimitExceeded(self.config.max_depth));
        }
        Ok(())
    }

    fn read_list(&mut self) -> Result<CborElement> {
        self.enter()?;
        let length = self.parser.start_array()?;
        tracing::trace!(?length, depth = self.depth, "reading list");
        let mut items = Vec::with_capacity(length.unwrap_or(0).min(1024));
        match length {
            Some(count) => {
                for _ in 0..count {
                    items.push(self.read()?);
                }
            }
            None => {
                while !self.parser.is_end() {
                    items.push(self.read()?);
                }
                self.parser.end()?;
            }
        }
        self.depth -= 1;
        Ok(CborElement::list(items))
    }

    fn read_map(&mut self) -> Result<CborElement> {
        self.enter()?;
        let length = self.parser.start_map()?;
        tracing::trace!(?length, depth = self.depth, "reading map");
        let mut entries = CborMap::with_capacity(length.unwrap_or(0).min(1024));
        match length {
            Some(pairs) => {
                for _ in 0..pairs {
                    let key = self.read()?;
                    entries.insert(key, self.read()?);
                }
            }
            None => {
                while !self.parser.is_end() {
                    let key = self.read()?;
                    entries.insert(key, self.read()?);
                }
                self.parser.end()?;
            }
        }
        self.depth -= 1;
        Ok(CborElement::map(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(data: &[u8]) -> Result<CborElement> {
        TreeReader::new(data, &CborConfig::default()).read_root()
    }

    #[test]
    fn test_tags_attach_to_nodes() {
        // 100(200({"a": 7(1)}))
        let data = [
            0xd8, 0x64, 0xd8, 0xc8, 0xa1, 0x61, b'a', 0xc7, 0x01,
        ];
        let element = read(&data).unwrap();
        assert_eq!(element.tags(), &[100, 200]);
        let inner = element.as_map().unwrap().get_str("a").unwrap();
        assert_eq!(inner, &CborElement::from(1).with_tags([7]));
    }

    #[test]
    fn test_both_container_forms() {
        let definite = read(&[0x82, 0x01, 0xa1, 0x01, 0xf7]).unwrap();
        let indefinite = read(&[0x9f, 0x01, 0xbf, 0x01, 0xf6, 0xff, 0xff]).unwrap();
        assert_eq!(definite, indefinite);
        assert_eq!(definite.to_string(), "[1, {1: null}]");
    }

    #[test]
    fn test_floats_widen() {
        assert_eq!(read(&[0xf9, 0x3c, 0x00]).unwrap(), CborElement::float(1.0));
        assert_eq!(
            read(&[0xfa, 0x3f, 0xc0, 0x00, 0x00]).unwrap(),
            CborElement::float(1.5)
        );
    }

    #[test]
    fn test_depth_limit() {
        let config = CborConfig::builder().max_depth(3).build();
        let ok = [0x81, 0x81, 0x81, 0x00];
        assert!(TreeReader::new(&ok, &config).read_root().is_ok());
        let deep = [0x81, 0x81, 0x81, 0x81, 0x00];
        assert!(matches!(
            TreeReader::new(&deep, &config).read_root().unwrap_err(),
            CborError::DepthLimitExceeded(3)
        ));
    }

    #[test]
    fn test_trailing_data() {
        assert!(matches!(
            read(&[0x01, 0x02, 0x03]).unwrap_err(),
            CborError::TrailingData(2)
        ));
    }

    #[test]
    fn test_unsupported_simple_value() {
        assert!(read(&[0xf0]).is_err());
        assert!(read(&[0xff]).is_err());
    }
}
