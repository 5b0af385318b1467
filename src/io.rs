use crate::error::{CborError, Result};

/// Read cursor over a borrowed byte slice.
///
/// Bytes handed out by [`ByteInput::read_exact`] borrow from the original input, so
/// definite-length strings can be decoded without copying.
#[derive(Debug, Clone)]
pub(crate) struct ByteInput<'de> {
    data: &'de [u8],
    position: usize,
}

impl<'de> ByteInput<'de> {
    pub fn new(data: &'de [u8]) -> Self {
        ByteInput { data, position: 0 }
    }

    pub fn available(&self) -> usize {
        self.data.len() - self.position
    }

    /// Next byte, or `None` at end of input.
    pub fn read(&mut self) -> Option<u8> {
        let byte = self.data.get(self.position).copied()?;
        self.position += 1;
        Some(byte)
    }

    pub fn read_exact(&mut self, count: usize) -> Result<&'de [u8]> {
        if count > self.available() {
            return Err(CborError::eof_requesting(count, self.available()));
        }
        let slice = &self.data[self.position..self.position + count];
        self.position += count;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.read_exact(N)?);
        Ok(buf)
    }

    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.read_exact(count).map(|_| ())
    }
}
