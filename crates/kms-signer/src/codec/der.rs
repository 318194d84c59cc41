//! Minimal DER reader for ECDSA signatures.
//!
//! Definite lengths and single-byte tags only, which covers the
//! `SEQUENCE { INTEGER r, INTEGER s }` a KMS returns.

pub const TAG_INTEGER: u8 = 0x02;
pub const TAG_SEQUENCE: u8 = 0x30;

/// Lengths above this many bytes of length octets are rejected.
const MAX_LENGTH_OCTETS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DerError {
    #[error("input truncated: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },
    #[error("unexpected tag 0x{found:02x}, expected 0x{expected:02x}")]
    UnexpectedTag { expected: u8, found: u8 },
    #[error("invalid length encoding")]
    InvalidLength,
    #[error("{0} trailing bytes after element")]
    TrailingData(usize),
}

/// One decoded tag/length/value element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tlv<'a> {
    pub tag: u8,
    pub value: &'a [u8],
}

impl<'a> Tlv<'a> {
    /// Reader over the contents of a constructed element.
    pub fn children(&self) -> DerReader<'a> {
        DerReader::new(self.value)
    }
}

/// Sequential reader over concatenated DER elements.
#[derive(Debug, Clone)]
pub struct DerReader<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> DerReader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub fn remaining(&self) -> usize {
        self.input.len().saturating_sub(self.pos)
    }

    /// Read the next element, whatever its tag.
    pub fn read(&mut self) -> Result<Tlv<'a>, DerError> {
        let tag = self.take(1)?[0];
        let len = self.read_length()?;
        let value = self.take(len)?;
        Ok(Tlv { tag, value })
    }

    /// Read the next element and require `tag`.
    pub fn read_tagged(&mut self, tag: u8) -> Result<Tlv<'a>, DerError> {
        let tlv = self.read()?;
        if tlv.tag != tag {
            return Err(DerError::UnexpectedTag {
                expected: tag,
                found: tlv.tag,
            });
        }
        Ok(tlv)
    }

    /// Read every remaining element.
    pub fn read_all(&mut self) -> Result<Vec<Tlv<'a>>, DerError> {
        let mut elements = Vec::new();
        while !self.is_empty() {
            elements.push(self.read()?);
        }
        Ok(elements)
    }

    /// Fail if anything is left unread.
    pub fn finish(&self) -> Result<(), DerError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(DerError::TrailingData(n)),
        }
    }

    fn read_length(&mut self) -> Result<usize, DerError> {
        let first = self.take(1)?[0];
        if first & 0x80 == 0 {
            return Ok(usize::from(first));
        }

        // 0x80 is the indefinite form, which DER forbids.
        let octets = usize::from(first & 0x7f);
        if octets == 0 || octets > MAX_LENGTH_OCTETS {
            return Err(DerError::InvalidLength);
        }

        let bytes = self.take(octets)?;
        if bytes[0] == 0 {
            return Err(DerError::InvalidLength);
        }
        let len = bytes
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | usize::from(b));
        if len < 0x80 {
            return Err(DerError::InvalidLength);
        }
        Ok(len)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DerError> {
        let available = self.remaining();
        if n > available {
            return Err(DerError::Truncated {
                needed: n,
                available,
            });
        }
        let slice = &self.input[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }
}

/// Parse `input` as exactly one element with `tag`.
pub fn parse_single(input: &[u8], tag: u8) -> Result<Tlv<'_>, DerError> {
    let mut reader = DerReader::new(input);
    let tlv = reader.read_tagged(tag)?;
    reader.finish()?;
    Ok(tlv)
}
