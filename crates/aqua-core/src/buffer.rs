//! Byte buffer that carries success or failure as data

use bytes::{Bytes, BytesMut};

use crate::error::InvalidAccess;

/// A fixed-capacity byte container with an explicit availability flag.
///
/// Functional-tier transport calls return this instead of an error so that
/// "read, and if that failed skip the write" composes without branching at
/// every call site. The contents of an unavailable buffer are never exposed:
/// every accessor returns [`InvalidAccess`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultBuffer {
    data: BytesMut,
    available: bool,
}

impl ResultBuffer {
    /// Failure sentinel: unavailable, zero length
    pub fn unavailable() -> Self {
        Self {
            data: BytesMut::new(),
            available: false,
        }
    }

    /// Available buffer of `length` zeroed bytes, ready to be filled by a read
    pub fn sized(length: usize) -> Self {
        Self {
            data: BytesMut::zeroed(length),
            available: true,
        }
    }

    /// Available buffer holding a copy of `data`
    pub fn from_slice(data: &[u8]) -> Self {
        Self {
            data: BytesMut::from(data),
            available: true,
        }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Capacity of the buffer; always zero when unavailable
    pub fn len(&self) -> usize {
        if self.available {
            self.data.len()
        } else {
            0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice(&self) -> Result<&[u8], InvalidAccess> {
        if self.available {
            Ok(&self.data)
        } else {
            Err(InvalidAccess)
        }
    }

    pub fn as_mut_slice(&mut self) -> Result<&mut [u8], InvalidAccess> {
        if self.available {
            Ok(&mut self.data)
        } else {
            Err(InvalidAccess)
        }
    }

    /// Consume the buffer and hand out its bytes
    pub fn into_bytes(self) -> Result<Bytes, InvalidAccess> {
        if self.available {
            Ok(self.data.freeze())
        } else {
            Err(InvalidAccess)
        }
    }

    /// Mark the buffer failed, discarding whatever it held
    pub fn invalidate(&mut self) {
        self.data.clear();
        self.available = false;
    }
}

impl Default for ResultBuffer {
    fn default() -> Self {
        Self::unavailable()
    }
}

impl From<Vec<u8>> for ResultBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self {
            data: BytesMut::from(&data[..]),
            available: true,
        }
    }
}
