//! Variable length integers used by pointer addresses (CIP-19)

use crate::address::AddressError;

// ANBF:
// VARIABLE-LENGTH-UINT = (%b1 | UINT7 | VARIABLE-LENGTH-UINT)
//                     / (%b0 | UINT7)
//
// UINT7 = 7BIT

/// Variable-length integer encoder
#[derive(Default)]
pub struct VarIntEncoder {
    data: Vec<u8>,
}

impl VarIntEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an integer, most significant group first
    pub fn push(&mut self, num: u64) {
        let mut len = 7;
        while len < 64 && (num >> len) != 0 {
            len += 7;
        }

        while len > 7 {
            len -= 7;
            self.data.push(((num >> len) & 0x7f) as u8 | 0x80);
        }
        self.data.push((num & 0x7f) as u8);
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

/// Variable length integer decoder
pub struct VarIntDecoder<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> VarIntDecoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        VarIntDecoder { data, position: 0 }
    }

    /// Read the next varint from the stream
    pub fn read(&mut self) -> Result<u64, AddressError> {
        let mut value: u64 = 0;

        while let Some(&byte) = self.data.get(self.position) {
            self.position += 1;

            if value >> 57 != 0 {
                return Err(AddressError::PointerOverflow);
            }
            value = (value << 7) | (byte & 0x7f) as u64;

            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }

        Err(AddressError::PointerTruncated)
    }

    /// True once every byte has been consumed
    pub fn is_finished(&self) -> bool {
        self.position >= self.data.len()
    }
}
