//! Big-endian cursor reader and writer shared by the VAA and payload codecs.

use std::mem::size_of;

use primitive_types::U256;

use crate::{Address, Chain, MalformedInput};

/// A cursor over a byte slice. Every read either consumes exactly the bytes it needs or fails
/// with `MalformedInput::Eof` without moving the cursor.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    input: &'a [u8],
    offset: usize,
}

// `<type>::from_be_bytes` is not a trait function so there is no trait bound we can use in a
// generic function.
macro_rules! read_be_number {
    ($name:ident, $ty:ty) => {
        pub fn $name(&mut self) -> Result<$ty, MalformedInput> {
            Ok(<$ty>::from_be_bytes(self.read_array::<{ size_of::<$ty>() }>()?))
        }
    };
}

impl<'a> Reader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, offset: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.input.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], MalformedInput> {
        if self.remaining() < len {
            return Err(MalformedInput::Eof {
                offset: self.offset,
                needed: len,
            });
        }

        let data = &self.input[self.offset..self.offset + len];
        self.offset += len;
        Ok(data)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], MalformedInput> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.read_bytes(N)?);
        Ok(buf)
    }

    read_be_number!(read_u8, u8);
    read_be_number!(read_u16, u16);
    read_be_number!(read_u32, u32);
    read_be_number!(read_u64, u64);

    pub fn read_u256(&mut self) -> Result<U256, MalformedInput> {
        Ok(U256::from_big_endian(&self.read_array::<32>()?))
    }

    pub fn read_address(&mut self) -> Result<Address, MalformedInput> {
        self.read_array().map(Address)
    }

    pub fn read_chain(&mut self) -> Result<Chain, MalformedInput> {
        self.read_u16().map(Chain::from)
    }

    /// Reads a chain id that must name a concrete chain. `what` names the field for the error.
    pub fn read_concrete_chain(&mut self, what: &'static str) -> Result<Chain, MalformedInput> {
        match self.read_chain()? {
            Chain::Any => Err(MalformedInput::InvalidChain(what)),
            c => Ok(c),
        }
    }

    /// Reads a `u16` length followed by that many bytes.
    pub fn read_u16_prefixed(&mut self) -> Result<&'a [u8], MalformedInput> {
        let len = self.read_u16()?;
        self.read_bytes(len.into())
    }

    /// Consumes the rest of the input.
    pub fn rest(&mut self) -> &'a [u8] {
        let data = &self.input[self.offset..];
        self.offset = self.input.len();
        data
    }

    /// Should be called once a fixed-layout value has been fully read.
    pub fn finish(self) -> Result<(), MalformedInput> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(MalformedInput::TrailingData(n)),
        }
    }
}

/// Appends big-endian encodings to a byte buffer.
#[derive(Debug, Default, Clone)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
        }
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        self.bytes(&v.to_be_bytes())
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.bytes(&v.to_be_bytes())
    }

    pub fn u64(&mut self, v: u64) -> &mut Self {
        self.bytes(&v.to_be_bytes())
    }

    pub fn u256(&mut self, v: &U256) -> &mut Self {
        let mut b = [0u8; 32];
        v.to_big_endian(&mut b);
        self.bytes(&b)
    }

    pub fn chain(&mut self, c: Chain) -> &mut Self {
        self.u16(c.into())
    }

    pub fn bytes(&mut self, v: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(v);
        self
    }

    /// Writes a `u16` length followed by `v`.
    pub fn u16_prefixed(&mut self, what: &'static str, v: &[u8]) -> Result<&mut Self, MalformedInput> {
        let len = u16::try_from(v.len()).map_err(|_| MalformedInput::TooLong(what, v.len()))?;
        Ok(self.u16(len).bytes(v))
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}
