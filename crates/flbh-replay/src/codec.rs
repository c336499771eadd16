//! Primitive encode/decode for the container format.
//!
//! Fixed-width integers are big-endian. Variable-length integers are
//! little-endian base-128 with the top bit of each byte flagging that more
//! bytes follow. Strings are a varint byte length followed by UTF-8.
//!
//! Writers take any `Write` sink. Decoding works on an in-memory slice via
//! [`SliceReader`], which tracks the offset so errors can point at the
//! failing byte.

use std::io::{self, Write};

use crate::error::FormatError;

/// Most continuation bytes a varint may carry before it is rejected.
pub const MAX_VARINT_CONTINUATIONS: u32 = 5;

// ── Primitive writers ───────────────────────────────────────────

/// Append the varint encoding of `v` to `out`.
pub fn encode_varint(mut v: u32, out: &mut Vec<u8>) {
    while v & !0x7F != 0 {
        out.push((v & 0x7F) as u8 | 0x80);
        v >>= 7;
    }
    out.push(v as u8);
}

/// Write the varint encoding of `v`.
pub fn write_varint(w: &mut dyn Write, v: u32) -> io::Result<()> {
    let mut buf = Vec::with_capacity(5);
    encode_varint(v, &mut buf);
    w.write_all(&buf)
}

/// Number of bytes [`encode_varint`] produces for `v`.
pub fn varint_len(v: u32) -> usize {
    match v {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0x0FFF_FFFF => 4,
        _ => 5,
    }
}

/// Write a big-endian i32.
pub fn write_i32_be(w: &mut dyn Write, v: i32) -> io::Result<()> {
    w.write_all(&v.to_be_bytes())
}

/// Write a string as a varint byte length followed by its UTF-8 bytes.
pub fn write_str(w: &mut dyn Write, s: &str) -> io::Result<()> {
    write_varint(w, s.len() as u32)?;
    w.write_all(s.as_bytes())
}

/// Decode a single varint from the front of `data`.
///
/// Returns `(value, consumed_bytes)`.
pub fn decode_varint(data: &[u8]) -> Result<(u32, usize), FormatError> {
    let mut r = SliceReader::new(data);
    let v = r.read_varint()?;
    Ok((v, r.position()))
}

// ── Slice reader ────────────────────────────────────────────────

/// Forward-only reader over an in-memory buffer.
#[derive(Clone, Debug)]
pub struct SliceReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    /// Start reading at the beginning of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Start reading at byte offset `pos` of `data`.
    ///
    /// Offsets reported in errors stay relative to the start of `data`.
    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self {
            data,
            pos: pos.min(data.len()),
        }
    }

    /// Current byte offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Whether the reader has consumed the whole buffer.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The underlying buffer.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Borrow the next `n` bytes and advance past them.
    pub fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], FormatError> {
        if n > self.remaining() {
            return Err(FormatError::Truncated {
                what,
                offset: self.pos,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Read a big-endian u32.
    pub fn read_u32_be(&mut self, what: &'static str) -> Result<u32, FormatError> {
        let bytes = self.take(4, what)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a big-endian i32.
    pub fn read_i32_be(&mut self, what: &'static str) -> Result<i32, FormatError> {
        self.read_u32_be(what).map(|v| v as i32)
    }

    /// Read a big-endian i32 length prefix, rejecting negative values.
    pub fn read_len_i32(&mut self, what: &'static str) -> Result<usize, FormatError> {
        let length = self.read_i32_be(what)?;
        usize::try_from(length).map_err(|_| FormatError::InvalidLength { what, length })
    }

    /// Read a varint.
    ///
    /// Fails with [`FormatError::VarIntTooLong`] once more than
    /// [`MAX_VARINT_CONTINUATIONS`] continuation bytes have been consumed.
    /// Bits shifted beyond 32 are discarded.
    pub fn read_varint(&mut self) -> Result<u32, FormatError> {
        let start = self.pos;
        let mut value = 0u32;
        let mut continuations = 0u32;
        loop {
            let Some(&byte) = self.data.get(self.pos) else {
                return Err(FormatError::Truncated {
                    what: "varint",
                    offset: start,
                    needed: self.pos - start + 1,
                    remaining: self.pos - start,
                });
            };
            self.pos += 1;

            let bits = u32::from(byte & 0x7F)
                .checked_shl(continuations * 7)
                .unwrap_or(0);
            value |= bits;
            if byte & 0x80 == 0 {
                return Ok(value);
            }

            continuations += 1;
            if continuations > MAX_VARINT_CONTINUATIONS {
                return Err(FormatError::VarIntTooLong { offset: start });
            }
        }
    }

    /// Read a varint-length-prefixed UTF-8 string.
    ///
    /// `index` only feeds the error message.
    pub fn read_str(&mut self, index: usize) -> Result<String, FormatError> {
        let len = self.read_varint()? as usize;
        let bytes = self.take(len, "action name")?;
        String::from_utf8(bytes.to_vec()).map_err(|_| FormatError::InvalidUtf8 { index })
    }
}
