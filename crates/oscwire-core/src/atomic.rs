//! OSC atomic data types
//!
//! Every atomic value is written big-endian and ends on a 32-bit boundary:
//! ```text
//! int32 / float32            4 bytes
//! int64 / uint64 / float64   8 bytes
//! string                     bytes + 1..=4 NUL, padded to a multiple of 4
//! blob                       int32 length + bytes, padded to a multiple of 4
//! ```
//!
//! Decoders take the whole buffer plus a start offset and return the offset
//! immediately past the consumed, padded field. Callers chain on that offset.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{Error, Result};

/// Round `n` up to the next multiple of four
#[inline]
pub const fn pad(n: usize) -> usize {
    (n + 3) & !3
}

/// A value with an OSC wire representation
pub trait Atomic: Sized {
    /// Append the encoded value to `buf`
    fn pack_into(&self, buf: &mut BytesMut) -> Result<()>;

    /// Decode a value starting at `offset`, returning it with the next offset
    fn unpack(buf: &[u8], offset: usize) -> Result<(Self, usize)>;

    /// Encode the value into a fresh buffer
    fn pack(&self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        self.pack_into(&mut buf)?;
        Ok(buf.freeze())
    }
}

/// Borrow `len` bytes at `offset` or report how much was missing
#[inline]
pub(crate) fn field(buf: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    let end = offset
        .checked_add(len)
        .ok_or_else(|| Error::Decode(format!("field length {} overflows", len)))?;
    buf.get(offset..end)
        .ok_or_else(|| Error::truncated(end, buf.len()))
}

macro_rules! fixed_width {
    ($ty:ty, $width:expr, $put:ident, $get:ident) => {
        impl Atomic for $ty {
            #[inline]
            fn pack_into(&self, buf: &mut BytesMut) -> Result<()> {
                buf.$put(*self);
                Ok(())
            }

            #[inline]
            fn unpack(buf: &[u8], offset: usize) -> Result<(Self, usize)> {
                let mut src = field(buf, offset, $width)?;
                Ok((src.$get(), offset + $width))
            }
        }
    };
}

fixed_width!(i32, 4, put_i32, get_i32);
fixed_width!(f32, 4, put_f32, get_f32);
fixed_width!(i64, 8, put_i64, get_i64);
fixed_width!(u64, 8, put_u64, get_u64);
fixed_width!(f64, 8, put_f64, get_f64);

/// Write an OSC string: the bytes, at least one NUL, padded to 4
pub fn write_string(buf: &mut BytesMut, value: &str) -> Result<()> {
    if value.as_bytes().contains(&0) {
        return Err(Error::Encode(format!(
            "string contains a NUL byte: {:?}",
            value
        )));
    }

    let padded = pad(value.len() + 1);
    buf.reserve(padded);
    buf.put_slice(value.as_bytes());
    buf.put_bytes(0, padded - value.len());
    Ok(())
}

/// Read an OSC string starting at `offset`
pub fn read_string(buf: &[u8], offset: usize) -> Result<(String, usize)> {
    let rest = buf
        .get(offset..)
        .ok_or_else(|| Error::truncated(offset, buf.len()))?;

    let len = rest
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| Error::Decode("string is missing its NUL terminator".to_string()))?;

    let end = pad(offset + len + 1);
    if end > buf.len() {
        return Err(Error::truncated(end, buf.len()));
    }

    let value = std::str::from_utf8(&rest[..len])
        .map_err(|e| Error::Decode(format!("string is not valid UTF-8: {}", e)))?;

    Ok((value.to_string(), end))
}

/// Write an OSC blob: int32 byte count, the bytes, padding excluded from the count
pub fn write_blob(buf: &mut BytesMut, data: &[u8]) -> Result<()> {
    let len = i32::try_from(data.len()).map_err(|_| {
        Error::Encode(format!(
            "blob of {} bytes exceeds the int32 length prefix",
            data.len()
        ))
    })?;

    let padded = pad(data.len());
    buf.reserve(4 + padded);
    buf.put_i32(len);
    buf.put_slice(data);
    buf.put_bytes(0, padded - data.len());
    Ok(())
}

/// Read an OSC blob starting at `offset`
pub fn read_blob(buf: &[u8], offset: usize) -> Result<(Vec<u8>, usize)> {
    let (len, start) = i32::unpack(buf, offset)?;
    let len = usize::try_from(len)
        .map_err(|_| Error::Decode(format!("negative blob length {}", len)))?;

    let data = field(buf, start, len)?;

    let end = pad(start + len);
    if end > buf.len() {
        return Err(Error::truncated(end, buf.len()));
    }

    Ok((data.to_vec(), end))
}

impl Atomic for String {
    fn pack_into(&self, buf: &mut BytesMut) -> Result<()> {
        write_string(buf, self)
    }

    fn unpack(buf: &[u8], offset: usize) -> Result<(Self, usize)> {
        read_string(buf, offset)
    }
}

impl Atomic for Vec<u8> {
    fn pack_into(&self, buf: &mut BytesMut) -> Result<()> {
        write_blob(buf, self)
    }

    fn unpack(buf: &[u8], offset: usize) -> Result<(Self, usize)> {
        read_blob(buf, offset)
    }
}
