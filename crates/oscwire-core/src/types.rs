//! Message argument types

use bytes::BytesMut;
use serde::{Deserialize, Serialize};

use crate::atomic::{read_blob, read_string, write_blob, write_string, Atomic};
use crate::{Error, Result};

/// A typed OSC message argument
///
/// The variant decides the type tag character written into the type tag
/// string; there is no runtime type sniffing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Argument {
    /// `i` - 32-bit two's complement integer
    Int(i32),
    /// `f` - 32-bit IEEE 754 float
    Float(f32),
    /// `s` - NUL-terminated string
    Str(String),
    /// `b` - length-prefixed binary blob
    Blob(Vec<u8>),
    /// `h` - 64-bit two's complement integer (extension)
    Int64(i64),
    /// `d` - 64-bit IEEE 754 float (extension)
    Float64(f64),
    /// `t` - unsigned 64-bit integer (extension)
    UInt64(u64),
}

impl Argument {
    /// Build an `Int64` argument, rejecting values outside `[-2^63, 2^63-1]`
    pub fn int64(value: i128) -> Result<Self> {
        i64::try_from(value)
            .map(Argument::Int64)
            .map_err(|_| Error::Range(format!("{} does not fit a signed 64-bit integer", value)))
    }

    /// Build a `UInt64` argument, rejecting values outside `[0, 2^64-1]`
    pub fn uint64(value: i128) -> Result<Self> {
        u64::try_from(value)
            .map(Argument::UInt64)
            .map_err(|_| {
                Error::Range(format!("{} does not fit an unsigned 64-bit integer", value))
            })
    }

    /// The type tag character for this argument
    pub fn tag(&self) -> char {
        match self {
            Argument::Int(_) => 'i',
            Argument::Float(_) => 'f',
            Argument::Str(_) => 's',
            Argument::Blob(_) => 'b',
            Argument::Int64(_) => 'h',
            Argument::Float64(_) => 'd',
            Argument::UInt64(_) => 't',
        }
    }

    /// Append the encoded argument (without its tag) to `buf`
    pub fn pack_into(&self, buf: &mut BytesMut) -> Result<()> {
        match self {
            Argument::Int(v) => v.pack_into(buf),
            Argument::Float(v) => v.pack_into(buf),
            Argument::Str(v) => write_string(buf, v),
            Argument::Blob(v) => write_blob(buf, v),
            Argument::Int64(v) => v.pack_into(buf),
            Argument::Float64(v) => v.pack_into(buf),
            Argument::UInt64(v) => v.pack_into(buf),
        }
    }

    /// Decode one argument of type `tag` starting at `offset`
    pub fn unpack(tag: char, buf: &[u8], offset: usize) -> Result<(Self, usize)> {
        match tag {
            'i' => i32::unpack(buf, offset).map(|(v, o)| (Argument::Int(v), o)),
            'f' => f32::unpack(buf, offset).map(|(v, o)| (Argument::Float(v), o)),
            's' => read_string(buf, offset).map(|(v, o)| (Argument::Str(v), o)),
            'b' => read_blob(buf, offset).map(|(v, o)| (Argument::Blob(v), o)),
            'h' => i64::unpack(buf, offset).map(|(v, o)| (Argument::Int64(v), o)),
            'd' => f64::unpack(buf, offset).map(|(v, o)| (Argument::Float64(v), o)),
            't' => u64::unpack(buf, offset).map(|(v, o)| (Argument::UInt64(v), o)),
            other => Err(Error::Decode(format!("unknown type tag '{}'", other))),
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Argument::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Argument::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Argument::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Argument::Blob(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i32> for Argument {
    fn from(v: i32) -> Self {
        Argument::Int(v)
    }
}

impl From<f32> for Argument {
    fn from(v: f32) -> Self {
        Argument::Float(v)
    }
}

impl From<&str> for Argument {
    fn from(v: &str) -> Self {
        Argument::Str(v.to_string())
    }
}

impl From<String> for Argument {
    fn from(v: String) -> Self {
        Argument::Str(v)
    }
}

impl From<Vec<u8>> for Argument {
    fn from(v: Vec<u8>) -> Self {
        Argument::Blob(v)
    }
}

impl From<&[u8]> for Argument {
    fn from(v: &[u8]) -> Self {
        Argument::Blob(v.to_vec())
    }
}

impl From<i64> for Argument {
    fn from(v: i64) -> Self {
        Argument::Int64(v)
    }
}

impl From<f64> for Argument {
    fn from(v: f64) -> Self {
        Argument::Float64(v)
    }
}

impl From<u64> for Argument {
    fn from(v: u64) -> Self {
        Argument::UInt64(v)
    }
}
