//! OSC messages
//!
//! Wire layout:
//! ```text
//! ┌──────────────┬──────────────────┬─────────────────────┐
//! │ address      │ ",<type tags>"   │ arguments           │
//! │ (OSC string) │ (OSC string)     │ (each 4-byte padded)│
//! └──────────────┴──────────────────┴─────────────────────┘
//! ```

use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::address::ToAddress;
use crate::atomic::{read_string, write_string};
use crate::{Argument, Error, Result, Timetag};

/// An OSC message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Address (literal or pattern), always starting with `/` once normalized
    pub address: String,
    /// Arguments in declaration order
    pub args: Vec<Argument>,
    /// Timetag of the enclosing bundle, set while decoding bundle contents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timetag: Option<Timetag>,
}

impl Message {
    /// Create a message; string addresses are normalized, segment lists joined
    ///
    /// ```
    /// use oscwire_core::{Argument, Message};
    ///
    /// let msg = Message::new(["test", "path"], [Argument::Int(1)]);
    /// assert_eq!(msg.address, "/test/path");
    /// assert_eq!(msg.types(), ",i");
    /// ```
    pub fn new<A, I>(address: A, args: I) -> Self
    where
        A: ToAddress,
        I: IntoIterator<Item = Argument>,
    {
        Self {
            address: address.to_address(),
            args: args.into_iter().collect(),
            timetag: None,
        }
    }

    /// Builder-style [`Message::add`]
    pub fn with(mut self, value: impl Into<Argument>) -> Self {
        self.add(value);
        self
    }

    /// Append one argument
    pub fn add(&mut self, value: impl Into<Argument>) -> &mut Self {
        self.args.push(value.into());
        self
    }

    /// The type tag string as written on the wire, including the leading comma
    pub fn types(&self) -> String {
        let mut types = String::with_capacity(self.args.len() + 1);
        types.push(',');
        types.extend(self.args.iter().map(Argument::tag));
        types
    }

    /// Encode into a fresh buffer
    pub fn pack(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.encoded_size_hint());
        self.pack_into(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Append the encoded message to `buf`
    pub fn pack_into(&self, buf: &mut BytesMut) -> Result<()> {
        if self.address.is_empty() {
            return Err(Error::Encode("message address is empty".to_string()));
        }
        if !self.address.starts_with('/') {
            return Err(Error::Encode(format!(
                "message address must start with '/': {}",
                self.address
            )));
        }

        write_string(buf, &self.address)?;
        write_string(buf, &self.types())?;
        for arg in &self.args {
            arg.pack_into(buf)?;
        }
        Ok(())
    }

    /// Decode a message starting at `offset`, returning it with the next offset
    pub fn unpack(buf: &[u8], offset: usize) -> Result<(Self, usize)> {
        let (address, mut offset) = read_string(buf, offset)?;
        if !address.starts_with('/') {
            return Err(Error::Decode(format!(
                "message address must start with '/': {:?}",
                address
            )));
        }

        let (types, next) = read_string(buf, offset)?;
        offset = next;
        let tags = types
            .strip_prefix(',')
            .ok_or_else(|| Error::Decode(format!("type tag string must start with ',': {:?}", types)))?;

        let mut args = Vec::with_capacity(tags.len());
        for tag in tags.chars() {
            let (arg, next) = Argument::unpack(tag, buf, offset)?;
            args.push(arg);
            offset = next;
        }

        Ok((
            Self {
                address,
                args,
                timetag: None,
            },
            offset,
        ))
    }

    /// Decode a message from the start of `buf`
    pub fn decode(buf: &[u8]) -> Result<Self> {
        Self::unpack(buf, 0).map(|(message, _)| message)
    }

    fn encoded_size_hint(&self) -> usize {
        self.address.len() + self.args.len() + 8 + self.args.len() * 8
    }
}

/// Messages compare by address and arguments; the attached bundle timetag
/// is delivery metadata, not content.
impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address && self.args == other.args
    }
}
