//! Packet discrimination
//!
//! A packet is either a message or a bundle; the first OSC string decides
//! which (`#bundle` for bundles, an address otherwise).

use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::atomic::read_string;
use crate::bundle::BUNDLE_TAG;
use crate::{Bundle, Error, Message, Result, Timetag};

/// A decoded or to-be-encoded OSC packet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Packet {
    Message(Message),
    Bundle(Bundle),
}

impl Packet {
    /// Decode a packet from the whole of `buf`
    pub fn decode(buf: &[u8]) -> Result<Self> {
        Self::unpack(buf, 0, None).map(|(packet, _)| packet)
    }

    /// Decode a packet starting at `offset`
    ///
    /// `parent` is the timetag of the enclosing bundle; a decoded message
    /// carries it for scheduled delivery.
    pub fn unpack(buf: &[u8], offset: usize, parent: Option<Timetag>) -> Result<(Self, usize)> {
        Self::unpack_nested(buf, offset, parent, 0)
    }

    pub(crate) fn unpack_nested(
        buf: &[u8],
        offset: usize,
        parent: Option<Timetag>,
        depth: usize,
    ) -> Result<(Self, usize)> {
        if buf.len() % 4 != 0 {
            return Err(Error::Decode(format!(
                "packet length {} is not a multiple of 4",
                buf.len()
            )));
        }

        let (head, _) = read_string(buf, offset)?;
        if head == BUNDLE_TAG {
            let (bundle, next) = Bundle::unpack_nested(buf, offset, depth)?;
            Ok((Packet::Bundle(bundle), next))
        } else {
            let (mut message, next) = Message::unpack(buf, offset)?;
            message.timetag = parent;
            Ok((Packet::Message(message), next))
        }
    }

    /// Encode into a fresh buffer
    pub fn pack(&self) -> Result<Bytes> {
        match self {
            Packet::Message(message) => message.pack(),
            Packet::Bundle(bundle) => bundle.pack(),
        }
    }

    /// Append the encoded packet to `buf`
    pub fn pack_into(&self, buf: &mut BytesMut) -> Result<()> {
        match self {
            Packet::Message(message) => message.pack_into(buf),
            Packet::Bundle(bundle) => bundle.pack_into(buf),
        }
    }

    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Packet::Message(message) => Some(message),
            Packet::Bundle(_) => None,
        }
    }

    pub fn as_bundle(&self) -> Option<&Bundle> {
        match self {
            Packet::Bundle(bundle) => Some(bundle),
            Packet::Message(_) => None,
        }
    }
}

impl From<Message> for Packet {
    fn from(message: Message) -> Self {
        Packet::Message(message)
    }
}

impl From<Bundle> for Packet {
    fn from(bundle: Bundle) -> Self {
        Packet::Bundle(bundle)
    }
}
