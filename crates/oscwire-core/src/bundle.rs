//! OSC bundles
//!
//! Wire layout:
//! ```text
//! "#bundle\0" | timetag (8) | size (int32) | element | size | element | ...
//! ```
//!
//! Elements are messages or nested bundles. Each element is framed by its
//! own byte length, so decoding an element never reads past its frame.

use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::atomic::{read_string, write_string, Atomic};
use crate::packet::Packet;
use crate::{Error, Result, Timetag};

/// Literal head of every bundle
pub const BUNDLE_TAG: &str = "#bundle";

/// Deepest bundle nesting accepted while decoding
pub const MAX_NESTING: usize = 64;

/// A time-tagged collection of messages and bundles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub timetag: Timetag,
    pub elements: Vec<Packet>,
}

impl Bundle {
    /// Empty bundle scheduled for the current wall-clock time
    pub fn new() -> Self {
        Self::at(Timetag::now())
    }

    /// Empty bundle with the given timetag
    pub fn at(timetag: Timetag) -> Self {
        Self {
            timetag,
            elements: Vec::new(),
        }
    }

    /// Bundle of `elements`, timed now unless a timetag is given
    pub fn with_elements<I, P>(elements: I, timetag: Option<Timetag>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Packet>,
    {
        Self {
            timetag: timetag.unwrap_or_else(Timetag::now),
            elements: elements.into_iter().map(Into::into).collect(),
        }
    }

    /// Replace the timetag
    pub fn with_timetag(mut self, timetag: Timetag) -> Self {
        self.timetag = timetag;
        self
    }

    /// Append a message or bundle
    pub fn add(&mut self, item: impl Into<Packet>) -> &mut Self {
        self.elements.push(item.into());
        self
    }

    /// Scheduled time in Unix milliseconds
    pub fn timestamp(&self) -> i64 {
        self.timetag.timestamp()
    }

    /// Reschedule to `ms` Unix milliseconds
    pub fn set_timestamp(&mut self, ms: i64) -> i64 {
        self.timetag.set_timestamp(ms)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Encode into a fresh buffer
    pub fn pack(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(16 + self.elements.len() * 32);
        self.pack_into(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Append the encoded bundle to `buf`
    pub fn pack_into(&self, buf: &mut BytesMut) -> Result<()> {
        write_string(buf, BUNDLE_TAG)?;
        self.timetag.pack_into(buf)?;

        for element in &self.elements {
            // reserve the size slot and backfill once the element is written
            let slot = buf.len();
            buf.extend_from_slice(&[0; 4]);
            element.pack_into(buf)?;

            let size = i32::try_from(buf.len() - slot - 4).map_err(|_| {
                Error::Encode("bundle element exceeds the int32 size prefix".to_string())
            })?;
            buf[slot..slot + 4].copy_from_slice(&size.to_be_bytes());
        }

        Ok(())
    }

    /// Decode a bundle starting at `offset`
    ///
    /// Elements are read until the end of `buf`, so callers pass exactly the
    /// bundle's bytes (the whole packet, or the frame of a nested element).
    pub fn unpack(buf: &[u8], offset: usize) -> Result<(Self, usize)> {
        Self::unpack_nested(buf, offset, 0)
    }

    /// Decode a bundle from the whole of `buf`
    pub fn decode(buf: &[u8]) -> Result<Self> {
        Self::unpack(buf, 0).map(|(bundle, _)| bundle)
    }

    pub(crate) fn unpack_nested(buf: &[u8], offset: usize, depth: usize) -> Result<(Self, usize)> {
        if depth >= MAX_NESTING {
            return Err(Error::Decode(format!(
                "bundles nested deeper than {} levels",
                MAX_NESTING
            )));
        }

        let (head, offset) = read_string(buf, offset)?;
        if head != BUNDLE_TAG {
            return Err(Error::Decode(format!(
                "bundle must start with {:?}, found {:?}",
                BUNDLE_TAG, head
            )));
        }

        let (timetag, mut offset) = Timetag::unpack(buf, offset)?;
        let mut elements = Vec::new();

        while offset < buf.len() {
            let (size, start) = i32::unpack(buf, offset)?;
            let size = usize::try_from(size)
                .map_err(|_| Error::Decode(format!("negative bundle element size {}", size)))?;
            if size % 4 != 0 {
                return Err(Error::Decode(format!(
                    "bundle element size {} is not a multiple of 4",
                    size
                )));
            }

            let end = start + size;
            let frame = buf
                .get(start..end)
                .ok_or_else(|| Error::truncated(end, buf.len()))?;

            let (element, consumed) = Packet::unpack_nested(frame, 0, Some(timetag), depth + 1)?;
            if consumed != size {
                return Err(Error::Decode(format!(
                    "bundle element declared {} bytes but decoded {}",
                    size, consumed
                )));
            }

            elements.push(element);
            offset = end;
        }

        Ok((Self { timetag, elements }, offset))
    }
}

impl Default for Bundle {
    fn default() -> Self {
        Self::new()
    }
}
