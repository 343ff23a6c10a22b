//! NTP time tags
//!
//! A time tag is 64-bit fixed point: seconds since 1900-01-01 followed by a
//! binary fraction of a second (2^32 units per second). Applications work in
//! Unix milliseconds, so conversions go through the 70-year epoch offset.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::atomic::{field, Atomic};
use crate::Result;

/// Seconds between the NTP epoch (1900) and the Unix epoch (1970)
pub const SECONDS_70_YEARS: i64 = 2_208_988_800;

/// Fraction units per second
pub const TWO_POWER_32: f64 = 4_294_967_296.0;

/// Current Unix time in milliseconds
pub fn now_millis() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_millis() as i64,
        Err(before) => -(before.duration().as_millis() as i64),
    }
}

/// An OSC time tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timetag {
    /// Seconds since 1900-01-01
    pub seconds: u32,
    /// Fraction of a second in units of 2^-32 s
    pub fraction: u32,
}

impl Timetag {
    /// The special "deliver immediately" time tag
    pub const IMMEDIATE: Timetag = Timetag {
        seconds: 0,
        fraction: 1,
    };

    pub const fn new(seconds: u32, fraction: u32) -> Self {
        Self { seconds, fraction }
    }

    /// Time tag for the current wall-clock time
    pub fn now() -> Self {
        Self::from_millis(now_millis())
    }

    /// Convert Unix milliseconds to a time tag
    ///
    /// Seconds wrap at the end of NTP era 0 (2036-02-07).
    pub fn from_millis(ms: i64) -> Self {
        let whole = ms.div_euclid(1000);
        let rest = ms.rem_euclid(1000);

        Self {
            seconds: (whole + SECONDS_70_YEARS) as u32,
            fraction: (TWO_POWER_32 * (rest as f64 / 1000.0)).round() as u32,
        }
    }

    /// Convert to Unix milliseconds, rounding the fraction to the nearest millisecond
    pub fn to_millis(&self) -> i64 {
        let seconds = self.seconds as i64 - SECONDS_70_YEARS;
        let millis = (self.fraction as f64 * 1000.0 / TWO_POWER_32).round() as i64;
        seconds * 1000 + millis
    }

    /// Read the time tag as Unix milliseconds
    pub fn timestamp(&self) -> i64 {
        self.to_millis()
    }

    /// Overwrite the time tag from Unix milliseconds, returning them
    pub fn set_timestamp(&mut self, ms: i64) -> i64 {
        *self = Self::from_millis(ms);
        ms
    }

    pub fn is_immediate(&self) -> bool {
        *self == Self::IMMEDIATE
    }

    /// Delivery time in Unix milliseconds, `None` for the immediate tag
    pub fn scheduled_at(&self) -> Option<i64> {
        if self.is_immediate() {
            None
        } else {
            Some(self.to_millis())
        }
    }
}

impl From<SystemTime> for Timetag {
    fn from(time: SystemTime) -> Self {
        let ms = match time.duration_since(UNIX_EPOCH) {
            Ok(elapsed) => elapsed.as_millis() as i64,
            Err(before) => -(before.duration().as_millis() as i64),
        };
        Self::from_millis(ms)
    }
}

impl Atomic for Timetag {
    fn pack_into(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_u32(self.seconds);
        buf.put_u32(self.fraction);
        Ok(())
    }

    fn unpack(buf: &[u8], offset: usize) -> Result<(Self, usize)> {
        let raw = field(buf, offset, 8)?;
        let seconds = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
        let fraction = u32::from_be_bytes([raw[4], raw[5], raw[6], raw[7]]);
        Ok((Self { seconds, fraction }, offset + 8))
    }
}
