//! Integer time values.
//!
//! Device timestamps and wall-clock receipt times both flow through
//! [`Timestamp`]. Every comparison, subtraction and interval computation is
//! done on the wrapped `i128`; conversion to `f64` only happens after a
//! subtraction, when a delta is mapped to pixels or formatted for display.

use std::fmt;
use std::ops::{Add, AddAssign, Div, Sub, SubAssign};
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A point in time or a signed time delta, in the unit of whatever produced it
/// (milliseconds for receipt times, device ticks for trace timestamps).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i128);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);
    pub const ONE: Timestamp = Timestamp(1);

    pub const fn new(value: i128) -> Self {
        Self(value)
    }

    pub const fn from_millis(ms: u64) -> Self {
        Self(ms as i128)
    }

    pub const fn get(self) -> i128 {
        self.0
    }

    /// Lossy conversion for pixel math and labels.
    pub fn as_f64(self) -> f64 {
        self.0 as f64
    }

    /// Floors a non-negative or negative real into a time value.
    ///
    /// Non-finite inputs collapse to zero.
    pub fn from_f64_floor(value: f64) -> Self {
        if value.is_finite() {
            Self(value.floor() as i128)
        } else {
            Self::ZERO
        }
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn max(self, other: Self) -> Self {
        Ord::max(self, other)
    }

    pub fn min(self, other: Self) -> Self {
        Ord::min(self, other)
    }
}

impl Add for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Timestamp) -> Timestamp {
        Timestamp(self.0 + rhs.0)
    }
}

impl AddAssign for Timestamp {
    fn add_assign(&mut self, rhs: Timestamp) {
        self.0 += rhs.0;
    }
}

impl Sub for Timestamp {
    type Output = Timestamp;

    fn sub(self, rhs: Timestamp) -> Timestamp {
        Timestamp(self.0 - rhs.0)
    }
}

impl SubAssign for Timestamp {
    fn sub_assign(&mut self, rhs: Timestamp) {
        self.0 -= rhs.0;
    }
}

/// Truncating integer division, matching how half-widths are taken.
impl Div<i128> for Timestamp {
    type Output = Timestamp;

    fn div(self, rhs: i128) -> Timestamp {
        Timestamp(self.0 / rhs)
    }
}

impl From<u64> for Timestamp {
    fn from(value: u64) -> Self {
        Self(value as i128)
    }
}

impl From<i64> for Timestamp {
    fn from(value: i64) -> Self {
        Self(value as i128)
    }
}

impl From<u32> for Timestamp {
    fn from(value: u32) -> Self {
        Self(value as i128)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match i64::try_from(self.0) {
            Ok(small) => serializer.serialize_i64(small),
            Err(_) => serializer.serialize_str(&self.0.to_string()),
        }
    }
}

impl FromStr for Timestamp {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i128>().map(Timestamp)
    }
}

/// Accepts a JSON integer of any width or a decimal string. Numbers keep their
/// source digits (serde_json `arbitrary_precision`), so nothing passes through
/// `f64`.
impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let digits = match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::String(s) => s,
            other => {
                return Err(D::Error::custom(format!(
                    "expected an integer timestamp or a decimal string, found {other}"
                )));
            }
        };
        digits
            .parse()
            .map_err(|err| D::Error::custom(format!("timestamp {digits:?}: {err}")))
    }
}
