// Copyright 2025 OctoQTI Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Non-negative durations with ISO-8601 round-tripping
//!
//! QTI durations are accumulated while a candidate interacts and are carried
//! in snapshots as ISO-8601 strings (`PT1H30M12.500S`). Sub-second precision
//! is kept to the millisecond.

use crate::error::{ModelError, Result};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

/// A non-negative time interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct QtiDuration {
    millis: u64,
}

impl QtiDuration {
    /// The zero duration
    pub const ZERO: Self = Self { millis: 0 };

    /// Create a duration from whole seconds
    pub fn from_seconds(seconds: u64) -> Self {
        Self {
            millis: seconds * 1000,
        }
    }

    /// Create a duration from milliseconds
    pub fn from_millis(millis: u64) -> Self {
        Self { millis }
    }

    /// Create a duration from a `chrono` interval, failing on negative input
    pub fn from_chrono(duration: chrono::Duration) -> Result<Self> {
        let millis = duration.num_milliseconds();
        if millis < 0 {
            return Err(ModelError::DurationUnderflow {
                message: format!("negative interval of {millis}ms"),
            });
        }
        Ok(Self {
            millis: millis as u64,
        })
    }

    /// The absolute interval between two instants
    pub fn between(a: chrono::DateTime<chrono::Utc>, b: chrono::DateTime<chrono::Utc>) -> Self {
        let millis = (b - a).num_milliseconds().unsigned_abs();
        Self { millis }
    }

    /// Whole milliseconds in this duration
    pub fn as_millis(&self) -> u64 {
        self.millis
    }

    /// Whole seconds in this duration, truncated
    pub fn as_seconds(&self) -> u64 {
        self.millis / 1000
    }

    /// Seconds in this duration, with fractional part
    pub fn as_seconds_f64(&self) -> f64 {
        self.millis as f64 / 1000.0
    }

    /// True when this duration is zero
    pub fn is_zero(&self) -> bool {
        self.millis == 0
    }

    /// Checked addition
    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.millis
            .checked_add(other.millis)
            .map(|millis| Self { millis })
    }

    /// Subtraction clamped at zero
    pub fn saturating_sub(&self, other: Self) -> Self {
        Self {
            millis: self.millis.saturating_sub(other.millis),
        }
    }

    /// Remaining time against a maximum, zero once the maximum is reached
    pub fn remaining_until(&self, max: Self) -> Self {
        max.saturating_sub(*self)
    }
}

impl Add for QtiDuration {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            millis: self.millis.saturating_add(rhs.millis),
        }
    }
}

impl AddAssign for QtiDuration {
    fn add_assign(&mut self, rhs: Self) {
        self.millis = self.millis.saturating_add(rhs.millis);
    }
}

impl fmt::Display for QtiDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.millis == 0 {
            return f.write_str("PT0S");
        }
        let mut rest = self.millis;
        let millis = rest % 1000;
        rest /= 1000;
        let seconds = rest % 60;
        rest /= 60;
        let minutes = rest % 60;
        rest /= 60;
        let hours = rest % 24;
        let days = rest / 24;

        f.write_str("P")?;
        if days > 0 {
            write!(f, "{days}D")?;
        }
        if hours > 0 || minutes > 0 || seconds > 0 || millis > 0 {
            f.write_str("T")?;
            if hours > 0 {
                write!(f, "{hours}H")?;
            }
            if minutes > 0 {
                write!(f, "{minutes}M")?;
            }
            if millis > 0 {
                write!(f, "{seconds}.{millis:03}S")?;
            } else if seconds > 0 {
                write!(f, "{seconds}S")?;
            }
        }
        Ok(())
    }
}

impl FromStr for QtiDuration {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        parse_iso8601(s).ok_or_else(|| ModelError::invalid_duration(s))
    }
}

/// Parse the `PnDTnHnMn.nS` subset of ISO-8601 durations.
///
/// Year and month designators are rejected: a calendar-relative duration has
/// no fixed length and cannot be accumulated by the session clock.
fn parse_iso8601(s: &str) -> Option<QtiDuration> {
    let rest = s.strip_prefix('P')?;
    if rest.is_empty() {
        return None;
    }
    let (date_part, time_part) = match rest.split_once('T') {
        Some((d, t)) => {
            if t.is_empty() {
                return None;
            }
            (d, Some(t))
        }
        None => (rest, None),
    };

    let mut millis: u64 = 0;
    let mut saw_component = false;

    let mut field_start = 0;
    for (idx, c) in date_part.char_indices() {
        if c.is_ascii_digit() {
            continue;
        }
        let number: u64 = date_part.get(field_start..idx)?.parse().ok()?;
        match c {
            'D' => millis = millis.checked_add(number.checked_mul(86_400_000)?)?,
            'W' => millis = millis.checked_add(number.checked_mul(604_800_000)?)?,
            _ => return None,
        }
        saw_component = true;
        field_start = idx + 1;
    }
    if field_start != date_part.len() {
        return None;
    }

    if let Some(time) = time_part {
        let mut field_start = 0;
        for (idx, c) in time.char_indices() {
            if c.is_ascii_digit() || c == '.' {
                continue;
            }
            let field = time.get(field_start..idx)?;
            match c {
                'H' => {
                    let n: u64 = field.parse().ok()?;
                    millis = millis.checked_add(n.checked_mul(3_600_000)?)?;
                }
                'M' => {
                    let n: u64 = field.parse().ok()?;
                    millis = millis.checked_add(n.checked_mul(60_000)?)?;
                }
                'S' => {
                    let seconds: f64 = field.parse().ok()?;
                    if !seconds.is_finite() || seconds < 0.0 {
                        return None;
                    }
                    millis = millis.checked_add((seconds * 1000.0).round() as u64)?;
                }
                _ => return None,
            }
            saw_component = true;
            field_start = idx + 1;
        }
        if field_start != time.len() {
            return None;
        }
    }

    saw_component.then_some(QtiDuration { millis })
}

impl Serialize for QtiDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for QtiDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}
