// This file is part of Gasrelay.
//
// Gasrelay is free software: you can redistribute it and/or modify it under the
// terms of the GNU Lesser General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version.
//
// Gasrelay is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with Gasrelay.
// If not, see https://www.gnu.org/licenses/.

//! Block timestamps used for the relay unstake delay.

use std::{
    fmt,
    fmt::{Debug, Display, Formatter},
    ops::Add,
    time::Duration,
};

use alloy_primitives::U64;
use chrono::{DateTime, LocalResult, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A block timestamp in seconds since the epoch.
///
/// Serializes as a hex quantity.
#[derive(Clone, Copy, Default, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create a new timestamp from seconds since the epoch.
    pub fn new(seconds_since_epoch: u64) -> Self {
        Self(seconds_since_epoch)
    }

    /// Returns the number of seconds since the epoch of this timestamp.
    pub fn seconds_since_epoch(self) -> u64 {
        self.0
    }
}

impl From<u64> for Timestamp {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl Add<Duration> for Timestamp {
    type Output = Self;

    fn add(self, duration: Duration) -> Self::Output {
        Self(self.0.saturating_add(duration.as_secs()))
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let datetime = i64::try_from(self.0)
            .ok()
            .and_then(|secs| match Utc.timestamp_opt(secs, 0) {
                LocalResult::Single(datetime) => Some(datetime),
                _ => None,
            });
        match datetime {
            Some(datetime) => Display::fmt(&datetime, f),
            None => write!(f, "later than {}", DateTime::<Utc>::MAX_UTC),
        }
    }
}

impl Debug for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({} = {})", self.0, self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let n = U64::deserialize(deserializer)?;
        Ok(Self(n.to()))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        U64::from(self.0).serialize(serializer)
    }
}
