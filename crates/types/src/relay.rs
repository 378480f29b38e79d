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

use alloy_primitives::{Address, U256};
use parse_display::Display;
use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// Lifecycle state of a relay
#[derive(Display, Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
#[display(style = "snake_case")]
pub enum RelayState {
    /// No record
    #[default]
    Unknown,
    /// Stake was added, not registered yet
    Staked,
    /// Registered and allowed to relay
    Registered,
    /// Removed by its owner, waiting for the unstake delay
    Removed,
}

/// Stake and registration record of a relay
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRecord {
    /// Account that staked for the relay
    pub owner: Address,
    /// Current stake
    pub stake: U256,
    /// Delay between removal and unstake, in seconds
    pub unstake_delay: u64,
    /// Earliest unstake time, set on removal
    pub unstake_time: Option<Timestamp>,
    /// Lifecycle state
    pub state: RelayState,
    /// Registered flat fee
    pub base_relay_fee: U256,
    /// Registered percentage fee
    pub pct_relay_fee: u64,
    /// Registered url, opaque to the hub
    pub url: String,
}

impl RelayRecord {
    /// Returns true if the relay may submit calls
    pub fn is_registered(&self) -> bool {
        self.state == RelayState::Registered
    }
}
