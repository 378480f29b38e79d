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

use alloy_primitives::U256;
use serde::Deserialize;

/// Fee schedule and gas policy of a relay operator
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelayerSettings {
    /// Base fee advertised on registration
    pub base_relay_fee: U256,
    /// Minimum percentage fee a request must offer
    pub pct_relay_fee: u64,
    /// Percentage added to the chain's suggested gas price
    pub gas_price_percent: u64,
    /// Gas added on top of the hub's worst case estimate when submitting
    pub max_gas_margin: u64,
    /// Public URL advertised on registration
    pub url: String,
}

impl Default for RelayerSettings {
    fn default() -> Self {
        Self {
            base_relay_fee: U256::ZERO,
            pct_relay_fee: 10,
            gas_price_percent: 10,
            max_gas_margin: 400_000,
            url: "http://localhost:8090".to_string(),
        }
    }
}
