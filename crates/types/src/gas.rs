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

//! Gas accounting for relayed calls

use alloy_primitives::U256;
use gasrelay_utils::math;
use serde::{Deserialize, Serialize};

/// Gas cost of a zero calldata byte
pub const ZERO_BYTE_GAS: u64 = 4;

/// Gas ceilings a paymaster declares for its hooks
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasLimits {
    /// Ceiling for the acceptance hook
    pub acceptance_gas_limit: u64,
    /// Ceiling for the pre-authorization hook
    pub pre_relayed_call_gas_limit: u64,
    /// Ceiling for the post-authorization hook
    pub post_relayed_call_gas_limit: u64,
}

impl GasLimits {
    /// Sum of all three hook ceilings
    pub fn total(&self) -> u64 {
        self.acceptance_gas_limit
            .saturating_add(self.pre_relayed_call_gas_limit)
            .saturating_add(self.post_relayed_call_gas_limit)
    }

    /// Sum of the pre and post hook ceilings
    pub fn pre_and_post(&self) -> u64 {
        self.pre_relayed_call_gas_limit
            .saturating_add(self.post_relayed_call_gas_limit)
    }
}

/// Intrinsic gas of a piece of calldata
pub fn calldata_gas(data: &[u8], non_zero_byte_gas: u64) -> u64 {
    data.iter().fold(0u64, |acc, b| {
        acc.saturating_add(if *b == 0 {
            ZERO_BYTE_GAS
        } else {
            non_zero_byte_gas
        })
    })
}

/// Worst case gas of a relay call.
///
/// Every calldata byte is priced as non-zero so the result is an upper bound
/// regardless of the calldata content.
pub fn max_possible_gas(
    gas_limits: &GasLimits,
    hub_overhead: u64,
    relay_call_gas_limit: u64,
    calldata_size: u64,
    per_non_zero_byte_cost: u64,
) -> u64 {
    hub_overhead
        .saturating_add(gas_limits.total())
        .saturating_add(relay_call_gas_limit)
        .saturating_add(calldata_size.saturating_mul(per_non_zero_byte_cost))
}

/// Amount charged for `gas_used` at `gas_price` under a relay fee schedule.
///
/// `base_relay_fee + gas_used * gas_price * (100 + pct_relay_fee) / 100`, rounding down.
pub fn calculate_charge(
    gas_used: u64,
    gas_price: u128,
    base_relay_fee: U256,
    pct_relay_fee: u64,
) -> U256 {
    let gas_cost = U256::from(gas_used) * U256::from(gas_price);
    base_relay_fee.saturating_add(math::uint_increase_by_percent(gas_cost, pct_relay_fee))
}
