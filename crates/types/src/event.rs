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

use alloy_primitives::{Address, Bytes, Selector, U256};
use serde::Serialize;
use strum::AsRefStr;

use crate::{CanRelayStatus, RelayCallStatus, Timestamp};

/// Events emitted by the hub
#[derive(Clone, Debug, Eq, PartialEq, AsRefStr, Serialize)]
#[serde(rename_all_fields = "camelCase")]
pub enum HubEvent {
    /// Funds were deposited for a paymaster
    Deposited {
        /// Account credited
        paymaster: Address,
        /// Depositor
        from: Address,
        /// Amount deposited
        amount: U256,
    },
    /// Funds were withdrawn from an account
    Withdrawn {
        /// Account debited
        account: Address,
        /// Destination of the funds
        dest: Address,
        /// Amount withdrawn
        amount: U256,
    },
    /// Stake was added to a relay
    Staked {
        /// Relay address
        relay: Address,
        /// Relay owner
        owner: Address,
        /// Total stake after this call
        stake: U256,
        /// Unstake delay in seconds
        unstake_delay: u64,
    },
    /// A relay registered its fee schedule
    RelayAdded {
        /// Relay address
        relay: Address,
        /// Relay owner
        owner: Address,
        /// Flat fee
        base_relay_fee: U256,
        /// Percentage fee
        pct_relay_fee: u64,
        /// Current stake
        stake: U256,
        /// Unstake delay in seconds
        unstake_delay: u64,
        /// Opaque url
        url: String,
    },
    /// A relay was removed by its owner
    RelayRemoved {
        /// Relay address
        relay: Address,
        /// Earliest time the stake can be withdrawn
        unstake_time: Timestamp,
    },
    /// A relay's stake was returned to its owner
    Unstaked {
        /// Relay address
        relay: Address,
        /// Amount returned
        stake: U256,
    },
    /// A relay call was rejected by `canRelay`
    CanRelayFailed {
        /// Submitting relay
        relay: Address,
        /// Request sender
        from: Address,
        /// Request target
        target: Address,
        /// Request paymaster
        paymaster: Address,
        /// Selector of the forwarded call
        selector: Selector,
        /// Rejection reason
        reason: CanRelayStatus,
    },
    /// A relay call was executed and charged
    TransactionRelayed {
        /// Submitting relay
        relay: Address,
        /// Request sender
        from: Address,
        /// Request target
        target: Address,
        /// Request paymaster
        paymaster: Address,
        /// Selector of the forwarded call
        selector: Selector,
        /// Terminal status
        status: RelayCallStatus,
        /// Amount charged to the paymaster
        charge: U256,
    },
}

impl HubEvent {
    /// Event name
    pub fn name(&self) -> &str {
        self.as_ref()
    }
}

/// An event emitted by a paymaster or target contract
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ContractLog {
    /// Emitting contract
    pub address: Address,
    /// Event name
    pub name: String,
    /// Event payload
    pub data: Bytes,
}

/// An entry of the ordered event log
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LogEntry {
    /// Event emitted by the hub
    Hub(HubEvent),
    /// Event emitted by a contract called by the hub
    Contract(ContractLog),
}

impl LogEntry {
    /// Event name
    pub fn name(&self) -> &str {
        match self {
            LogEntry::Hub(event) => event.name(),
            LogEntry::Contract(log) => &log.name,
        }
    }

    /// The hub event, if this entry is one
    pub fn as_hub(&self) -> Option<&HubEvent> {
        match self {
            LogEntry::Hub(event) => Some(event),
            LogEntry::Contract(_) => None,
        }
    }

    /// The contract log, if this entry is one
    pub fn as_contract(&self) -> Option<&ContractLog> {
        match self {
            LogEntry::Contract(log) => Some(log),
            LogEntry::Hub(_) => None,
        }
    }
}

impl From<HubEvent> for LogEntry {
    fn from(event: HubEvent) -> Self {
        Self::Hub(event)
    }
}

impl From<ContractLog> for LogEntry {
    fn from(log: ContractLog) -> Self {
        Self::Contract(log)
    }
}
