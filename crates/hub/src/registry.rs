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

use std::{collections::HashMap, time::Duration};

use alloy_primitives::{Address, U256};
use gasrelay_types::{HubError, HubResult, RelayRecord, RelayState, Timestamp};

/// Stake and registration state of relays.
///
/// Records are never deleted. An unstaked relay keeps its record in the
/// `Removed` state with a zero stake.
#[derive(Clone, Debug, Default)]
pub struct RelayRegistry {
    relays: HashMap<Address, RelayRecord>,
}

impl RelayRegistry {
    /// Record of a relay
    pub fn get(&self, relay: Address) -> Option<&RelayRecord> {
        self.relays.get(&relay)
    }

    /// Record of a relay, only if it is registered
    pub fn registered(&self, relay: Address) -> Option<&RelayRecord> {
        self.get(relay).filter(|r| r.is_registered())
    }

    /// Total stake held for all relays
    pub fn total_stake(&self) -> U256 {
        self.relays
            .values()
            .fold(U256::ZERO, |acc, r| acc.saturating_add(r.stake))
    }

    /// Add stake for `relay`, owned by `owner`
    pub(crate) fn stake(
        &mut self,
        owner: Address,
        relay: Address,
        value: U256,
        unstake_delay: u64,
        min_unstake_delay: u64,
    ) -> HubResult<&RelayRecord> {
        if owner == relay {
            return Err(HubError::RelayCannotStakeForItself);
        }

        let mut min = min_unstake_delay;
        if let Some(record) = self.relays.get(&relay) {
            match record.state {
                RelayState::Removed => return Err(HubError::RelayAlreadyRemoved(relay)),
                RelayState::Staked | RelayState::Registered if record.owner != owner => {
                    return Err(HubError::NotRelayOwner(owner))
                }
                _ => {}
            }
            min = min.max(record.unstake_delay);
        }
        if unstake_delay < min {
            return Err(HubError::UnstakeDelayTooLow {
                delay: unstake_delay,
                min,
            });
        }

        let record = self.relays.entry(relay).or_default();
        if record.state == RelayState::Unknown {
            record.owner = owner;
            record.state = RelayState::Staked;
        }
        record.stake = record.stake.saturating_add(value);
        record.unstake_delay = unstake_delay;
        Ok(record)
    }

    /// Register the fee schedule of a staked relay
    pub(crate) fn register(
        &mut self,
        relay: Address,
        base_relay_fee: U256,
        pct_relay_fee: u64,
        url: String,
        min_stake: U256,
    ) -> HubResult<&RelayRecord> {
        let record = self.staked_mut(relay)?;
        if record.stake < min_stake {
            return Err(HubError::StakeTooLow {
                stake: record.stake,
                min: min_stake,
            });
        }

        record.base_relay_fee = base_relay_fee;
        record.pct_relay_fee = pct_relay_fee;
        record.url = url;
        record.state = RelayState::Registered;
        Ok(record)
    }

    /// Remove a relay, starting its unstake delay
    pub(crate) fn remove(
        &mut self,
        owner: Address,
        relay: Address,
        now: Timestamp,
    ) -> HubResult<&RelayRecord> {
        let record = self.staked_mut(relay)?;
        if record.owner != owner {
            return Err(HubError::NotRelayOwner(owner));
        }

        record.state = RelayState::Removed;
        record.unstake_time = Some(now + Duration::from_secs(record.unstake_delay));
        Ok(record)
    }

    /// Release the stake of a removed relay once its delay has elapsed.
    ///
    /// Returns the released stake.
    pub(crate) fn unstake(
        &mut self,
        owner: Address,
        relay: Address,
        now: Timestamp,
    ) -> HubResult<U256> {
        let record = self
            .relays
            .get_mut(&relay)
            .ok_or(HubError::RelayNotStaked(relay))?;
        if record.owner != owner {
            return Err(HubError::NotRelayOwner(owner));
        }
        if record.state != RelayState::Removed {
            return Err(HubError::RelayNotRemoved(relay));
        }
        if let Some(unstake_time) = record.unstake_time {
            if now < unstake_time {
                return Err(HubError::UnstakeTooEarly(unstake_time));
            }
        }

        Ok(std::mem::take(&mut record.stake))
    }

    pub(crate) fn restore(&mut self, relay: Address, record: Option<RelayRecord>) {
        match record {
            Some(record) => self.relays.insert(relay, record),
            None => self.relays.remove(&relay),
        };
    }

    fn staked_mut(&mut self, relay: Address) -> HubResult<&mut RelayRecord> {
        let record = self
            .relays
            .get_mut(&relay)
            .ok_or(HubError::RelayNotStaked(relay))?;
        match record.state {
            RelayState::Staked | RelayState::Registered => Ok(record),
            RelayState::Removed => Err(HubError::RelayAlreadyRemoved(relay)),
            RelayState::Unknown => Err(HubError::RelayNotStaked(relay)),
        }
    }
}
