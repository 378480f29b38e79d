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

use alloy_primitives::{Address, Bytes, U256};
use gasrelay_types::{ContractLog, ExecutionError, Timestamp};

use crate::{GasMeter, HubStore, RelayHub};

/// Base cost of a transaction
pub const TX_BASE_GAS: u64 = 21_000;
/// Cost of calling another contract
pub const CALL_GAS: u64 = 700;
/// Cost of calling back into the hub
pub const HUB_CALL_GAS: u64 = 2_600;

const LOG_GAS: u64 = 375;
const LOG_DATA_GAS: u64 = 8;

/// Cost of emitting an event with `data_len` bytes of data
pub fn log_gas(data_len: usize) -> u64 {
    LOG_GAS.saturating_add(LOG_DATA_GAS.saturating_mul(data_len as u64))
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Frame {
    pub(crate) address: Address,
    pub(crate) caller: Address,
    pub(crate) sender: Address,
    pub(crate) origin: Address,
}

/// Execution environment of a contract call made by the hub.
///
/// Gives the running contract its call context, a gas meter and access to the
/// hub's store through the same entry points an external caller would use.
pub struct CallEnv<'a> {
    hub: &'a RelayHub,
    store: &'a mut HubStore,
    meter: &'a mut GasMeter,
    frame: Frame,
}

impl<'a> CallEnv<'a> {
    pub(crate) fn new(
        hub: &'a RelayHub,
        store: &'a mut HubStore,
        meter: &'a mut GasMeter,
        frame: Frame,
    ) -> Self {
        Self {
            hub,
            store,
            meter,
            frame,
        }
    }

    /// Address of the running contract
    pub fn address(&self) -> Address {
        self.frame.address
    }

    /// Immediate caller
    pub fn caller(&self) -> Address {
        self.frame.caller
    }

    /// Effective sender: the relayed end user when called through the
    /// forwarder, the caller otherwise
    pub fn sender(&self) -> Address {
        self.frame.sender
    }

    /// Account that submitted the transaction
    pub fn origin(&self) -> Address {
        self.frame.origin
    }

    /// Current block timestamp
    pub fn timestamp(&self) -> Timestamp {
        self.store.timestamp()
    }

    /// Gas left in this frame
    pub fn gas_left(&self) -> u64 {
        self.meter.remaining()
    }

    /// Consume gas from this frame
    pub fn consume_gas(&mut self, gas: u64) -> Result<(), ExecutionError> {
        Ok(self.meter.consume(gas)?)
    }

    /// Append an event to the log on behalf of the running contract
    pub fn emit(&mut self, name: impl Into<String>, data: Bytes) -> Result<(), ExecutionError> {
        self.consume_gas(log_gas(data.len()))?;
        self.store.emit(ContractLog {
            address: self.frame.address,
            name: name.into(),
            data,
        });
        Ok(())
    }

    /// Hub balance of `account`
    pub fn hub_balance_of(&mut self, account: Address) -> Result<U256, ExecutionError> {
        self.consume_gas(HUB_CALL_GAS)?;
        Ok(self.hub.balance_of(self.store, account))
    }

    /// Deposit `amount` for `account`, paid by the running contract
    pub fn hub_deposit_for(&mut self, account: Address, amount: U256) -> Result<(), ExecutionError> {
        self.consume_gas(HUB_CALL_GAS)?;
        self.hub
            .deposit_for(self.store, self.frame.address, account, amount)?;
        Ok(())
    }

    /// Withdraw from the running contract's own hub balance
    pub fn hub_withdraw(&mut self, amount: U256, dest: Address) -> Result<(), ExecutionError> {
        self.consume_gas(HUB_CALL_GAS)?;
        self.hub
            .withdraw(self.store, self.frame.address, amount, dest)?;
        Ok(())
    }

    /// Call another contract. A failed call leaves no effects behind.
    ///
    /// Calling an address with no contract succeeds with empty output.
    pub fn call(&mut self, target: Address, data: &Bytes) -> Result<Bytes, ExecutionError> {
        self.consume_gas(CALL_GAS)?;
        let hub = self.hub;
        let Some(recipient) = hub.recipient(target) else {
            return Ok(Bytes::new());
        };

        let checkpoint = self.store.checkpoint();
        let frame = Frame {
            address: target,
            caller: self.frame.address,
            sender: self.frame.address,
            origin: self.frame.origin,
        };
        let result = recipient.handle_call(
            &mut CallEnv::new(hub, &mut *self.store, &mut *self.meter, frame),
            data,
        );
        match result {
            Ok(_) => self.store.commit(checkpoint),
            Err(_) => self.store.revert_to(checkpoint),
        }
        result
    }
}
