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

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, U256};
use gasrelay_hub::{CanRelayResult, HubStore, RelayCallOutcome, RelayHub, TxContext};
use gasrelay_types::{GasLimits, HubError, HubResult, RelayRequest};
#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;
use parking_lot::{RwLock, RwLockReadGuard};

/// Access to a relay hub and the chain it is deployed on
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait::async_trait]
pub trait RelayHubClient: Send + Sync {
    /// Address of the hub
    fn hub_address(&self) -> Address;

    /// Gas limits declared by a paymaster
    async fn gas_limits(&self, paymaster: Address) -> HubResult<GasLimits>;

    /// Worst case gas of a relay call, as computed by the hub
    async fn max_possible_gas(
        &self,
        gas_limits: GasLimits,
        relay_call_gas_limit: u64,
        calldata_size: u64,
    ) -> HubResult<u64>;

    /// Charge for `gas_used` under the request's fee schedule
    async fn calculate_charge(&self, gas_used: u64, request: &RelayRequest) -> HubResult<U256>;

    /// Dry run acceptance of a request
    async fn can_relay(
        &self,
        request: &RelayRequest,
        max_possible_gas: u64,
        acceptance_gas_limit: u64,
        signature: &Bytes,
        approval_data: &Bytes,
    ) -> HubResult<CanRelayResult>;

    /// Hub balance of an account
    async fn balance_of(&self, account: Address) -> HubResult<U256>;

    /// Current gas price suggested by the chain
    async fn suggested_gas_price(&self) -> HubResult<u128>;

    /// Submit a relay call transaction
    async fn relay_call(
        &self,
        tx: TxContext,
        request: &RelayRequest,
        signature: &Bytes,
        approval_data: &Bytes,
    ) -> HubResult<RelayCallOutcome>;
}

/// A hub running in process.
///
/// Transactions are applied one at a time behind a write lock.
#[derive(Clone)]
pub struct LocalHub {
    hub: Arc<RelayHub>,
    store: Arc<RwLock<HubStore>>,
    gas_price: Arc<RwLock<u128>>,
}

impl LocalHub {
    /// Wrap a hub and its store, with a fixed suggested gas price
    pub fn new(hub: RelayHub, store: HubStore, gas_price: u128) -> Self {
        Self {
            hub: Arc::new(hub),
            store: Arc::new(RwLock::new(store)),
            gas_price: Arc::new(RwLock::new(gas_price)),
        }
    }

    /// The hub
    pub fn hub(&self) -> &RelayHub {
        &self.hub
    }

    /// Read access to the store
    pub fn store(&self) -> RwLockReadGuard<'_, HubStore> {
        self.store.read()
    }

    /// Run a state changing operation against the store
    pub fn update<R>(&self, f: impl FnOnce(&RelayHub, &mut HubStore) -> R) -> R {
        f(&*self.hub, &mut *self.store.write())
    }

    /// Change the suggested gas price
    pub fn set_gas_price(&self, gas_price: u128) {
        *self.gas_price.write() = gas_price;
    }
}

#[async_trait::async_trait]
impl RelayHubClient for LocalHub {
    fn hub_address(&self) -> Address {
        self.hub.address()
    }

    async fn gas_limits(&self, paymaster: Address) -> HubResult<GasLimits> {
        self.hub
            .paymaster(paymaster)
            .map(|p| p.gas_limits())
            .ok_or(HubError::UnknownContract(paymaster))
    }

    async fn max_possible_gas(
        &self,
        gas_limits: GasLimits,
        relay_call_gas_limit: u64,
        calldata_size: u64,
    ) -> HubResult<u64> {
        Ok(self
            .hub
            .max_possible_gas(&gas_limits, relay_call_gas_limit, calldata_size))
    }

    async fn calculate_charge(&self, gas_used: u64, request: &RelayRequest) -> HubResult<U256> {
        Ok(self.hub.calculate_charge(gas_used, request))
    }

    async fn can_relay(
        &self,
        request: &RelayRequest,
        max_possible_gas: u64,
        acceptance_gas_limit: u64,
        signature: &Bytes,
        approval_data: &Bytes,
    ) -> HubResult<CanRelayResult> {
        Ok(self.hub.can_relay(
            &self.store.read(),
            request,
            max_possible_gas,
            acceptance_gas_limit,
            signature,
            approval_data,
        ))
    }

    async fn balance_of(&self, account: Address) -> HubResult<U256> {
        Ok(self.hub.balance_of(&self.store.read(), account))
    }

    async fn suggested_gas_price(&self) -> HubResult<u128> {
        Ok(*self.gas_price.read())
    }

    async fn relay_call(
        &self,
        tx: TxContext,
        request: &RelayRequest,
        signature: &Bytes,
        approval_data: &Bytes,
    ) -> HubResult<RelayCallOutcome> {
        self.hub.relay_call(
            &mut self.store.write(),
            &tx,
            request,
            signature,
            approval_data,
        )
    }
}
