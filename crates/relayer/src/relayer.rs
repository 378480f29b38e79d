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
use gasrelay_hub::{RelayCallOutcome, TxContext};
use gasrelay_types::RelayRequest;
use gasrelay_utils::math;
use parking_lot::RwLock;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::{PrecheckViolation, RelayHubClient, RelayerError, RelayerSettings};

/// A signed relay request as received from a client
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayTransactionRequest {
    /// The request
    pub request: RelayRequest,
    /// Sender's signature over the request
    pub signature: Bytes,
    /// Opaque data for the paymaster
    pub approval_data: Bytes,
    /// Hub the client expects the request to go through
    pub relay_hub_address: Address,
}

/// A request that passed every precheck, with the transaction to submit
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PreparedRelay {
    /// Transaction carrying the relay call
    pub tx: TxContext,
    /// Worst case gas of the relay call, margin included
    pub max_possible_gas: u64,
    /// Worst case charge to the paymaster
    pub max_charge: U256,
}

/// A relay operator.
///
/// Only pays for transactions the hub will accept and the paymaster can
/// afford under the operator's fee schedule and gas price.
pub struct Relayer<C> {
    client: C,
    address: Address,
    settings: RelayerSettings,
    gas_price: RwLock<Option<u128>>,
}

impl<C: RelayHubClient> Relayer<C> {
    /// Create a relayer submitting from `address`
    pub fn new(client: C, address: Address, settings: RelayerSettings) -> Self {
        Self {
            client,
            address,
            settings,
            gas_price: RwLock::new(None),
        }
    }

    /// Relay address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Operator settings
    pub fn settings(&self) -> &RelayerSettings {
        &self.settings
    }

    /// Minimum gas price a request must offer, if known
    pub fn gas_price(&self) -> Option<u128> {
        *self.gas_price.read()
    }

    /// Fetch the chain's gas price and add the operator's percentage
    pub async fn refresh_gas_price(&self) -> Result<u128, RelayerError> {
        let suggested = self.client.suggested_gas_price().await?;
        let gas_price = math::increase_by_percent(suggested, self.settings.gas_price_percent);
        *self.gas_price.write() = Some(gas_price);
        debug!(suggested, gas_price, "refreshed gas price");
        Ok(gas_price)
    }

    /// Check a request against the operator's policy and the hub.
    ///
    /// Does not submit anything.
    #[instrument(skip_all, fields(sender = %relay.request.sender, nonce = %relay.request.nonce))]
    pub async fn prepare(
        &self,
        relay: &RelayTransactionRequest,
    ) -> Result<PreparedRelay, RelayerError> {
        let violations = self.check_request(relay);
        if !violations.is_empty() {
            Err(violations)?
        }

        let request = &relay.request;
        let gas_limits = self.client.gas_limits(request.paymaster).await?;
        let calldata = request.relay_call_calldata(&relay.signature, &relay.approval_data);
        let max_possible_gas = self
            .client
            .max_possible_gas(gas_limits, request.gas_limit, calldata.len() as u64)
            .await?
            .saturating_add(self.settings.max_gas_margin);
        let max_charge = self
            .client
            .calculate_charge(max_possible_gas, request)
            .await?;

        let can_relay = self
            .client
            .can_relay(
                request,
                max_possible_gas,
                gas_limits.acceptance_gas_limit,
                &relay.signature,
                &relay.approval_data,
            )
            .await?;
        if !can_relay.status.is_ok() {
            return Err(PrecheckViolation::CanRelayRejected(can_relay.status).into());
        }

        let balance = self.client.balance_of(request.paymaster).await?;
        if balance < max_charge {
            return Err(PrecheckViolation::PaymasterBalanceTooLow(balance, max_charge).into());
        }

        debug!(%max_charge, max_possible_gas, "request accepted");
        Ok(PreparedRelay {
            tx: TxContext {
                from: self.address,
                gas_price: request.gas_price,
                gas_limit: max_possible_gas,
            },
            max_possible_gas,
            max_charge,
        })
    }

    /// Refresh the gas price, run the prechecks and submit the relay call
    #[instrument(skip_all, fields(relay = %self.address))]
    pub async fn relay(
        &self,
        relay: &RelayTransactionRequest,
    ) -> Result<RelayCallOutcome, RelayerError> {
        if let Err(error) = self.refresh_gas_price().await {
            warn!("failed to refresh gas price: {error}");
        }

        let prepared = self.prepare(relay).await?;
        let outcome = self
            .client
            .relay_call(
                prepared.tx,
                &relay.request,
                &relay.signature,
                &relay.approval_data,
            )
            .await?;
        info!(status = %outcome.status, charge = %outcome.charge, "relay call submitted");
        Ok(outcome)
    }

    fn check_request(&self, relay: &RelayTransactionRequest) -> Vec<PrecheckViolation> {
        let request = &relay.request;
        let mut violations = vec![];

        let hub = self.client.hub_address();
        if relay.relay_hub_address != hub {
            violations.push(PrecheckViolation::WrongHub(relay.relay_hub_address, hub));
        }
        if request.relay_address != self.address {
            violations.push(PrecheckViolation::WrongRelay(
                request.relay_address,
                self.address,
            ));
        }
        if request.base_relay_fee < self.settings.base_relay_fee {
            violations.push(PrecheckViolation::UnacceptableBaseFee(
                request.base_relay_fee,
                self.settings.base_relay_fee,
            ));
        }
        if request.pct_relay_fee < self.settings.pct_relay_fee {
            violations.push(PrecheckViolation::UnacceptableFee(
                request.pct_relay_fee,
                self.settings.pct_relay_fee,
            ));
        }
        match self.gas_price() {
            None => violations.push(PrecheckViolation::GasPriceNotInitialized),
            Some(gas_price) if request.gas_price < gas_price => violations.push(
                PrecheckViolation::GasPriceTooLow(request.gas_price, gas_price),
            ),
            Some(_) => {}
        }
        violations
    }
}
