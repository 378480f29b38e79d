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

use std::{collections::HashMap, sync::Arc};

use alloy_primitives::{Address, Bytes, U256};
use gasrelay_types::{
    gas::{self, GasLimits},
    CanRelayStatus, HubConfig, HubError, HubEvent, HubResult, RelayCallPhase, RelayCallStatus,
    RelayRecord, RelayRequest, HUB_VERSION,
};
use tracing::{debug, info, instrument};

use crate::{
    env::Frame, verifier, CallEnv, GasMeter, HubStore, Paymaster, Recipient, TX_BASE_GAS,
};

/// The transaction carrying a hub call
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct TxContext {
    /// Submitting account
    pub from: Address,
    /// Transaction gas price
    pub gas_price: u128,
    /// Transaction gas limit
    pub gas_limit: u64,
}

/// Result of `can_relay`
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CanRelayResult {
    /// Status
    pub status: CanRelayStatus,
    /// Context returned by the acceptance hook, empty unless the status is `Ok`
    pub recipient_context: Bytes,
    /// Gas used by the acceptance hook
    pub gas_used: u64,
}

impl CanRelayResult {
    fn rejected(status: CanRelayStatus, gas_used: u64) -> Self {
        Self {
            status,
            recipient_context: Bytes::new(),
            gas_used,
        }
    }
}

/// Result of a relay call that passed validation
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct RelayCallOutcome {
    /// Terminal status
    pub status: RelayCallStatus,
    /// Amount charged to the paymaster
    pub charge: U256,
    /// Gas the charge was computed from
    pub gas_used: u64,
}

/// The relay hub.
///
/// Holds configuration and the deployed paymaster and recipient contracts.
/// All mutable state lives in a [`HubStore`] passed to each call.
pub struct RelayHub {
    address: Address,
    config: HubConfig,
    paymasters: HashMap<Address, Arc<dyn Paymaster>>,
    recipients: HashMap<Address, Arc<dyn Recipient>>,
}

impl RelayHub {
    /// Create a hub deployed at `address`
    pub fn new(address: Address, config: HubConfig) -> Self {
        Self {
            address,
            config,
            paymasters: HashMap::new(),
            recipients: HashMap::new(),
        }
    }

    /// Deploy a paymaster at `address`
    pub fn deploy_paymaster(&mut self, address: Address, paymaster: Arc<dyn Paymaster>) {
        self.paymasters.insert(address, paymaster);
    }

    /// Deploy a callable contract at `address`
    pub fn deploy_recipient(&mut self, address: Address, recipient: Arc<dyn Recipient>) {
        self.recipients.insert(address, recipient);
    }

    /// Address of the hub
    pub fn address(&self) -> Address {
        self.address
    }

    /// Hub configuration
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Protocol version
    pub fn version(&self) -> &'static str {
        HUB_VERSION
    }

    /// Fixed gas added to every charge
    pub fn hub_overhead(&self) -> u64 {
        self.config.hub_overhead
    }

    /// Paymaster deployed at `address`
    pub fn paymaster(&self, address: Address) -> Option<&Arc<dyn Paymaster>> {
        self.paymasters.get(&address)
    }

    pub(crate) fn recipient(&self, address: Address) -> Option<&Arc<dyn Recipient>> {
        self.recipients.get(&address)
    }

    /// Hub balance of `account`
    pub fn balance_of(&self, store: &HubStore, account: Address) -> U256 {
        store.ledger().balance_of(account)
    }

    /// Nonce the next request from `sender` to `target` must carry
    pub fn get_nonce(&self, store: &HubStore, target: Address, sender: Address) -> U256 {
        store.nonces().get(target, sender)
    }

    /// Record of a relay
    pub fn get_relay<'s>(&self, store: &'s HubStore, relay: Address) -> Option<&'s RelayRecord> {
        store.registry().get(relay)
    }

    /// Charge for `gas_used` under the request's gas price and fee schedule
    pub fn calculate_charge(&self, gas_used: u64, request: &RelayRequest) -> U256 {
        gas::calculate_charge(
            gas_used,
            request.gas_price,
            request.base_relay_fee,
            request.pct_relay_fee,
        )
    }

    /// Worst case gas of a relay call carrying `calldata_size` bytes
    pub fn max_possible_gas(
        &self,
        gas_limits: &GasLimits,
        relay_call_gas_limit: u64,
        calldata_size: u64,
    ) -> u64 {
        gas::max_possible_gas(
            gas_limits,
            self.config.hub_overhead,
            relay_call_gas_limit,
            calldata_size,
            self.config.non_zero_byte_gas,
        )
    }

    /// Deposit funds for a paymaster
    pub fn deposit_for(
        &self,
        store: &mut HubStore,
        from: Address,
        paymaster: Address,
        amount: U256,
    ) -> HubResult<()> {
        store.deposit_for(paymaster, amount, self.config.maximum_deposit)?;
        store.emit(HubEvent::Deposited {
            paymaster,
            from,
            amount,
        });
        Ok(())
    }

    /// Withdraw from the caller's own balance
    pub fn withdraw(
        &self,
        store: &mut HubStore,
        account: Address,
        amount: U256,
        dest: Address,
    ) -> HubResult<()> {
        store.withdraw(account, amount)?;
        store.emit(HubEvent::Withdrawn {
            account,
            dest,
            amount,
        });
        Ok(())
    }

    /// Add stake for a relay. Called by the relay owner with `value`.
    pub fn stake(
        &self,
        store: &mut HubStore,
        owner: Address,
        relay: Address,
        value: U256,
        unstake_delay: u64,
    ) -> HubResult<()> {
        let record = store.stake(
            owner,
            relay,
            value,
            unstake_delay,
            self.config.minimum_unstake_delay,
        )?;
        let event = HubEvent::Staked {
            relay,
            owner,
            stake: record.stake,
            unstake_delay: record.unstake_delay,
        };
        store.emit(event);
        Ok(())
    }

    /// Register the fee schedule of a staked relay. Called by the relay.
    pub fn register_relay(
        &self,
        store: &mut HubStore,
        relay: Address,
        base_relay_fee: U256,
        pct_relay_fee: u64,
        url: String,
    ) -> HubResult<()> {
        let record = store.register_relay(
            relay,
            base_relay_fee,
            pct_relay_fee,
            url,
            self.config.minimum_stake,
        )?;
        let event = HubEvent::RelayAdded {
            relay,
            owner: record.owner,
            base_relay_fee,
            pct_relay_fee,
            stake: record.stake,
            unstake_delay: record.unstake_delay,
            url: record.url.clone(),
        };
        store.emit(event);
        debug!("relay {relay} registered");
        Ok(())
    }

    /// Remove a relay, starting its unstake delay. Called by the relay owner.
    pub fn remove_relay_by_owner(
        &self,
        store: &mut HubStore,
        owner: Address,
        relay: Address,
    ) -> HubResult<()> {
        let now = store.timestamp();
        let record = store.remove_relay(owner, relay, now)?;
        let unstake_time = record.unstake_time.unwrap_or(now);
        store.emit(HubEvent::RelayRemoved {
            relay,
            unstake_time,
        });
        Ok(())
    }

    /// Return the stake of a removed relay to its owner. Called by the relay owner.
    pub fn unstake(&self, store: &mut HubStore, owner: Address, relay: Address) -> HubResult<U256> {
        let now = store.timestamp();
        let stake = store.unstake(owner, relay, now)?;
        store.emit(HubEvent::Unstaked { relay, stake });
        Ok(stake)
    }

    /// Check whether a request would be accepted, without changing any state.
    ///
    /// The acceptance hook runs on a copy of the hub state, without the log,
    /// with `acceptance_gas_limit` gas.
    #[instrument(skip_all, fields(sender = %request.sender, nonce = %request.nonce))]
    pub fn can_relay(
        &self,
        store: &HubStore,
        request: &RelayRequest,
        max_possible_gas: u64,
        acceptance_gas_limit: u64,
        signature: &Bytes,
        approval_data: &Bytes,
    ) -> CanRelayResult {
        self.check_relay(
            &mut store.scratch(),
            request,
            max_possible_gas,
            acceptance_gas_limit,
            signature,
            approval_data,
        )
    }

    // Everything the acceptance hook does to `store` is reverted before returning.
    fn check_relay(
        &self,
        store: &mut HubStore,
        request: &RelayRequest,
        max_possible_gas: u64,
        acceptance_gas_limit: u64,
        signature: &Bytes,
        approval_data: &Bytes,
    ) -> CanRelayResult {
        let hash = request.signing_hash(&self.config.domain());
        if !verifier::recover_signer(&hash, signature).is_signer(request.sender) {
            return CanRelayResult::rejected(CanRelayStatus::WrongSignature, 0);
        }

        if store.nonces().get(request.target, request.sender) != request.nonce {
            return CanRelayResult::rejected(CanRelayStatus::WrongNonce, 0);
        }

        let Some(paymaster) = self.paymaster(request.paymaster) else {
            debug!("no paymaster deployed at {}", request.paymaster);
            return CanRelayResult::rejected(CanRelayStatus::AcceptRelayedCallReverted, 0);
        };

        let max_possible_charge = self.calculate_charge(max_possible_gas, request);
        let checkpoint = store.checkpoint();
        let mut meter = GasMeter::new(acceptance_gas_limit);
        let frame = Frame {
            address: request.paymaster,
            caller: self.address,
            sender: self.address,
            origin: request.relay_address,
        };
        let accepted = paymaster.accept_relayed_call(
            &mut CallEnv::new(self, store, &mut meter, frame),
            request,
            approval_data,
            max_possible_charge,
        );
        store.revert_to(checkpoint);

        match accepted {
            Ok((0, recipient_context)) => CanRelayResult {
                status: CanRelayStatus::Ok,
                recipient_context,
                gas_used: meter.used(),
            },
            Ok((code, _)) => {
                debug!("acceptRelayedCall returned status {code}");
                CanRelayResult::rejected(CanRelayStatus::InvalidRecipientStatusCode, meter.used())
            }
            Err(error) => {
                debug!("acceptRelayedCall failed: {error}");
                CanRelayResult::rejected(CanRelayStatus::AcceptRelayedCallReverted, meter.used())
            }
        }
    }

    /// Relay a signed request. Called by `request.relay_address`.
    ///
    /// Any error aborts the call with no effect on the store. A request
    /// rejected by `can_relay` additionally leaves a `CanRelayFailed` entry in
    /// the log. Once the nonce is consumed the call always completes and is
    /// charged, its status reported through `TransactionRelayed`.
    #[instrument(skip_all, fields(relay = %tx.from, sender = %request.sender, nonce = %request.nonce))]
    pub fn relay_call(
        &self,
        store: &mut HubStore,
        tx: &TxContext,
        request: &RelayRequest,
        signature: &Bytes,
        approval_data: &Bytes,
    ) -> HubResult<RelayCallOutcome> {
        let checkpoint = store.checkpoint();
        let result = self.try_relay_call(store, tx, request, signature, approval_data);

        if let Err(error) = &result {
            debug!(phase = %RelayCallPhase::Reverted, "relay call aborted: {error}");
            store.revert_to(checkpoint);
            if let HubError::CanRelayFailed(reason) = error {
                store.emit(HubEvent::CanRelayFailed {
                    relay: tx.from,
                    from: request.sender,
                    target: request.target,
                    paymaster: request.paymaster,
                    selector: request.selector(),
                    reason: *reason,
                });
            }
        } else {
            store.commit(checkpoint);
        }
        result
    }

    fn try_relay_call(
        &self,
        store: &mut HubStore,
        tx: &TxContext,
        request: &RelayRequest,
        signature: &Bytes,
        approval_data: &Bytes,
    ) -> HubResult<RelayCallOutcome> {
        debug!(phase = %RelayCallPhase::Validating);
        let relay_owner = store
            .registry()
            .registered(tx.from)
            .map(|r| r.owner)
            .ok_or(HubError::UnknownRelay(tx.from))?;
        if request.relay_address != tx.from {
            return Err(HubError::UnknownRelay(request.relay_address));
        }

        let calldata = request.relay_call_calldata(signature, approval_data);
        let mut meter = GasMeter::new(tx.gas_limit);
        meter.consume(
            TX_BASE_GAS.saturating_add(gas::calldata_gas(&calldata, self.config.non_zero_byte_gas)),
        )?;

        let paymaster = self
            .paymaster(request.paymaster)
            .ok_or(HubError::UnknownContract(request.paymaster))?;
        let gas_limits = paymaster.gas_limits();
        let max_possible_gas =
            self.max_possible_gas(&gas_limits, request.gas_limit, calldata.len() as u64);

        let can_relay = self.check_relay(
            store,
            request,
            max_possible_gas,
            gas_limits.acceptance_gas_limit.min(meter.remaining()),
            signature,
            approval_data,
        );
        meter.consume(can_relay.gas_used)?;
        if !can_relay.status.is_ok() {
            return Err(HubError::CanRelayFailed(can_relay.status));
        }

        if tx.gas_price < request.gas_price {
            return Err(HubError::InvalidGasPrice {
                tx_gas_price: tx.gas_price,
                request_gas_price: request.gas_price,
            });
        }

        let required = request
            .gas_limit
            .saturating_add(gas_limits.pre_and_post())
            .saturating_add(self.config.gas_reserve);
        if meter.remaining() < required {
            return Err(HubError::InsufficientGas {
                required,
                available: meter.remaining(),
            });
        }

        let max_charge = self.calculate_charge(max_possible_gas, request);
        let balance = store.ledger().balance_of(request.paymaster);
        if balance < max_charge {
            return Err(HubError::PaymasterBalanceTooLow(max_charge, balance));
        }

        store.increment_nonce(request.target, request.sender);

        let gas_before = meter.used();
        let checkpoint = store.checkpoint();
        let mut status = self.recipient_calls(
            store,
            &mut meter,
            tx,
            request,
            &**paymaster,
            &gas_limits,
            &can_relay.recipient_context,
        );
        match status {
            RelayCallStatus::PreAuthorizationFailed | RelayCallStatus::PostAuthorizationFailed => {
                store.revert_to(checkpoint);
            }
            _ if store.ledger().balance_of(request.paymaster) != balance => {
                debug!("paymaster balance changed during the call");
                store.revert_to(checkpoint);
                status = RelayCallStatus::RecipientBalanceChanged;
            }
            _ => store.commit(checkpoint),
        }

        debug!(phase = %RelayCallPhase::Settling);
        let gas_used = (meter.used() - gas_before).saturating_add(self.config.hub_overhead);
        let charge = self.calculate_charge(gas_used, request);
        store.charge_for(request.paymaster, charge)?;
        store.credit(relay_owner, charge);
        store.emit(HubEvent::TransactionRelayed {
            relay: tx.from,
            from: request.sender,
            target: request.target,
            paymaster: request.paymaster,
            selector: request.selector(),
            status,
            charge,
        });

        info!(phase = %RelayCallPhase::Completed, %status, %charge, gas_used, "transaction relayed");
        Ok(RelayCallOutcome {
            status,
            charge,
            gas_used,
        })
    }

    // Steps run inside the inner checkpoint: pre hook, target call, post hook.
    #[allow(clippy::too_many_arguments)]
    fn recipient_calls(
        &self,
        store: &mut HubStore,
        meter: &mut GasMeter,
        tx: &TxContext,
        request: &RelayRequest,
        paymaster: &dyn Paymaster,
        gas_limits: &GasLimits,
        context: &Bytes,
    ) -> RelayCallStatus {
        let gas_start = meter.used();
        let hook_frame = Frame {
            address: request.paymaster,
            caller: self.address,
            sender: self.address,
            origin: tx.from,
        };

        debug!(phase = %RelayCallPhase::PreAuthorizing);
        let mut pre_meter = meter.child(gas_limits.pre_relayed_call_gas_limit);
        let pre = paymaster.pre_relayed_call(
            &mut CallEnv::new(self, store, &mut pre_meter, hook_frame),
            context,
        );
        meter.absorb(&pre_meter);
        let pre_relayed_call_return = match pre {
            Ok(ret) => ret,
            Err(error) => {
                debug!("preRelayedCall failed: {error}");
                return RelayCallStatus::PreAuthorizationFailed;
            }
        };

        debug!(phase = %RelayCallPhase::Executing);
        let success = self.call_target(store, meter, tx, request);

        debug!(phase = %RelayCallPhase::PostAuthorizing);
        let gas_use_without_post = meter.used() - gas_start;
        let mut post_meter = meter.child(gas_limits.post_relayed_call_gas_limit);
        let post = paymaster.post_relayed_call(
            &mut CallEnv::new(self, store, &mut post_meter, hook_frame),
            context,
            success,
            pre_relayed_call_return,
            gas_use_without_post,
            &request.gas_data(),
        );
        meter.absorb(&post_meter);
        if let Err(error) = post {
            debug!("postRelayedCall failed: {error}");
            return RelayCallStatus::PostAuthorizationFailed;
        }

        if success {
            RelayCallStatus::Ok
        } else {
            RelayCallStatus::RelayedCallFailed
        }
    }

    // Runs the target call in its own revertible scope, returns whether it succeeded.
    fn call_target(
        &self,
        store: &mut HubStore,
        meter: &mut GasMeter,
        tx: &TxContext,
        request: &RelayRequest,
    ) -> bool {
        let Some(recipient) = self.recipient(request.target) else {
            return true;
        };

        let checkpoint = store.checkpoint();
        let frame = Frame {
            address: request.target,
            caller: self.config.forwarder,
            sender: request.sender,
            origin: tx.from,
        };
        let mut call_meter = meter.child(request.gas_limit);
        let result = recipient.handle_call(
            &mut CallEnv::new(self, store, &mut call_meter, frame),
            &request.encoded_call,
        );
        meter.absorb(&call_meter);

        match result {
            Ok(_) => {
                store.commit(checkpoint);
                true
            }
            Err(error) => {
                debug!("relayed call failed: {error}");
                store.revert_to(checkpoint);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use alloy_primitives::{hex, Bytes};
    use alloy_sol_types::{SolCall, SolValue};
    use gasrelay_signer::RequestSigner;
    use gasrelay_types::{LogEntry, Timestamp};

    use super::*;
    use crate::{
        log_gas,
        test_utils::{
            default_gas_limits, encode_context, ITestRecipient, TestPaymasterConfigurableMisbehavior,
            TestPaymasterEverythingAccepted, TestPaymasterStoreContext, TestRecipient, POST_GAS,
            PRE_GAS, RECIPIENT_GAS,
        },
    };

    const ETHER: u128 = 1_000_000_000_000_000_000;
    const WEEK: u64 = 604_800;
    const MESSAGE: &str = "GSN RelayHub";

    const HUB: Address = Address::repeat_byte(0x90);
    const RELAY_OWNER: Address = Address::repeat_byte(0x01);
    const RELAY: Address = Address::repeat_byte(0x02);
    const OTHER: Address = Address::repeat_byte(0x03);
    const DEST: Address = Address::repeat_byte(0x04);
    const TARGET: Address = Address::repeat_byte(0x10);
    const PAYMASTER: Address = Address::repeat_byte(0x20);
    const MISBEHAVING_PAYMASTER: Address = Address::repeat_byte(0x21);
    const CONTEXT_PAYMASTER: Address = Address::repeat_byte(0x22);

    const BASE_RELAY_FEE: u64 = 10_000;
    const PCT_RELAY_FEE: u64 = 10;
    const GAS_PRICE: u128 = 10;
    const GAS_LIMIT: u64 = 1_000_000;

    fn ether(n: u128) -> U256 {
        U256::from(n * ETHER)
    }

    struct Fixture {
        hub: RelayHub,
        store: HubStore,
        sender: RequestSigner,
        misbehaving: Arc<TestPaymasterConfigurableMisbehavior>,
        recipient: Arc<TestRecipient>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut hub = RelayHub::new(HUB, HubConfig::default());
            let misbehaving = Arc::new(TestPaymasterConfigurableMisbehavior::default());
            let recipient = Arc::new(TestRecipient::default());
            hub.deploy_paymaster(PAYMASTER, Arc::new(TestPaymasterEverythingAccepted));
            hub.deploy_paymaster(MISBEHAVING_PAYMASTER, misbehaving.clone());
            hub.deploy_recipient(MISBEHAVING_PAYMASTER, misbehaving.clone());
            hub.deploy_paymaster(CONTEXT_PAYMASTER, Arc::new(TestPaymasterStoreContext));
            hub.deploy_recipient(TARGET, recipient.clone());

            Self {
                hub,
                store: HubStore::new(Timestamp::new(1_700_000_000)),
                sender: RequestSigner::random(),
                misbehaving,
                recipient,
            }
        }

        // Staked and registered relay, funded paymasters
        fn funded() -> Self {
            let mut fixture = Self::new();
            let Fixture { hub, store, .. } = &mut fixture;
            hub.stake(store, RELAY_OWNER, RELAY, ether(2), 4 * WEEK)
                .unwrap();
            hub.register_relay(
                store,
                RELAY,
                U256::from(BASE_RELAY_FEE),
                PCT_RELAY_FEE,
                "http://relay.com".to_string(),
            )
            .unwrap();
            for paymaster in [PAYMASTER, MISBEHAVING_PAYMASTER, CONTEXT_PAYMASTER] {
                hub.deposit_for(store, OTHER, paymaster, ether(1)).unwrap();
            }
            fixture
        }

        fn request(&self, paymaster: Address) -> RelayRequest {
            RelayRequest {
                sender: self.sender.address(),
                target: TARGET,
                encoded_call: ITestRecipient::emitMessageCall {
                    message: MESSAGE.to_string(),
                }
                .abi_encode()
                .into(),
                nonce: U256::ZERO,
                gas_price: GAS_PRICE,
                gas_limit: GAS_LIMIT,
                base_relay_fee: U256::from(BASE_RELAY_FEE),
                pct_relay_fee: PCT_RELAY_FEE,
                relay_address: RELAY,
                paymaster,
            }
        }

        fn sign(&self, request: &RelayRequest) -> Bytes {
            self.sender
                .sign_request(request, &self.hub.config().domain())
                .unwrap()
        }

        fn relay(&mut self, request: &RelayRequest) -> HubResult<RelayCallOutcome> {
            let signature = self.sign(request);
            self.relay_with(request, &signature, tx())
        }

        fn relay_with(
            &mut self,
            request: &RelayRequest,
            signature: &Bytes,
            tx: TxContext,
        ) -> HubResult<RelayCallOutcome> {
            self.hub
                .relay_call(&mut self.store, &tx, request, signature, &Bytes::new())
        }

        fn balance(&self, account: Address) -> U256 {
            self.hub.balance_of(&self.store, account)
        }

        fn nonce(&self) -> U256 {
            self.hub
                .get_nonce(&self.store, TARGET, self.sender.address())
        }

        fn count(&self, name: &str) -> usize {
            self.store.events_named(name).count()
        }

        fn last_event(&self) -> &HubEvent {
            self.store.hub_events().last().unwrap()
        }

        fn assert_ledger_balanced(&self) {
            let ledger = self.store.ledger();
            assert_eq!(ledger.total(), ledger.sum_of_balances());
        }
    }

    fn tx() -> TxContext {
        TxContext {
            from: RELAY,
            gas_price: GAS_PRICE,
            gas_limit: 3_000_000,
        }
    }

    fn relayed_status(event: &HubEvent) -> RelayCallStatus {
        match event {
            HubEvent::TransactionRelayed { status, .. } => *status,
            e => panic!("expected TransactionRelayed, got {e:?}"),
        }
    }

    #[test]
    fn test_version() {
        let fixture = Fixture::new();
        assert_eq!(fixture.hub.version(), "1.0.0");
        assert_eq!(fixture.hub.hub_overhead(), 48204);
    }

    #[test]
    fn test_deposit_for_others() {
        let mut fixture = Fixture::new();
        let Fixture { hub, store, .. } = &mut fixture;

        hub.deposit_for(store, OTHER, TARGET, ether(1)).unwrap();
        assert_eq!(hub.balance_of(store, TARGET), ether(1));
        assert_eq!(
            store.log().last().unwrap(),
            &LogEntry::Hub(HubEvent::Deposited {
                paymaster: TARGET,
                from: OTHER,
                amount: ether(1),
            })
        );
    }

    #[test]
    fn test_deposit_ceiling() {
        let mut fixture = Fixture::new();
        let Fixture { hub, store, .. } = &mut fixture;

        let err = hub.deposit_for(store, OTHER, TARGET, ether(3)).unwrap_err();
        assert!(matches!(err, HubError::DepositTooLarge { .. }));
        assert!(store.log().is_empty());

        hub.deposit_for(store, OTHER, TARGET, ether(1)).unwrap();
        hub.deposit_for(store, OTHER, TARGET, ether(1)).unwrap();
        assert_eq!(hub.balance_of(store, TARGET), ether(2));
        assert!(hub.deposit_for(store, OTHER, TARGET, ether(1)).is_err());
    }

    #[test]
    fn test_withdraw() {
        let mut fixture = Fixture::new();
        let Fixture { hub, store, .. } = &mut fixture;
        hub.deposit_for(store, OTHER, OTHER, ether(1)).unwrap();

        hub.withdraw(store, OTHER, ether(1) / U256::from(2), DEST)
            .unwrap();
        assert_eq!(
            store.hub_events().last().unwrap(),
            &HubEvent::Withdrawn {
                account: OTHER,
                dest: DEST,
                amount: ether(1) / U256::from(2),
            }
        );

        let err = hub.withdraw(store, OTHER, ether(1), DEST).unwrap_err();
        assert!(matches!(err, HubError::InsufficientFunds { .. }));

        hub.withdraw(store, OTHER, ether(1) / U256::from(2), DEST)
            .unwrap();
        assert_eq!(hub.balance_of(store, OTHER), U256::ZERO);
    }

    #[test]
    fn test_relay_lifecycle() {
        let mut fixture = Fixture::funded();
        let Fixture { hub, store, .. } = &mut fixture;

        let record = hub.get_relay(store, RELAY).unwrap();
        assert!(record.is_registered());
        assert_eq!(record.owner, RELAY_OWNER);
        assert_eq!(record.stake, ether(2));
        assert_eq!(store.registry().total_stake(), ether(2));

        assert!(matches!(
            hub.remove_relay_by_owner(store, OTHER, RELAY),
            Err(HubError::NotRelayOwner(_))
        ));
        hub.remove_relay_by_owner(store, RELAY_OWNER, RELAY)
            .unwrap();
        assert!(matches!(
            store.hub_events().last().unwrap(),
            HubEvent::RelayRemoved { relay, .. } if *relay == RELAY
        ));

        assert!(matches!(
            hub.unstake(store, RELAY_OWNER, RELAY),
            Err(HubError::UnstakeTooEarly(_))
        ));
        store.advance_time(Duration::from_secs(4 * WEEK));
        assert_eq!(hub.unstake(store, RELAY_OWNER, RELAY).unwrap(), ether(2));
        assert_eq!(
            store.hub_events().last().unwrap(),
            &HubEvent::Unstaked {
                relay: RELAY,
                stake: ether(2),
            }
        );
        assert_eq!(store.registry().total_stake(), U256::ZERO);
    }

    #[test]
    fn test_removed_relay_cannot_relay() {
        let mut fixture = Fixture::funded();
        fixture
            .hub
            .remove_relay_by_owner(&mut fixture.store, RELAY_OWNER, RELAY)
            .unwrap();

        let request = fixture.request(PAYMASTER);
        assert!(matches!(
            fixture.relay(&request),
            Err(HubError::UnknownRelay(relay)) if relay == RELAY
        ));
    }

    #[test]
    fn test_unknown_relay() {
        let mut fixture = Fixture::new();
        fixture
            .hub
            .deposit_for(&mut fixture.store, OTHER, PAYMASTER, ether(1))
            .unwrap();
        let log_len = fixture.store.log().len();

        let request = fixture.request(PAYMASTER);
        let err = fixture
            .relay_with(&request, &Bytes::from_static(&hex!("deadbeef")), tx())
            .unwrap_err();

        assert!(matches!(err, HubError::UnknownRelay(relay) if relay == RELAY));
        assert_eq!(fixture.store.log().len(), log_len);
        assert_eq!(fixture.nonce(), U256::ZERO);
    }

    #[test]
    fn test_staked_but_unregistered_relay() {
        let mut fixture = Fixture::new();
        let Fixture { hub, store, .. } = &mut fixture;
        hub.stake(store, RELAY_OWNER, RELAY, ether(2), 4 * WEEK)
            .unwrap();
        hub.deposit_for(store, OTHER, PAYMASTER, ether(1)).unwrap();
        let log_len = store.log().len();

        let request = fixture.request(PAYMASTER);
        assert!(matches!(
            fixture.relay(&request),
            Err(HubError::UnknownRelay(relay)) if relay == RELAY
        ));
        assert_eq!(fixture.nonce(), U256::ZERO);
        assert_eq!(fixture.store.log().len(), log_len);
        assert_eq!(fixture.balance(PAYMASTER), ether(1));
    }

    #[test]
    fn test_unknown_relay_checked_before_gas() {
        let mut fixture = Fixture::new();
        let request = fixture.request(PAYMASTER);
        let signature = fixture.sign(&request);
        let tx = TxContext {
            gas_limit: 21_000,
            ..tx()
        };

        let err = fixture.relay_with(&request, &signature, tx).unwrap_err();
        assert!(matches!(err, HubError::UnknownRelay(relay) if relay == RELAY));
    }

    #[test]
    fn test_relay_address_mismatch() {
        let mut fixture = Fixture::funded();
        let mut request = fixture.request(PAYMASTER);
        request.relay_address = OTHER;

        assert!(matches!(
            fixture.relay(&request),
            Err(HubError::UnknownRelay(relay)) if relay == OTHER
        ));
    }

    fn can_relay(fixture: &Fixture, request: &RelayRequest, signature: &Bytes) -> CanRelayResult {
        let gas_limits = default_gas_limits();
        let max_possible_gas = fixture.hub.max_possible_gas(&gas_limits, GAS_LIMIT, 123);
        fixture.hub.can_relay(
            &fixture.store,
            request,
            max_possible_gas,
            gas_limits.acceptance_gas_limit,
            signature,
            &Bytes::new(),
        )
    }

    #[test]
    fn test_can_relay_ok() {
        let fixture = Fixture::funded();
        let request = fixture.request(PAYMASTER);
        let result = can_relay(&fixture, &request, &fixture.sign(&request));
        assert_eq!(result.status, CanRelayStatus::Ok);
        assert!(result.gas_used > 0);
    }

    #[test]
    fn test_can_relay_wrong_signature() {
        let fixture = Fixture::funded();
        let request = fixture.request(PAYMASTER);
        let wrong_signature = Bytes::from_static(&hex!(
            "aaaa6ad4b4fab03bb2feaea2d54c690206e40036e4baa930760e72479da0cc5575779f9db9ef801e144b5e6af48542107f2f094649334b030e2bb44f054429b451"
        ));
        assert_eq!(
            can_relay(&fixture, &request, &wrong_signature).status,
            CanRelayStatus::WrongSignature
        );
        assert_eq!(
            can_relay(&fixture, &request, &Bytes::from_static(&hex!("deadbeef"))).status,
            CanRelayStatus::WrongSignature
        );

        // signed by someone else
        let other_signer = RequestSigner::random();
        let signature = other_signer
            .sign_request(&request, &fixture.hub.config().domain())
            .unwrap();
        assert_eq!(
            can_relay(&fixture, &request, &signature).status,
            CanRelayStatus::WrongSignature
        );
    }

    #[test]
    fn test_can_relay_wrong_nonce() {
        let fixture = Fixture::funded();
        let mut request = fixture.request(PAYMASTER);
        request.nonce = U256::from(777);
        assert_eq!(
            can_relay(&fixture, &request, &fixture.sign(&request)).status,
            CanRelayStatus::WrongNonce
        );
    }

    #[test]
    fn test_can_relay_does_not_change_state() {
        let fixture = Fixture::funded();
        fixture
            .misbehaving
            .set(|m| m.withdraw_during_accept_relayed_call = true);
        let request = fixture.request(MISBEHAVING_PAYMASTER);
        let log_len = fixture.store.log().len();

        let result = can_relay(&fixture, &request, &fixture.sign(&request));
        assert_eq!(result.status, CanRelayStatus::Ok);
        assert_eq!(fixture.balance(MISBEHAVING_PAYMASTER), ether(1));
        assert_eq!(fixture.store.log().len(), log_len);
    }

    #[test]
    fn test_relay_call_discards_acceptance_effects() {
        let mut fixture = Fixture::funded();
        fixture
            .misbehaving
            .set(|m| m.withdraw_during_accept_relayed_call = true);
        let request = fixture.request(MISBEHAVING_PAYMASTER);

        let outcome = fixture.relay(&request).unwrap();
        assert_eq!(outcome.status, RelayCallStatus::Ok);
        assert_eq!(
            fixture.balance(MISBEHAVING_PAYMASTER),
            ether(1) - outcome.charge
        );
        assert_eq!(fixture.count("Withdrawn"), 0);
        fixture.assert_ledger_balanced();
    }

    #[test]
    fn test_can_relay_acceptance_reverted() {
        let fixture = Fixture::funded();
        let request = fixture.request(MISBEHAVING_PAYMASTER);
        let signature = fixture.sign(&request);

        fixture
            .misbehaving
            .set(|m| m.revert_accept_relayed_call = true);
        assert_eq!(
            can_relay(&fixture, &request, &signature).status,
            CanRelayStatus::AcceptRelayedCallReverted
        );

        fixture.misbehaving.set(|m| {
            m.revert_accept_relayed_call = false;
            m.over_consume_accept_gas = true;
        });
        assert_eq!(
            can_relay(&fixture, &request, &signature).status,
            CanRelayStatus::AcceptRelayedCallReverted
        );
    }

    #[test]
    fn test_can_relay_unknown_paymaster() {
        let fixture = Fixture::funded();
        let request = fixture.request(OTHER);
        assert_eq!(
            can_relay(&fixture, &request, &fixture.sign(&request)).status,
            CanRelayStatus::AcceptRelayedCallReverted
        );
    }

    #[test]
    fn test_relay_call_happy_path() {
        let mut fixture = Fixture::funded();
        let request = fixture.request(PAYMASTER);
        let paymaster_before = fixture.balance(PAYMASTER);

        let outcome = fixture.relay(&request).unwrap();
        assert_eq!(outcome.status, RelayCallStatus::Ok);
        assert_eq!(fixture.nonce(), U256::from(1));

        let emitted = fixture
            .store
            .events_named("SampleRecipientEmitted")
            .next()
            .and_then(LogEntry::as_contract)
            .unwrap();
        assert_eq!(emitted.address, TARGET);
        let (message, real_sender, msg_sender, origin) =
            <(String, Address, Address, Address)>::abi_decode(&emitted.data).unwrap();
        assert_eq!(message, MESSAGE);
        assert_eq!(real_sender, fixture.sender.address());
        assert_eq!(msg_sender, fixture.hub.config().forwarder);
        assert_eq!(origin, RELAY);

        let expected_gas = PRE_GAS
            + log_gas(0)
            + RECIPIENT_GAS
            + log_gas(emitted.data.len())
            + POST_GAS
            + log_gas(0)
            + fixture.hub.hub_overhead();
        let expected_charge = gas::calculate_charge(
            expected_gas,
            GAS_PRICE,
            U256::from(BASE_RELAY_FEE),
            PCT_RELAY_FEE,
        );
        assert_eq!(outcome.gas_used, expected_gas);
        assert_eq!(outcome.charge, expected_charge);
        assert_eq!(fixture.balance(PAYMASTER), paymaster_before - expected_charge);
        assert_eq!(fixture.balance(RELAY_OWNER), expected_charge);

        assert_eq!(
            fixture.last_event(),
            &HubEvent::TransactionRelayed {
                relay: RELAY,
                from: fixture.sender.address(),
                target: TARGET,
                paymaster: PAYMASTER,
                selector: request.selector(),
                status: RelayCallStatus::Ok,
                charge: expected_charge,
            }
        );
        fixture.assert_ledger_balanced();
    }

    #[test]
    fn test_relay_call_no_params() {
        let mut fixture = Fixture::funded();
        let mut request = fixture.request(PAYMASTER);
        request.encoded_call = ITestRecipient::emitMessageNoParamsCall {}.abi_encode().into();

        let outcome = fixture.relay(&request).unwrap();
        assert_eq!(outcome.status, RelayCallStatus::Ok);

        let emitted = fixture
            .store
            .events_named("SampleRecipientEmitted")
            .next()
            .and_then(LogEntry::as_contract)
            .unwrap();
        let (message, ..) =
            <(String, Address, Address, Address)>::abi_decode(&emitted.data).unwrap();
        assert_eq!(message, "Method with no parameters");
    }

    #[test]
    fn test_replay_rejected() {
        let mut fixture = Fixture::funded();
        let request = fixture.request(PAYMASTER);
        let signature = fixture.sign(&request);

        fixture.relay_with(&request, &signature, tx()).unwrap();
        let paymaster_balance = fixture.balance(PAYMASTER);
        let relayed = fixture.count("TransactionRelayed");

        let err = fixture.relay_with(&request, &signature, tx()).unwrap_err();
        assert!(matches!(
            err,
            HubError::CanRelayFailed(CanRelayStatus::WrongNonce)
        ));
        assert_eq!(fixture.nonce(), U256::from(1));
        assert_eq!(fixture.balance(PAYMASTER), paymaster_balance);
        assert_eq!(fixture.count("TransactionRelayed"), relayed);
    }

    #[test]
    fn test_tampered_nonce_reverts_everything() {
        let mut fixture = Fixture::funded();
        let mut request = fixture.request(PAYMASTER);
        request.nonce = U256::from(777);
        let log_len = fixture.store.log().len();

        let err = fixture.relay(&request).unwrap_err();
        assert!(matches!(
            err,
            HubError::CanRelayFailed(CanRelayStatus::WrongNonce)
        ));
        assert_eq!(fixture.nonce(), U256::ZERO);
        assert_eq!(fixture.balance(PAYMASTER), ether(1));
        assert_eq!(fixture.balance(RELAY_OWNER), U256::ZERO);

        // only the failure receipt is appended
        assert_eq!(fixture.store.log().len(), log_len + 1);
        assert_eq!(
            fixture.last_event(),
            &HubEvent::CanRelayFailed {
                relay: RELAY,
                from: fixture.sender.address(),
                target: TARGET,
                paymaster: PAYMASTER,
                selector: request.selector(),
                reason: CanRelayStatus::WrongNonce,
            }
        );
    }

    #[test]
    fn test_invalid_recipient_status_code() {
        let mut fixture = Fixture::funded();
        fixture
            .misbehaving
            .set(|m| m.return_invalid_error_code = true);
        let request = fixture.request(MISBEHAVING_PAYMASTER);

        let err = fixture.relay(&request).unwrap_err();
        assert!(matches!(
            err,
            HubError::CanRelayFailed(CanRelayStatus::InvalidRecipientStatusCode)
        ));
        assert!(matches!(
            fixture.last_event(),
            HubEvent::CanRelayFailed {
                reason: CanRelayStatus::InvalidRecipientStatusCode,
                ..
            }
        ));
        assert_eq!(fixture.nonce(), U256::ZERO);
    }

    #[test]
    fn test_insufficient_gas() {
        let mut fixture = Fixture::funded();
        let request = fixture.request(MISBEHAVING_PAYMASTER);
        let signature = fixture.sign(&request);
        let tx = TxContext {
            gas_limit: GAS_LIMIT + 99_999,
            ..tx()
        };

        let err = fixture.relay_with(&request, &signature, tx).unwrap_err();
        assert!(matches!(err, HubError::InsufficientGas { .. }));
        assert_eq!(fixture.nonce(), U256::ZERO);
    }

    #[test]
    fn test_out_of_transaction_gas() {
        let mut fixture = Fixture::funded();
        let request = fixture.request(PAYMASTER);
        let signature = fixture.sign(&request);
        let log_len = fixture.store.log().len();
        let tx = TxContext {
            gas_limit: 21_000,
            ..tx()
        };

        let err = fixture.relay_with(&request, &signature, tx).unwrap_err();
        assert!(matches!(err, HubError::OutOfGas));
        assert_eq!(fixture.store.log().len(), log_len);
    }

    #[test]
    fn test_gas_price_below_requested() {
        let mut fixture = Fixture::funded();
        let request = fixture.request(MISBEHAVING_PAYMASTER);
        let signature = fixture.sign(&request);
        let tx = TxContext {
            gas_price: GAS_PRICE - 1,
            ..tx()
        };

        let err = fixture.relay_with(&request, &signature, tx).unwrap_err();
        assert!(matches!(err, HubError::InvalidGasPrice { .. }));
        assert_eq!(fixture.nonce(), U256::ZERO);
    }

    #[test]
    fn test_paymaster_balance_too_low() {
        let mut fixture = Fixture::funded();
        let paymaster2 = Address::repeat_byte(0x23);
        fixture
            .hub
            .deploy_paymaster(paymaster2, Arc::new(TestPaymasterEverythingAccepted));

        let request = fixture.request(paymaster2);
        let signature = fixture.sign(&request);
        let calldata = request.relay_call_calldata(&signature, &Bytes::new());
        let max_possible_gas = fixture.hub.max_possible_gas(
            &default_gas_limits(),
            GAS_LIMIT,
            calldata.len() as u64,
        );
        let max_charge = fixture.hub.calculate_charge(max_possible_gas, &request);
        fixture
            .hub
            .deposit_for(&mut fixture.store, OTHER, paymaster2, max_charge - U256::from(1))
            .unwrap();

        let err = fixture.relay_with(&request, &signature, tx()).unwrap_err();
        assert!(matches!(err, HubError::PaymasterBalanceTooLow(..)));
        assert_eq!(fixture.nonce(), U256::ZERO);

        // exactly the worst case charge is enough
        fixture
            .hub
            .deposit_for(&mut fixture.store, OTHER, paymaster2, U256::from(1))
            .unwrap();
        fixture.relay_with(&request, &signature, tx()).unwrap();
    }

    #[test]
    fn test_pre_relayed_call_reverts() {
        let mut fixture = Fixture::funded();
        fixture.misbehaving.set(|m| m.revert_pre_relayed_call = true);
        let request = fixture.request(MISBEHAVING_PAYMASTER);

        let outcome = fixture.relay(&request).unwrap();
        assert_eq!(outcome.status, RelayCallStatus::PreAuthorizationFailed);
        assert_eq!(fixture.count("SampleRecipientEmitted"), 0);
        assert_eq!(fixture.nonce(), U256::from(1));
        assert!(outcome.charge > U256::ZERO);
        assert_eq!(
            fixture.balance(MISBEHAVING_PAYMASTER),
            ether(1) - outcome.charge
        );
        assert_eq!(
            relayed_status(fixture.last_event()),
            RelayCallStatus::PreAuthorizationFailed
        );
    }

    #[test]
    fn test_post_relayed_call_reverts() {
        let mut fixture = Fixture::funded();
        fixture
            .misbehaving
            .set(|m| m.revert_post_relayed_call = true);
        let request = fixture.request(MISBEHAVING_PAYMASTER);

        let outcome = fixture.relay(&request).unwrap();
        assert_eq!(outcome.status, RelayCallStatus::PostAuthorizationFailed);
        assert_eq!(fixture.count("SampleRecipientEmitted"), 0);
        assert_eq!(fixture.nonce(), U256::from(1));
        assert_eq!(
            fixture.balance(MISBEHAVING_PAYMASTER),
            ether(1) - outcome.charge
        );
    }

    #[test]
    fn test_target_reverts() {
        let mut fixture = Fixture::funded();
        fixture.recipient.set(|r| r.revert = true);
        let request = fixture.request(PAYMASTER);

        let outcome = fixture.relay(&request).unwrap();
        assert_eq!(outcome.status, RelayCallStatus::RelayedCallFailed);
        assert_eq!(fixture.count("SampleRecipientEmitted"), 0);
        // hooks around the failed call keep their effects
        assert_eq!(fixture.count("SampleRecipientPreCall"), 1);
        assert_eq!(fixture.count("SampleRecipientPostCall"), 1);
        assert_eq!(fixture.balance(PAYMASTER), ether(1) - outcome.charge);
    }

    fn assert_balance_changed(fixture: &mut Fixture) {
        let request = fixture.request(MISBEHAVING_PAYMASTER);

        let outcome = fixture.relay(&request).unwrap();
        assert_eq!(outcome.status, RelayCallStatus::RecipientBalanceChanged);
        assert_eq!(
            relayed_status(fixture.last_event()),
            RelayCallStatus::RecipientBalanceChanged
        );
        assert_eq!(fixture.count("SampleRecipientEmitted"), 0);
        assert_eq!(fixture.count("Withdrawn"), 0);
        assert_eq!(fixture.nonce(), U256::from(1));
        assert_eq!(
            fixture.balance(MISBEHAVING_PAYMASTER),
            ether(1) - outcome.charge
        );
        fixture.assert_ledger_balanced();
    }

    #[test]
    fn test_withdraw_during_pre_relayed_call() {
        let mut fixture = Fixture::funded();
        fixture
            .misbehaving
            .set(|m| m.withdraw_during_pre_relayed_call = true);
        assert_balance_changed(&mut fixture);
    }

    #[test]
    fn test_withdraw_during_relayed_call() {
        let mut fixture = Fixture::funded();
        fixture
            .recipient
            .set(|r| r.withdraw_during_relayed_call = Some(MISBEHAVING_PAYMASTER));
        assert_balance_changed(&mut fixture);
    }

    #[test]
    fn test_withdraw_during_post_relayed_call() {
        let mut fixture = Fixture::funded();
        fixture
            .misbehaving
            .set(|m| m.withdraw_during_post_relayed_call = true);
        assert_balance_changed(&mut fixture);
    }

    #[test]
    fn test_hooks_receive_acceptance_context() {
        let mut fixture = Fixture::funded();
        let request = fixture.request(CONTEXT_PAYMASTER);

        let outcome = fixture.relay(&request).unwrap();
        assert_eq!(outcome.status, RelayCallStatus::Ok);

        let expected = encode_context(RELAY, &request, &Bytes::new());
        for name in [
            "SampleRecipientPreCallWithValues",
            "SampleRecipientPostCallWithValues",
        ] {
            let log = fixture
                .store
                .events_named(name)
                .next()
                .and_then(LogEntry::as_contract)
                .unwrap();
            assert_eq!(log.address, CONTEXT_PAYMASTER);
            assert_eq!(log.data, expected);
        }
    }

    #[test]
    fn test_sequential_relays() {
        let mut fixture = Fixture::funded();
        let mut total_charge = U256::ZERO;

        for nonce in 0..3u64 {
            let mut request = fixture.request(PAYMASTER);
            request.nonce = U256::from(nonce);
            let outcome = fixture.relay(&request).unwrap();
            assert_eq!(outcome.status, RelayCallStatus::Ok);
            total_charge += outcome.charge;
        }

        assert_eq!(fixture.nonce(), U256::from(3));
        assert_eq!(fixture.count("SampleRecipientEmitted"), 3);
        assert_eq!(fixture.balance(PAYMASTER), ether(1) - total_charge);
        assert_eq!(fixture.balance(RELAY_OWNER), total_charge);
        fixture.assert_ledger_balanced();
    }
}
