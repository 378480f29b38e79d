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

//! Paymasters and recipients for tests

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolCall, SolInterface, SolValue};
use gasrelay_types::{
    relay_request::typed::GasData, ExecutionError, GasLimits, RelayRequest,
};
use parking_lot::Mutex;

use crate::{CallEnv, Paymaster, Recipient};

sol! {
    interface ITestRecipient {
        function emitMessage(string message);
        function emitMessageNoParams();
    }

    interface ITestPaymaster {
        function withdrawAll(address dest);
    }
}

/// Gas used by the acceptance hooks below
pub const ACCEPT_GAS: u64 = 5_000;
/// Gas used by the pre hooks below, not counting events
pub const PRE_GAS: u64 = 3_000;
/// Gas used by the post hooks below, not counting events
pub const POST_GAS: u64 = 4_000;
/// Gas used by [`TestRecipient`], not counting events
pub const RECIPIENT_GAS: u64 = 6_000;

/// Hook limits declared by every test paymaster
pub fn default_gas_limits() -> GasLimits {
    GasLimits {
        acceptance_gas_limit: 50_000,
        pre_relayed_call_gas_limit: 40_000,
        post_relayed_call_gas_limit: 110_000,
    }
}

/// Accepts every request
#[derive(Debug, Default)]
pub struct TestPaymasterEverythingAccepted;

impl Paymaster for TestPaymasterEverythingAccepted {
    fn gas_limits(&self) -> GasLimits {
        default_gas_limits()
    }

    fn accept_relayed_call(
        &self,
        env: &mut CallEnv<'_>,
        _request: &RelayRequest,
        _approval_data: &Bytes,
        _max_possible_charge: U256,
    ) -> Result<(u64, Bytes), ExecutionError> {
        env.consume_gas(ACCEPT_GAS)?;
        Ok((0, Bytes::new()))
    }

    fn pre_relayed_call(
        &self,
        env: &mut CallEnv<'_>,
        _context: &Bytes,
    ) -> Result<B256, ExecutionError> {
        env.consume_gas(PRE_GAS)?;
        env.emit("SampleRecipientPreCall", Bytes::new())?;
        Ok(B256::ZERO)
    }

    fn post_relayed_call(
        &self,
        env: &mut CallEnv<'_>,
        _context: &Bytes,
        _success: bool,
        _pre_relayed_call_return: B256,
        _gas_use_without_post: u64,
        _gas_data: &GasData,
    ) -> Result<(), ExecutionError> {
        env.consume_gas(POST_GAS)?;
        env.emit("SampleRecipientPostCall", Bytes::new())?;
        Ok(())
    }
}

/// Context built by [`TestPaymasterStoreContext`] for a request
pub fn encode_context(relay: Address, request: &RelayRequest, approval_data: &Bytes) -> Bytes {
    (
        relay,
        request.sender,
        request.encoded_call.clone(),
        request.base_relay_fee,
        U256::from(request.pct_relay_fee),
        U256::from(request.gas_price),
        U256::from(request.gas_limit),
        request.nonce,
        approval_data.clone(),
    )
        .abi_encode_params()
        .into()
}

/// Accepts every request, passing the request fields to the other hooks as
/// context. Both hooks emit the context they receive.
#[derive(Debug, Default)]
pub struct TestPaymasterStoreContext;

impl Paymaster for TestPaymasterStoreContext {
    fn gas_limits(&self) -> GasLimits {
        default_gas_limits()
    }

    fn accept_relayed_call(
        &self,
        env: &mut CallEnv<'_>,
        request: &RelayRequest,
        approval_data: &Bytes,
        _max_possible_charge: U256,
    ) -> Result<(u64, Bytes), ExecutionError> {
        env.consume_gas(ACCEPT_GAS)?;
        Ok((0, encode_context(env.origin(), request, approval_data)))
    }

    fn pre_relayed_call(
        &self,
        env: &mut CallEnv<'_>,
        context: &Bytes,
    ) -> Result<B256, ExecutionError> {
        env.consume_gas(PRE_GAS)?;
        env.emit("SampleRecipientPreCallWithValues", context.clone())?;
        Ok(B256::ZERO)
    }

    fn post_relayed_call(
        &self,
        env: &mut CallEnv<'_>,
        context: &Bytes,
        _success: bool,
        _pre_relayed_call_return: B256,
        _gas_use_without_post: u64,
        _gas_data: &GasData,
    ) -> Result<(), ExecutionError> {
        env.consume_gas(POST_GAS)?;
        env.emit("SampleRecipientPostCallWithValues", context.clone())?;
        Ok(())
    }
}

/// Switches for [`TestPaymasterConfigurableMisbehavior`]
#[derive(Debug, Default, Clone)]
pub struct Misbehavior {
    /// Withdraw the whole hub balance while accepting
    pub withdraw_during_accept_relayed_call: bool,
    /// Withdraw the whole hub balance in the pre hook
    pub withdraw_during_pre_relayed_call: bool,
    /// Withdraw the whole hub balance in the post hook
    pub withdraw_during_post_relayed_call: bool,
    /// Return a non-zero acceptance status
    pub return_invalid_error_code: bool,
    /// Revert the acceptance hook
    pub revert_accept_relayed_call: bool,
    /// Revert the pre hook
    pub revert_pre_relayed_call: bool,
    /// Revert the post hook
    pub revert_post_relayed_call: bool,
    /// Use more gas than the acceptance hook is allowed
    pub over_consume_accept_gas: bool,
}

/// A paymaster whose misbehavior is set by the test.
///
/// Also callable as a contract: `withdrawAll(dest)` withdraws its whole hub
/// balance to `dest`.
#[derive(Debug, Default)]
pub struct TestPaymasterConfigurableMisbehavior {
    behavior: Mutex<Misbehavior>,
}

impl TestPaymasterConfigurableMisbehavior {
    /// Change the misbehavior switches
    pub fn set(&self, f: impl FnOnce(&mut Misbehavior)) {
        f(&mut self.behavior.lock());
    }

    fn behavior(&self) -> Misbehavior {
        self.behavior.lock().clone()
    }
}

fn withdraw_all(env: &mut CallEnv<'_>, dest: Address) -> Result<(), ExecutionError> {
    let paymaster = env.address();
    let balance = env.hub_balance_of(paymaster)?;
    env.hub_withdraw(balance, dest)
}

impl Paymaster for TestPaymasterConfigurableMisbehavior {
    fn gas_limits(&self) -> GasLimits {
        default_gas_limits()
    }

    fn accept_relayed_call(
        &self,
        env: &mut CallEnv<'_>,
        _request: &RelayRequest,
        _approval_data: &Bytes,
        _max_possible_charge: U256,
    ) -> Result<(u64, Bytes), ExecutionError> {
        let behavior = self.behavior();
        env.consume_gas(ACCEPT_GAS)?;
        if behavior.over_consume_accept_gas {
            let over = env.gas_left() + 1;
            env.consume_gas(over)?;
        }
        if behavior.revert_accept_relayed_call {
            return Err(ExecutionError::revert("acceptRelayedCall reverted"));
        }
        if behavior.withdraw_during_accept_relayed_call {
            let origin = env.origin();
            withdraw_all(env, origin)?;
        }
        if behavior.return_invalid_error_code {
            return Ok((1, Bytes::new()));
        }
        Ok((0, Bytes::new()))
    }

    fn pre_relayed_call(
        &self,
        env: &mut CallEnv<'_>,
        _context: &Bytes,
    ) -> Result<B256, ExecutionError> {
        let behavior = self.behavior();
        env.consume_gas(PRE_GAS)?;
        if behavior.withdraw_during_pre_relayed_call {
            let origin = env.origin();
            withdraw_all(env, origin)?;
        }
        if behavior.revert_pre_relayed_call {
            return Err(ExecutionError::revert("preRelayedCall reverted"));
        }
        Ok(B256::ZERO)
    }

    fn post_relayed_call(
        &self,
        env: &mut CallEnv<'_>,
        _context: &Bytes,
        _success: bool,
        _pre_relayed_call_return: B256,
        _gas_use_without_post: u64,
        _gas_data: &GasData,
    ) -> Result<(), ExecutionError> {
        let behavior = self.behavior();
        env.consume_gas(POST_GAS)?;
        if behavior.withdraw_during_post_relayed_call {
            let origin = env.origin();
            withdraw_all(env, origin)?;
        }
        if behavior.revert_post_relayed_call {
            return Err(ExecutionError::revert("postRelayedCall reverted"));
        }
        Ok(())
    }
}

impl Recipient for TestPaymasterConfigurableMisbehavior {
    fn handle_call(&self, env: &mut CallEnv<'_>, data: &Bytes) -> Result<Bytes, ExecutionError> {
        let call = ITestPaymaster::withdrawAllCall::abi_decode(data)
            .map_err(|e| ExecutionError::revert(e.to_string()))?;
        withdraw_all(env, call.dest)?;
        Ok(Bytes::new())
    }
}

/// Switches for [`TestRecipient`]
#[derive(Debug, Default, Clone)]
pub struct RecipientBehavior {
    /// Revert every call
    pub revert: bool,
    /// Call `withdrawAll` on this paymaster before doing anything else
    pub withdraw_during_relayed_call: Option<Address>,
}

/// Target of relayed calls.
///
/// Emits `SampleRecipientEmitted` with the message, the effective sender, the
/// immediate caller and the transaction origin.
#[derive(Debug, Default)]
pub struct TestRecipient {
    behavior: Mutex<RecipientBehavior>,
}

impl TestRecipient {
    /// Change the behavior switches
    pub fn set(&self, f: impl FnOnce(&mut RecipientBehavior)) {
        f(&mut self.behavior.lock());
    }
}

impl Recipient for TestRecipient {
    fn handle_call(&self, env: &mut CallEnv<'_>, data: &Bytes) -> Result<Bytes, ExecutionError> {
        let behavior = self.behavior.lock().clone();
        if behavior.revert {
            return Err(ExecutionError::revert("always fail"));
        }
        if let Some(paymaster) = behavior.withdraw_during_relayed_call {
            let dest = env.address();
            env.call(
                paymaster,
                &ITestPaymaster::withdrawAllCall { dest }.abi_encode().into(),
            )?;
        }

        let message = match ITestRecipient::ITestRecipientCalls::abi_decode(data)
            .map_err(|e| ExecutionError::revert(e.to_string()))?
        {
            ITestRecipient::ITestRecipientCalls::emitMessage(call) => call.message,
            ITestRecipient::ITestRecipientCalls::emitMessageNoParams(_) => {
                "Method with no parameters".to_string()
            }
        };

        env.consume_gas(RECIPIENT_GAS)?;
        let event = (message, env.sender(), env.caller(), env.origin()).abi_encode();
        env.emit("SampleRecipientEmitted", event.into())?;
        Ok(Bytes::new())
    }
}
