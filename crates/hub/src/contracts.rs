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

use alloy_primitives::{Bytes, B256, U256};
use auto_impl::auto_impl;
use gasrelay_types::{relay_request::typed::GasData, ExecutionError, GasLimits, RelayRequest};

use crate::CallEnv;

/// Sponsor of relayed calls.
///
/// Every hook runs with its own gas allowance and must account for the work it
/// does through [`CallEnv::consume_gas`].
#[auto_impl(&, Box, Arc)]
pub trait Paymaster: Send + Sync {
    /// Gas ceilings of the hooks
    fn gas_limits(&self) -> GasLimits;

    /// Decide whether to sponsor a request.
    ///
    /// Everything it does to the store is reverted once it returns.
    /// Returns a status, zero to accept, and a context handed to the other hooks.
    fn accept_relayed_call(
        &self,
        env: &mut CallEnv<'_>,
        request: &RelayRequest,
        approval_data: &Bytes,
        max_possible_charge: U256,
    ) -> Result<(u64, Bytes), ExecutionError>;

    /// Runs before the target call. Reverting skips the target call.
    fn pre_relayed_call(
        &self,
        env: &mut CallEnv<'_>,
        context: &Bytes,
    ) -> Result<B256, ExecutionError>;

    /// Runs after the target call. Reverting undoes the pre hook and the target call.
    fn post_relayed_call(
        &self,
        env: &mut CallEnv<'_>,
        context: &Bytes,
        success: bool,
        pre_relayed_call_return: B256,
        gas_use_without_post: u64,
        gas_data: &GasData,
    ) -> Result<(), ExecutionError>;
}

/// A contract that can be called through the hub
#[auto_impl(&, Box, Arc)]
pub trait Recipient: Send + Sync {
    /// Handle a call. The effective sender is [`CallEnv::sender`].
    fn handle_call(&self, env: &mut CallEnv<'_>, data: &Bytes) -> Result<Bytes, ExecutionError>;
}
