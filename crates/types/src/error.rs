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

use alloy_primitives::{Address, U256};

use crate::{CanRelayStatus, Timestamp};

/// Hub result type
pub type HubResult<T> = Result<T, HubError>;

/// Errors that abort a hub call before it has any effect.
///
/// Failures that happen after the nonce is consumed are never reported through
/// this type, they end up as a `RelayCallStatus` on the emitted event.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// Caller is not a registered relay
    #[error("Unknown relay {0}")]
    UnknownRelay(Address),
    /// Deposit would push the balance over the ceiling
    #[error("Deposit too large. Resulting balance {balance} exceeds maximum {max}")]
    DepositTooLarge {
        /// Balance after the deposit
        balance: U256,
        /// Configured ceiling
        max: U256,
    },
    /// Withdrawal or charge exceeds the balance
    #[error("Insufficient funds. Requested {requested}, balance {balance}")]
    InsufficientFunds {
        /// Requested amount
        requested: U256,
        /// Current balance
        balance: U256,
    },
    /// Transaction gas price is below the price the sender asked for
    #[error("Invalid gas price. Transaction gas price {tx_gas_price} below requested {request_gas_price}")]
    InvalidGasPrice {
        /// Gas price of the submitting transaction
        tx_gas_price: u128,
        /// Gas price in the request
        request_gas_price: u128,
    },
    /// Not enough gas left to run the call under its worst case
    #[error("Insufficient gas. Required {required}, available {available}")]
    InsufficientGas {
        /// Gas required
        required: u64,
        /// Gas left in the transaction
        available: u64,
    },
    /// Paymaster cannot cover the worst case charge
    #[error("Paymaster balance too low. Required balance: {0}. Current balance {1}")]
    PaymasterBalanceTooLow(U256, U256),
    /// `canRelay` returned a non-ok status
    #[error("Can't relay: {0}")]
    CanRelayFailed(CanRelayStatus),
    /// Caller does not own the relay
    #[error("Caller {0} is not the relay owner")]
    NotRelayOwner(Address),
    /// Owner and relay address are the same
    #[error("Relay cannot stake for itself")]
    RelayCannotStakeForItself,
    /// Unstake delay is below the minimum or lower than the current one
    #[error("Unstake delay too low. Requested {delay}s, minimum {min}s")]
    UnstakeDelayTooLow {
        /// Requested delay in seconds
        delay: u64,
        /// Minimum delay in seconds
        min: u64,
    },
    /// Stake is below the minimum required to register
    #[error("Stake too low. Stake {stake}, minimum {min}")]
    StakeTooLow {
        /// Current stake
        stake: U256,
        /// Minimum stake
        min: U256,
    },
    /// Relay has no stake
    #[error("Relay {0} is not staked")]
    RelayNotStaked(Address),
    /// Relay was removed and cannot be staked or registered again
    #[error("Relay {0} was removed")]
    RelayAlreadyRemoved(Address),
    /// Relay must be removed before unstaking
    #[error("Relay {0} has not been removed")]
    RelayNotRemoved(Address),
    /// Unstake delay has not elapsed yet
    #[error("Unstake delay has not elapsed, can unstake after {0}")]
    UnstakeTooEarly(Timestamp),
    /// No contract is deployed at the address
    #[error("No contract deployed at {0}")]
    UnknownContract(Address),
    /// Transaction gas was exhausted
    #[error("Out of gas")]
    OutOfGas,
    /// Internal error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure of a paymaster hook or target call
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum ExecutionError {
    /// Call ran out of its gas allowance
    #[error("out of gas")]
    OutOfGas,
    /// Call reverted with a reason
    #[error("execution reverted: {0}")]
    Reverted(String),
}

impl ExecutionError {
    /// Create a revert with the given reason
    pub fn revert(reason: impl Into<String>) -> Self {
        Self::Reverted(reason.into())
    }
}

impl From<HubError> for ExecutionError {
    fn from(error: HubError) -> Self {
        match error {
            HubError::OutOfGas => Self::OutOfGas,
            e => Self::Reverted(e.to_string()),
        }
    }
}
