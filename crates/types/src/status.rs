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

use num_enum::{IntoPrimitive, TryFromPrimitive};
use parse_display::Display;
use serde::{Deserialize, Serialize};
use strum::EnumIter;

/// Result of the read-only `canRelay` check
#[derive(
    Display,
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    EnumIter,
    IntoPrimitive,
    TryFromPrimitive,
    Serialize,
    Deserialize,
)]
#[display(style = "snake_case")]
#[repr(u8)]
pub enum CanRelayStatus {
    /// The request can be relayed
    Ok = 0,
    /// Recovered signer is not the request sender
    WrongSignature = 1,
    /// Request nonce does not match the stored nonce
    WrongNonce = 2,
    /// The paymaster acceptance hook reverted or ran out of gas
    AcceptRelayedCallReverted = 3,
    /// The paymaster acceptance hook returned a non-zero status
    InvalidRecipientStatusCode = 4,
}

impl CanRelayStatus {
    /// Returns true if the status is `Ok`
    pub fn is_ok(&self) -> bool {
        matches!(self, CanRelayStatus::Ok)
    }
}

/// Terminal status of a relayed call that passed validation.
///
/// Every status is reported through a `TransactionRelayed` event and the
/// paymaster is charged regardless of which one is reached.
#[derive(
    Display,
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    EnumIter,
    IntoPrimitive,
    TryFromPrimitive,
    Serialize,
    Deserialize,
)]
#[display(style = "snake_case")]
#[repr(u8)]
pub enum RelayCallStatus {
    /// Target call succeeded
    Ok = 0,
    /// Target call reverted, hooks succeeded
    RelayedCallFailed = 1,
    /// Pre-authorization hook reverted, target was not called
    PreAuthorizationFailed = 2,
    /// Post-authorization hook reverted
    PostAuthorizationFailed = 3,
    /// Paymaster balance changed during the call
    RecipientBalanceChanged = 4,
}

/// Phases a relay call moves through
#[derive(Display, Debug, Clone, Copy, Eq, PartialEq, EnumIter)]
#[display(style = "snake_case")]
pub enum RelayCallPhase {
    /// Not started
    Idle,
    /// Relay, signature, nonce, gas and balance checks
    Validating,
    /// Paymaster pre-authorization hook
    PreAuthorizing,
    /// Target call
    Executing,
    /// Paymaster post-authorization hook
    PostAuthorizing,
    /// Charge computation and ledger update
    Settling,
    /// Call finished and was charged
    Completed,
    /// Call aborted before any effect
    Reverted,
}
