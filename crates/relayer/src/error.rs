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
use gasrelay_types::{CanRelayStatus, HubError};

/// Reasons a relay operator refuses a request before submitting it
#[derive(Clone, Debug, parse_display::Display, Eq, PartialEq, Ord, PartialOrd)]
pub enum PrecheckViolation {
    /// The request was meant for another hub
    #[display("request is for hub {0:?} but this relay serves {1:?}")]
    WrongHub(Address, Address),
    /// The request names another relay
    #[display("request is for relay {0:?} but this relay is {1:?}")]
    WrongRelay(Address, Address),
    /// The base fee offered is below the operator's
    #[display("baseRelayFee is {0} but must be at least {1}")]
    UnacceptableBaseFee(U256, U256),
    /// The percentage fee offered is below the operator's
    #[display("pctRelayFee is {0} but must be at least {1}")]
    UnacceptableFee(u64, u64),
    /// The operator has no gas price yet
    #[display("relay gas price is not initialized")]
    GasPriceNotInitialized,
    /// The gas price offered is below the operator's
    #[display("gasPrice is {0} but must be at least {1}")]
    GasPriceTooLow(u128, u128),
    /// The hub would not accept the request
    #[display("canRelay returned {0}")]
    CanRelayRejected(CanRelayStatus),
    /// The paymaster cannot cover the worst case charge
    #[display("paymaster balance is {0} but must be at least {1} to pay for this request")]
    PaymasterBalanceTooLow(U256, U256),
}

/// Relay operator error
#[derive(Debug, thiserror::Error)]
pub enum RelayerError {
    /// The request failed one or more prechecks
    #[error("{}", format_violations(.0))]
    Violations(Vec<PrecheckViolation>),
    /// The hub rejected a call
    #[error("hub error: {0}")]
    Hub(#[from] HubError),
    /// Internal error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<Vec<PrecheckViolation>> for RelayerError {
    fn from(violations: Vec<PrecheckViolation>) -> Self {
        Self::Violations(violations)
    }
}

impl From<PrecheckViolation> for RelayerError {
    fn from(violation: PrecheckViolation) -> Self {
        Self::Violations(vec![violation])
    }
}

fn format_violations(violations: &[PrecheckViolation]) -> String {
    match violations {
        [violation] => violation.to_string(),
        _ => format!(
            "multiple violations: {}",
            violations
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ")
        ),
    }
}
