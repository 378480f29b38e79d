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

#![warn(missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]
//! The relay hub: signed request validation, sponsored call execution and
//! settlement against a ledger of prepaid paymaster balances.

mod contracts;
pub use contracts::{Paymaster, Recipient};

mod env;
pub use env::{log_gas, CallEnv, CALL_GAS, HUB_CALL_GAS, TX_BASE_GAS};

mod ledger;
pub use ledger::Ledger;

mod meter;
pub use meter::{GasMeter, OutOfGas};

mod nonces;
pub use nonces::NonceTable;

mod registry;
pub use registry::RelayRegistry;

mod relay_hub;
pub use relay_hub::{CanRelayResult, RelayCallOutcome, RelayHub, TxContext};

mod store;
pub use store::{Checkpoint, HubStore};

pub mod verifier;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
