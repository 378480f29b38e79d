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
//! Relay operator: checks a client's relay request against the operator's
//! policy and the hub before paying for its submission.

mod client;
#[cfg(any(test, feature = "test-utils"))]
pub use client::MockRelayHubClient;
pub use client::{LocalHub, RelayHubClient};

mod error;
pub use error::{PrecheckViolation, RelayerError};

mod relayer;
pub use relayer::{PreparedRelay, RelayTransactionRequest, Relayer};

mod settings;
pub use settings::RelayerSettings;
