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

//! Gasrelay common types

pub mod config;
pub use config::HubConfig;

mod error;
pub use error::{ExecutionError, HubError, HubResult};

mod event;
pub use event::{ContractLog, HubEvent, LogEntry};

pub mod gas;
pub use gas::GasLimits;

pub mod relay_request;
pub use relay_request::{RelayDomain, RelayRequest};

mod relay;
pub use relay::{RelayRecord, RelayState};

mod status;
pub use status::{CanRelayStatus, RelayCallPhase, RelayCallStatus};

mod timestamp;
pub use timestamp::Timestamp;

/// Protocol revision reported by the hub's `version()` read call
pub const HUB_VERSION: &str = "1.0.0";
