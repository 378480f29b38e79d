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

//! Hub configuration

use alloy_primitives::{address, Address, U256};
use anyhow::Context;
use config::{builder::DefaultState, Config, ConfigBuilder, Environment, File, FileFormat};
use paste::paste;
use serde::{Deserialize, Serialize};

use crate::RelayDomain;

/// Prefix of environment variables overriding hub configuration
pub const ENV_PREFIX: &str = "HUB";

// Generate a config struct along with an all-optional twin and a merge function.
macro_rules! make_optional_config {
    ( $(#[$attr:meta])* $vis:vis struct $struct_name:ident { $(#[$doc:meta] $fv:vis $field:ident : $ty:ty),* $(,)? }) => {

        $(#[$attr])*
        $vis struct $struct_name {
            $( #[$doc] $fv $field: $ty ),*
        }

        paste! {
            #[doc = "`" $struct_name "` with every field optional, used for partial overrides"]
            #[derive(Clone, Debug, Default, Deserialize)]
            $vis struct [<Optional $struct_name>] {
                $( #[$doc] pub $field: Option<$ty> ),*
            }

            impl [<Optional $struct_name>] {
                /// Merge two optional structs, preferring the first value if both are present.
                $vis fn merge(self, other: Self) -> Self {
                    Self {
                        $( $field: self.$field.or(other.$field) ),*
                    }
                }
            }

            impl From<[<Optional $struct_name>]> for $struct_name {
                fn from(optional: [<Optional $struct_name>]) -> Self {
                    let default = $struct_name::default();
                    $struct_name {
                        $( $field: optional.$field.unwrap_or(default.$field) ),*
                    }
                }
            }
        }
    }
}

make_optional_config!(
    /// Hub constants and limits
    #[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
    pub struct HubConfig {
        /*
         * Signing domain
         */
        /// Chain id signatures are bound to
        pub chain_id: u64,
        /// Verifying contract signatures are bound to
        pub forwarder: Address,

        /*
         * Gas
         */
        /// Fixed gas charged on top of the measured hook and target gas
        pub hub_overhead: u64,
        /// Gas that must remain after the call gas and hook ceilings are reserved
        pub gas_reserve: u64,
        /// Gas cost of a non-zero calldata byte
        pub non_zero_byte_gas: u64,

        /*
         * Ledger and registry
         */
        /// Ceiling on any single paymaster balance
        pub maximum_deposit: U256,
        /// Stake required to register a relay
        pub minimum_stake: U256,
        /// Minimum delay between relay removal and unstake, in seconds
        pub minimum_unstake_delay: u64,
    }
);

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            chain_id: 1337,
            forwarder: address!("d216153c06e857cd7f72665e0af1d7d82172f494"),
            hub_overhead: 48204,
            gas_reserve: 100_000,
            non_zero_byte_gas: 16,
            maximum_deposit: U256::from(2_000_000_000_000_000_000u128), // 2 ETH
            minimum_stake: U256::from(1_000_000_000_000_000_000u128),   // 1 ETH
            minimum_unstake_delay: 604_800,                               // 1 week
        }
    }
}

impl HubConfig {
    /// The signing domain relay requests are bound to
    pub fn domain(&self) -> RelayDomain {
        RelayDomain::new(self.chain_id, self.forwarder)
    }

    /// Apply partial overrides on top of this config
    pub fn with_overrides(self, overrides: OptionalHubConfig) -> Self {
        let current = OptionalHubConfig {
            chain_id: Some(self.chain_id),
            forwarder: Some(self.forwarder),
            hub_overhead: Some(self.hub_overhead),
            gas_reserve: Some(self.gas_reserve),
            non_zero_byte_gas: Some(self.non_zero_byte_gas),
            maximum_deposit: Some(self.maximum_deposit),
            minimum_stake: Some(self.minimum_stake),
            minimum_unstake_delay: Some(self.minimum_unstake_delay),
        };
        overrides.merge(current).into()
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.chain_id == 0 {
            anyhow::bail!("chain id must be non-zero");
        }
        if self.non_zero_byte_gas < crate::gas::ZERO_BYTE_GAS {
            anyhow::bail!("non-zero byte gas must not be lower than zero byte gas");
        }
        Ok(())
    }
}

/// Load hub configuration.
///
/// Sources in increasing priority:
/// - defaults
/// - file (any format supported by `config`)
/// - `HUB_` environment variables
pub fn load_hub_config(file: Option<&str>) -> anyhow::Result<HubConfig> {
    let mut builder = defaults()?;
    if let Some(file) = file {
        builder = builder.add_source(File::with_name(file));
    }
    finish(builder)
}

fn defaults() -> anyhow::Result<ConfigBuilder<DefaultState>> {
    let default =
        serde_json::to_string(&HubConfig::default()).context("should serialize defaults")?;
    Ok(Config::builder().add_source(File::from_str(default.as_str(), FileFormat::Json)))
}

fn finish(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<HubConfig> {
    let hub_config: HubConfig = builder
        .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
        .build()
        .context("failed to build hub config")?
        .try_deserialize()
        .context("failed to deserialize hub config")?;
    hub_config.validate()?;
    Ok(hub_config)
}
