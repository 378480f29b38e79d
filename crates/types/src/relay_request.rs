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

//! Relay request structure and its EIP-712 typed hash.

use alloy_primitives::{Address, Bytes, Selector, B256, U256};
use alloy_sol_types::{eip712_domain, Eip712Domain, SolCall, SolStruct};
use serde::{Deserialize, Serialize};

/// Typed structures as they are hashed and ABI encoded by the hub
#[allow(missing_docs)]
pub mod typed {
    use alloy_sol_types::sol;

    sol! {
        #[derive(Default, Debug, PartialEq, Eq)]
        struct GasData {
            uint256 gasLimit;
            uint256 gasPrice;
            uint256 pctRelayFee;
            uint256 baseRelayFee;
        }

        #[derive(Default, Debug, PartialEq, Eq)]
        struct RelayData {
            address senderAddress;
            uint256 senderNonce;
            address relayAddress;
            address paymaster;
        }

        #[derive(Default, Debug, PartialEq, Eq)]
        struct RelayRequest {
            address target;
            bytes encodedFunction;
            GasData gasData;
            RelayData relayData;
        }

        #[derive(Debug, PartialEq, Eq)]
        interface IRelayHub {
            function relayCall(
                RelayRequest relayRequest,
                bytes signature,
                bytes approvalData
            ) external;
        }
    }
}

/// EIP-712 domain name used for relayed transactions
pub const EIP712_DOMAIN_NAME: &str = "GSN Relayed Transaction";
/// EIP-712 domain version used for relayed transactions
pub const EIP712_DOMAIN_VERSION: &str = "1";

/// The context a signature is bound to: a chain and the verifying forwarder
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct RelayDomain {
    /// Chain id
    pub chain_id: u64,
    /// Address of the verifying contract (the forwarder)
    pub verifying_contract: Address,
}

impl RelayDomain {
    /// Create a new domain
    pub fn new(chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            chain_id,
            verifying_contract,
        }
    }

    /// The EIP-712 domain separator parameters
    pub fn eip712(&self) -> Eip712Domain {
        eip712_domain! {
            name: EIP712_DOMAIN_NAME,
            version: EIP712_DOMAIN_VERSION,
            chain_id: self.chain_id,
            verifying_contract: self.verifying_contract,
        }
    }
}

/// A signed request to have a relay forward a call on behalf of `sender`.
///
/// Requests are plain values. Cloning yields an independent copy, so a clone can be
/// modified and re-signed without touching the original or its signature.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    /// The end user the call is made for
    pub sender: Address,
    /// The contract to call
    pub target: Address,
    /// Calldata forwarded to the target
    pub encoded_call: Bytes,
    /// Sender nonce for this target
    pub nonce: U256,
    /// Gas price the sender accepts
    pub gas_price: u128,
    /// Gas limit of the forwarded call
    pub gas_limit: u64,
    /// Flat relay fee
    pub base_relay_fee: U256,
    /// Percentage markup on the gas cost
    pub pct_relay_fee: u64,
    /// The relay expected to submit this request
    pub relay_address: Address,
    /// The sponsor paying for the request
    pub paymaster: Address,
}

impl RelayRequest {
    /// The typed structure that is hashed for signing
    pub fn to_typed(&self) -> typed::RelayRequest {
        typed::RelayRequest {
            target: self.target,
            encodedFunction: self.encoded_call.clone(),
            gasData: self.gas_data(),
            relayData: typed::RelayData {
                senderAddress: self.sender,
                senderNonce: self.nonce,
                relayAddress: self.relay_address,
                paymaster: self.paymaster,
            },
        }
    }

    /// Gas and fee fields of the request
    pub fn gas_data(&self) -> typed::GasData {
        typed::GasData {
            gasLimit: U256::from(self.gas_limit),
            gasPrice: U256::from(self.gas_price),
            pctRelayFee: U256::from(self.pct_relay_fee),
            baseRelayFee: self.base_relay_fee,
        }
    }

    /// Hash to be signed by the sender.
    ///
    /// `keccak256(0x1901 || domainSeparator || hashStruct(request))`
    pub fn signing_hash(&self, domain: &RelayDomain) -> B256 {
        self.to_typed().eip712_signing_hash(&domain.eip712())
    }

    /// First four bytes of the encoded call, zero if the call is shorter
    pub fn selector(&self) -> Selector {
        let mut selector = [0u8; 4];
        if self.encoded_call.len() >= 4 {
            selector.copy_from_slice(&self.encoded_call[..4]);
        }
        selector.into()
    }

    /// Full calldata of the `relayCall` transaction carrying this request
    pub fn relay_call_calldata(&self, signature: &Bytes, approval_data: &Bytes) -> Bytes {
        typed::IRelayHub::relayCallCall {
            relayRequest: self.to_typed(),
            signature: signature.clone(),
            approvalData: approval_data.clone(),
        }
        .abi_encode()
        .into()
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{address, bytes, keccak256};

    use super::*;

    fn request() -> RelayRequest {
        RelayRequest {
            sender: address!("1111111111111111111111111111111111111111"),
            target: address!("2222222222222222222222222222222222222222"),
            encoded_call: bytes!("deadbeef"),
            nonce: U256::from(5),
            gas_price: 10_000_000,
            gas_limit: 500_000,
            base_relay_fee: U256::from(1000),
            pct_relay_fee: 15,
            relay_address: address!("3333333333333333333333333333333333333333"),
            paymaster: address!("4444444444444444444444444444444444444444"),
        }
    }

    fn domain() -> RelayDomain {
        RelayDomain::new(1337, address!("5555555555555555555555555555555555555555"))
    }

    #[test]
    fn test_encode_type() {
        assert_eq!(
            typed::RelayRequest::eip712_encode_type(),
            "RelayRequest(address target,bytes encodedFunction,GasData gasData,RelayData relayData)\
             GasData(uint256 gasLimit,uint256 gasPrice,uint256 pctRelayFee,uint256 baseRelayFee)\
             RelayData(address senderAddress,uint256 senderNonce,address relayAddress,address paymaster)"
        );
    }

    #[test]
    fn test_signing_hash_layout() {
        let request = request();
        let domain = domain();

        let mut preimage = vec![0x19, 0x01];
        preimage.extend_from_slice(domain.eip712().separator().as_slice());
        preimage.extend_from_slice(request.to_typed().eip712_hash_struct().as_slice());

        assert_eq!(request.signing_hash(&domain), keccak256(preimage));
    }

    #[test]
    fn test_hash_deterministic() {
        assert_eq!(
            request().signing_hash(&domain()),
            request().signing_hash(&domain())
        );
    }

    #[test]
    fn test_every_field_changes_hash() {
        let base = request();
        let hash = base.signing_hash(&domain());

        let mutations: Vec<fn(&mut RelayRequest)> = vec![
            |r| r.sender = Address::ZERO,
            |r| r.target = Address::ZERO,
            |r| r.encoded_call = bytes!("deadbeee"),
            |r| r.nonce += U256::from(1),
            |r| r.gas_price += 1,
            |r| r.gas_limit += 1,
            |r| r.base_relay_fee += U256::from(1),
            |r| r.pct_relay_fee += 1,
            |r| r.relay_address = Address::ZERO,
            |r| r.paymaster = Address::ZERO,
        ];

        for mutate in mutations {
            let mut changed = base.clone();
            mutate(&mut changed);
            assert_ne!(changed.signing_hash(&domain()), hash, "{changed:?}");
        }
    }

    #[test]
    fn test_domain_binds_hash() {
        let request = request();
        let other_chain = RelayDomain::new(1, domain().verifying_contract);
        let other_verifier = RelayDomain::new(domain().chain_id, Address::ZERO);

        let hash = request.signing_hash(&domain());
        assert_ne!(request.signing_hash(&other_chain), hash);
        assert_ne!(request.signing_hash(&other_verifier), hash);
    }

    #[test]
    fn test_clone_is_independent() {
        let original = request();
        let hash = original.signing_hash(&domain());

        let mut copy = original.clone();
        copy.nonce = U256::from(777);

        assert_eq!(original.nonce, U256::from(5));
        assert_eq!(original.signing_hash(&domain()), hash);
    }

    #[test]
    fn test_selector() {
        assert_eq!(request().selector(), Selector::from([0xde, 0xad, 0xbe, 0xef]));

        let mut short = request();
        short.encoded_call = bytes!("dead");
        assert_eq!(short.selector(), Selector::ZERO);
    }

    #[test]
    fn test_relay_call_calldata() {
        let calldata = request().relay_call_calldata(&Bytes::from(vec![1; 65]), &Bytes::new());
        assert_eq!(
            &calldata[..4],
            typed::IRelayHub::relayCallCall::SELECTOR.as_slice()
        );
        assert_eq!(calldata.len() % 32, 4);
    }
}
