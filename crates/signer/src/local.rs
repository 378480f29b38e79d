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

use alloy_primitives::{Address, Bytes, B256};
use alloy_signer::SignerSync;
use alloy_signer_local::{coins_bip39::English, MnemonicBuilder, PrivateKeySigner};
use gasrelay_types::{RelayDomain, RelayRequest};
use secrecy::{ExposeSecret, SecretString};

use crate::Result;

/// Signs relay requests with a local private key
#[derive(Clone, Debug)]
pub struct RequestSigner {
    signer: PrivateKeySigner,
}

impl RequestSigner {
    /// Create a signer from a hex encoded private key
    pub fn from_private_key(private_key: &SecretString) -> Result<Self> {
        let signer = private_key
            .expose_secret()
            .parse::<PrivateKeySigner>()?;
        Ok(Self { signer })
    }

    /// Create a signer from the key at `index` of a BIP-39 mnemonic
    pub fn from_mnemonic(mnemonic: &SecretString, index: u32) -> Result<Self> {
        let signer = MnemonicBuilder::<English>::default()
            .phrase(mnemonic.expose_secret())
            .index(index)?
            .build()?;
        Ok(Self { signer })
    }

    /// Create a signer with a fresh random key
    pub fn random() -> Self {
        Self {
            signer: PrivateKeySigner::random(),
        }
    }

    /// Address of the signing key
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Sign a prehashed message, returning the 65 byte `r || s || v` signature
    pub fn sign_hash(&self, hash: &B256) -> Result<Bytes> {
        let signature = self.signer.sign_hash_sync(hash)?;
        Ok(Bytes::copy_from_slice(&signature.as_bytes()))
    }

    /// Sign the typed hash of a relay request under `domain`
    pub fn sign_request(&self, request: &RelayRequest, domain: &RelayDomain) -> Result<Bytes> {
        self.sign_hash(&request.signing_hash(domain))
    }
}
