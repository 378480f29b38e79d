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

//! Signer recovery for relay request signatures

use alloy_primitives::{Address, Signature, B256};

/// Outcome of recovering a signer
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SignerRecovery {
    /// Address of the signing key
    Recovered(Address),
    /// Signature is malformed or does not recover to a key
    Invalid,
}

impl SignerRecovery {
    /// Returns true if the signature recovered to `expected`
    pub fn is_signer(&self, expected: Address) -> bool {
        matches!(self, SignerRecovery::Recovered(address) if *address == expected)
    }
}

/// Recover the signer of `hash` from a 65 byte `r || s || v` signature.
///
/// Never panics: malformed input is reported as `Invalid`.
pub fn recover_signer(hash: &B256, signature: &[u8]) -> SignerRecovery {
    let Ok(signature) = Signature::from_raw(signature) else {
        return SignerRecovery::Invalid;
    };
    match signature.recover_address_from_prehash(hash) {
        Ok(address) => SignerRecovery::Recovered(address),
        Err(_) => SignerRecovery::Invalid,
    }
}
