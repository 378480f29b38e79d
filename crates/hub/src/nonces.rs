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

use std::collections::HashMap;

use alloy_primitives::{Address, U256};

/// Next expected nonce per `(target, sender)`
#[derive(Clone, Debug, Default)]
pub struct NonceTable {
    nonces: HashMap<(Address, Address), U256>,
}

impl NonceTable {
    /// Nonce the next request from `sender` to `target` must carry
    pub fn get(&self, target: Address, sender: Address) -> U256 {
        self.nonces
            .get(&(target, sender))
            .copied()
            .unwrap_or_default()
    }

    /// Consume the current nonce, returning the new one
    pub(crate) fn increment(&mut self, target: Address, sender: Address) -> U256 {
        let nonce = self.nonces.entry((target, sender)).or_default();
        *nonce = nonce.saturating_add(U256::from(1));
        *nonce
    }

    pub(crate) fn restore(&mut self, target: Address, sender: Address, nonce: U256) {
        self.nonces.insert((target, sender), nonce);
    }
}
