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
use gasrelay_types::{HubError, HubResult};

/// Prepaid balances held by the hub.
///
/// Balances never go negative and the funds held always equal the sum of all
/// entries.
#[derive(Clone, Debug, Default)]
pub struct Ledger {
    balances: HashMap<Address, U256>,
    total: U256,
}

impl Ledger {
    /// Balance of an account, zero if it never received funds
    pub fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    /// Total funds held for all accounts
    pub fn total(&self) -> U256 {
        self.total
    }

    /// Sum of all entries
    pub fn sum_of_balances(&self) -> U256 {
        self.balances
            .values()
            .fold(U256::ZERO, |acc, b| acc.saturating_add(*b))
    }

    /// Credit `amount` to `account`, failing if the resulting balance exceeds `max_balance`.
    ///
    /// Returns the new balance.
    pub fn deposit_for(
        &mut self,
        account: Address,
        amount: U256,
        max_balance: U256,
    ) -> HubResult<U256> {
        let balance = self.balance_of(account).saturating_add(amount);
        if balance > max_balance {
            return Err(HubError::DepositTooLarge {
                balance,
                max: max_balance,
            });
        }
        self.set(account, balance);
        self.total = self.total.saturating_add(amount);
        Ok(balance)
    }

    /// Debit `amount` from `account` for a withdrawal.
    ///
    /// Returns the new balance.
    pub fn withdraw(&mut self, account: Address, amount: U256) -> HubResult<U256> {
        self.debit(account, amount)
    }

    /// Charge a paymaster for a relayed call
    pub(crate) fn charge_for(&mut self, paymaster: Address, amount: U256) -> HubResult<U256> {
        self.debit(paymaster, amount)
    }

    /// Credit relay earnings. Not subject to the deposit ceiling.
    pub(crate) fn credit(&mut self, account: Address, amount: U256) {
        let balance = self.balance_of(account).saturating_add(amount);
        self.set(account, balance);
        self.total = self.total.saturating_add(amount);
    }

    /// Put back a balance and total recorded before a change
    pub(crate) fn restore(&mut self, account: Address, balance: U256, total: U256) {
        self.set(account, balance);
        self.total = total;
    }

    fn debit(&mut self, account: Address, amount: U256) -> HubResult<U256> {
        let balance = self.balance_of(account);
        let Some(remaining) = balance.checked_sub(amount) else {
            return Err(HubError::InsufficientFunds {
                requested: amount,
                balance,
            });
        };
        self.set(account, remaining);
        self.total -= amount;
        Ok(remaining)
    }

    fn set(&mut self, account: Address, balance: U256) {
        // entries are kept at zero rather than removed
        self.balances.insert(account, balance);
    }
}
