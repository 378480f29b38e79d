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

use std::time::Duration;

use alloy_primitives::{Address, U256};
use gasrelay_types::{HubEvent, HubResult, LogEntry, RelayRecord, Timestamp};

use crate::{Ledger, NonceTable, RelayRegistry};

/// All state owned by the hub, plus the ordered event log.
///
/// State changes go through the store so that, while a checkpoint is open,
/// the previous value of every touched entry is journaled. Reverting replays
/// the journal backwards and truncates the log, so its cost depends on what
/// changed since the checkpoint, not on the size of the store.
#[derive(Debug, Default)]
pub struct HubStore {
    ledger: Ledger,
    registry: RelayRegistry,
    nonces: NonceTable,
    log: Vec<LogEntry>,
    timestamp: Timestamp,
    journal: Vec<JournalEntry>,
    open_checkpoints: usize,
}

#[derive(Debug)]
enum JournalEntry {
    Balance {
        account: Address,
        balance: U256,
        total: U256,
    },
    Relay {
        relay: Address,
        record: Option<RelayRecord>,
    },
    Nonce {
        target: Address,
        sender: Address,
        nonce: U256,
    },
}

/// A point the store can be reverted to.
///
/// Checkpoints nest and must be closed in reverse order of creation, either
/// with [`HubStore::revert_to`] or [`HubStore::commit`].
#[derive(Debug)]
#[must_use]
pub struct Checkpoint {
    journal_len: usize,
    log_len: usize,
    timestamp: Timestamp,
}

impl HubStore {
    /// Create an empty store at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            ..Default::default()
        }
    }

    /// Paymaster and relay balances
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Relay records
    pub fn registry(&self) -> &RelayRegistry {
        &self.registry
    }

    /// Sender nonces
    pub fn nonces(&self) -> &NonceTable {
        &self.nonces
    }

    /// Every event emitted so far, in order
    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    /// Events emitted by the hub itself
    pub fn hub_events(&self) -> impl Iterator<Item = &HubEvent> {
        self.log.iter().filter_map(LogEntry::as_hub)
    }

    /// Entries with the given event name
    pub fn events_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a LogEntry> {
        self.log.iter().filter(move |e| e.name() == name)
    }

    /// Current block timestamp
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Move the block timestamp forward
    pub fn advance_time(&mut self, duration: Duration) {
        self.timestamp = self.timestamp + duration;
    }

    /// Open a checkpoint
    pub fn checkpoint(&mut self) -> Checkpoint {
        self.open_checkpoints += 1;
        Checkpoint {
            journal_len: self.journal.len(),
            log_len: self.log.len(),
            timestamp: self.timestamp,
        }
    }

    /// Discard every change made since `checkpoint` was opened
    pub fn revert_to(&mut self, checkpoint: Checkpoint) {
        while self.journal.len() > checkpoint.journal_len {
            let Some(entry) = self.journal.pop() else {
                break;
            };
            match entry {
                JournalEntry::Balance {
                    account,
                    balance,
                    total,
                } => self.ledger.restore(account, balance, total),
                JournalEntry::Relay { relay, record } => self.registry.restore(relay, record),
                JournalEntry::Nonce {
                    target,
                    sender,
                    nonce,
                } => self.nonces.restore(target, sender, nonce),
            }
        }
        self.log.truncate(checkpoint.log_len);
        self.timestamp = checkpoint.timestamp;
        self.close_checkpoint();
    }

    /// Keep the changes made since `checkpoint` was opened
    pub fn commit(&mut self, checkpoint: Checkpoint) {
        let Checkpoint { .. } = checkpoint;
        self.close_checkpoint();
    }

    /// A copy of the hub state with an empty log, for dry runs
    pub(crate) fn scratch(&self) -> HubStore {
        HubStore {
            ledger: self.ledger.clone(),
            registry: self.registry.clone(),
            nonces: self.nonces.clone(),
            timestamp: self.timestamp,
            ..Default::default()
        }
    }

    pub(crate) fn deposit_for(
        &mut self,
        account: Address,
        amount: U256,
        max_balance: U256,
    ) -> HubResult<U256> {
        self.journal_balance(account);
        self.ledger.deposit_for(account, amount, max_balance)
    }

    pub(crate) fn withdraw(&mut self, account: Address, amount: U256) -> HubResult<U256> {
        self.journal_balance(account);
        self.ledger.withdraw(account, amount)
    }

    pub(crate) fn charge_for(&mut self, paymaster: Address, amount: U256) -> HubResult<U256> {
        self.journal_balance(paymaster);
        self.ledger.charge_for(paymaster, amount)
    }

    pub(crate) fn credit(&mut self, account: Address, amount: U256) {
        self.journal_balance(account);
        self.ledger.credit(account, amount);
    }

    pub(crate) fn stake(
        &mut self,
        owner: Address,
        relay: Address,
        value: U256,
        unstake_delay: u64,
        min_unstake_delay: u64,
    ) -> HubResult<&RelayRecord> {
        self.journal_relay(relay);
        self.registry
            .stake(owner, relay, value, unstake_delay, min_unstake_delay)
    }

    pub(crate) fn register_relay(
        &mut self,
        relay: Address,
        base_relay_fee: U256,
        pct_relay_fee: u64,
        url: String,
        min_stake: U256,
    ) -> HubResult<&RelayRecord> {
        self.journal_relay(relay);
        self.registry
            .register(relay, base_relay_fee, pct_relay_fee, url, min_stake)
    }

    pub(crate) fn remove_relay(
        &mut self,
        owner: Address,
        relay: Address,
        now: Timestamp,
    ) -> HubResult<&RelayRecord> {
        self.journal_relay(relay);
        self.registry.remove(owner, relay, now)
    }

    pub(crate) fn unstake(
        &mut self,
        owner: Address,
        relay: Address,
        now: Timestamp,
    ) -> HubResult<U256> {
        self.journal_relay(relay);
        self.registry.unstake(owner, relay, now)
    }

    pub(crate) fn increment_nonce(&mut self, target: Address, sender: Address) -> U256 {
        if self.open_checkpoints > 0 {
            self.journal.push(JournalEntry::Nonce {
                target,
                sender,
                nonce: self.nonces.get(target, sender),
            });
        }
        self.nonces.increment(target, sender)
    }

    pub(crate) fn emit(&mut self, entry: impl Into<LogEntry>) {
        self.log.push(entry.into());
    }

    fn journal_balance(&mut self, account: Address) {
        if self.open_checkpoints > 0 {
            self.journal.push(JournalEntry::Balance {
                account,
                balance: self.ledger.balance_of(account),
                total: self.ledger.total(),
            });
        }
    }

    fn journal_relay(&mut self, relay: Address) {
        if self.open_checkpoints > 0 {
            self.journal.push(JournalEntry::Relay {
                relay,
                record: self.registry.get(relay).cloned(),
            });
        }
    }

    fn close_checkpoint(&mut self) {
        self.open_checkpoints = self.open_checkpoints.saturating_sub(1);
        if self.open_checkpoints == 0 {
            self.journal.clear();
        }
    }
}
