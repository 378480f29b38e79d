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

use gasrelay_types::{ExecutionError, HubError};

/// Gas allowance exhausted
#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
#[error("out of gas")]
pub struct OutOfGas;

impl From<OutOfGas> for ExecutionError {
    fn from(_: OutOfGas) -> Self {
        ExecutionError::OutOfGas
    }
}

impl From<OutOfGas> for HubError {
    fn from(_: OutOfGas) -> Self {
        HubError::OutOfGas
    }
}

/// Tracks gas use against a limit.
///
/// A call frame runs on a child meter capped at the smaller of its own
/// allowance and what the parent has left. The parent absorbs the child's use
/// when the frame returns, whether it succeeded or not.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct GasMeter {
    limit: u64,
    used: u64,
}

impl GasMeter {
    /// Create a meter with `limit` gas
    pub fn new(limit: u64) -> Self {
        Self { limit, used: 0 }
    }

    /// Gas limit of this meter
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Gas used so far
    pub fn used(&self) -> u64 {
        self.used
    }

    /// Gas left
    pub fn remaining(&self) -> u64 {
        self.limit - self.used
    }

    /// Consume gas. Running out consumes everything that was left.
    pub fn consume(&mut self, gas: u64) -> Result<(), OutOfGas> {
        if gas > self.remaining() {
            self.used = self.limit;
            return Err(OutOfGas);
        }
        self.used += gas;
        Ok(())
    }

    /// A meter for a nested frame allowed at most `cap` gas
    pub fn child(&self, cap: u64) -> GasMeter {
        GasMeter::new(cap.min(self.remaining()))
    }

    /// Account for the gas used by a child frame
    pub fn absorb(&mut self, child: &GasMeter) {
        self.used = self.used.saturating_add(child.used).min(self.limit);
    }
}
