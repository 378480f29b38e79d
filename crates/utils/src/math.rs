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

//! Math utilities

use alloy_primitives::Uint;

/// Increases a uint by a percentage, rounding down
pub fn uint_increase_by_percent<const BITS: usize, const LIMBS: usize>(
    n: Uint<BITS, LIMBS>,
    percent: u64,
) -> Uint<BITS, LIMBS> {
    let hundred = Uint::<BITS, LIMBS>::from(100);
    n.saturating_mul(hundred.saturating_add(Uint::from(percent))) / hundred
}

/// Increases a number by a percentage, rounding down
pub fn increase_by_percent(n: u128, percent: u64) -> u128 {
    n.saturating_mul(100 + u128::from(percent)) / 100
}
