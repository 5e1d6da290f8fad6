//! Big Number Operations
//!
//! Provides the arbitrary precision integers behind boxed integer terms.
//!
//! This module uses the `malachite` crate for the arithmetic. It offers what
//! the term utilities need from a bignum: exact conversions from machine
//! integers and integral floats, comparison against floats by mathematical
//! value, and access to the magnitude as 32-bit or 64-bit digits for hashing.

/*
 * %CopyrightBegin%
 *
 * SPDX-License-Identifier: Apache-2.0
 *
 * Copyright Lee Barney 2025. All Rights Reserved.
 *
 * This file is derived from work copyrighted by Ericsson AB 1996-2025.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 *
 * %CopyrightEnd%
 */

use std::cmp::Ordering;

use malachite::base::num::arithmetic::traits::UnsignedAbs;
use malachite::base::num::conversion::traits::RoundingFrom;
use malachite::base::rounding_modes::RoundingMode;
use malachite::Integer;

/// Big number representation using malachite's Integer
///
/// A `BigNumber` may hold any integer, including values that would also fit
/// in an immediate small integer. Code that compares or hashes integers must
/// therefore go by value, never by representation.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BigNumber {
    value: Integer,
}

impl BigNumber {
    /// Create a new big number from i64
    pub fn from_i64(value: i64) -> Self {
        Self {
            value: Integer::from(value),
        }
    }

    /// Create a new big number from u64
    pub fn from_u64(value: u64) -> Self {
        Self {
            value: Integer::from(value),
        }
    }

    /// Create a big number holding exactly the value of an integral float.
    ///
    /// Returns `None` for NaN, infinities and floats with a fractional part.
    pub fn from_f64_exact(value: f64) -> Option<Self> {
        if !value.is_finite() || value.fract() != 0.0 {
            return None;
        }
        let (value, _) = Integer::rounding_from(value, RoundingMode::Floor);
        Some(Self { value })
    }

    /// Convert to i64, `None` if the value is out of range
    pub fn to_i64(&self) -> Option<i64> {
        i64::try_from(&self.value).ok()
    }

    /// Whether the value is strictly below zero
    pub fn is_negative(&self) -> bool {
        self.value < 0
    }

    /// Shift left by `shift` bits (a negative shift shifts right)
    pub fn lshift(&self, shift: i32) -> Self {
        let value = if shift >= 0 {
            &self.value << (shift as u64)
        } else {
            &self.value >> ((-shift) as u64)
        };
        Self { value }
    }

    /// Little-endian 64-bit digits of the magnitude.
    ///
    /// Zero has no digits.
    pub fn magnitude_digits(&self) -> Vec<u64> {
        let magnitude = (&self.value).unsigned_abs();
        magnitude.to_limbs_asc().into_iter().map(u64::from).collect()
    }

    /// Little-endian 32-bit digits of the magnitude, without leading zero digits.
    pub fn magnitude_digits32(&self) -> Vec<u32> {
        let mut digits: Vec<u32> = self
            .magnitude_digits()
            .into_iter()
            .flat_map(|digit| [digit as u32, (digit >> 32) as u32])
            .collect();
        while digits.last() == Some(&0) {
            digits.pop();
        }
        digits
    }

    /// Compare against a float by mathematical value.
    ///
    /// Returns `None` only when `other` is NaN. Infinities order outside every
    /// integer.
    pub fn partial_cmp_f64(&self, other: f64) -> Option<Ordering> {
        if other.is_nan() {
            return None;
        }
        if other.is_infinite() {
            return Some(if other > 0.0 {
                Ordering::Less
            } else {
                Ordering::Greater
            });
        }
        // floor(other) <= other, and the rounding ordering says whether it is strictly below.
        let (floor, rounding) = Integer::rounding_from(other, RoundingMode::Floor);
        Some(match self.value.cmp(&floor) {
            Ordering::Equal if rounding == Ordering::Less => Ordering::Less,
            ordering => ordering,
        })
    }

}
