//! Atomic Operations Module
//!
//! Provides the 64-bit word atomics behind the interval counter.
//! Based on ethr_atomics.c
//!
//! Two backends satisfy the [`WordAtomic`] capability:
//!
//! - [`NativeWordAtomic`] uses the platform's native 64-bit atomic, with a
//!   hardware fetch-and-add.
//! - [`DoubleWordAtomic`] treats the value as two 32-bit words updated as one
//!   unit. Its only read-modify-write primitive is the double-word
//!   compare-and-swap, so increments run as a CAS retry loop.
//!
//! [`DefaultWordAtomic`] picks one at build time: the native backend on 64-bit
//! targets, the double-word backend elsewhere or when the
//! `double-word-atomics` feature is enabled.

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

use std::sync::atomic::Ordering;

use crate::loom::hint::spin_loop;
use crate::loom::sync::atomic::AtomicU64;

/// A 64-bit atomic word
pub trait WordAtomic: Send + Sync {
    /// Create a new atomic holding `value`
    fn new(value: u64) -> Self
    where
        Self: Sized;

    /// Load the value
    fn load(&self, order: Ordering) -> u64;

    /// Weak compare-and-swap; may fail spuriously.
    ///
    /// Returns the previous value on success and the observed value on failure.
    fn compare_exchange_weak(
        &self,
        current: u64,
        new: u64,
        success: Ordering,
        failure: Ordering,
    ) -> Result<u64, u64>;

    /// Atomically add one and return the new value
    fn fetch_increment(&self, order: Ordering) -> u64;
}

/// Native 64-bit atomic word
pub struct NativeWordAtomic {
    value: AtomicU64,
}

impl WordAtomic for NativeWordAtomic {
    fn new(value: u64) -> Self {
        Self {
            value: AtomicU64::new(value),
        }
    }

    #[inline]
    fn load(&self, order: Ordering) -> u64 {
        self.value.load(order)
    }

    #[inline]
    fn compare_exchange_weak(
        &self,
        current: u64,
        new: u64,
        success: Ordering,
        failure: Ordering,
    ) -> Result<u64, u64> {
        self.value.compare_exchange_weak(current, new, success, failure)
    }

    #[inline]
    fn fetch_increment(&self, order: Ordering) -> u64 {
        self.value.fetch_add(1, order).wrapping_add(1)
    }
}

/// Low and high 32-bit halves of a double word
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DoubleWord {
    pub low: u32,
    pub high: u32,
}

impl DoubleWord {
    #[inline]
    pub fn from_u64(value: u64) -> Self {
        Self {
            low: value as u32,
            high: (value >> 32) as u32,
        }
    }

    #[inline]
    pub fn to_u64(self) -> u64 {
        (u64::from(self.high) << 32) | u64::from(self.low)
    }

    /// The successor, carrying from the low word into the high word
    #[inline]
    pub fn successor(self) -> Self {
        let (low, carry) = self.low.overflowing_add(1);
        Self {
            low,
            high: self.high.wrapping_add(u32::from(carry)),
        }
    }
}

/// Double-word atomic: two adjacent 32-bit words updated as one unit
pub struct DoubleWordAtomic {
    cell: AtomicU64,
}

impl DoubleWordAtomic {
    /// Load both words
    #[inline]
    pub fn load_words(&self, order: Ordering) -> DoubleWord {
        DoubleWord::from_u64(self.cell.load(order))
    }

    /// Double-word compare-and-swap
    #[inline]
    pub fn compare_exchange_words(
        &self,
        current: DoubleWord,
        new: DoubleWord,
        success: Ordering,
        failure: Ordering,
    ) -> Result<DoubleWord, DoubleWord> {
        self.cell
            .compare_exchange_weak(current.to_u64(), new.to_u64(), success, failure)
            .map(DoubleWord::from_u64)
            .map_err(DoubleWord::from_u64)
    }
}

impl WordAtomic for DoubleWordAtomic {
    fn new(value: u64) -> Self {
        Self {
            cell: AtomicU64::new(value),
        }
    }

    #[inline]
    fn load(&self, order: Ordering) -> u64 {
        self.load_words(order).to_u64()
    }

    #[inline]
    fn compare_exchange_weak(
        &self,
        current: u64,
        new: u64,
        success: Ordering,
        failure: Ordering,
    ) -> Result<u64, u64> {
        self.compare_exchange_words(
            DoubleWord::from_u64(current),
            DoubleWord::from_u64(new),
            success,
            failure,
        )
        .map(DoubleWord::to_u64)
        .map_err(DoubleWord::to_u64)
    }

    fn fetch_increment(&self, order: Ordering) -> u64 {
        let mut current = self.load_words(Ordering::Relaxed);
        loop {
            let next = current.successor();
            match self.compare_exchange_words(current, next, order, Ordering::Relaxed) {
                Ok(_) => return next.to_u64(),
                Err(observed) => {
                    current = observed;
                    spin_loop();
                }
            }
        }
    }
}

/// Check if native word-sized 64-bit atomics are available
pub fn native_wide_atomics() -> bool {
    cfg!(target_pointer_width = "64")
}

/// The word atomic selected for this build
#[cfg(all(target_pointer_width = "64", not(feature = "double-word-atomics")))]
pub type DefaultWordAtomic = NativeWordAtomic;

/// The word atomic selected for this build
#[cfg(any(not(target_pointer_width = "64"), feature = "double-word-atomics"))]
pub type DefaultWordAtomic = DoubleWordAtomic;
