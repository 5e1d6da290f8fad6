//! Bit Manipulation Module
//!
//! Bit-level helpers for bitstring terms, whose content need not start or end
//! on a byte boundary.
//!
//! ## Bit Numbering
//!
//! Bits are numbered MSB-first: bit 0 is the most significant bit of a byte.
//!
//! ## Bounds
//!
//! Every bit read must lie inside `data`. Debug builds assert this; release
//! builds read bits past the end as 0.
//!
//! ## Examples
//!
//! ```rust
//! use std::cmp::Ordering;
//! use entities_data_handling::bits;
//!
//! // The 12 bits starting at bit 4: 0xABC
//! let aligned = bits::aligned_bits(&[0x0A, 0xBC], 4, 12);
//! assert_eq!(aligned.bytes, vec![0xAB]);
//! assert_eq!((aligned.tail, aligned.tail_bits), (0xC0, 4));
//!
//! assert_eq!(bits::cmp_bits(&[0xF0], 0, &[0x0F], 0, 4), Ordering::Greater);
//! ```

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

/// Byte index of a bit offset
pub fn byte_offset(bit_offset: usize) -> usize {
    bit_offset >> 3
}

/// Bit index within its byte of a bit offset
pub fn bit_offset(bit_offset: usize) -> usize {
    bit_offset & 7
}

/// Whether `bit_size` bits starting at `bit_offset` lie inside `data`
pub fn in_bounds(data: &[u8], bit_offset: usize, bit_size: usize) -> bool {
    bit_offset
        .checked_add(bit_size)
        .is_some_and(|end| end <= data.len() * 8)
}

/// Read the 8 bits starting at bit `offset`; bits past the end read as 0
fn byte_at(data: &[u8], offset: usize) -> u8 {
    let index = byte_offset(offset);
    let shift = bit_offset(offset);
    let first = data.get(index).copied().unwrap_or(0);
    if shift == 0 {
        return first;
    }
    let second = data.get(index + 1).copied().unwrap_or(0);
    (first << shift) | (second >> (8 - shift))
}

/// A bitstring realigned to start on a byte boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedBits {
    /// The whole bytes
    pub bytes: Vec<u8>,
    /// Trailing bits, left-aligned, unused low bits zero
    pub tail: u8,
    /// Number of trailing bits, `0..8`
    pub tail_bits: u32,
}

/// Realign the `bit_size` bits of `data` starting at `bit_offset`
pub fn aligned_bits(data: &[u8], bit_offset: usize, bit_size: usize) -> AlignedBits {
    debug_assert!(
        in_bounds(data, bit_offset, bit_size),
        "{bit_size} bits at {bit_offset} overrun {} bytes",
        data.len()
    );
    let whole = bit_size >> 3;
    let tail_bits = (bit_size & 7) as u32;
    let start = byte_offset(bit_offset);
    let bytes = match data.get(start..start + whole) {
        Some(bytes) if self::bit_offset(bit_offset) == 0 => bytes.to_vec(),
        _ => (0..whole)
            .map(|i| byte_at(data, bit_offset + i * 8))
            .collect(),
    };
    let tail = if tail_bits == 0 {
        0
    } else {
        byte_at(data, bit_offset + whole * 8) & !(0xFFu8 >> tail_bits)
    };
    AlignedBits {
        bytes,
        tail,
        tail_bits,
    }
}

/// Compare `size` bits of `a` at `a_offset` with `size` bits of `b` at `b_offset`
pub fn cmp_bits(a: &[u8], a_offset: usize, b: &[u8], b_offset: usize, size: usize) -> Ordering {
    debug_assert!(
        in_bounds(a, a_offset, size),
        "{size} bits at {a_offset} overrun {} bytes",
        a.len()
    );
    debug_assert!(
        in_bounds(b, b_offset, size),
        "{size} bits at {b_offset} overrun {} bytes",
        b.len()
    );
    let mut done = 0;
    while size - done >= 8 {
        let ordering = byte_at(a, a_offset + done).cmp(&byte_at(b, b_offset + done));
        if ordering != Ordering::Equal {
            return ordering;
        }
        done += 8;
    }
    let rest = size - done;
    if rest == 0 {
        return Ordering::Equal;
    }
    let mask = !(0xFFu8 >> rest);
    (byte_at(a, a_offset + done) & mask).cmp(&(byte_at(b, b_offset + done) & mask))
}
