//! Term Hashing Module
//!
//! Provides hash functions for Erlang terms:
//! - `make_hash2` / `make_hash2_init`: the general purpose hash, optionally seeded
//! - `make_broken_hash` (alias `legacy_hash`): the old multiplicative hash kept
//!   for values that were persisted with it
//! - `block_hash`: the byte buffer hash both of them build on
//!
//! Based on erl_term_hashing.c
//!
//! ## Equal terms hash equal
//!
//! Both term hashes go by value, not representation. An integer hashes the
//! same whether it is held as a small or a big, and a float with an integral
//! value hashes exactly as that integer, so `300`, a boxed `300` and `300.0`
//! all produce one hash. `-0.0` hashes as `0`. Map pairs are combined with
//! XOR, which makes the hash independent of pair order.
//!
//! ## Traversal
//!
//! Compound terms are walked with an explicit stack, so arbitrarily deep terms
//! hash without growing the native stack. A tuple, fun environment or map
//! being walked keeps a single cursor on the stack rather than one entry per
//! element, so the stack grows with the depth of a term and not its width.
//!
//! ## Examples
//!
//! ```rust
//! use entities_data_handling::term::Term;
//! use entities_data_handling::term_hashing::make_hash2;
//! use entities_utilities::BigNumber;
//!
//! let small = make_hash2(&Term::Small(300));
//! assert_eq!(small, make_hash2(&Term::Big(BigNumber::from_i64(300))));
//! assert_eq!(small, make_hash2(&Term::Float(300.0)));
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

use std::slice;

use entities_utilities::BigNumber;

use crate::bits::aligned_bits;
use crate::term::{fits_in_bits_i64, Atom, Term};

/// The golden ratio; an arbitrary value
const HCONST: u32 = 0x9e37_79b9;
const HCONST_2: u32 = HCONST.wrapping_mul(2);
const HCONST_3: u32 = HCONST.wrapping_mul(3);
const HCONST_4: u32 = HCONST.wrapping_mul(4);
const HCONST_5: u32 = HCONST.wrapping_mul(5);
const HCONST_6: u32 = HCONST.wrapping_mul(6);
const HCONST_7: u32 = HCONST.wrapping_mul(7);
const HCONST_9: u32 = HCONST.wrapping_mul(9);
const HCONST_10: u32 = HCONST.wrapping_mul(10);
const HCONST_11: u32 = HCONST.wrapping_mul(11);
const HCONST_12: u32 = HCONST.wrapping_mul(12);
const HCONST_13: u32 = HCONST.wrapping_mul(13);
const HCONST_14: u32 = HCONST.wrapping_mul(14);
const HCONST_15: u32 = HCONST.wrapping_mul(15);
const HCONST_16: u32 = HCONST.wrapping_mul(16);
const HCONST_19: u32 = HCONST.wrapping_mul(19);

/// Hash of `[]` when it is the first thing hashed, so that `[]` and `{}` differ
const NIL_FIRST_HASH: u32 = 3_468_870_702;

/// The tagged word of `[]`, mixed in when nil is not the first thing hashed
const NIL_WORD: u32 = 0x3b;

// Hash constants (prime numbers just above 2^28)
const FUNNY_NUMBER1: u32 = 268440163;
const FUNNY_NUMBER2: u32 = 268439161;
const FUNNY_NUMBER3: u32 = 268435459;
const FUNNY_NUMBER4: u32 = 268436141;
const FUNNY_NUMBER5: u32 = 268438633;
const FUNNY_NUMBER6: u32 = 268437017;
const FUNNY_NUMBER7: u32 = 268438039;
const FUNNY_NUMBER8: u32 = 268437511;
const FUNNY_NUMBER9: u32 = 268439627;
const FUNNY_NUMBER10: u32 = 268440479;
const FUNNY_NUMBER11: u32 = 268440577;
const FUNNY_NUMBER12: u32 = 268440581;

/// Number of leading bytes of a binary that the legacy hash looks at
const LEGACY_BINARY_PREFIX: usize = 15;

/// Bob Jenkins' 96-bit mix
#[inline]
fn mix(a: &mut u32, b: &mut u32, c: &mut u32) {
    *a = a.wrapping_sub(*b).wrapping_sub(*c) ^ (*c >> 13);
    *b = b.wrapping_sub(*c).wrapping_sub(*a) ^ (*a << 8);
    *c = c.wrapping_sub(*a).wrapping_sub(*b) ^ (*b >> 13);
    *a = a.wrapping_sub(*b).wrapping_sub(*c) ^ (*c >> 12);
    *b = b.wrapping_sub(*c).wrapping_sub(*a) ^ (*a << 16);
    *c = c.wrapping_sub(*a).wrapping_sub(*b) ^ (*b >> 5);
    *a = a.wrapping_sub(*b).wrapping_sub(*c) ^ (*c >> 3);
    *b = b.wrapping_sub(*c).wrapping_sub(*a) ^ (*a << 10);
    *c = c.wrapping_sub(*a).wrapping_sub(*b) ^ (*b >> 15);
}

#[inline]
fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Hash a byte buffer, continuing from `initial`.
///
/// This is Bob Jenkins' lookup2 hash: 12-byte blocks mixed into three 32-bit
/// registers, with the buffer length folded into the last block.
pub fn block_hash(bytes: &[u8], initial: u32) -> u32 {
    let mut a = HCONST;
    let mut b = HCONST;
    let mut c = initial;

    let mut blocks = bytes.chunks_exact(12);
    for block in &mut blocks {
        a = a.wrapping_add(read_u32_le(&block[0..4]));
        b = b.wrapping_add(read_u32_le(&block[4..8]));
        c = c.wrapping_add(read_u32_le(&block[8..12]));
        mix(&mut a, &mut b, &mut c);
    }

    // The low byte of c is reserved for the length.
    c = c.wrapping_add(bytes.len() as u32);
    let rest = blocks.remainder();
    for (i, &byte) in rest.iter().enumerate() {
        let byte = u32::from(byte);
        match i {
            0..=3 => a = a.wrapping_add(byte << (8 * i)),
            4..=7 => b = b.wrapping_add(byte << (8 * (i - 4))),
            _ => c = c.wrapping_add(byte << (8 * (i - 7))),
        }
    }
    mix(&mut a, &mut b, &mut c);
    c
}

/// Numeric value of a term, normalised so that equal numbers look the same
enum NumberKey<'a> {
    /// Integer that fits an `i64`
    Int(i64),
    /// Integer beyond the `i64` range
    Big(&'a BigNumber),
    /// Integer beyond the `i64` range, converted from an integral float
    OwnedBig(BigNumber),
    /// Float with a fractional part, or a non-finite float
    Float(f64),
}

/// 2^63 as a float
const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;

fn number_key(term: &Term) -> Option<NumberKey<'_>> {
    match term {
        Term::Small(value) => Some(NumberKey::Int(*value)),
        Term::Big(value) => Some(match value.to_i64() {
            Some(value) => NumberKey::Int(value),
            None => NumberKey::Big(value),
        }),
        Term::Float(value) => Some(float_key(*value)),
        _ => None,
    }
}

fn float_key(value: f64) -> NumberKey<'static> {
    if value.fract() != 0.0 || !value.is_finite() {
        return NumberKey::Float(if value.is_nan() { f64::NAN } else { value });
    }
    if (-TWO_POW_63..TWO_POW_63).contains(&value) {
        // Exact: the value is integral and in range. -0.0 becomes 0.
        return NumberKey::Int(value as i64);
    }
    match BigNumber::from_f64_exact(value) {
        Some(big) => NumberKey::OwnedBig(big),
        None => NumberKey::Float(value),
    }
}

/// Running state of `make_hash2`
struct Hash2 {
    hash: u32,
    xor_pairs: u32,
}

impl Hash2 {
    #[inline]
    fn uint32_2(&mut self, e1: u32, e2: u32, constant: u32) {
        let mut a = constant.wrapping_add(e1);
        let mut b = constant.wrapping_add(e2);
        mix(&mut a, &mut b, &mut self.hash);
    }

    #[inline]
    fn uint32(&mut self, e: u32, constant: u32) {
        self.uint32_2(e, 0, constant);
    }

    #[inline]
    fn sint32(&mut self, e: i32, constant: u32) {
        if e < 0 {
            // Negative numbers are mixed twice.
            self.uint32(e.wrapping_neg() as u32, constant);
        }
        self.uint32(e as u32, constant);
    }

    fn atom(&mut self, atom: &Atom) {
        let value = atom.hash_value();
        if self.hash == 0 {
            self.hash = value;
        } else {
            self.uint32(value, HCONST_3);
        }
    }

    fn digits(&mut self, digits: &[u64], negative: bool) {
        let constant = if negative { HCONST_10 } else { HCONST_11 };
        for &digit in digits {
            self.uint32_2(digit as u32, (digit >> 32) as u32, constant);
        }
    }

    fn number(&mut self, key: &NumberKey<'_>) {
        match key {
            NumberKey::Int(value) if fits_in_bits_i64(*value, 28) => {
                self.sint32(*value as i32, HCONST);
            }
            NumberKey::Int(value) => self.digits(&[value.unsigned_abs()], *value < 0),
            NumberKey::Big(value) => self.digits(&value.magnitude_digits(), value.is_negative()),
            NumberKey::OwnedBig(value) => {
                self.digits(&value.magnitude_digits(), value.is_negative())
            }
            NumberKey::Float(value) => {
                let bits = value.to_bits();
                self.uint32_2((bits >> 32) as u32, bits as u32, HCONST_12);
            }
        }
    }
}

enum Hash2Op<'a> {
    Term(&'a Term),
    /// Remaining elements of a tuple or fun environment
    Elements(slice::Iter<'a, Term>),
    /// Remaining pairs of a map
    MapPairs(slice::Iter<'a, (Term, Term)>),
    /// Fold the hash of a finished map pair into the pair accumulator
    MapPair,
    /// Restore the state saved when a map was entered
    MapTail { hash: u32, xor_pairs: u32 },
}

/// Hash a term with `make_hash2_init` and a zero seed
pub fn make_hash2(term: &Term) -> u32 {
    make_hash2_init(term, 0)
}

/// Hash a term, starting from `seed`.
///
/// Different seeds give independent hash functions over the same terms.
pub fn make_hash2_init(term: &Term, seed: u32) -> u32 {
    hash2_on(term, seed, &mut Vec::new())
}

fn hash2_on<'a>(term: &'a Term, seed: u32, stack: &mut Vec<Hash2Op<'a>>) -> u32 {
    let mut state = Hash2 {
        hash: seed,
        xor_pairs: 0,
    };
    stack.push(Hash2Op::Term(term));

    while let Some(op) = stack.pop() {
        match op {
            Hash2Op::MapPair => {
                state.xor_pairs ^= state.hash;
                state.hash = 0;
            }
            Hash2Op::MapTail { hash, xor_pairs } => {
                let pairs = state.xor_pairs;
                state.hash = hash;
                state.uint32(pairs, HCONST_19);
                state.xor_pairs = xor_pairs;
            }
            Hash2Op::Elements(mut elements) => {
                if let Some(element) = elements.next() {
                    if elements.len() > 0 {
                        stack.push(Hash2Op::Elements(elements));
                    }
                    hash2_term(element, &mut state, stack);
                }
            }
            Hash2Op::MapPairs(mut pairs) => {
                if let Some((key, value)) = pairs.next() {
                    if pairs.len() > 0 {
                        stack.push(Hash2Op::MapPairs(pairs));
                    }
                    stack.push(Hash2Op::MapPair);
                    stack.push(Hash2Op::Term(value));
                    hash2_term(key, &mut state, stack);
                }
            }
            Hash2Op::Term(term) => hash2_term(term, &mut state, stack),
        }
    }

    state.hash
}

fn hash2_term<'a>(mut term: &'a Term, state: &mut Hash2, stack: &mut Vec<Hash2Op<'a>>) {
    loop {
        match term {
            Term::Small(_) | Term::Big(_) | Term::Float(_) => {
                if let Some(key) = number_key(term) {
                    state.number(&key);
                }
                return;
            }
            Term::Atom(atom) => {
                state.atom(atom);
                return;
            }
            Term::Nil => {
                if state.hash == 0 {
                    state.hash = NIL_FIRST_HASH;
                } else {
                    state.uint32(NIL_WORD, HCONST_2);
                }
                return;
            }
            Term::List { .. } => {
                // Runs of byte-valued elements are packed four to a word.
                let mut count = 0;
                let mut packed: u32 = 0;
                while let Term::List { head, tail } = term {
                    match head.as_byte() {
                        Some(byte) => {
                            packed = (packed << 8).wrapping_add(u32::from(byte));
                            if count == 3 {
                                state.uint32(packed, HCONST_4);
                                count = 0;
                                packed = 0;
                            } else {
                                count += 1;
                            }
                            term = &**tail;
                        }
                        None => break,
                    }
                }
                if count > 0 {
                    state.uint32(packed, HCONST_4);
                }
                if let Term::List { head, tail } = term {
                    stack.push(Hash2Op::Term(&**tail));
                    term = &**head;
                }
            }
            Term::Tuple(elements) => {
                state.uint32(elements.len() as u32, HCONST_9);
                match elements.split_first() {
                    None => return,
                    Some((first, rest)) => {
                        if !rest.is_empty() {
                            stack.push(Hash2Op::Elements(rest.iter()));
                        }
                        term = first;
                    }
                }
            }
            Term::Map(pairs) => {
                state.uint32(pairs.len() as u32, HCONST_16);
                if pairs.is_empty() {
                    return;
                }
                stack.push(Hash2Op::MapTail {
                    hash: state.hash,
                    xor_pairs: state.xor_pairs,
                });
                state.hash = 0;
                state.xor_pairs = 0;
                stack.push(Hash2Op::MapPairs(pairs.iter()));
                return;
            }
            Term::Fun {
                module,
                function,
                arity,
                env,
            } => {
                state.uint32_2(env.len() as u32, module.hash_value(), HCONST);
                state.uint32_2(function.hash_value(), *arity, HCONST_14);
                match env.split_first() {
                    None => return,
                    Some((first, rest)) => {
                        if !rest.is_empty() {
                            stack.push(Hash2Op::Elements(rest.iter()));
                        }
                        term = first;
                    }
                }
            }
            Term::Pid { id, serial, .. } => {
                state.uint32_2(*id, *serial, HCONST_5);
                return;
            }
            Term::Port { id, .. } => {
                state.uint32_2(*id as u32, (*id >> 32) as u32, HCONST_6);
                return;
            }
            Term::Ref { ids, .. } => {
                if ids.is_empty() {
                    state.uint32(0, HCONST_7);
                }
                for pair in ids.chunks(2) {
                    state.uint32_2(pair[0], pair.get(1).copied().unwrap_or(0), HCONST_7);
                }
                return;
            }
            Term::Binary {
                data,
                bit_offset,
                bit_size,
            } => {
                let constant = HCONST_13.wrapping_add(state.hash);
                if *bit_size == 0 {
                    state.hash = constant;
                    return;
                }
                let aligned = aligned_bits(data, *bit_offset, *bit_size);
                state.hash = block_hash(&aligned.bytes, constant);
                if aligned.tail_bits > 0 {
                    let tail = u32::from(aligned.tail >> (8 - aligned.tail_bits));
                    state.uint32_2(aligned.tail_bits, tail, HCONST_15);
                }
                return;
            }
        }
    }
}

enum LegacyOp<'a> {
    Term(&'a Term),
    Elements(slice::Iter<'a, Term>),
    MapPairs(slice::Iter<'a, (Term, Term)>),
    /// `hash = hash * factor + addend`, applied once the terms pushed above it are done
    Step { factor: u32, addend: u32 },
    MapPair,
    MapTail { hash: u32, xor_pairs: u32 },
}

/// Running state of `make_broken_hash`
struct LegacyHash {
    hash: u32,
    xor_pairs: u32,
}

impl LegacyHash {
    #[inline]
    fn step(&mut self, factor: u32, addend: u32) {
        self.hash = self.hash.wrapping_mul(factor).wrapping_add(addend);
    }

    fn digits32(&mut self, digits: impl IntoIterator<Item = u32>, negative: bool) {
        let mut count = 0;
        for digit in digits {
            self.step(FUNNY_NUMBER2, digit);
            count += 1;
        }
        let sign = if negative { FUNNY_NUMBER3 } else { FUNNY_NUMBER2 };
        self.step(sign, count);
    }

    fn number(&mut self, key: &NumberKey<'_>) {
        match key {
            NumberKey::Int(value) if fits_in_bits_i64(*value, 28) => {
                self.step(FUNNY_NUMBER2, (*value as u32) & 0x0fff_ffff);
            }
            NumberKey::Int(value) => {
                let magnitude = value.unsigned_abs();
                let high = (magnitude >> 32) as u32;
                let digits = [magnitude as u32, high];
                let len = if high == 0 { 1 } else { 2 };
                self.digits32(digits.into_iter().take(len), *value < 0);
            }
            NumberKey::Big(value) => {
                self.digits32(value.magnitude_digits32(), value.is_negative())
            }
            NumberKey::OwnedBig(value) => {
                self.digits32(value.magnitude_digits32(), value.is_negative())
            }
            NumberKey::Float(value) => {
                let bits = value.to_bits();
                self.step(FUNNY_NUMBER6, (bits >> 32) as u32 ^ bits as u32);
            }
        }
    }
}

/// The legacy term hash.
///
/// Every term folds into the running hash as `hash * FUNNY_NUMBER + x`. The
/// mixing is weak, but the values are frozen: code that persisted them must
/// keep finding them.
pub fn make_broken_hash(term: &Term) -> u32 {
    legacy_on(term, &mut Vec::new())
}

fn legacy_on<'a>(term: &'a Term, stack: &mut Vec<LegacyOp<'a>>) -> u32 {
    let mut state = LegacyHash {
        hash: 0,
        xor_pairs: 0,
    };
    stack.push(LegacyOp::Term(term));

    while let Some(op) = stack.pop() {
        match op {
            LegacyOp::Step { factor, addend } => state.step(factor, addend),
            LegacyOp::MapPair => {
                state.xor_pairs ^= state.hash;
                state.hash = 0;
            }
            LegacyOp::MapTail { hash, xor_pairs } => {
                let pairs = state.xor_pairs;
                state.hash = hash;
                state.xor_pairs = xor_pairs;
                state.step(FUNNY_NUMBER11, pairs);
            }
            LegacyOp::Elements(mut elements) => {
                if let Some(element) = elements.next() {
                    if elements.len() > 0 {
                        stack.push(LegacyOp::Elements(elements));
                    }
                    legacy_term(element, &mut state, stack);
                }
            }
            LegacyOp::MapPairs(mut pairs) => {
                if let Some((key, value)) = pairs.next() {
                    if pairs.len() > 0 {
                        stack.push(LegacyOp::MapPairs(pairs));
                    }
                    stack.push(LegacyOp::MapPair);
                    stack.push(LegacyOp::Term(value));
                    legacy_term(key, &mut state, stack);
                }
            }
            LegacyOp::Term(term) => legacy_term(term, &mut state, stack),
        }
    }

    state.hash
}

/// Alias of [`make_broken_hash`]
pub fn legacy_hash(term: &Term) -> u32 {
    make_broken_hash(term)
}

fn legacy_term<'a>(term: &'a Term, state: &mut LegacyHash, stack: &mut Vec<LegacyOp<'a>>) {
    match term {
        Term::Small(_) | Term::Big(_) | Term::Float(_) => {
            if let Some(key) = number_key(term) {
                state.number(&key);
            }
        }
        Term::Atom(atom) => state.step(FUNNY_NUMBER1, atom.hash_value()),
        Term::Nil => state.step(FUNNY_NUMBER3, 1),
        Term::List { head, tail } => {
            // The end of the list, proper or not, is marked once.
            if !tail.is_list() {
                stack.push(LegacyOp::Step {
                    factor: FUNNY_NUMBER8,
                    addend: 0,
                });
            }
            stack.push(LegacyOp::Term(&**tail));
            stack.push(LegacyOp::Term(&**head));
        }
        Term::Tuple(elements) => {
            stack.push(LegacyOp::Step {
                factor: FUNNY_NUMBER9,
                addend: elements.len() as u32,
            });
            if !elements.is_empty() {
                stack.push(LegacyOp::Elements(elements.iter()));
            }
        }
        Term::Map(pairs) => {
            stack.push(LegacyOp::Step {
                factor: FUNNY_NUMBER7,
                addend: pairs.len() as u32,
            });
            if pairs.is_empty() {
                return;
            }
            stack.push(LegacyOp::MapTail {
                hash: state.hash,
                xor_pairs: state.xor_pairs,
            });
            state.hash = 0;
            state.xor_pairs = 0;
            stack.push(LegacyOp::MapPairs(pairs.iter()));
        }
        Term::Fun {
            module,
            function,
            arity,
            env,
        } => {
            state.step(FUNNY_NUMBER10, env.len() as u32);
            state.step(FUNNY_NUMBER1, module.hash_value());
            state.step(FUNNY_NUMBER1, function.hash_value());
            state.step(FUNNY_NUMBER2, *arity);
            if !env.is_empty() {
                stack.push(LegacyOp::Elements(env.iter()));
            }
        }
        Term::Pid { id, .. } => state.step(FUNNY_NUMBER5, *id),
        Term::Port { id, .. } => state.step(FUNNY_NUMBER9, *id as u32),
        Term::Ref { ids, .. } => state.step(FUNNY_NUMBER9, ids.first().copied().unwrap_or(0)),
        Term::Binary {
            data,
            bit_offset,
            bit_size,
        } => {
            let aligned = aligned_bits(data, *bit_offset, *bit_size);
            for &byte in aligned.bytes.iter().take(LEGACY_BINARY_PREFIX) {
                state.step(FUNNY_NUMBER1, u32::from(byte));
            }
            state.step(FUNNY_NUMBER4, aligned.bytes.len() as u32);
            if aligned.tail_bits > 0 {
                let tail = u32::from(aligned.tail >> (8 - aligned.tail_bits));
                state.step(FUNNY_NUMBER12, (aligned.tail_bits << 8) | tail);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(name: &str) -> Term {
        Term::Atom(Atom::new(name))
    }

    #[test]
    fn test_block_hash_deterministic() {
        let data = b"the quick brown fox jumps over the lazy dog";
        assert_eq!(block_hash(data, 0), block_hash(data, 0));
        assert_ne!(block_hash(data, 0), block_hash(data, 1));
        assert_ne!(block_hash(b"", 0), block_hash(b"\0", 0));
        // every tail length takes its own path
        let hashes: Vec<u32> = (0..=24).map(|n| block_hash(&data[..n], 7)).collect();
        for (i, a) in hashes.iter().enumerate() {
            for b in &hashes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_make_hash2_numbers_by_value() {
        for value in [0i64, 1, -1, 300, -300, 1 << 27, -(1 << 27), 1 << 40, i64::MAX, i64::MIN] {
            let small = make_hash2(&Term::integer(value));
            let big = make_hash2(&Term::Big(BigNumber::from_i64(value)));
            assert_eq!(small, big, "value {value}");
            let as_float = value as f64;
            if as_float as i64 == value && as_float.fract() == 0.0 && value != i64::MAX {
                assert_eq!(small, make_hash2(&Term::Float(as_float)), "value {value}");
            }
        }
        assert_eq!(make_hash2(&Term::Float(-0.0)), make_hash2(&Term::Float(0.0)));
        assert_eq!(make_hash2(&Term::Float(-0.0)), make_hash2(&Term::Small(0)));
        assert_ne!(make_hash2(&Term::Float(0.5)), make_hash2(&Term::Small(0)));
    }

    #[test]
    fn test_make_hash2_huge_integral_float() {
        let big = BigNumber::from_i64(1).lshift(100);
        assert_eq!(
            make_hash2(&Term::Big(big)),
            make_hash2(&Term::Float(2f64.powi(100)))
        );
    }

    #[test]
    fn test_make_hash2_seed() {
        let term = Term::tuple(vec![atom("a"), Term::Small(1)]);
        assert_eq!(make_hash2(&term), make_hash2_init(&term, 0));
        assert_ne!(make_hash2_init(&term, 1), make_hash2_init(&term, 2));
    }

    #[test]
    fn test_make_hash2_first_item_rules() {
        assert_eq!(make_hash2(&Term::Nil), NIL_FIRST_HASH);
        assert_eq!(make_hash2(&atom("ok")), Atom::new("ok").hash_value());
        assert_ne!(make_hash2(&Term::Nil), make_hash2(&Term::Tuple(vec![])));
    }

    #[test]
    fn test_make_hash2_distinguishes_shapes() {
        let list = Term::list_from_vec(vec![Term::Small(1), Term::Small(2)], Term::Nil);
        let tuple = Term::tuple(vec![Term::Small(1), Term::Small(2)]);
        let improper = Term::cons(Term::Small(1), Term::Small(2));
        assert_ne!(make_hash2(&list), make_hash2(&tuple));
        assert_ne!(make_hash2(&list), make_hash2(&improper));
        assert_ne!(make_hash2(&atom("a")), make_hash2(&atom("b")));
    }

    #[test]
    fn test_make_hash2_string_packing_by_value() {
        let ints = Term::list_from_vec((1..=9).map(Term::Small).collect(), Term::Nil);
        let mixed = Term::list_from_vec(
            (1..=9)
                .map(|i| if i % 2 == 0 { Term::Float(i as f64) } else { Term::Small(i) })
                .collect(),
            Term::Nil,
        );
        assert_eq!(make_hash2(&ints), make_hash2(&mixed));
    }

    #[test]
    fn test_make_hash2_map_order_independent() {
        let a = Term::Map(vec![(atom("x"), Term::Small(1)), (atom("y"), Term::Small(2))]);
        let b = Term::Map(vec![(atom("y"), Term::Small(2)), (atom("x"), Term::Small(1))]);
        let c = Term::Map(vec![(atom("x"), Term::Small(2)), (atom("y"), Term::Small(1))]);
        assert_eq!(make_hash2(&a), make_hash2(&b));
        assert_ne!(make_hash2(&a), make_hash2(&c));
        assert_eq!(make_broken_hash(&a), make_broken_hash(&b));
        assert_ne!(make_hash2(&Term::Map(vec![])), make_hash2(&Term::Tuple(vec![])));
    }

    #[test]
    fn test_make_hash2_bitstrings() {
        let whole = Term::binary(vec![0xAB, 0xC0]);
        let shifted = Term::Binary {
            data: vec![0x0A, 0xBC, 0x00],
            bit_offset: 4,
            bit_size: 16,
        };
        assert_eq!(make_hash2(&whole), make_hash2(&shifted));

        let twelve = Term::bitstring(vec![0xAB, 0xC0], 12);
        assert_ne!(make_hash2(&whole), make_hash2(&twelve));
        assert_ne!(make_hash2(&Term::binary(vec![])), make_hash2(&Term::Nil));
    }

    #[test]
    fn test_make_hash2_deep_list() {
        let mut list = Term::Nil;
        for _ in 0..200_000 {
            list = Term::cons(atom("x"), list);
        }
        assert_eq!(make_hash2(&list), make_hash2(&list));
        assert_eq!(make_broken_hash(&list), make_broken_hash(&list));
    }

    /// 100 levels, each a tuple of the level below plus 10,000 zeros
    fn wide_inside_deep() -> Term {
        let mut term = Term::Nil;
        for _ in 0..100 {
            let mut elements = vec![term];
            elements.extend((0..10_000).map(|_| Term::Small(0)));
            term = Term::Tuple(elements);
        }
        term
    }

    #[test]
    fn test_wide_tuples_keep_the_stack_shallow() {
        let term = wide_inside_deep();

        let mut stack = Vec::new();
        let hash = hash2_on(&term, 0, &mut stack);
        assert_eq!(hash, make_hash2(&term));
        assert!(stack.capacity() <= 1024, "capacity {}", stack.capacity());

        let mut stack = Vec::new();
        let hash = legacy_on(&term, &mut stack);
        assert_eq!(hash, make_broken_hash(&term));
        assert!(stack.capacity() <= 1024, "capacity {}", stack.capacity());
    }

    #[test]
    fn test_wide_maps_keep_the_stack_shallow() {
        let mut term = Term::Nil;
        for _ in 0..50 {
            let mut pairs = vec![(Term::Small(-1), term)];
            pairs.extend((0..5_000).map(|key| (Term::Small(key), Term::Small(key))));
            term = Term::Map(pairs);
        }
        let mut stack = Vec::new();
        hash2_on(&term, 0, &mut stack);
        assert!(stack.capacity() <= 1024, "capacity {}", stack.capacity());
        let mut stack = Vec::new();
        legacy_on(&term, &mut stack);
        assert!(stack.capacity() <= 1024, "capacity {}", stack.capacity());
    }

    #[test]
    fn test_tuple_element_order_matters() {
        let ab = Term::tuple(vec![atom("a"), atom("b"), atom("c")]);
        let ba = Term::tuple(vec![atom("b"), atom("a"), atom("c")]);
        assert_ne!(make_hash2(&ab), make_hash2(&ba));
        assert_ne!(make_broken_hash(&ab), make_broken_hash(&ba));
    }

    #[test]
    fn test_broken_hash_values() {
        assert_eq!(make_broken_hash(&Term::Nil), 1);
        assert_eq!(make_broken_hash(&Term::Small(5)), 5);
        assert_eq!(make_broken_hash(&atom("a")), 0x61);
        assert_eq!(make_broken_hash(&Term::tuple(vec![])), 0);
        // [] with one element: element, then nil, then the end marker
        let one = Term::list_from_vec(vec![Term::Small(2)], Term::Nil);
        let expected = 2u32
            .wrapping_mul(FUNNY_NUMBER3)
            .wrapping_add(1)
            .wrapping_mul(FUNNY_NUMBER8);
        assert_eq!(make_broken_hash(&one), expected);
        assert_eq!(legacy_hash(&one), expected);
    }

    #[test]
    fn test_broken_hash_numbers_by_value() {
        for value in [7i64, -7, 1 << 30, -(1 << 40), i64::MIN] {
            assert_eq!(
                make_broken_hash(&Term::integer(value)),
                make_broken_hash(&Term::Big(BigNumber::from_i64(value)))
            );
            assert_eq!(
                make_broken_hash(&Term::integer(value)),
                make_broken_hash(&Term::Float(value as f64))
            );
        }
        assert_ne!(
            make_broken_hash(&Term::integer(1 << 30)),
            make_broken_hash(&Term::integer(-(1 << 30)))
        );
    }

    #[test]
    fn test_broken_hash_binary_prefix() {
        let mut long_a = vec![1u8; 20];
        let mut long_b = vec![1u8; 20];
        long_a[18] = 2;
        long_b[18] = 3;
        // only the first 15 bytes and the size are looked at
        assert_eq!(
            make_broken_hash(&Term::binary(long_a)),
            make_broken_hash(&Term::binary(long_b))
        );
        assert_ne!(
            make_broken_hash(&Term::binary(vec![1; 3])),
            make_broken_hash(&Term::binary(vec![1; 4]))
        );
    }
}
