//! Term Representation Module
//!
//! Provides the `Term` value representation consumed by hashing, comparison and
//! term building, together with the introspection helpers those algorithms
//! dispatch on.
//!
//! ## Overview
//!
//! A `Term` is an immutable, recursively structured value. Terms form a
//! directed acyclic structure: every compound owns its children, so no cycle
//! can be constructed. The algorithms over terms in this workspace traverse
//! them with explicit stacks and never rely on native recursion depth.
//!
//! ## Term Order
//!
//! Every term belongs to one [`OrderClass`]. Classes are totally ordered and
//! decide any comparison between terms of different classes:
//!
//! ```text
//! number < atom < reference < fun < port < pid < tuple < map < nil < list < bitstring
//! ```
//!
//! Small integers, big integers and floats share the number class and are
//! compared by mathematical value.
//!
//! ## Examples
//!
//! ```rust
//! use entities_data_handling::term::{Atom, OrderClass, Term};
//!
//! let list = Term::list_from_vec(vec![Term::Small(1), Term::Small(2)], Term::Nil);
//! assert_eq!(list.list_length(), Some(2));
//! assert_eq!(list.order_class(), OrderClass::List);
//!
//! let ok = Term::Atom(Atom::new("ok"));
//! assert!(ok.order_class() < OrderClass::Tuple);
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

use std::fmt;
use std::mem;
use std::sync::Arc;

use entities_utilities::BigNumber;

/// Number of value bits in an immediate small integer
pub const SMALL_BITS: u32 = 60;

/// Largest immediate small integer
pub const MAX_SMALL: i64 = (1i64 << (SMALL_BITS - 1)) - 1;

/// Smallest immediate small integer
pub const MIN_SMALL: i64 = -(1i64 << (SMALL_BITS - 1));

/// Whether an integer fits in an immediate small integer
#[inline]
pub fn is_small(value: i64) -> bool {
    (MIN_SMALL..=MAX_SMALL).contains(&value)
}

/// Whether an unsigned integer fits in an immediate small integer
#[inline]
pub fn is_usmall(value: u64) -> bool {
    value <= MAX_SMALL as u64
}

/// Whether `value` fits in a two's complement field of `bits` bits.
///
/// A width of 64 or more always fits; a width of zero never does.
pub fn fits_in_bits_i64(value: i64, bits: u32) -> bool {
    if bits >= 64 {
        return true;
    }
    if bits == 0 {
        return false;
    }
    let shift = 64 - bits;
    (value << shift) >> shift == value
}

/// 32-bit variant of [`fits_in_bits_i64`]
pub fn fits_in_bits_i32(value: i32, bits: u32) -> bool {
    fits_in_bits_i64(i64::from(value), bits.min(64))
}

/// An atom: an interned, immutable name.
///
/// The UTF-8 text travels with the atom, so hashing and ordering are pure
/// functions of the name. Atoms made through an [`AtomTable`](crate::atom::AtomTable)
/// share one allocation per name, which makes the identity check in
/// `PartialEq` the common case.
#[derive(Clone)]
pub struct Atom {
    name: Arc<[u8]>,
}

impl Atom {
    /// Create an atom from its text without interning it.
    pub fn new(name: &str) -> Self {
        Self::from_utf8(name.as_bytes())
    }

    /// Create an atom from UTF-8 bytes without validating or interning them.
    pub fn from_utf8(name: &[u8]) -> Self {
        Self {
            name: Arc::from(name),
        }
    }

    pub(crate) fn from_shared(name: Arc<[u8]>) -> Self {
        Self { name }
    }

    /// UTF-8 bytes of the name
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// Whether both atoms share the same interned allocation
    pub fn ptr_eq(&self, other: &Atom) -> bool {
        Arc::ptr_eq(&self.name, &other.name)
    }

    /// The atom's hash value: `hashpjw` over the name.
    ///
    /// Two-byte UTF-8 sequences encoding a Latin-1 character are folded back
    /// to that character first, so an atom hashes the same whether its name
    /// was given in Latin-1 or UTF-8.
    pub fn hash_value(&self) -> u32 {
        let bytes = &self.name;
        let mut h: u32 = 0;
        let mut i = 0;
        while i < bytes.len() {
            let mut v = bytes[i];
            i += 1;
            if i < bytes.len() && (v & 0xFE) == 0xC2 && (bytes[i] & 0xC0) == 0x80 {
                v = (v << 6) | (bytes[i] & 0x3F);
                i += 1;
            }
            h = (h << 4).wrapping_add(u32::from(v));
            let g = h & 0xf000_0000;
            if g != 0 {
                h ^= g >> 24;
                h ^= g;
            }
        }
        h
    }
}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.name == other.name
    }
}

impl Eq for Atom {}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", String::from_utf8_lossy(&self.name))
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.name))
    }
}

/// Term value representation
///
/// The derived `PartialEq` is representation-exact (`Small(1) != Float(1.0)`,
/// NaN never equal). The runtime's arithmetic equality and term order live in
/// the runtime utilities.
#[derive(Clone, Debug, PartialEq)]
pub enum Term {
    /// Immediate integer in `MIN_SMALL..=MAX_SMALL`
    Small(i64),
    /// Boxed integer; may hold any value, including small ones
    Big(BigNumber),
    /// Boxed float
    Float(f64),
    /// Atom
    Atom(Atom),
    /// Reference: id words are least significant first
    Ref {
        node: Atom,
        ids: Vec<u32>,
        creation: u32,
    },
    /// Function value with its captured environment
    Fun {
        module: Atom,
        function: Atom,
        arity: u32,
        env: Vec<Term>,
    },
    /// Port identifier
    Port {
        node: Atom,
        id: u64,
        creation: u32,
    },
    /// Process identifier
    Pid {
        node: Atom,
        id: u32,
        serial: u32,
        creation: u32,
    },
    /// Fixed-arity tuple
    Tuple(Vec<Term>),
    /// Map; the order of the pairs carries no meaning
    Map(Vec<(Term, Term)>),
    /// The empty list
    Nil,
    /// Cons cell; the tail need not be a list
    List { head: Box<Term>, tail: Box<Term> },
    /// Bitstring: `bit_size` bits of `data` starting at `bit_offset`, MSB first
    Binary {
        data: Vec<u8>,
        bit_offset: usize,
        bit_size: usize,
    },
}

/// Term order classes, in ascending order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OrderClass {
    Number,
    Atom,
    Reference,
    Fun,
    Port,
    Pid,
    Tuple,
    Map,
    Nil,
    List,
    Bitstring,
}

/// Numeric view of a term
#[derive(Clone, Copy, Debug)]
pub enum Number<'a> {
    Small(i64),
    Big(&'a BigNumber),
    Float(f64),
}

impl Term {
    /// Build a cons cell
    pub fn cons(head: Term, tail: Term) -> Term {
        Term::List {
            head: Box::new(head),
            tail: Box::new(tail),
        }
    }

    /// Build a list of `items` ending in `tail` (`Term::Nil` for a proper list)
    pub fn list_from_vec(items: Vec<Term>, tail: Term) -> Term {
        items
            .into_iter()
            .rev()
            .fold(tail, |acc, item| Term::cons(item, acc))
    }

    /// Build a tuple
    pub fn tuple(elements: Vec<Term>) -> Term {
        Term::Tuple(elements)
    }

    /// Build a byte-aligned binary
    pub fn binary(data: Vec<u8>) -> Term {
        let bit_size = data.len() * 8;
        Term::Binary {
            data,
            bit_offset: 0,
            bit_size,
        }
    }

    /// Build a bitstring of `bit_size` bits taken from the front of `data`
    pub fn bitstring(data: Vec<u8>, bit_size: usize) -> Term {
        debug_assert!(bit_size <= data.len() * 8);
        Term::Binary {
            data,
            bit_offset: 0,
            bit_size,
        }
    }

    /// Build an integer term, boxing it only when it does not fit a small
    pub fn integer(value: i64) -> Term {
        if is_small(value) {
            Term::Small(value)
        } else {
            Term::Big(BigNumber::from_i64(value))
        }
    }

    /// Term order class
    pub fn order_class(&self) -> OrderClass {
        match self {
            Term::Small(_) | Term::Big(_) | Term::Float(_) => OrderClass::Number,
            Term::Atom(_) => OrderClass::Atom,
            Term::Ref { .. } => OrderClass::Reference,
            Term::Fun { .. } => OrderClass::Fun,
            Term::Port { .. } => OrderClass::Port,
            Term::Pid { .. } => OrderClass::Pid,
            Term::Tuple(_) => OrderClass::Tuple,
            Term::Map(_) => OrderClass::Map,
            Term::Nil => OrderClass::Nil,
            Term::List { .. } => OrderClass::List,
            Term::Binary { .. } => OrderClass::Bitstring,
        }
    }

    /// Numeric view, `None` for non-numbers
    pub fn as_number(&self) -> Option<Number<'_>> {
        match self {
            Term::Small(value) => Some(Number::Small(*value)),
            Term::Big(value) => Some(Number::Big(value)),
            Term::Float(value) => Some(Number::Float(*value)),
            _ => None,
        }
    }

    /// The numeric value as a byte, if the term is a number equal to one of `0..=255`
    pub fn as_byte(&self) -> Option<u8> {
        match self {
            Term::Small(value) => u8::try_from(*value).ok(),
            Term::Big(value) => value.to_i64().and_then(|v| u8::try_from(v).ok()),
            Term::Float(value) if value.fract() == 0.0 && (0.0..=255.0).contains(value) => {
                Some(*value as u8)
            }
            _ => None,
        }
    }

    /// Whether the term is a cons cell
    pub fn is_list(&self) -> bool {
        matches!(self, Term::List { .. })
    }

    /// Length of a proper list; `None` for improper lists and non-lists
    pub fn list_length(&self) -> Option<usize> {
        let mut length = 0;
        let mut current = self;
        loop {
            match current {
                Term::Nil => return Some(length),
                Term::List { tail, .. } => {
                    length += 1;
                    current = tail;
                }
                _ => return None,
            }
        }
    }
}

impl From<Atom> for Term {
    fn from(atom: Atom) -> Self {
        Term::Atom(atom)
    }
}

impl From<BigNumber> for Term {
    fn from(value: BigNumber) -> Self {
        Term::Big(value)
    }
}

impl From<f64> for Term {
    fn from(value: f64) -> Self {
        Term::Float(value)
    }
}

/// Whether the term owns other terms
fn has_children(term: &Term) -> bool {
    match term {
        Term::List { .. } => true,
        Term::Tuple(elements) => !elements.is_empty(),
        Term::Fun { env, .. } => !env.is_empty(),
        Term::Map(pairs) => !pairs.is_empty(),
        _ => false,
    }
}

/// Move the children of `term` that own further terms into `pending`
fn detach_children(term: &mut Term, pending: &mut Vec<Term>) {
    match term {
        Term::List { head, tail } => {
            for child in [&mut **head, &mut **tail] {
                if has_children(child) {
                    pending.push(mem::replace(child, Term::Nil));
                }
            }
        }
        Term::Tuple(elements) | Term::Fun { env: elements, .. } => {
            for child in elements.iter_mut().filter(|child| has_children(child)) {
                pending.push(mem::replace(child, Term::Nil));
            }
        }
        Term::Map(pairs) => {
            for (key, value) in pairs.iter_mut() {
                for child in [key, value] {
                    if has_children(child) {
                        pending.push(mem::replace(child, Term::Nil));
                    }
                }
            }
        }
        _ => {}
    }
}

// Dropping a long list through the derived glue would recurse once per cell.
impl Drop for Term {
    fn drop(&mut self) {
        if !has_children(self) {
            return;
        }
        let mut pending = Vec::new();
        detach_children(self, &mut pending);
        while let Some(mut term) = pending.pop() {
            detach_children(&mut term, &mut pending);
        }
    }
}
