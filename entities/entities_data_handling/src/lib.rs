//! Entities Layer: Data Handling
//!
//! This crate provides the term-level data types and primitives of the Erlang/OTP
//! runtime: the `Term` value representation, atoms, bitstring helpers, term hashing,
//! and the word atomics behind the runtime's interval counter.
//!
//! ## Overview
//!
//! The `entities_data_handling` crate is part of the entities layer in the CLEAN architecture
//! implementation of Erlang/OTP. It depends only on `entities_utilities` (big numbers), and
//! everything above it (equality, ordering, term building, the interval counter) is built
//! from the pieces defined here.
//!
//! ## Modules
//!
//! - **[`term`](term/index.html)**: The `Term` enum, `Atom`, the term order classes and the
//!   introspection helpers (`as_number`, `as_byte`, `list_length`, `fits_in_bits_i64`).
//!
//! - **[`term_hashing`](term_hashing/index.html)**: `make_hash2`, `make_hash2_init`,
//!   `make_broken_hash` and the `block_hash` byte hash. Equal terms hash equal across
//!   number representations.
//!
//! - **[`atom`](atom/index.html)**: The atom table. Validates names in 7-bit ASCII, Latin1 or
//!   UTF-8 and interns them so each name has one shared allocation.
//!
//! - **[`bits`](bits/index.html)**: Bit offset arithmetic, realignment of unaligned
//!   bitstrings and bit sequence comparison.
//!
//! - **[`atomics`](atomics/index.html)**: The `WordAtomic` capability with a native 64-bit
//!   backend and a double-word compare-and-swap backend.
//!
//! ## Usage
//!
//! ```rust
//! use entities_data_handling::{make_hash2, AtomEncoding, AtomTable, Term};
//!
//! let table = AtomTable::new(1000);
//! let ok = table.put(b"ok", AtomEncoding::SevenBitAscii, false).unwrap();
//!
//! let reply = Term::tuple(vec![Term::Atom(ok), Term::Small(42)]);
//! let hash = make_hash2(&reply);
//! assert_eq!(hash, make_hash2(&reply.clone()));
//! ```
//!
//! ## See Also
//!
//! - [`entities_utilities`](../entities_utilities/index.html): Big number operations
//! - [`infrastructure_runtime_utils`](../infrastructure_runtime_utils/index.html): Equality,
//!   ordering, term building and the interval counter

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

mod loom;

pub mod atom;
pub mod atomics;
pub mod bits;
pub mod term;
pub mod term_hashing;

// Re-export main types for convenience
pub use atom::{AtomEncoding, AtomError, AtomTable};
pub use atomics::{
    native_wide_atomics, DefaultWordAtomic, DoubleWordAtomic, NativeWordAtomic, WordAtomic,
};
pub use term::{Atom, Number, OrderClass, Term};
pub use term_hashing::{block_hash, legacy_hash, make_broken_hash, make_hash2, make_hash2_init};
