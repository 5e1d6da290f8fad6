//! Atom Table Management Module
//!
//! Interns atom names so that each distinct name has exactly one shared
//! allocation and one stable index.
//!
//! ## Overview
//!
//! Names are validated against their declared encoding and stored as UTF-8.
//! Latin-1 input is converted on the way in, so `put(b"\xE4", Latin1)` and
//! `put("ä".as_bytes(), Utf8)` return the same atom. The table is safe to
//! share between threads; lookups take a read lock and only the creation of
//! a new atom takes the write lock.
//!
//! ## Limits
//!
//! - Maximum characters per atom: 255 (`MAX_ATOM_CHARACTERS`)
//! - Maximum bytes per atom: 1024 (`MAX_ATOM_SZ_LIMIT`)
//! - Maximum atoms in table: configurable via `AtomTable::new(limit)`
//!
//! ## Examples
//!
//! ```rust
//! use entities_data_handling::{AtomEncoding, AtomTable};
//!
//! let table = AtomTable::new(1000);
//! let atom = table.put(b"my_atom", AtomEncoding::SevenBitAscii, false).unwrap();
//!
//! let index = table.get(b"my_atom", AtomEncoding::SevenBitAscii).unwrap();
//! assert_eq!(table.get_name(index), Some(atom));
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

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::term::Atom;

/// Atom encoding types
///
/// Names are always stored as UTF-8; the encoding decides how the input
/// bytes are validated and converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomEncoding {
    /// 7-bit ASCII encoding (bytes 0x00-0x7F only)
    SevenBitAscii,
    /// Latin1 encoding (ISO-8859-1, converted to UTF-8)
    Latin1,
    /// UTF-8 encoding
    Utf8,
}

/// Maximum number of characters in an atom
pub const MAX_ATOM_CHARACTERS: usize = 255;

/// Maximum atom size limit in bytes
pub const MAX_ATOM_SZ_LIMIT: usize = 1024;

/// Atom table errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AtomError {
    #[error("atom name exceeds {MAX_ATOM_CHARACTERS} characters")]
    TooLong,
    #[error("atom name is not valid in the given encoding")]
    InvalidEncoding,
    #[error("atom table is full")]
    TableFull,
}

#[derive(Default)]
struct AtomTableInner {
    by_name: HashMap<Arc<[u8]>, usize>,
    names: Vec<Arc<[u8]>>,
}

/// Atom table for managing all atoms in the system
pub struct AtomTable {
    inner: RwLock<AtomTableInner>,
    limit: usize,
}

impl AtomTable {
    /// Create a new atom table holding at most `limit` atoms
    pub fn new(limit: usize) -> Self {
        Self {
            inner: RwLock::new(AtomTableInner::default()),
            limit,
        }
    }

    /// Get or create an atom by name.
    ///
    /// When `truncate` is set, names longer than the limits are cut at a
    /// character boundary instead of being rejected.
    ///
    /// # Errors
    ///
    /// * `AtomError::TooLong` - the name is too long and truncation is disabled
    /// * `AtomError::InvalidEncoding` - the bytes are not valid in `encoding`
    /// * `AtomError::TableFull` - the table already holds `limit` atoms
    pub fn put(
        &self,
        name: &[u8],
        encoding: AtomEncoding,
        truncate: bool,
    ) -> Result<Atom, AtomError> {
        self.put_index(name, encoding, truncate)
            .map(|(_, atom)| atom)
    }

    /// Like [`put`](Self::put), also returning the atom's table index
    pub fn put_index(
        &self,
        name: &[u8],
        encoding: AtomEncoding,
        truncate: bool,
    ) -> Result<(usize, Atom), AtomError> {
        let validated = validate_atom_name(name, encoding, truncate)?;

        {
            let inner = self.inner.read();
            if let Some(&index) = inner.by_name.get(validated.as_slice()) {
                return Ok((index, Atom::from_shared(inner.names[index].clone())));
            }
        }

        let mut inner = self.inner.write();
        // Another thread may have created it between the two locks.
        if let Some(&index) = inner.by_name.get(validated.as_slice()) {
            return Ok((index, Atom::from_shared(inner.names[index].clone())));
        }
        if inner.names.len() >= self.limit {
            tracing::warn!(limit = self.limit, "atom table full");
            return Err(AtomError::TableFull);
        }

        let index = inner.names.len();
        let shared: Arc<[u8]> = Arc::from(validated);
        inner.by_name.insert(shared.clone(), index);
        inner.names.push(shared.clone());
        tracing::trace!(index, name = %String::from_utf8_lossy(&shared), "new atom");

        Ok((index, Atom::from_shared(shared)))
    }

    /// Index of an existing atom, `None` if it was never created
    pub fn get(&self, name: &[u8], encoding: AtomEncoding) -> Option<usize> {
        let validated = validate_atom_name(name, encoding, false).ok()?;
        self.inner.read().by_name.get(validated.as_slice()).copied()
    }

    /// The atom stored at `index`
    pub fn get_name(&self, index: usize) -> Option<Atom> {
        self.inner
            .read()
            .names
            .get(index)
            .map(|name| Atom::from_shared(name.clone()))
    }

    /// Number of atoms in the table
    pub fn size(&self) -> usize {
        self.inner.read().names.len()
    }

    /// Maximum number of atoms
    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl std::fmt::Debug for AtomTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomTable")
            .field("size", &self.size())
            .field("limit", &self.limit)
            .finish()
    }
}

fn validate_atom_name(
    name: &[u8],
    encoding: AtomEncoding,
    truncate: bool,
) -> Result<Vec<u8>, AtomError> {
    let utf8 = match encoding {
        AtomEncoding::SevenBitAscii => {
            if !name.is_ascii() {
                return Err(AtomError::InvalidEncoding);
            }
            name.to_vec()
        }
        AtomEncoding::Latin1 => latin1_to_utf8(name),
        AtomEncoding::Utf8 => {
            std::str::from_utf8(name).map_err(|_| AtomError::InvalidEncoding)?;
            name.to_vec()
        }
    };
    limit_length(utf8, truncate)
}

/// Enforce the character and byte limits on a valid UTF-8 name
fn limit_length(mut utf8: Vec<u8>, truncate: bool) -> Result<Vec<u8>, AtomError> {
    let mut chars = 0;
    let mut end = 0;
    while end < utf8.len() {
        let width = utf8_width(utf8[end]);
        if chars == MAX_ATOM_CHARACTERS || end + width > MAX_ATOM_SZ_LIMIT {
            if !truncate {
                return Err(AtomError::TooLong);
            }
            utf8.truncate(end);
            break;
        }
        chars += 1;
        end += width;
    }
    Ok(utf8)
}

fn utf8_width(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        _ => 4,
    }
}

fn latin1_to_utf8(latin1: &[u8]) -> Vec<u8> {
    let mut utf8 = Vec::with_capacity(latin1.len() * 2);
    for &byte in latin1 {
        if byte < 0x80 {
            utf8.push(byte);
        } else {
            utf8.push(0xC0 | (byte >> 6));
            utf8.push(0x80 | (byte & 0x3F));
        }
    }
    utf8
}
