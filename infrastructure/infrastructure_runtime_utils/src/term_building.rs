//! Term Building Module
//!
//! Provides the two-phase builder for constructing Erlang terms on a heap.
//! Based on erts_bld_* functions from utils.c
//!
//! Building is done in two passes over the same [`BuildSpec`]:
//!
//! 1. [`size_pass`] walks the `BuildSpec` and returns the exact number of heap words
//!    the build will consume, writing nothing.
//! 2. [`build`] walks the same `BuildSpec` again, allocating from a [`HeapCursor`] sized by
//!    the first pass, and returns the finished term.
//!
//! Both passes run through the same [`HeapBuilder`] traversal, so the words
//! counted in the first pass are exactly the words taken in the second.
//! Allocating past the end of a cursor is a fatal error.
//!
//! Word costs:
//!
//! | Shape | Words |
//! |---|---|
//! | atom, small integer, pre-built term | 0 |
//! | integer outside the small range | 2 (header + one digit) |
//! | cons cell | 2 |
//! | tuple of arity N | 1 + N |
//! | string or list of length N | 2N (plus the elements) |

use entities_data_handling::atom::{AtomEncoding, AtomError, AtomTable};
use entities_data_handling::term::{is_small, is_usmall, Term};
use entities_utilities::BigNumber;
use thiserror::Error;

/// Term building error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TermBuildingError {
    /// The atom table refused the name
    #[error("cannot build atom: {0}")]
    Atom(#[from] AtomError),
}

/// Header word of a boxed object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Header {
    /// Tuple header followed by `arity` element words
    Tuple { arity: usize },
    /// Positive bignum followed by `digits` digit words
    PosBig { digits: usize },
    /// Negative bignum followed by `digits` digit words
    NegBig { digits: usize },
}

/// One word of heap memory
#[derive(Debug, Clone, PartialEq)]
pub enum HeapWord {
    /// Reserved but not yet written
    Unused,
    /// Header of a boxed object
    Header(Header),
    /// An immediate, or a term that lives outside this heap
    Term(Term),
    /// Pointer to an object at this word offset of the heap
    Ptr(usize),
    /// Bignum digit
    Digit(u64),
}

/// Monotonic allocation cursor over a reserved heap region
///
/// The cursor hands out consecutive words and never gives any back.
pub struct HeapCursor<'h> {
    words: &'h mut [HeapWord],
    used: usize,
    base: usize,
}

impl<'h> HeapCursor<'h> {
    /// Create a cursor over `words`, addressed from offset 0
    pub fn new(words: &'h mut [HeapWord]) -> Self {
        Self {
            words,
            used: 0,
            base: 0,
        }
    }

    /// Words handed out so far
    pub fn used(&self) -> usize {
        self.used
    }

    /// Words still available
    pub fn remaining(&self) -> usize {
        self.words.len() - self.used
    }

    /// Size of the region
    pub fn capacity(&self) -> usize {
        self.words.len()
    }

    /// Heap offset of the next word to be handed out
    pub fn position(&self) -> usize {
        self.base + self.used
    }

    /// Take the next `words` words.
    ///
    /// # Panics
    ///
    /// Panics if fewer than `words` words remain. An overrun means the sizing
    /// pass and the build disagree, and the heap can no longer be trusted.
    pub fn alloc(&mut self, words: usize) -> &mut [HeapWord] {
        let remaining = self.remaining();
        if words > remaining {
            tracing::error!(requested = words, remaining, "heap arena overrun");
            panic!("heap arena overrun: requested {words} words with {remaining} remaining");
        }
        let start = self.used;
        self.used += words;
        &mut self.words[start..self.used]
    }
}

/// Growable owned heap
#[derive(Debug, Default)]
pub struct Heap {
    words: Vec<HeapWord>,
}

impl Heap {
    /// Create an empty heap
    pub fn new() -> Self {
        Self::default()
    }

    /// Extend the heap by exactly `words` unused words and return a cursor over them
    pub fn reserve(&mut self, words: usize) -> HeapCursor<'_> {
        let base = self.words.len();
        self.words.resize(base + words, HeapWord::Unused);
        HeapCursor {
            words: &mut self.words[base..],
            used: 0,
            base,
        }
    }

    /// Number of words in the heap
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the heap holds no words
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// All heap words
    pub fn words(&self) -> &[HeapWord] {
        &self.words
    }
}

/// Description of a term to build
#[derive(Debug, Clone, PartialEq)]
pub enum BuildSpec<'a> {
    /// An already built term, used as is
    Term(Term),
    /// Atom looked up or created in the atom table
    Atom(&'a str),
    /// Unsigned integer
    Uint(u64),
    /// Pointer-sized unsigned integer
    Uword(usize),
    /// Signed integer
    Sint(i64),
    /// Cons cell
    Cons(Box<BuildSpec<'a>>, Box<BuildSpec<'a>>),
    /// Tuple
    Tuple(Vec<BuildSpec<'a>>),
    /// Proper list
    List(Vec<BuildSpec<'a>>),
    /// Byte string as a list of small integers
    String(&'a [u8]),
}

impl<'a> BuildSpec<'a> {
    /// Cons cell
    pub fn cons(head: BuildSpec<'a>, tail: BuildSpec<'a>) -> Self {
        BuildSpec::Cons(Box::new(head), Box::new(tail))
    }

    /// List of `{Term, Value}` 2-tuples
    ///
    /// Based on `erts_bld_2tup_list()` from utils.c
    pub fn two_tuple_list(pairs: &[(Term, u64)]) -> Self {
        BuildSpec::List(
            pairs
                .iter()
                .map(|(term, value)| {
                    BuildSpec::Tuple(vec![BuildSpec::Term(term.clone()), BuildSpec::Uint(*value)])
                })
                .collect(),
        )
    }

    /// List of `{Atom, Value}` 2-tuples
    ///
    /// Based on `erts_bld_atom_uword_2tup_list()` from utils.c
    pub fn atom_uint_two_tuple_list(pairs: &[(&'a str, u64)]) -> Self {
        BuildSpec::List(
            pairs
                .iter()
                .map(|&(name, value)| {
                    BuildSpec::Tuple(vec![BuildSpec::Atom(name), BuildSpec::Uint(value)])
                })
                .collect(),
        )
    }

    /// List of `{Atom, Value1, Value2}` 3-tuples
    ///
    /// Based on `erts_bld_atom_2uint_3tup_list()` from utils.c
    pub fn atom_two_uint_three_tuple_list(triples: &[(&'a str, u64, u64)]) -> Self {
        BuildSpec::List(
            triples
                .iter()
                .map(|&(name, first, second)| {
                    BuildSpec::Tuple(vec![
                        BuildSpec::Atom(name),
                        BuildSpec::Uint(first),
                        BuildSpec::Uint(second),
                    ])
                })
                .collect(),
        )
    }
}

/// A built term together with the word a parent stores to refer to it
struct Built {
    term: Term,
    word: HeapWord,
}

impl Built {
    /// Placeholder for size calculation
    fn placeholder() -> Self {
        Self {
            term: Term::Nil,
            word: HeapWord::Unused,
        }
    }

    fn immediate(term: Term) -> Self {
        let word = HeapWord::Term(term.clone());
        Self { term, word }
    }
}

/// Heap pointer and size tracker
///
/// In size-calc mode the builder only counts words. In build mode it also
/// takes them from a cursor and writes them.
pub struct HeapBuilder<'b, 'h> {
    size: usize,
    target: Option<(&'b mut HeapCursor<'h>, &'b AtomTable)>,
}

impl<'b, 'h> HeapBuilder<'b, 'h> {
    /// Create a new heap builder for size calculation only
    pub fn new_size_calc() -> Self {
        Self {
            size: 0,
            target: None,
        }
    }

    /// Create a new heap builder that allocates from `cursor`
    pub fn new_build(cursor: &'b mut HeapCursor<'h>, atoms: &'b AtomTable) -> Self {
        Self {
            size: 0,
            target: Some((cursor, atoms)),
        }
    }

    /// Words counted so far
    pub fn size(&self) -> usize {
        self.size
    }

    /// Count `words`, and in build mode take them from the cursor
    fn alloc(&mut self, words: usize) -> Option<(usize, &mut [HeapWord])> {
        self.size += words;
        let (cursor, _) = self.target.as_mut()?;
        let offset = cursor.position();
        Some((offset, cursor.alloc(words)))
    }

    fn atoms(&self) -> Option<&'b AtomTable> {
        self.target.as_ref().map(|(_, atoms)| *atoms)
    }

    fn bld(&mut self, spec: &BuildSpec<'_>) -> Result<Built, TermBuildingError> {
        match spec {
            BuildSpec::Term(term) => Ok(Built::immediate(term.clone())),
            BuildSpec::Atom(name) => self.bld_atom(name),
            BuildSpec::Uint(value) => Ok(self.bld_uint(*value)),
            BuildSpec::Uword(value) => Ok(self.bld_uint(*value as u64)),
            BuildSpec::Sint(value) => Ok(self.bld_sint(*value)),
            BuildSpec::Cons(head, tail) => {
                let head = self.bld(head)?;
                let tail = self.bld(tail)?;
                Ok(self.bld_cons(head, tail))
            }
            BuildSpec::Tuple(elements) => {
                let elements = elements
                    .iter()
                    .map(|element| self.bld(element))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(self.bld_tuple(elements))
            }
            BuildSpec::List(elements) => {
                let elements = elements
                    .iter()
                    .map(|element| self.bld(element))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(self.bld_list(elements))
            }
            BuildSpec::String(bytes) => {
                let elements = bytes
                    .iter()
                    .map(|&byte| Built::immediate(Term::Small(i64::from(byte))))
                    .collect();
                Ok(self.bld_list(elements))
            }
        }
    }

    fn bld_atom(&mut self, name: &str) -> Result<Built, TermBuildingError> {
        let Some(atoms) = self.atoms() else {
            return Ok(Built::placeholder());
        };
        let atom = atoms.put(name.as_bytes(), AtomEncoding::Utf8, false)?;
        Ok(Built::immediate(Term::Atom(atom)))
    }

    fn bld_uint(&mut self, value: u64) -> Built {
        if is_usmall(value) {
            return Built::immediate(Term::Small(value as i64));
        }
        let Some((offset, words)) = self.alloc(2) else {
            return Built::placeholder();
        };
        words[0] = HeapWord::Header(Header::PosBig { digits: 1 });
        words[1] = HeapWord::Digit(value);
        Built {
            term: Term::Big(BigNumber::from_u64(value)),
            word: HeapWord::Ptr(offset),
        }
    }

    fn bld_sint(&mut self, value: i64) -> Built {
        if is_small(value) {
            return Built::immediate(Term::Small(value));
        }
        let Some((offset, words)) = self.alloc(2) else {
            return Built::placeholder();
        };
        words[0] = HeapWord::Header(if value < 0 {
            Header::NegBig { digits: 1 }
        } else {
            Header::PosBig { digits: 1 }
        });
        words[1] = HeapWord::Digit(value.unsigned_abs());
        Built {
            term: Term::Big(BigNumber::from_i64(value)),
            word: HeapWord::Ptr(offset),
        }
    }

    fn bld_cons(&mut self, head: Built, tail: Built) -> Built {
        let Some((offset, words)) = self.alloc(2) else {
            return Built::placeholder();
        };
        words[0] = head.word;
        words[1] = tail.word;
        Built {
            term: Term::cons(head.term, tail.term),
            word: HeapWord::Ptr(offset),
        }
    }

    fn bld_tuple(&mut self, elements: Vec<Built>) -> Built {
        let arity = elements.len();
        let Some((offset, words)) = self.alloc(1 + arity) else {
            return Built::placeholder();
        };
        words[0] = HeapWord::Header(Header::Tuple { arity });
        let mut terms = Vec::with_capacity(arity);
        for (slot, element) in words[1..].iter_mut().zip(elements) {
            *slot = element.word;
            terms.push(element.term);
        }
        Built {
            term: Term::Tuple(terms),
            word: HeapWord::Ptr(offset),
        }
    }

    /// Cells are laid out front to back, each tail pointing at the next cell
    fn bld_list(&mut self, elements: Vec<Built>) -> Built {
        let length = elements.len();
        let Some((offset, words)) = self.alloc(2 * length) else {
            return Built::placeholder();
        };
        if length == 0 {
            return Built::immediate(Term::Nil);
        }
        let mut terms = Vec::with_capacity(length);
        for (index, (cell, element)) in words.chunks_exact_mut(2).zip(elements).enumerate() {
            cell[0] = element.word;
            cell[1] = if index + 1 < length {
                HeapWord::Ptr(offset + 2 * (index + 1))
            } else {
                HeapWord::Term(Term::Nil)
            };
            terms.push(element.term);
        }
        Built {
            term: Term::list_from_vec(terms, Term::Nil),
            word: HeapWord::Ptr(offset),
        }
    }
}

/// Count the heap words [`build`] will consume for `spec`
pub fn size_pass(spec: &BuildSpec<'_>) -> usize {
    let mut builder = HeapBuilder::new_size_calc();
    let sized = builder.bld(spec);
    debug_assert!(sized.is_ok(), "sizing never consults the atom table");
    tracing::trace!(words = builder.size(), "sized term");
    builder.size()
}

/// Build `spec` on the heap behind `cursor`
///
/// `cursor` must have at least [`size_pass`] words remaining. Atoms are
/// looked up in, or added to, `atoms`.
///
/// # Errors
///
/// Returns [`TermBuildingError::Atom`] when `atoms` rejects an atom name. The
/// words allocated before the failing atom stay consumed from `cursor` and
/// hold a partly built term; discard the region they belong to.
pub fn build(
    cursor: &mut HeapCursor<'_>,
    atoms: &AtomTable,
    spec: &BuildSpec<'_>,
) -> Result<Term, TermBuildingError> {
    let start = cursor.used();
    let mut builder = HeapBuilder::new_build(cursor, atoms);
    let built = builder.bld(spec)?;
    let words = builder.size();
    debug_assert_eq!(cursor.used() - start, words);
    tracing::trace!(words, "built term");
    Ok(built.term)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENTINEL: HeapWord = HeapWord::Digit(0xdead_beef_dead_beef);

    /// Build into a sentinel-filled region with spare room and check that
    /// exactly the sized words were written
    fn build_checked(spec: &BuildSpec<'_>) -> (Vec<HeapWord>, Term) {
        let size = size_pass(spec);
        let atoms = AtomTable::new(64);
        let mut words = vec![SENTINEL; size + 8];
        let mut cursor = HeapCursor::new(&mut words);
        let term = build(&mut cursor, &atoms, spec).unwrap();
        assert_eq!(cursor.used(), size);
        assert!(words[..size].iter().all(|word| *word != SENTINEL));
        assert!(words[size..].iter().all(|word| *word == SENTINEL));
        words.truncate(size);
        (words, term)
    }

    #[test]
    fn test_small_integers_take_no_words() {
        assert_eq!(size_pass(&BuildSpec::Uint(42)), 0);
        assert_eq!(size_pass(&BuildSpec::Sint(-42)), 0);
        assert_eq!(size_pass(&BuildSpec::Uword(7)), 0);
        let (words, term) = build_checked(&BuildSpec::Uint(42));
        assert!(words.is_empty());
        assert_eq!(term, Term::Small(42));
    }

    #[test]
    fn test_boxed_integers() {
        let (words, term) = build_checked(&BuildSpec::Uint(u64::MAX));
        assert_eq!(
            words,
            vec![HeapWord::Header(Header::PosBig { digits: 1 }), HeapWord::Digit(u64::MAX)]
        );
        assert_eq!(term, Term::Big(BigNumber::from_u64(u64::MAX)));

        let (words, term) = build_checked(&BuildSpec::Sint(i64::MIN));
        assert_eq!(
            words,
            vec![HeapWord::Header(Header::NegBig { digits: 1 }), HeapWord::Digit(1 << 63)]
        );
        assert_eq!(term, Term::Big(BigNumber::from_i64(i64::MIN)));
    }

    #[test]
    fn test_tuple_of_three_smalls() {
        let spec =
            BuildSpec::Tuple(vec![BuildSpec::Uint(1), BuildSpec::Uint(2), BuildSpec::Sint(-3)]);
        assert_eq!(size_pass(&spec), 4);
        let (words, term) = build_checked(&spec);
        assert_eq!(words[0], HeapWord::Header(Header::Tuple { arity: 3 }));
        assert_eq!(words[3], HeapWord::Term(Term::Small(-3)));
        assert_eq!(term, Term::tuple(vec![Term::Small(1), Term::Small(2), Term::Small(-3)]));
    }

    #[test]
    fn test_empty_tuple_takes_a_header() {
        let (words, term) = build_checked(&BuildSpec::Tuple(Vec::new()));
        assert_eq!(words, vec![HeapWord::Header(Header::Tuple { arity: 0 })]);
        assert_eq!(term, Term::Tuple(Vec::new()));
    }

    #[test]
    fn test_tuple_points_at_boxed_element() {
        let spec = BuildSpec::Tuple(vec![BuildSpec::Uint(u64::MAX)]);
        let (words, _) = build_checked(&spec);
        // The big is built first, then the tuple that refers to it.
        assert_eq!(words.len(), 4);
        assert_eq!(words[2], HeapWord::Header(Header::Tuple { arity: 1 }));
        assert_eq!(words[3], HeapWord::Ptr(0));
    }

    #[test]
    fn test_string() {
        let (words, term) = build_checked(&BuildSpec::String(b"ok"));
        assert_eq!(
            words,
            vec![
                HeapWord::Term(Term::Small(i64::from(b'o'))),
                HeapWord::Ptr(2),
                HeapWord::Term(Term::Small(i64::from(b'k'))),
                HeapWord::Term(Term::Nil),
            ]
        );
        assert_eq!(
            term,
            Term::list_from_vec(vec![Term::Small(111), Term::Small(107)], Term::Nil)
        );
        let (words, term) = build_checked(&BuildSpec::String(b""));
        assert!(words.is_empty());
        assert_eq!(term, Term::Nil);
    }

    #[test]
    fn test_cons_and_prebuilt_terms() {
        let prebuilt = Term::tuple(vec![Term::Small(9)]);
        let spec = BuildSpec::cons(BuildSpec::Term(prebuilt.clone()), BuildSpec::Term(Term::Nil));
        assert_eq!(size_pass(&spec), 2);
        let (_, term) = build_checked(&spec);
        assert_eq!(term, Term::cons(prebuilt, Term::Nil));
    }

    #[test]
    fn test_atoms_are_interned() {
        let atoms = AtomTable::new(8);
        let spec = BuildSpec::Tuple(vec![BuildSpec::Atom("ok"), BuildSpec::Atom("ok")]);
        let mut heap = Heap::new();
        let size = size_pass(&spec);
        let mut cursor = heap.reserve(size);
        build(&mut cursor, &atoms, &spec).unwrap();
        assert_eq!(atoms.size(), 1);
        assert_eq!(heap.len(), 3);
    }

    #[test]
    fn test_atom_errors_propagate() {
        let atoms = AtomTable::new(8);
        let long = "a".repeat(300);
        let spec = BuildSpec::List(vec![BuildSpec::Atom(&long)]);
        let mut words = vec![HeapWord::Unused; size_pass(&spec)];
        let mut cursor = HeapCursor::new(&mut words);
        assert_eq!(
            build(&mut cursor, &atoms, &spec),
            Err(TermBuildingError::Atom(AtomError::TooLong))
        );
    }

    #[test]
    fn test_failed_build_leaves_cursor_consumed() {
        let atoms = AtomTable::new(8);
        let long = "a".repeat(300);
        let spec = BuildSpec::Tuple(vec![BuildSpec::Sint(i64::MIN), BuildSpec::Atom(&long)]);
        let size = size_pass(&spec);
        let mut words = vec![HeapWord::Unused; size];
        let mut cursor = HeapCursor::new(&mut words);
        assert!(build(&mut cursor, &atoms, &spec).is_err());
        // The bignum was written before the atom failed; the tuple never was.
        let used = cursor.used();
        assert!(used > 0 && used < size, "used {used} of {size}");
        assert!(matches!(words[0], HeapWord::Header(_)));
        assert!(words[used..].iter().all(|word| *word == HeapWord::Unused));
        assert_eq!(atoms.size(), 0);
    }

    #[test]
    fn test_composite_lists() {
        let spec = BuildSpec::two_tuple_list(&[(Term::Small(1), 10), (Term::Nil, u64::MAX)]);
        // Two cells, two 2-tuples and one boxed integer.
        assert_eq!(size_pass(&spec), 4 + 6 + 2);
        let (_, term) = build_checked(&spec);
        assert_eq!(term.list_length(), Some(2));

        let spec = BuildSpec::atom_uint_two_tuple_list(&[("a", 1), ("b", 2), ("c", 3)]);
        assert_eq!(size_pass(&spec), 6 + 9);
        build_checked(&spec);

        let spec = BuildSpec::atom_two_uint_three_tuple_list(&[("gc", 1, u64::MAX)]);
        assert_eq!(size_pass(&spec), 2 + 4 + 2);
        let (_, term) = build_checked(&spec);
        let Term::List { head, .. } = &term else {
            panic!("expected a list");
        };
        assert_eq!(
            **head,
            Term::tuple(vec![
                Term::Atom(entities_data_handling::Atom::new("gc")),
                Term::Small(1),
                Term::Big(BigNumber::from_u64(u64::MAX)),
            ])
        );
    }

    #[test]
    fn test_heap_reserve_appends() {
        let mut heap = Heap::new();
        assert!(heap.is_empty());
        heap.reserve(3);
        let cursor = heap.reserve(2);
        assert_eq!(cursor.position(), 3);
        assert_eq!(cursor.capacity(), 2);
        assert_eq!(cursor.remaining(), 2);
        assert_eq!(heap.len(), 5);
        assert!(heap.words().iter().all(|word| *word == HeapWord::Unused));
    }

    #[test]
    #[should_panic(expected = "heap arena overrun")]
    fn test_overrun_is_fatal() {
        let atoms = AtomTable::new(8);
        let spec = BuildSpec::Tuple(vec![BuildSpec::Uint(1), BuildSpec::Uint(2)]);
        let mut words = vec![HeapWord::Unused; size_pass(&spec) - 1];
        let mut cursor = HeapCursor::new(&mut words);
        let _ = build(&mut cursor, &atoms, &spec);
    }

    #[test]
    fn test_size_calc_builder_counts_only() {
        let mut builder = HeapBuilder::new_size_calc();
        let built = builder.bld(&BuildSpec::List(vec![BuildSpec::Atom("x"); 4])).unwrap();
        assert_eq!(builder.size(), 8);
        assert_eq!(built.word, HeapWord::Unused);
    }
}
