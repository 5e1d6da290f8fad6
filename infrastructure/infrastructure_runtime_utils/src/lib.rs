//! Infrastructure Layer: Runtime Utilities
//!
//! Provides runtime utility functions from utils.c and erl_utils.h for the Erlang/OTP
//! runtime system. This crate implements the global interval counter, term equality and
//! ordering, two-phase term building, and the runtime utilities context.
//!
//! ## Overview
//!
//! The `infrastructure_runtime_utils` crate is part of the infrastructure layer in the
//! CLEAN architecture implementation of Erlang/OTP. It provides:
//! - A lock-free monotonic interval counter with explicit memory orderings
//! - Comparing Erlang terms (eq, cmp and the cmp_* predicates)
//! - Building Erlang terms (atoms, integers, tuples, lists, strings) in two passes
//! - An explicitly owned runtime context instead of process-wide globals
//!
//! ## Modules
//!
//! - **[`interval`](interval/index.html)**: `IntervalCounter` (step, ensure_later, current)
//!
//! - **[`comparison`](comparison/index.html)**: Term comparison functions
//!   (eq, cmp, cmp_lt, cmp_le, cmp_eq, cmp_ne, cmp_ge, cmp_gt)
//!
//! - **[`term_building`](term_building/index.html)**: The size pass and build pass over a
//!   `BuildSpec`, and the heap they write to
//!
//! - **[`initialization`](initialization/index.html)**: `RuntimeUtils` and `UtilsConfig`
//!
//! ## Usage
//!
//! ```rust
//! use infrastructure_runtime_utils::{cmp, eq, BuildSpec, RuntimeUtils, UtilsConfig};
//! use entities_data_handling::Term;
//!
//! let utils = RuntimeUtils::init(UtilsConfig::default());
//! let epoch = utils.interval().step_relb();
//!
//! let spec = BuildSpec::Tuple(vec![BuildSpec::Atom("gc"), BuildSpec::Uint(epoch)]);
//! let (heap, term) = utils.build(&spec).unwrap();
//! assert_eq!(heap.len(), 3);
//! assert!(eq(&term, &term.clone()));
//! assert_eq!(cmp(&term, &Term::Nil), std::cmp::Ordering::Less);
//! ```
//!
//! ## Architecture
//!
//! This crate is based on the C implementation in `utils.c`. It depends on:
//! - `entities_data_handling` for terms, atoms, bit helpers and word atomics
//! - `entities_utilities` for big numbers
//!
//! ## See Also
//!
//! - [`entities_data_handling`](../../entities/entities_data_handling/index.html): Core term
//!   types and term hashing

pub mod comparison;
pub mod initialization;
pub mod interval;
pub mod term_building;

pub use comparison::{cmp, cmp_eq, cmp_ge, cmp_gt, cmp_le, cmp_lt, cmp_ne, eq};
pub use initialization::{RuntimeUtils, UtilsConfig, DEFAULT_ATOM_TABLE_LIMIT};
pub use interval::{IntervalCounter, ReadBarrier, StepBarrier};
pub use term_building::{
    build, size_pass, BuildSpec, Header, Heap, HeapBuilder, HeapCursor, HeapWord,
    TermBuildingError,
};
