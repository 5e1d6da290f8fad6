//! Entities Layer: Utilities
//!
//! Provides the arbitrary precision integer type used by boxed integer terms.
//!
//! Based on big.c

pub mod big;

pub use big::BigNumber;
