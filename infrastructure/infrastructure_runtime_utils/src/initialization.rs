//! Initialization Module
//!
//! Provides the runtime utilities context.
//! Based on erts_init_utils() and related functions from utils.c
//!
//! Instead of process-wide globals, the runtime creates one [`RuntimeUtils`]
//! at start-up and hands out the shared pieces through its accessors.

use std::sync::Arc;

use entities_data_handling::atom::AtomTable;
use entities_data_handling::term::Term;

use crate::interval::IntervalCounter;
use crate::term_building::{build, size_pass, BuildSpec, Heap, TermBuildingError};

/// Default maximum number of atoms
pub const DEFAULT_ATOM_TABLE_LIMIT: usize = 1_048_576;

/// Start-up configuration for [`RuntimeUtils`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtilsConfig {
    /// Maximum number of atoms in the atom table
    pub atom_table_limit: usize,
    /// Starting value of the global interval counter
    pub interval_base: u64,
}

impl Default for UtilsConfig {
    fn default() -> Self {
        Self {
            atom_table_limit: DEFAULT_ATOM_TABLE_LIMIT,
            interval_base: 0,
        }
    }
}

/// Shared runtime utilities: the global interval counter and the atom table
#[derive(Debug, Clone)]
pub struct RuntimeUtils {
    interval: Arc<IntervalCounter>,
    atoms: Arc<AtomTable>,
    config: UtilsConfig,
}

impl RuntimeUtils {
    /// Initialize runtime utilities
    ///
    /// Based on `erts_init_utils()` from utils.c.
    pub fn init(config: UtilsConfig) -> Self {
        tracing::debug!(
            atom_table_limit = config.atom_table_limit,
            interval_base = config.interval_base,
            "initializing runtime utilities"
        );
        Self {
            interval: Arc::new(IntervalCounter::with_base(config.interval_base)),
            atoms: Arc::new(AtomTable::new(config.atom_table_limit)),
            config,
        }
    }

    /// The global interval counter
    pub fn interval(&self) -> &Arc<IntervalCounter> {
        &self.interval
    }

    /// The atom table
    pub fn atoms(&self) -> &Arc<AtomTable> {
        &self.atoms
    }

    /// Configuration this context was created with
    pub fn config(&self) -> &UtilsConfig {
        &self.config
    }

    /// Size `spec`, reserve exactly that many words on a fresh heap, and build it
    pub fn build(&self, spec: &BuildSpec<'_>) -> Result<(Heap, Term), TermBuildingError> {
        let mut heap = Heap::new();
        let words = size_pass(spec);
        let term = {
            let mut cursor = heap.reserve(words);
            build(&mut cursor, &self.atoms, spec)?
        };
        Ok((heap, term))
    }
}

impl Default for RuntimeUtils {
    fn default() -> Self {
        Self::init(UtilsConfig::default())
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = UtilsConfig::default();
        assert_eq!(config.atom_table_limit, 1_048_576);
        assert_eq!(config.interval_base, 0);
    }

    #[test]
    fn test_init() {
        let utils = RuntimeUtils::init(UtilsConfig {
            atom_table_limit: 4,
            interval_base: 10,
        });
        assert_eq!(utils.interval().current_acqb(), 10);
        assert_eq!(utils.interval().step_nob(), 11);
        assert_eq!(utils.atoms().limit(), 4);
        assert_eq!(utils.config().interval_base, 10);
    }

    #[test]
    fn test_clones_share_state() {
        let utils = RuntimeUtils::default();
        let other = utils.clone();
        other.interval().step_relb();
        assert_eq!(utils.interval().current_acqb(), 1);
        assert!(Arc::ptr_eq(utils.atoms(), other.atoms()));
    }

    #[test]
    fn test_build_end_to_end() {
        let utils = RuntimeUtils::default();
        let spec =
            BuildSpec::atom_uint_two_tuple_list(&[("heap_size", 233), ("reductions", u64::MAX)]);
        let (heap, term) = utils.build(&spec).unwrap();
        assert_eq!(heap.len(), size_pass(&spec));
        assert_eq!(term.list_length(), Some(2));
        assert_eq!(utils.atoms().size(), 2);
    }

    #[test]
    fn test_build_reports_full_atom_table() {
        let utils = RuntimeUtils::init(UtilsConfig {
            atom_table_limit: 1,
            interval_base: 0,
        });
        let spec = BuildSpec::List(vec![BuildSpec::Atom("a"), BuildSpec::Atom("b")]);
        assert!(matches!(
            utils.build(&spec),
            Err(TermBuildingError::Atom(entities_data_handling::AtomError::TableFull))
        ));
    }
}
