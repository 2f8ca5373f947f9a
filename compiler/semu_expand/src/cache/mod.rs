//! Lazily computed expansion, shared between threads.
//!
//! Reads take the read lock only. The first caller to need the expansion
//! takes the write lock, checks again, and computes it; concurrent callers
//! wait on the lock and then reuse the stored result.

use std::sync::Arc;

use parking_lot::RwLock;
use semu_ir::{FunctionResolver, Program};

use crate::{calculate_degree_to_program, ExpandError, Expansion};

#[derive(Debug, Default)]
pub struct ExpansionCache {
    slot: RwLock<Option<Arc<Expansion>>>,
}

impl ExpansionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The expansion, if it has been computed.
    pub fn get(&self) -> Option<Arc<Expansion>> {
        self.slot.read().clone()
    }

    /// The expansion of `program`, computing it on first use.
    pub fn get_or_expand(
        &self,
        program: &Arc<Program>,
        functions: &dyn FunctionResolver,
    ) -> Result<Arc<Expansion>, ExpandError> {
        // Fast path: already computed
        if let Some(expansion) = self.slot.read().as_ref() {
            return Ok(Arc::clone(expansion));
        }

        let mut slot = self.slot.write();
        // Double-check after acquiring the write lock
        if let Some(expansion) = slot.as_ref() {
            return Ok(Arc::clone(expansion));
        }
        let expansion = Arc::new(calculate_degree_to_program(
            Arc::clone(program),
            functions,
        )?);
        *slot = Some(Arc::clone(&expansion));
        Ok(expansion)
    }

    /// Max degree if already expanded, 0 otherwise.
    pub fn cached_max_degree(&self) -> usize {
        self.slot
            .read()
            .as_ref()
            .map_or(0, |expansion| expansion.max_degree())
    }

    pub fn is_expanded(&self) -> bool {
        self.slot.read().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semu_ir::{FunctionTable, InstructionRecord, ProgramHeader, ProgramKind};

    fn zero_x1() -> Arc<Program> {
        match Program::load(
            ProgramHeader::new("zero", ProgramKind::Main),
            &[InstructionRecord::new("ZERO_VARIABLE", "x1")],
        ) {
            Ok(program) => Arc::new(program),
            Err(err) => panic!("load failed: {err}"),
        }
    }

    #[test]
    fn starts_empty() {
        let cache = ExpansionCache::new();
        assert!(cache.get().is_none());
        assert!(!cache.is_expanded());
        assert_eq!(cache.cached_max_degree(), 0);
    }

    #[test]
    fn computes_once_and_reuses() {
        let cache = ExpansionCache::new();
        let program = zero_x1();
        let functions = FunctionTable::new();
        let (Ok(first), Ok(second)) = (
            cache.get_or_expand(&program, &functions),
            cache.get_or_expand(&program, &functions),
        ) else {
            panic!("expansion failed");
        };
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.cached_max_degree(), 1);
    }

    #[test]
    fn concurrent_callers_share_one_expansion() {
        let cache = ExpansionCache::new();
        let program = zero_x1();
        let functions = FunctionTable::new();
        let results: Vec<Arc<Expansion>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| cache.get_or_expand(&program, &functions)))
                .collect();
            handles
                .into_iter()
                .filter_map(|handle| handle.join().ok().and_then(Result::ok))
                .collect()
        });
        assert_eq!(results.len(), 8);
        assert!(results.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    }
}
