//! Function lookup seam.
//!
//! Expansion and evaluation need to find callee programs by name without
//! knowing where they are stored. The registry implements
//! `FunctionResolver`; tests and single-unit tools use `FunctionTable`.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::{LoadError, Program, ProgramKind};

/// Resolves function names (case-insensitively) to their degree-0 program.
pub trait FunctionResolver {
    fn resolve_function(&self, name: &str) -> Option<Arc<Program>>;
}

impl<T: FunctionResolver + ?Sized> FunctionResolver for &T {
    fn resolve_function(&self, name: &str) -> Option<Arc<Program>> {
        (**self).resolve_function(name)
    }
}

impl<T: FunctionResolver + ?Sized> FunctionResolver for Arc<T> {
    fn resolve_function(&self, name: &str) -> Option<Arc<Program>> {
        (**self).resolve_function(name)
    }
}

/// Plain case-insensitive function table, looked up by name or display
/// name.
#[derive(Clone, Debug, Default)]
pub struct FunctionTable {
    functions: Vec<Arc<Program>>,
    /// Every lookup key to its index in `functions`.
    keys: FxHashMap<String, usize>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a function.
    ///
    /// If its name or display name is already taken, the table is left
    /// unchanged and the function holding that key is returned.
    pub fn insert(&mut self, program: Arc<Program>) -> Option<Arc<Program>> {
        let keys = program.lookup_keys();
        if let Some(taken) = keys.iter().find_map(|key| self.keys.get(key)) {
            return Some(Arc::clone(&self.functions[*taken]));
        }
        let index = self.functions.len();
        self.functions.push(program);
        for key in keys {
            self.keys.insert(key, index);
        }
        None
    }

    pub fn contains(&self, name: &str) -> bool {
        self.keys.contains_key(&name.trim().to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Program>> + '_ {
        self.functions.iter()
    }
}

impl FunctionResolver for FunctionTable {
    fn resolve_function(&self, name: &str) -> Option<Arc<Program>> {
        self.keys
            .get(&name.trim().to_ascii_lowercase())
            .map(|&index| Arc::clone(&self.functions[index]))
    }
}

/// Collects functions in order; a later function whose name or display
/// name is already taken is dropped.
impl FromIterator<Program> for FunctionTable {
    fn from_iter<I: IntoIterator<Item = Program>>(iter: I) -> Self {
        let mut table = FunctionTable::new();
        for program in iter {
            table.insert(Arc::new(program));
        }
        table
    }
}

/// Resolver that consults `local` first, then `base`.
///
/// Used to validate a unit against the functions it brings along plus
/// those already registered, before anything is committed.
pub struct Layered<'a> {
    pub local: &'a dyn FunctionResolver,
    pub base: &'a dyn FunctionResolver,
}

impl FunctionResolver for Layered<'_> {
    fn resolve_function(&self, name: &str) -> Option<Arc<Program>> {
        self.local
            .resolve_function(name)
            .or_else(|| self.base.resolve_function(name))
    }
}

/// Check that every function reachable from `roots` resolves and that the
/// call graph has no cycles.
///
/// A cycle would make inline expansion diverge, so it is a load error.
pub fn check_call_graph(
    roots: &[&Program],
    resolver: &dyn FunctionResolver,
) -> Result<(), LoadError> {
    let mut walker = CallGraphWalker {
        resolver,
        path: Vec::new(),
        done: FxHashSet::default(),
    };
    for root in roots {
        walker.visit(root)?;
    }
    Ok(())
}

type NodeKey = (ProgramKind, String);

struct CallGraphWalker<'a> {
    resolver: &'a dyn FunctionResolver,
    /// Current DFS path: key plus the name shown in a cycle report.
    path: Vec<(NodeKey, String)>,
    done: FxHashSet<NodeKey>,
}

impl CallGraphWalker<'_> {
    fn visit(&mut self, program: &Program) -> Result<(), LoadError> {
        let key = (program.kind(), program.name().to_ascii_lowercase());
        if self.done.contains(&key) {
            return Ok(());
        }
        if let Some(start) = self.path.iter().position(|(k, _)| *k == key) {
            let mut cycle: Vec<String> = self.path[start..]
                .iter()
                .map(|(_, name)| name.clone())
                .collect();
            cycle.push(program.name().to_owned());
            return Err(LoadError::RecursiveCall { cycle });
        }

        self.path.push((key.clone(), program.name().to_owned()));
        for function in program.functions_called() {
            let callee = self.resolver.resolve_function(&function).ok_or_else(|| {
                LoadError::UnknownFunction {
                    program: program.name().to_owned(),
                    function: function.clone(),
                }
            })?;
            self.visit(&callee)?;
        }
        self.path.pop();
        self.done.insert(key);
        Ok(())
    }
}
