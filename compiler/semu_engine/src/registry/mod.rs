//! Registered main programs and functions.
//!
//! Both tables sit behind one `RwLock` so a load unit (a main program with
//! its functions) is validated and committed under a single write lock:
//! either everything in the unit is registered or nothing is. Lookups are
//! case-insensitive by name and by display name, and hand out `Arc`s so no
//! lock is held while a program runs or expands. A program whose name or
//! display name is already a lookup key of another program in the same
//! table is rejected as a duplicate.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use semu_expand::{ExpandError, Expansion, ExpansionCache};
use semu_ir::{
    check_call_graph, FunctionResolver, FunctionTable, Layered, LoadError, LoadUnit, Program,
    ProgramDefinition, ProgramKind,
};
use tracing::debug;

use crate::RegistryError;

/// A degree-0 program with its lazily computed expansion.
#[derive(Debug)]
pub struct RegisteredProgram {
    program: Arc<Program>,
    expansion: ExpansionCache,
}

impl RegisteredProgram {
    fn new(program: Arc<Program>) -> Self {
        RegisteredProgram {
            program,
            expansion: ExpansionCache::new(),
        }
    }

    #[inline]
    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    /// All degrees of the program, expanded on first use.
    pub fn expansion(
        &self,
        functions: &dyn FunctionResolver,
    ) -> Result<Arc<Expansion>, ExpandError> {
        self.expansion.get_or_expand(&self.program, functions)
    }

    /// Max degree if already expanded, 0 otherwise.
    pub fn cached_max_degree(&self) -> usize {
        self.expansion.cached_max_degree()
    }
}

#[derive(Debug, Default)]
struct ProgramTable {
    /// Lowercase name to entry.
    by_name: FxHashMap<String, Arc<RegisteredProgram>>,
    /// Every lookup key (lowercase name or display name) to lowercase name.
    keys: FxHashMap<String, String>,
}

impl ProgramTable {
    fn get(&self, name: &str) -> Option<&Arc<RegisteredProgram>> {
        self.keys
            .get(&name.trim().to_ascii_lowercase())
            .and_then(|name| self.by_name.get(name))
    }

    /// Whether `program`'s name or display name is already taken.
    fn is_taken(&self, program: &Program) -> bool {
        program
            .lookup_keys()
            .iter()
            .any(|key| self.keys.contains_key(key))
    }

    fn insert(&mut self, program: Arc<Program>) -> Arc<RegisteredProgram> {
        let name = program.name().to_ascii_lowercase();
        for key in program.lookup_keys() {
            self.keys.insert(key, name.clone());
        }
        let entry = Arc::new(RegisteredProgram::new(program));
        self.by_name.insert(name, Arc::clone(&entry));
        entry
    }

    fn display_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .by_name
            .values()
            .map(|entry| entry.program.display_name().to_owned())
            .collect();
        names.sort_unstable_by_key(|name| name.to_ascii_lowercase());
        names
    }
}

impl FunctionResolver for ProgramTable {
    fn resolve_function(&self, name: &str) -> Option<Arc<Program>> {
        self.get(name).map(|entry| Arc::clone(&entry.program))
    }
}

#[derive(Debug, Default)]
struct Tables {
    mains: ProgramTable,
    functions: ProgramTable,
}

#[derive(Debug, Default)]
pub struct ProgramRegistry {
    tables: RwLock<Tables>,
}

impl ProgramRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a main program. Every function it calls must already be
    /// registered.
    pub fn add_main_program(
        &self,
        definition: &ProgramDefinition,
    ) -> Result<Arc<RegisteredProgram>, RegistryError> {
        let program = Program::from_definition(definition, ProgramKind::Main)?;
        let mut tables = self.tables.write();
        if tables.mains.is_taken(&program) {
            return Err(RegistryError::DuplicateMainProgram {
                name: program.name().to_owned(),
            });
        }
        check_call_graph(&[&program], &tables.functions)?;
        debug!(program = program.name(), "registered main program");
        Ok(tables.mains.insert(Arc::new(program)))
    }

    /// Register a function. Every function it calls must already be
    /// registered or be the function itself, which is then rejected as
    /// recursive.
    pub fn add_function(
        &self,
        definition: &ProgramDefinition,
    ) -> Result<Arc<RegisteredProgram>, RegistryError> {
        let program = Arc::new(Program::from_definition(
            definition,
            ProgramKind::Function,
        )?);
        let mut tables = self.tables.write();
        if tables.functions.is_taken(&program) {
            return Err(RegistryError::DuplicateFunction {
                name: program.name().to_owned(),
            });
        }
        let mut local = FunctionTable::new();
        local.insert(Arc::clone(&program));
        let resolver = Layered {
            local: &local,
            base: &tables.functions,
        };
        check_call_graph(&[&*program], &resolver)?;
        debug!(function = program.name(), "registered function");
        Ok(tables.functions.insert(program))
    }

    /// Validate and register a main program together with its functions.
    ///
    /// Fails without registering anything on a load error, a duplicate
    /// inside the unit or against the registry, an unknown callee or a
    /// recursive call cycle.
    pub fn register_unit(&self, unit: &LoadUnit) -> Result<Arc<RegisteredProgram>, RegistryError> {
        let main = Program::from_definition(&unit.main, ProgramKind::Main)?;
        let mut local = FunctionTable::new();
        for definition in &unit.functions {
            let function = Program::from_definition(definition, ProgramKind::Function)?;
            let name = function.name().to_owned();
            if local.insert(Arc::new(function)).is_some() {
                return Err(LoadError::DuplicateDefinition { name }.into());
            }
        }

        let mut tables = self.tables.write();
        if tables.mains.is_taken(&main) {
            return Err(RegistryError::DuplicateMainProgram {
                name: main.name().to_owned(),
            });
        }
        if let Some(existing) = local.iter().find(|f| tables.functions.is_taken(f)) {
            return Err(RegistryError::DuplicateFunction {
                name: existing.name().to_owned(),
            });
        }
        let roots: Vec<&Program> = std::iter::once(&main)
            .chain(local.iter().map(|function| &**function))
            .collect();
        let resolver = Layered {
            local: &local,
            base: &tables.functions,
        };
        check_call_graph(&roots, &resolver)?;

        for function in local.iter() {
            tables.functions.insert(Arc::clone(function));
        }
        debug!(
            program = main.name(),
            functions = local.len(),
            "registered load unit"
        );
        Ok(tables.mains.insert(Arc::new(main)))
    }

    /// Main program by name or display name.
    pub fn main_program(&self, name: &str) -> Option<Arc<RegisteredProgram>> {
        self.tables.read().mains.get(name).cloned()
    }

    /// Function by name or display name.
    pub fn function(&self, name: &str) -> Option<Arc<RegisteredProgram>> {
        self.tables.read().functions.get(name).cloned()
    }

    /// Display names of the main programs, sorted case-insensitively.
    pub fn main_program_names(&self) -> Vec<String> {
        self.tables.read().mains.display_names()
    }

    pub fn function_names(&self) -> Vec<String> {
        self.tables.read().functions.display_names()
    }
}

impl FunctionResolver for ProgramRegistry {
    fn resolve_function(&self, name: &str) -> Option<Arc<Program>> {
        self.tables.read().functions.resolve_function(name)
    }
}
