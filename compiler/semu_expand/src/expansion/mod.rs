//! Degree engine.
//!
//! Degree 0 is the program as loaded. Each further degree rewrites every
//! synthetic instruction of the previous generation in place with
//! `expand_once`; the first generation without synthetic instructions is
//! the maximum degree.
//!
//! All generations share one ancestry arena: instructions are stored once,
//! indexed by `InstructionId`, and `origin` links point back into it.

use std::sync::Arc;

use semu_ir::{FunctionResolver, Instruction, InstructionId, Program};
use tracing::debug;

use crate::rules::expand_once;
use crate::ExpandError;

/// Every generation of one program plus the ancestry arena.
#[derive(Clone, Debug)]
pub struct Expansion {
    generations: Vec<Arc<Program>>,
    arena: Vec<Instruction>,
}

impl Expansion {
    /// Expansion holding only degree 0.
    pub fn base(program: Arc<Program>) -> Self {
        let mut arena: Vec<Instruction> = Vec::with_capacity(program.len());
        for instruction in program.instructions() {
            if instruction.id.index() == arena.len() {
                arena.push(instruction.clone());
            }
        }
        Expansion {
            generations: vec![program],
            arena,
        }
    }

    #[inline]
    pub fn max_degree(&self) -> usize {
        self.generations.len() - 1
    }

    #[inline]
    pub fn generations(&self) -> &[Arc<Program>] {
        &self.generations
    }

    /// The degree-0 program.
    #[inline]
    pub fn original(&self) -> &Arc<Program> {
        &self.generations[0]
    }

    pub fn degree(&self, degree: usize) -> Option<&Arc<Program>> {
        self.generations.get(degree)
    }

    pub fn program_at(&self, degree: usize) -> Result<Arc<Program>, ExpandError> {
        self.degree(degree)
            .cloned()
            .ok_or(ExpandError::DegreeOutOfRange {
                requested: degree,
                max: self.max_degree(),
            })
    }

    /// Instruction by id, as it appeared in the generation that created it.
    pub fn instruction(&self, id: InstructionId) -> Option<&Instruction> {
        self.arena.get(id.index()).filter(|i| i.id == id)
    }

    /// Origin chain of `instruction`, nearest ancestor first.
    pub fn ancestry(&self, instruction: &Instruction) -> Vec<&Instruction> {
        let mut chain = Vec::new();
        let mut next = instruction.origin;
        while let Some(id) = next {
            let Some(parent) = self.instruction(id) else {
                break;
            };
            chain.push(parent);
            next = parent.origin;
        }
        chain
    }

    /// `render_line` of `instruction` followed by its ancestors, joined by
    /// `>>>`.
    pub fn render_with_ancestry(&self, instruction: &Instruction) -> String {
        std::iter::once(instruction)
            .chain(self.ancestry(instruction))
            .map(Instruction::render_line)
            .collect::<Vec<_>>()
            .join(" >>> ")
    }

    /// Full listing of one degree with ancestry on every line.
    pub fn render_degree(&self, degree: usize) -> Option<String> {
        let program = self.degree(degree)?;
        Some(
            program
                .instructions()
                .iter()
                .map(|instruction| self.render_with_ancestry(instruction))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    fn push_generation(
        &mut self,
        functions: &dyn FunctionResolver,
    ) -> Result<Arc<Program>, ExpandError> {
        let previous = Arc::clone(&self.generations[self.max_degree()]);
        let mut names = previous.names();
        let mut next_id = self.arena.len();
        let mut instructions = Vec::with_capacity(previous.len() * 2);

        for instruction in previous.instructions() {
            if instruction.is_basic() {
                instructions.push(instruction.clone());
                continue;
            }
            for generated in expand_once(instruction, &mut names, functions)? {
                let id = InstructionId::from_raw(u32::try_from(next_id).unwrap_or(u32::MAX));
                next_id += 1;
                instructions.push(generated.with_id(id).with_origin(instruction.id));
            }
        }

        let program = Arc::new(Program::assemble(
            previous.header().clone(),
            previous.degree() + 1,
            instructions,
            names,
        )?);
        for instruction in program.instructions() {
            if instruction.id.index() == self.arena.len() {
                self.arena.push(instruction.clone());
            }
        }
        debug!(
            program = %program.name(),
            degree = program.degree(),
            instructions = program.len(),
            "expanded generation"
        );
        self.generations.push(Arc::clone(&program));
        Ok(program)
    }
}

/// Expand `program` until no synthetic instruction is left.
#[tracing::instrument(level = "debug", skip_all, fields(program = %program.name()))]
pub fn calculate_degree_to_program(
    program: Arc<Program>,
    functions: &dyn FunctionResolver,
) -> Result<Expansion, ExpandError> {
    let mut expansion = Expansion::base(program);
    let mut current = Arc::clone(expansion.original());
    while current.has_synthetic() {
        current = expansion.push_generation(functions)?;
    }
    debug!(max_degree = expansion.max_degree(), "expansion complete");
    Ok(expansion)
}
