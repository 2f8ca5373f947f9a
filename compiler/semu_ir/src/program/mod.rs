//! Program generations.
//!
//! A `Program` is one immutable generation: the degree-0 program as loaded,
//! or one produced by expansion. It is built only through `Program::load`
//! or `Program::assemble`, which validate labels, number instructions and
//! rebuild the variable and label indexes.

use std::collections::BTreeSet;
use std::fmt;

use rustc_hash::FxHashMap;

use crate::{
    Architecture, FunctionCall, Instruction, InstructionId, InstructionRecord, LabelRef, LoadError,
    NamesExhausted, ProgramDefinition, VariableRef,
};

/// Whether a program is a user-facing main program or a callable function.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProgramKind {
    Main,
    Function,
}

/// Identity shared by every generation of one program.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProgramHeader {
    pub name: String,
    pub display_name: String,
    pub kind: ProgramKind,
}

impl ProgramHeader {
    pub fn new(name: impl Into<String>, kind: ProgramKind) -> Self {
        let name = name.into();
        ProgramHeader {
            display_name: name.clone(),
            name,
            kind,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}

/// Monotonic fresh-name counters.
///
/// Each generation carries the counters of the generation it was expanded
/// from, raised past every label number and work-variable serial it
/// actually uses, so names handed out later never collide. The counters are
/// wider than the serials so a program using `u32::MAX` leaves them past
/// the end instead of pinned on a name already in use.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NameAllocator {
    next_label: u64,
    next_work: u64,
}

impl Default for NameAllocator {
    fn default() -> Self {
        NameAllocator {
            next_label: 1,
            next_work: 1,
        }
    }
}

impl NameAllocator {
    pub fn fresh_label(&mut self) -> Result<LabelRef, NamesExhausted> {
        let n = u32::try_from(self.next_label).map_err(|_| NamesExhausted::Labels)?;
        self.next_label += 1;
        Ok(LabelRef::Numbered(n))
    }

    pub fn fresh_work(&mut self) -> Result<VariableRef, NamesExhausted> {
        let n = u32::try_from(self.next_work).map_err(|_| NamesExhausted::WorkVariables)?;
        self.next_work += 1;
        Ok(VariableRef::work(n))
    }

    #[inline]
    pub fn next_label_seq(&self) -> u64 {
        self.next_label
    }

    #[inline]
    pub fn next_work_var_seq(&self) -> u64 {
        self.next_work
    }

    fn observe_label(&mut self, label: LabelRef) {
        if let Some(n) = label.number() {
            self.next_label = self.next_label.max(u64::from(n) + 1);
        }
    }

    fn observe_variable(&mut self, var: VariableRef) {
        if var.is_work() {
            self.next_work = self.next_work.max(u64::from(var.serial()) + 1);
        }
    }

    /// Raise the counters past every name `instruction` uses.
    pub fn observe(&mut self, instruction: &Instruction) {
        self.observe_label(instruction.label);
        if let Some(target) = instruction.jump_target() {
            self.observe_label(target);
        }
        instruction.for_each_variable(&mut |var| self.observe_variable(var));
    }
}

/// One immutable generation of a program.
#[derive(Clone, Debug)]
pub struct Program {
    header: ProgramHeader,
    degree: usize,
    instructions: Vec<Instruction>,
    input_vars: BTreeSet<VariableRef>,
    work_vars: BTreeSet<VariableRef>,
    label_index: FxHashMap<LabelRef, usize>,
    names: NameAllocator,
}

impl Program {
    /// Build the degree-0 generation from loader records.
    ///
    /// Instructions get ids `0..n` in order.
    pub fn load(header: ProgramHeader, records: &[InstructionRecord]) -> Result<Self, LoadError> {
        if header.name.trim().is_empty() {
            return Err(LoadError::EmptyName);
        }
        let instructions = records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                Instruction::from_record(record).map(|instruction| {
                    instruction.with_id(InstructionId::from_raw(
                        u32::try_from(index).unwrap_or(u32::MAX),
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::assemble(header, 0, instructions, NameAllocator::default())
    }

    /// Load a definition as a main program or function.
    pub fn from_definition(
        definition: &ProgramDefinition,
        kind: ProgramKind,
    ) -> Result<Self, LoadError> {
        let header = ProgramHeader::new(definition.name.trim(), kind)
            .with_display_name(definition.display_name().trim());
        Self::load(header, &definition.instructions)
    }

    /// Assemble a generation from an ordered instruction list.
    ///
    /// Numbers the instructions `1..=n`, rejects duplicate label
    /// definitions and jumps to labels that are neither defined here nor
    /// `EXIT`, and raises `names` past every name in use.
    pub fn assemble(
        header: ProgramHeader,
        degree: usize,
        mut instructions: Vec<Instruction>,
        mut names: NameAllocator,
    ) -> Result<Self, LoadError> {
        let mut label_index = FxHashMap::default();
        let mut input_vars = BTreeSet::new();
        let mut work_vars = BTreeSet::new();

        for (index, instruction) in instructions.iter_mut().enumerate() {
            instruction.number = index + 1;
            if !instruction.label.is_empty()
                && label_index.insert(instruction.label, index).is_some()
            {
                return Err(LoadError::DuplicateLabel {
                    program: header.name.clone(),
                    label: instruction.label,
                });
            }
            instruction.for_each_variable(&mut |var| {
                if var.is_input() {
                    input_vars.insert(var);
                } else if var.is_work() {
                    work_vars.insert(var);
                }
            });
            names.observe(instruction);
        }

        for instruction in &instructions {
            if let Some(target @ LabelRef::Numbered(_)) = instruction.jump_target() {
                if !label_index.contains_key(&target) {
                    return Err(LoadError::UndefinedLabel {
                        program: header.name.clone(),
                        label: target,
                        instruction: instruction.number,
                    });
                }
            }
        }

        Ok(Program {
            header,
            degree,
            instructions,
            input_vars,
            work_vars,
            label_index,
            names,
        })
    }

    #[inline]
    pub fn header(&self) -> &ProgramHeader {
        &self.header
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.header.name
    }

    #[inline]
    pub fn display_name(&self) -> &str {
        &self.header.display_name
    }

    /// Lowercase keys the program is looked up by: its name, then its
    /// display name when that differs.
    pub fn lookup_keys(&self) -> Vec<String> {
        let name = self.header.name.to_ascii_lowercase();
        let display = self.header.display_name.to_ascii_lowercase();
        if display == name {
            vec![name]
        } else {
            vec![name, display]
        }
    }

    #[inline]
    pub fn kind(&self) -> ProgramKind {
        self.header.kind
    }

    #[inline]
    pub fn degree(&self) -> usize {
        self.degree
    }

    #[inline]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    #[inline]
    pub fn instruction(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    /// 0-based index of the instruction carrying `label`.
    #[inline]
    pub fn position_of(&self, label: LabelRef) -> Option<usize> {
        self.label_index.get(&label).copied()
    }

    /// Counters to continue allocating fresh names from.
    #[inline]
    pub fn names(&self) -> NameAllocator {
        self.names
    }

    pub fn input_vars(&self) -> impl Iterator<Item = VariableRef> + '_ {
        self.input_vars.iter().copied()
    }

    pub fn work_vars(&self) -> impl Iterator<Item = VariableRef> + '_ {
        self.work_vars.iter().copied()
    }

    /// Highest input serial used, i.e. the number of positional inputs.
    pub fn arity(&self) -> u32 {
        self.input_vars.last().map_or(0, |var| var.serial())
    }

    /// Declared variables in listing order: `y`, inputs, work variables.
    pub fn variables(&self) -> Vec<VariableRef> {
        std::iter::once(VariableRef::RESULT)
            .chain(self.input_vars())
            .chain(self.work_vars())
            .collect()
    }

    /// Labels in use, sorted, with `EXIT` last when referenced.
    pub fn labels(&self) -> Vec<LabelRef> {
        let mut labels: BTreeSet<LabelRef> = self.label_index.keys().copied().collect();
        if self
            .instructions
            .iter()
            .any(|instruction| instruction.jump_target() == Some(LabelRef::Exit))
        {
            labels.insert(LabelRef::Exit);
        }
        labels.into_iter().collect()
    }

    /// Every call made by the program, in instruction order.
    pub fn calls(&self) -> impl Iterator<Item = &FunctionCall> + '_ {
        self.instructions
            .iter()
            .filter_map(|instruction| instruction.op.call())
    }

    /// Names of all functions called, including from nested arguments.
    pub fn functions_called(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for call in self.calls() {
            call.for_each_function(&mut |name| {
                names.insert(name.to_owned());
            });
        }
        names
    }

    pub fn synthetic_count(&self) -> usize {
        self.instructions
            .iter()
            .filter(|instruction| !instruction.is_basic())
            .count()
    }

    #[inline]
    pub fn has_synthetic(&self) -> bool {
        self.instructions
            .iter()
            .any(|instruction| !instruction.is_basic())
    }

    /// Weakest architecture able to run this generation.
    pub fn minimal_architecture(&self) -> Architecture {
        self.instructions
            .iter()
            .map(|instruction| instruction.kind().architecture())
            .max()
            .unwrap_or_default()
    }

    /// Instruction numbers that read or write `var`.
    pub fn instructions_using_variable(&self, var: VariableRef) -> Vec<usize> {
        self.instructions
            .iter()
            .filter(|instruction| instruction.uses_variable(var))
            .map(|instruction| instruction.number)
            .collect()
    }

    /// Instruction numbers that define or jump to `label`.
    pub fn instructions_using_label(&self, label: LabelRef) -> Vec<usize> {
        self.instructions
            .iter()
            .filter(|instruction| instruction.uses_label(label))
            .map(|instruction| instruction.number)
            .collect()
    }

    pub fn summary(&self) -> ProgramSummary {
        let mut per_architecture: Vec<(Architecture, usize)> =
            Architecture::ALL.into_iter().map(|arch| (arch, 0)).collect();
        for instruction in &self.instructions {
            per_architecture[instruction.kind().architecture().ordinal()].1 += 1;
        }
        let synthetic = self.synthetic_count();
        ProgramSummary {
            name: self.header.name.clone(),
            display_name: self.header.display_name.clone(),
            degree: self.degree,
            instruction_count: self.len(),
            basic_count: self.len() - synthetic,
            synthetic_count: synthetic,
            per_architecture,
            minimal_architecture: self.minimal_architecture(),
            functions: self.functions_called().into_iter().collect(),
            labels: self.labels(),
            variables: self.variables(),
        }
    }

    /// Listing of the whole generation, one `render_line` per instruction.
    pub fn render(&self) -> String {
        self.instructions
            .iter()
            .map(Instruction::render_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Egress: the generation as a loader definition.
    pub fn to_definition(&self) -> ProgramDefinition {
        ProgramDefinition {
            name: self.header.name.clone(),
            display_name: Some(self.header.display_name.clone()),
            instructions: self
                .instructions
                .iter()
                .map(Instruction::to_record)
                .collect(),
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Static facts about one generation, for presentation.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProgramSummary {
    pub name: String,
    pub display_name: String,
    pub degree: usize,
    pub instruction_count: usize,
    pub basic_count: usize,
    pub synthetic_count: usize,
    /// Instructions requiring each architecture, oldest first.
    pub per_architecture: Vec<(Architecture, usize)>,
    pub minimal_architecture: Architecture,
    pub functions: Vec<String>,
    pub labels: Vec<LabelRef>,
    pub variables: Vec<VariableRef>,
}

impl ProgramSummary {
    pub fn count_for(&self, architecture: Architecture) -> usize {
        self.per_architecture
            .iter()
            .find(|(arch, _)| *arch == architecture)
            .map_or(0, |(_, count)| *count)
    }
}

#[cfg(test)]
mod tests;
