//! Ingress and egress records.
//!
//! Records are the loader-facing shape of an instruction: a kind name, an
//! optional label, a target variable and a string-keyed argument map. The
//! declarative file format itself is parsed elsewhere; this module only
//! converts between records and the typed `Instruction` model.

use std::collections::BTreeMap;

use crate::{FunctionCall, Instruction, InstructionKind, LabelRef, LoadError, Op, VariableRef};

/// Argument keys used in `InstructionRecord::arguments`.
pub mod keys {
    pub const JNZ_LABEL: &str = "JNZLabel";
    pub const GOTO_LABEL: &str = "gotoLabel";
    pub const ASSIGNED_VARIABLE: &str = "assignedVariable";
    pub const CONSTANT_VALUE: &str = "constantValue";
    pub const JZ_LABEL: &str = "JZLabel";
    pub const JE_CONSTANT_LABEL: &str = "JEConstantLabel";
    pub const JE_VARIABLE_LABEL: &str = "JEVariableLabel";
    pub const VARIABLE_NAME: &str = "variableName";
    pub const FUNCTION_NAME: &str = "functionName";
    pub const FUNCTION_ARGUMENTS: &str = "functionArguments";
    pub const JE_FUNCTION_LABEL: &str = "JEFunctionLabel";
}

/// One instruction as delivered by a loader.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstructionRecord {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub label: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub variable: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub arguments: BTreeMap<String, String>,
}

impl InstructionRecord {
    pub fn new(name: impl Into<String>, variable: impl Into<String>) -> Self {
        InstructionRecord {
            name: name.into(),
            label: None,
            variable: variable.into(),
            arguments: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_argument(mut self, key: &str, value: impl Into<String>) -> Self {
        self.arguments.insert(key.to_owned(), value.into());
        self
    }

    fn argument(&self, key: &'static str) -> Result<&str, LoadError> {
        self.arguments
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| LoadError::MissingArgument {
                instruction: self.name.clone(),
                argument: key,
            })
    }

    fn target(&self, key: &'static str) -> Result<LabelRef, LoadError> {
        let text = self.argument(key)?;
        match LabelRef::parse(text)? {
            LabelRef::Empty => Err(LoadError::InvalidLabel {
                text: text.to_owned(),
            }),
            label => Ok(label),
        }
    }

    fn constant(&self) -> Result<u64, LoadError> {
        let text = self.argument(keys::CONSTANT_VALUE)?;
        text.trim()
            .parse()
            .map_err(|_| LoadError::InvalidConstant {
                text: text.to_owned(),
            })
    }

    fn variable_argument(&self, key: &'static str) -> Result<VariableRef, LoadError> {
        VariableRef::parse(self.argument(key)?)
    }

    fn call(&self) -> Result<FunctionCall, LoadError> {
        let arguments = self
            .arguments
            .get(keys::FUNCTION_ARGUMENTS)
            .map_or("", String::as_str);
        FunctionCall::parse(self.argument(keys::FUNCTION_NAME)?, arguments)
    }
}

impl Instruction {
    /// Build a typed instruction from a loader record.
    ///
    /// `id`, `origin` and `number` are left at their defaults; the program
    /// assembler assigns them.
    pub fn from_record(record: &InstructionRecord) -> Result<Instruction, LoadError> {
        let kind = InstructionKind::from_name(&record.name).ok_or_else(|| {
            LoadError::UnknownInstruction {
                name: record.name.clone(),
            }
        })?;

        let label = match record.label.as_deref().map(LabelRef::parse).transpose()? {
            Some(LabelRef::Exit) => {
                return Err(LoadError::InvalidLabel {
                    text: LabelRef::EXIT_NAME.to_owned(),
                })
            }
            Some(label) => label,
            None => LabelRef::Empty,
        };

        let variable = if kind == InstructionKind::GotoLabel && record.variable.trim().is_empty() {
            VariableRef::RESULT
        } else {
            VariableRef::parse(&record.variable)?
        };

        let op = match kind {
            InstructionKind::Increase => Op::Increase,
            InstructionKind::Decrease => Op::Decrease,
            InstructionKind::JumpNotZero => Op::JumpNotZero {
                target: record.target(keys::JNZ_LABEL)?,
            },
            InstructionKind::Neutral => Op::Neutral,
            InstructionKind::ZeroVariable => Op::ZeroVariable,
            InstructionKind::GotoLabel => Op::GotoLabel {
                target: record.target(keys::GOTO_LABEL)?,
            },
            InstructionKind::Assignment => Op::Assignment {
                source: record.variable_argument(keys::ASSIGNED_VARIABLE)?,
            },
            InstructionKind::ConstantAssignment => Op::ConstantAssignment {
                constant: record.constant()?,
            },
            InstructionKind::JumpZero => Op::JumpZero {
                target: record.target(keys::JZ_LABEL)?,
            },
            InstructionKind::JumpEqualConstant => Op::JumpEqualConstant {
                constant: record.constant()?,
                target: record.target(keys::JE_CONSTANT_LABEL)?,
            },
            InstructionKind::JumpEqualVariable => Op::JumpEqualVariable {
                other: record.variable_argument(keys::VARIABLE_NAME)?,
                target: record.target(keys::JE_VARIABLE_LABEL)?,
            },
            InstructionKind::Quote => Op::Quote {
                call: record.call()?,
            },
            InstructionKind::JumpEqualFunction => Op::JumpEqualFunction {
                call: record.call()?,
                target: record.target(keys::JE_FUNCTION_LABEL)?,
            },
        };

        Ok(Instruction::new(variable, op).labeled(label))
    }

    /// Canonical record for this instruction.
    pub fn to_record(&self) -> InstructionRecord {
        let mut record = InstructionRecord::new(self.kind().name(), self.variable.to_string());
        if !self.label.is_empty() {
            record.label = Some(self.label.to_string());
        }
        match &self.op {
            Op::Increase | Op::Decrease | Op::Neutral | Op::ZeroVariable => record,
            Op::JumpNotZero { target } => record.with_argument(keys::JNZ_LABEL, target.to_string()),
            Op::GotoLabel { target } => record.with_argument(keys::GOTO_LABEL, target.to_string()),
            Op::Assignment { source } => {
                record.with_argument(keys::ASSIGNED_VARIABLE, source.to_string())
            }
            Op::ConstantAssignment { constant } => {
                record.with_argument(keys::CONSTANT_VALUE, constant.to_string())
            }
            Op::JumpZero { target } => record.with_argument(keys::JZ_LABEL, target.to_string()),
            Op::JumpEqualConstant { constant, target } => record
                .with_argument(keys::CONSTANT_VALUE, constant.to_string())
                .with_argument(keys::JE_CONSTANT_LABEL, target.to_string()),
            Op::JumpEqualVariable { other, target } => record
                .with_argument(keys::VARIABLE_NAME, other.to_string())
                .with_argument(keys::JE_VARIABLE_LABEL, target.to_string()),
            Op::Quote { call } => record
                .with_argument(keys::FUNCTION_NAME, call.function.clone())
                .with_argument(keys::FUNCTION_ARGUMENTS, call.arguments_text()),
            Op::JumpEqualFunction { call, target } => record
                .with_argument(keys::FUNCTION_NAME, call.function.clone())
                .with_argument(keys::FUNCTION_ARGUMENTS, call.arguments_text())
                .with_argument(keys::JE_FUNCTION_LABEL, target.to_string()),
        }
    }
}

/// A named program (main program or function) as delivered by a loader.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProgramDefinition {
    pub name: String,
    /// Human-facing name; falls back to `name` when absent.
    #[cfg_attr(feature = "serde", serde(default))]
    pub display_name: Option<String>,
    pub instructions: Vec<InstructionRecord>,
}

impl ProgramDefinition {
    pub fn new(name: impl Into<String>, instructions: Vec<InstructionRecord>) -> Self {
        ProgramDefinition {
            name: name.into(),
            display_name: None,
            instructions,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// A main program together with the functions it brings along.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoadUnit {
    pub main: ProgramDefinition,
    #[cfg_attr(feature = "serde", serde(default))]
    pub functions: Vec<ProgramDefinition>,
}
