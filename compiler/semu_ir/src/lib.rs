//! Semu IR - instruction and program model for the S-language emulator.
//!
//! This crate contains the core data structures shared by the expander,
//! the executor and the engine:
//! - `VariableRef` / `LabelRef` identifiers
//! - `Op` / `Instruction`, the closed instruction variant set
//! - `FunctionCall` argument trees for `QUOTE` and `JUMP_EQUAL_FUNCTION`
//! - `InstructionRecord` ingress/egress records
//! - `Program`, one immutable generation of a program
//!
//! # Design Philosophy
//!
//! - **Closed variants**: every per-kind behavior is an exhaustive `match`
//!   over `Op`, so a new kind cannot be forgotten anywhere.
//! - **Generations, not mutation**: a `Program` is assembled once and never
//!   changed; expansion builds the next generation as a new value.
//! - **Indices, not pointers**: `origin` links are `InstructionId`s into the
//!   expansion arena.

mod call;
mod errors;
mod instruction;
mod label;
mod program;
mod record;
mod resolver;
mod variable;

pub use call::{Argument, FunctionCall};
pub use errors::{LoadError, NamesExhausted};
pub use instruction::{Architecture, Instruction, InstructionId, InstructionKind, Op};
pub use label::LabelRef;
pub use program::{NameAllocator, Program, ProgramHeader, ProgramKind, ProgramSummary};
pub use record::{keys, InstructionRecord, LoadUnit, ProgramDefinition};
pub use resolver::{check_call_graph, FunctionResolver, FunctionTable, Layered};
pub use variable::{VariableKind, VariableRef};
