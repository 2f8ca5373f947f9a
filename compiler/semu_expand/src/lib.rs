//! Semu Expand - degree expansion for S-language programs.
//!
//! A synthetic instruction is defined by a rewrite into lower-level
//! instructions. Applying the rewrites to every synthetic instruction of a
//! generation yields the next degree; repeating until only basic
//! instructions remain yields every degree of the program.
//!
//! - `expand_once`: one rewrite of one instruction
//! - `splice_callee` / `expand_quote`: re-addressing a callee into the
//!   caller's name space
//! - `calculate_degree_to_program`: the full degree sequence as an
//!   `Expansion`, with ancestry links for display
//! - `ExpansionCache`: lazily computed, thread-shared expansion

mod cache;
mod errors;
mod expansion;
mod rules;
mod splice;

pub use cache::ExpansionCache;
pub use errors::ExpandError;
pub use expansion::{calculate_degree_to_program, Expansion};
pub use rules::expand_once;
pub use splice::{expand_quote, splice_callee, CalleeFrame, ExitMode};
