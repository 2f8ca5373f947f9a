//! Function call argument trees.
//!
//! `QUOTE` and `JUMP_EQUAL_FUNCTION` carry a call `(F, a1, ..., an)` whose
//! arguments are either variables of the calling program or nested calls.
//! The textual form of an argument list is `x1,(Successor,x2),(Const7)`.

use std::fmt;

use crate::{LoadError, VariableRef};

/// A call of a named function with positional arguments.
///
/// Argument `i` (0-based) binds the callee's input variable `x(i+1)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionCall {
    pub function: String,
    pub args: Vec<Argument>,
}

/// One argument of a call.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Argument {
    Variable(VariableRef),
    Call(FunctionCall),
}

impl FunctionCall {
    pub fn new(function: impl Into<String>, args: Vec<Argument>) -> Self {
        FunctionCall {
            function: function.into(),
            args,
        }
    }

    /// Build a call from a function name and a textual argument list.
    pub fn parse(function: &str, arguments: &str) -> Result<Self, LoadError> {
        let function = function.trim();
        if function.is_empty() {
            return Err(LoadError::MalformedArguments {
                text: arguments.to_owned(),
                reason: "empty function name",
            });
        }
        let args = ArgumentParser::new(arguments).parse_list()?;
        Ok(FunctionCall::new(function, args))
    }

    /// Textual argument list, the inverse of the `arguments` half of `parse`.
    pub fn arguments_text(&self) -> String {
        let mut out = String::new();
        write_args(&mut out, &self.args);
        out
    }

    /// Visit every variable referenced anywhere in the tree, depth-first.
    pub fn for_each_variable(&self, f: &mut impl FnMut(VariableRef)) {
        for arg in &self.args {
            match arg {
                Argument::Variable(var) => f(*var),
                Argument::Call(call) => call.for_each_variable(f),
            }
        }
    }

    /// Visit every function name in the tree, outermost first.
    pub fn for_each_function(&self, f: &mut impl FnMut(&str)) {
        f(&self.function);
        for arg in &self.args {
            if let Argument::Call(call) = arg {
                call.for_each_function(f);
            }
        }
    }

    /// Copy of this call with every variable passed through `rename`.
    #[must_use]
    pub fn map_variables(&self, rename: &impl Fn(VariableRef) -> VariableRef) -> FunctionCall {
        FunctionCall {
            function: self.function.clone(),
            args: self
                .args
                .iter()
                .map(|arg| match arg {
                    Argument::Variable(var) => Argument::Variable(rename(*var)),
                    Argument::Call(call) => Argument::Call(call.map_variables(rename)),
                })
                .collect(),
        }
    }

    /// Nesting depth: 1 for a call whose arguments are all variables.
    pub fn depth(&self) -> usize {
        1 + self
            .args
            .iter()
            .map(|arg| match arg {
                Argument::Variable(_) => 0,
                Argument::Call(call) => call.depth(),
            })
            .max()
            .unwrap_or(0)
    }
}

fn write_args(out: &mut String, args: &[Argument]) {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        match arg {
            Argument::Variable(var) => out.push_str(&var.to_string()),
            Argument::Call(call) => out.push_str(&call.to_string()),
        }
    }
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::from("(");
        out.push_str(&self.function);
        if !self.args.is_empty() {
            out.push(',');
            write_args(&mut out, &self.args);
        }
        out.push(')');
        f.write_str(&out)
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Variable(var) => var.fmt(f),
            Argument::Call(call) => call.fmt(f),
        }
    }
}

/// Recursive-descent parser over the textual argument list.
struct ArgumentParser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> ArgumentParser<'a> {
    fn new(text: &'a str) -> Self {
        ArgumentParser { text, pos: 0 }
    }

    fn error(&self, reason: &'static str) -> LoadError {
        LoadError::MalformedArguments {
            text: self.text.to_owned(),
            reason,
        }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_whitespace();
        self.rest().chars().next()
    }

    fn bump(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    /// Read up to (not including) the next `,`, `(` or `)`.
    fn atom(&mut self) -> &'a str {
        self.skip_whitespace();
        let rest = self.rest();
        let end = rest.find([',', '(', ')']).unwrap_or(rest.len());
        self.pos += end;
        rest[..end].trim()
    }

    fn parse_list(mut self) -> Result<Vec<Argument>, LoadError> {
        if self.peek().is_none() {
            return Ok(Vec::new());
        }
        let mut args = vec![self.parse_argument()?];
        while self.bump(',') {
            args.push(self.parse_argument()?);
        }
        if self.peek().is_some() {
            return Err(self.error("unexpected trailing input"));
        }
        Ok(args)
    }

    fn parse_argument(&mut self) -> Result<Argument, LoadError> {
        if self.bump('(') {
            return self.parse_call().map(Argument::Call);
        }
        let atom = self.atom();
        if atom.is_empty() {
            return Err(self.error("empty argument"));
        }
        VariableRef::parse(atom).map(Argument::Variable)
    }

    fn parse_call(&mut self) -> Result<FunctionCall, LoadError> {
        let name = self.atom();
        if name.is_empty() {
            return Err(self.error("empty function name"));
        }
        let mut args = Vec::new();
        while self.bump(',') {
            args.push(self.parse_argument()?);
        }
        if !self.bump(')') {
            return Err(self.error("unclosed call"));
        }
        Ok(FunctionCall::new(name, args))
    }
}

#[cfg(test)]
mod tests;
