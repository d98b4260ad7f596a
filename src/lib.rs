// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod authorization;
pub mod builtins;
mod diagnostics;
mod lexer;
mod parser;
mod policy;
mod rules;
mod rvm;
mod value;

pub use authorization::AuthorizationResult;
pub use diagnostics::{Diagnostics, TracingDiagnostics};
pub use lexer::SyntaxError;
pub use parser::{compile_rule, parse_rule};
pub use policy::{Policy, PolicyError, SymbolProvider};
pub use rules::{Rule, RuleDoc};
pub use rvm::vm::{EvalContext, VmError};
pub use value::{ContextFunction, HostObject, NativeFunction, Value};

/// Items in `unstable` are likely to change.
pub mod unstable {
    pub use crate::lexer::*;
    pub use crate::parser::{is_keyword, Parser, MAX_NESTING_DEPTH};
    pub use crate::rvm::instructions::fold;
    pub use crate::rvm::instructions::{BinaryOp, Instruction, UnaryOp};
    pub use crate::rvm::program::{generate_listing, Program};
    pub use crate::rvm::vm::{call_rule, execute};
}
