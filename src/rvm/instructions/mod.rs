// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

mod display;
pub mod fold;
mod types;

pub use types::{BinaryOp, UnaryOp};

use crate::value::Value;

/// Instructions of the stack machine.
///
/// Jump offsets count the instructions skipped after the jump itself, so
/// `Jump(0)` is a no-op and a jump lands at `pc + 1 + offset`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// Push a value.
    Constant(Value),

    /// Push the value of a variable or resolved symbol.
    Ident(String),

    /// Replace the top of the stack with one of its attributes.
    Attribute(String),

    /// Pop key, pop container, push `container[key]`.
    Item,

    /// Pop the callee and its arguments (the count includes the callee).
    Call(usize),

    UnaryOp(UnaryOp),

    /// Pop right then left, push the result.
    BinaryOp(BinaryOp),

    /// Pop the given number of items and push them as a set.
    SetLiteral(usize),

    Jump(usize),

    /// Jump when the top of the stack is truthy; the operand stays.
    JumpIfTrue(usize),

    /// Jump when the top of the stack is falsy; the operand stays.
    JumpIfFalse(usize),

    Pop,

    /// Pop the condition and record the authorization decision.
    SetAuthorization,

    /// Pop a value into the named attribute of the recorded decision.
    SetAuthorizationAttr(String),
}

impl Instruction {
    /// Offset of a jump instruction.
    pub fn jump_offset(&self) -> Option<usize> {
        match self {
            Instruction::Jump(o) | Instruction::JumpIfTrue(o) | Instruction::JumpIfFalse(o) => {
                Some(*o)
            }
            _ => None,
        }
    }

    pub fn as_constant(&self) -> Option<&Value> {
        match self {
            Instruction::Constant(v) => Some(v),
            _ => None,
        }
    }
}
