// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt;

use super::Instruction;

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Constant(v) => write!(f, "Constant({})", v.repr()),
            Instruction::Ident(name) => write!(f, "Ident({name})"),
            Instruction::Attribute(name) => write!(f, "Attribute({name})"),
            Instruction::Item => f.write_str("Item"),
            Instruction::Call(count) => write!(f, "Call({count})"),
            Instruction::UnaryOp(op) => write!(f, "UnaryOp({})", op.symbol()),
            Instruction::BinaryOp(op) => write!(f, "BinaryOp({})", op.symbol()),
            Instruction::SetLiteral(count) => write!(f, "SetLiteral({count})"),
            Instruction::Jump(offset) => write!(f, "Jump({offset})"),
            Instruction::JumpIfTrue(offset) => write!(f, "JumpIfTrue({offset})"),
            Instruction::JumpIfFalse(offset) => write!(f, "JumpIfFalse({offset})"),
            Instruction::Pop => f.write_str("Pop"),
            Instruction::SetAuthorization => f.write_str("SetAuthorization"),
            Instruction::SetAuthorizationAttr(name) => write!(f, "SetAuthorizationAttr({name})"),
        }
    }
}
