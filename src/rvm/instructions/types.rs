// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::rvm::vm::{arithmetic, comparison, Result};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `~`
    Invert,
    /// unary `+`
    Positive,
    /// unary `-`
    Negative,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Pow,
    Mul,
    TrueDiv,
    FloorDiv,
    Mod,
    Add,
    Sub,
    LeftShift,
    RightShift,
    BitAnd,
    BitXor,
    BitOr,
    In,
    NotIn,
    Is,
    IsNot,
    Lt,
    Gt,
    Le,
    Ge,
    Ne,
    Eq,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Invert => "~",
            UnaryOp::Positive => "+",
            UnaryOp::Negative => "-",
            UnaryOp::Not => "not",
        }
    }

    pub fn apply(&self, operand: &Value) -> Result<Value> {
        match self {
            UnaryOp::Invert => arithmetic::invert(operand),
            UnaryOp::Positive => arithmetic::positive(operand),
            UnaryOp::Negative => arithmetic::negative(operand),
            UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
        }
    }
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Pow => "**",
            BinaryOp::Mul => "*",
            BinaryOp::TrueDiv => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::LeftShift => "<<",
            BinaryOp::RightShift => ">>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
            BinaryOp::In => "in",
            BinaryOp::NotIn => "not in",
            BinaryOp::Is => "is",
            BinaryOp::IsNot => "is not",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Ne => "!=",
            BinaryOp::Eq => "==",
        }
    }

    pub fn apply(&self, lhs: &Value, rhs: &Value) -> Result<Value> {
        match self {
            BinaryOp::Pow => arithmetic::pow(lhs, rhs),
            BinaryOp::Mul => arithmetic::mul(lhs, rhs),
            BinaryOp::TrueDiv => arithmetic::true_div(lhs, rhs),
            BinaryOp::FloorDiv => arithmetic::floor_div(lhs, rhs),
            BinaryOp::Mod => arithmetic::modulo(lhs, rhs),
            BinaryOp::Add => arithmetic::add(lhs, rhs),
            BinaryOp::Sub => arithmetic::sub(lhs, rhs),
            BinaryOp::LeftShift => arithmetic::left_shift(lhs, rhs),
            BinaryOp::RightShift => arithmetic::right_shift(lhs, rhs),
            BinaryOp::BitAnd => arithmetic::bit_and(lhs, rhs),
            BinaryOp::BitXor => arithmetic::bit_xor(lhs, rhs),
            BinaryOp::BitOr => arithmetic::bit_or(lhs, rhs),
            BinaryOp::In => Ok(Value::Bool(comparison::contains(rhs, lhs)?)),
            BinaryOp::NotIn => Ok(Value::Bool(!comparison::contains(rhs, lhs)?)),
            BinaryOp::Is => Ok(Value::Bool(comparison::is_same(lhs, rhs))),
            BinaryOp::IsNot => Ok(Value::Bool(!comparison::is_same(lhs, rhs))),
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
                comparison::compare(*self, lhs, rhs).map(Value::Bool)
            }
            BinaryOp::Ne => Ok(Value::Bool(lhs != rhs)),
            BinaryOp::Eq => Ok(Value::Bool(lhs == rhs)),
        }
    }
}
