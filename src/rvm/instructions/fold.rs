// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Combining operators with their operand fragments.
//!
//! The parser builds every sub-expression as a flat fragment. When an
//! operator is reduced, the helpers here either evaluate it at compile time
//! (all operands are single constants) or append the operator to the
//! concatenated operand fragments. Short-circuit operators and the trinary
//! are lowered into jumps whose offsets are the fragment lengths.

use super::{BinaryOp, Instruction, UnaryOp};
use crate::rvm::vm::access;
use crate::value::Value;

use std::collections::BTreeSet;

pub type Fragment = Vec<Instruction>;

fn single_constant(fragment: &[Instruction]) -> Option<&Value> {
    match fragment {
        [Instruction::Constant(v)] => Some(v),
        _ => None,
    }
}

pub fn constant(value: Value) -> Fragment {
    vec![Instruction::Constant(value)]
}

pub fn unary(op: UnaryOp, mut operand: Fragment) -> Fragment {
    if let Some(v) = single_constant(&operand) {
        // Failures are left for evaluation time.
        if let Ok(folded) = op.apply(v) {
            return constant(folded);
        }
    }
    operand.push(Instruction::UnaryOp(op));
    operand
}

pub fn binary(op: BinaryOp, mut lhs: Fragment, rhs: Fragment) -> Fragment {
    if let (Some(l), Some(r)) = (single_constant(&lhs), single_constant(&rhs)) {
        if let Ok(folded) = op.apply(l, r) {
            return constant(folded);
        }
    }
    lhs.extend(rhs);
    lhs.push(Instruction::BinaryOp(op));
    lhs
}

pub fn item(mut container: Fragment, key: Fragment) -> Fragment {
    if let (Some(c), Some(k)) = (single_constant(&container), single_constant(&key)) {
        if let Ok(folded) = access::item(c, k) {
            return constant(folded);
        }
    }
    container.extend(key);
    container.push(Instruction::Item);
    container
}

pub fn attribute(mut object: Fragment, name: &str) -> Fragment {
    object.push(Instruction::Attribute(name.to_string()));
    object
}

pub fn set(items: Vec<Fragment>) -> Fragment {
    if items.iter().all(|i| single_constant(i).is_some()) {
        let values: BTreeSet<Value> = items
            .iter()
            .filter_map(|i| single_constant(i).cloned())
            .collect();
        return constant(Value::from(values));
    }
    let count = items.len();
    let mut out: Fragment = items.into_iter().flatten().collect();
    out.push(Instruction::SetLiteral(count));
    out
}

/// Calls are never folded; the count includes the callee.
pub fn call(mut callee: Fragment, args: Vec<Fragment>) -> Fragment {
    let count = args.len() + 1;
    callee.extend(args.into_iter().flatten());
    callee.push(Instruction::Call(count));
    callee
}

pub fn and(mut left: Fragment, right: Fragment) -> Fragment {
    if let Some(l) = single_constant(&left) {
        return if l.is_truthy() { right } else { left };
    }
    left.push(Instruction::JumpIfFalse(right.len() + 1));
    left.push(Instruction::Pop);
    left.extend(right);
    left
}

pub fn or(mut left: Fragment, right: Fragment) -> Fragment {
    if let Some(l) = single_constant(&left) {
        return if l.is_truthy() { left } else { right };
    }
    left.push(Instruction::JumpIfTrue(right.len() + 1));
    left.push(Instruction::Pop);
    left.extend(right);
    left
}

/// `then if cond else otherwise`
pub fn trinary(then: Fragment, mut cond: Fragment, otherwise: Fragment) -> Fragment {
    if let Some(c) = single_constant(&cond) {
        return if c.is_truthy() { then } else { otherwise };
    }
    cond.push(Instruction::JumpIfFalse(then.len() + 2));
    cond.push(Instruction::Pop);
    cond.extend(then);
    cond.push(Instruction::Jump(otherwise.len() + 1));
    cond.push(Instruction::Pop);
    cond.extend(otherwise);
    cond
}
