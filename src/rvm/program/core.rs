// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::rvm::instructions::Instruction;
use crate::rvm::vm::{Result, VmError};
use crate::value::Value;

/// A validated, flat instruction sequence.
///
/// Every jump lands inside the program or exactly at its end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    pub fn new(instructions: Vec<Instruction>) -> Result<Self> {
        let len = instructions.len();
        for (pc, instruction) in instructions.iter().enumerate() {
            if let Some(offset) = instruction.jump_offset() {
                let in_range = (pc + 1)
                    .checked_add(offset)
                    .is_some_and(|target| target <= len);
                if !in_range {
                    return Err(VmError::InvalidJump { pc, offset, len });
                }
            }
        }
        Ok(Self { instructions })
    }

    /// The program of a rule that could not be compiled: deny.
    pub fn fail_closed() -> Self {
        Self {
            instructions: vec![
                Instruction::Constant(Value::Bool(false)),
                Instruction::SetAuthorization,
            ],
        }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}
