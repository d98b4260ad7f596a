// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::authorization::AuthorizationResult;
use crate::rvm::instructions::Instruction;
use crate::value::Value;

use std::collections::BTreeSet;

use super::access;
use super::context::EvalContext;
use super::errors::{Result, VmError};

impl EvalContext<'_> {
    pub(super) fn execute_instruction(&mut self, instruction: &Instruction) -> Result<()> {
        use Instruction::*;
        match instruction {
            Constant(value) => self.push(value.clone()),
            Ident(name) => {
                let value = self.lookup(name);
                self.push(value);
            }
            Attribute(name) => {
                let object = self.pop()?;
                self.push(access::attribute(&object, name)?);
            }
            Item => {
                let key = self.pop()?;
                let container = self.pop()?;
                self.push(access::item(&container, &key)?);
            }
            Call(count) => self.call(*count)?,
            UnaryOp(op) => {
                let operand = self.pop()?;
                self.push(op.apply(&operand)?);
            }
            BinaryOp(op) => {
                let right = self.pop()?;
                let left = self.pop()?;
                self.push(op.apply(&left, &right)?);
            }
            SetLiteral(count) => {
                let items = self.pop_n(*count)?;
                self.push(Value::from(items.into_iter().collect::<BTreeSet<Value>>()));
            }
            Jump(offset) => self.step += offset,
            JumpIfTrue(offset) => {
                if self.peek()?.is_truthy() {
                    self.step += offset;
                }
            }
            JumpIfFalse(offset) => {
                if !self.peek()?.is_truthy() {
                    self.step += offset;
                }
            }
            Pop => {
                self.pop()?;
            }
            SetAuthorization => {
                let condition = self.pop()?;
                self.authz = Some(AuthorizationResult::with_attrs(
                    condition.is_truthy(),
                    self.attrs.clone(),
                ));
            }
            SetAuthorizationAttr(name) => {
                let value = self.pop()?;
                match self.authz.as_mut() {
                    Some(authz) => authz.insert_attr(name, value),
                    None => return Err(VmError::AuthorizationNotSet { name: name.clone() }),
                }
            }
        }
        Ok(())
    }

    fn call(&mut self, count: usize) -> Result<()> {
        if count == 0 {
            return Err(VmError::Internal("call without a callee".to_string()));
        }
        let slots = self.pop_n(count)?;
        let Some((callee, args)) = slots.split_first() else {
            return Err(VmError::StackUnderflow { pc: self.pc });
        };
        match callee {
            // Context functions manage the stack themselves.
            Value::ContextFunction(f) => f.call(self, args),
            Value::Function(f) => {
                let result = f.call(args).map_err(|e| VmError::call_failed(f.name(), e))?;
                self.push(result);
                Ok(())
            }
            Value::Object(o) => {
                let result = o.call(args).map_err(VmError::host)?;
                self.push(result);
                Ok(())
            }
            _ => Err(VmError::NotCallable {
                type_name: callee.type_name().to_string(),
            }),
        }
    }
}
