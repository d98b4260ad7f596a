// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::context::EvalContext;
use super::errors::Result;
use crate::rvm::instructions::Instruction;
use crate::rvm::program::Program;

impl EvalContext<'_> {
    /// Run `program` on this context.
    ///
    /// With `stop_at_authorization` the run ends before `SetAuthorization`,
    /// leaving the rule's condition on top of the stack. The caller's program
    /// counter and step register are restored afterwards, also on failure.
    pub fn execute(&mut self, program: &Program, stop_at_authorization: bool) -> Result<()> {
        let saved = (self.pc, self.step);
        self.pc = 0;
        let result = self.run(program, stop_at_authorization);
        (self.pc, self.step) = saved;
        result
    }

    fn run(&mut self, program: &Program, stop_at_authorization: bool) -> Result<()> {
        let instructions = program.instructions();
        while let Some(instruction) = instructions.get(self.pc) {
            if stop_at_authorization && matches!(instruction, Instruction::SetAuthorization) {
                break;
            }
            self.step = 1;
            self.execute_instruction(instruction)?;
            self.pc += self.step;
        }
        Ok(())
    }
}

/// Run `program` on `ctx`; see [`EvalContext::execute`].
pub fn execute(
    program: &Program,
    ctx: &mut EvalContext<'_>,
    stop_at_authorization: bool,
) -> Result<()> {
    ctx.execute(program, stop_at_authorization)
}
