// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt::{self, Write as _};

use crate::rvm::program::Program;

// Writing into a String cannot fail.
fn push_line(buf: &mut String, args: fmt::Arguments) {
    let _ = buf.write_fmt(args);
    let _ = buf.write_char('\n');
}

/// One instruction per line, prefixed by its index. Jumps also show the
/// index they land on.
pub fn generate_listing(program: &Program) -> String {
    let mut output = String::new();
    let width = program.len().to_string().len();
    for (pc, instruction) in program.instructions().iter().enumerate() {
        let text = instruction.to_string();
        match instruction.jump_offset() {
            Some(offset) => push_line(
                &mut output,
                format_args!("{pc:>width$}  {text:<24} -> {}", pc + 1 + offset),
            ),
            None => push_line(&mut output, format_args!("{pc:>width$}  {text}")),
        }
    }
    output
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&generate_listing(self))
    }
}
