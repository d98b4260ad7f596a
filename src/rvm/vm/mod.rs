// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

pub(crate) mod access;
pub(crate) mod arithmetic;
pub(crate) mod comparison;
mod context;
mod dispatch;
mod errors;
mod machine;
mod rules;

pub use context::EvalContext;
pub use errors::{Result, VmError};
pub use machine::execute;
pub use rules::call_rule;
