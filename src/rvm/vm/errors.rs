// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

/// VM execution errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    #[error("unsupported operand type(s) for {op}: '{left}' and '{right}'")]
    UnsupportedOperands {
        op: &'static str,
        left: String,
        right: String,
    },

    #[error("bad operand type for unary {op}: '{operand}'")]
    UnsupportedOperand { op: &'static str, operand: String },

    #[error("'{op}' not supported between instances of '{left}' and '{right}'")]
    Unorderable {
        op: &'static str,
        left: String,
        right: String,
    },

    #[error("argument of type '{type_name}' is not a container")]
    NotAContainer { type_name: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow in {op}")]
    IntegerOverflow { op: &'static str },

    #[error("repeated sequence would exceed {limit} elements")]
    SequenceTooLarge { limit: usize },

    #[error("negative shift count")]
    NegativeShiftCount,

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("key {key} not found")]
    KeyNotFound { key: String },

    #[error("'{container}' indices must be integers, not '{index}'")]
    InvalidIndex { container: String, index: String },

    #[error("'{type_name}' object is not subscriptable")]
    NotSubscriptable { type_name: String },

    #[error("'{type_name}' object has no attribute '{name}'")]
    MissingAttribute { type_name: String, name: String },

    #[error("'{type_name}' object is not callable")]
    NotCallable { type_name: String },

    #[error("{name}() failed: {message}")]
    CallFailed { name: String, message: String },

    #[error("host object error: {0}")]
    HostError(String),

    #[error("rule recursion detected: {}", .chain.join(" -> "))]
    RuleRecursion { chain: Vec<String> },

    #[error("rule() expects exactly one rule name string, got {got}")]
    InvalidRuleArgument { got: String },

    #[error("authorization attribute '{name}' assigned before the authorization result")]
    AuthorizationNotSet { name: String },

    #[error("stack underflow at instruction {pc}")]
    StackUnderflow { pc: usize },

    #[error("jump from instruction {pc} by {offset} leaves the program (length {len})")]
    InvalidJump { pc: usize, offset: usize, len: usize },

    #[error("Internal VM error: {0}")]
    Internal(String),
}

impl VmError {
    pub(crate) fn call_failed(name: &str, err: anyhow::Error) -> Self {
        VmError::CallFailed {
            name: name.to_string(),
            message: format!("{err:#}"),
        }
    }

    pub(crate) fn host(err: anyhow::Error) -> Self {
        VmError::HostError(format!("{err:#}"))
    }
}

pub type Result<T> = core::result::Result<T, VmError>;
