// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// A stack machine for executing compiled rules.

pub mod instructions;
pub mod program;
pub mod vm;
