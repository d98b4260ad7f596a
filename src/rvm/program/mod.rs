// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

mod core;
mod listing;

pub use core::Program;
pub use listing::generate_listing;
