// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pw-shell: bounded subprocess execution and the external-probe command
//! builders/parsers the guest side shells out to.

pub mod probes;
pub mod subprocess;

pub use subprocess::{run_with_timeout, SubprocessError};
