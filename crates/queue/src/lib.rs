// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pw-queue: the shared-directory work queue.
//!
//! `in/` holds one descriptor file per pending work item. `out/` holds, for
//! each item, a sentinel `<basename>.pending` file whose presence means
//! "claimed". The only correctness requirement is that sentinel creation is
//! exclusive-create-atomic on the underlying filesystem — this module never
//! substitutes a best-effort "check then create" for that primitive
//! (`OpenOptions::create_new`, which uses `O_CREAT | O_EXCL | O_WRONLY`).

pub mod error;
pub mod queue;
pub mod result_io;

pub use error::QueueError;
pub use queue::{ClaimedItem, WorkQueue};
pub use result_io::ResultWriter;
