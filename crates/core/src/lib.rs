// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pw-core: shared data model for the packwheel package-installation sandbox.
//!
//! This crate owns the structured-message types (`Trigger`, `Package`,
//! `AnalysisDescriptor`, `FileResult`, `ApplicationResult`, scoring types,
//! ...) plus the small ambient utilities (`Clock`, ids) every other crate
//! depends on.

pub mod macros;

pub mod clock;
pub mod ids;
pub mod model;
pub mod score;
pub mod trigger;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use model::{
    AnalysisDescriptor, Argument, FileResultState, FileType, NetworkResult, Package,
    PackageStatus, PreparedArgument, ResultKind,
};
pub use score::{DetailedPackageScore, FileResultScoreDictionaryEntry, PackageLevelFileScore};
pub use trigger::{DiffPair, Trigger, TRIGGER_ORDER};
