// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test-only builders shared across crates, gated behind
//! `#[cfg(any(test, feature = "test-support"))]`.

use crate::model::{Package, PackageStatus};

impl Package {
    /// Build a package with test defaults, overriding only what a test cares
    /// about.
    pub fn test_default(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: "1.0".to_string(),
            architecture: "amd64".to_string(),
            section: String::new(),
            description: String::new(),
            status: PackageStatus::Available,
            error: None,
            analysis_attempts: 0,
            analysis_start: None,
            analysis_end: None,
        }
    }
}
