// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("package manager error: {0}")]
    PackageManager(String),

    #[error("service manager error: {0}")]
    ServiceManager(String),

    #[error("vm launcher error: {0}")]
    VmLauncher(String),

    #[error("file classifier error: {0}")]
    FileClassifier(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
