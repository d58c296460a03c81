// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunbookError {
    #[error("unable to glob descriptor pattern {0}")]
    GlobPattern(String),

    #[error("glob error: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
