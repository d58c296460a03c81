// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scratch-directory naming helpers.

/// Generate a short random suffix for temp-directory names, in the style
/// `tempfile::Builder` callers typically tag scratch dirs with.
pub fn scratch_suffix() -> String {
    nanoid::nanoid!(8)
}
