// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The five concrete analyzer modules.

pub mod checksum;
pub mod checksum_file_write;
mod hashes;
pub mod inotify_file;
pub mod inotify_manager;
pub mod network_listener;
pub mod permission;

pub use checksum::ChecksumAnalyzer;
pub use checksum_file_write::ChecksumFileWriteAnalyzer;
pub use inotify_file::InotifyFileAnalyzer;
pub use network_listener::NetworkListenerAnalyzer;
pub use permission::PermissionAnalyzer;
