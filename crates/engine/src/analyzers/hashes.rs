// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content hashing shared by the Checksum and ChecksumFileWrite analyzers.

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksums {
    pub md5: String,
    pub sha1: String,
    pub sha256: String,
}

/// Hash `contents` with all three digests `FileResultState` carries (md5,
/// sha1, sha256).
pub fn hash_all(contents: &[u8]) -> Checksums {
    let md5 = format!("{:x}", Md5::digest(contents));
    let sha1 = format!("{:x}", Sha1::digest(contents));
    let sha256 = format!("{:x}", Sha256::digest(contents));
    Checksums { md5, sha1, sha256 }
}

pub fn sha256_hex(contents: &[u8]) -> String {
    format!("{:x}", Sha256::digest(contents))
}
