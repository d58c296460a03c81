// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pw-wire: structured-message encoding.
//!
//! Files whose name ends with `.dat` are binary-encoded structured
//! messages; all others are text-encoded. Binary framing is a 4-byte
//! big-endian length prefix followed by a JSON payload; text framing is
//! plain pretty-printed JSON, one document per file. Reads fail safely on
//! decode error: callers get a [`WireError`] to log and skip rather than a
//! panic.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("truncated binary frame: expected {expected} bytes, got {got}")]
    TruncatedFrame { expected: usize, got: usize },
}

/// Whether a message should be read/written as binary-framed (`.dat`) or
/// plain text JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Text,
    Binary,
}

impl Encoding {
    /// Derive encoding from a path's extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("dat") => Encoding::Binary,
            _ => Encoding::Text,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Encoding::Text => "txt",
            Encoding::Binary => "dat",
        }
    }
}

/// Append the appropriate suffix to `base` if it does not already carry a
/// recognized one.
pub fn with_suffix(base: &Path, encoding: Encoding) -> std::path::PathBuf {
    match base.extension().and_then(|e| e.to_str()) {
        Some("txt") | Some("dat") => base.to_path_buf(),
        _ => {
            let mut s = base.as_os_str().to_os_string();
            s.push(".");
            s.push(encoding.suffix());
            std::path::PathBuf::from(s)
        }
    }
}

fn encode<T: Serialize>(value: &T, encoding: Encoding) -> Result<Vec<u8>, WireError> {
    match encoding {
        Encoding::Text => {
            let mut body = serde_json::to_vec_pretty(value)?;
            body.push(b'\n');
            Ok(body)
        }
        Encoding::Binary => {
            let payload = serde_json::to_vec(value)?;
            let mut framed = Vec::with_capacity(4 + payload.len());
            framed.extend_from_slice(&(payload.len() as u32).to_be_bytes());
            framed.extend_from_slice(&payload);
            Ok(framed)
        }
    }
}

fn decode<T: DeserializeOwned>(bytes: &[u8], encoding: Encoding) -> Result<T, WireError> {
    match encoding {
        Encoding::Text => Ok(serde_json::from_slice(bytes)?),
        Encoding::Binary => {
            if bytes.len() < 4 {
                return Err(WireError::TruncatedFrame {
                    expected: 4,
                    got: bytes.len(),
                });
            }
            let len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
            let payload = &bytes[4..];
            if payload.len() < len {
                return Err(WireError::TruncatedFrame {
                    expected: len,
                    got: payload.len(),
                });
            }
            Ok(serde_json::from_slice(&payload[..len])?)
        }
    }
}

/// Write `value` atomically to `path` (write to `<path>.tmp` then rename),
/// encoding chosen by `path`'s extension.
pub fn write_message<T: Serialize>(path: &Path, value: &T) -> Result<(), WireError> {
    let encoding = Encoding::from_path(path);
    let bytes = encode(value, encoding)?;
    let tmp = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|e| e.to_str()).unwrap_or("tmp")
    ));
    {
        use std::io::Write;
        let mut f = std::fs::File::create(&tmp)?;
        f.write_all(&bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Read and decode a structured message, failing safely (returning a
/// [`WireError`] rather than panicking) on any I/O or decode problem.
pub fn read_message<T: DeserializeOwned>(path: &Path) -> Result<T, WireError> {
    let encoding = Encoding::from_path(path);
    let bytes = std::fs::read(path)?;
    decode(&bytes, encoding)
}

/// Size-capped raw read: a file larger than `limit` bytes returns `Ok(None)`
/// ("no contents") rather than a truncated value.
pub fn read_capped(path: &Path, limit: u64) -> Result<Option<Vec<u8>>, WireError> {
    let meta = std::fs::metadata(path)?;
    if meta.len() > limit {
        return Ok(None);
    }
    let mut f = std::fs::File::open(path)?;
    let mut buf = Vec::with_capacity(meta.len() as usize);
    f.read_to_end(&mut buf)?;
    Ok(Some(buf))
}
