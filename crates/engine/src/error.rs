// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Recoverable analyzer outcomes are logged and the broker continues;
/// fatal outcomes abort the run and finalize with `FAILED`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("recoverable analysis error: {0}")]
    Recoverable(String),

    #[error("fatal analysis error: {0}")]
    Fatal(String),

    #[error("trigger error: {0}")]
    Trigger(String),

    #[error("no next trigger")]
    NoNextTrigger,

    #[error("adapter error: {0}")]
    Adapter(#[from] pw_adapters::AdapterError),

    #[error("wire error: {0}")]
    Wire(#[from] pw_wire::WireError),

    #[error("queue error: {0}")]
    Queue(#[from] pw_queue::QueueError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn is_fatal(&self) -> bool {
        !matches!(self, EngineError::Recoverable(_))
    }
}
