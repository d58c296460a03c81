// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded subprocess execution. Every suspension point (service control,
//! binary launch, external probes) goes through this one function so
//! timeout behavior is uniform across the broker.

use std::process::Output;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

pub const DEFAULT_BINARY_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_SERVICE_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum SubprocessError {
    #[error("command timed out after {0:?}")]
    TimedOut(Duration),

    #[error("failed to launch command: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Run `command` to completion, killing it and returning
/// [`SubprocessError::TimedOut`] if it does not finish within `timeout`.
pub async fn run_with_timeout(
    mut command: Command,
    timeout: Duration,
) -> Result<Output, SubprocessError> {
    match tokio::time::timeout(timeout, command.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(SubprocessError::Spawn(e)),
        Err(_) => Err(SubprocessError::TimedOut(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn succeeds_within_timeout() {
        let mut cmd = Command::new("/bin/echo");
        cmd.arg("hi");
        let out = run_with_timeout(cmd, Duration::from_secs(5))
            .await
            .expect("should succeed");
        assert!(out.status.success());
    }

    #[tokio::test]
    async fn times_out_slow_command() {
        let mut cmd = Command::new("/bin/sleep");
        cmd.arg("5");
        let result = run_with_timeout(cmd, Duration::from_millis(50)).await;
        assert!(matches!(result, Err(SubprocessError::TimedOut(_))));
    }
}
