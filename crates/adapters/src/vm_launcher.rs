// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The hypervisor collaborator: `start(cmd, timeout) → success/fail` plus a
//! writable shared directory visible inside the guest, generalized behind a
//! trait so the Dispatcher never depends on a concrete hypervisor.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::AdapterError;

/// One VM worker invocation: the image to boot plus the guest-visible mount
/// point of the shared directory.
#[derive(Debug, Clone)]
pub struct VmLaunchSpec {
    pub image: PathBuf,
    pub memory_mb: u32,
    pub nfs_guest: PathBuf,
    pub extra_args: Vec<String>,
}

#[async_trait]
pub trait VmLauncher: Send + Sync {
    /// Boot one VM worker and wait for it to finish, bounded by `timeout`
    ///. A
    /// worker that errors or times out is logged and counted, never
    /// propagated to abort the batch.
    async fn launch(&self, spec: &VmLaunchSpec, timeout: Duration) -> Result<(), AdapterError>;
}

/// Launches VM workers via a configured hypervisor command (e.g. `qemu-kvm`),
/// bounded by `pw_shell::run_with_timeout`.
pub struct ProcessVmLauncher {
    pub command: PathBuf,
}

#[async_trait]
impl VmLauncher for ProcessVmLauncher {
    async fn launch(&self, spec: &VmLaunchSpec, timeout: Duration) -> Result<(), AdapterError> {
        let mut cmd = tokio::process::Command::new(&self.command);
        cmd.arg("-hda")
            .arg(&spec.image)
            .arg("-m")
            .arg(spec.memory_mb.to_string())
            .args(&spec.extra_args);
        info!(image = %spec.image.display(), "launching VM worker");
        let output = pw_shell::run_with_timeout(cmd, timeout)
            .await
            .map_err(|e| AdapterError::VmLauncher(format!("VM worker failed: {e}")))?;
        if !output.status.success() {
            warn!(code = ?output.status.code(), "VM worker exited non-zero");
            return Err(AdapterError::VmLauncher(format!(
                "VM worker exited with {:?}",
                output.status.code()
            )));
        }
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;

    /// Records every launch call instead of spawning a real VM, so the
    /// Dispatcher's fan-out logic can be exercised without a hypervisor.
    #[derive(Default)]
    pub struct FakeVmLauncher {
        pub fail: bool,
        pub launches: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl VmLauncher for FakeVmLauncher {
        async fn launch(&self, spec: &VmLaunchSpec, _timeout: Duration) -> Result<(), AdapterError> {
            self.launches.lock().push(spec.image.clone());
            if self.fail {
                return Err(AdapterError::VmLauncher("fake VM launch failure".into()));
            }
            Ok(())
        }
    }
}
