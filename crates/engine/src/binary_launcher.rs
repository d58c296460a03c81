// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RunBinaries: executing every argument-resolved binary under a bounded
//! timeout, independent of its exit status.

use std::collections::HashSet;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use pw_adapters::ServiceManager;
use pw_shell::{probes, subprocess::run_with_timeout};
use tracing::{info, warn};

use crate::analyzer::PackageBinaries;
use crate::error::EngineError;

pub const DEFAULT_RUN_BINARIES_TIMEOUT: Duration = Duration::from_secs(60);

/// Binaries already executed by the traced service start/stop actions, as
/// absolute paths.
fn already_executed(service_manager: &ServiceManager) -> HashSet<PathBuf> {
    let mut executed = HashSet::new();
    for action in ["start", "stop"] {
        for path in service_manager.strace_paths(action) {
            let Ok(contents) = std::fs::read_to_string(&path) else {
                continue;
            };
            executed.extend(probes::detect_executed_binaries(&contents).into_iter().map(PathBuf::from));
        }
    }
    executed
}

/// Invoke every package binary not already executed during service control,
/// skipping shared objects, each under a bounded subprocess with output
/// discarded.
pub async fn run_binaries(
    package_binaries: &PackageBinaries,
    service_manager: &ServiceManager,
    timeout: Duration,
) -> Result<(), EngineError> {
    let executed = already_executed(service_manager);
    let mut relative_paths: Vec<PathBuf> = package_binaries.snapshot().into_iter().collect();
    relative_paths.sort();

    for relative in relative_paths {
        if relative.extension().and_then(|e| e.to_str()) == Some("so") {
            continue;
        }
        let absolute = PathBuf::from("/").join(&relative);
        if executed.contains(&absolute) {
            continue;
        }
        let Some(binary_str) = absolute.to_str() else {
            continue;
        };
        let mut cmd = probes::sudo_binary_command(binary_str);
        cmd.stdout(Stdio::null()).stderr(Stdio::null());
        info!(binary = binary_str, "launching package binary");
        match run_with_timeout(cmd, timeout).await {
            Ok(output) if !output.status.success() => {
                warn!(binary = binary_str, code = ?output.status.code(), "binary exited non-zero");
            }
            Err(e) => warn!(binary = binary_str, error = %e, "could not launch binary"),
            _ => {}
        }
    }
    Ok(())
}
