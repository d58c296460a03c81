// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The host-side Dispatcher: stages the shared NFS root, enumerates and
//! publishes work items, then fans out bounded-concurrency VM workers.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use pw_adapters::{BatchDescriptor, PackageManager, VmLaunchSpec, VmLauncher};
use pw_queue::WorkQueue;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::broker::NfsAnalysisConfig;
use crate::error::EngineError;

const INPUT_DIR: &str = "in";
const OUTPUT_DIR: &str = "out";
const LOG_DIR: &str = "log";
const CONFIG_FILE_NAME: &str = "analysis.config";
const LAUNCHER_FILE_NAME: &str = "nfs_launcher.sh";

/// Estimated VM boot/setup overhead subtracted from the requested VM timeout
/// before it becomes the guest's analysis timeout (`nfs_analysis_setup_agent.py`:
/// "We estimate that the VM startup and initial setup should take less than a
/// minute.").
pub const STARTUP_OVERHEAD: Duration = Duration::from_secs(60);

/// The host-side view of one batch run: where the shared NFS directory lives
/// on host and guest, and how each VM worker should be launched.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub host_nfs_share: PathBuf,
    pub guest_nfs_share: PathBuf,
    pub image: PathBuf,
    pub memory_mb: u32,
    pub timeout: Duration,
    pub text_output: bool,
    pub processes: usize,
    pub snapshot: bool,
}

/// Sets up the shared directory and fans out VM workers over a published
/// batch of packages.
pub struct Dispatcher {
    package_manager: Arc<dyn PackageManager>,
    vm_launcher: Arc<dyn VmLauncher>,
}

impl Dispatcher {
    pub fn new(package_manager: Arc<dyn PackageManager>, vm_launcher: Arc<dyn VmLauncher>) -> Self {
        Self {
            package_manager,
            vm_launcher,
        }
    }

    /// Ensure `in/`/`out/`/`log/`, copy the launcher script with
    /// owner-exec-only permissions, write the guest-visible config, enumerate
    /// candidates and publish them. Returns the job count; an empty match
    /// set is the caller's cue to abort with a non-zero exit.
    pub async fn set_up_analysis(
        &self,
        config: &DispatchConfig,
        batch: &BatchDescriptor,
        launcher_script_src: &Path,
    ) -> Result<usize, EngineError> {
        self.set_up_dirs(&config.host_nfs_share)?;
        self.copy_launcher(launcher_script_src, &config.host_nfs_share)?;
        self.write_config_file(config)?;

        let candidates = self
            .package_manager
            .enumerate_candidates(batch)
            .await
            .map_err(|e| EngineError::Fatal(format!("enumeration failed: {e}")))?;

        let queue = WorkQueue::new(
            config.host_nfs_share.join(INPUT_DIR),
            config.host_nfs_share.join(OUTPUT_DIR),
            config.text_output,
        );
        for package in &candidates {
            queue.publish(package)?;
        }
        info!(count = candidates.len(), "published batch of packages");
        Ok(candidates.len())
    }

    fn set_up_dirs(&self, host_nfs_share: &Path) -> Result<(), EngineError> {
        for dir in [INPUT_DIR, OUTPUT_DIR, LOG_DIR] {
            std::fs::create_dir_all(host_nfs_share.join(dir))?;
        }
        Ok(())
    }

    /// Remove any stale launcher before copying, then restrict it to
    /// owner-read-and-execute.
    fn copy_launcher(&self, src: &Path, host_nfs_share: &Path) -> Result<(), EngineError> {
        let dest = host_nfs_share.join(LAUNCHER_FILE_NAME);
        let _ = std::fs::remove_file(&dest);
        std::fs::copy(src, &dest)?;
        let mut perms = std::fs::metadata(&dest)?.permissions();
        perms.set_mode(0o500);
        std::fs::set_permissions(&dest, perms)?;
        Ok(())
    }

    fn write_config_file(&self, config: &DispatchConfig) -> Result<(), EngineError> {
        let analysis_config = NfsAnalysisConfig {
            input_dir: config.guest_nfs_share.join(INPUT_DIR),
            output_dir: config.guest_nfs_share.join(OUTPUT_DIR),
            log_dir: config.guest_nfs_share.join(LOG_DIR),
            text_output: config.text_output,
            timeout_secs: config.timeout.saturating_sub(STARTUP_OVERHEAD).as_secs(),
        };
        let path = config.host_nfs_share.join(CONFIG_FILE_NAME);
        pw_wire::write_message(&path, &analysis_config)?;
        Ok(())
    }

    /// Step 4-5: launch `job_count` VM workers, at most `config.processes` of
    /// them concurrently, and wait for all to finish. A worker's failure is
    /// logged and counted, never propagated. Returns the number of
    /// workers that failed or timed out.
    pub async fn run_batch(&self, config: &DispatchConfig, job_count: usize) -> usize {
        let workers = job_count.min(config.processes.max(1)).max(1);
        let semaphore = Arc::new(Semaphore::new(workers));
        let spec = VmLaunchSpec {
            image: config.image.clone(),
            memory_mb: config.memory_mb,
            nfs_guest: config.guest_nfs_share.clone(),
            extra_args: if config.snapshot {
                vec!["-snapshot".to_string()]
            } else {
                vec![]
            },
        };

        let mut handles = Vec::with_capacity(job_count);
        for _ in 0..job_count {
            let sem = semaphore.clone();
            let launcher = self.vm_launcher.clone();
            let spec = spec.clone();
            let timeout = config.timeout;
            handles.push(tokio::spawn(async move {
                let _permit = sem.acquire_owned().await;
                launcher.launch(&spec, timeout).await
            }));
        }

        let mut failures = 0;
        for handle in handles {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(error = %e, "VM worker failed");
                    failures += 1;
                }
                Err(e) => {
                    warn!(error = %e, "VM worker task panicked");
                    failures += 1;
                }
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pw_adapters::fake::FakePackageManager;
    use pw_adapters::vm_launcher::fake::FakeVmLauncher;
    use pw_core::model::Package;
    use tempfile::tempdir;

    #[tokio::test]
    async fn set_up_analysis_publishes_every_enumerated_candidate() {
        let dir = tempdir().expect("tempdir");
        let launcher_src = dir.path().join("launcher.sh");
        std::fs::write(&launcher_src, "#!/bin/sh\necho hi\n").expect("write launcher");

        let pm = Arc::new(FakePackageManager::new(vec![
            Package::new_available("foo", "1.0", "amd64"),
            Package::new_available("bar", "2.0", "amd64"),
        ]));
        let vm_launcher = Arc::new(FakeVmLauncher::default());
        let dispatcher = Dispatcher::new(pm, vm_launcher);

        let config = DispatchConfig {
            host_nfs_share: dir.path().join("host"),
            guest_nfs_share: PathBuf::from("/mnt/broker"),
            image: PathBuf::from("/var/lib/images/base.img"),
            memory_mb: 4096,
            timeout: Duration::from_secs(120),
            text_output: true,
            processes: 2,
            snapshot: true,
        };
        let batch = BatchDescriptor {
            name_regex: ".*".into(),
            architecture: "amd64".into(),
            max_count: 10,
        };

        let job_count = dispatcher
            .set_up_analysis(&config, &batch, &launcher_src)
            .await
            .expect("set_up_analysis");
        assert_eq!(job_count, 2);

        let queue = WorkQueue::new(
            config.host_nfs_share.join(INPUT_DIR),
            config.host_nfs_share.join(OUTPUT_DIR),
            true,
        );
        assert!(queue.claim().is_ok());
        assert!(queue.claim().is_ok());

        let launcher_dest = config.host_nfs_share.join(LAUNCHER_FILE_NAME);
        let mode = std::fs::metadata(&launcher_dest).expect("stat").permissions().mode();
        assert_eq!(mode & 0o777, 0o500);
    }

    #[tokio::test]
    async fn run_batch_counts_failures_without_propagating() {
        let pm = Arc::new(FakePackageManager::new(vec![]));
        let vm_launcher = Arc::new(FakeVmLauncher {
            fail: true,
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(pm, vm_launcher);
        let config = DispatchConfig {
            host_nfs_share: PathBuf::from("/tmp/unused"),
            guest_nfs_share: PathBuf::from("/mnt/broker"),
            image: PathBuf::from("/var/lib/images/base.img"),
            memory_mb: 4096,
            timeout: Duration::from_secs(120),
            text_output: true,
            processes: 2,
            snapshot: true,
        };
        let failures = dispatcher.run_batch(&config, 3).await;
        assert_eq!(failures, 3);
    }
}
