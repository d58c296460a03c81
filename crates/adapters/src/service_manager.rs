// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service detection and control.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use pw_shell::probes;
use pw_shell::subprocess::{run_with_timeout, DEFAULT_SERVICE_TIMEOUT};
use tracing::{error, info};

use crate::error::AdapterError;

pub struct ServiceManager {
    services: HashSet<String>,
    new_services: HashSet<String>,
    strace_dir: Option<PathBuf>,
}

impl Default for ServiceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceManager {
    pub fn new() -> Self {
        Self {
            services: HashSet::new(),
            new_services: HashSet::new(),
            strace_dir: None,
        }
    }

    /// Record the services installed on the system before install.
    pub async fn record_services(&mut self) -> Result<(), AdapterError> {
        self.services = Self::determine_service_list().await?.into_iter().collect();
        Ok(())
    }

    /// Record the set of new services: must be called after
    /// `record_services` and after install has run.
    pub async fn record_new_services(&mut self) -> Result<(), AdapterError> {
        let after: HashSet<String> = Self::determine_service_list().await?.into_iter().collect();
        self.new_services = after.difference(&self.services).cloned().collect();
        Ok(())
    }

    pub fn new_services(&self) -> &HashSet<String> {
        &self.new_services
    }

    async fn determine_service_list() -> Result<Vec<String>, AdapterError> {
        let cmd = probes::service_status_all_command();
        let output = run_with_timeout(cmd, DEFAULT_SERVICE_TIMEOUT)
            .await
            .map_err(|e| AdapterError::ServiceManager(format!("could not determine services: {e}")))?;
        Ok(probes::parse_service_list(&String::from_utf8_lossy(
            &output.stdout,
        )))
    }

    pub async fn start_new_services(&mut self, strace: bool) -> Result<(), AdapterError> {
        let services: Vec<String> = self.new_services.iter().cloned().collect();
        for service in services {
            info!(service = %service, "starting service");
            self.perform_service_action(&service, "start", strace).await;
        }
        Ok(())
    }

    pub async fn stop_new_services(&mut self, strace: bool) -> Result<(), AdapterError> {
        let services: Vec<String> = self.new_services.iter().cloned().collect();
        for service in services {
            info!(service = %service, "stopping service");
            self.perform_service_action(&service, "stop", strace).await;
        }
        Ok(())
    }

    async fn perform_service_action(&mut self, service: &str, action: &str, strace: bool) {
        let strace_file = if strace {
            Some(self.strace_file_path(action, service))
        } else {
            None
        };
        let cmd = probes::service_action_command(
            service,
            action,
            strace_file.as_ref().and_then(|p| p.to_str()),
        );
        match run_with_timeout(cmd, Duration::from_secs(120)).await {
            Ok(output) if !output.status.success() => {
                error!(service, action, code = ?output.status.code(), "service action failed")
            }
            Err(e) => error!(service, action, error = %e, "could not perform service action"),
            _ => {}
        }
    }

    fn strace_file_path(&mut self, action: &str, service: &str) -> PathBuf {
        let dir = self.strace_dir.get_or_insert_with(|| {
            std::env::temp_dir().join(format!("pw-strace-{}", pw_core::ids::scratch_suffix()))
        });
        std::fs::create_dir_all(dir).ok();
        dir.join(format!("{action}_{service}"))
    }

    /// Paths to strace output files for a given action (start/stop), used by
    /// the binary launcher to subtract already-executed binaries.
    pub fn strace_paths(&self, action: &str) -> Vec<PathBuf> {
        let Some(dir) = &self.strace_dir else {
            return Vec::new();
        };
        let prefix = format!("{action}_");
        std::fs::read_dir(dir)
            .into_iter()
            .flatten()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&prefix))
            })
            .collect()
    }
}
