// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The trigger state machine driving a package through its lifecycle.

use std::path::Path;
use std::time::Duration;

use pw_adapters::{PackageFetch, PackageManager, ServiceManager};
use pw_core::clock::Clock;
use pw_core::model::Package;
use pw_core::trigger::{Trigger, TRIGGER_ORDER};
use tempfile::TempDir;

use crate::error::EngineError;

/// Sequences the lifecycle triggers in `TRIGGER_ORDER`, owning the temp
/// directories, package cache handle, and service manager.
/// `RunBinaries`'s actual binary launch is driven by the
/// Broker (it needs the process-wide package-binaries set this type does not
/// own) — `run_next_trigger` only reports the trigger id for that state.
pub struct TriggerManager<'a, C: Clock> {
    package_manager: &'a dyn PackageManager,
    service_manager: ServiceManager,
    clock: C,
    fetch_dir: TempDir,
    extract_dir: TempDir,
    strace: bool,
    index: usize,
}

impl<'a, C: Clock> TriggerManager<'a, C> {
    pub fn new(package_manager: &'a dyn PackageManager, clock: C, strace: bool) -> Result<Self, EngineError> {
        let fetch_dir = tempfile::Builder::new()
            .prefix("pw-fetch-")
            .tempdir()
            .map_err(EngineError::Io)?;
        let extract_dir = tempfile::Builder::new()
            .prefix("pw-extract-")
            .tempdir()
            .map_err(EngineError::Io)?;
        Ok(Self {
            package_manager,
            service_manager: ServiceManager::new(),
            clock,
            fetch_dir,
            extract_dir,
            strace,
            index: 0,
        })
    }

    pub fn extract_dir(&self) -> &Path {
        self.extract_dir.path()
    }

    pub fn service_manager(&self) -> &ServiceManager {
        &self.service_manager
    }

    /// Setup: stamp `section`, `description`, and `analysis_start`, and
    /// fetch the package archive for exactly the requested `(name,
    /// version, arch)`.
    pub async fn set_up_triggers_and_metadata(
        &mut self,
        package: &mut Package,
    ) -> Result<PackageFetch, EngineError> {
        package.analysis_start = Some(self.clock.epoch_secs());
        let fetch = self
            .package_manager
            .fetch(package, self.fetch_dir.path())
            .await
            .map_err(|e| EngineError::Fatal(format!("fetch failed: {e}")))?;
        package.section = fetch.section.clone();
        package.description = fetch.description.clone();
        Ok(fetch)
    }

    /// Advance by one trigger, running its side effect (where this type
    /// owns it) and returning the trigger id, or `None` past the terminal
    /// state.
    pub async fn run_next_trigger(
        &mut self,
        package: &mut Package,
        fetch: &PackageFetch,
    ) -> Result<Option<Trigger>, EngineError> {
        if self.index >= TRIGGER_ORDER.len() {
            return Ok(None);
        }
        let trigger = TRIGGER_ORDER[self.index];
        self.index += 1;

        match trigger {
            Trigger::Extract => {
                self.package_manager
                    .extract(fetch, self.extract_dir.path())
                    .await
                    .map_err(|e| EngineError::Fatal(format!("extract failed: {e}")))?;
            }
            Trigger::Install => {
                self.service_manager
                    .record_services()
                    .await
                    .map_err(|e| EngineError::Fatal(format!("record_services failed: {e}")))?;
                self.package_manager
                    .install(package)
                    .await
                    .map_err(|e| EngineError::Fatal(format!("install failed: {e}")))?;
                self.service_manager
                    .record_new_services()
                    .await
                    .map_err(|e| EngineError::Fatal(format!("record_new_services failed: {e}")))?;
            }
            Trigger::StopService => {
                self.service_manager
                    .stop_new_services(self.strace)
                    .await
                    .map_err(|e| EngineError::Fatal(format!("stop_new_services failed: {e}")))?;
            }
            Trigger::StartService => {
                self.service_manager
                    .start_new_services(self.strace)
                    .await
                    .map_err(|e| EngineError::Fatal(format!("start_new_services failed: {e}")))?;
            }
            Trigger::RunBinaries => {
                // Left to the Broker — see the type-level doc comment.
            }
            Trigger::Remove => {
                self.package_manager
                    .remove(package, false)
                    .await
                    .map_err(|e| EngineError::Fatal(format!("remove failed: {e}")))?;
            }
            Trigger::Purge => {
                self.package_manager
                    .remove(package, true)
                    .await
                    .map_err(|e| EngineError::Fatal(format!("purge failed: {e}")))?;
            }
        }
        Ok(Some(trigger))
    }
}

/// RunBinaries' fixed default timeout, exported for the Broker's call into
/// [`crate::binary_launcher::run_binaries`].
pub const RUN_BINARIES_TIMEOUT: Duration = crate::binary_launcher::DEFAULT_RUN_BINARIES_TIMEOUT;

#[cfg(test)]
mod tests {
    use super::*;
    use pw_adapters::fake::FakePackageManager;
    use pw_core::clock::FakeClock;
    use pw_core::trigger::TRIGGER_ORDER;

    #[tokio::test]
    async fn runs_triggers_in_the_fixed_order() {
        let pm = FakePackageManager::new(vec![]);
        let mut tm = TriggerManager::new(&pm, FakeClock::new(), false).expect("new");
        let mut package = Package::new_available("foo", "1.0", "amd64");
        let fetch = tm.set_up_triggers_and_metadata(&mut package).await.expect("setup");
        assert!(package.analysis_start.is_some());
        assert_eq!(package.section, "fake-section");
        assert_eq!(package.description, "fake description of foo");

        let mut seen = Vec::new();
        while let Some(trigger) = tm.run_next_trigger(&mut package, &fetch).await.expect("run") {
            seen.push(trigger);
        }
        assert_eq!(seen, TRIGGER_ORDER.to_vec());
    }
}
