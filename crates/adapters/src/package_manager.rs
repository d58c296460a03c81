// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The package-manager collaborator: candidate enumeration, fetch, install,
//! remove, and purge, generalized behind a trait so the engine never
//! depends on a concrete package manager.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use pw_core::model::Package;
use pw_shell::{probes, subprocess::run_with_timeout};
use serde::{Deserialize, Serialize};

use crate::error::AdapterError;

/// The locally fetched package archive plus the section/description
/// metadata Setup stamps onto the package descriptor.
#[derive(Debug, Clone)]
pub struct PackageFetch {
    pub archive_path: PathBuf,
    pub section: String,
    pub description: String,
}

/// A batch descriptor driving candidate enumeration: `(name_regex,
/// architecture, max_count)`. Text-encoded structured message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchDescriptor {
    pub name_regex: String,
    pub architecture: String,
    pub max_count: usize,
}

#[async_trait]
pub trait PackageManager: Send + Sync {
    /// Enumerate candidate packages: skip virtual packages, filter by name
    /// regex, keep only versions matching `architecture`, stop at
    /// `max_count`.
    async fn enumerate_candidates(
        &self,
        batch: &BatchDescriptor,
    ) -> Result<Vec<Package>, AdapterError>;

    /// Fetch the archive for exactly `(name, version, architecture)` into
    /// `dest_dir`.
    async fn fetch(&self, package: &Package, dest_dir: &Path) -> Result<PackageFetch, AdapterError>;

    async fn install(&self, package: &Package) -> Result<(), AdapterError>;
    async fn remove(&self, package: &Package, purge: bool) -> Result<(), AdapterError>;

    /// Expand a fetched archive into `dest_dir`. Any
    /// extraction error is fatal for the run.
    async fn extract(&self, fetch: &PackageFetch, dest_dir: &Path) -> Result<(), AdapterError>;
}

/// Pure enumeration logic, factored out of any concrete adapter so it is
/// testable without a package-manager connection. `candidates` models the
/// raw `(name, version, architecture, is_virtual)` rows a real adapter would
/// list.
pub fn enumerate_candidates(
    candidates: &[(String, String, String, bool)],
    batch: &BatchDescriptor,
) -> Result<Vec<Package>, AdapterError> {
    let re = regex::Regex::new(&batch.name_regex)
        .map_err(|e| AdapterError::PackageManager(format!("bad name regex: {e}")))?;
    let mut out = Vec::new();
    for (name, version, arch, is_virtual) in candidates {
        if *is_virtual {
            continue;
        }
        if !re.is_match(name) {
            continue;
        }
        if arch != &batch.architecture {
            continue;
        }
        out.push(Package::new_available(name, version, arch));
        if out.len() >= batch.max_count {
            break;
        }
    }
    Ok(out)
}

/// The concrete Debian-archive package manager adapter: `apt-cache
/// dumpavail` for enumeration, `apt-get` download/install/remove/purge, and
/// `dpkg-deb` extraction.
pub struct DebPackageManager;

#[async_trait]
impl PackageManager for DebPackageManager {
    async fn enumerate_candidates(
        &self,
        batch: &BatchDescriptor,
    ) -> Result<Vec<Package>, AdapterError> {
        let cmd = probes::apt_cache_dumpavail_command();
        let output = run_with_timeout(cmd, Duration::from_secs(60))
            .await
            .map_err(|e| AdapterError::PackageManager(format!("apt-cache dumpavail failed: {e}")))?;
        if !output.status.success() {
            return Err(AdapterError::PackageManager(format!(
                "apt-cache dumpavail exited with {:?}",
                output.status.code()
            )));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let candidates = probes::parse_apt_cache_dumpavail(&stdout);
        enumerate_candidates(&candidates, batch)
    }

    async fn fetch(&self, package: &Package, dest_dir: &Path) -> Result<PackageFetch, AdapterError> {
        std::fs::create_dir_all(dest_dir)?;
        let cmd = probes::apt_get_download_command(&package.name, &package.version, dest_dir);
        let output = run_with_timeout(cmd, Duration::from_secs(120))
            .await
            .map_err(|e| AdapterError::PackageManager(format!("fetch failed: {e}")))?;
        if !output.status.success() {
            return Err(AdapterError::PackageManager(format!(
                "apt-get download exited with {:?}",
                output.status.code()
            )));
        }
        let archive_path = dest_dir.join(format!(
            "{}_{}_{}.deb",
            package.name, package.version, package.architecture
        ));

        let show_cmd = probes::apt_cache_show_command(&package.name, &package.version);
        let show_output = run_with_timeout(show_cmd, Duration::from_secs(30))
            .await
            .map_err(|e| AdapterError::PackageManager(format!("apt-cache show failed: {e}")))?;
        let (section, description) = if show_output.status.success() {
            probes::parse_apt_cache_show(&String::from_utf8_lossy(&show_output.stdout))
        } else {
            (String::new(), String::new())
        };

        Ok(PackageFetch { archive_path, section, description })
    }

    async fn install(&self, package: &Package) -> Result<(), AdapterError> {
        let cmd = probes::apt_get_install_command(&package.name, &package.version);
        let output = run_with_timeout(cmd, Duration::from_secs(300))
            .await
            .map_err(|e| AdapterError::PackageManager(format!("install failed: {e}")))?;
        if !output.status.success() {
            return Err(AdapterError::PackageManager(format!(
                "apt-get install exited with {:?}",
                output.status.code()
            )));
        }
        Ok(())
    }

    async fn remove(&self, package: &Package, purge: bool) -> Result<(), AdapterError> {
        let cmd = probes::apt_get_remove_command(&package.name, purge);
        let output = run_with_timeout(cmd, Duration::from_secs(120))
            .await
            .map_err(|e| AdapterError::PackageManager(format!("remove failed: {e}")))?;
        if !output.status.success() {
            return Err(AdapterError::PackageManager(format!(
                "apt-get remove exited with {:?}",
                output.status.code()
            )));
        }
        Ok(())
    }

    async fn extract(&self, fetch: &PackageFetch, dest_dir: &Path) -> Result<(), AdapterError> {
        std::fs::create_dir_all(dest_dir)?;
        let cmd = probes::dpkg_deb_extract_command(&fetch.archive_path, dest_dir);
        let output = run_with_timeout(cmd, Duration::from_secs(120))
            .await
            .map_err(|e| AdapterError::PackageManager(format!("extract failed: {e}")))?;
        if !output.status.success() {
            return Err(AdapterError::PackageManager(format!(
                "dpkg-deb -x exited with {:?}",
                output.status.code()
            )));
        }
        Ok(())
    }
}
