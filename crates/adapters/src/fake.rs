// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fakes for exercising the engine without a real package manager, gated
//! behind `test-support`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use pw_core::model::Package;

use crate::error::AdapterError;
use crate::package_manager::{BatchDescriptor, PackageFetch, PackageManager};

pub struct FakePackageManager {
    pub candidates: Vec<Package>,
    pub fail_install: bool,
    pub installed: Mutex<Vec<String>>,
}

impl FakePackageManager {
    pub fn new(candidates: Vec<Package>) -> Self {
        Self {
            candidates,
            fail_install: false,
            installed: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PackageManager for FakePackageManager {
    async fn enumerate_candidates(
        &self,
        batch: &BatchDescriptor,
    ) -> Result<Vec<Package>, AdapterError> {
        Ok(self
            .candidates
            .iter()
            .filter(|p| p.architecture == batch.architecture)
            .take(batch.max_count)
            .cloned()
            .collect())
    }

    async fn fetch(&self, package: &Package, dest_dir: &Path) -> Result<PackageFetch, AdapterError> {
        let archive_path = dest_dir.join(format!("{}.pkg", package.basename()));
        std::fs::write(&archive_path, b"fake archive contents")?;
        Ok(PackageFetch {
            archive_path,
            section: "fake-section".to_string(),
            description: format!("fake description of {}", package.name),
        })
    }

    async fn install(&self, package: &Package) -> Result<(), AdapterError> {
        if self.fail_install {
            return Err(AdapterError::PackageManager("install failed".into()));
        }
        self.installed.lock().push(package.basename());
        Ok(())
    }

    async fn remove(&self, package: &Package, _purge: bool) -> Result<(), AdapterError> {
        self.installed.lock().retain(|n| n != &package.basename());
        Ok(())
    }

    async fn extract(&self, fetch: &PackageFetch, dest_dir: &Path) -> Result<(), AdapterError> {
        std::fs::create_dir_all(dest_dir)?;
        let contents = std::fs::read(&fetch.archive_path)?;
        std::fs::write(dest_dir.join("extracted.marker"), contents)?;
        Ok(())
    }
}

pub fn fake_archive_dir() -> PathBuf {
    std::env::temp_dir()
}
