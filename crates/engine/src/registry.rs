// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Analyzer registry: maps analyzer identifier strings to factory
//! functions. No runtime reflection is required.

use std::collections::HashMap;
use std::sync::Arc;

use crate::analyzer::Analyzer;
use crate::analyzers::inotify_manager::NotifyInotifyManager;
use crate::analyzers::{
    ChecksumAnalyzer, ChecksumFileWriteAnalyzer, InotifyFileAnalyzer, NetworkListenerAnalyzer,
    PermissionAnalyzer,
};
use crate::error::EngineError;

type AnalyzerFactory = Box<dyn Fn() -> Result<Box<dyn Analyzer>, EngineError> + Send + Sync>;

pub struct AnalyzerRegistry {
    factories: HashMap<String, AnalyzerFactory>,
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::with_builtin_analyzers()
    }
}

impl AnalyzerRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// The registry used in production, wiring every built-in analyzer's
    /// module name.
    pub fn with_builtin_analyzers() -> Self {
        let mut registry = Self::new();
        registry.register("checksum", || Ok(Box::new(ChecksumAnalyzer::new())));
        registry.register("checksum_file_write", || {
            Ok(Box::new(ChecksumFileWriteAnalyzer::new(true)))
        });
        registry.register("permission", || Ok(Box::new(PermissionAnalyzer::new())));
        registry.register("network_listener", || Ok(Box::new(NetworkListenerAnalyzer::new())));
        registry.register("inotify_file", || {
            let facility = NotifyInotifyManager::new()?;
            Ok(Box::new(InotifyFileAnalyzer::new(Arc::new(facility))) as Box<dyn Analyzer>)
        });
        registry
    }

    pub fn register(
        &mut self,
        name: &str,
        factory: impl Fn() -> Result<Box<dyn Analyzer>, EngineError> + Send + Sync + 'static,
    ) {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    /// Instantiate the analyzer named by an `AnalysisDescriptor.module`
    /// field. An unknown module is a fatal wiring error.
    pub fn instantiate(&self, module: &str) -> Result<Box<dyn Analyzer>, EngineError> {
        let factory = self
            .factories
            .get(module)
            .ok_or_else(|| EngineError::Fatal(format!("no analyzer registered for module {module}")))?;
        factory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instantiates_known_modules() {
        let registry = AnalyzerRegistry::with_builtin_analyzers();
        assert!(registry.instantiate("checksum").is_ok());
        assert!(registry.instantiate("permission").is_ok());
    }

    #[test]
    fn unknown_module_is_a_fatal_error() {
        let registry = AnalyzerRegistry::with_builtin_analyzers();
        let result = registry.instantiate("does-not-exist");
        assert!(matches!(result, Err(EngineError::Fatal(_))));
    }
}
