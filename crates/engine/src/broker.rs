// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The guest Broker: one process per analyzed package, claiming work,
//! driving the trigger/analyzer lifecycle, and finalizing a result.

use std::path::PathBuf;
use std::time::Duration;

use indexmap::IndexMap;
use pw_adapters::PackageManager;
use pw_core::clock::Clock;
use pw_core::model::{AnalysisResult, AnalysisResultEntry, ApplicationResult, Package, PackageStatus};
use pw_core::trigger::Trigger;
use pw_queue::{ResultWriter, WorkQueue};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::analysis::Analysis;
use crate::analyzer::{AnalyzerContext, PackageBinaries};
use crate::binary_launcher;
use crate::error::EngineError;
use crate::registry::AnalyzerRegistry;
use crate::suite::SuiteDeduper;
use crate::trigger_manager::{TriggerManager, RUN_BINARIES_TIMEOUT};

/// Top-level alarm for a single package's analysis run, used when the
/// analysis config doesn't specify its own timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1100);

/// Error text written into a failed package's `ApplicationResult` when the
/// top-level alarm fires.
pub const TIMEOUT_MESSAGE: &str = "Analysis timed out.";

/// An NFS-backed analysis configuration, read from the path the
/// `--nfs` flag names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NfsAnalysisConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub log_dir: PathBuf,
    #[serde(default)]
    pub text_output: bool,
    pub timeout_secs: u64,
}

/// What `BrokerInitializer::initialize` hands the Broker: the package to
/// analyze plus whatever an NFS-backed initializer additionally contributes
/// (output location, timeout, the pending-claim sentinel to release at
/// finalize).
pub struct BrokerContext {
    pub package: Package,
    pub config: Option<NfsAnalysisConfig>,
    pub pending_path: Option<PathBuf>,
}

/// Pluggable broker initialization. The run loop never reads a
/// configuration file directly — it only depends on this trait.
pub trait BrokerInitializer: Send + Sync {
    fn initialize(&self) -> Result<BrokerContext, EngineError>;
}

/// Claims one package off the shared NFS input directory, the
/// same exclusive-create protocol `pw-queue::WorkQueue` implements.
pub struct NfsBrokerInitializer {
    config_path: PathBuf,
}

impl NfsBrokerInitializer {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }
}

impl BrokerInitializer for NfsBrokerInitializer {
    fn initialize(&self) -> Result<BrokerContext, EngineError> {
        let config: NfsAnalysisConfig = pw_wire::read_message(&self.config_path)?;
        let queue = WorkQueue::new(&config.input_dir, &config.output_dir, config.text_output);
        let claimed = queue
            .claim()
            .map_err(|e| EngineError::Fatal(format!("no package found for analysis: {e}")))?;
        Ok(BrokerContext {
            package: claimed.package,
            pending_path: Some(claimed.pending_path),
            config: Some(config),
        })
    }
}

/// The `--package` command-line fallback used only when no NFS config is
/// available.
pub struct SinglePackageInitializer {
    pub name: String,
}

impl BrokerInitializer for SinglePackageInitializer {
    fn initialize(&self) -> Result<BrokerContext, EngineError> {
        Ok(BrokerContext {
            package: Package::new_available(&self.name, "", ""),
            config: None,
            pending_path: None,
        })
    }
}

/// Drives one package through the full trigger/analyzer lifecycle.
/// `default_outdir`/`default_text_out` apply only under the
/// single-package fallback, where no [`NfsAnalysisConfig`] supplies them.
pub struct Broker<'a, C: Clock> {
    initializer: &'a dyn BrokerInitializer,
    package_manager: &'a dyn PackageManager,
    registry: AnalyzerRegistry,
    clock: C,
    analysis_sources: Vec<String>,
    default_outdir: PathBuf,
    default_text_out: bool,
    strace: bool,
}

impl<'a, C: Clock> Broker<'a, C> {
    pub fn new(
        initializer: &'a dyn BrokerInitializer,
        package_manager: &'a dyn PackageManager,
        registry: AnalyzerRegistry,
        clock: C,
        analysis_sources: Vec<String>,
        default_outdir: impl Into<PathBuf>,
        default_text_out: bool,
        strace: bool,
    ) -> Self {
        Self {
            initializer,
            package_manager,
            registry,
            clock,
            analysis_sources,
            default_outdir: default_outdir.into(),
            default_text_out,
            strace,
        }
    }

    /// Initialize, run the timed analysis, finalize. Returns the
    /// fatal/timeout error (if any) only after the result file has already
    /// been written, so a caller never observes an error without a result
    /// on disk.
    pub async fn start_analysis(&self) -> Result<(), EngineError> {
        let context = self.initializer.initialize()?;
        let mut package = context.package.clone();
        let timeout = context
            .config
            .as_ref()
            .map(|c| Duration::from_secs(c.timeout_secs))
            .unwrap_or(DEFAULT_TIMEOUT);

        let outcome = tokio::time::timeout(timeout, self.perform_timed_analysis(&mut package)).await;

        let (mut app_result, analyses, error_message) = match outcome {
            Ok(Ok((app_result, analyses))) => (app_result, Some(analyses), None),
            Ok(Err(e)) => {
                error!(error = %e, "error while running triggers and analyses");
                (ApplicationResult::new(package.clone()), None, Some(e.to_string()))
            }
            Err(_) => {
                error!(message = TIMEOUT_MESSAGE);
                (ApplicationResult::new(package.clone()), None, Some(TIMEOUT_MESSAGE.to_string()))
            }
        };

        Self::finalize_application_result(&mut app_result.package, error_message.as_deref(), &self.clock);

        let (out_dir, text_out) = match &context.config {
            Some(config) => (config.output_dir.clone(), config.text_output),
            None => (self.default_outdir.clone(), self.default_text_out),
        };
        let writer = ResultWriter::new(out_dir, text_out);
        writer.write(&app_result.package.basename(), &app_result)?;

        // Drop any per-analysis resources (e.g. the inotify facility's watch
        // thread) only after the result is durable, before the claim is
        // released.
        drop(analyses);

        if let Some(pending_path) = &context.pending_path {
            std::fs::remove_file(pending_path).map_err(EngineError::Io)?;
        }

        if let Some(msg) = error_message {
            return Err(EngineError::Fatal(msg));
        }
        Ok(())
    }

    /// Run every trigger in order, feeding each relevant analysis, then
    /// collect results. A `Fatal`-classified analyzer error aborts the run;
    /// a `Recoverable` one is logged and the loop continues.
    async fn perform_timed_analysis(
        &self,
        package: &mut Package,
    ) -> Result<(ApplicationResult, Vec<Analysis>), EngineError> {
        let loaded = pw_runbook::load_analyses(&self.analysis_sources)?;
        let mut analyses = Vec::with_capacity(loaded.len());
        for item in loaded {
            match self.registry.instantiate(&item.descriptor.module) {
                Ok(analyzer) => analyses.push(Analysis::new(item.descriptor, item.triggers, analyzer)),
                Err(e) => warn!(module = %item.descriptor.module, error = %e, "could not instantiate analyzer"),
            }
        }

        let mut trigger_manager = TriggerManager::new(self.package_manager, self.clock.clone(), self.strace)?;
        let fetch = trigger_manager.set_up_triggers_and_metadata(package).await?;

        let file_classifier = pw_adapters::FileClassifier::new();
        let package_binaries = PackageBinaries::new();
        let suite_deduper = SuiteDeduper::new();
        let ctx = AnalyzerContext {
            file_classifier: &file_classifier,
            package_binaries: &package_binaries,
            suite_deduper: &suite_deduper,
        };

        while let Some(trigger) = trigger_manager.run_next_trigger(package, &fetch).await? {
            if trigger == Trigger::RunBinaries {
                binary_launcher::run_binaries(&package_binaries, trigger_manager.service_manager(), RUN_BINARIES_TIMEOUT)
                    .await?;
            }
            for analysis in &mut analyses {
                if let Err(e) = analysis.run_if_relevant(trigger, trigger_manager.extract_dir(), &ctx).await {
                    if e.is_fatal() {
                        return Err(e);
                    }
                    warn!(analysis = %analysis.descriptor.name, %trigger, error = %e, "recoverable analyzer error");
                }
            }
        }

        let mut app_result = ApplicationResult::new(package.clone());
        for analysis in &mut analyses {
            app_result.add_analysis_result(analysis.collect_results(&ctx));
        }

        // Suite-scoped analyses only merged into `suite_deduper` above; every
        // shared record is rendered here, exactly once, now that every
        // analysis's `run_analysis` and `collect_results` have both run.
        for result in Self::render_suite_results(&suite_deduper) {
            app_result.add_analysis_result(result);
        }
        Ok((app_result, analyses))
    }

    /// Group the deduper's drained records by suite name and wrap each as a
    /// `Package` entry for the suite literally named `"package"`, or a
    /// `FileSystem` entry for any other suite name.
    fn render_suite_results(suite_deduper: &SuiteDeduper) -> Vec<AnalysisResult> {
        let mut by_suite: IndexMap<String, Vec<AnalysisResultEntry>> = IndexMap::new();
        for (suite, record) in suite_deduper.drain() {
            let file_result = record.lock().clone();
            let entry = if suite == "package" {
                AnalysisResultEntry::Package(file_result)
            } else {
                AnalysisResultEntry::FileSystem(file_result)
            };
            by_suite.entry(suite).or_default().push(entry);
        }
        by_suite
            .into_iter()
            .map(|(suite, results)| AnalysisResult {
                analysis_name: suite,
                results,
            })
            .collect()
    }

    fn finalize_application_result(package: &mut Package, error: Option<&str>, clock: &C) {
        match error {
            Some(msg) => {
                package.status = PackageStatus::Failed;
                package.error = Some(msg.to_string());
            }
            None => package.status = PackageStatus::Done,
        }
        package.analysis_end = Some(clock.epoch_secs());
    }
}
