// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! pw-broker: the guest-side orchestrator, one process per
//! analyzed package. Claims a work item off the shared NFS `in/` directory
//! (or, with `--package`, analyzes a single named package directly without
//! any shared directory), drives it through the trigger/analyzer lifecycle,
//! and writes the finalized `ApplicationResult` under `out/`.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

use std::path::PathBuf;

use clap::Parser;
use pw_adapters::DebPackageManager;
use pw_core::clock::SystemClock;
use pw_engine::broker::{Broker, NfsAnalysisConfig, NfsBrokerInitializer, SinglePackageInitializer};
use pw_engine::registry::AnalyzerRegistry;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Glob patterns under which `AnalysisDescriptor` files are looked up when
/// none are given explicitly.
const DEFAULT_ANALYSES_GLOB: &str = "/etc/packwheel/analyses/*";

#[derive(Parser, Debug)]
#[command(name = "pw-broker", version, about = "packwheel guest broker")]
struct Cli {
    /// Where to write the finalized ApplicationResult, used only when no
    /// `--nfs` config is available.
    #[arg(long, default_value = "/var/lib/packwheel/out")]
    outdir: PathBuf,

    /// Write results as text rather than binary-framed `.dat` files, used
    /// only alongside `--outdir`.
    #[arg(long)]
    textout: bool,

    /// Path to the shared NFS analysis config.
    #[arg(long, default_value = "/mnt/broker/analysis.config")]
    nfs: PathBuf,

    /// Analyze exactly this package name, bypassing the NFS work queue
    /// entirely. Used only when `--nfs`'s config file is absent.
    #[arg(long)]
    package: Option<String>,

    /// Glob pattern(s) for AnalysisDescriptor files (repeatable).
    #[arg(long = "analyses", default_value = DEFAULT_ANALYSES_GLOB)]
    analyses: Vec<String>,

    /// Wrap service start/stop in `strace -f`.
    #[arg(long)]
    strace: bool,

    /// Log directory fallback, used only under `--package` (the NFS config
    /// otherwise names one).
    #[arg(long, default_value = "/var/log/packwheel")]
    logdir: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_dir = peek_log_dir(&cli.nfs).unwrap_or_else(|| cli.logdir.clone());
    let _guard = match setup_logging(&log_dir) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("could not set up logging under {}: {e}", log_dir.display());
            std::process::exit(1);
        }
    };

    let package_manager = DebPackageManager;
    let registry = AnalyzerRegistry::with_builtin_analyzers();

    let single_package_initializer;
    let nfs_initializer;
    let initializer: &dyn pw_engine::broker::BrokerInitializer = if cli.nfs.exists() {
        nfs_initializer = NfsBrokerInitializer::new(cli.nfs.clone());
        &nfs_initializer
    } else {
        let name = match &cli.package {
            Some(name) => name.clone(),
            None => {
                eprintln!("no package for analysis: neither --nfs config nor --package was usable");
                std::process::exit(1);
            }
        };
        single_package_initializer = SinglePackageInitializer { name };
        &single_package_initializer
    };

    let broker = Broker::new(
        initializer,
        &package_manager,
        registry,
        SystemClock,
        cli.analyses.clone(),
        cli.outdir.clone(),
        cli.textout,
        cli.strace,
    );

    if let Err(e) = broker.start_analysis().await {
        error!(error = %e, "broker run finished with an error");
        std::process::exit(1);
    }
}

/// Best-effort peek at the NFS config's log directory, done before the
/// Broker's own (claim-performing) read of the same file, purely so
/// logging can be set up before the run starts.
fn peek_log_dir(config_path: &std::path::Path) -> Option<PathBuf> {
    let config: NfsAnalysisConfig = pw_wire::read_message(config_path).ok()?;
    Some(config.log_dir)
}

fn setup_logging(
    log_dir: &std::path::Path,
) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::never(log_dir, "broker.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();
    Ok(guard)
}
