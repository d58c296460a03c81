// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! pw: host-side CLI — dispatches a batch of packages across VM workers and
//! scores the results.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use pw_adapters::{BatchDescriptor, DebPackageManager, ProcessVmLauncher};
use pw_engine::{ApplicationScorer, DispatchConfig, Dispatcher};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Launcher script asset copied onto the shared NFS root.
const LAUNCHER_SCRIPT: &str = include_str!("../assets/nfs_launcher.sh");

#[derive(Parser, Debug)]
#[command(
    name = "pw",
    version = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH")),
    about = "packwheel: characterize OS-level effects of installing packages"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Dispatch a batch of packages across VM workers, then score the results.
    Dispatch(DispatchArgs),
    /// Score an existing directory of finalized ApplicationResults.
    Score(ScoreArgs),
}

#[derive(Args, Debug)]
struct DispatchArgs {
    /// Path to the VM image to boot each worker from.
    #[arg(long)]
    image: PathBuf,

    /// Per-VM memory size in MB.
    #[arg(long, default_value_t = 4096)]
    memory: u32,

    /// Per-VM timeout in seconds.
    #[arg(long, default_value_t = 120)]
    timeout: u64,

    /// Batch descriptor file (name_regex, architecture, max_count),
    /// text-encoded. Requires --nfshost and --nfsguest.
    #[arg(long)]
    batchfile: PathBuf,

    /// Host-visible path of the shared NFS mount.
    #[arg(long)]
    nfshost: PathBuf,

    /// Guest-visible path of the same shared NFS mount.
    #[arg(long)]
    nfsguest: PathBuf,

    /// Write results as text rather than binary-framed `.dat` files.
    #[arg(long, default_value_t = false)]
    textout: bool,

    /// Number of VM workers to run concurrently.
    #[arg(long, default_value_t = 1)]
    processes: usize,

    /// Boot VM workers with `-snapshot` (discard disk writes on exit).
    #[arg(long, default_value_t = true)]
    snapshot: bool,

    /// Refresh the broker binary staged on the shared NFS root before dispatch.
    #[arg(long, default_value_t = false)]
    updatebroker: bool,

    /// Hypervisor command used to boot each VM worker.
    #[arg(long, default_value = "qemu-kvm")]
    hypervisor: PathBuf,

    /// Glob pattern(s) for the file-system-scope score dictionary.
    #[arg(long = "filedict", default_value = "/etc/packwheel/dictionaries/filesystem/*")]
    file_dictionaries: Vec<String>,

    /// Glob pattern(s) for the package-scope score dictionary.
    #[arg(long = "packagedict", default_value = "/etc/packwheel/dictionaries/package/*")]
    package_dictionaries: Vec<String>,
}

#[derive(Args, Debug)]
struct ScoreArgs {
    /// Directory of finalized ApplicationResult files.
    #[arg(long)]
    resultdir: PathBuf,

    /// Directory to write DetailedPackageScore files into.
    #[arg(long)]
    scoredir: PathBuf,

    /// Write scores as text rather than binary-framed `.dat` files.
    #[arg(long, default_value_t = false)]
    textout: bool,

    /// Glob pattern(s) for the file-system-scope score dictionary.
    #[arg(long = "filedict", default_value = "/etc/packwheel/dictionaries/filesystem/*")]
    file_dictionaries: Vec<String>,

    /// Glob pattern(s) for the package-scope score dictionary.
    #[arg(long = "packagedict", default_value = "/etc/packwheel/dictionaries/package/*")]
    package_dictionaries: Vec<String>,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Dispatch(args) => run_dispatch(args).await,
        Commands::Score(args) => run_score(args),
    };

    if let Err(e) = result {
        error!(error = %e, "pw command failed");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run_dispatch(args: DispatchArgs) -> Result<()> {
    let batch: BatchDescriptor =
        pw_wire::read_message(&args.batchfile).with_context(|| format!("reading batch file {}", args.batchfile.display()))?;

    if args.updatebroker {
        update_broker_image(&args.nfshost).context("updating staged broker binary")?;
    }

    let launcher_src = stage_launcher_script()?;

    let package_manager = Arc::new(DebPackageManager);
    let vm_launcher = Arc::new(ProcessVmLauncher {
        command: args.hypervisor.clone(),
    });
    let dispatcher = Dispatcher::new(package_manager, vm_launcher);

    let config = DispatchConfig {
        host_nfs_share: args.nfshost.clone(),
        guest_nfs_share: args.nfsguest.clone(),
        image: args.image.clone(),
        memory_mb: args.memory,
        timeout: Duration::from_secs(args.timeout),
        text_output: args.textout,
        processes: args.processes,
        snapshot: args.snapshot,
    };

    let job_count = dispatcher
        .set_up_analysis(&config, &batch, launcher_src.path())
        .await
        .context("setting up analysis")?;

    if job_count == 0 {
        bail!("no packages matched batch descriptor {:?}", batch);
    }

    info!(job_count, "dispatching VM workers");
    let failures = dispatcher.run_batch(&config, job_count).await;
    if failures > 0 {
        info!(failures, "some VM workers failed or timed out; continuing to scoring");
    }

    let scorer = ApplicationScorer::new(&args.file_dictionaries, &args.package_dictionaries)
        .context("loading score dictionaries")?;
    let out_dir = config.host_nfs_share.join("out");
    let score_dir = config.host_nfs_share.join("score");
    pw_engine::scorer::score_result_directory(&scorer, &out_dir, &score_dir, args.textout)
        .context("scoring results")?;

    Ok(())
}

fn run_score(args: ScoreArgs) -> Result<()> {
    let scorer = ApplicationScorer::new(&args.file_dictionaries, &args.package_dictionaries)
        .context("loading score dictionaries")?;
    pw_engine::scorer::score_result_directory(&scorer, &args.resultdir, &args.scoredir, args.textout)
        .context("scoring results")?;
    Ok(())
}

/// Materialize the embedded launcher script into a temp file so
/// `Dispatcher::set_up_analysis` can copy it with owner-exec-only
/// permissions.
fn stage_launcher_script() -> Result<tempfile::NamedTempFile> {
    use std::io::Write;
    let mut file = tempfile::NamedTempFile::new().context("creating temp launcher script")?;
    file.write_all(LAUNCHER_SCRIPT.as_bytes()).context("writing temp launcher script")?;
    file.flush().context("flushing temp launcher script")?;
    Ok(file)
}

/// Stage the `pw-broker` binary running alongside this `pw` binary onto the
/// shared NFS root, so the launcher script can exec a local copy inside the
/// guest without relying on the VM image already carrying one.
fn update_broker_image(host_nfs_share: &Path) -> Result<()> {
    let current = std::env::current_exe().context("locating current executable")?;
    let broker_src = current
        .parent()
        .map(|dir| dir.join("pw-broker"))
        .filter(|p| p.exists())
        .with_context(|| "could not find pw-broker binary alongside pw".to_string())?;

    std::fs::create_dir_all(host_nfs_share)?;
    let dest = host_nfs_share.join("pw-broker");
    std::fs::copy(&broker_src, &dest)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(&dest)?.permissions();
        perms.set_mode(0o500);
        std::fs::set_permissions(&dest, perms)?;
    }

    info!(src = %broker_src.display(), dest = %dest.display(), "staged broker binary onto shared NFS root");
    Ok(())
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launcher_script_asset_is_a_shebang_script() {
        assert!(LAUNCHER_SCRIPT.starts_with("#!/bin/sh"));
    }
}
