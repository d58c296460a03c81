// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! NetworkListener analyzer: parse `netstat -anp`, keep LISTEN
//! TCP rows and non-loopback UDP rows, join PID → binary path via `ps aux`,
//! keep only rows whose resolved path is in the package-binaries set.
//! Descriptive only.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use pw_core::model::{AnalysisResultEntry, NetworkResult, PreparedArgument};
use pw_core::trigger::{DiffPair, Trigger};
use pw_shell::probes::{self, NetstatRow};
use pw_shell::subprocess::run_with_timeout;

use crate::analyzer::{Analyzer, AnalyzerContext};
use crate::error::EngineError;

const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

fn relevant(row: &NetstatRow) -> bool {
    if row.is_udp() {
        !NetstatRow::is_loopback(&row.local_address)
    } else {
        row.state.as_deref() == Some("LISTEN")
    }
}

/// Strip the binary's leading `/` so it matches the relative-path keys
/// `PackageBinaries` stores (see `analyzer::classify_and_mark`).
fn as_relative(process_path: &str) -> &Path {
    Path::new(process_path.trim_start_matches('/'))
}

fn to_network_result(row: &NetstatRow, process_path: String) -> NetworkResult {
    let mut result = NetworkResult {
        local_port: row.local_port,
        foreign_port: row.foreign_port,
        is_udp: row.is_udp(),
        process_path,
        ..Default::default()
    };
    if row.local_address.contains(':') {
        result.local_ip6 = Some(row.local_address.clone());
        result.foreign_ip6 = Some(row.foreign_address.clone());
    } else {
        result.local_ip4 = Some(row.local_address.clone());
        result.foreign_ip4 = Some(row.foreign_address.clone());
    }
    result
}

#[derive(Default)]
pub struct NetworkListenerAnalyzer {
    results: Vec<NetworkResult>,
}

impl NetworkListenerAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Analyzer for NetworkListenerAnalyzer {
    async fn run_analysis(
        &mut self,
        _trigger: Trigger,
        _argument: &[PreparedArgument],
        _suite: Option<&str>,
        ctx: &AnalyzerContext<'_>,
    ) -> Result<(), EngineError> {
        let netstat_output = run_with_timeout(probes::netstat_command(), PROBE_TIMEOUT)
            .await
            .map_err(|e| EngineError::Recoverable(format!("netstat probe: {e}")))?;
        let ps_output = run_with_timeout(probes::ps_aux_command(), PROBE_TIMEOUT)
            .await
            .map_err(|e| EngineError::Recoverable(format!("ps probe: {e}")))?;

        let pid_to_path: HashMap<u32, String> =
            probes::parse_ps_aux(&String::from_utf8_lossy(&ps_output.stdout))
                .into_iter()
                .collect();

        for row in probes::parse_netstat(&String::from_utf8_lossy(&netstat_output.stdout)) {
            if !relevant(&row) {
                continue;
            }
            let Some(pid) = row.pid else { continue };
            let Some(process_path) = pid_to_path.get(&pid) else {
                continue;
            };
            if !ctx.package_binaries.contains(as_relative(process_path)) {
                continue;
            }
            self.results.push(to_network_result(&row, process_path.clone()));
        }
        Ok(())
    }

    fn add_descriptive_results(&mut self, _trigger: Trigger, out: &mut Vec<AnalysisResultEntry>) {
        out.extend(self.results.drain(..).map(AnalysisResultEntry::Network));
    }

    fn add_diff_results(&mut self, _pair: DiffPair, _out: &mut Vec<AnalysisResultEntry>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_listen_tcp_and_non_loopback_udp() {
        let listen = NetstatRow {
            protocol: "tcp".into(),
            local_address: "0.0.0.0".into(),
            local_port: 80,
            foreign_address: "0.0.0.0".into(),
            foreign_port: 0,
            state: Some("LISTEN".into()),
            pid: Some(1),
        };
        let established = NetstatRow {
            state: Some("ESTABLISHED".into()),
            ..listen.clone()
        };
        let udp_public = NetstatRow {
            protocol: "udp".into(),
            local_address: "0.0.0.0".into(),
            state: None,
            ..listen.clone()
        };
        let udp_loopback = NetstatRow {
            protocol: "udp".into(),
            local_address: "127.0.0.1".into(),
            state: None,
            ..listen.clone()
        };
        assert!(relevant(&listen));
        assert!(!relevant(&established));
        assert!(relevant(&udp_public));
        assert!(!relevant(&udp_loopback));
    }

    #[test]
    fn strips_leading_slash_for_binaries_lookup() {
        assert_eq!(as_relative("/usr/sbin/cupsd"), Path::new("usr/sbin/cupsd"));
    }
}
