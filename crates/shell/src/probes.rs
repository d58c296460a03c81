// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External probe command builders and output parsers. Parsing is kept pure
//! (no process execution) so it is testable without root/sudo.

use std::sync::LazyLock;

use regex::Regex;
use tokio::process::Command;

use pw_core::model::FileType;

/// Matches ` [ + ]  cups`-style lines from `service --status-all`.
#[allow(clippy::expect_used)]
static SERVICE_LIST_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" \[ . \]  (.+)").expect("static regex pattern is valid"));

/// Matches `exec*("/path/to/binary", ...)` calls in strace output.
#[allow(clippy::expect_used)]
static EXEC_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"exec[lv][ep]?\("([^"]*)".*\)"#).expect("static regex pattern is valid"));

/// Build the `/usr/bin/file <path>` command.
pub fn file_command(path: &str) -> Command {
    let mut cmd = Command::new("/usr/bin/file");
    cmd.arg(path);
    cmd
}

/// Classify a `/usr/bin/file` textual verdict into a [`FileType`].
///
/// Checked in order: ELF, then shell script, then text, else `Other` — see
/// DESIGN.md for why ELF is checked first.
pub fn classify_file_output(verdict: &str) -> FileType {
    if verdict.contains("ELF") {
        FileType::Binary
    } else if verdict.contains("shell script") {
        FileType::Script
    } else if verdict.contains("text") {
        FileType::Text
    } else {
        FileType::Other
    }
}

/// Build the `sudo /bin/netstat -anp` command.
pub fn netstat_command() -> Command {
    let mut cmd = Command::new("/usr/bin/sudo");
    cmd.arg("/bin/netstat").arg("-anp");
    cmd
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetstatRow {
    pub protocol: String,
    pub local_address: String,
    pub local_port: u16,
    pub foreign_address: String,
    pub foreign_port: u16,
    pub state: Option<String>,
    pub pid: Option<u32>,
}

impl NetstatRow {
    pub fn is_udp(&self) -> bool {
        self.protocol.starts_with("udp")
    }

    pub fn is_loopback(addr: &str) -> bool {
        addr == "127.0.0.1" || addr == "::1"
    }
}

fn split_host_port(addr: &str) -> Option<(String, u16)> {
    let idx = addr.rfind(':')?;
    let host = &addr[..idx];
    let port: u16 = addr[idx + 1..].parse().ok()?;
    Some((host.to_string(), port))
}

/// Parse `netstat -anp` output into rows.
pub fn parse_netstat(output: &str) -> Vec<NetstatRow> {
    let mut rows = Vec::new();
    for line in output.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            continue;
        }
        let protocol = fields[0].to_lowercase();
        if !protocol.starts_with("tcp") && !protocol.starts_with("udp") {
            continue;
        }
        let Some((local_host, local_port)) = split_host_port(fields[3]) else {
            continue;
        };
        let (foreign_host, foreign_port) = fields
            .get(4)
            .and_then(|f| split_host_port(f))
            .unwrap_or_else(|| ("0.0.0.0".to_string(), 0));

        let is_tcp = protocol.starts_with("tcp");
        let (state, pid_field) = if is_tcp {
            (fields.get(5).map(|s| s.to_string()), fields.get(6))
        } else {
            (None, fields.get(5))
        };
        let pid = pid_field.and_then(|f| f.split('/').next()).and_then(|p| p.parse().ok());

        rows.push(NetstatRow {
            protocol,
            local_address: local_host,
            local_port,
            foreign_address: foreign_host,
            foreign_port,
            state,
            pid,
        });
    }
    rows
}

/// Build the `/usr/sbin/service --status-all` command.
pub fn service_status_all_command() -> Command {
    let mut cmd = Command::new("/usr/sbin/service");
    cmd.arg("--status-all");
    cmd
}

/// Parse `service --status-all` output into the set of service names.
/// Each line looks like ` [ + ]  cups`; we only care about the name.
pub fn parse_service_list(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| SERVICE_LIST_LINE.captures(line))
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .collect()
}

/// Build the `/usr/sbin/service <name> {start|stop}` command, optionally
/// wrapped in `strace -o <file> -f`.
pub fn service_action_command(service: &str, action: &str, strace_file: Option<&str>) -> Command {
    match strace_file {
        Some(file) => {
            let mut cmd = Command::new("strace");
            cmd.arg("-o").arg(file).arg("-f");
            cmd.arg("/usr/sbin/service").arg(service).arg(action);
            cmd
        }
        None => {
            let mut cmd = Command::new("/usr/sbin/service");
            cmd.arg(service).arg(action);
            cmd
        }
    }
}

/// Build the `ps aux` command used to map PIDs to binary paths.
pub fn ps_aux_command() -> Command {
    let mut cmd = Command::new("/bin/ps");
    cmd.arg("aux");
    cmd
}

/// Parse `ps aux` output into `pid -> command` pairs. Only the first
/// whitespace-delimited token of the command column is kept, matching the
/// executable path `netstat`'s PID join needs.
pub fn parse_ps_aux(output: &str) -> Vec<(u32, String)> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let pid: u32 = fields.get(1)?.parse().ok()?;
            let cmd = fields.get(10)?.to_string();
            Some((pid, cmd))
        })
        .collect()
}

/// Build the `sudo <binary>` command used by the binary launcher.
pub fn sudo_binary_command(binary: &str) -> Command {
    let mut cmd = Command::new("/usr/bin/sudo");
    cmd.arg(binary);
    cmd
}

/// Build `dpkg-deb -x <archive> <dest>`, the Extract trigger's expansion
/// of a fetched `.deb` archive.
pub fn dpkg_deb_extract_command(archive: &std::path::Path, dest: &std::path::Path) -> Command {
    let mut cmd = Command::new("/usr/bin/dpkg-deb");
    cmd.arg("-x").arg(archive).arg(dest);
    cmd
}

/// Build `apt-get download <name>=<version>` into `dest_dir` (the package
/// manager's fetch operation).
pub fn apt_get_download_command(name: &str, version: &str, dest_dir: &std::path::Path) -> Command {
    let mut cmd = Command::new("/usr/bin/apt-get");
    cmd.arg("download").arg(format!("{name}={version}")).current_dir(dest_dir);
    cmd
}

/// Build `apt-get install -y --allow-downgrades <name>=<version>`.
pub fn apt_get_install_command(name: &str, version: &str) -> Command {
    let mut cmd = Command::new("/usr/bin/sudo");
    cmd.arg("/usr/bin/apt-get")
        .arg("install")
        .arg("-y")
        .arg("--allow-downgrades")
        .arg(format!("{name}={version}"));
    cmd
}

/// Build `apt-get remove|purge -y <name>`.
pub fn apt_get_remove_command(name: &str, purge: bool) -> Command {
    let mut cmd = Command::new("/usr/bin/sudo");
    cmd.arg("/usr/bin/apt-get")
        .arg(if purge { "purge" } else { "remove" })
        .arg("-y")
        .arg(name);
    cmd
}

/// Build `apt-cache show <name>=<version>`, Setup's metadata probe for the
/// section and description stamped onto the package descriptor.
pub fn apt_cache_show_command(name: &str, version: &str) -> Command {
    let mut cmd = Command::new("/usr/bin/apt-cache");
    cmd.arg("show").arg(format!("{name}={version}"));
    cmd
}

/// Parse `apt-cache show` output into `(section, description)`. Only the
/// candidate stanza's `Section:` field and `Description:` line are read;
/// a multi-line long description's continuation lines are not collected,
/// matching the single summary line Setup stamps onto the descriptor.
pub fn parse_apt_cache_show(output: &str) -> (String, String) {
    let mut section = String::new();
    let mut description = String::new();
    for line in output.lines() {
        if let Some(rest) = line.strip_prefix("Section: ") {
            section = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("Description: ") {
            description = rest.trim().to_string();
        } else if description.is_empty() {
            if let Some(rest) = line.strip_prefix("Description-en: ") {
                description = rest.trim().to_string();
            }
        }
    }
    (section, description)
}

/// Build `apt-cache dumpavail`, the Dispatcher's candidate-enumeration probe
///.
pub fn apt_cache_dumpavail_command() -> Command {
    let mut cmd = Command::new("/usr/bin/apt-cache");
    cmd.arg("dumpavail");
    cmd
}

/// Parse `apt-cache dumpavail` output (RFC 2822-style stanzas separated by
/// blank lines) into `(name, version, architecture, is_virtual)` rows.
/// `dumpavail` only emits stanzas for concrete packages — a provides-only
/// virtual package never gets one — so any stanza missing a `Version` or
/// `Architecture` field is treated as virtual rather than dropped outright.
pub fn parse_apt_cache_dumpavail(output: &str) -> Vec<(String, String, String, bool)> {
    let mut rows = Vec::new();
    let mut name: Option<String> = None;
    let mut version: Option<String> = None;
    let mut architecture: Option<String> = None;

    let mut flush = |name: &mut Option<String>, version: &mut Option<String>, architecture: &mut Option<String>, rows: &mut Vec<(String, String, String, bool)>| {
        if let Some(n) = name.take() {
            match (version.take(), architecture.take()) {
                (Some(v), Some(a)) => rows.push((n, v, a, false)),
                _ => rows.push((n, String::new(), String::new(), true)),
            }
        }
    };

    for line in output.lines() {
        if line.is_empty() {
            flush(&mut name, &mut version, &mut architecture, &mut rows);
            continue;
        }
        if let Some(rest) = line.strip_prefix("Package: ") {
            flush(&mut name, &mut version, &mut architecture, &mut rows);
            name = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("Version: ") {
            version = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("Architecture: ") {
            architecture = Some(rest.trim().to_string());
        }
    }
    flush(&mut name, &mut version, &mut architecture, &mut rows);
    rows
}

/// Detect executed binaries from an strace output file's `exec*` calls.
pub fn detect_executed_binaries(strace_contents: &str) -> Vec<String> {
    EXEC_CALL
        .captures_iter(strace_contents)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|p| p.starts_with('/'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[yare::parameterized(
        elf_binary    = { "ELF 64-bit LSB executable",               FileType::Binary },
        shell_script  = { "Bourne-Again shell script text executable", FileType::Script },
        ascii_text    = { "ASCII text",                               FileType::Text },
        opaque_data   = { "data",                                     FileType::Other },
    )]
    fn classifies_file_output(verdict: &str, expected: FileType) {
        assert_eq!(classify_file_output(verdict), expected);
    }

    #[test]
    fn parses_netstat_listen_rows() {
        let output = "\
Active Internet connections (servers and established)
Proto Recv-Q Send-Q Local Address           Foreign Address         State       PID/Program name
tcp        0      0 127.0.0.1:631           0.0.0.0:*               LISTEN      697/cupsd
tcp6       0      0 ::1:631                 :::*                    LISTEN      697/cupsd
tcp        0      0 0.0.0.0:21              0.0.0.0:*               LISTEN      2769/inetd
";
        let rows = parse_netstat(output);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].local_port, 631);
        assert_eq!(rows[0].pid, Some(697));
        assert_eq!(rows[0].state.as_deref(), Some("LISTEN"));
    }

    #[test]
    fn parses_service_status_lines() {
        let output = " [ + ]  cups\n [ - ]  bluetooth\nsomething else\n";
        let services = parse_service_list(output);
        assert_eq!(services, vec!["cups".to_string(), "bluetooth".to_string()]);
    }

    #[test]
    fn detects_executed_binaries_from_strace() {
        let log = r#"1234 execve("/usr/sbin/cupsd", ["cupsd"], [...]) = 0"#;
        let found = detect_executed_binaries(log);
        assert_eq!(found, vec!["/usr/sbin/cupsd".to_string()]);
    }

    #[test]
    fn parses_dumpavail_stanzas_and_flags_virtual_ones() {
        let output = "\
Package: emacspeak-ss\nVersion: 1.12.1-1\nArchitecture: i386\nDescription: speech server\n\nPackage: some-virtual-thing\nProvides: emacspeak-ss\n\nPackage: emacspeak-doc\nVersion: 1.12.1-1\nArchitecture: amd64\n";
        let rows = parse_apt_cache_dumpavail(output);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], ("emacspeak-ss".into(), "1.12.1-1".into(), "i386".into(), false));
        assert_eq!(rows[1].0, "some-virtual-thing");
        assert!(rows[1].3);
        assert_eq!(rows[2], ("emacspeak-doc".into(), "1.12.1-1".into(), "amd64".into(), false));
    }

    #[test]
    fn parses_section_and_description_from_show() {
        let output = "Package: emacspeak-ss\nVersion: 1.12.1-1\nSection: sound\nDescription: speech server\nHomepage: http://example.org\n";
        let (section, description) = parse_apt_cache_show(output);
        assert_eq!(section, "sound");
        assert_eq!(description, "speech server");
    }

    #[test]
    fn falls_back_to_description_en_when_description_is_absent() {
        let output = "Package: emacspeak-ss\nSection: sound\nDescription-en: speech server\n";
        let (_, description) = parse_apt_cache_show(output);
        assert_eq!(description, "speech server");
    }
}
