//! Desktop implementations backed by `std::process`.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use hitch_types::config::{AppEntry, GroupEntry};

use crate::services::{
    AppGroup, AppInfo, AppService, OutputCategory, OutputSink, ShellCallback, ShellChannel,
    ShellResult, unspaced_lowercase,
};

// ---------------------------------------------------------------------------
// System shell
// ---------------------------------------------------------------------------

/// Runs each submission as `sh -c <command>` in a tracked working directory.
///
/// Every submission is a fresh process, so a bare `cd <dir>` is applied to
/// the tracked directory here instead of being handed to `sh`.
pub struct SystemShell {
    cwd: Mutex<PathBuf>,
    home: PathBuf,
    output: Arc<dyn OutputSink>,
}

impl SystemShell {
    pub fn new(home: PathBuf, output: Arc<dyn OutputSink>) -> Self {
        Self {
            cwd: Mutex::new(home.clone()),
            home,
            output,
        }
    }

    /// Current tracked working directory.
    pub fn cwd(&self) -> PathBuf {
        self.cwd
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn change_dir(&self, target: Option<&str>) -> ShellResult {
        let mut cwd = self.cwd.lock().unwrap_or_else(PoisonError::into_inner);
        let dest = match target {
            None | Some("~") => self.home.clone(),
            Some(t) => match t.strip_prefix("~/") {
                Some(rest) => self.home.join(rest),
                None => cwd.join(t),
            },
        };
        match dest.canonicalize() {
            Ok(path) if path.is_dir() => {
                *cwd = path;
                ShellResult {
                    exit_code: 0,
                    output: Vec::new(),
                }
            },
            _ => ShellResult {
                exit_code: 1,
                output: vec![format!("cd: {}: No such directory", dest.display())],
            },
        }
    }

    fn run(&self, command: &str) -> ShellResult {
        let cwd = self.cwd();
        let result = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&cwd)
            .stdin(Stdio::null())
            .output();
        match result {
            Ok(out) => {
                let mut lines: Vec<String> = String::from_utf8_lossy(&out.stdout)
                    .lines()
                    .map(str::to_string)
                    .collect();
                lines.extend(
                    String::from_utf8_lossy(&out.stderr)
                        .lines()
                        .map(str::to_string),
                );
                ShellResult {
                    exit_code: out.status.code().unwrap_or(-1),
                    output: lines,
                }
            },
            Err(e) => {
                log::warn!("failed to spawn sh for '{command}': {e}");
                ShellResult {
                    exit_code: -1,
                    output: vec![format!("sh: {e}")],
                }
            },
        }
    }
}

/// `Some(target)` when `command` is a bare `cd`, with `None` target for plain `cd`.
fn cd_target(command: &str) -> Option<Option<&str>> {
    let mut words = command.split_whitespace();
    if words.next() != Some("cd") {
        return None;
    }
    let target = words.next();
    if words.next().is_some() {
        return None;
    }
    Some(target)
}

impl ShellChannel for SystemShell {
    fn submit(&self, command: &str, on_result: Option<ShellCallback>) {
        let result = match cd_target(command) {
            Some(target) => self.change_dir(target),
            None => self.run(command),
        };
        log::debug!("sh '{command}' exited with {}", result.exit_code);
        match on_result {
            Some(callback) => callback(result),
            None => {
                if !result.output.is_empty() {
                    let category = if result.exit_code == 0 {
                        OutputCategory::Output
                    } else {
                        OutputCategory::Error
                    };
                    self.output.emit(&result.output.join("\n"), None, category);
                }
            },
        }
    }

    fn reset(&self) {
        *self.cwd.lock().unwrap_or_else(PoisonError::into_inner) = self.home.clone();
    }

    fn elevation_available(&self) -> bool {
        Path::new("/bin/su").exists() || Path::new("/usr/bin/su").exists()
    }
}

// ---------------------------------------------------------------------------
// Configured apps
// ---------------------------------------------------------------------------

struct AppRecord {
    info: AppInfo,
}

/// App service over the `[[apps]]` and `[[groups]]` config tables.
///
/// The launch command doubles as the identifier. Launches are detached
/// `sh -c` processes, reaped in the background, and bump the in-memory
/// launch count.
pub struct ConfiguredApps {
    apps: Mutex<Vec<AppRecord>>,
    groups: Vec<AppGroup>,
}

impl ConfiguredApps {
    pub fn new(apps: &[AppEntry], groups: &[GroupEntry], installed_ms: u64) -> Self {
        let mut records: Vec<AppRecord> = Vec::new();
        for entry in apps {
            let key = unspaced_lowercase(&entry.label);
            if records
                .iter()
                .any(|r| unspaced_lowercase(&r.info.label) == key)
            {
                log::warn!("duplicate app label '{}' ignored", entry.label);
                continue;
            }
            records.push(AppRecord {
                info: AppInfo {
                    label: entry.label.clone(),
                    identifier: entry.command.clone(),
                    launch_count: 0,
                    last_update_ms: installed_ms,
                },
            });
        }
        let groups = groups
            .iter()
            .map(|g| AppGroup {
                name: g.name.clone(),
                members: g.members.clone(),
            })
            .collect();
        Self {
            apps: Mutex::new(records),
            groups,
        }
    }
}

impl AppService for ConfiguredApps {
    fn list_launchable(&self) -> Vec<AppInfo> {
        self.apps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|r| r.info.clone())
            .collect()
    }

    fn groups(&self) -> Vec<AppGroup> {
        self.groups.clone()
    }

    fn launch(&self, identifier: &str) -> bool {
        let mut apps = self.apps.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(record) = apps.iter_mut().find(|r| r.info.identifier == identifier) else {
            return false;
        };
        let spawned = Command::new("sh")
            .arg("-c")
            .arg(identifier)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Ok(child) => {
                if let Err(e) = reap(child, record.info.label.clone()) {
                    log::warn!("no reaper for {}: {e}", record.info.label);
                }
                record.info.launch_count += 1;
                log::info!("Launched {}", record.info.label);
                true
            },
            Err(e) => {
                log::warn!("failed to launch {}: {e}", record.info.label);
                false
            },
        }
    }
}

/// Wait for `child` on its own thread so it never lingers as a zombie.
fn reap(mut child: Child, label: String) -> std::io::Result<JoinHandle<Option<ExitStatus>>> {
    thread::Builder::new()
        .name("hitch-reap".to_string())
        .spawn(move || match child.wait() {
            Ok(status) => {
                log::debug!("{label} exited with {status}");
                Some(status)
            },
            Err(e) => {
                log::warn!("waiting on {label}: {e}");
                None
            },
        })
}
