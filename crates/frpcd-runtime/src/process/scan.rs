//! Process-table scan for the managed process.
//!
//! The process table is the only source of truth for "running". Every query
//! does a fresh scan; nothing here caches PIDs.

use std::ffi::{OsStr, OsString};
use std::path::Path;

use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System, UpdateKind};

/// Identifies the managed process by executable name and config argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessMatcher {
    executable_name: OsString,
    config_arg: OsString,
}

impl ProcessMatcher {
    pub fn new(executable: &Path, config: &Path) -> Self {
        Self {
            executable_name: executable
                .file_name()
                .map_or_else(|| executable.as_os_str().to_owned(), OsStr::to_owned),
            config_arg: config.as_os_str().to_owned(),
        }
    }

    /// Pure match over one process-table entry.
    ///
    /// The name matches when the process name equals the executable file
    /// name, or when one of the first two arguments (the program, or the
    /// script behind an interpreter) has that file name. One argument must
    /// equal the config path exactly.
    pub fn matches(&self, name: &OsStr, cmd: &[OsString]) -> bool {
        let named = name == self.executable_name
            || cmd
                .iter()
                .take(2)
                .any(|arg| Path::new(arg).file_name() == Some(self.executable_name.as_os_str()));
        named && cmd.iter().any(|arg| *arg == self.config_arg)
    }
}

fn scan_all() -> System {
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::All,
        true,
        ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always),
    );
    system
}

/// PIDs of every live process matching `matcher`, lowest first.
pub fn find_matching(matcher: &ProcessMatcher) -> Vec<u32> {
    let system = scan_all();
    let mut pids: Vec<u32> = system
        .processes()
        .iter()
        .filter(|(_, process)| process.thread_kind().is_none())
        .filter(|(_, process)| process.status() != ProcessStatus::Zombie)
        .filter(|(_, process)| matcher.matches(process.name(), process.cmd()))
        .map(|(pid, _)| pid.as_u32())
        .collect();
    pids.sort_unstable();
    pids
}

/// First live match, if any.
pub fn find_running(matcher: &ProcessMatcher) -> Option<u32> {
    find_matching(matcher).into_iter().next()
}

/// Whether `pid` exists and is not a zombie.
pub fn process_alive(pid: u32) -> bool {
    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::nothing(),
    );
    system
        .process(pid)
        .is_some_and(|p| p.status() != ProcessStatus::Zombie)
}
