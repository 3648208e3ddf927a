//! Platform details and process argument checks

use serde::Serialize;
use tracing::debug;

/// Characters that only mean something to a shell
///
/// Git is always spawned with an argv, never through a shell, so these are
/// harmless; seeing one usually means a caller built a command string by
/// mistake.
const SHELL_METACHARACTERS: &[&str] = &["&&", "||", ";", "|", ">", "<", "`", "$("];

/// Log arguments that look like they were meant for a shell
pub fn check_command_args(args: &[&str]) {
    for arg in args {
        if let Some(pattern) = SHELL_METACHARACTERS.iter().find(|p| arg.contains(*p)) {
            debug!(
                arg = %arg,
                pattern = %pattern,
                "Argument contains a shell metacharacter; passed literally"
            );
        }
    }
}

/// Basic facts about the host, for diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct PlatformInfo {
    /// Operating system (linux, macos, windows, ...)
    pub os: &'static str,

    /// OS family (unix, windows)
    pub family: &'static str,

    /// CPU architecture
    pub arch: &'static str,

    /// Kernel release, where the OS reports one
    pub release: Option<String>,
}

impl PlatformInfo {
    /// Detect the current platform
    pub fn detect() -> Self {
        Self {
            os: std::env::consts::OS,
            family: std::env::consts::FAMILY,
            arch: std::env::consts::ARCH,
            release: kernel_release(),
        }
    }
}

#[cfg(unix)]
fn kernel_release() -> Option<String> {
    use std::ffi::CStr;

    // SAFETY: utsname is plain old data; uname fills it on success
    let mut uts: libc::utsname = unsafe { std::mem::zeroed() };
    if unsafe { libc::uname(&mut uts) } != 0 {
        return None;
    }
    // SAFETY: uname NUL-terminates every field
    let release = unsafe { CStr::from_ptr(uts.release.as_ptr()) };
    Some(release.to_string_lossy().into_owned())
}

#[cfg(not(unix))]
fn kernel_release() -> Option<String> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_reports_compile_time_constants() {
        let info = PlatformInfo::detect();
        assert_eq!(info.os, std::env::consts::OS);
        assert!(!info.arch.is_empty());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn linux_reports_kernel_release() {
        let info = PlatformInfo::detect();
        assert!(info.release.is_some_and(|r| !r.is_empty()));
    }

    #[test]
    fn check_command_args_accepts_anything() {
        // Only logs; must never reject
        check_command_args(&["log", "--format=%H", "a && b"]);
    }
}
