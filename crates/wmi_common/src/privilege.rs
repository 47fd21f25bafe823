//! Privilege detection and the pre-dispatch elevation gate.
//!
//! Detected once per process in `main` and threaded explicitly into the
//! dispatcher, never re-read from ambient state, so tests can run with a
//! stub level.

use crate::error::DispatchError;
use crate::spec::CommandSpec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivilegeLevel {
    Standard,
    Elevated,
}

impl PrivilegeLevel {
    /// Query the host OS for the current process privilege level.
    pub fn detect() -> Self {
        if detect_elevated() {
            PrivilegeLevel::Elevated
        } else {
            PrivilegeLevel::Standard
        }
    }

    pub fn is_elevated(&self) -> bool {
        matches!(self, PrivilegeLevel::Elevated)
    }
}

/// Advisory gate run before the executor: a privileged spec at standard
/// level fails here with a clear diagnostic instead of a confusing WMI
/// access-denied error downstream.
pub fn require_elevated(spec: &CommandSpec, level: PrivilegeLevel) -> Result<(), DispatchError> {
    if spec.privileged && !level.is_elevated() {
        return Err(DispatchError::InsufficientPrivilege(spec.name.to_string()));
    }
    Ok(())
}

#[cfg(windows)]
fn detect_elevated() -> bool {
    use std::process::Command;

    let probe = "[Security.Principal.WindowsPrincipal]::new(\
        [Security.Principal.WindowsIdentity]::GetCurrent()).IsInRole(\
        [Security.Principal.WindowsBuiltInRole]::Administrator)";
    Command::new("powershell")
        .args(["-NoProfile", "-NonInteractive", "-Command", probe])
        .output()
        .map(|o| {
            o.status.success()
                && String::from_utf8_lossy(&o.stdout).trim().eq_ignore_ascii_case("true")
        })
        .unwrap_or(false)
}

#[cfg(unix)]
fn detect_elevated() -> bool {
    nix::unistd::Uid::effective().is_root()
}

#[cfg(not(any(windows, unix)))]
fn detect_elevated() -> bool {
    false
}
