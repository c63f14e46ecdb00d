//! Machine identity for license binding.
//!
//! Licenses bind to an opaque machine identifier. The engine never
//! interprets the identifier; it only compares it. `LocalMachine` derives
//! a stable one for the current device by hashing hardware identifiers,
//! so the id survives reboots but changes when the hardware does.

use crewhub_types::MachineId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::env;

/// Source of the machine identity a license binds to.
///
/// The production app uses [`LocalMachine`]; tests substitute fixed ids.
pub trait MachineIdentityProvider: Send + Sync {
    /// Returns the stable identifier for this machine.
    fn machine_id(&self) -> MachineId;
}

/// Information about the current machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineInfo {
    /// Operating system name.
    pub os: String,
    /// CPU architecture.
    pub arch: String,
    /// Hostname.
    pub hostname: String,
}

impl MachineInfo {
    /// Collects information about the current machine.
    #[must_use]
    pub fn collect() -> Self {
        Self {
            os: env::consts::OS.to_string(),
            arch: env::consts::ARCH.to_string(),
            hostname: get_hostname(),
        }
    }
}

/// Identity provider that fingerprints the local device.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalMachine;

impl LocalMachine {
    /// Computes the fingerprint for the current device.
    ///
    /// Combines OS, architecture, hostname, the platform machine id, and
    /// the login user, hashed through SHA-256. The first 16 digest bytes
    /// are hex-encoded into the identifier.
    #[must_use]
    pub fn fingerprint() -> MachineId {
        let components = collect_hardware_ids();
        let combined = components.join("|");

        let mut hasher = Sha256::new();
        hasher.update(combined.as_bytes());
        let digest = hasher.finalize();

        MachineId::new(hex::encode(&digest[..16]))
    }
}

impl MachineIdentityProvider for LocalMachine {
    fn machine_id(&self) -> MachineId {
        Self::fingerprint()
    }
}

/// Collects hardware identifiers for fingerprinting.
fn collect_hardware_ids() -> Vec<String> {
    let mut ids = Vec::new();

    ids.push(env::consts::OS.to_string());
    ids.push(env::consts::ARCH.to_string());
    ids.push(get_hostname());

    // Platform machine id where available, login user as a weaker extra
    if let Some(machine_id) = get_machine_id() {
        ids.push(machine_id);
    }
    if let Ok(user) = env::var("USER").or_else(|_| env::var("USERNAME")) {
        ids.push(user);
    }

    ids
}

/// Gets the machine hostname.
fn get_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Gets the platform machine id, where one exists.
fn get_machine_id() -> Option<String> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("ioreg")
            .args(["-rd1", "-c", "IOPlatformExpertDevice"])
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .and_then(|output| {
                output
                    .lines()
                    .find(|l| l.contains("IOPlatformUUID"))
                    .and_then(|l| l.split('"').nth(3))
                    .map(String::from)
            })
    }

    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/etc/machine-id")
            .or_else(|_| std::fs::read_to_string("/var/lib/dbus/machine-id"))
            .ok()
            .map(|s| s.trim().to_string())
    }

    #[cfg(target_os = "windows")]
    {
        // Windows registry MachineGuid lookup lives in the host shell
        None
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        None
    }
}
