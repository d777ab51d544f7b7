// ── TabPilot Engine: Device Capability Probe ───────────────────────────────
//
// Decides whether the local reasoning tier should request accelerated
// inference and which model size the machine can carry. Probing is
// best-effort: any failure degrades to the most conservative tier rather
// than erroring — a wrong guess costs latency, never correctness.

use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Coarse capability class, from "run everything locally" down to
/// "pattern tier and remote only".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceTier {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub has_acceleration: bool,
    pub system_memory_mb: u64,
    /// Estimated dedicated accelerator memory; 0 when none detected.
    pub accelerator_memory_gb: u64,
    pub tier: DeviceTier,
}

impl DeviceProfile {
    /// The fallback when probing fails: no acceleration, assume the
    /// smallest viable machine.
    pub fn conservative() -> Self {
        DeviceProfile {
            has_acceleration: false,
            system_memory_mb: 4096,
            accelerator_memory_gb: 0,
            tier: DeviceTier::Low,
        }
    }

    /// Can this machine host the larger local reasoning model at all?
    pub fn supports_local_reasoning(&self) -> bool {
        self.tier >= DeviceTier::Medium
    }
}

/// Probe the machine. Never fails: unreadable counters mean the
/// conservative profile.
pub fn detect() -> DeviceProfile {
    let system_memory_mb = match system_memory_mb() {
        Some(mb) => mb,
        None => {
            warn!("[device] memory probe failed, assuming conservative profile");
            return DeviceProfile::conservative();
        }
    };
    let has_acceleration = has_acceleration();
    let accelerator_memory_gb = if has_acceleration {
        // Without a vendor API the safe estimate is a quarter of system
        // memory (unified) capped at 8 GB.
        (system_memory_mb / 1024 / 4).min(8)
    } else {
        0
    };

    let tier = match (has_acceleration, system_memory_mb) {
        (true, mb) if mb >= 16 * 1024 => DeviceTier::High,
        (_, mb) if mb >= 16 * 1024 => DeviceTier::Medium,
        (true, mb) if mb >= 8 * 1024 => DeviceTier::Medium,
        _ => DeviceTier::Low,
    };

    let profile =
        DeviceProfile { has_acceleration, system_memory_mb, accelerator_memory_gb, tier };
    info!(
        "[device] {}MB RAM, acceleration: {}, tier: {:?}",
        system_memory_mb, has_acceleration, tier
    );
    profile
}

#[cfg(target_os = "linux")]
fn system_memory_mb() -> Option<u64> {
    let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
    let line = meminfo.lines().find(|l| l.starts_with("MemTotal:"))?;
    let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb / 1024)
}

#[cfg(target_os = "macos")]
fn system_memory_mb() -> Option<u64> {
    let out = std::process::Command::new("sysctl").args(["-n", "hw.memsize"]).output().ok()?;
    let bytes: u64 = String::from_utf8_lossy(&out.stdout).trim().parse().ok()?;
    Some(bytes / 1024 / 1024)
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn system_memory_mb() -> Option<u64> {
    None
}

#[cfg(target_os = "linux")]
fn has_acceleration() -> bool {
    std::path::Path::new("/dev/nvidia0").exists()
        || std::path::Path::new("/dev/dri/renderD128").exists()
}

#[cfg(target_os = "macos")]
fn has_acceleration() -> bool {
    // Apple Silicon ships Metal acceleration unconditionally.
    std::env::consts::ARCH == "aarch64"
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn has_acceleration() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conservative_profile() {
        let p = DeviceProfile::conservative();
        assert_eq!(p.tier, DeviceTier::Low);
        assert!(!p.has_acceleration);
        assert!(!p.supports_local_reasoning());
    }

    #[test]
    fn test_detect_never_panics() {
        let p = detect();
        assert!(p.system_memory_mb > 0);
    }

    #[test]
    fn test_tier_ordering() {
        assert!(DeviceTier::High > DeviceTier::Medium);
        assert!(DeviceTier::Medium > DeviceTier::Low);
    }
}
