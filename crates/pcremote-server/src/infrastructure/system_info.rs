//! Host facts and system metrics, read through `sysinfo`.
//!
//! Two things live here:
//!
//! - [`HostIdentity`]: machine and user name, detected once at startup and
//!   reported by `GET /status`.
//! - [`MetricsSampler`] and [`MetricsStore`]: a background loop (see
//!   `scheduler::start_metrics_sampling`) refreshes CPU, memory, network,
//!   disk, temperature and process figures into the store; `GET
//!   /system/status` and `GET /system/metrics` only read the latest snapshot.
//!
//! Sampling walks the process table and is never done on a request task.

use std::sync::Mutex;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sysinfo::{Components, Disks, Networks, System, Users};

/// Value reported when the OS does not tell us a name.
pub const UNKNOWN: &str = "unknown";

/// Number of processes kept in a snapshot, largest resident memory first.
pub const TOP_PROCESSES: usize = 8;

// ============================================================================
// Identity
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity {
    pub machine_name: String,
    pub user_name: String,
}

impl HostIdentity {
    pub fn detect() -> Self {
        Self {
            machine_name: System::host_name()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN.to_string()),
            user_name: current_user_name().unwrap_or_else(|| UNKNOWN.to_string()),
        }
    }
}

/// Owner of the running process, resolved through the OS user table.
fn current_user_name() -> Option<String> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut system = System::new();
    system.refresh_process(pid);
    let uid = system.process(pid)?.user_id()?.clone();
    let users = Users::new_with_refreshed_list();
    users.get_user_by_id(&uid).map(|user| user.name().to_string())
}

// ============================================================================
// Snapshot types
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryInfo {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub percent: f64,
}

impl MemoryInfo {
    pub fn new(total: u64, available: u64) -> Self {
        let used = total.saturating_sub(available);
        let percent = if total == 0 {
            0.0
        } else {
            round2(used as f64 * 100.0 / total as f64)
        };
        Self {
            total,
            available,
            used,
            percent,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    pub download_bytes_per_sec: f64,
    pub upload_bytes_per_sec: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskInfo {
    pub name: String,
    pub mount_point: String,
    pub total_bytes: u64,
    pub available_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureInfo {
    pub label: String,
    pub celsius: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub memory_bytes: u64,
    pub cpu_percent: f64,
}

/// One sample of host metrics.  `sampled_at` is `None` until the first
/// sample lands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub sampled_at: Option<DateTime<Utc>>,
    pub uptime_seconds: u64,
    pub cpu_usage_percent: f64,
    pub memory: MemoryInfo,
    pub network: NetworkInfo,
    pub disks: Vec<DiskInfo>,
    pub temperatures: Vec<TemperatureInfo>,
    pub processes: Vec<ProcessInfo>,
}

// ============================================================================
// Store
// ============================================================================

/// Latest snapshot, shared between the sampler loop and the handlers.
#[derive(Debug, Default)]
pub struct MetricsStore {
    latest: Mutex<MetricsSnapshot>,
}

impl MetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.latest.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn publish(&self, snapshot: MetricsSnapshot) {
        *self.latest.lock().unwrap_or_else(|e| e.into_inner()) = snapshot;
    }
}

// ============================================================================
// Sampler
// ============================================================================

/// Cumulative interface counters at one instant.
#[derive(Debug, Clone, Copy)]
struct NetworkTotals {
    at: Instant,
    received: u64,
    transmitted: u64,
}

/// Bytes per second between two counter readings.  The first reading has no
/// baseline and reports zero; counters that went backwards (an interface
/// vanished) also report zero.
fn network_rate(previous: Option<NetworkTotals>, current: NetworkTotals) -> NetworkInfo {
    let Some(previous) = previous else {
        return NetworkInfo::default();
    };
    let elapsed = current
        .at
        .saturating_duration_since(previous.at)
        .as_secs_f64()
        .max(1.0);
    NetworkInfo {
        download_bytes_per_sec: round2(
            current.received.saturating_sub(previous.received) as f64 / elapsed,
        ),
        upload_bytes_per_sec: round2(
            current.transmitted.saturating_sub(previous.transmitted) as f64 / elapsed,
        ),
    }
}

/// Keeps the `limit` processes with the largest resident memory.
fn top_by_memory(mut processes: Vec<ProcessInfo>, limit: usize) -> Vec<ProcessInfo> {
    processes.sort_by(|a, b| b.memory_bytes.cmp(&a.memory_bytes));
    processes.truncate(limit);
    processes
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Owns the `sysinfo` handles between samples.  CPU figures are deltas, so
/// the first sample after construction reports 0 %.
pub struct MetricsSampler {
    system: System,
    networks: Networks,
    disks: Disks,
    components: Components,
    previous_network: Option<NetworkTotals>,
}

impl Default for MetricsSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSampler {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            networks: Networks::new_with_refreshed_list(),
            disks: Disks::new_with_refreshed_list(),
            components: Components::new_with_refreshed_list(),
            previous_network: None,
        }
    }

    /// Refreshes every source and builds a snapshot.  Blocking.
    pub fn sample(&mut self) -> MetricsSnapshot {
        self.system.refresh_cpu();
        self.system.refresh_memory();
        self.system.refresh_processes();
        self.networks.refresh();
        self.disks.refresh();
        self.components.refresh();

        let totals = NetworkTotals {
            at: Instant::now(),
            received: (&self.networks)
                .into_iter()
                .map(|(_, data)| data.total_received())
                .sum(),
            transmitted: (&self.networks)
                .into_iter()
                .map(|(_, data)| data.total_transmitted())
                .sum(),
        };
        let network = network_rate(self.previous_network, totals);
        self.previous_network = Some(totals);

        let processes = self
            .system
            .processes()
            .iter()
            .map(|(pid, process)| ProcessInfo {
                pid: pid.as_u32(),
                name: process.name().to_string(),
                memory_bytes: process.memory(),
                cpu_percent: round2(f64::from(process.cpu_usage())),
            })
            .collect();

        MetricsSnapshot {
            sampled_at: Some(Utc::now()),
            uptime_seconds: System::uptime(),
            cpu_usage_percent: round2(f64::from(self.system.global_cpu_info().cpu_usage())),
            memory: MemoryInfo::new(
                self.system.total_memory(),
                self.system.available_memory(),
            ),
            network,
            disks: (&self.disks)
                .into_iter()
                .map(|disk| DiskInfo {
                    name: disk.name().to_string_lossy().into_owned(),
                    mount_point: disk.mount_point().display().to_string(),
                    total_bytes: disk.total_space(),
                    available_bytes: disk.available_space(),
                })
                .collect(),
            temperatures: (&self.components)
                .into_iter()
                .map(|component| TemperatureInfo {
                    label: component.label().to_string(),
                    celsius: round2(f64::from(component.temperature())),
                })
                .collect(),
            processes: top_by_memory(processes, TOP_PROCESSES),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn process(pid: u32, memory_bytes: u64) -> ProcessInfo {
        ProcessInfo {
            pid,
            name: format!("p{pid}"),
            memory_bytes,
            cpu_percent: 0.0,
        }
    }

    #[test]
    fn test_memory_info_derives_used_and_percent() {
        let mem = MemoryInfo::new(8_000, 2_000);
        assert_eq!(mem.used, 6_000);
        assert_eq!(mem.percent, 75.0);
    }

    #[test]
    fn test_memory_info_with_zero_total() {
        let mem = MemoryInfo::new(0, 0);
        assert_eq!(mem.percent, 0.0);
        assert_eq!(mem.used, 0);
    }

    #[test]
    fn test_network_rate_without_baseline_is_zero() {
        let now = NetworkTotals {
            at: Instant::now(),
            received: 10_000,
            transmitted: 5_000,
        };
        assert_eq!(network_rate(None, now), NetworkInfo::default());
    }

    #[test]
    fn test_network_rate_divides_delta_by_elapsed_seconds() {
        // Arrange
        let start = Instant::now();
        let previous = NetworkTotals {
            at: start,
            received: 1_000,
            transmitted: 500,
        };
        let current = NetworkTotals {
            at: start + Duration::from_secs(2),
            received: 5_000,
            transmitted: 1_500,
        };

        // Act
        let rate = network_rate(Some(previous), current);

        // Assert
        assert_eq!(rate.download_bytes_per_sec, 2_000.0);
        assert_eq!(rate.upload_bytes_per_sec, 500.0);
    }

    #[test]
    fn test_network_rate_ignores_counter_reset() {
        let start = Instant::now();
        let previous = NetworkTotals {
            at: start,
            received: 9_000,
            transmitted: 9_000,
        };
        let current = NetworkTotals {
            at: start + Duration::from_secs(1),
            received: 100,
            transmitted: 100,
        };
        assert_eq!(network_rate(Some(previous), current), NetworkInfo::default());
    }

    #[test]
    fn test_top_by_memory_keeps_largest_first() {
        let all = (1..=12).map(|pid| process(pid, u64::from(pid) * 10)).collect();

        let top = top_by_memory(all, TOP_PROCESSES);

        assert_eq!(top.len(), TOP_PROCESSES);
        assert_eq!(top[0].pid, 12);
        assert_eq!(top[7].pid, 5);
    }

    #[test]
    fn test_store_starts_empty_and_returns_published_snapshot() {
        // Arrange
        let store = MetricsStore::new();
        assert_eq!(store.snapshot(), MetricsSnapshot::default());
        let snapshot = MetricsSnapshot {
            sampled_at: Some(Utc::now()),
            cpu_usage_percent: 12.5,
            memory: MemoryInfo::new(100, 40),
            ..MetricsSnapshot::default()
        };

        // Act
        store.publish(snapshot.clone());

        // Assert
        assert_eq!(store.snapshot(), snapshot);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let json = serde_json::to_value(MetricsSnapshot::default()).unwrap();
        assert!(json.get("cpuUsagePercent").is_some());
        assert!(json.get("uptimeSeconds").is_some());
        assert!(json["memory"].get("available").is_some());
    }

    #[test]
    fn test_sampler_reads_real_host() {
        // Arrange
        let mut sampler = MetricsSampler::new();

        // Act
        let first = sampler.sample();
        let second = sampler.sample();

        // Assert
        assert!(first.sampled_at.is_some());
        assert!(first.memory.total > 0);
        assert!(first.processes.len() <= TOP_PROCESSES);
        assert!(!second.processes.is_empty());
        assert!((0.0..=100.0).contains(&second.memory.percent));
    }

    #[test]
    fn test_machine_name_comes_from_os_not_environment() {
        // Arrange: a misleading environment must not leak into the identity
        std::env::set_var("COMPUTERNAME", "not-this-host");
        std::env::set_var("HOSTNAME", "not-this-host");
        let expected = System::host_name()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string());

        // Act
        let identity = HostIdentity::detect();

        // Assert
        assert_eq!(identity.machine_name, expected);
        assert_ne!(identity.machine_name, "not-this-host");
    }

    #[test]
    fn test_identity_is_never_blank() {
        let identity = HostIdentity::detect();
        assert!(!identity.machine_name.is_empty());
        assert!(!identity.user_name.is_empty());
    }
}
