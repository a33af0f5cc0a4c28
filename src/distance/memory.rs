//! Memory sampling used by the distance cache to decide when to flush.
//!
//! On Linux the resident set size comes from `VmRSS` in `/proc/self/status`
//! and the ceiling from `MemTotal` in `/proc/meminfo` unless an explicit
//! budget is given. Other platforms report nothing.

/// A point-in-time reading, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryUsage {
    pub used: u64,
    pub max: u64,
}

impl MemoryUsage {
    /// `used / max`, or 0 when the ceiling is unknown.
    pub fn fraction(&self) -> f64 {
        if self.max == 0 {
            0.0
        } else {
            self.used as f64 / self.max as f64
        }
    }
}

pub trait MemoryProbe: Send + Sync {
    fn sample(&self) -> Option<MemoryUsage>;
}

/// Samples the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessMemory {
    budget: Option<u64>,
}

impl ProcessMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Measure against a fixed byte budget instead of total system memory.
    pub fn with_budget(budget: u64) -> Self {
        Self {
            budget: Some(budget),
        }
    }
}

impl MemoryProbe for ProcessMemory {
    fn sample(&self) -> Option<MemoryUsage> {
        let used = read_vm_rss()?;
        let max = match self.budget {
            Some(budget) => budget,
            None => read_mem_total()?,
        };
        Some(MemoryUsage { used, max })
    }
}

#[cfg(target_os = "linux")]
fn read_kb_field(path: &str, field: &str) -> Option<u64> {
    let contents = std::fs::read_to_string(path).ok()?;
    contents.lines().find_map(|line| {
        let rest = line.strip_prefix(field)?;
        let kb = rest.trim().trim_end_matches("kB").trim().parse::<u64>().ok()?;
        Some(kb * 1024)
    })
}

#[cfg(target_os = "linux")]
fn read_vm_rss() -> Option<u64> {
    read_kb_field("/proc/self/status", "VmRSS:")
}

#[cfg(target_os = "linux")]
fn read_mem_total() -> Option<u64> {
    read_kb_field("/proc/meminfo", "MemTotal:")
}

#[cfg(not(target_os = "linux"))]
fn read_vm_rss() -> Option<u64> {
    None
}

#[cfg(not(target_os = "linux"))]
fn read_mem_total() -> Option<u64> {
    None
}
