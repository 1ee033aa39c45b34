//! Timing and memory reporting for a run. Passed in by the caller; a
//! disabled monitor records nothing.

use std::sync::Mutex;
use std::time::{Duration, Instant};
use sysinfo::{Pid, ProcessesToUpdate, System};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timing {
    pub label: String,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub struct PerformanceMonitor {
    enabled: bool,
    system: Mutex<System>,
    pid: Option<Pid>,
    timings: Mutex<Vec<Timing>>,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::disabled()
    }
}

impl PerformanceMonitor {
    pub fn new(enabled: bool) -> Self {
        let pid = if enabled {
            sysinfo::get_current_pid()
                .map_err(|e| log::debug!("Process id unavailable, memory reporting off: {}", e))
                .ok()
        } else {
            None
        };
        Self {
            enabled,
            system: Mutex::new(System::new()),
            pid,
            timings: Mutex::new(Vec::new()),
        }
    }

    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Runs `f`, recording how long it took under `label`.
    pub fn time<T>(&self, label: &str, f: impl FnOnce() -> T) -> T {
        if !self.enabled {
            return f();
        }
        let start = Instant::now();
        let value = f();
        self.record(label, start.elapsed());
        value
    }

    pub fn record(&self, label: &str, elapsed: Duration) {
        if !self.enabled {
            return;
        }
        log::debug!("{} took {:.2?}", label, elapsed);
        if let Ok(mut timings) = self.timings.lock() {
            timings.push(Timing {
                label: label.to_string(),
                elapsed,
            });
        }
    }

    /// Resident memory of this process in bytes.
    pub fn resident_memory(&self) -> Option<u64> {
        let pid = self.pid?;
        let mut system = self.system.lock().ok()?;
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        system.process(pid).map(|p| p.memory())
    }

    pub fn log_memory(&self, context: &str) {
        if !self.enabled {
            return;
        }
        match self.resident_memory() {
            Some(bytes) => log::debug!(
                "Memory after {}: {:.1} MiB resident",
                context,
                bytes as f64 / (1024.0 * 1024.0)
            ),
            None => log::debug!("Memory after {}: unavailable", context),
        }
    }

    pub fn timings(&self) -> Vec<Timing> {
        self.timings.lock().map(|t| t.clone()).unwrap_or_default()
    }

    /// Host description for the start-of-run log line.
    pub fn host_summary() -> String {
        let name = System::name().unwrap_or_else(|| "unknown OS".to_string());
        let version = System::os_version().unwrap_or_default();
        let cpus = std::thread::available_parallelism().map_or(1, |n| n.get());
        format!("{} {} ({} CPUs)", name, version, cpus).replace("  ", " ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_monitor_records_nothing() {
        let monitor = PerformanceMonitor::disabled();
        assert_eq!(monitor.time("work", || 7), 7);
        assert!(monitor.timings().is_empty());
        assert_eq!(monitor.resident_memory(), None);
    }

    #[test]
    fn enabled_monitor_keeps_timings_in_order() {
        let monitor = PerformanceMonitor::new(true);
        monitor.time("first", || ());
        monitor.record("second", Duration::from_millis(5));
        let labels: Vec<String> = monitor.timings().into_iter().map(|t| t.label).collect();
        assert_eq!(labels, vec!["first", "second"]);
    }
}
