//! Capability interface over the running platform.
//!
//! Every inventory and sampling operation goes through
//! [`HostTelemetryProvider`]; there is one concrete implementation per target
//! platform, selected at build time. This keeps OS branching at the module
//! boundary instead of inside every function.

use crate::error::TelemetryError;
use crate::system::cpu::CoreTopology;
use crate::system::gpu::AdapterDescriptor;
use crate::system::memory::MemoryInfo;

/// An open subscription to one live CPU-time metric.
///
/// Opening a counter primes it: the first reading after open is meaningless
/// and implementations discard it internally. `read` returns percent-busy
/// accumulated since the previous read.
pub trait CpuCounter: Send {
    fn read(&mut self) -> Result<f64, TelemetryError>;
}

/// Platform queries behind the telemetry surface.
///
/// Inventory methods are side-effect-free apart from read-only platform
/// queries and degrade to sentinels ("Unknown CPU", 0.0) instead of erroring.
/// Counter factories return errors, which samplers turn into per-core 0.0
/// sentinels or explicit failures.
pub trait HostTelemetryProvider: Send + Sync {
    /// Human-readable CPU brand string, `"Unknown CPU"` when unavailable.
    fn cpu_name(&self) -> String;

    /// Physical/logical core counts. See [`CoreTopology`] for the fallback
    /// approximation when the physical count cannot be resolved.
    fn core_topology(&self) -> CoreTopology;

    /// OS family + version string.
    fn os_info(&self) -> String;

    /// Physical memory snapshot; zeroed when the query fails.
    fn memory(&self) -> MemoryInfo;

    /// Total physical RAM in GiB (0.0 = unknown).
    fn total_ram_gb(&self) -> f64 {
        self.memory().total_gb()
    }

    /// Used physical RAM in GiB, total minus available (0.0 = unknown).
    fn used_ram_gb(&self) -> f64 {
        self.memory().used_gb()
    }

    /// Enumerate graphics adapters in platform-defined order.
    fn gpu_adapters(&self) -> Result<Vec<AdapterDescriptor>, TelemetryError>;

    /// Open and prime the long-lived whole-machine CPU counter.
    fn open_total_counter(&self) -> Result<Box<dyn CpuCounter>, TelemetryError>;

    /// Open and prime a dedicated counter scoped to one logical core.
    fn open_core_counter(&self, core: usize) -> Result<Box<dyn CpuCounter>, TelemetryError>;
}

#[cfg(windows)]
pub use crate::system::windows::WindowsProvider as PlatformProvider;

#[cfg(not(windows))]
pub use crate::system::collector::SysinfoProvider as PlatformProvider;

/// The concrete provider for the platform this build targets.
pub fn default_provider() -> PlatformProvider {
    PlatformProvider::new()
}
