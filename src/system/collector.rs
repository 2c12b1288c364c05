//! Portable provider backed by the `sysinfo` crate.
//!
//! Inventory queries build a fresh `System` scoped to what they need; each
//! counter owns its own `System` so delta tracking stays independent between
//! the long-lived total counter and the short-lived per-core ones.

use sysinfo::System;
use tracing::debug;

use crate::error::TelemetryError;
use crate::provider::{CpuCounter, HostTelemetryProvider};
use crate::system::cpu::CoreTopology;
use crate::system::gpu::AdapterDescriptor;
use crate::system::memory::MemoryInfo;
use crate::system::os;

/// `sysinfo`-based provider; the default on every non-Windows platform and
/// the base the Windows provider delegates to.
#[derive(Debug, Default)]
pub struct SysinfoProvider;

impl SysinfoProvider {
    pub fn new() -> Self {
        Self
    }
}

impl HostTelemetryProvider for SysinfoProvider {
    fn cpu_name(&self) -> String {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        sys.cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .filter(|brand| !brand.is_empty())
            .unwrap_or_else(|| "Unknown CPU".to_string())
    }

    fn core_topology(&self) -> CoreTopology {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        let logical = sys.cpus().len().max(1);
        // Halving fallback assumes two-way SMT; approximate only, used when
        // the authoritative count cannot be resolved.
        let physical = sys
            .physical_core_count()
            .unwrap_or_else(|| (logical / 2).max(1))
            .clamp(1, logical);
        CoreTopology {
            physical_cores: physical,
            logical_cores: logical,
        }
    }

    fn os_info(&self) -> String {
        os::os_description()
    }

    fn memory(&self) -> MemoryInfo {
        let mut sys = System::new();
        sys.refresh_memory();
        MemoryInfo::new(sys.total_memory(), sys.available_memory())
    }

    fn gpu_adapters(&self) -> Result<Vec<AdapterDescriptor>, TelemetryError> {
        #[cfg(target_os = "linux")]
        {
            crate::system::gpu::enumerate_adapters()
        }
        #[cfg(not(target_os = "linux"))]
        {
            Err(TelemetryError::Unsupported("GPU adapter enumeration"))
        }
    }

    fn open_total_counter(&self) -> Result<Box<dyn CpuCounter>, TelemetryError> {
        Ok(Box::new(SysinfoCounter::open(CounterScope::Total)?))
    }

    fn open_core_counter(&self, core: usize) -> Result<Box<dyn CpuCounter>, TelemetryError> {
        Ok(Box::new(SysinfoCounter::open(CounterScope::Core(core))?))
    }
}

/// Which slice of the CPU a counter reads.
#[derive(Debug, Clone, Copy)]
pub(crate) enum CounterScope {
    Total,
    Core(usize),
}

/// Delta-tracking CPU reader with its own `System`.
///
/// Usage percentages are computed against the previous refresh, so opening
/// performs one discard refresh to establish the baseline.
pub(crate) struct SysinfoCounter {
    sys: System,
    scope: CounterScope,
}

impl SysinfoCounter {
    pub(crate) fn open(scope: CounterScope) -> Result<Self, TelemetryError> {
        let mut sys = System::new();
        sys.refresh_cpu_usage();
        if let CounterScope::Core(core) = scope {
            let available = sys.cpus().len();
            if core >= available {
                return Err(TelemetryError::CounterQuery(format!(
                    "no such core {core} (host has {available})"
                )));
            }
        }
        debug!(?scope, "cpu counter opened");
        Ok(Self { sys, scope })
    }
}

impl CpuCounter for SysinfoCounter {
    fn read(&mut self) -> Result<f64, TelemetryError> {
        self.sys.refresh_cpu_usage();
        match self.scope {
            CounterScope::Total => Ok(self.sys.global_cpu_usage() as f64),
            CounterScope::Core(core) => self
                .sys
                .cpus()
                .get(core)
                .map(|cpu| cpu.cpu_usage() as f64)
                .ok_or_else(|| {
                    TelemetryError::CounterQuery(format!("core {core} disappeared"))
                }),
        }
    }
}
