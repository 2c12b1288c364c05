//! The periodic sampling protocol: fixed-count, fixed-interval polling over
//! counter handles, and the process-wide sampler slot behind the C boundary.

use std::sync::{Mutex, OnceLock};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::TelemetryError;
use crate::provider::{CpuCounter, HostTelemetryProvider};
use crate::system::cpu::UtilizationSample;

/// Collection cycles averaged into one reported value.
pub const SAMPLE_COUNT: usize = 5;

/// Pause before each collection cycle.
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Run the fixed-cadence protocol against one open counter: 5 collection
/// cycles, each preceded by a 100 ms pause, arithmetic mean of the readings.
/// The cadence is fixed; every call blocks for at least 500 ms.
pub fn sample_average(counter: &mut dyn CpuCounter) -> Result<f64, TelemetryError> {
    let mut total = 0.0;
    for _ in 0..SAMPLE_COUNT {
        thread::sleep(SAMPLE_INTERVAL);
        let reading = counter.read()?;
        // Readers refreshed faster than their platform guarantees can emit
        // garbage; non-finite readings count as idle.
        total += if reading.is_finite() { reading } else { 0.0 };
    }
    Ok((total / SAMPLE_COUNT as f64).clamp(0.0, 100.0))
}

/// GPU utilization readings: a single 0.0 placeholder until a vendor backend
/// (NVML and friends) is implemented behind the provider trait. Callers must
/// not assume a non-trivial value.
pub fn gpu_usage_stub() -> Vec<f64> {
    vec![0.0]
}

/// Ready-state utilization sampler owning the long-lived total-CPU counter.
///
/// Created once via [`CpuSampler::open`]; every total-CPU sampling call
/// collects from the same counter. The mutex serializes readers (the
/// portable counter mutates its own delta state on every read), so sampling
/// calls from multiple threads interleave safely but block each other for
/// the polling duration.
pub struct CpuSampler {
    provider: Box<dyn HostTelemetryProvider>,
    total: Mutex<Box<dyn CpuCounter>>,
}

impl CpuSampler {
    /// Open and prime the total-CPU counter.
    pub fn open(provider: Box<dyn HostTelemetryProvider>) -> Result<Self, TelemetryError> {
        let total = provider.open_total_counter()?;
        debug!("total-CPU counter opened");
        Ok(Self {
            provider,
            total: Mutex::new(total),
        })
    }

    /// Average total-CPU utilization over the fixed protocol. Blocks the
    /// calling thread for at least 500 ms.
    pub fn sample_total(&self) -> Result<f64, TelemetryError> {
        let mut counter = self.total.lock().unwrap_or_else(|e| e.into_inner());
        sample_average(counter.as_mut())
    }

    /// Per-core utilization in core-index order, one dedicated short-lived
    /// counter per logical core, each run through the same fixed protocol.
    ///
    /// Core failures are isolated: a core whose counter cannot be opened or
    /// read contributes the 0.0 sentinel and the remaining cores still get
    /// sampled.
    pub fn sample_per_core(&self) -> Vec<f64> {
        let topology = self.provider.core_topology();
        let mut usages = Vec::with_capacity(topology.logical_cores);
        for core in 0..topology.logical_cores {
            let usage = self
                .provider
                .open_core_counter(core)
                .and_then(|mut counter| sample_average(counter.as_mut()))
                .unwrap_or_else(|err| {
                    warn!(core, error = %err, "per-core sampling failed, reporting 0.0");
                    0.0
                });
            usages.push(usage);
        }
        usages
    }

    /// Total plus per-core utilization in one call. Wall-clock cost is the
    /// sum of both protocols; nothing runs concurrently.
    pub fn sample(&self) -> Result<UtilizationSample, TelemetryError> {
        Ok(UtilizationSample {
            total_usage_percent: self.sample_total()?,
            per_core_usage_percent: self.sample_per_core(),
        })
    }

    /// GPU utilization; see [`gpu_usage_stub`].
    pub fn sample_gpu(&self) -> Vec<f64> {
        gpu_usage_stub()
    }
}

/// Process-wide sampler slot for the C boundary.
///
/// `initialize` opens the sampler exactly once; later calls are logged
/// no-ops. `get` before initialization is an explicit error, never a
/// plausible-looking zero.
pub struct SamplerCell(OnceLock<CpuSampler>);

impl SamplerCell {
    pub const fn new() -> Self {
        Self(OnceLock::new())
    }

    pub fn initialize(
        &self,
        provider: Box<dyn HostTelemetryProvider>,
    ) -> Result<(), TelemetryError> {
        if self.0.get().is_some() {
            debug!("sampler already initialized, ignoring");
            return Ok(());
        }
        let sampler = CpuSampler::open(provider)?;
        // A lost set() race means another thread initialized first; its
        // sampler wins and ours is dropped.
        let _ = self.0.set(sampler);
        Ok(())
    }

    pub fn get(&self) -> Result<&CpuSampler, TelemetryError> {
        self.0.get().ok_or(TelemetryError::NotInitialized)
    }

    pub fn is_initialized(&self) -> bool {
        self.0.get().is_some()
    }
}

impl Default for SamplerCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::provider::default_provider;
    use crate::system::cpu::CoreTopology;
    use crate::system::gpu::AdapterDescriptor;
    use crate::system::memory::MemoryInfo;

    struct ScriptedCounter {
        readings: Vec<f64>,
        reads: usize,
    }

    impl ScriptedCounter {
        fn new(readings: &[f64]) -> Self {
            Self {
                readings: readings.to_vec(),
                reads: 0,
            }
        }
    }

    impl CpuCounter for ScriptedCounter {
        fn read(&mut self) -> Result<f64, TelemetryError> {
            let value = self.readings[self.reads % self.readings.len()];
            self.reads += 1;
            Ok(value)
        }
    }

    struct FailingCounter;

    impl CpuCounter for FailingCounter {
        fn read(&mut self) -> Result<f64, TelemetryError> {
            Err(TelemetryError::CounterQuery("scripted failure".to_string()))
        }
    }

    struct FakeProvider {
        cores: usize,
        broken_core: Option<usize>,
    }

    impl HostTelemetryProvider for FakeProvider {
        fn cpu_name(&self) -> String {
            "Fake CPU".to_string()
        }

        fn core_topology(&self) -> CoreTopology {
            CoreTopology {
                physical_cores: (self.cores / 2).max(1),
                logical_cores: self.cores,
            }
        }

        fn os_info(&self) -> String {
            "FakeOS 1.0".to_string()
        }

        fn memory(&self) -> MemoryInfo {
            MemoryInfo::new(8 << 30, 4 << 30)
        }

        fn gpu_adapters(&self) -> Result<Vec<AdapterDescriptor>, TelemetryError> {
            Ok(Vec::new())
        }

        fn open_total_counter(&self) -> Result<Box<dyn CpuCounter>, TelemetryError> {
            Ok(Box::new(ScriptedCounter::new(&[
                10.0, 20.0, 30.0, 40.0, 50.0,
            ])))
        }

        fn open_core_counter(&self, core: usize) -> Result<Box<dyn CpuCounter>, TelemetryError> {
            if Some(core) == self.broken_core {
                Err(TelemetryError::CounterQuery(format!("core {core} unreadable")))
            } else {
                Ok(Box::new(ScriptedCounter::new(&[40.0])))
            }
        }
    }

    #[test]
    fn average_reads_exactly_five_values() {
        let mut counter = ScriptedCounter::new(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let mean = sample_average(&mut counter).expect("scripted counter never fails");
        assert_eq!(counter.reads, SAMPLE_COUNT);
        assert!((mean - 30.0).abs() < 1e-9);
    }

    #[test]
    fn average_takes_at_least_the_protocol_duration() {
        let mut counter = ScriptedCounter::new(&[0.0]);
        let start = Instant::now();
        sample_average(&mut counter).expect("scripted counter never fails");
        assert!(start.elapsed() >= SAMPLE_INTERVAL * SAMPLE_COUNT as u32);
    }

    #[test]
    fn average_clamps_out_of_range_readings() {
        let mut hot = ScriptedCounter::new(&[150.0]);
        assert_eq!(sample_average(&mut hot).unwrap(), 100.0);

        let mut negative = ScriptedCounter::new(&[-10.0]);
        assert_eq!(sample_average(&mut negative).unwrap(), 0.0);
    }

    #[test]
    fn average_sanitizes_non_finite_readings() {
        let mut broken = ScriptedCounter::new(&[f64::NAN]);
        assert_eq!(sample_average(&mut broken).unwrap(), 0.0);
    }

    #[test]
    fn average_propagates_counter_failure() {
        let mut counter = FailingCounter;
        assert!(matches!(
            sample_average(&mut counter),
            Err(TelemetryError::CounterQuery(_))
        ));
    }

    #[test]
    fn per_core_failure_is_isolated() {
        let sampler = CpuSampler::open(Box::new(FakeProvider {
            cores: 3,
            broken_core: Some(1),
        }))
        .expect("fake provider opens");

        let usages = sampler.sample_per_core();
        assert_eq!(usages, vec![40.0, 0.0, 40.0]);
    }

    #[test]
    fn sample_composes_total_and_cores() {
        let sampler = CpuSampler::open(Box::new(FakeProvider {
            cores: 2,
            broken_core: None,
        }))
        .expect("fake provider opens");

        let sample = sampler.sample().expect("scripted counters never fail");
        assert!((sample.total_usage_percent - 30.0).abs() < 1e-9);
        assert_eq!(sample.per_core_usage_percent.len(), 2);
    }

    #[test]
    fn gpu_sampling_is_a_stub() {
        let sampler = CpuSampler::open(Box::new(FakeProvider {
            cores: 1,
            broken_core: None,
        }))
        .expect("fake provider opens");
        assert_eq!(sampler.sample_gpu(), vec![0.0]);
    }

    #[test]
    fn cell_requires_initialization() {
        let cell = SamplerCell::new();
        assert!(!cell.is_initialized());
        assert!(matches!(cell.get(), Err(TelemetryError::NotInitialized)));
    }

    #[test]
    fn cell_initializes_once() {
        let cell = SamplerCell::new();
        cell.initialize(Box::new(FakeProvider {
            cores: 1,
            broken_core: None,
        }))
        .expect("fake provider opens");
        assert!(cell.is_initialized());
        assert!(cell.get().is_ok());

        // re-initialization is a no-op, not an error
        cell.initialize(Box::new(FakeProvider {
            cores: 1,
            broken_core: None,
        }))
        .expect("second call is a no-op");
    }

    #[test]
    fn live_total_sampling_is_in_range() {
        let sampler =
            CpuSampler::open(Box::new(default_provider())).expect("host counter opens");
        let start = Instant::now();
        let value = sampler.sample_total().expect("host counter reads");
        assert!(start.elapsed() >= Duration::from_millis(500));
        assert!((0.0..=100.0).contains(&value));
    }

    #[test]
    fn live_per_core_matches_topology() {
        let provider = default_provider();
        let logical = provider.core_topology().logical_cores;
        let sampler = CpuSampler::open(Box::new(provider)).expect("host counter opens");

        let usages = sampler.sample_per_core();
        assert_eq!(usages.len(), logical);
        assert!(usages.iter().all(|v| (0.0..=100.0).contains(v)));
    }
}
