//! hostprobe — static host inventory and fixed-cadence CPU utilization
//! sampling behind a stable C ABI.
//!
//! Features:
//!   - CPU brand string and physical/logical core topology
//!   - OS family + version (exact Windows build mapping)
//!   - Physical RAM totals and usage
//!   - GPU adapter enumeration (DXGI on Windows, DRM sysfs on Linux)
//!   - Averaged total and per-core CPU utilization (5 × 100 ms protocol)
//!   - `extern "C"` export table for consumption from any C-interop language
//!
//! Rust consumers use [`default_provider`] for one-shot inventory queries and
//! [`CpuSampler`] for utilization sampling; the [`ffi`] module exposes the
//! same operations through process-wide state for the C boundary.

pub mod error;
pub mod ffi;
pub mod provider;
pub mod sampler;
pub mod system;

pub use error::TelemetryError;
pub use provider::{default_provider, CpuCounter, HostTelemetryProvider, PlatformProvider};
pub use sampler::{CpuSampler, SamplerCell, SAMPLE_COUNT, SAMPLE_INTERVAL};
pub use system::cpu::{CoreTopology, UtilizationSample};
pub use system::gpu::AdapterDescriptor;
pub use system::memory::MemoryInfo;
