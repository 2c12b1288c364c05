//! Error types for host telemetry queries.

/// Errors produced by inventory queries and utilization sampling.
///
/// Inventory operations generally degrade to sentinel values instead of
/// surfacing these; sampling operations return them explicitly.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// A sampling call was made before the total-CPU counter was opened.
    #[error("sampler not initialized: call InitializeSystemInfo/CpuSampler::open first")]
    NotInitialized,

    /// The underlying performance-counter API rejected or failed a query.
    #[error("counter query failed: {0}")]
    CounterQuery(String),

    /// The graphics adapter enumeration API failed.
    #[error("adapter enumeration failed: {0}")]
    AdapterEnumeration(String),

    /// The operation has no implementation on the running platform.
    #[error("not supported on this platform: {0}")]
    Unsupported(&'static str),
}
