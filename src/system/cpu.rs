use serde::Serialize;

/// CPU core topology snapshot.
///
/// Recomputed on every call; carries no identity beyond the call that
/// produced it. `physical_cores` comes from the platform's authoritative
/// topology source where available. When it is not, the count falls back to
/// `logical_cores / 2`: an **approximation** that assumes two-way SMT and
/// is wrong whenever SMT is disabled or core counts are odd.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoreTopology {
    pub physical_cores: usize,
    pub logical_cores: usize,
}

/// Averaged CPU utilization produced by one sampling call.
///
/// `per_core_usage_percent` is ordered by core index and has exactly
/// `CoreTopology::logical_cores` entries. The caller owns the sample
/// exclusively once returned.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UtilizationSample {
    pub total_usage_percent: f64,
    pub per_core_usage_percent: Vec<f64>,
}
