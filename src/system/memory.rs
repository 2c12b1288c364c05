use serde::Serialize;

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Physical memory snapshot.
///
/// `used_mem` is `total - available`: memory the OS could not hand to a new
/// allocation right now. A zeroed snapshot is the "unknown" sentinel for
/// hosts where the query fails, never an error signal.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MemoryInfo {
    pub total_mem: u64,     // bytes
    pub available_mem: u64, // bytes
    pub used_mem: u64,      // bytes
}

impl MemoryInfo {
    pub fn new(total_mem: u64, available_mem: u64) -> Self {
        Self {
            total_mem,
            available_mem,
            used_mem: total_mem.saturating_sub(available_mem),
        }
    }

    /// Total physical RAM in GiB (0.0 = unknown).
    pub fn total_gb(&self) -> f64 {
        self.total_mem as f64 / BYTES_PER_GIB
    }

    /// Used physical RAM in GiB (0.0 = unknown).
    pub fn used_gb(&self) -> f64 {
        self.used_mem as f64 / BYTES_PER_GIB
    }

    /// Memory usage as percentage
    pub fn mem_percent(&self) -> f64 {
        if self.total_mem == 0 {
            0.0
        } else {
            (self.used_mem as f64 / self.total_mem as f64) * 100.0
        }
    }
}

/// Format bytes to human-readable string (KiB, MiB, GiB)
pub fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    const GIB: u64 = 1024 * MIB;
    const TIB: u64 = 1024 * GIB;

    if bytes >= TIB {
        format!("{:.1}T", bytes as f64 / TIB as f64)
    } else if bytes >= GIB {
        format!("{:.1}G", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.0}M", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.0}K", bytes as f64 / KIB as f64)
    } else {
        format!("{}B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn used_is_total_minus_available() {
        let mem = MemoryInfo::new(16 * 1024 * 1024 * 1024, 10 * 1024 * 1024 * 1024);
        assert_eq!(mem.used_mem, 6 * 1024 * 1024 * 1024);
        assert!((mem.total_gb() - 16.0).abs() < 1e-9);
        assert!((mem.used_gb() - 6.0).abs() < 1e-9);
        assert!((mem.mem_percent() - 37.5).abs() < 1e-9);
    }

    #[test]
    fn zero_total_is_the_unknown_sentinel() {
        let mem = MemoryInfo::new(0, 0);
        assert_eq!(mem.total_gb(), 0.0);
        assert_eq!(mem.used_gb(), 0.0);
        assert_eq!(mem.mem_percent(), 0.0);
    }

    #[test]
    fn available_larger_than_total_saturates() {
        let mem = MemoryInfo::new(100, 200);
        assert_eq!(mem.used_mem, 0);
    }

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(512), "512B");
        assert_eq!(format_bytes(2048), "2K");
        assert_eq!(format_bytes(8 * 1024 * 1024), "8M");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024 / 2), "1.5G");
    }
}
