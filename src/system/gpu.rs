//! GPU adapter descriptors and best-effort enumeration.
//!
//! Windows enumerates through DXGI (see `system::windows`); Linux scans the
//! DRM sysfs tree (`/sys/class/drm/card*`), which exposes PCI IDs for every
//! adapter and, driver permitting, VRAM size. Utilization sampling stays a
//! stub until a vendor backend (NVML and friends) is plugged in behind the
//! provider trait.

use serde::Serialize;

/// One enumerated graphics adapter.
///
/// Enumeration order is platform-defined and not guaranteed stable across
/// calls. Memory sizes of 0 mean "not reported", not "no memory".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdapterDescriptor {
    pub name: String,
    pub dedicated_video_memory_mb: u64,
    pub dedicated_system_memory_mb: u64,
    pub shared_system_memory_mb: u64,
    pub vendor_id: u32,
    pub device_id: u32,
    pub subsystem_id: u32,
}

impl AdapterDescriptor {
    /// Multi-line human-readable description, one adapter per block:
    /// name, memory sizes in MB, then lower-hex PCI IDs.
    pub fn render(&self) -> String {
        format!(
            "{}\n  Dedicated Video Memory: {} MB\n  Dedicated System Memory: {} MB\n  Shared System Memory: {} MB\n  Vendor ID: 0x{:x}\n  Device ID: 0x{:x}\n  Subsystem ID: 0x{:x}",
            self.name,
            self.dedicated_video_memory_mb,
            self.dedicated_system_memory_mb,
            self.shared_system_memory_mb,
            self.vendor_id,
            self.device_id,
            self.subsystem_id,
        )
    }
}

/// Join adapter descriptions into the newline-separated report string.
pub fn join_descriptions(adapters: &[AdapterDescriptor]) -> String {
    adapters
        .iter()
        .map(AdapterDescriptor::render)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Well-known PCI vendor IDs, used to label adapters on platforms where no
/// marketing name is exposed.
pub fn vendor_name(vendor_id: u32) -> &'static str {
    match vendor_id {
        0x10de => "NVIDIA",
        0x1002 | 0x1022 => "AMD",
        0x8086 => "Intel",
        0x15ad => "VMware",
        0x1af4 => "Virtio",
        _ => "Unknown vendor",
    }
}

/// Parse a sysfs-style hex attribute (`"0x10de\n"`) into an ID.
pub fn parse_hex_id(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    u32::from_str_radix(digits, 16).ok()
}

#[cfg(target_os = "linux")]
pub use drm::enumerate_adapters;

#[cfg(target_os = "linux")]
mod drm {
    use std::path::Path;

    use tracing::debug;

    use super::{parse_hex_id, vendor_name, AdapterDescriptor};
    use crate::error::TelemetryError;

    const DRM_ROOT: &str = "/sys/class/drm";

    /// Enumerate adapters from the DRM sysfs tree.
    ///
    /// Only top-level `cardN` nodes are adapters; `cardN-<connector>` entries
    /// are display outputs and are skipped. VRAM size is only populated where
    /// the driver exposes `mem_info_vram_total` (amdgpu does, i915 does not).
    pub fn enumerate_adapters() -> Result<Vec<AdapterDescriptor>, TelemetryError> {
        let entries = std::fs::read_dir(DRM_ROOT)
            .map_err(|e| TelemetryError::AdapterEnumeration(format!("{DRM_ROOT}: {e}")))?;

        let mut cards: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|name| is_card_node(name))
            .collect();
        cards.sort();

        let mut adapters = Vec::with_capacity(cards.len());
        for card in &cards {
            let device = Path::new(DRM_ROOT).join(card).join("device");

            let vendor_id = read_hex_attr(&device.join("vendor")).unwrap_or(0);
            let device_id = read_hex_attr(&device.join("device")).unwrap_or(0);
            let subsystem_id = read_hex_attr(&device.join("subsystem_device")).unwrap_or(0);
            let vram_bytes = read_u64_attr(&device.join("mem_info_vram_total")).unwrap_or(0);

            debug!(%card, vendor_id, device_id, "found DRM adapter");
            adapters.push(AdapterDescriptor {
                name: format!("{} adapter ({})", vendor_name(vendor_id), card),
                dedicated_video_memory_mb: vram_bytes / (1024 * 1024),
                dedicated_system_memory_mb: 0,
                shared_system_memory_mb: 0,
                vendor_id,
                device_id,
                subsystem_id,
            });
        }

        if adapters.is_empty() {
            return Err(TelemetryError::AdapterEnumeration(
                "no DRM adapters found".to_string(),
            ));
        }
        Ok(adapters)
    }

    /// `card0`, `card1`, ... but not `card0-HDMI-A-1`.
    fn is_card_node(name: &str) -> bool {
        name.strip_prefix("card")
            .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
    }

    fn read_hex_attr(path: &Path) -> Option<u32> {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| parse_hex_id(&s))
    }

    fn read_u64_attr(path: &Path) -> Option<u64> {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }

    #[cfg(test)]
    mod tests {
        use super::is_card_node;

        #[test]
        fn card_nodes_vs_connectors() {
            assert!(is_card_node("card0"));
            assert!(is_card_node("card12"));
            assert!(!is_card_node("card0-HDMI-A-1"));
            assert!(!is_card_node("card"));
            assert!(!is_card_node("renderD128"));
        }
    }
}
