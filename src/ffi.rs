//! C-linkage boundary: a flat export table callable from any language with
//! C interop.
//!
//! Contract notes:
//!   - `GetCPUName`/`GetOSInfo` return pointers into process-wide storage
//!     computed once and kept for the process lifetime.
//!   - `GetGPUInfo`/`GetGPUUsage` recompute on every call; the returned
//!     pointer stays valid until the next call to the same function, so
//!     callers copy before re-invoking.
//!   - `GetCPUUsage` transfers ownership of the per-core array to the
//!     caller, who releases it exactly once via `FreeCoreUsage`.

#![allow(non_snake_case)]

use std::ffi::{c_char, CString};
use std::sync::{Mutex, OnceLock};

use tracing::warn;

use crate::provider::{default_provider, HostTelemetryProvider, PlatformProvider};
use crate::sampler::{gpu_usage_stub, SamplerCell};
use crate::system::gpu::join_descriptions;

/// Sampling succeeded.
pub const STATUS_OK: i32 = 0;
/// `InitializeSystemInfo` has not been called (or its counter open failed).
pub const STATUS_NOT_INITIALIZED: i32 = -1;
/// The counter query failed mid-protocol.
pub const STATUS_QUERY_FAILED: i32 = -2;

static SAMPLER: SamplerCell = SamplerCell::new();
static PROVIDER: OnceLock<PlatformProvider> = OnceLock::new();

static CPU_NAME: OnceLock<CString> = OnceLock::new();
static OS_INFO: OnceLock<CString> = OnceLock::new();
static GPU_INFO: Mutex<Option<CString>> = Mutex::new(None);
static GPU_USAGE: Mutex<Option<CString>> = Mutex::new(None);

fn provider() -> &'static PlatformProvider {
    PROVIDER.get_or_init(default_provider)
}

fn to_cstring(s: String) -> CString {
    // interior NULs cannot come from the platform queries; degrade to empty
    CString::new(s).unwrap_or_default()
}

/// Store a freshly computed string in its slot and hand out the pointer.
/// The previous value (and any pointer into it) dies here.
fn stash(slot: &Mutex<Option<CString>>, value: String) -> *const c_char {
    let mut guard = slot.lock().unwrap_or_else(|e| e.into_inner());
    let cstr = to_cstring(value);
    let ptr = cstr.as_ptr();
    *guard = Some(cstr);
    ptr
}

/// Physical/logical core counts, by value.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CpuCoreInfo {
    pub physical_cores: i32,
    pub logical_cores: i32,
}

/// Result of [`GetCPUUsage`].
///
/// On `STATUS_OK`, `core_usage` points to `core_count` doubles owned by the
/// caller, to be released exactly once via [`FreeCoreUsage`]. On any negative
/// status the pointer is null and the values are zero.
#[repr(C)]
#[derive(Debug)]
pub struct CpuUsageReport {
    pub status: i32,
    pub total_usage: f64,
    pub core_usage: *mut f64,
    pub core_count: usize,
}

impl CpuUsageReport {
    fn failure(status: i32) -> Self {
        Self {
            status,
            total_usage: 0.0,
            core_usage: std::ptr::null_mut(),
            core_count: 0,
        }
    }
}

/// Open and prime the process-wide total-CPU counter. Must be called once
/// before `GetCPUUsage`; repeated calls are no-ops. On failure the sampler
/// stays uninitialized and later sampling calls report
/// `STATUS_NOT_INITIALIZED`.
#[no_mangle]
pub extern "C" fn InitializeSystemInfo() {
    if let Err(err) = SAMPLER.initialize(Box::new(default_provider())) {
        warn!(error = %err, "sampler initialization failed");
    }
}

/// Human-readable CPU brand string, cached process-wide after the first call.
#[no_mangle]
pub extern "C" fn GetCPUName() -> *const c_char {
    CPU_NAME
        .get_or_init(|| to_cstring(provider().cpu_name()))
        .as_ptr()
}

/// Core topology, by value.
#[no_mangle]
pub extern "C" fn GetCPUCores() -> CpuCoreInfo {
    let topology = provider().core_topology();
    CpuCoreInfo {
        physical_cores: topology.physical_cores as i32,
        logical_cores: topology.logical_cores as i32,
    }
}

/// OS family + version string, cached process-wide after the first call.
#[no_mangle]
pub extern "C" fn GetOSInfo() -> *const c_char {
    OS_INFO
        .get_or_init(|| to_cstring(provider().os_info()))
        .as_ptr()
}

/// Total physical RAM in GiB; 0.0 means the query failed.
#[no_mangle]
pub extern "C" fn GetTotalRAM() -> f64 {
    provider().total_ram_gb()
}

/// Used physical RAM in GiB (total minus available); 0.0 means unknown.
#[no_mangle]
pub extern "C" fn GetUsedRAM() -> f64 {
    provider().used_ram_gb()
}

/// Newline-joined adapter descriptions, or a descriptive failure string when
/// enumeration is unavailable. Valid until the next `GetGPUInfo` call.
#[no_mangle]
pub extern "C" fn GetGPUInfo() -> *const c_char {
    let text = match provider().gpu_adapters() {
        Ok(adapters) => join_descriptions(&adapters),
        Err(err) => err.to_string(),
    };
    stash(&GPU_INFO, text)
}

/// Run the full CPU sampling protocol (total, then per-core). Blocks for
/// 500 ms plus 500 ms per logical core.
#[no_mangle]
pub extern "C" fn GetCPUUsage() -> CpuUsageReport {
    let sampler = match SAMPLER.get() {
        Ok(sampler) => sampler,
        Err(_) => return CpuUsageReport::failure(STATUS_NOT_INITIALIZED),
    };
    match sampler.sample() {
        Ok(sample) => {
            let cores = sample.per_core_usage_percent.into_boxed_slice();
            let core_count = cores.len();
            let core_usage = Box::into_raw(cores) as *mut f64;
            CpuUsageReport {
                status: STATUS_OK,
                total_usage: sample.total_usage_percent,
                core_usage,
                core_count,
            }
        }
        Err(err) => {
            warn!(error = %err, "CPU usage sampling failed");
            CpuUsageReport::failure(STATUS_QUERY_FAILED)
        }
    }
}

/// Release the array returned in [`CpuUsageReport`].
///
/// # Safety
/// `data` must be a pointer obtained from `GetCPUUsage` together with its
/// original `core_count`, released at most once. Null is a no-op.
#[no_mangle]
pub unsafe extern "C" fn FreeCoreUsage(data: *mut f64, len: usize) {
    if data.is_null() {
        return;
    }
    drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(data, len)));
}

/// Newline-joined `"<value>%"` lines, one per GPU reading; currently the 0.0
/// placeholder. Valid until the next `GetGPUUsage` call.
#[no_mangle]
pub extern "C" fn GetGPUUsage() -> *const c_char {
    let lines: Vec<String> = gpu_usage_stub()
        .iter()
        .map(|v| format!("{v:.1}%"))
        .collect();
    stash(&GPU_USAGE, lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;

    use super::*;

    // None of these tests may call InitializeSystemInfo: the not-initialized
    // contract below needs the process-wide sampler to stay cold.

    #[test]
    fn cpu_usage_requires_initialization() {
        let report = GetCPUUsage();
        assert_eq!(report.status, STATUS_NOT_INITIALIZED);
        assert!(report.core_usage.is_null());
        assert_eq!(report.core_count, 0);
        assert_eq!(report.total_usage, 0.0);
    }

    #[test]
    fn cpu_name_is_cached_and_stable() {
        let first = unsafe { CStr::from_ptr(GetCPUName()) }.to_owned();
        let second = unsafe { CStr::from_ptr(GetCPUName()) }.to_owned();
        assert_eq!(first, second);
        assert!(!first.to_bytes().is_empty());
    }

    #[test]
    fn core_counts_are_sane() {
        let cores = GetCPUCores();
        assert!(cores.logical_cores >= 1);
        assert!(cores.physical_cores >= 1);
        assert!(cores.physical_cores <= cores.logical_cores);
    }

    #[test]
    fn ram_totals_are_ordered() {
        let total = GetTotalRAM();
        let used = GetUsedRAM();
        assert!(total >= used);
        assert!(used >= 0.0);
    }

    #[test]
    fn os_info_is_a_nonempty_string() {
        let info = unsafe { CStr::from_ptr(GetOSInfo()) };
        assert!(!info.to_bytes().is_empty());
    }

    #[test]
    fn gpu_info_is_always_a_valid_string() {
        let text = unsafe { CStr::from_ptr(GetGPUInfo()) };
        assert!(text.to_str().is_ok());
    }

    #[test]
    fn gpu_usage_is_percent_lines() {
        let text = unsafe { CStr::from_ptr(GetGPUUsage()) }
            .to_str()
            .expect("utf8")
            .to_owned();
        assert!(!text.is_empty());
        for line in text.lines() {
            assert!(line.ends_with('%'));
        }
    }

    #[test]
    fn free_core_usage_ignores_null() {
        unsafe { FreeCoreUsage(std::ptr::null_mut(), 0) };
    }

    #[test]
    fn free_core_usage_releases_a_caller_owned_array() {
        let data = vec![1.0f64, 2.0].into_boxed_slice();
        let len = data.len();
        let ptr = Box::into_raw(data) as *mut f64;
        unsafe { FreeCoreUsage(ptr, len) };
    }
}
