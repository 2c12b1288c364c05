//! Windows provider: PDH processor-time counters, DXGI adapter enumeration,
//! and the true kernel version via `RtlGetVersion`.
//!
//! Counter paths queried:
//!   \Processor(_Total)\% Processor Time   — whole-machine counter
//!   \Processor(N)\% Processor Time        — one per logical core

use tracing::debug;
use windows::core::{s, w};
use windows::Win32::Graphics::Dxgi::{CreateDXGIFactory, IDXGIFactory, DXGI_ERROR_NOT_FOUND};
use windows::Win32::System::LibraryLoader::{GetModuleHandleW, GetProcAddress};

use crate::error::TelemetryError;
use crate::provider::{CpuCounter, HostTelemetryProvider};
use crate::system::collector::SysinfoProvider;
use crate::system::cpu::CoreTopology;
use crate::system::gpu::AdapterDescriptor;
use crate::system::memory::MemoryInfo;
use crate::system::os;

/// Windows-native provider. CPU identity, topology and memory come from the
/// portable base; version, adapters and counters use Win32 directly.
#[derive(Debug, Default)]
pub struct WindowsProvider {
    base: SysinfoProvider,
}

impl WindowsProvider {
    pub fn new() -> Self {
        Self {
            base: SysinfoProvider::new(),
        }
    }
}

impl HostTelemetryProvider for WindowsProvider {
    fn cpu_name(&self) -> String {
        self.base.cpu_name()
    }

    fn core_topology(&self) -> CoreTopology {
        self.base.core_topology()
    }

    fn os_info(&self) -> String {
        match query_version_tuple() {
            Some((major, minor, build)) => os::windows_os_description(major, minor, build),
            None => "Windows (Version unknown)".to_string(),
        }
    }

    fn memory(&self) -> MemoryInfo {
        self.base.memory()
    }

    fn gpu_adapters(&self) -> Result<Vec<AdapterDescriptor>, TelemetryError> {
        enumerate_dxgi_adapters()
    }

    fn open_total_counter(&self) -> Result<Box<dyn CpuCounter>, TelemetryError> {
        Ok(Box::new(CounterQuery::open(TOTAL_CPU_COUNTER_PATH)?))
    }

    fn open_core_counter(&self, core: usize) -> Result<Box<dyn CpuCounter>, TelemetryError> {
        let path = format!("\\Processor({core})\\% Processor Time");
        Ok(Box::new(CounterQuery::open(&path)?))
    }
}

// ─── OS version ──────────────────────────────────────────────────────────────

#[repr(C)]
#[allow(non_snake_case)]
struct OSVERSIONINFOW {
    dwOSVersionInfoSize: u32,
    dwMajorVersion: u32,
    dwMinorVersion: u32,
    dwBuildNumber: u32,
    dwPlatformId: u32,
    szCSDVersion: [u16; 128],
}

/// Query the real (major, minor, build) tuple.
///
/// `RtlGetVersion` reports the true version even under compatibility shims,
/// unlike `GetVersionExW`. It is an ntdll export with no import library, so
/// it is resolved dynamically.
fn query_version_tuple() -> Option<(u32, u32, u32)> {
    unsafe {
        let ntdll = GetModuleHandleW(w!("ntdll.dll")).ok()?;
        let proc_addr = GetProcAddress(ntdll, s!("RtlGetVersion"))?;

        type RtlGetVersionFn = unsafe extern "system" fn(*mut OSVERSIONINFOW) -> i32;
        let rtl_get_version: RtlGetVersionFn = std::mem::transmute(proc_addr);

        let mut info: OSVERSIONINFOW = std::mem::zeroed();
        info.dwOSVersionInfoSize = std::mem::size_of::<OSVERSIONINFOW>() as u32;
        // STATUS_SUCCESS is 0
        if rtl_get_version(&mut info) != 0 {
            return None;
        }
        Some((info.dwMajorVersion, info.dwMinorVersion, info.dwBuildNumber))
    }
}

// ─── DXGI adapter enumeration ────────────────────────────────────────────────

fn enumerate_dxgi_adapters() -> Result<Vec<AdapterDescriptor>, TelemetryError> {
    let factory: IDXGIFactory = unsafe { CreateDXGIFactory() }.map_err(|e| {
        TelemetryError::AdapterEnumeration(format!("CreateDXGIFactory failed: {e}"))
    })?;

    let mut adapters = Vec::new();
    for index in 0.. {
        let adapter = match unsafe { factory.EnumAdapters(index) } {
            Ok(adapter) => adapter,
            Err(e) if e.code() == DXGI_ERROR_NOT_FOUND => break,
            Err(e) => {
                return Err(TelemetryError::AdapterEnumeration(format!(
                    "EnumAdapters({index}) failed: {e}"
                )))
            }
        };
        let desc = unsafe { adapter.GetDesc() }.map_err(|e| {
            TelemetryError::AdapterEnumeration(format!("GetDesc({index}) failed: {e}"))
        })?;

        let name_len = desc
            .Description
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(desc.Description.len());

        debug!(index, vendor_id = desc.VendorId, "found DXGI adapter");
        adapters.push(AdapterDescriptor {
            name: String::from_utf16_lossy(&desc.Description[..name_len]),
            dedicated_video_memory_mb: (desc.DedicatedVideoMemory / (1024 * 1024)) as u64,
            dedicated_system_memory_mb: (desc.DedicatedSystemMemory / (1024 * 1024)) as u64,
            shared_system_memory_mb: (desc.SharedSystemMemory / (1024 * 1024)) as u64,
            vendor_id: desc.VendorId,
            device_id: desc.DeviceId,
            subsystem_id: desc.SubSysId,
        });
    }
    Ok(adapters)
}

// ─── PDH FFI ─────────────────────────────────────────────────────────────────

type PdhQueryHandle = isize;
type PdhCounterHandle = isize;

const PDH_FMT_DOUBLE: u32 = 0x0000_0200;

const TOTAL_CPU_COUNTER_PATH: &str = "\\Processor(_Total)\\% Processor Time";

#[repr(C)]
#[derive(Copy, Clone)]
#[allow(non_snake_case)]
struct PDH_FMT_COUNTERVALUE_DOUBLE {
    CStatus: u32,
    doubleValue: f64,
}

#[link(name = "pdh")]
extern "system" {
    fn PdhOpenQueryW(
        szDataSource: *const u16,
        dwUserData: usize,
        phQuery: *mut PdhQueryHandle,
    ) -> u32;

    fn PdhAddEnglishCounterW(
        hQuery: PdhQueryHandle,
        szFullCounterPath: *const u16,
        dwUserData: usize,
        phCounter: *mut PdhCounterHandle,
    ) -> u32;

    fn PdhCollectQueryData(hQuery: PdhQueryHandle) -> u32;

    fn PdhGetFormattedCounterValue(
        hCounter: PdhCounterHandle,
        dwFormat: u32,
        lpdwType: *mut u32,
        pValue: *mut PDH_FMT_COUNTERVALUE_DOUBLE,
    ) -> u32;

    fn PdhCloseQuery(hQuery: PdhQueryHandle) -> u32;
}

/// One open PDH query bound to a single processor-time counter.
///
/// Rate counters need two collections before the first formatted value is
/// meaningful, so `open` collects the baseline sample immediately.
struct CounterQuery {
    query: PdhQueryHandle,
    counter: PdhCounterHandle,
}

impl CounterQuery {
    fn open(path: &str) -> Result<Self, TelemetryError> {
        let wide = to_wide(path);
        let mut query: PdhQueryHandle = 0;
        let mut counter: PdhCounterHandle = 0;
        unsafe {
            let status = PdhOpenQueryW(std::ptr::null(), 0, &mut query);
            if status != 0 {
                return Err(TelemetryError::CounterQuery(format!(
                    "PdhOpenQuery failed: 0x{status:08x}"
                )));
            }
            let status = PdhAddEnglishCounterW(query, wide.as_ptr(), 0, &mut counter);
            if status != 0 {
                PdhCloseQuery(query);
                return Err(TelemetryError::CounterQuery(format!(
                    "PdhAddEnglishCounter({path}) failed: 0x{status:08x}"
                )));
            }
            PdhCollectQueryData(query);
        }
        Ok(Self { query, counter })
    }
}

impl CpuCounter for CounterQuery {
    fn read(&mut self) -> Result<f64, TelemetryError> {
        unsafe {
            let status = PdhCollectQueryData(self.query);
            if status != 0 {
                return Err(TelemetryError::CounterQuery(format!(
                    "PdhCollectQueryData failed: 0x{status:08x}"
                )));
            }
            let mut value = PDH_FMT_COUNTERVALUE_DOUBLE {
                CStatus: 0,
                doubleValue: 0.0,
            };
            let status = PdhGetFormattedCounterValue(
                self.counter,
                PDH_FMT_DOUBLE,
                std::ptr::null_mut(),
                &mut value,
            );
            if status != 0 {
                return Err(TelemetryError::CounterQuery(format!(
                    "PdhGetFormattedCounterValue failed: 0x{status:08x}"
                )));
            }
            if value.CStatus != 0 {
                return Err(TelemetryError::CounterQuery(format!(
                    "counter data invalid: 0x{:08x}",
                    value.CStatus
                )));
            }
            Ok(value.doubleValue)
        }
    }
}

impl Drop for CounterQuery {
    fn drop(&mut self) {
        if self.query != 0 {
            unsafe {
                PdhCloseQuery(self.query);
            }
        }
    }
}

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}
