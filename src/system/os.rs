//! OS identification: marketing-name mapping for Windows version tuples,
//! plus the portable name + kernel release string for everything else.

use sysinfo::System;

/// Map a Windows version tuple to the marketing label.
///
/// Windows 11 kept major version 10 and is only distinguishable by build
/// number (>= 22000). Anything outside the known table is "Unknown".
pub fn windows_version_label(major: u32, minor: u32, build: u32) -> &'static str {
    match major {
        10 => {
            if build >= 22000 {
                "11"
            } else {
                "10"
            }
        }
        6 => match minor {
            0 => "Vista",
            1 => "7",
            2 => "8",
            3 => "8.1",
            _ => "Unknown",
        },
        _ => "Unknown",
    }
}

/// Render a Windows version tuple the way the reporter exposes it, e.g.
/// `"Windows 11 (Version 10.0, Build 22631)"`.
pub fn windows_os_description(major: u32, minor: u32, build: u32) -> String {
    format!(
        "Windows {} (Version {}.{}, Build {})",
        windows_version_label(major, minor, build),
        major,
        minor,
        build
    )
}

/// OS family + release string for non-Windows hosts, e.g. `"Ubuntu 6.8.0-41-generic"`.
pub fn os_description() -> String {
    let name = System::name().unwrap_or_else(|| "Unknown OS".to_string());
    let release = System::kernel_version().unwrap_or_else(|| "unknown".to_string());
    format!("{} {}", name, release)
}
