//! hostprobe — command-line host telemetry inspector.
//!
//! Prints the static inventory and one averaged CPU utilization sample.
//! Flags: `--json` for a machine-readable document, `--no-sample` to skip
//! the blocking sampling protocol.

use anyhow::Result;
use chrono::Local;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hostprobe::system::gpu::join_descriptions;
use hostprobe::system::memory::format_bytes;
use hostprobe::{default_provider, CpuSampler, HostTelemetryProvider};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hostprobe=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let json = args.iter().any(|a| a == "--json");
    let with_sample = !args.iter().any(|a| a == "--no-sample");

    let provider = default_provider();
    let topology = provider.core_topology();
    let memory = provider.memory();
    let adapters = provider.gpu_adapters();

    let sample = if with_sample {
        let sampler = CpuSampler::open(Box::new(default_provider()))?;
        Some(sampler.sample()?)
    } else {
        None
    };

    if json {
        let doc = serde_json::json!({
            "timestamp": Local::now().to_rfc3339(),
            "os": provider.os_info(),
            "cpu": {
                "name": provider.cpu_name(),
                "physicalCores": topology.physical_cores,
                "logicalCores": topology.logical_cores,
                "usage": sample,
            },
            "memory": memory,
            "gpu": adapters.as_deref().unwrap_or(&[]),
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("Host report — {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    println!("CPU:   {}", provider.cpu_name());
    println!(
        "Cores: {} physical / {} logical",
        topology.physical_cores, topology.logical_cores
    );
    println!("OS:    {}", provider.os_info());
    println!(
        "RAM:   {} used / {} total ({:.1}%)",
        format_bytes(memory.used_mem),
        format_bytes(memory.total_mem),
        memory.mem_percent()
    );
    match adapters {
        Ok(list) => println!("GPU:\n{}", join_descriptions(&list)),
        Err(err) => println!("GPU:   {err}"),
    }
    if let Some(sample) = sample {
        println!("CPU usage (avg): {:.1}%", sample.total_usage_percent);
        for (core, usage) in sample.per_core_usage_percent.iter().enumerate() {
            println!("  core {core:>2}: {usage:>5.1}%");
        }
    }

    Ok(())
}
