//! Gate Probe Binary
//!
//! Sets a threshold on a probe category and evaluates one call site in a
//! tight loop, for inspecting the cost of the cached path.
//!
//! ## Usage
//!
//! ```bash
//! level_gate_probe <level> [iterations]
//! ```
//!
//! The call site checks `FINER` on `probe.invoke.dynamic`. Halfway through,
//! the threshold is flipped between `OFF` and `ALL` to force one rebind.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `LEVEL_GATE_*`: see `GateConfig::from_env`
//! - `RUST_LOG`: Log level filter (default: level_gate=info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)

use std::hint::black_box;
use std::time::Instant;

use tracing::info;
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use level_gate::{CategoryName, LogContext, SeverityLevel};

const PROBE_CATEGORY: &str = "probe.invoke.dynamic";
const DEFAULT_ITERATIONS: u64 = 100_000_000;

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "level_gate=info,level_gate_probe=info".into());

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .flatten_event(true)
            )
            .init();
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let Some(level_arg) = args.next() else {
        eprintln!("Usage: level_gate_probe <level> [iterations]");
        std::process::exit(1);
    };
    let level: SeverityLevel = level_arg.parse()?;
    let iterations = match args.next() {
        Some(raw) => raw.parse::<u64>()?,
        None => DEFAULT_ITERATIONS,
    };

    let ctx = LogContext::from_env()?;
    let category = CategoryName::new(PROBE_CATEGORY)?;
    ctx.set_level(&category, level);

    let site = ctx.binding(&category, SeverityLevel::FINER);
    let flip_at = iterations / 2;
    let flipped = if level.permits(SeverityLevel::FINER) {
        SeverityLevel::OFF
    } else {
        SeverityLevel::ALL
    };

    info!(
        category = PROBE_CATEGORY,
        level = %level,
        iterations,
        specialized = site.is_specialized(),
        "probe starting"
    );

    let start = Instant::now();
    let mut emitted: u64 = 0;
    for i in 0..iterations {
        if i == flip_at {
            ctx.set_level(&category, flipped);
        }
        if black_box(&site).check_enabled() {
            emitted += 1;
        }
    }
    let elapsed = start.elapsed();

    let stats = site.gate().stats();
    info!(
        emitted,
        suppressed = iterations - emitted,
        elapsed_ms = elapsed.as_millis() as u64,
        ns_per_check = elapsed.as_nanos() as f64 / iterations.max(1) as f64,
        recomputations = stats.recomputations,
        invalidations = stats.invalidations,
        "probe finished"
    );

    Ok(())
}
