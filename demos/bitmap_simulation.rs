//! Bitmap Simulation Example
//!
//! Runs all five placement strategies against the classic ten-process
//! workload on a 32-unit bitmap, printing the memory map after every event
//! and a comparison table at the end.
//!
//! # Run
//!
//! ```bash
//! cargo run --example bitmap_simulation
//! cargo run --example bitmap_simulation -- 42            # fixed seed
//! cargo run --example bitmap_simulation -- config.json   # JSON config
//! RUST_LOG=fitsim=debug cargo run --example bitmap_simulation
//! ```

use fitsim::report::{render_comparison, render_run};
use fitsim::simulation::{Simulation, SimulationConfig};
use tracing_subscriber::EnvFilter;

fn load_config(arg: Option<String>) -> fitsim::Result<SimulationConfig> {
    match arg {
        None => Ok(SimulationConfig::default()),
        Some(arg) => match arg.parse::<u64>() {
            Ok(seed) => Ok(SimulationConfig::default().seed(seed)),
            Err(_) => {
                let json = std::fs::read_to_string(&arg)
                    .map_err(|e| fitsim::Error::config(format!("cannot read {arg}: {e}")))?;
                SimulationConfig::from_json(&json)
            }
        },
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let config = match load_config(std::env::args().nth(1)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    println!("=== Placement Strategy Simulation ===\n");
    println!("Configuration:");
    println!("  Memory: {:?}", config.memory);
    println!("  Iterations per strategy: {}", config.iterations);
    println!("  Processes: {:?}", config.processes);
    println!();

    let mut sim = Simulation::new(config).expect("validated config");
    let summaries = match sim.run_all() {
        Ok(summaries) => summaries,
        Err(e) => {
            eprintln!("simulation aborted: {e}");
            std::process::exit(1);
        }
    };

    for summary in &summaries {
        println!("{}", render_run(summary));
    }

    println!("=== Comparison ===\n");
    print!("{}", render_comparison(&summaries));
}
