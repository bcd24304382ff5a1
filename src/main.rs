use intersection_sim::{FixedCycle, ManualClock, SimulationConfig, TurnStrategy, VehicleManager};
use std::time::Instant;

/// Simulated milliseconds per tick.
const TICK_MS: f64 = 50.0;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut config = load_config()?;
    if std::env::args().any(|arg| arg == "--teleport") {
        config.turn_strategy = TurnStrategy::Teleport;
    }

    // Turn delays and wait times follow simulated rather than wall-clock time
    let clock = ManualClock::new();
    let mut sim = VehicleManager::with_seed(config, 0x5eed, clock.clone())?;
    let mut lights = FixedCycle::default();

    println!("Simulating...");
    const NUM_FRAMES: u32 = 1000;
    for round in 1..=10 {
        let start = Instant::now();
        for _ in 0..NUM_FRAMES {
            lights.step(0.001 * TICK_MS);
            clock.advance(0.001 * TICK_MS);
            sim.tick(TICK_MS, &lights.states());
        }
        let frame = start.elapsed() / NUM_FRAMES;
        let stats = sim.statistics();
        println!(
            "[{round:>2}] t = {:>6.0}s | avg. frame {:?} | {} live, {} completed, avg. wait {:.1}s",
            sim.elapsed(),
            frame,
            sim.vehicles().len(),
            stats.completed(),
            stats.average_wait(),
        );
    }
    Ok(())
}

/// Reads the configuration from the JSON file named on the command line, if any.
#[cfg(feature = "serde")]
fn load_config() -> Result<SimulationConfig, Box<dyn std::error::Error>> {
    match std::env::args().skip(1).find(|arg| !arg.starts_with("--")) {
        Some(path) => Ok(SimulationConfig::from_json(&std::fs::read_to_string(path)?)?),
        None => Ok(SimulationConfig::default()),
    }
}

#[cfg(not(feature = "serde"))]
fn load_config() -> Result<SimulationConfig, Box<dyn std::error::Error>> {
    Ok(SimulationConfig::default())
}
