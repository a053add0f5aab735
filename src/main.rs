use anyhow::Result;
use chargesim::{config, optimizer, telemetry};
use config::Config;
use optimizer::CapacityOptimizer;
use telemetry::init_tracing;
use tracing::{info, warn};

fn main() -> Result<()> {
    init_tracing();

    let cfg = Config::load()?;
    let engine = cfg.engine()?;

    let mut capacity = cfg.topology.capacity();
    if capacity.is_empty() {
        warn!("No charging stations configured");
    }

    info!(
        nodes = cfg.topology.columns * cfg.topology.rows,
        stations = capacity.len(),
        users = engine.users().len(),
        pois = engine.pois().len(),
        "starting charging station simulation"
    );

    let mut optimizer = CapacityOptimizer::new(cfg.optimizer.clone());
    for iteration in 1..=cfg.optimizer.iterations.max(1) {
        let bundle = engine.run_with_capacity(capacity.clone())?;
        let report = optimizer.optimize(&bundle, engine.topology(), &mut capacity)?;

        info!(
            iteration,
            run = %bundle.metadata.id,
            changes = report.changes.len(),
            stations = capacity.len(),
            charging_points = capacity.values().sum::<u32>(),
            "optimization round finished"
        );

        if report.is_empty() {
            info!(iteration, "capacity plan converged");
            break;
        }
    }

    println!("{}", serde_json::to_string_pretty(&capacity)?);
    Ok(())
}
