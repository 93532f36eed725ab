use std::time::Instant;

use log::info;

use pci_opt_core::{
    GeoConflictDetector, OptimizerOptions, PciOptimizer, Result, logging, read_cells,
    write_result,
};

fn main() -> Result<()> {
    let now = Instant::now();
    let options = OptimizerOptions::from_args()?;
    logging::init_logger(&options)?;

    info!("options: {options}");

    let cells = read_cells(&options)?;
    let optimizer = PciOptimizer::with_config(GeoConflictDetector::default(), options.to_config()?)?;
    let result = optimizer.optimize(&cells, options.check_los)?;

    write_result(&options, &result)?;

    info!(
        "output: cells={} changes={} time={:.2}s",
        result.optimized_cells.len(),
        result.changes.len(),
        now.elapsed().as_secs_f32()
    );

    Ok(())
}
