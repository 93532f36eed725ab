use std::{
    fs::File,
    io::{BufWriter, Write},
};

use crate::{Error, OptimizationResult, Result, io::options::OptimizerOptions};

/// Write the result as pretty JSON to `--output`, or stdout.
pub fn write_result(options: &OptimizerOptions, result: &OptimizationResult) -> Result<()> {
    match options.output_path() {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                Error::other(format!(
                    "failed to create output file {}: {e}",
                    path.display()
                ))
            })?;
            write_json(BufWriter::new(file), result)?;
            log::info!("output: wrote {}", path.display());
        }
        None => write_json(std::io::stdout().lock(), result)?,
    }
    Ok(())
}

pub fn write_json<W: Write>(mut writer: W, result: &OptimizationResult) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, result)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
