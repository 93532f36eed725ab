use std::{env, path::Path};

use log::LevelFilter;
use pci_opt_derive::{CliOptions, CliValue, KvDisplay};

use crate::{Error, Result, algo::config::OptimizerConfig};

/// Command-line options of one optimization run.
#[derive(Clone, Debug, CliOptions, KvDisplay)]
pub struct OptimizerOptions {
    /// Input file with cells. Empty means stdin.
    #[cli(long = "input")]
    #[kv(empty = "stdin")]
    pub input: String,
    /// Cell input format.
    #[cli(long = "input-format", parse_with = "InputFormat::parse", value = "<json|csv>")]
    pub input_format: InputFormat,
    /// Output file for the JSON result. Empty means stdout.
    #[cli(long = "output")]
    #[kv(empty = "stdout")]
    pub output: String,
    /// Ask the conflict detector to account for antenna line of sight.
    #[cli(long = "check-los", flag)]
    pub check_los: bool,
    /// Fixed random seed for reproducible runs.
    #[cli(long = "seed", parse_with = "parse_seed", value = "<u64>")]
    #[kv(fmt = "debug")]
    pub seed: Option<u64>,
    /// Upper bound on tabu-search iterations.
    #[cli(long = "max-iterations")]
    pub max_iterations: usize,
    /// Iterations a vacated PCI stays forbidden for its cell.
    #[cli(long = "tabu-tenure")]
    pub tabu_tenure: usize,
    /// Non-improving iterations tolerated once no CRITICAL/HIGH conflicts remain.
    #[cli(long = "stall-limit")]
    pub stall_limit: usize,
    /// Stall count that switches the search to diversification.
    #[cli(long = "diversify-after")]
    pub diversify_after: usize,
    /// Cells recolored per iteration.
    #[cli(long = "recolor-batch")]
    pub recolor_batch: usize,
    /// Cells recolored per iteration while diversifying.
    #[cli(long = "diversified-batch")]
    pub diversified_batch: usize,
    /// Share of best-scored candidates sampled by the scorer, in (0, 1].
    #[cli(long = "top-fraction")]
    pub top_fraction: f64,
    /// Neighborhood radius (meters) used when re-homing colliding cells.
    #[cli(long = "proximity-radius")]
    pub proximity_radius_m: f64,
    /// Structured logging level.
    #[cli(long = "log-level", parse_with = "LogLevel::parse", value = "<error|warn|info|debug|trace|off>")]
    pub log_level: LogLevel,
    /// Logging output format.
    #[cli(long = "log-format", parse_with = "LogFormat::parse", value = "<compact|pretty>")]
    pub log_format: LogFormat,
    /// Include timestamps in log lines.
    #[cli(long = "log-timestamp", flag)]
    pub log_timestamp: bool,
    /// Log file. Empty means stderr.
    #[cli(long = "log-output")]
    #[kv(empty = "stderr")]
    pub log_output: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, CliValue)]
#[cli_value(option = "log-level")]
pub enum LogLevel {
    Error,
    #[cli(alias = "warning")]
    Warn,
    Info,
    Debug,
    Trace,
    Off,
}

impl LogLevel {
    pub fn to_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
            Self::Off => LevelFilter::Off,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, CliValue)]
#[cli_value(option = "log-format")]
pub enum LogFormat {
    Compact,
    Pretty,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, CliValue)]
#[cli_value(option = "input-format")]
pub enum InputFormat {
    Json,
    Csv,
}

impl InputFormat {
    /// Guess from a file extension; anything but `.csv` reads as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Json,
        }
    }
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        let config = OptimizerConfig::default();
        Self {
            input: String::new(),
            input_format: InputFormat::Json,
            output: String::new(),
            check_los: true,
            seed: config.seed,
            max_iterations: config.max_iterations,
            tabu_tenure: config.tabu_tenure,
            stall_limit: config.stall_limit,
            diversify_after: config.diversify_after,
            recolor_batch: config.recolor_batch,
            diversified_batch: config.diversified_batch,
            top_fraction: config.top_fraction,
            proximity_radius_m: config.proximity_radius_m,
            log_level: LogLevel::Warn,
            log_format: LogFormat::Compact,
            log_timestamp: true,
            log_output: String::new(),
        }
    }
}

impl OptimizerOptions {
    pub fn from_args() -> Result<Self> {
        let (options, saw_input_format) = Self::parse_from_iter(env::args().skip(1))?;
        Ok(options.with_inferred_format(saw_input_format))
    }

    fn parse_from_iter<I, S>(args: I) -> Result<(Self, bool)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut options = Self::default();
        let mut saw_input_format = false;
        let mut args = args
            .into_iter()
            .map(|arg| arg.as_ref().to_owned())
            .peekable();

        while let Some(arg) = args.next() {
            if arg == "--help" || arg == "-h" {
                return Err(Error::invalid_input(Self::usage()));
            }

            let Some(raw_name) = arg.strip_prefix("--") else {
                return Err(Error::invalid_input(format!(
                    "Unexpected argument: {arg}\n\n{}",
                    Self::usage()
                )));
            };

            if raw_name.is_empty() {
                return Err(Error::invalid_input(format!(
                    "Invalid option name: {arg}\n\n{}",
                    Self::usage()
                )));
            }

            let (name, value) = Self::split_arg(raw_name, &mut args);

            if !options.apply_cli_option(&name, value)? {
                return Err(Error::invalid_input(format!(
                    "Unknown option: --{name}\n\n{}",
                    Self::usage()
                )));
            }
            if name == "input-format" {
                saw_input_format = true;
            }
        }

        Ok((options, saw_input_format))
    }

    /// Without an explicit `--input-format`, a `.csv` input file reads as CSV.
    fn with_inferred_format(mut self, saw_input_format: bool) -> Self {
        if !saw_input_format && let Some(path) = self.input_path() {
            self.input_format = InputFormat::from_path(path);
        }
        self
    }

    pub fn usage() -> String {
        format!(
            concat!(
                "Usage:\n",
                "  pci-opt [options] --input cells.json\n",
                "  pci-opt [options] < cells.json\n\n",
                "Options:\n",
                "{}",
                "  --help\n",
                "\n",
                "Examples:\n",
                "  pci-opt --input cells.json --output result.json\n",
                "  pci-opt --input-format csv --seed 7 --log-level info < cells.csv\n",
                "  pci-opt --no-check-los --max-iterations=50 --input cells.json\n",
                "  pci-opt --log-level=debug --log-format=pretty --log-output run.log < cells.json\n",
            ),
            Self::cli_usage()
        )
    }

    /// Validated core configuration built from the tunables.
    pub fn to_config(&self) -> Result<OptimizerConfig> {
        let config = OptimizerConfig {
            max_iterations: self.max_iterations,
            tabu_tenure: self.tabu_tenure,
            stall_limit: self.stall_limit,
            diversify_after: self.diversify_after,
            recolor_batch: self.recolor_batch,
            diversified_batch: self.diversified_batch,
            top_fraction: self.top_fraction,
            proximity_radius_m: self.proximity_radius_m,
            seed: self.seed,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn log_output_path(&self) -> Option<&Path> {
        non_std_stream_path(&self.log_output)
    }

    pub fn output_path(&self) -> Option<&Path> {
        non_std_stream_path(&self.output)
    }

    pub fn input_path(&self) -> Option<&Path> {
        non_std_stream_path(&self.input)
    }
}

/// `None` for empty values and `-`, which select the standard stream.
fn non_std_stream_path(raw: &str) -> Option<&Path> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "-" {
        None
    } else {
        Some(Path::new(raw))
    }
}

fn parse_seed(raw: &str) -> Result<Option<u64>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    raw.parse::<u64>()
        .map(Some)
        .map_err(|e| Error::invalid_input(format!("Invalid value for --seed: {raw} ({e})")))
}
