//! PCI assignment for LTE/5G cells as graph coloring solved with tabu search.
//! Collisions are eliminated first, then mod-3/6/12 interference reported by a
//! [`ConflictDetector`] is driven down iteratively.

mod algo;
mod cell;
mod conflict;
mod constants;
mod error;
mod io;
pub mod logging;
mod result;
mod spatial;

pub use algo::{config::OptimizerConfig, optimizer::PciOptimizer};
pub use cell::{Cell, Pci};
pub use conflict::{
    ConflictDetector, ConflictKind, ConflictTally, GeoConflictDetector, PciConflict, Severity,
};
pub use constants::{PCI_MAX, PCI_MIN, PCI_SPACE};
pub use error::{Error, Result};
pub use io::{
    input::{parse_cells, parse_cells_csv, read_cells},
    options::{InputFormat, LogFormat, LogLevel, OptimizerOptions},
    output::{write_json, write_result},
};
pub use result::{IterationRecord, OptimizationResult, PciChange, PciCollision, StopReason};
pub use spatial::distance::{angular_separation, bearing_deg, distance_m};
