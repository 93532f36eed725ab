use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cell::{Cell, Pci};

/// One PCI reassignment applied during a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PciChange {
    pub cell_id: String,
    pub old_pci: Pci,
    pub new_pci: Pci,
    pub reason: String,
}

impl PciChange {
    pub(crate) fn new(
        cell_id: impl Into<String>,
        old_pci: Pci,
        new_pci: Pci,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            cell_id: cell_id.into(),
            old_pci,
            new_pci,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for PciChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {} ({})",
            self.cell_id, self.old_pci, self.new_pci, self.reason
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationRecord {
    pub iteration: usize,
    pub conflict_count: usize,
    pub critical_count: usize,
    pub high_count: usize,
    /// PCI changes applied in this iteration.
    pub changes: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopReason {
    /// A detection pass reported no conflicts at all.
    Perfect,
    IterationLimit,
    /// No CRITICAL/HIGH conflicts left and the stall limit was reached.
    Converged,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Perfect => "perfect",
            Self::IterationLimit => "iteration-limit",
            Self::Converged => "converged",
        };
        f.write_str(label)
    }
}

/// A PCI still shared by several cells after the final verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PciCollision {
    pub pci: Pci,
    pub cell_ids: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    pub original_cells: Vec<Cell>,
    pub optimized_cells: Vec<Cell>,
    pub iterations: usize,
    pub original_conflicts: usize,
    pub final_conflicts: usize,
    /// `original_conflicts - final_conflicts`; negative only with a
    /// non-deterministic detector.
    pub resolved_conflicts: i64,
    /// Percentage of the original conflicts resolved; 0 when there were none.
    pub conflict_reduction: f64,
    /// Every move made during the run: collision fixes first, then loop
    /// recolors in order. `optimized_cells` is the best snapshot, so moves
    /// made after that snapshot are listed here but absent from it.
    pub changes: Vec<PciChange>,
    pub convergence_history: Vec<IterationRecord>,
    pub stop_reason: StopReason,
    #[serde(default)]
    pub residual_collisions: Vec<PciCollision>,
}

impl OptimizationResult {
    pub(crate) fn reduction_percent(original: usize, final_count: usize) -> f64 {
        if original == 0 {
            return 0.0;
        }
        (original as f64 - final_count as f64) / original as f64 * 100.0
    }

    /// Cells whose PCI differs between input and output.
    pub fn changed_cells(&self) -> impl Iterator<Item = (&Cell, &Cell)> {
        self.original_cells
            .iter()
            .zip(&self.optimized_cells)
            .filter(|(before, after)| before.pci != after.pci)
    }
}

impl fmt::Display for OptimizationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "iterations={} conflicts={}->{} reduction={:.1}% changes={} stop={} collisions={}",
            self.iterations,
            self.original_conflicts,
            self.final_conflicts,
            self.conflict_reduction,
            self.changes.len(),
            self.stop_reason,
            self.residual_collisions.len()
        )
    }
}
