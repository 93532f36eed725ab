//! Conflict model shared with the conflict-detection collaborator.
//!
//! The optimizer treats [`Severity`] as an opaque label: only the CRITICAL and
//! HIGH counts steer its control flow.

mod detector;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Result, cell::Cell};

pub use detector::GeoConflictDetector;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// One step less severe; `Low` stays `Low`.
    pub fn downgrade(self) -> Self {
        match self {
            Self::Critical => Self::High,
            Self::High => Self::Medium,
            Self::Medium | Self::Low => Self::Low,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictKind {
    Mod3,
    Mod6,
    Mod12,
    Mod30,
    Frequency,
    AdjacentChannel,
}

/// One interfering pair reported by a [`ConflictDetector`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PciConflict {
    pub primary_cell: String,
    pub conflicting_cell: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ConflictKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
}

impl PciConflict {
    pub fn new(
        primary_cell: impl Into<String>,
        conflicting_cell: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            primary_cell: primary_cell.into(),
            conflicting_cell: conflicting_cell.into(),
            severity,
            kind: None,
            distance_m: None,
        }
    }

    pub fn with_kind(mut self, kind: ConflictKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_distance(mut self, distance_m: f64) -> Self {
        self.distance_m = Some(distance_m);
        self
    }

    pub fn touches(&self, cell_id: &str) -> bool {
        self.primary_cell == cell_id || self.conflicting_cell == cell_id
    }
}

/// The conflict-detection collaborator.
///
/// Called once to build the interference graph and once per optimization
/// iteration. Errors abort the run.
pub trait ConflictDetector {
    fn detect_conflicts(&self, cells: &[Cell], check_los: bool) -> Result<Vec<PciConflict>>;
}

impl<F> ConflictDetector for F
where
    F: Fn(&[Cell], bool) -> Result<Vec<PciConflict>>,
{
    fn detect_conflicts(&self, cells: &[Cell], check_los: bool) -> Result<Vec<PciConflict>> {
        self(cells, check_los)
    }
}

/// Per-severity counts of one detection pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConflictTally {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl ConflictTally {
    pub fn from_conflicts(conflicts: &[PciConflict]) -> Self {
        conflicts.iter().fold(Self::default(), |mut tally, conflict| {
            tally.total += 1;
            match conflict.severity {
                Severity::Critical => tally.critical += 1,
                Severity::High => tally.high += 1,
                Severity::Medium => tally.medium += 1,
                Severity::Low => tally.low += 1,
            }
            tally
        })
    }

    pub fn is_clear(&self) -> bool {
        self.total == 0
    }

    pub fn has_urgent(&self) -> bool {
        self.critical > 0 || self.high > 0
    }
}

impl fmt::Display for ConflictTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "conflicts={} critical={} high={} medium={} low={}",
            self.total, self.critical, self.high, self.medium, self.low
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{ConflictDetector, ConflictTally, PciConflict, Severity};
    use crate::{Result, cell::Cell};

    #[test]
    fn tally_counts_each_severity() {
        let conflicts = vec![
            PciConflict::new("a", "b", Severity::Critical),
            PciConflict::new("a", "c", Severity::High),
            PciConflict::new("b", "c", Severity::High),
            PciConflict::new("c", "d", Severity::Low),
        ];
        let tally = ConflictTally::from_conflicts(&conflicts);
        assert_eq!(tally.total, 4);
        assert_eq!(tally.critical, 1);
        assert_eq!(tally.high, 2);
        assert_eq!(tally.medium, 0);
        assert_eq!(tally.low, 1);
        assert!(tally.has_urgent());
        assert!(!tally.is_clear());
    }

    #[test]
    fn severity_orders_and_downgrades() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Medium > Severity::Low);
        assert_eq!(Severity::Critical.downgrade(), Severity::High);
        assert_eq!(Severity::Low.downgrade(), Severity::Low);
    }

    #[test]
    fn severity_serializes_upper_case() {
        let json = serde_json::to_string(&Severity::Critical).expect("serialize");
        assert_eq!(json, "\"CRITICAL\"");
    }

    #[test]
    fn closures_act_as_detectors() {
        let detector = |cells: &[Cell], _check_los: bool| -> Result<Vec<PciConflict>> {
            Ok(vec![PciConflict::new(
                cells[0].id.clone(),
                cells[1].id.clone(),
                Severity::Medium,
            )])
        };
        let cells = vec![Cell::new("a", 30, 0.0, 0.0), Cell::new("b", 31, 0.0, 0.0)];
        let conflicts = detector.detect_conflicts(&cells, true).expect("detect");
        assert_eq!(conflicts.len(), 1);
        assert!(conflicts[0].touches("a"));
        assert!(conflicts[0].touches("b"));
        assert!(!conflicts[0].touches("c"));
    }
}
