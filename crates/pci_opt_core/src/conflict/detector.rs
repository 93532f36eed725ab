use rayon::prelude::*;

use super::{ConflictDetector, ConflictKind, PciConflict, Severity};
use crate::{
    Result,
    cell::{Cell, Pci},
    spatial::distance::{angular_separation, bearing_deg, distance_m},
};

const DEFAULT_RANGE_BUFFER: f64 = 1.2;
const DEFAULT_MAIN_LOBE_HALF_WIDTH_DEG: f64 = 60.0;
const UNKNOWN_FREQUENCY_RANGE_M: f64 = 10_000.0;
const DEFAULT_BANDWIDTH_MHZ: f64 = 20.0;
const ADJACENT_CHANNEL_GUARD_MHZ: f64 = 5.0;
const SECTOR_ALIGNMENT_TOLERANCE_DEG: f64 = 15.0;
const THREE_SECTOR_SEPARATION_DEG: f64 = 120.0;
const FOUR_SECTOR_SEPARATION_DEG: f64 = 90.0;
const THREE_SECTOR_AZIMUTHS: [f64; 3] = [0.0, 120.0, 240.0];
const FOUR_SECTOR_AZIMUTHS: [f64; 4] = [0.0, 90.0, 180.0, 270.0];
const OVERLAP_DISTANCE_FACTOR: f64 = 0.5;
const CRITICAL_RS_DIFF_DB: f64 = 6.0;
const HIGH_RS_DIFF_DB: f64 = 9.0;
const MEDIUM_RS_DIFF_DB: f64 = 12.0;
/// Below this the bearing between two cells is meaningless.
const MIN_BEARING_DISTANCE_M: f64 = 1.0;

const MODULUS_CHECKS: [(ConflictKind, Pci); 4] = [
    (ConflictKind::Mod3, 3),
    (ConflictKind::Mod6, 6),
    (ConflictKind::Mod12, 12),
    (ConflictKind::Mod30, 30),
];

/// Upper frequency bound (MHz, exclusive) → maximum propagation distance (m).
const PROPAGATION_BANDS: [(f64, f64); 6] = [
    (1_000.0, 30_000.0),
    (1_500.0, 15_000.0),
    (2_200.0, 10_000.0),
    (2_700.0, 5_000.0),
    (4_000.0, 3_000.0),
    (6_000.0, 2_000.0),
];
const MMWAVE_RANGE_M: f64 = 500.0;

/// Geometry-only stand-in for a real propagation model.
///
/// Pairs within a frequency-dependent range are checked for mod-3/6/12/30
/// PCI matches, co-channel identical PCIs and adjacent-channel mod-3 matches.
/// Severity grows as the cells get closer and their RS powers agree.
#[derive(Clone, Copy, Debug)]
pub struct GeoConflictDetector {
    range_buffer: f64,
    main_lobe_half_width_deg: f64,
}

impl Default for GeoConflictDetector {
    fn default() -> Self {
        Self {
            range_buffer: DEFAULT_RANGE_BUFFER,
            main_lobe_half_width_deg: DEFAULT_MAIN_LOBE_HALF_WIDTH_DEG,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ChannelRelation {
    Overlapping,
    Adjacent,
    Separated,
}

impl GeoConflictDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Multiplier on the propagation range before pairs are ignored.
    pub fn with_range_buffer(mut self, range_buffer: f64) -> Self {
        self.range_buffer = range_buffer;
        self
    }

    pub fn with_main_lobe_half_width(mut self, degrees: f64) -> Self {
        self.main_lobe_half_width_deg = degrees;
        self
    }

    /// Maximum propagation distance for a carrier frequency.
    pub fn propagation_range_m(frequency_mhz: Option<f64>) -> f64 {
        let Some(frequency) = frequency_mhz else {
            return UNKNOWN_FREQUENCY_RANGE_M;
        };
        PROPAGATION_BANDS
            .iter()
            .find(|(upper, _)| frequency < *upper)
            .map(|(_, range)| *range)
            .unwrap_or(MMWAVE_RANGE_M)
    }

    fn pair_conflicts(&self, a: &Cell, b: &Cell, check_los: bool) -> Vec<PciConflict> {
        let distance = distance_m(a, b);
        let reach = Self::propagation_range_m(a.frequency_mhz)
            .max(Self::propagation_range_m(b.frequency_mhz))
            * self.range_buffer;
        if distance > reach || is_aligned_site_pair(a, b) {
            return Vec::new();
        }

        let channel = channel_relation(a, b);
        let mut kinds: Vec<ConflictKind> = MODULUS_CHECKS
            .iter()
            .filter(|(_, modulus)| a.pci % modulus == b.pci % modulus)
            .map(|(kind, _)| *kind)
            .collect();
        if channel == ChannelRelation::Overlapping && a.pci == b.pci {
            kinds.push(ConflictKind::Frequency);
        }
        // A mod-6 match implies a mod-3 match.
        if channel == ChannelRelation::Adjacent && a.pci % 3 == b.pci % 3 {
            kinds.push(ConflictKind::AdjacentChannel);
        }
        if kinds.is_empty() {
            return Vec::new();
        }

        let rs_diff = (a.rs_power.unwrap_or_default() - b.rs_power.unwrap_or_default()).abs();
        let overlapping = channel == ChannelRelation::Overlapping;
        let obstructed = check_los && !self.has_line_of_sight(a, b, distance);

        kinds
            .into_iter()
            .map(|kind| {
                let mut severity = severity_for(kind, distance, rs_diff, overlapping);
                if obstructed {
                    severity = severity.downgrade();
                }
                PciConflict::new(a.id.clone(), b.id.clone(), severity)
                    .with_kind(kind)
                    .with_distance(distance)
            })
            .collect()
    }

    /// True unless both antennas are known to point away from each other.
    fn has_line_of_sight(&self, a: &Cell, b: &Cell, distance: f64) -> bool {
        let (Some(az_a), Some(az_b)) = (a.azimuth, b.azimuth) else {
            return true;
        };
        if distance < MIN_BEARING_DISTANCE_M {
            return true;
        }
        let a_faces_b = angular_separation(az_a, bearing_deg(a, b)) <= self.main_lobe_half_width_deg;
        let b_faces_a = angular_separation(az_b, bearing_deg(b, a)) <= self.main_lobe_half_width_deg;
        a_faces_b || b_faces_a
    }
}

impl ConflictDetector for GeoConflictDetector {
    fn detect_conflicts(&self, cells: &[Cell], check_los: bool) -> Result<Vec<PciConflict>> {
        let n = cells.len();
        let mut conflicts: Vec<PciConflict> = (0..n)
            .into_par_iter()
            .flat_map_iter(|i| {
                ((i + 1)..n).flat_map(move |j| self.pair_conflicts(&cells[i], &cells[j], check_los))
            })
            .collect();

        conflicts.sort_by(|a, b| {
            b.severity.cmp(&a.severity).then_with(|| {
                a.distance_m
                    .unwrap_or_default()
                    .total_cmp(&b.distance_m.unwrap_or_default())
            })
        });

        log::debug!(
            "detector: cells={n} conflicts={} check_los={check_los}",
            conflicts.len()
        );
        Ok(conflicts)
    }
}

fn channel_relation(a: &Cell, b: &Cell) -> ChannelRelation {
    let (Some(freq_a), Some(freq_b)) = (a.frequency_mhz, b.frequency_mhz) else {
        return ChannelRelation::Separated;
    };
    let separation = (freq_a - freq_b).abs();
    let min_separation = (a.bandwidth_mhz.unwrap_or(DEFAULT_BANDWIDTH_MHZ)
        + b.bandwidth_mhz.unwrap_or(DEFAULT_BANDWIDTH_MHZ))
        / 2.0;
    if separation < min_separation {
        ChannelRelation::Overlapping
    } else if separation < min_separation + ADJACENT_CHANNEL_GUARD_MHZ {
        ChannelRelation::Adjacent
    } else {
        ChannelRelation::Separated
    }
}

/// Sectors of one site pointing the way a 3- or 4-sector layout expects.
fn is_aligned_site_pair(a: &Cell, b: &Cell) -> bool {
    let (Some(site_a), Some(site_b)) = (a.enodeb, b.enodeb) else {
        return false;
    };
    let (Some(sector_a), Some(sector_b)) = (a.sector, b.sector) else {
        return false;
    };
    if site_a != site_b || sector_a == sector_b {
        return false;
    }

    let four_sector = sector_a == 4 || sector_b == 4;
    let expected = if four_sector {
        FOUR_SECTOR_SEPARATION_DEG
    } else {
        THREE_SECTOR_SEPARATION_DEG
    };
    let az_a = a
        .azimuth
        .unwrap_or_else(|| default_azimuth(sector_a, four_sector));
    let az_b = b
        .azimuth
        .unwrap_or_else(|| default_azimuth(sector_b, four_sector));

    (angular_separation(az_a, az_b) - expected).abs() < SECTOR_ALIGNMENT_TOLERANCE_DEG
}

fn default_azimuth(sector: u8, four_sector: bool) -> f64 {
    let idx = usize::from(sector.saturating_sub(1));
    if four_sector {
        FOUR_SECTOR_AZIMUTHS[idx % FOUR_SECTOR_AZIMUTHS.len()]
    } else {
        THREE_SECTOR_AZIMUTHS[idx % THREE_SECTOR_AZIMUTHS.len()]
    }
}

/// (critical, high, medium) distance thresholds in meters.
fn thresholds(kind: ConflictKind) -> (f64, f64, f64) {
    match kind {
        ConflictKind::Frequency => (1_000.0, 2_000.0, 5_000.0),
        ConflictKind::AdjacentChannel | ConflictKind::Mod3 => (500.0, 1_000.0, 2_000.0),
        ConflictKind::Mod6 => (300.0, 700.0, 1_500.0),
        ConflictKind::Mod12 => (200.0, 500.0, 1_000.0),
        ConflictKind::Mod30 => (100.0, 300.0, 600.0),
    }
}

fn severity_for(kind: ConflictKind, distance: f64, rs_diff: f64, overlapping: bool) -> Severity {
    let (critical, high, medium) = thresholds(kind);
    let adjusted = if overlapping {
        distance * OVERLAP_DISTANCE_FACTOR
    } else {
        distance
    };

    if adjusted < critical && rs_diff < CRITICAL_RS_DIFF_DB {
        Severity::Critical
    } else if adjusted < high && rs_diff < HIGH_RS_DIFF_DB {
        Severity::High
    } else if adjusted < medium && rs_diff < MEDIUM_RS_DIFF_DB {
        Severity::Medium
    } else {
        Severity::Low
    }
}

#[cfg(test)]
mod tests {
    use super::{GeoConflictDetector, default_azimuth, is_aligned_site_pair, severity_for};
    use crate::{
        cell::Cell,
        conflict::{ConflictDetector, ConflictKind, Severity},
    };

    fn detect(cells: &[Cell], check_los: bool) -> Vec<crate::PciConflict> {
        GeoConflictDetector::default()
            .detect_conflicts(cells, check_los)
            .expect("detect")
    }

    #[test]
    fn propagation_range_follows_frequency_bands() {
        assert_eq!(GeoConflictDetector::propagation_range_m(Some(700.0)), 30_000.0);
        assert_eq!(GeoConflictDetector::propagation_range_m(Some(1_900.0)), 10_000.0);
        assert_eq!(GeoConflictDetector::propagation_range_m(Some(3_600.0)), 3_000.0);
        assert_eq!(GeoConflictDetector::propagation_range_m(Some(28_000.0)), 500.0);
        assert_eq!(GeoConflictDetector::propagation_range_m(None), 10_000.0);
    }

    #[test]
    fn colocated_mod3_match_is_critical() {
        let cells = vec![Cell::new("a", 30, 40.0, -74.0), Cell::new("b", 33, 40.0, -74.0)];
        let conflicts = detect(&cells, false);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, Some(ConflictKind::Mod3));
        assert_eq!(conflicts[0].severity, Severity::Critical);
        assert_eq!(conflicts[0].primary_cell, "a");
        assert_eq!(conflicts[0].conflicting_cell, "b");
    }

    #[test]
    fn distinct_residues_do_not_conflict() {
        let cells = vec![Cell::new("a", 30, 40.0, -74.0), Cell::new("b", 31, 40.0, -74.0)];
        assert!(detect(&cells, false).is_empty());
    }

    #[test]
    fn far_apart_cells_never_conflict() {
        // ~111 km apart, beyond 1.2 x 10 km.
        let cells = vec![Cell::new("a", 30, 0.0, 0.0), Cell::new("b", 30, 1.0, 0.0)];
        assert!(detect(&cells, false).is_empty());
    }

    #[test]
    fn low_band_reaches_further_than_mid_band() {
        // ~22 km apart.
        let mid = vec![
            Cell::new("a", 30, 0.0, 0.0).with_frequency(1_900.0),
            Cell::new("b", 33, 0.2, 0.0).with_frequency(1_900.0),
        ];
        let low = vec![
            Cell::new("a", 30, 0.0, 0.0).with_frequency(700.0),
            Cell::new("b", 33, 0.2, 0.0).with_frequency(700.0),
        ];
        assert!(detect(&mid, false).is_empty());
        let conflicts = detect(&low, false);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].severity, Severity::Low);
    }

    #[test]
    fn identical_cochannel_pci_reports_every_kind() {
        let cells = vec![
            Cell::new("a", 100, 40.0, -74.0).with_frequency(2_110.0),
            Cell::new("b", 100, 40.0, -74.0).with_frequency(2_115.0),
        ];
        let kinds: Vec<_> = detect(&cells, false)
            .into_iter()
            .filter_map(|c| c.kind)
            .collect();
        assert!(kinds.contains(&ConflictKind::Mod3));
        assert!(kinds.contains(&ConflictKind::Mod30));
        assert!(kinds.contains(&ConflictKind::Frequency));
        assert!(!kinds.contains(&ConflictKind::AdjacentChannel));
    }

    #[test]
    fn adjacent_channels_flag_mod3_matches() {
        let cells = vec![
            Cell::new("a", 30, 40.0, -74.0).with_frequency(2_110.0),
            Cell::new("b", 33, 40.0, -74.0).with_frequency(2_132.0),
        ];
        let kinds: Vec<_> = detect(&cells, false)
            .into_iter()
            .filter_map(|c| c.kind)
            .collect();
        assert!(kinds.contains(&ConflictKind::AdjacentChannel));
    }

    #[test]
    fn aligned_sectors_of_one_site_are_skipped() {
        let a = Cell::new("s1", 30, 40.0, -74.0).with_site(7, 1);
        let b = Cell::new("s2", 33, 40.0, -74.0).with_site(7, 2);
        assert!(is_aligned_site_pair(&a, &b));
        assert!(detect(&[a, b], false).is_empty());
    }

    #[test]
    fn misaligned_sectors_of_one_site_still_conflict() {
        let a = Cell::new("s1", 30, 40.0, -74.0)
            .with_site(7, 1)
            .with_azimuth(0.0);
        let b = Cell::new("s2", 33, 40.0, -74.0)
            .with_site(7, 2)
            .with_azimuth(30.0);
        assert!(!is_aligned_site_pair(&a, &b));
        assert_eq!(detect(&[a, b], false).len(), 1);
    }

    #[test]
    fn default_azimuths_follow_sector_layout() {
        assert_eq!(default_azimuth(1, false), 0.0);
        assert_eq!(default_azimuth(3, false), 240.0);
        assert_eq!(default_azimuth(4, true), 270.0);
        assert_eq!(default_azimuth(0, false), 0.0);
    }

    #[test]
    fn rs_power_mismatch_lowers_severity() {
        assert_eq!(
            severity_for(ConflictKind::Mod3, 100.0, 0.0, false),
            Severity::Critical
        );
        assert_eq!(
            severity_for(ConflictKind::Mod3, 100.0, 7.0, false),
            Severity::High
        );
        assert_eq!(
            severity_for(ConflictKind::Mod3, 100.0, 20.0, false),
            Severity::Low
        );
    }

    #[test]
    fn overlap_halves_effective_distance() {
        assert_eq!(
            severity_for(ConflictKind::Mod3, 800.0, 0.0, false),
            Severity::High
        );
        assert_eq!(
            severity_for(ConflictKind::Mod3, 800.0, 0.0, true),
            Severity::Critical
        );
    }

    #[test]
    fn los_check_downgrades_back_facing_antennas() {
        // b sits ~111 m east of a; a points west, b points east.
        let cells = vec![
            Cell::new("a", 30, 0.0, 0.0).with_azimuth(270.0),
            Cell::new("b", 33, 0.0, 0.001).with_azimuth(90.0),
        ];
        let with_geometry = detect(&cells, false);
        let with_los = detect(&cells, true);
        assert_eq!(with_geometry[0].severity, Severity::Critical);
        assert_eq!(with_los[0].severity, Severity::High);
    }

    #[test]
    fn los_check_keeps_facing_antennas() {
        let cells = vec![
            Cell::new("a", 30, 0.0, 0.0).with_azimuth(90.0),
            Cell::new("b", 33, 0.0, 0.001).with_azimuth(270.0),
        ];
        assert_eq!(detect(&cells, true)[0].severity, Severity::Critical);
    }

    #[test]
    fn output_is_sorted_by_severity_then_distance() {
        let cells = vec![
            Cell::new("a", 30, 0.0, 0.0),
            Cell::new("b", 33, 0.0, 0.009),
            Cell::new("c", 36, 0.0, 0.0001),
        ];
        // a-c also matches mod 6.
        let conflicts = detect(&cells, false);
        assert_eq!(conflicts.len(), 4);
        for pair in conflicts.windows(2) {
            assert!(pair[0].severity >= pair[1].severity);
            if pair[0].severity == pair[1].severity {
                assert!(pair[0].distance_m <= pair[1].distance_m);
            }
        }
    }
}
