use std::collections::{HashMap, HashSet};

use rand::Rng;

use crate::{
    cell::{Cell, Pci},
    constants::{
        BASE_SCORE, MOD3_PENALTY, MOD6_PENALTY, MOD12_PENALTY, PCI_MAX, PCI_MIN,
        assignable_pcis, is_assignable,
    },
    result::PciChange,
    spatial::distance::{distance_m, proximity_factor},
};

const REASON_COLLISION: &str = "collision eliminated";
const REASON_OUT_OF_RANGE: &str = "out of assignable range";

/// Make every PCI unique (as far as the space allows) and in range.
///
/// Cells are grouped by PCI in order of first appearance; the first holder of
/// each PCI keeps it, every later holder is re-homed. Never fails: when the
/// space is exhausted the pass falls back to reuse and logs a warning.
pub(crate) fn eliminate_collisions<R: Rng + ?Sized>(
    cells: &mut [Cell],
    radius_m: f64,
    rng: &mut R,
) -> Vec<PciChange> {
    let mut groups: Vec<(Pci, Vec<usize>)> = Vec::new();
    let mut group_of: HashMap<Pci, usize> = HashMap::new();
    for (idx, cell) in cells.iter().enumerate() {
        let slot = *group_of.entry(cell.pci).or_insert_with(|| {
            groups.push((cell.pci, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(idx);
    }

    let collided = groups.iter().filter(|(_, members)| members.len() > 1).count();
    let out_of_range = groups.iter().filter(|(pci, _)| !is_assignable(*pci)).count();
    if collided == 0 && out_of_range == 0 {
        log::debug!("collision: none cells={}", cells.len());
        return Vec::new();
    }
    log::info!(
        "collision: start shared_pcis={collided} out_of_range_pcis={out_of_range} cells={}",
        cells.len()
    );

    let mut used: HashSet<Pci> = cells.iter().map(|cell| cell.pci).collect();
    let mut changes = Vec::new();

    for (pci, members) in &groups {
        let keep = usize::from(is_assignable(*pci));
        for &idx in members.iter().skip(keep) {
            let new_pci = rehome(cells, idx, &used, radius_m, rng);
            let old_pci = cells[idx].pci;
            cells[idx].pci = new_pci;
            used.insert(new_pci);

            let reason = if is_assignable(old_pci) {
                format!("{REASON_COLLISION}: pci {old_pci} shared by {} cells", members.len())
            } else {
                format!("{REASON_OUT_OF_RANGE}: pci {old_pci}")
            };
            log::debug!("collision: reassign cell={} {old_pci}->{new_pci}", cells[idx].id);
            changes.push(PciChange::new(cells[idx].id.clone(), old_pci, new_pci, reason));
        }
    }

    let remaining = shared_pci_count(cells);
    if remaining > 0 {
        log::warn!("collision: saturated remaining_shared_pcis={remaining} cells={}", cells.len());
    }
    log::info!("collision: done changes={}", changes.len());
    changes
}

fn rehome<R: Rng + ?Sized>(
    cells: &[Cell],
    idx: usize,
    used: &HashSet<Pci>,
    radius_m: f64,
    rng: &mut R,
) -> Pci {
    let target = &cells[idx];
    let nearby: Vec<(Pci, f64)> = cells
        .iter()
        .enumerate()
        .filter(|(other, _)| *other != idx)
        .filter_map(|(_, cell)| {
            let distance = distance_m(target, cell);
            (distance < radius_m).then(|| (cell.pci, proximity_factor(distance, radius_m)))
        })
        .collect();

    best_scoring(assignable_pcis().filter(|pci| !used.contains(pci)), &nearby)
        .or_else(|| {
            log::warn!("collision: no unused pci for cell={}, allowing reuse", target.id);
            best_scoring(assignable_pcis(), &nearby)
        })
        .or_else(|| assignable_pcis().find(|pci| !used.contains(pci)))
        .unwrap_or_else(|| rng.random_range(PCI_MIN..=PCI_MAX))
}

/// Highest proximity-weighted score; ties resolve to the lowest PCI.
fn best_scoring(candidates: impl Iterator<Item = Pci>, nearby: &[(Pci, f64)]) -> Option<Pci> {
    let mut best: Option<(Pci, f64)> = None;
    for pci in candidates {
        let score = proximity_score(pci, nearby);
        if !score.is_finite() {
            continue;
        }
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((pci, score));
        }
    }
    best.map(|(pci, _)| pci)
}

fn proximity_score(pci: Pci, nearby: &[(Pci, f64)]) -> f64 {
    nearby.iter().fold(BASE_SCORE, |score, &(other, factor)| {
        let mut penalty = 0.0;
        if pci % 3 == other % 3 {
            penalty += MOD3_PENALTY;
        }
        if pci % 6 == other % 6 {
            penalty += MOD6_PENALTY;
        }
        if pci % 12 == other % 12 {
            penalty += MOD12_PENALTY;
        }
        score - penalty * factor
    })
}

pub(crate) fn shared_pci_count(cells: &[Cell]) -> usize {
    let mut counts: HashMap<Pci, usize> = HashMap::new();
    for cell in cells {
        *counts.entry(cell.pci).or_default() += 1;
    }
    counts.values().filter(|&&count| count > 1).count()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::{SeedableRng, rngs::StdRng};

    use super::{best_scoring, eliminate_collisions, proximity_score, shared_pci_count};
    use crate::{
        cell::Cell,
        constants::{PCI_MAX, PCI_MIN, PCI_SPACE},
    };

    const RADIUS: f64 = 50_000.0;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn unique_input_is_untouched() {
        let mut cells = vec![Cell::new("a", 30, 0.0, 0.0), Cell::new("b", 31, 0.0, 0.0)];
        let before = cells.clone();
        let changes = eliminate_collisions(&mut cells, RADIUS, &mut rng());
        assert!(changes.is_empty());
        assert_eq!(cells, before);
    }

    #[test]
    fn first_holder_keeps_shared_pci() {
        let mut cells = vec![
            Cell::new("a", 100, 0.0, 0.0),
            Cell::new("b", 100, 0.0, 0.0),
            Cell::new("c", 100, 0.0, 0.0),
        ];
        let changes = eliminate_collisions(&mut cells, RADIUS, &mut rng());

        assert_eq!(cells[0].pci, 100);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].cell_id, "b");
        assert_eq!(changes[1].cell_id, "c");
        let distinct: HashSet<_> = cells.iter().map(|cell| cell.pci).collect();
        assert_eq!(distinct.len(), 3);
    }

    #[test]
    fn reassignment_prefers_lowest_pci_off_the_neighbor_residue() {
        // 100 % 3 == 1, so 30 (residue 0) is the first full-score value.
        let mut cells = vec![Cell::new("a", 100, 0.0, 0.0), Cell::new("b", 100, 0.0, 0.0)];
        let changes = eliminate_collisions(&mut cells, RADIUS, &mut rng());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].old_pci, 100);
        assert_eq!(changes[0].new_pci, 30);
        assert_eq!(cells[1].pci, 30);
    }

    #[test]
    fn new_assignments_are_not_reused_within_the_pass() {
        let mut cells = vec![
            Cell::new("a", 100, 0.0, 0.0),
            Cell::new("b", 100, 0.0, 0.0),
            Cell::new("c", 200, 0.0, 0.0),
            Cell::new("d", 200, 0.0, 0.0),
        ];
        eliminate_collisions(&mut cells, RADIUS, &mut rng());
        assert_eq!(shared_pci_count(&cells), 0);
    }

    #[test]
    fn out_of_range_pcis_are_normalized() {
        let mut cells = vec![Cell::new("a", 5, 0.0, 0.0), Cell::new("b", 600, 1.0, 1.0)];
        let changes = eliminate_collisions(&mut cells, RADIUS, &mut rng());
        assert_eq!(changes.len(), 2);
        assert!(cells.iter().all(|cell| (PCI_MIN..=PCI_MAX).contains(&cell.pci)));
        assert!(changes[0].reason.starts_with("out of assignable range"));
    }

    #[test]
    fn distant_cells_do_not_influence_score() {
        let far = [(31, 0.0)];
        assert_eq!(proximity_score(31, &far), 1_000.0);
        let near = [(31, 1.0)];
        assert_eq!(proximity_score(31, &near), 1_000.0 - 500.0 - 200.0 - 50.0);
        assert_eq!(proximity_score(34, &near), 1_000.0 - 500.0);
    }

    #[test]
    fn best_scoring_breaks_ties_low() {
        assert_eq!(best_scoring([40, 35, 50].into_iter(), &[]), Some(40));
        assert_eq!(best_scoring(std::iter::empty(), &[]), None);
    }

    #[test]
    fn exhausted_space_falls_back_to_reuse() {
        let mut cells: Vec<Cell> = (0..PCI_SPACE)
            .map(|idx| Cell::new(format!("c{idx}"), PCI_MIN + idx as u16, 0.0, 0.0))
            .collect();
        cells.push(Cell::new("extra", 100, 0.0, 0.0));

        let changes = eliminate_collisions(&mut cells, RADIUS, &mut rng());

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].cell_id, "extra");
        assert!((PCI_MIN..=PCI_MAX).contains(&changes[0].new_pci));
        assert_eq!(shared_pci_count(&cells), 1);
    }
}
