use std::collections::{BTreeSet, HashMap};

use rand::Rng;

use crate::{
    algo::{graph::InterferenceGraph, tabu::TabuMemory},
    cell::{Cell, Pci},
    constants::{
        BASE_SCORE, DIVERSIFY_BONUS, EXACT_MATCH_PENALTY, MOD3_PENALTY, MOD6_PENALTY,
        MOD12_PENALTY, PCI_MAX, PCI_MIN, TABU_PENALTY, UNUSED_BONUS, USED_ELSEWHERE_PENALTY,
        assignable_pcis,
    },
};

/// Recommends a new PCI for one cell given its graph neighbors and the
/// PCIs in use across the whole working set.
pub(crate) struct CandidateScorer<'a> {
    graph: &'a InterferenceGraph,
    tabu: &'a TabuMemory,
    index: &'a HashMap<String, usize>,
    top_fraction: f64,
}

struct Neighborhood {
    /// Distinct PCIs of the cell's graph neighbors.
    neighbor_pcis: BTreeSet<Pci>,
    /// Usage counts over every other cell.
    used_elsewhere: HashMap<Pci, usize>,
}

impl Neighborhood {
    fn is_used_elsewhere(&self, pci: Pci) -> bool {
        self.used_elsewhere.contains_key(&pci)
    }
}

impl<'a> CandidateScorer<'a> {
    pub(crate) fn new(
        graph: &'a InterferenceGraph,
        tabu: &'a TabuMemory,
        index: &'a HashMap<String, usize>,
        top_fraction: f64,
    ) -> Self {
        Self {
            graph,
            tabu,
            index,
            top_fraction,
        }
    }

    /// Pick a PCI for `cells[target]`, or its current PCI when nothing is
    /// eligible.
    pub(crate) fn recommend<R: Rng + ?Sized>(
        &self,
        cells: &[Cell],
        target: usize,
        iteration: usize,
        diversify: bool,
        rng: &mut R,
    ) -> Pci {
        let cell = &cells[target];
        let hood = self.neighborhood(cells, target);

        let candidates = self.candidates(cell, &hood, iteration);
        if candidates.is_empty() {
            log::debug!("scorer: no candidates cell={} keep={}", cell.id, cell.pci);
            return cell.pci;
        }

        let mut scored: Vec<(Pci, f64)> = candidates
            .into_iter()
            .map(|pci| (pci, self.score(cell, pci, &hood, iteration, diversify)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        let top = ((scored.len() as f64 * self.top_fraction).ceil() as usize).clamp(1, scored.len());
        let pick = scored[rng.random_range(0..top)].0;
        log::trace!(
            "scorer: cell={} candidates={} top={top} pick={pick} score={}",
            cell.id,
            scored.len(),
            scored[0].1
        );
        pick
    }

    fn neighborhood(&self, cells: &[Cell], target: usize) -> Neighborhood {
        let neighbor_pcis = self
            .graph
            .neighbors(&cells[target].id)
            .filter_map(|id| self.index.get(id))
            .map(|&idx| cells[idx].pci)
            .collect();

        let mut used_elsewhere: HashMap<Pci, usize> = HashMap::new();
        for (idx, cell) in cells.iter().enumerate() {
            if idx != target {
                *used_elsewhere.entry(cell.pci).or_default() += 1;
            }
        }

        Neighborhood {
            neighbor_pcis,
            used_elsewhere,
        }
    }

    /// Tiered candidate set; the first non-empty tier wins.
    fn candidates(&self, cell: &Cell, hood: &Neighborhood, iteration: usize) -> Vec<Pci> {
        let allowed = |pci: Pci| !self.tabu.is_tabu(&cell.id, pci, iteration);

        let free_residues: Vec<Pci> = (0..3)
            .filter(|residue| hood.neighbor_pcis.iter().all(|pci| pci % 3 != *residue))
            .collect();
        let clear: Vec<Pci> = free_residues
            .iter()
            .flat_map(|&residue| {
                let first = PCI_MIN + (residue + 3 - PCI_MIN % 3) % 3;
                (first..=PCI_MAX).step_by(3)
            })
            .filter(|&pci| !hood.is_used_elsewhere(pci) && allowed(pci))
            .collect();
        if !clear.is_empty() {
            return clear;
        }

        let unused: Vec<Pci> = assignable_pcis()
            .filter(|&pci| !hood.is_used_elsewhere(pci) && allowed(pci))
            .collect();
        if !unused.is_empty() {
            return unused;
        }

        log::warn!("scorer: no unused pci for cell={}, allowing reuse", cell.id);
        assignable_pcis().filter(|&pci| allowed(pci)).collect()
    }

    fn score(
        &self,
        cell: &Cell,
        pci: Pci,
        hood: &Neighborhood,
        iteration: usize,
        diversify: bool,
    ) -> f64 {
        let mut score = BASE_SCORE;
        let used = hood.is_used_elsewhere(pci);
        if used {
            score -= USED_ELSEWHERE_PENALTY;
        }

        for &other in &hood.neighbor_pcis {
            if pci % 3 == other % 3 {
                score -= MOD3_PENALTY;
            }
            if pci % 6 == other % 6 {
                score -= MOD6_PENALTY;
            }
            if pci % 12 == other % 12 {
                score -= MOD12_PENALTY;
            }
            if pci == other {
                score -= EXACT_MATCH_PENALTY;
            }
        }

        if !used {
            score += UNUSED_BONUS;
        }
        if self.tabu.is_tabu(&cell.id, pci, iteration) {
            score -= TABU_PENALTY;
        }
        if diversify && pci % 3 != cell.pci % 3 {
            score += DIVERSIFY_BONUS;
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::{SeedableRng, rngs::StdRng};

    use super::{CandidateScorer, Neighborhood};
    use crate::{
        algo::{graph::InterferenceGraph, tabu::TabuMemory},
        cell::Cell,
        conflict::{PciConflict, Severity},
        constants::{PCI_MIN, PCI_SPACE},
    };

    struct Fixture {
        cells: Vec<Cell>,
        graph: InterferenceGraph,
        index: HashMap<String, usize>,
    }

    impl Fixture {
        fn triangle(pcis: [u16; 3]) -> Self {
            let cells: Vec<Cell> = ["a", "b", "c"]
                .iter()
                .zip(pcis)
                .map(|(id, pci)| Cell::new(*id, pci, 0.0, 0.0))
                .collect();
            let conflicts = vec![
                PciConflict::new("a", "b", Severity::Critical),
                PciConflict::new("a", "c", Severity::Critical),
                PciConflict::new("b", "c", Severity::Critical),
            ];
            Self::build(cells, &conflicts)
        }

        fn build(cells: Vec<Cell>, conflicts: &[PciConflict]) -> Self {
            let graph = InterferenceGraph::from_conflicts(&cells, conflicts);
            let index = cells
                .iter()
                .enumerate()
                .map(|(idx, cell)| (cell.id.clone(), idx))
                .collect();
            Self {
                cells,
                graph,
                index,
            }
        }

        fn scorer<'a>(&'a self, tabu: &'a TabuMemory, top_fraction: f64) -> CandidateScorer<'a> {
            CandidateScorer::new(&self.graph, tabu, &self.index, top_fraction)
        }
    }

    #[test]
    fn picks_residue_clear_of_all_neighbors() {
        let fixture = Fixture::triangle([30, 33, 36]);
        let tabu = TabuMemory::new(7);
        let scorer = fixture.scorer(&tabu, 0.2);
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..20 {
            let pci = scorer.recommend(&fixture.cells, 0, 1, false, &mut rng);
            assert_ne!(pci % 3, 0, "picked {pci}");
            assert!(pci != 33 && pci != 36);
        }
    }

    #[test]
    fn full_slice_with_top_fraction_one_is_tier_one_only() {
        let fixture = Fixture::triangle([30, 31, 35]);
        let tabu = TabuMemory::new(7);
        let scorer = fixture.scorer(&tabu, 1.0);
        let mut rng = StdRng::seed_from_u64(3);

        // neighbors of a: 31 (residue 1), 35 (residue 2); only residue 0 is clear.
        for _ in 0..50 {
            let pci = scorer.recommend(&fixture.cells, 0, 1, false, &mut rng);
            assert_eq!(pci % 3, 0);
        }
    }

    #[test]
    fn tabu_values_are_never_recommended() {
        let fixture = Fixture::triangle([30, 33, 36]);
        let mut tabu = TabuMemory::new(7);
        for pci in (31..=120).step_by(3) {
            tabu.add("a", pci, 1);
        }
        let scorer = fixture.scorer(&tabu, 0.2);
        let mut rng = StdRng::seed_from_u64(5);

        for _ in 0..20 {
            let pci = scorer.recommend(&fixture.cells, 0, 2, false, &mut rng);
            assert!(!tabu.is_tabu("a", pci, 2), "picked tabu {pci}");
        }
    }

    #[test]
    fn saturated_space_returns_own_pci_from_unused_tier() {
        let cells: Vec<Cell> = (0..PCI_SPACE)
            .map(|idx| Cell::new(format!("c{idx}"), PCI_MIN + idx as u16, 0.0, 0.0))
            .collect();
        let conflicts: Vec<PciConflict> = (1..cells.len())
            .map(|idx| PciConflict::new("c0", cells[idx].id.clone(), Severity::Low))
            .chain((2..cells.len()).map(|idx| PciConflict::new("c1", cells[idx].id.clone(), Severity::Low)))
            .collect();
        let fixture = Fixture::build(cells, &conflicts);
        let tabu = TabuMemory::new(7);
        let scorer = fixture.scorer(&tabu, 0.2);
        let mut rng = StdRng::seed_from_u64(9);

        assert_eq!(scorer.recommend(&fixture.cells, 0, 1, false, &mut rng), PCI_MIN);
    }

    #[test]
    fn no_candidates_keeps_current_pci() {
        let cells = vec![Cell::new("a", 30, 0.0, 0.0), Cell::new("b", 31, 0.0, 0.0)];
        let fixture = Fixture::build(cells, &[]);
        let mut tabu = TabuMemory::new(7);
        for pci in 30..=503 {
            tabu.add("a", pci, 1);
        }
        let scorer = fixture.scorer(&tabu, 0.2);
        let mut rng = StdRng::seed_from_u64(11);

        assert_eq!(scorer.recommend(&fixture.cells, 0, 1, false, &mut rng), 30);
    }

    #[test]
    fn score_weights_neighbor_matches_and_diversification() {
        let fixture = Fixture::triangle([30, 42, 100]);
        let tabu = TabuMemory::new(7);
        let scorer = fixture.scorer(&tabu, 0.2);
        let hood = Neighborhood {
            neighbor_pcis: [42].into_iter().collect(),
            used_elsewhere: [(42, 1), (100, 1)].into_iter().collect(),
        };
        let cell = &fixture.cells[0];

        // 54 vs 42: same mod 3, mod 6 and mod 12.
        assert_eq!(scorer.score(cell, 54, &hood, 1, false), 1_000.0 - 750.0 + 1_000.0);
        // Exact neighbor match also pays the used-elsewhere penalty.
        assert_eq!(
            scorer.score(cell, 42, &hood, 1, false),
            1_000.0 - 10_000.0 - 750.0 - 1_000.0
        );
        assert_eq!(scorer.score(cell, 31, &hood, 1, false), 2_000.0);
        assert_eq!(scorer.score(cell, 31, &hood, 1, true), 2_300.0);
        assert_eq!(scorer.score(cell, 33, &hood, 1, true), 1_000.0 - 500.0 + 1_000.0);
    }
}
