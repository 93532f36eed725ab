use std::{collections::HashMap, time::Instant};

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    Result,
    algo::{
        collision::eliminate_collisions, config::OptimizerConfig, graph::InterferenceGraph,
        scorer::CandidateScorer, tabu::TabuMemory,
    },
    cell::{Cell, Pci, validate_cells},
    conflict::{ConflictDetector, ConflictTally, PciConflict, Severity},
    result::{IterationRecord, OptimizationResult, PciChange, PciCollision, StopReason},
};

/// Graph-coloring PCI optimizer driven by tabu search.
///
/// Holds only the conflict-detection collaborator and immutable tunables;
/// every run builds its own working state, so one optimizer can serve any
/// number of runs.
#[derive(Clone, Debug)]
pub struct PciOptimizer<D> {
    detector: D,
    config: OptimizerConfig,
}

/// Mutable state of a single run.
struct RunContext<'r, R: ?Sized> {
    cells: Vec<Cell>,
    index: HashMap<String, usize>,
    graph: InterferenceGraph,
    tabu: TabuMemory,
    rng: &'r mut R,
    changes: Vec<PciChange>,
    history: Vec<IterationRecord>,
}

#[derive(Clone, Copy, Debug, Default)]
struct CellPressure {
    critical: usize,
    total: usize,
}

struct SearchOutcome {
    best_cells: Vec<Cell>,
    iterations: usize,
    stop_reason: StopReason,
}

impl<D: ConflictDetector> PciOptimizer<D> {
    pub fn new(detector: D) -> Self {
        Self {
            detector,
            config: OptimizerConfig::default(),
        }
    }

    pub fn with_config(detector: D, config: OptimizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { detector, config })
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Optimize `cells`, seeding the random source from the configured seed
    /// or OS entropy.
    pub fn optimize(&self, cells: &[Cell], check_los: bool) -> Result<OptimizationResult> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        self.optimize_with_rng(cells, check_los, &mut rng)
    }

    /// Optimize `cells` with a caller-supplied random source.
    ///
    /// `check_los` is forwarded untouched to every detector call. Fails only
    /// on invalid input or a detector error; PCI-space saturation degrades to
    /// reuse and is reported through `residual_collisions`.
    pub fn optimize_with_rng<R: Rng + ?Sized>(
        &self,
        cells: &[Cell],
        check_los: bool,
        rng: &mut R,
    ) -> Result<OptimizationResult> {
        let started = Instant::now();
        validate_cells(cells)?;
        self.config.validate()?;
        log::info!(
            "optimizer: start cells={} check_los={check_los} max_iterations={}",
            cells.len(),
            self.config.max_iterations
        );

        let mut working = cells.to_vec();
        let collision_changes =
            eliminate_collisions(&mut working, self.config.proximity_radius_m, rng);

        let initial = self.detector.detect_conflicts(&working, check_los)?;
        let initial_tally = ConflictTally::from_conflicts(&initial);
        log::info!("optimizer: initial {initial_tally}");

        let graph = InterferenceGraph::from_conflicts(&working, &initial);
        let isolated = working.iter().filter(|cell| graph.degree(&cell.id) == 0).count();
        log::debug!("optimizer: graph isolated_cells={isolated}");
        let mut run = RunContext::new(working, graph, self.config.tabu_tenure, rng);
        run.changes.extend(collision_changes);

        let outcome = self.search(&mut run, initial_tally, check_los)?;

        let optimized_cells = outcome.best_cells;
        let final_conflicts = self.detector.detect_conflicts(&optimized_cells, check_los)?;
        let final_tally = ConflictTally::from_conflicts(&final_conflicts);
        let residual_collisions = verify_unique(&optimized_cells);

        let result = OptimizationResult {
            original_cells: cells.to_vec(),
            optimized_cells,
            iterations: outcome.iterations,
            original_conflicts: initial_tally.total,
            final_conflicts: final_tally.total,
            resolved_conflicts: initial_tally.total as i64 - final_tally.total as i64,
            conflict_reduction: OptimizationResult::reduction_percent(
                initial_tally.total,
                final_tally.total,
            ),
            changes: run.changes,
            convergence_history: run.history,
            stop_reason: outcome.stop_reason,
            residual_collisions,
        };

        log::info!(
            "optimizer: done critical={}->{} high={}->{} {result} secs={:.3}",
            initial_tally.critical,
            final_tally.critical,
            initial_tally.high,
            final_tally.high,
            started.elapsed().as_secs_f32()
        );
        Ok(result)
    }

    fn search<R: Rng + ?Sized>(
        &self,
        run: &mut RunContext<'_, R>,
        initial: ConflictTally,
        check_los: bool,
    ) -> Result<SearchOutcome> {
        let cfg = &self.config;
        let mut best_cells = run.cells.clone();
        let mut best = (initial.total, initial.critical);
        let mut last = initial;
        let mut stall = 0;
        let mut iteration = 0;

        while iteration < cfg.max_iterations && (last.has_urgent() || stall < cfg.stall_limit) {
            iteration += 1;

            let conflicts = self.detector.detect_conflicts(&run.cells, check_los)?;
            let tally = ConflictTally::from_conflicts(&conflicts);
            log::info!("optimizer.iter: n={iteration} {tally} stall={stall}");

            if (tally.total, tally.critical) < best {
                best = (tally.total, tally.critical);
                best_cells.clone_from(&run.cells);
                stall = 0;
                log::debug!("optimizer.iter: n={iteration} new_best total={} critical={}", best.0, best.1);
            } else {
                stall += 1;
            }

            if tally.is_clear() {
                log::info!("optimizer.iter: n={iteration} perfect");
                return Ok(SearchOutcome {
                    best_cells,
                    iterations: iteration,
                    stop_reason: StopReason::Perfect,
                });
            }

            let diversify = stall >= cfg.diversify_after;
            let batch = if diversify {
                cfg.diversified_batch
            } else {
                cfg.recolor_batch
            };
            let applied = run.recolor(&conflicts, iteration, diversify, batch, cfg.top_fraction);

            run.history.push(IterationRecord {
                iteration,
                conflict_count: tally.total,
                critical_count: tally.critical,
                high_count: tally.high,
                changes: applied,
            });
            last = tally;
            run.tabu.evict_expired(iteration);
            log::trace!("optimizer.iter: n={iteration} tabu_entries={}", run.tabu.len());
        }

        let stop_reason = if iteration >= cfg.max_iterations {
            StopReason::IterationLimit
        } else {
            StopReason::Converged
        };
        log::info!("optimizer.iter: stop={stop_reason} iterations={iteration} stall={stall}");
        Ok(SearchOutcome {
            best_cells,
            iterations: iteration,
            stop_reason,
        })
    }
}

impl<'r, R: Rng + ?Sized> RunContext<'r, R> {
    fn new(cells: Vec<Cell>, graph: InterferenceGraph, tenure: usize, rng: &'r mut R) -> Self {
        let index = cells
            .iter()
            .enumerate()
            .map(|(idx, cell)| (cell.id.clone(), idx))
            .collect();
        Self {
            cells,
            index,
            graph,
            tabu: TabuMemory::new(tenure),
            rng,
            changes: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Recolor up to `batch` of the most conflicted cells. Returns the number
    /// of PCI changes applied.
    fn recolor(
        &mut self,
        conflicts: &[PciConflict],
        iteration: usize,
        diversify: bool,
        batch: usize,
        top_fraction: f64,
    ) -> usize {
        let selected = self.most_conflicted(conflicts, batch);
        let mut applied = 0;

        for (idx, pressure) in selected {
            let scorer = CandidateScorer::new(&self.graph, &self.tabu, &self.index, top_fraction);
            let new_pci = scorer.recommend(&self.cells, idx, iteration, diversify, &mut *self.rng);

            let cell = &mut self.cells[idx];
            if new_pci == cell.pci || self.tabu.is_tabu(&cell.id, new_pci, iteration) {
                continue;
            }
            let old_pci = cell.pci;
            cell.pci = new_pci;
            self.tabu.add(&cell.id, old_pci, iteration);
            log::debug!(
                "optimizer.recolor: cell={} {old_pci}->{new_pci} mod3={}->{}",
                cell.id,
                old_pci % 3,
                new_pci % 3
            );
            self.changes.push(PciChange::new(
                cell.id.clone(),
                old_pci,
                new_pci,
                format!("graph coloring: reduce {} conflicts", pressure.total),
            ));
            applied += 1;
        }
        applied
    }

    /// Conflicted cells ordered by CRITICAL count, then total count, then
    /// input order.
    fn most_conflicted(&self, conflicts: &[PciConflict], batch: usize) -> Vec<(usize, CellPressure)> {
        let mut pressure: HashMap<&str, CellPressure> = HashMap::new();
        for conflict in conflicts {
            for id in [&conflict.primary_cell, &conflict.conflicting_cell] {
                let entry = pressure.entry(id.as_str()).or_default();
                entry.total += 1;
                if conflict.severity == Severity::Critical {
                    entry.critical += 1;
                }
            }
        }

        let mut ranked: Vec<(usize, CellPressure)> = self
            .cells
            .iter()
            .enumerate()
            .filter_map(|(idx, cell)| pressure.get(cell.id.as_str()).map(|p| (idx, *p)))
            .collect();
        ranked.sort_by(|(_, a), (_, b)| {
            b.critical
                .cmp(&a.critical)
                .then_with(|| b.total.cmp(&a.total))
        });
        ranked.truncate(batch);
        ranked
    }
}

/// PCIs held by more than one cell, in order of first appearance.
fn verify_unique(cells: &[Cell]) -> Vec<PciCollision> {
    let mut order: Vec<Pci> = Vec::new();
    let mut holders: HashMap<Pci, Vec<String>> = HashMap::new();
    for cell in cells {
        holders
            .entry(cell.pci)
            .or_insert_with(|| {
                order.push(cell.pci);
                Vec::new()
            })
            .push(cell.id.clone());
    }

    let collisions: Vec<PciCollision> = order
        .into_iter()
        .filter_map(|pci| {
            let cell_ids = holders.remove(&pci)?;
            (cell_ids.len() > 1).then_some(PciCollision { pci, cell_ids })
        })
        .collect();

    if collisions.is_empty() {
        log::debug!("optimizer.verify: unique cells={}", cells.len());
    } else {
        log::error!("optimizer.verify: {} pci collisions in final result", collisions.len());
        for collision in &collisions {
            log::error!(
                "optimizer.verify: pci={} cells={}",
                collision.pci,
                collision.cell_ids.join(",")
            );
        }
    }
    collisions
}
