use std::collections::{HashMap, HashSet};

use crate::{cell::Cell, conflict::PciConflict};

/// Symmetric cell adjacency derived from one conflict-detection pass.
///
/// Built once per run and never refreshed: interference topology follows
/// from site geography, which PCI changes do not move.
#[derive(Clone, Debug, Default)]
pub(crate) struct InterferenceGraph {
    adjacency: HashMap<String, HashSet<String>>,
}

impl InterferenceGraph {
    pub(crate) fn from_conflicts(cells: &[Cell], conflicts: &[PciConflict]) -> Self {
        let mut adjacency: HashMap<String, HashSet<String>> = cells
            .iter()
            .map(|cell| (cell.id.clone(), HashSet::new()))
            .collect();

        for conflict in conflicts {
            let (a, b) = (&conflict.primary_cell, &conflict.conflicting_cell);
            if a == b || !adjacency.contains_key(a) || !adjacency.contains_key(b) {
                log::trace!("graph: skip edge {a} <-> {b}");
                continue;
            }
            if let Some(neighbors) = adjacency.get_mut(a) {
                neighbors.insert(b.clone());
            }
            if let Some(neighbors) = adjacency.get_mut(b) {
                neighbors.insert(a.clone());
            }
        }

        let graph = Self { adjacency };
        log::debug!(
            "graph: built vertices={} edges={}",
            graph.vertex_count(),
            graph.edge_count()
        );
        graph
    }

    pub(crate) fn neighbors(&self, cell_id: &str) -> impl Iterator<Item = &str> {
        self.adjacency
            .get(cell_id)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    pub(crate) fn degree(&self, cell_id: &str) -> usize {
        self.adjacency.get(cell_id).map_or(0, HashSet::len)
    }

    pub(crate) fn vertex_count(&self) -> usize {
        self.adjacency.len()
    }

    pub(crate) fn edge_count(&self) -> usize {
        self.adjacency.values().map(HashSet::len).sum::<usize>() / 2
    }
}
