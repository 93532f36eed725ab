use std::collections::HashMap;

use crate::cell::Pci;

/// (cell, pci) pairs a cell may not move back to until their tenure ends.
#[derive(Clone, Debug)]
pub(crate) struct TabuMemory {
    tenure: usize,
    /// cell id -> forbidden pci -> last iteration it stays forbidden.
    entries: HashMap<String, HashMap<Pci, usize>>,
}

impl TabuMemory {
    pub(crate) fn new(tenure: usize) -> Self {
        Self {
            tenure,
            entries: HashMap::new(),
        }
    }

    /// Forbid `pci` for `cell_id` through `iteration + tenure`.
    pub(crate) fn add(&mut self, cell_id: &str, pci: Pci, iteration: usize) {
        let until = iteration + self.tenure;
        match self.entries.get_mut(cell_id) {
            Some(forbidden) => {
                forbidden.insert(pci, until);
            }
            None => {
                self.entries
                    .insert(cell_id.to_owned(), HashMap::from([(pci, until)]));
            }
        }
    }

    pub(crate) fn is_tabu(&self, cell_id: &str, pci: Pci, iteration: usize) -> bool {
        self.entries
            .get(cell_id)
            .and_then(|forbidden| forbidden.get(&pci))
            .is_some_and(|&until| iteration <= until)
    }

    pub(crate) fn evict_expired(&mut self, iteration: usize) {
        self.entries.retain(|_, forbidden| {
            forbidden.retain(|_, until| iteration <= *until);
            !forbidden.is_empty()
        });
    }

    /// Number of live (cell, pci) entries.
    pub(crate) fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }
}
