//! Tabu-search graph coloring over the PCI space.

pub(crate) mod collision;
pub(crate) mod config;
pub(crate) mod graph;
pub(crate) mod optimizer;
pub(crate) mod scorer;
pub(crate) mod tabu;
