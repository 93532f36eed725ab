use crate::cell::Pci;

/// Lowest assignable PCI. 0–29 are reserved for operator use.
pub const PCI_MIN: Pci = 30;
pub const PCI_MAX: Pci = 503;
/// Number of assignable PCI values.
pub const PCI_SPACE: usize = (PCI_MAX - PCI_MIN + 1) as usize;

pub(crate) const BASE_SCORE: f64 = 1_000.0;
pub(crate) const MOD3_PENALTY: f64 = 500.0;
pub(crate) const MOD6_PENALTY: f64 = 200.0;
pub(crate) const MOD12_PENALTY: f64 = 50.0;
pub(crate) const EXACT_MATCH_PENALTY: f64 = 1_000.0;
pub(crate) const USED_ELSEWHERE_PENALTY: f64 = 10_000.0;
pub(crate) const UNUSED_BONUS: f64 = 1_000.0;
pub(crate) const TABU_PENALTY: f64 = 2_000.0;
pub(crate) const DIVERSIFY_BONUS: f64 = 300.0;

pub(crate) fn assignable_pcis() -> std::ops::RangeInclusive<Pci> {
    PCI_MIN..=PCI_MAX
}

pub(crate) fn is_assignable(pci: Pci) -> bool {
    (PCI_MIN..=PCI_MAX).contains(&pci)
}
