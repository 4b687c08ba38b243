//! Baseline rate table keyed by cell type and EV type

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{EvError, Result};
use crate::core::types::EvType;

/// One row of a kinetics table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KineticsEntry {
    pub cell_type: String,
    pub ev_type: EvType,
    pub rate: f64,
}

/// Baseline rates `r_T` per (cell type, EV type)
#[derive(Debug, Clone, Default)]
pub struct KineticsTable {
    rates: AHashMap<(String, EvType), f64>,
}

impl KineticsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = KineticsEntry>) -> Result<Self> {
        let mut table = Self::new();
        for entry in entries {
            table.insert(&entry.cell_type, entry.ev_type, entry.rate)?;
        }
        Ok(table)
    }

    /// Set a baseline rate; rates must be positive and finite
    pub fn insert(&mut self, cell_type: &str, ev_type: EvType, rate: f64) -> Result<()> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(EvError::config(format!(
                "baseline rate for ({}, {}) must be positive, got {}",
                cell_type, ev_type, rate
            )));
        }
        self.rates.insert((cell_type.to_string(), ev_type), rate);
        Ok(())
    }

    pub fn get(&self, cell_type: &str, ev_type: EvType) -> Option<f64> {
        self.rates.get(&(cell_type.to_string(), ev_type)).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Rows sorted by cell type then EV type
    pub fn entries(&self) -> Vec<KineticsEntry> {
        let mut entries: Vec<KineticsEntry> = self
            .rates
            .iter()
            .map(|((cell_type, ev_type), rate)| KineticsEntry {
                cell_type: cell_type.clone(),
                ev_type: *ev_type,
                rate: *rate,
            })
            .collect();
        entries.sort_by(|a, b| (&a.cell_type, a.ev_type).cmp(&(&b.cell_type, b.ev_type)));
        entries
    }
}

/// Resolve `r_T` for a cell, falling back to `default` when there is no entry
pub fn baseline_rate(
    table: Option<&KineticsTable>,
    cell_type: &str,
    ev_type: EvType,
    default: f64,
) -> f64 {
    table
        .and_then(|t| t.get(cell_type, ev_type))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_and_fallback() {
        let mut table = KineticsTable::new();
        table.insert("hepatocyte", EvType::Exosome, 2.5).unwrap();

        assert_eq!(
            baseline_rate(Some(&table), "hepatocyte", EvType::Exosome, 1.0),
            2.5
        );
        assert_eq!(
            baseline_rate(Some(&table), "hepatocyte", EvType::Microvesicle, 1.0),
            1.0
        );
        assert_eq!(baseline_rate(None, "hepatocyte", EvType::Exosome, 0.7), 0.7);
    }

    #[test]
    fn test_rejects_non_positive_rates() {
        let mut table = KineticsTable::new();
        assert!(table.insert("generic", EvType::Exosome, 0.0).is_err());
        assert!(table.insert("generic", EvType::Exosome, f64::INFINITY).is_err());
        assert!(table.is_empty());
    }

    #[test]
    fn test_entries_sorted() {
        let table = KineticsTable::from_entries(vec![
            KineticsEntry { cell_type: "b".into(), ev_type: EvType::Exosome, rate: 1.0 },
            KineticsEntry { cell_type: "a".into(), ev_type: EvType::Microvesicle, rate: 2.0 },
            KineticsEntry { cell_type: "a".into(), ev_type: EvType::Exosome, rate: 3.0 },
        ])
        .unwrap();
        let rows: Vec<(String, EvType)> = table
            .entries()
            .into_iter()
            .map(|e| (e.cell_type, e.ev_type))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("a".to_string(), EvType::Exosome),
                ("a".to_string(), EvType::Microvesicle),
                ("b".to_string(), EvType::Exosome),
            ]
        );
    }
}
