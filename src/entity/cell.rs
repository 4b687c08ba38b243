//! Cell agent state
//!
//! A cell is plain state: internal and environmental scalar vectors, two
//! perturbation channels, ESCRT routing activity and a protein profile.
//! Every scalar is kept in [0, 1]; writes clamp finite out-of-range values
//! and reject NaN so downstream logarithms never see garbage.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::error::{EvError, Result};
use crate::core::types::CellId;

/// Clamp a scalar into [0, 1], rejecting NaN
pub fn clamp_unit(field: &str, value: f64) -> Result<f64> {
    if value.is_nan() {
        return Err(EvError::domain(format!("{} is NaN", field)));
    }
    if !(0.0..=1.0).contains(&value) {
        tracing::warn!(field, value, "clamping out-of-range cell state into [0, 1]");
    }
    Ok(value.clamp(0.0, 1.0))
}

fn clamp_all(field: &str, values: Vec<f64>) -> Result<Vec<f64>> {
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| clamp_unit(&format!("{}[{}]", field, i), v))
        .collect()
}

/// One simulated cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellAgent {
    cell_id: CellId,
    cell_type: String,
    /// Internal state (ATP, ROS, ...), semantics fixed by index
    #[serde(rename = "I")]
    internal: Vec<f64>,
    /// Environmental state (O2, pH, ..., received EVs), semantics fixed by index
    #[serde(rename = "E")]
    environment: Vec<f64>,
    ghost: f64,
    fairy: f64,
    /// ESCRT-pathway routing activity
    #[serde(rename = "S")]
    escrt: f64,
    /// Protein marker expression levels
    #[serde(rename = "P")]
    proteins: BTreeMap<String, f64>,
}

impl CellAgent {
    /// Create a cell with empty state vectors, `S = 0.5` and no perturbation
    pub fn new(cell_id: impl Into<CellId>, cell_type: impl Into<String>) -> Self {
        Self {
            cell_id: cell_id.into(),
            cell_type: cell_type.into(),
            internal: Vec::new(),
            environment: Vec::new(),
            ghost: 0.0,
            fairy: 0.0,
            escrt: 0.5,
            proteins: BTreeMap::new(),
        }
    }

    pub fn with_internal(mut self, values: Vec<f64>) -> Result<Self> {
        self.set_internal(values)?;
        Ok(self)
    }

    pub fn with_environment(mut self, values: Vec<f64>) -> Result<Self> {
        self.set_environment(values)?;
        Ok(self)
    }

    pub fn with_escrt(mut self, value: f64) -> Result<Self> {
        self.set_escrt(value)?;
        Ok(self)
    }

    pub fn with_modifiers(mut self, ghost: f64, fairy: f64) -> Result<Self> {
        self.set_ghost(ghost)?;
        self.set_fairy(fairy)?;
        Ok(self)
    }

    /// Add a protein marker to the profile
    pub fn with_protein(mut self, name: impl Into<String>, level: f64) -> Result<Self> {
        let name = name.into();
        let level = clamp_unit(&format!("P[{}]", name), level)?;
        self.proteins.insert(name, level);
        Ok(self)
    }

    // === READ ACCESSORS ===

    pub fn cell_id(&self) -> &CellId {
        &self.cell_id
    }

    pub fn cell_type(&self) -> &str {
        &self.cell_type
    }

    pub fn internal(&self) -> &[f64] {
        &self.internal
    }

    pub fn environment(&self) -> &[f64] {
        &self.environment
    }

    pub fn internal_at(&self, index: usize) -> Option<f64> {
        self.internal.get(index).copied()
    }

    pub fn environment_at(&self, index: usize) -> Option<f64> {
        self.environment.get(index).copied()
    }

    pub fn ghost(&self) -> f64 {
        self.ghost
    }

    pub fn fairy(&self) -> f64 {
        self.fairy
    }

    pub fn escrt(&self) -> f64 {
        self.escrt
    }

    pub fn proteins(&self) -> &BTreeMap<String, f64> {
        &self.proteins
    }

    // === WRITE ACCESSORS (all clamp) ===

    pub fn set_internal(&mut self, values: Vec<f64>) -> Result<()> {
        self.internal = clamp_all("I", values)?;
        Ok(())
    }

    pub fn set_environment(&mut self, values: Vec<f64>) -> Result<()> {
        self.environment = clamp_all("E", values)?;
        Ok(())
    }

    pub fn set_internal_at(&mut self, index: usize, value: f64) -> Result<()> {
        let value = clamp_unit(&format!("I[{}]", index), value)?;
        let len = self.internal.len();
        let slot = self.internal.get_mut(index).ok_or_else(|| {
            EvError::config(format!("I index {} out of bounds (len {})", index, len))
        })?;
        *slot = value;
        Ok(())
    }

    pub fn set_environment_at(&mut self, index: usize, value: f64) -> Result<()> {
        let value = clamp_unit(&format!("E[{}]", index), value)?;
        let len = self.environment.len();
        let slot = self.environment.get_mut(index).ok_or_else(|| {
            EvError::config(format!("E index {} out of bounds (len {})", index, len))
        })?;
        *slot = value;
        Ok(())
    }

    /// Add `delta` to one environmental component, saturating at the [0, 1] bounds
    ///
    /// Returns the new value. Saturation is expected here, so it does not warn.
    pub fn add_environment_at(&mut self, index: usize, delta: f64) -> Result<f64> {
        if delta.is_nan() {
            return Err(EvError::domain(format!("E[{}] increment is NaN", index)));
        }
        let len = self.environment.len();
        let slot = self.environment.get_mut(index).ok_or_else(|| {
            EvError::config(format!("E index {} out of bounds (len {})", index, len))
        })?;
        *slot = (*slot + delta).clamp(0.0, 1.0);
        Ok(*slot)
    }

    pub fn set_ghost(&mut self, value: f64) -> Result<()> {
        self.ghost = clamp_unit("ghost", value)?;
        Ok(())
    }

    pub fn set_fairy(&mut self, value: f64) -> Result<()> {
        self.fairy = clamp_unit("fairy", value)?;
        Ok(())
    }

    pub fn set_escrt(&mut self, value: f64) -> Result<()> {
        self.escrt = clamp_unit("S", value)?;
        Ok(())
    }

    /// Update an existing protein level; the marker set is fixed per cell
    pub fn set_protein(&mut self, name: &str, level: f64) -> Result<()> {
        let level = clamp_unit(&format!("P[{}]", name), level)?;
        match self.proteins.get_mut(name) {
            Some(slot) => {
                *slot = level;
                Ok(())
            }
            None => Err(EvError::config(format!(
                "cell {} has no protein marker '{}'",
                self.cell_id, name
            ))),
        }
    }

    /// Apply a partial state update
    ///
    /// Validates every field before writing anything, so a failing patch
    /// leaves the cell untouched.
    pub fn apply_patch(&mut self, patch: &CellPatch) -> Result<()> {
        let mut next = self.clone();
        if let Some(values) = &patch.internal {
            next.set_internal(values.clone())?;
        }
        if let Some(values) = &patch.environment {
            next.set_environment(values.clone())?;
        }
        if let Some(value) = patch.escrt {
            next.set_escrt(value)?;
        }
        if let Some(value) = patch.ghost {
            next.set_ghost(value)?;
        }
        if let Some(value) = patch.fairy {
            next.set_fairy(value)?;
        }
        for (name, level) in &patch.proteins {
            next.set_protein(name, *level)?;
        }
        *self = next;
        Ok(())
    }
}

/// Partial update to a cell's state, applied between runs or story segments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellPatch {
    #[serde(rename = "I", skip_serializing_if = "Option::is_none")]
    pub internal: Option<Vec<f64>>,
    #[serde(rename = "E", skip_serializing_if = "Option::is_none")]
    pub environment: Option<Vec<f64>>,
    #[serde(rename = "S", skip_serializing_if = "Option::is_none")]
    pub escrt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ghost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fairy: Option<f64>,
    #[serde(rename = "P", skip_serializing_if = "BTreeMap::is_empty")]
    pub proteins: BTreeMap<String, f64>,
}

impl CellPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn environment(mut self, values: Vec<f64>) -> Self {
        self.environment = Some(values);
        self
    }

    pub fn internal(mut self, values: Vec<f64>) -> Self {
        self.internal = Some(values);
        self
    }

    pub fn escrt(mut self, value: f64) -> Self {
        self.escrt = Some(value);
        self
    }

    pub fn ghost(mut self, value: f64) -> Self {
        self.ghost = Some(value);
        self
    }

    pub fn fairy(mut self, value: f64) -> Self {
        self.fairy = Some(value);
        self
    }

    pub fn protein(mut self, name: impl Into<String>, level: f64) -> Self {
        self.proteins.insert(name.into(), level);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cell() -> CellAgent {
        CellAgent::new("C1", "generic")
            .with_internal(vec![0.6, 0.5, 0.4, 0.5, 0.6])
            .unwrap()
            .with_environment(vec![0.5; 5])
            .unwrap()
            .with_protein("CD63", 0.5)
            .unwrap()
    }

    #[test]
    fn test_writes_clamp_into_unit_range() {
        let mut cell = sample_cell();
        cell.set_escrt(1.4).unwrap();
        cell.set_ghost(-0.2).unwrap();
        cell.set_internal(vec![2.0, -1.0]).unwrap();

        assert_eq!(cell.escrt(), 1.0);
        assert_eq!(cell.ghost(), 0.0);
        assert_eq!(cell.internal(), &[1.0, 0.0]);
    }

    #[test]
    fn test_nan_is_domain_error() {
        let mut cell = sample_cell();
        let err = cell.set_fairy(f64::NAN).unwrap_err();
        assert!(err.is_domain());
        assert_eq!(cell.fairy(), 0.0);
    }

    #[test]
    fn test_add_environment_saturates() {
        let mut cell = sample_cell();
        let value = cell.add_environment_at(4, 0.8).unwrap();
        assert_eq!(value, 1.0);
        assert!(cell.add_environment_at(9, 0.1).unwrap_err().is_config());
    }

    #[test]
    fn test_unknown_protein_rejected() {
        let mut cell = sample_cell();
        assert!(cell.set_protein("CD9", 0.3).is_err());
        cell.set_protein("CD63", 0.9).unwrap();
        assert_eq!(cell.proteins()["CD63"], 0.9);
    }

    #[test]
    fn test_failed_patch_leaves_cell_untouched() {
        let mut cell = sample_cell();
        let before = cell.clone();
        let patch = CellPatch::new().escrt(0.9).protein("missing", 0.1);

        assert!(cell.apply_patch(&patch).is_err());
        assert_eq!(cell, before);
    }

    #[test]
    fn test_patch_applies_all_fields() {
        let mut cell = sample_cell();
        let patch = CellPatch::new()
            .environment(vec![0.2, 0.5, 0.5, 0.5, 0.4])
            .ghost(0.2)
            .escrt(0.7)
            .protein("CD63", 0.8);
        cell.apply_patch(&patch).unwrap();

        assert_eq!(cell.environment_at(0), Some(0.2));
        assert_eq!(cell.ghost(), 0.2);
        assert_eq!(cell.escrt(), 0.7);
        assert_eq!(cell.proteins()["CD63"], 0.8);
    }

    #[test]
    fn test_serializes_with_short_state_names() {
        let json = serde_json::to_value(sample_cell()).unwrap();
        assert_eq!(json["cell_id"], "C1");
        assert_eq!(json["S"], 0.5);
        assert_eq!(json["I"][0], 0.6);
        assert_eq!(json["P"]["CD63"], 0.5);
    }
}
