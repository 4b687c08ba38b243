//! Story mode - a run split into narrated segments
//!
//! Each story step adds its stress windows to the supervisor, applies its
//! cell patches, then runs one fixed-length segment. State carries over
//! from segment to segment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::error::{EvError, Result};
use crate::core::types::Tick;
use crate::entity::cell::CellPatch;
use crate::simulation::field::Field;
use crate::simulation::model::SecretionModel;
use crate::simulation::supervisor::{StressWindow, Supervisor};

/// Stress introduced by a story step: multiplier plus `[start, stop)` window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoryStress {
    pub lambda: f64,
    pub window: (Tick, Tick),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryStep {
    pub title: String,
    pub stresses: BTreeMap<String, StoryStress>,
    pub patches: BTreeMap<String, CellPatch>,
    pub note: String,
}

impl StoryStep {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn stress(mut self, name: impl Into<String>, lambda: f64, window: (Tick, Tick)) -> Self {
        self.stresses.insert(name.into(), StoryStress { lambda, window });
        self
    }

    pub fn patch(mut self, cell_id: impl Into<String>, patch: CellPatch) -> Self {
        self.patches.insert(cell_id.into(), patch);
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }
}

/// Summary of one played story segment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryReport {
    pub title: String,
    pub note: String,
    pub start: Tick,
    pub stop: Tick,
    /// Sum of all recorded rates in the segment
    pub total_output: f64,
}

/// Apply a step's stresses and patches, or nothing if any of them is invalid
fn stage_step<M: SecretionModel>(model: &mut M, step: &StoryStep) -> Result<()> {
    let mut windows = Vec::with_capacity(step.stresses.len());
    for (name, stress) in &step.stresses {
        Supervisor::check_lambda(name, stress.lambda)?;
        windows.push((name, stress.lambda, StressWindow::new(stress.window.0, stress.window.1)?));
    }
    for (cell_id, patch) in &step.patches {
        let mut trial = model
            .cell(cell_id)
            .ok_or_else(|| EvError::UnknownCell(cell_id.as_str().into()))?
            .clone();
        trial.apply_patch(patch)?;
    }

    for (cell_id, patch) in &step.patches {
        model.patch_cell(cell_id, patch)?;
    }
    let supervisor = model.supervisor_mut();
    for (name, lambda, window) in windows {
        supervisor.set_lambda(name, lambda)?;
        supervisor.add_window(name, window);
    }
    Ok(())
}

/// Play `steps` as consecutive segments of `segment_len` ticks with `dt = 1`
pub fn run_story<M: SecretionModel>(
    model: &mut M,
    steps: &[StoryStep],
    segment_len: Tick,
) -> Result<Vec<(StoryReport, Field)>> {
    if segment_len <= 0 {
        return Err(EvError::config(format!(
            "segment length must be positive, got {}",
            segment_len
        )));
    }

    let mut outputs = Vec::with_capacity(steps.len());
    for (i, step) in steps.iter().enumerate() {
        let start = i as Tick * segment_len;
        let stop = start + segment_len;

        stage_step(model, step)?;

        tracing::debug!(title = %step.title, start, stop, "playing story segment");
        let field = model.run_segment(start, stop, 1.0)?;
        let total_output = field.steps().iter().map(|s| field.total_at(*s)).sum();

        outputs.push((
            StoryReport {
                title: step.title.clone(),
                note: step.note.clone(),
                start,
                stop,
                total_output,
            },
            field,
        ));
    }
    Ok(outputs)
}
