//! Single-agent simulation loop
//!
//! Each step: ask the supervisor for active multipliers, compute every
//! cell's rate for every EV type, and add the rates into the Field.
//! Cells never influence each other here; see `multi_agent` for exchange.
//!
//! A run is deterministic: the same cells, supervisor, kinetics, config
//! and schedule always produce a bit-identical Field.

use ahash::AHashSet;

use crate::analysis::explain::{contribution_breakdown, Breakdown};
use crate::core::config::EngineConfig;
use crate::core::error::{EvError, Result};
use crate::core::types::{EvType, Step, Tick};
use crate::entity::cell::{CellAgent, CellPatch};
use crate::simulation::field::Field;
use crate::simulation::kinetics::{baseline_rate, KineticsTable};
use crate::simulation::rates::{cell_scale, production_rate, PARACRINE_TERM};
use crate::simulation::supervisor::{ActiveScale, Supervisor};

/// Rates computed for one step, before they are recorded
///
/// `rates[cell][ev]` follows the simulation's cell order and the config's
/// EV type order.
#[derive(Debug, Clone, PartialEq)]
pub struct StepProduction {
    pub step: Step,
    pub time: f64,
    pub rates: Vec<Vec<f64>>,
}

impl StepProduction {
    /// Sum of one cell's rates across EV types
    pub fn cell_output(&self, cell_idx: usize) -> f64 {
        self.rates
            .get(cell_idx)
            .map(|r| r.iter().sum())
            .unwrap_or(0.0)
    }
}

/// Steps `k` with `start <= k * dt < stop`, paired with their time
pub fn step_schedule(start: Tick, stop: Tick, dt: f64) -> Result<Vec<(Step, f64)>> {
    if !dt.is_finite() || dt <= 0.0 {
        return Err(EvError::config(format!("dt must be positive, got {}", dt)));
    }
    if start < 0 {
        return Err(EvError::config(format!("start time must be >= 0, got {}", start)));
    }
    if stop <= start {
        return Err(EvError::config(format!(
            "run length must be positive, got [{}, {})",
            start, stop
        )));
    }

    let mut k = (start as f64 / dt).ceil() as Step;
    let mut schedule = Vec::new();
    loop {
        let time = k as f64 * dt;
        if time >= stop as f64 {
            break;
        }
        schedule.push((k, time));
        k += 1;
    }
    Ok(schedule)
}

/// Population of cells under one stress schedule
///
/// `run` takes `&mut self`: one instance cannot run twice at once, while
/// distinct instances are independent and may run in parallel.
#[derive(Debug, Clone)]
pub struct Simulation {
    cells: Vec<CellAgent>,
    supervisor: Supervisor,
    kinetics: Option<KineticsTable>,
    config: EngineConfig,
}

impl Simulation {
    /// Create a simulation with the default engine config
    pub fn new(cells: Vec<CellAgent>, supervisor: Supervisor) -> Result<Self> {
        Self::with_config(cells, supervisor, EngineConfig::default())
    }

    pub fn with_config(
        cells: Vec<CellAgent>,
        supervisor: Supervisor,
        config: EngineConfig,
    ) -> Result<Self> {
        let sim = Self {
            cells,
            supervisor,
            kinetics: None,
            config,
        };
        sim.validate()?;
        Ok(sim)
    }

    /// Attach a baseline-rate table; cells without an entry use the default
    pub fn with_kinetics(mut self, kinetics: KineticsTable) -> Self {
        self.kinetics = Some(kinetics);
        self
    }

    /// Check everything a run depends on, before any step executes
    pub fn validate(&self) -> Result<()> {
        self.config.validate()?;
        self.supervisor.validate()?;

        if self.config.paracrine_gain > 0.0
            && self.supervisor.stress_windows().contains_key(PARACRINE_TERM)
        {
            return Err(EvError::config(format!(
                "stress name '{}' is reserved while paracrine_gain is set",
                PARACRINE_TERM
            )));
        }

        let mut seen = AHashSet::new();
        for cell in &self.cells {
            if !seen.insert(cell.cell_id().clone()) {
                return Err(EvError::config(format!("duplicate cell id {}", cell.cell_id())));
            }
            for (label, index) in [
                ("energy_index", self.config.energy_index),
                ("stress_index", self.config.stress_index),
            ] {
                if cell.internal_at(index).is_none() {
                    return Err(EvError::config(format!(
                        "cell {} has {} internal components, {} = {} is out of range",
                        cell.cell_id(),
                        cell.internal().len(),
                        label,
                        index
                    )));
                }
            }
        }
        Ok(())
    }

    // === ACCESSORS ===

    pub fn cells(&self) -> &[CellAgent] {
        &self.cells
    }

    pub fn cell(&self, id: &str) -> Option<&CellAgent> {
        self.cells.iter().find(|c| c.cell_id().as_str() == id)
    }

    pub(crate) fn cell_index(&self, id: &str) -> Option<usize> {
        self.cells.iter().position(|c| c.cell_id().as_str() == id)
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [CellAgent] {
        &mut self.cells
    }

    /// Apply a partial update to one cell between runs
    pub fn patch_cell(&mut self, id: &str, patch: &CellPatch) -> Result<()> {
        let cell = self
            .cells
            .iter_mut()
            .find(|c| c.cell_id().as_str() == id)
            .ok_or_else(|| EvError::UnknownCell(id.into()))?;
        cell.apply_patch(patch)
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    /// Mutable supervisor access between runs; runs re-validate it
    pub fn supervisor_mut(&mut self) -> &mut Supervisor {
        &mut self.supervisor
    }

    pub fn kinetics(&self) -> Option<&KineticsTable> {
        self.kinetics.as_ref()
    }

    pub fn set_kinetics(&mut self, kinetics: Option<KineticsTable>) {
        self.kinetics = kinetics;
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ev_types(&self) -> &[EvType] {
        &self.config.ev_types
    }

    /// Baseline rate `r_T` for a cell and EV type
    pub fn baseline(&self, cell: &CellAgent, ev_type: EvType) -> f64 {
        baseline_rate(
            self.kinetics.as_ref(),
            cell.cell_type(),
            ev_type,
            self.config.default_baseline,
        )
    }

    /// Active multipliers for a cell at time `time`, paracrine term included
    pub fn scale_for(&self, cell: &CellAgent, time: f64) -> Result<ActiveScale> {
        let supervisor_scale = self.supervisor.active_scale(time.floor() as Tick)?;
        Ok(cell_scale(&supervisor_scale, cell, &self.config))
    }

    // === STEPPING ===

    /// Compute every cell's rates for one step from the current state
    ///
    /// Pure with respect to `self`: nothing is mutated.
    pub fn compute_step(&self, step: Step, time: f64) -> Result<StepProduction> {
        let supervisor_scale = self.supervisor.active_scale(time.floor() as Tick)?;
        let mut rates = Vec::with_capacity(self.cells.len());
        for cell in &self.cells {
            let scale = cell_scale(&supervisor_scale, cell, &self.config);
            let mut cell_rates = Vec::with_capacity(self.config.ev_types.len());
            for &ev_type in &self.config.ev_types {
                let baseline = self.baseline(cell, ev_type);
                cell_rates.push(production_rate(cell, &scale, baseline, &self.config)?);
            }
            rates.push(cell_rates);
        }
        Ok(StepProduction { step, time, rates })
    }

    /// Add one step's rates into the Field
    pub(crate) fn record(&self, field: &mut Field, production: &StepProduction) {
        for (ev_idx, &ev_type) in self.config.ev_types.iter().enumerate() {
            field.open_step(ev_type, production.step);
            for (cell, cell_rates) in self.cells.iter().zip(&production.rates) {
                field.accumulate(ev_type, production.step, cell_rates[ev_idx], cell.proteins());
            }
        }
    }

    /// Run from time 0 to `t_end` with step `dt`
    pub fn run(&mut self, t_end: Tick, dt: f64) -> Result<Field> {
        self.run_segment(0, t_end, dt)
    }

    /// Run the steps whose time falls in `[start, stop)`
    ///
    /// Step indices stay absolute, so consecutive segments line up.
    pub fn run_segment(&mut self, start: Tick, stop: Tick, dt: f64) -> Result<Field> {
        let schedule = step_schedule(start, stop, dt)?;
        self.validate()?;

        tracing::info!(
            cells = self.cells.len(),
            steps = schedule.len(),
            start,
            stop,
            dt,
            "starting simulation run"
        );

        let mut field = Field::new(dt);
        for (step, time) in schedule {
            let production = self.compute_step(step, time)?;
            self.record(&mut field, &production);
        }

        tracing::info!(steps = field.steps().len(), "simulation run complete");
        Ok(field)
    }

    /// Explain-Why breakdown of one cell's rate at time `time`
    pub fn explain(&self, cell_id: &str, time: f64, ev_type: EvType) -> Result<Breakdown> {
        let cell = self
            .cell(cell_id)
            .ok_or_else(|| EvError::UnknownCell(cell_id.into()))?;
        self.supervisor.validate()?;
        let scale = self.scale_for(cell, time)?;
        contribution_breakdown(cell, &scale, self.baseline(cell, ev_type), ev_type, &self.config)
    }
}
