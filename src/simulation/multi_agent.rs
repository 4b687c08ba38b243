//! Multi-agent simulation with EV exchange
//!
//! Wraps a single-agent `Simulation` and adds an exchange pass after each
//! step: for every edge `(from, to, frac)`, `frac * output(from)` leaves the
//! source's accounted output and is added to the target's "received EV"
//! environmental component.
//!
//! The pass runs after the step is recorded, so exchange is only visible
//! from the next step on. Edges apply in the graph's order (sources by first
//! appearance, then each source's edges in insertion order).

use serde::Serialize;
use std::collections::BTreeMap;

use crate::analysis::explain::Breakdown;
use crate::core::config::EngineConfig;
use crate::core::error::{EvError, Result};
use crate::core::types::{CellId, EvType, Step, Tick};
use crate::entity::cell::{CellAgent, CellPatch};
use crate::simulation::engine::{step_schedule, Simulation, StepProduction};
use crate::simulation::exchange::EvExchangeGraph;
use crate::simulation::field::Field;
use crate::simulation::supervisor::Supervisor;

/// One cell's exchange accounting for one step
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CellExchange {
    /// Total production across EV types
    pub gross: f64,
    /// Amount sent to other cells
    pub exported: f64,
    /// Amount received from other cells, visible from the next step
    pub received: f64,
}

impl CellExchange {
    /// Output left with the cell after transfers
    pub fn accounted(&self) -> f64 {
        self.gross - self.exported
    }
}

/// Per-cell, per-step exchange records of the last run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExchangeLedger {
    entries: BTreeMap<CellId, BTreeMap<Step, CellExchange>>,
}

impl ExchangeLedger {
    pub fn get(&self, cell_id: &str, step: Step) -> Option<CellExchange> {
        self.entries.get(cell_id)?.get(&step).copied()
    }

    pub fn cell(&self, cell_id: &str) -> Option<&BTreeMap<Step, CellExchange>> {
        self.entries.get(cell_id)
    }

    /// Total amount moved between cells over the whole run
    pub fn total_transferred(&self) -> f64 {
        self.entries
            .values()
            .flat_map(|steps| steps.values())
            .map(|entry| entry.exported)
            .sum()
    }

    fn entry(&mut self, cell_id: &CellId, step: Step) -> &mut CellExchange {
        self.entries
            .entry(cell_id.clone())
            .or_default()
            .entry(step)
            .or_default()
    }
}

/// Cells that exchange EVs along a fixed graph
#[derive(Debug, Clone)]
pub struct MultiAgentSimulation {
    simulation: Simulation,
    exchange: EvExchangeGraph,
    ledger: ExchangeLedger,
}

impl MultiAgentSimulation {
    pub fn new(
        cells: Vec<CellAgent>,
        supervisor: Supervisor,
        exchange: EvExchangeGraph,
    ) -> Result<Self> {
        Self::from_simulation(Simulation::new(cells, supervisor)?, exchange)
    }

    pub fn with_config(
        cells: Vec<CellAgent>,
        supervisor: Supervisor,
        exchange: EvExchangeGraph,
        config: EngineConfig,
    ) -> Result<Self> {
        Self::from_simulation(Simulation::with_config(cells, supervisor, config)?, exchange)
    }

    /// Add exchange to an existing simulation
    pub fn from_simulation(simulation: Simulation, exchange: EvExchangeGraph) -> Result<Self> {
        let multi = Self {
            simulation,
            exchange,
            ledger: ExchangeLedger::default(),
        };
        multi.validate()?;
        Ok(multi)
    }

    pub fn validate(&self) -> Result<()> {
        self.simulation.validate()?;
        self.resolve_edges()?;
        Ok(())
    }

    /// Edges as `(from_idx, to_idx, frac)` in application order
    ///
    /// Fails when an edge names a missing cell or a target cannot hold
    /// received EVs.
    fn resolve_edges(&self) -> Result<Vec<(usize, usize, f64)>> {
        let received_index = self.simulation.config().received_index;
        let mut resolved = Vec::with_capacity(self.exchange.edges().len());
        for (from, to, frac) in self.exchange.ordered_edges() {
            let from_idx = self
                .simulation
                .cell_index(from.as_str())
                .ok_or_else(|| EvError::UnknownCell(from.clone()))?;
            let to_idx = self
                .simulation
                .cell_index(to.as_str())
                .ok_or_else(|| EvError::UnknownCell(to.clone()))?;

            let target = &self.simulation.cells()[to_idx];
            if target.environment_at(received_index).is_none() {
                return Err(EvError::config(format!(
                    "cell {} has {} environmental components, received_index = {} is out of range",
                    to,
                    target.environment().len(),
                    received_index
                )));
            }
            resolved.push((from_idx, to_idx, frac));
        }
        Ok(resolved)
    }

    // === ACCESSORS ===

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn cells(&self) -> &[CellAgent] {
        self.simulation.cells()
    }

    pub fn cell(&self, id: &str) -> Option<&CellAgent> {
        self.simulation.cell(id)
    }

    pub fn exchange(&self) -> &EvExchangeGraph {
        &self.exchange
    }

    /// Exchange records of the most recent run
    pub fn ledger(&self) -> &ExchangeLedger {
        &self.ledger
    }

    pub fn supervisor(&self) -> &Supervisor {
        self.simulation.supervisor()
    }

    pub fn supervisor_mut(&mut self) -> &mut Supervisor {
        self.simulation.supervisor_mut()
    }

    pub fn patch_cell(&mut self, id: &str, patch: &CellPatch) -> Result<()> {
        self.simulation.patch_cell(id, patch)
    }

    pub fn explain(&self, cell_id: &str, time: f64, ev_type: EvType) -> Result<Breakdown> {
        self.simulation.explain(cell_id, time, ev_type)
    }

    /// Give back the wrapped simulation, with cell state as left by exchange
    pub fn into_simulation(self) -> Simulation {
        self.simulation
    }

    // === STEPPING ===

    pub fn run(&mut self, t_end: Tick, dt: f64) -> Result<Field> {
        self.run_segment(0, t_end, dt)
    }

    /// Run the steps whose time falls in `[start, stop)`, exchanging after each
    pub fn run_segment(&mut self, start: Tick, stop: Tick, dt: f64) -> Result<Field> {
        let schedule = step_schedule(start, stop, dt)?;
        self.simulation.validate()?;
        let edges = self.resolve_edges()?;

        tracing::info!(
            cells = self.simulation.cells().len(),
            edges = edges.len(),
            steps = schedule.len(),
            start,
            stop,
            dt,
            "starting multi-agent run"
        );

        self.ledger = ExchangeLedger::default();
        let mut field = Field::new(dt);
        for (step, time) in schedule {
            let production = self.simulation.compute_step(step, time)?;
            self.simulation.record(&mut field, &production);
            self.exchange_pass(&production, &edges)?;
        }

        tracing::info!(
            steps = field.steps().len(),
            transferred = self.ledger.total_transferred(),
            "multi-agent run complete"
        );
        Ok(field)
    }

    /// Move exported output into targets' received component for the next step
    fn exchange_pass(
        &mut self,
        production: &StepProduction,
        edges: &[(usize, usize, f64)],
    ) -> Result<()> {
        let step = production.step;
        let received_index = self.simulation.config().received_index;

        let ids: Vec<CellId> = self
            .simulation
            .cells()
            .iter()
            .map(|c| c.cell_id().clone())
            .collect();
        for (idx, id) in ids.iter().enumerate() {
            self.ledger.entry(id, step).gross = production.cell_output(idx);
        }

        for &(from_idx, to_idx, frac) in edges {
            let amount = frac * production.cell_output(from_idx);
            self.ledger.entry(&ids[from_idx], step).exported += amount;
            self.ledger.entry(&ids[to_idx], step).received += amount;

            let cell = &mut self.simulation.cells_mut()[to_idx];
            let level = cell.add_environment_at(received_index, amount)?;
            tracing::debug!(
                step,
                from = %ids[from_idx],
                to = %ids[to_idx],
                amount,
                level,
                "EV transfer"
            );
        }
        Ok(())
    }
}
