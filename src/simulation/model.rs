//! Common surface of the single- and multi-agent simulations

use crate::core::error::Result;
use crate::core::types::Tick;
use crate::entity::cell::{CellAgent, CellPatch};
use crate::simulation::engine::Simulation;
use crate::simulation::field::Field;
use crate::simulation::multi_agent::MultiAgentSimulation;
use crate::simulation::supervisor::Supervisor;

/// Anything that can be advanced over a time range into a Field
pub trait SecretionModel {
    fn run_segment(&mut self, start: Tick, stop: Tick, dt: f64) -> Result<Field>;

    fn supervisor_mut(&mut self) -> &mut Supervisor;

    fn cell(&self, id: &str) -> Option<&CellAgent>;

    fn patch_cell(&mut self, id: &str, patch: &CellPatch) -> Result<()>;

    fn run(&mut self, t_end: Tick, dt: f64) -> Result<Field> {
        self.run_segment(0, t_end, dt)
    }
}

impl SecretionModel for Simulation {
    fn run_segment(&mut self, start: Tick, stop: Tick, dt: f64) -> Result<Field> {
        Simulation::run_segment(self, start, stop, dt)
    }

    fn supervisor_mut(&mut self) -> &mut Supervisor {
        Simulation::supervisor_mut(self)
    }

    fn cell(&self, id: &str) -> Option<&CellAgent> {
        Simulation::cell(self, id)
    }

    fn patch_cell(&mut self, id: &str, patch: &CellPatch) -> Result<()> {
        Simulation::patch_cell(self, id, patch)
    }
}

impl SecretionModel for MultiAgentSimulation {
    fn run_segment(&mut self, start: Tick, stop: Tick, dt: f64) -> Result<Field> {
        MultiAgentSimulation::run_segment(self, start, stop, dt)
    }

    fn supervisor_mut(&mut self) -> &mut Supervisor {
        MultiAgentSimulation::supervisor_mut(self)
    }

    fn cell(&self, id: &str) -> Option<&CellAgent> {
        MultiAgentSimulation::cell(self, id)
    }

    fn patch_cell(&mut self, id: &str, patch: &CellPatch) -> Result<()> {
        MultiAgentSimulation::patch_cell(self, id, patch)
    }
}
