//! Scenario files - a whole simulation setup in one TOML document
//!
//! ```toml
//! [engine]
//! sigmoid_steepness = 6.0
//!
//! [[cells]]
//! id = "C1"
//! cell_type = "generic"
//! I = [0.6, 0.5, 0.4, 0.5, 0.6]
//! E = [0.5, 0.5, 0.5, 0.5, 0.5]
//! S = 0.6
//! fairy = 0.3
//! P = { CD9 = 0.6, CD63 = 0.5 }
//!
//! [stress.hypoxia]
//! lambda = 1.2
//! windows = [[10, 20]]
//!
//! [[exchange]]
//! from = "C1"
//! to = "C2"
//! rate = 0.2
//!
//! [[kinetics]]
//! cell_type = "generic"
//! ev_type = "exosome"
//! rate = 1.0
//! ```
//!
//! Reading a scenario back out of a simulation gives collaborators a plain
//! snapshot of its configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::core::config::EngineConfig;
use crate::core::error::Result;
use crate::core::types::{CellId, Tick};
use crate::entity::cell::CellAgent;
use crate::simulation::engine::Simulation;
use crate::simulation::exchange::{EvExchangeGraph, ExchangeEdge};
use crate::simulation::kinetics::{KineticsEntry, KineticsTable};
use crate::simulation::multi_agent::MultiAgentSimulation;
use crate::simulation::supervisor::{StressWindow, Supervisor};

/// Declarative cell state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellConfig {
    pub id: CellId,
    #[serde(default = "default_cell_type")]
    pub cell_type: String,
    #[serde(rename = "I", default)]
    pub internal: Vec<f64>,
    #[serde(rename = "E", default)]
    pub environment: Vec<f64>,
    #[serde(rename = "S", default = "default_escrt")]
    pub escrt: f64,
    #[serde(default)]
    pub ghost: f64,
    #[serde(default)]
    pub fairy: f64,
    #[serde(rename = "P", default)]
    pub proteins: BTreeMap<String, f64>,
}

fn default_cell_type() -> String {
    "generic".to_string()
}

fn default_escrt() -> f64 {
    0.5
}

impl CellConfig {
    pub fn build(&self) -> Result<CellAgent> {
        let mut cell = CellAgent::new(self.id.clone(), self.cell_type.clone())
            .with_internal(self.internal.clone())?
            .with_environment(self.environment.clone())?
            .with_escrt(self.escrt)?
            .with_modifiers(self.ghost, self.fairy)?;
        for (name, level) in &self.proteins {
            cell = cell.with_protein(name.clone(), *level)?;
        }
        Ok(cell)
    }
}

impl From<&CellAgent> for CellConfig {
    fn from(cell: &CellAgent) -> Self {
        Self {
            id: cell.cell_id().clone(),
            cell_type: cell.cell_type().to_string(),
            internal: cell.internal().to_vec(),
            environment: cell.environment().to_vec(),
            escrt: cell.escrt(),
            ghost: cell.ghost(),
            fairy: cell.fairy(),
            proteins: cell.proteins().clone(),
        }
    }
}

/// Declarative stress: multiplier and closed-open windows
///
/// A stress may carry a multiplier without windows (never active), but
/// windows without a multiplier fail when the supervisor is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lambda: Option<f64>,
    pub windows: Vec<(Tick, Tick)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub engine: EngineConfig,
    pub cells: Vec<CellConfig>,
    pub stress: BTreeMap<String, StressConfig>,
    pub exchange: Vec<ExchangeEdge>,
    pub kinetics: Vec<KineticsEntry>,
}

impl Scenario {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(content)?;
        scenario.engine.validate()?;
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    pub fn build_cells(&self) -> Result<Vec<CellAgent>> {
        self.cells.iter().map(CellConfig::build).collect()
    }

    pub fn build_supervisor(&self) -> Result<Supervisor> {
        let mut supervisor = Supervisor::new();
        for (name, stress) in &self.stress {
            if let Some(lambda) = stress.lambda {
                supervisor.set_lambda(name, lambda)?;
            }
            for &(start, stop) in &stress.windows {
                supervisor.add_window(name, StressWindow::new(start, stop)?);
            }
        }
        supervisor.validate()?;
        Ok(supervisor)
    }

    /// `None` when the scenario lists no kinetics rows
    pub fn build_kinetics(&self) -> Result<Option<KineticsTable>> {
        if self.kinetics.is_empty() {
            return Ok(None);
        }
        KineticsTable::from_entries(self.kinetics.iter().cloned()).map(Some)
    }

    pub fn build_simulation(&self) -> Result<Simulation> {
        let mut sim = Simulation::with_config(
            self.build_cells()?,
            self.build_supervisor()?,
            self.engine.clone(),
        )?;
        sim.set_kinetics(self.build_kinetics()?);
        Ok(sim)
    }

    pub fn build_multi_agent(&self) -> Result<MultiAgentSimulation> {
        let exchange = EvExchangeGraph::new(self.exchange.clone())?;
        MultiAgentSimulation::from_simulation(self.build_simulation()?, exchange)
    }

    /// Snapshot the configuration of a simulation
    pub fn from_simulation(sim: &Simulation) -> Self {
        let supervisor = sim.supervisor();
        let mut stress: BTreeMap<String, StressConfig> = BTreeMap::new();
        for (name, lambda) in supervisor.lambdas() {
            stress.entry(name.clone()).or_default().lambda = Some(*lambda);
        }
        for (name, windows) in supervisor.stress_windows() {
            stress.entry(name.clone()).or_default().windows =
                windows.iter().map(|w| (w.start, w.stop)).collect();
        }

        Self {
            engine: sim.config().clone(),
            cells: sim.cells().iter().map(CellConfig::from).collect(),
            stress,
            exchange: Vec::new(),
            kinetics: sim.kinetics().map(KineticsTable::entries).unwrap_or_default(),
        }
    }

    pub fn from_multi_agent(multi: &MultiAgentSimulation) -> Self {
        Self {
            exchange: multi.exchange().edges().to_vec(),
            ..Self::from_simulation(multi.simulation())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::EvType;

    const DEMO: &str = r#"
        [engine]
        ev_types = ["exosome"]

        [[cells]]
        id = "C1"
        I = [0.6, 0.5, 0.4, 0.5, 0.6]
        E = [0.5, 0.5, 0.5, 0.5, 0.0]
        S = 0.6
        fairy = 0.3
        P = { CD9 = 0.6, CD63 = 0.5 }

        [[cells]]
        id = "C2"
        I = [0.6, 0.5, 0.4, 0.5, 0.6]
        E = [0.5, 0.5, 0.5, 0.5, 0.0]

        [stress.hypoxia]
        lambda = 1.2
        windows = [[10, 20]]

        [stress.metabolic]
        lambda = 0.85

        [[exchange]]
        from = "C1"
        to = "C2"
        rate = 0.2

        [[kinetics]]
        cell_type = "generic"
        ev_type = "exosome"
        rate = 2.0
    "#;

    #[test]
    fn test_builds_multi_agent_simulation() {
        let scenario = Scenario::from_toml_str(DEMO).unwrap();
        let multi = scenario.build_multi_agent().unwrap();

        assert_eq!(multi.cells().len(), 2);
        assert_eq!(multi.cell("C1").unwrap().fairy(), 0.3);
        assert_eq!(multi.cell("C2").unwrap().escrt(), 0.5);
        assert_eq!(multi.supervisor().active_scale(12).unwrap()["hypoxia"], 1.2);
        assert_eq!(multi.exchange().outgoing("C1").len(), 1);
        assert_eq!(
            multi.simulation().kinetics().unwrap().get("generic", EvType::Exosome),
            Some(2.0)
        );
    }

    #[test]
    fn test_window_without_lambda_fails() {
        let text = r#"
            [[cells]]
            id = "C1"
            I = [0.5, 0.5]

            [stress.thermal]
            windows = [[0, 5]]
        "#;
        let scenario = Scenario::from_toml_str(text).unwrap();
        assert!(scenario.build_simulation().unwrap_err().is_config());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let scenario = Scenario::from_toml_str(DEMO).unwrap();
        let multi = scenario.build_multi_agent().unwrap();

        let snapshot = Scenario::from_multi_agent(&multi);
        assert_eq!(snapshot, scenario);

        let reparsed = Scenario::from_toml_str(&snapshot.to_toml_string().unwrap()).unwrap();
        assert_eq!(reparsed, scenario);
    }

    #[test]
    fn test_out_of_range_cell_values_clamp() {
        let text = r#"
            [[cells]]
            id = "C1"
            I = [1.5, -0.5]
            S = 2.0
        "#;
        let cells = Scenario::from_toml_str(text).unwrap().build_cells().unwrap();
        assert_eq!(cells[0].internal(), &[1.0, 0.0]);
        assert_eq!(cells[0].escrt(), 1.0);
    }
}
