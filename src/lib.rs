//! EVelution - extracellular vesicle secretion kinetics
//!
//! Cells secrete EVs at `rate = r_T * g_S * g_W * prod(lambda)` per step.
//! A supervisor switches stress multipliers on and off over time, an
//! optional exchange graph moves output between cells, and every rate can
//! be decomposed into named log-terms (Explain-Why).

pub mod analysis;
pub mod core;
pub mod entity;
pub mod scenario;
pub mod simulation;

pub use crate::analysis::explain::{contribution_breakdown, Breakdown};
pub use crate::core::{CellId, EngineConfig, EvError, EvType, Result};
pub use crate::entity::{CellAgent, CellPatch};
pub use crate::scenario::Scenario;
pub use crate::simulation::{
    EvExchangeGraph, ExchangeEdge, Field, MultiAgentSimulation, Simulation, Supervisor,
};
