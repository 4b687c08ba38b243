//! Rate model: the multiplicative factors behind every production rate
//!
//! `rate = r_T * g_S * g_W * prod(lambda)`, clamped to be non-negative.
//! Both the time-stepping engine and the Explain-Why breakdown go through
//! these functions, so the two can never drift apart.

use crate::core::config::EngineConfig;
use crate::core::error::{EvError, Result};
use crate::entity::cell::CellAgent;
use crate::simulation::supervisor::ActiveScale;

/// Name of the multiplier contributed by received EVs
pub const PARACRINE_TERM: &str = "paracrine";

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// ESCRT gating `g_S = sigmoid(k * (S - midpoint))`, strictly increasing in `S`
pub fn gating_factor(escrt: f64, config: &EngineConfig) -> f64 {
    sigmoid(config.sigmoid_steepness * (escrt - config.sigmoid_midpoint))
}

/// Internal-state weighting `g_W`
///
/// Convex combination of energy and inverted stress, damped by `ghost`
/// and boosted by `fairy`. Never negative.
pub fn weighting_factor(cell: &CellAgent, config: &EngineConfig) -> Result<f64> {
    let energy = cell.internal_at(config.energy_index).ok_or_else(|| {
        EvError::config(format!(
            "cell {} has no energy component at I[{}]",
            cell.cell_id(),
            config.energy_index
        ))
    })?;
    let stress = cell.internal_at(config.stress_index).ok_or_else(|| {
        EvError::config(format!(
            "cell {} has no stress component at I[{}]",
            cell.cell_id(),
            config.stress_index
        ))
    })?;

    let base = config.energy_weight * energy + config.stress_weight * (1.0 - stress);
    let damping = 1.0 - config.ghost_damping * cell.ghost();
    let boost = 1.0 + config.fairy_boost * cell.fairy();
    let g_w = base * damping * boost;
    if g_w.is_nan() {
        return Err(EvError::domain(format!(
            "g_W is NaN for cell {}",
            cell.cell_id()
        )));
    }
    Ok(g_w.max(0.0))
}

/// Product of all active multipliers; 1 when nothing is active
pub fn stress_product(scale: &ActiveScale) -> f64 {
    scale.values().product()
}

/// Multiplier from EVs received through exchange, if the gain is enabled
pub fn paracrine_multiplier(cell: &CellAgent, config: &EngineConfig) -> Option<f64> {
    if config.paracrine_gain <= 0.0 {
        return None;
    }
    let received = cell.environment_at(config.received_index).unwrap_or(0.0);
    Some(1.0 + config.paracrine_gain * received)
}

/// Supervisor scale plus the cell's own paracrine multiplier
pub fn cell_scale(supervisor_scale: &ActiveScale, cell: &CellAgent, config: &EngineConfig) -> ActiveScale {
    let mut scale = supervisor_scale.clone();
    if let Some(lambda) = paracrine_multiplier(cell, config) {
        scale.insert(PARACRINE_TERM.to_string(), lambda);
    }
    scale
}

/// The factors of one production rate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateFactors {
    pub baseline: f64,
    pub gating: f64,
    pub weighting: f64,
    pub stress: f64,
}

impl RateFactors {
    pub fn compute(
        cell: &CellAgent,
        scale: &ActiveScale,
        baseline: f64,
        config: &EngineConfig,
    ) -> Result<Self> {
        Ok(Self {
            baseline,
            gating: gating_factor(cell.escrt(), config),
            weighting: weighting_factor(cell, config)?,
            stress: stress_product(scale),
        })
    }

    /// `r_T * g_S * g_W * prod(lambda)`, never negative
    ///
    /// NaN (e.g. an overflowed stress product times a zero `g_W`) is a
    /// domain error rather than a zero rate.
    pub fn rate(&self) -> Result<f64> {
        let rate = self.baseline * self.gating * self.weighting * self.stress;
        if rate.is_nan() {
            return Err(EvError::domain(format!(
                "rate is NaN (r_T = {}, g_S = {}, g_W = {}, stress = {})",
                self.baseline, self.gating, self.weighting, self.stress
            )));
        }
        Ok(rate.max(0.0))
    }
}

/// Compute one production rate, failing on non-finite results
pub fn production_rate(
    cell: &CellAgent,
    scale: &ActiveScale,
    baseline: f64,
    config: &EngineConfig,
) -> Result<f64> {
    let rate = RateFactors::compute(cell, scale, baseline, config)?.rate()?;
    if !rate.is_finite() {
        return Err(EvError::domain(format!(
            "non-finite rate {} for cell {}",
            rate,
            cell.cell_id()
        )));
    }
    Ok(rate)
}
