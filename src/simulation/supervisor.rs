//! Stress supervisor
//!
//! Holds named stress windows and their multipliers and answers which
//! multipliers are active at a given integer time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::error::{EvError, Result};
use crate::core::types::Tick;

/// Stress name -> multiplier for every stress active at some time
///
/// Ordered by name so products over it are reproducible bit-for-bit.
pub type ActiveScale = BTreeMap<String, f64>;

/// Closed-open time range `[start, stop)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StressWindow {
    pub start: Tick,
    pub stop: Tick,
}

impl StressWindow {
    pub fn new(start: Tick, stop: Tick) -> Result<Self> {
        if start >= stop {
            return Err(EvError::config(format!(
                "stress window [{}, {}) is empty",
                start, stop
            )));
        }
        Ok(Self { start, stop })
    }

    pub fn contains(&self, t: Tick) -> bool {
        self.start <= t && t < self.stop
    }
}

/// Environmental stress schedule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Supervisor {
    stress_windows: BTreeMap<String, Vec<StressWindow>>,
    lambdas: BTreeMap<String, f64>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of `set_lambda` + `add_window` for every window
    pub fn with_stress(
        mut self,
        name: impl Into<String>,
        lambda: f64,
        windows: &[(Tick, Tick)],
    ) -> Result<Self> {
        let name = name.into();
        self.set_lambda(&name, lambda)?;
        for &(start, stop) in windows {
            self.add_window(&name, StressWindow::new(start, stop)?);
        }
        Ok(self)
    }

    pub fn stress_windows(&self) -> &BTreeMap<String, Vec<StressWindow>> {
        &self.stress_windows
    }

    pub fn lambdas(&self) -> &BTreeMap<String, f64> {
        &self.lambdas
    }

    /// Check a multiplier without storing it
    pub fn check_lambda(name: &str, lambda: f64) -> Result<()> {
        if !lambda.is_finite() || lambda <= 0.0 {
            return Err(EvError::config(format!(
                "multiplier for stress '{}' must be positive, got {}",
                name, lambda
            )));
        }
        Ok(())
    }

    /// Set the multiplier applied while `name` is active
    pub fn set_lambda(&mut self, name: &str, lambda: f64) -> Result<()> {
        Self::check_lambda(name, lambda)?;
        self.lambdas.insert(name.to_string(), lambda);
        Ok(())
    }

    pub fn add_window(&mut self, name: &str, window: StressWindow) {
        self.stress_windows
            .entry(name.to_string())
            .or_default()
            .push(window);
    }

    /// Drop a stress together with its windows and multiplier
    pub fn remove_stress(&mut self, name: &str) {
        self.stress_windows.remove(name);
        self.lambdas.remove(name);
    }

    /// Check that every stress with windows has a multiplier
    ///
    /// Also re-checks windows and multipliers, since a deserialized
    /// supervisor never went through `StressWindow::new` or `set_lambda`.
    pub fn validate(&self) -> Result<()> {
        for (name, lambda) in &self.lambdas {
            Self::check_lambda(name, *lambda)?;
        }
        for (name, windows) in &self.stress_windows {
            if !self.lambdas.contains_key(name) {
                return Err(EvError::config(format!(
                    "stress '{}' has windows but no multiplier",
                    name
                )));
            }
            for window in windows {
                StressWindow::new(window.start, window.stop)?;
            }
        }
        Ok(())
    }

    /// Multipliers of every stress whose windows contain `t`
    ///
    /// Overlapping windows of the same stress count once. Inactive stresses
    /// are absent, which is equivalent to a multiplier of 1.
    pub fn active_scale(&self, t: Tick) -> Result<ActiveScale> {
        let mut scale = ActiveScale::new();
        for (name, windows) in &self.stress_windows {
            let lambda = self.lambdas.get(name).ok_or_else(|| {
                EvError::config(format!("stress '{}' has windows but no multiplier", name))
            })?;
            if windows.iter().any(|w| w.contains(t)) {
                scale.insert(name.clone(), *lambda);
            }
        }
        Ok(scale)
    }
}
