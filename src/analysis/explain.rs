//! Explain-Why: additive decomposition of `log(rate)`
//!
//! `log r = log r_T + log g_S + log g_W + sum_s log lambda_s`
//!
//! Factors are recomputed through the same functions the engine uses, so the
//! terms always sum to the log of the rate the engine would record.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::core::config::EngineConfig;
use crate::core::error::{EvError, Result};
use crate::core::types::{CellId, EvType};
use crate::entity::cell::CellAgent;
use crate::simulation::rates::RateFactors;
use crate::simulation::supervisor::ActiveScale;

pub const BASELINE_TERM: &str = "log r_T";
pub const GATING_TERM: &str = "log g_S";
pub const WEIGHTING_TERM: &str = "log g_W";

/// Term name for one active stress
pub fn stress_term(name: &str) -> String {
    format!("log λ({})", name)
}

/// Named log-terms of one rate, in a fixed order: baseline, gating,
/// weighting, then one term per active stress by name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown {
    pub cell_id: CellId,
    pub ev_type: EvType,
    #[serde(serialize_with = "serialize_terms")]
    pub terms: Vec<(String, f64)>,
}

fn serialize_terms<S: Serializer>(terms: &[(String, f64)], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(terms.len()))?;
    for (name, value) in terms {
        map.serialize_entry(name, value)?;
    }
    map.end()
}

impl Breakdown {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.terms
            .iter()
            .find(|(term, _)| term == name)
            .map(|(_, value)| *value)
    }

    /// Sum of all terms, i.e. `log(rate)`
    pub fn total(&self) -> f64 {
        self.terms.iter().map(|(_, value)| value).sum()
    }

    /// The rate the terms describe
    pub fn rate(&self) -> f64 {
        self.total().exp()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn log_term(name: &str, value: f64) -> Result<(String, f64)> {
    if value.is_nan() || value <= 0.0 || value.is_infinite() {
        return Err(EvError::domain(format!(
            "{} undefined: factor is {}",
            name, value
        )));
    }
    Ok((name.to_string(), value.ln()))
}

/// Decompose the rate of `cell` under `active_scale` with baseline `r_t`
///
/// Fails with a domain error when any factor is non-positive, since its
/// logarithm does not exist.
pub fn contribution_breakdown(
    cell: &CellAgent,
    active_scale: &ActiveScale,
    r_t: f64,
    ev_type: EvType,
    config: &EngineConfig,
) -> Result<Breakdown> {
    let factors = RateFactors::compute(cell, active_scale, r_t, config)?;

    let mut terms = Vec::with_capacity(3 + active_scale.len());
    terms.push(log_term(BASELINE_TERM, factors.baseline)?);
    terms.push(log_term(GATING_TERM, factors.gating)?);
    terms.push(log_term(WEIGHTING_TERM, factors.weighting)?);
    for (name, lambda) in active_scale {
        terms.push(log_term(&stress_term(name), *lambda)?);
    }

    Ok(Breakdown {
        cell_id: cell.cell_id().clone(),
        ev_type,
        terms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::rates::production_rate;

    fn cell() -> CellAgent {
        CellAgent::new("C1", "generic")
            .with_internal(vec![0.6, 0.5, 0.4, 0.5, 0.6])
            .unwrap()
            .with_escrt(0.6)
            .unwrap()
            .with_modifiers(0.1, 0.3)
            .unwrap()
    }

    fn scale() -> ActiveScale {
        ActiveScale::from([("hypoxia".to_string(), 1.2), ("oxidative".to_string(), 0.9)])
    }

    #[test]
    fn test_terms_sum_to_log_rate() {
        let config = EngineConfig::default();
        let breakdown = contribution_breakdown(&cell(), &scale(), 2.0, EvType::Exosome, &config).unwrap();
        let rate = production_rate(&cell(), &scale(), 2.0, &config).unwrap();

        assert!((breakdown.total() - rate.ln()).abs() < 1e-12);
        assert!((breakdown.rate() - rate).abs() / rate < 1e-9);
    }

    #[test]
    fn test_one_term_per_stress() {
        let config = EngineConfig::default();
        let breakdown = contribution_breakdown(&cell(), &scale(), 1.0, EvType::Exosome, &config).unwrap();

        let names: Vec<&str> = breakdown.terms.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec!["log r_T", "log g_S", "log g_W", "log λ(hypoxia)", "log λ(oxidative)"]
        );
        assert_eq!(breakdown.get(BASELINE_TERM), Some(0.0));
        assert!((breakdown.get(&stress_term("oxidative")).unwrap() - 0.9f64.ln()).abs() < 1e-15);
    }

    #[test]
    fn test_non_positive_baseline_is_domain_error() {
        let config = EngineConfig::default();
        let err = contribution_breakdown(&cell(), &ActiveScale::new(), 0.0, EvType::Exosome, &config).unwrap_err();
        assert!(err.is_domain());
    }

    #[test]
    fn test_zero_weighting_is_domain_error() {
        let config = EngineConfig {
            ghost_damping: 1.0,
            ..EngineConfig::default()
        };
        let mut damaged = cell();
        damaged.set_ghost(1.0).unwrap();
        let err = contribution_breakdown(&damaged, &ActiveScale::new(), 1.0, EvType::Exosome, &config).unwrap_err();
        assert!(err.is_domain());
    }

    #[test]
    fn test_json_keeps_term_order() {
        let config = EngineConfig::default();
        let breakdown = contribution_breakdown(&cell(), &scale(), 1.0, EvType::Exosome, &config).unwrap();
        let json = breakdown.to_json().unwrap();
        let baseline_pos = json.find("log r_T").unwrap();
        let stress_pos = json.find("log λ(hypoxia)").unwrap();
        assert!(baseline_pos < stress_pos);
        assert!(json.contains("\"ev_type\": \"exosome\""));
    }
}
