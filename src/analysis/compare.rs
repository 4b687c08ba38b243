//! Align simulated rates against measured lab rates

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::types::{EvType, Step};
use crate::simulation::field::{Field, TimeSeries};

/// Agreement between a simulated and a measured series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// Steps present in both series
    pub steps: Vec<Step>,
    pub rmse: Option<f64>,
    /// Pearson correlation; `None` with fewer than two points or zero variance
    pub r: Option<f64>,
}

/// Root mean squared error of paired values; `None` for empty input
pub fn rmse(simulated: &[f64], measured: &[f64]) -> Option<f64> {
    let n = simulated.len().min(measured.len());
    if n == 0 {
        return None;
    }
    let sum_sq: f64 = simulated
        .iter()
        .zip(measured)
        .map(|(s, m)| (s - m) * (s - m))
        .sum();
    Some((sum_sq / n as f64).sqrt())
}

pub fn pearson_r(simulated: &[f64], measured: &[f64]) -> Option<f64> {
    let n = simulated.len().min(measured.len());
    if n < 2 {
        return None;
    }
    let mean_s = simulated[..n].iter().sum::<f64>() / n as f64;
    let mean_m = measured[..n].iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_s = 0.0;
    let mut var_m = 0.0;
    for (s, m) in simulated.iter().zip(measured) {
        let ds = s - mean_s;
        let dm = m - mean_m;
        cov += ds * dm;
        var_s += ds * ds;
        var_m += dm * dm;
    }
    if var_s <= 0.0 || var_m <= 0.0 {
        return None;
    }
    Some(cov / (var_s.sqrt() * var_m.sqrt()))
}

/// Compare two series on the steps they share
pub fn compare_series(simulated: &TimeSeries, measured: &BTreeMap<Step, f64>) -> Comparison {
    let steps: Vec<Step> = simulated
        .keys()
        .filter(|step| measured.contains_key(step))
        .copied()
        .collect();
    let sim: Vec<f64> = steps.iter().map(|s| simulated[s]).collect();
    let lab: Vec<f64> = steps.iter().map(|s| measured[s]).collect();

    Comparison {
        rmse: rmse(&sim, &lab),
        r: pearson_r(&sim, &lab),
        steps,
    }
}

/// Compare one EV type of a Field against measured rates
pub fn compare_field(field: &Field, ev_type: EvType, measured: &BTreeMap<Step, f64>) -> Comparison {
    match field.type_time_series().get(&ev_type) {
        Some(series) => compare_series(series, measured),
        None => compare_series(&TimeSeries::new(), measured),
    }
}

/// `name,value` rows for a set of named metrics
pub fn metrics_csv(metrics: &[(&str, f64)]) -> String {
    let mut out = String::from("metric,value\n");
    for (name, value) in metrics {
        out.push_str(&format!("{},{}\n", name, value));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rmse() {
        assert_eq!(rmse(&[1.0, 2.0], &[1.0, 2.0]), Some(0.0));
        assert_eq!(rmse(&[0.0, 0.0], &[3.0, 4.0]), Some((12.5f64).sqrt()));
        assert_eq!(rmse(&[], &[]), None);
    }

    #[test]
    fn test_pearson_perfect_correlation() {
        let r = pearson_r(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
        let r = pearson_r(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap();
        assert!((r + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_degenerate() {
        assert_eq!(pearson_r(&[1.0], &[1.0]), None);
        assert_eq!(pearson_r(&[1.0, 1.0], &[2.0, 3.0]), None);
    }

    #[test]
    fn test_compare_uses_shared_steps_only() {
        let sim = TimeSeries::from([(0, 1.0), (1, 2.0), (2, 3.0)]);
        let lab = BTreeMap::from([(1, 2.5), (2, 3.5), (9, 100.0)]);
        let cmp = compare_series(&sim, &lab);

        assert_eq!(cmp.steps, vec![1, 2]);
        assert!((cmp.rmse.unwrap() - 0.5).abs() < 1e-12);
        assert!((cmp.r.unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_metrics_csv() {
        let csv = metrics_csv(&[("rmse", 0.5), ("r", 1.0)]);
        assert_eq!(csv, "metric,value\nrmse,0.5\nr,1\n");
    }
}
