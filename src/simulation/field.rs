//! Field - time series produced by a simulation run
//!
//! Keyed lookup tables: EV type -> step -> aggregate rate, and
//! EV type -> protein -> step -> aggregate protein-weighted rate.
//! Only the engine appends; callers get read access once a run returns.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::error::Result;
use crate::core::types::{EvType, Step};

pub type TimeSeries = BTreeMap<Step, f64>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Field {
    dt: f64,
    type_time_series: BTreeMap<EvType, TimeSeries>,
    protein_time_series: BTreeMap<EvType, BTreeMap<String, TimeSeries>>,
}

impl Field {
    pub(crate) fn new(dt: f64) -> Self {
        Self {
            dt,
            ..Self::default()
        }
    }

    /// Make sure `step` has an entry for `ev_type`, even with no producing cell
    pub(crate) fn open_step(&mut self, ev_type: EvType, step: Step) {
        self.type_time_series
            .entry(ev_type)
            .or_default()
            .entry(step)
            .or_insert(0.0);
    }

    /// Add one cell's rate (and its protein-weighted rates) to the aggregates
    pub(crate) fn accumulate(
        &mut self,
        ev_type: EvType,
        step: Step,
        rate: f64,
        proteins: &BTreeMap<String, f64>,
    ) {
        *self
            .type_time_series
            .entry(ev_type)
            .or_default()
            .entry(step)
            .or_insert(0.0) += rate;

        let by_protein = self.protein_time_series.entry(ev_type).or_default();
        for (protein, level) in proteins {
            *by_protein
                .entry(protein.clone())
                .or_default()
                .entry(step)
                .or_insert(0.0) += rate * level;
        }
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Simulation time of a step
    pub fn time_of(&self, step: Step) -> f64 {
        step as f64 * self.dt
    }

    pub fn type_time_series(&self) -> &BTreeMap<EvType, TimeSeries> {
        &self.type_time_series
    }

    pub fn protein_time_series(&self) -> &BTreeMap<EvType, BTreeMap<String, TimeSeries>> {
        &self.protein_time_series
    }

    pub fn ev_types(&self) -> impl Iterator<Item = EvType> + '_ {
        self.type_time_series.keys().copied()
    }

    pub fn steps(&self) -> Vec<Step> {
        let mut steps: Vec<Step> = self
            .type_time_series
            .values()
            .flat_map(|series| series.keys().copied())
            .collect();
        steps.sort_unstable();
        steps.dedup();
        steps
    }

    pub fn rate(&self, ev_type: EvType, step: Step) -> Option<f64> {
        self.type_time_series.get(&ev_type)?.get(&step).copied()
    }

    pub fn protein_rate(&self, ev_type: EvType, protein: &str, step: Step) -> Option<f64> {
        self.protein_time_series
            .get(&ev_type)?
            .get(protein)?
            .get(&step)
            .copied()
    }

    /// Sum over EV types at one step
    pub fn total_at(&self, step: Step) -> f64 {
        self.type_time_series
            .values()
            .filter_map(|series| series.get(&step))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.type_time_series.is_empty()
    }

    // === EXPORT ===

    /// `ev_type,step,time,rate` rows ordered by EV type then step
    pub fn type_series_csv(&self) -> String {
        let mut out = String::from("ev_type,step,time,rate\n");
        for (ev_type, series) in &self.type_time_series {
            for (step, rate) in series {
                out.push_str(&format!(
                    "{},{},{},{}\n",
                    ev_type,
                    step,
                    self.time_of(*step),
                    rate
                ));
            }
        }
        out
    }

    /// `ev_type,protein,step,time,rate` rows ordered by EV type, protein, step
    pub fn protein_series_csv(&self) -> String {
        let mut out = String::from("ev_type,protein,step,time,rate\n");
        for (ev_type, by_protein) in &self.protein_time_series {
            for (protein, series) in by_protein {
                for (step, rate) in series {
                    out.push_str(&format!(
                        "{},{},{},{},{}\n",
                        ev_type,
                        protein,
                        step,
                        self.time_of(*step),
                        rate
                    ));
                }
            }
        }
        out
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
