//! EV exchange graph
//!
//! Directed, weighted edges describing which fraction of a cell's per-step
//! output is transferred to another cell. Validated on construction and
//! read-only afterwards.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{EvError, Result};
use crate::core::types::CellId;

/// Fraction `rate` of `from`'s output redirected to `to`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeEdge {
    pub from: CellId,
    pub to: CellId,
    pub rate: f64,
}

impl ExchangeEdge {
    pub fn new(from: impl Into<CellId>, to: impl Into<CellId>, rate: f64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            rate,
        }
    }
}

/// Validated exchange graph with deterministic edge order
///
/// Application order: sources in order of first appearance in the edge
/// list, then each source's edges in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvExchangeGraph {
    edges: Vec<ExchangeEdge>,
    sources: Vec<CellId>,
    outgoing: AHashMap<CellId, Vec<(CellId, f64)>>,
}

impl EvExchangeGraph {
    /// Graph with no edges: multi-agent runs then match single-agent runs
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(edges: Vec<ExchangeEdge>) -> Result<Self> {
        let mut sources: Vec<CellId> = Vec::new();
        let mut outgoing: AHashMap<CellId, Vec<(CellId, f64)>> = AHashMap::new();

        for edge in &edges {
            if edge.from == edge.to {
                return Err(EvError::config(format!(
                    "self-loop exchange edge on cell {}",
                    edge.from
                )));
            }
            if !(0.0..=1.0).contains(&edge.rate) {
                return Err(EvError::config(format!(
                    "exchange rate {} -> {} must lie in [0, 1], got {}",
                    edge.from, edge.to, edge.rate
                )));
            }
            let targets = outgoing.entry(edge.from.clone()).or_insert_with(|| {
                sources.push(edge.from.clone());
                Vec::new()
            });
            targets.push((edge.to.clone(), edge.rate));
        }

        for (source, targets) in &outgoing {
            let total: f64 = targets.iter().map(|(_, rate)| rate).sum();
            if total > 1.0 + 1e-12 {
                return Err(EvError::config(format!(
                    "cell {} exports {} of its output, more than all of it",
                    source, total
                )));
            }
        }

        Ok(Self {
            edges,
            sources,
            outgoing,
        })
    }

    /// Outgoing `(to, rate)` pairs of a cell, in insertion order
    pub fn outgoing(&self, from: &str) -> &[(CellId, f64)] {
        self.outgoing.get(from).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sources in order of first appearance
    pub fn sources(&self) -> &[CellId] {
        &self.sources
    }

    /// Edges exactly as given at construction
    pub fn edges(&self) -> &[ExchangeEdge] {
        &self.edges
    }

    /// Every edge in application order
    pub fn ordered_edges(&self) -> impl Iterator<Item = (&CellId, &CellId, f64)> + '_ {
        self.sources.iter().flat_map(move |from| {
            self.outgoing(from.as_str())
                .iter()
                .map(move |(to, rate)| (from, to, *rate))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Every cell id named by an edge
    pub fn cell_ids(&self) -> impl Iterator<Item = &CellId> + '_ {
        self.edges.iter().flat_map(|e| [&e.from, &e.to])
    }
}
