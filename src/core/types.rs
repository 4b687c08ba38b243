//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use crate::core::error::EvError;

/// Unique identifier for a cell within one simulation
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(pub String);

impl CellId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CellId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for CellId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for CellId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Integer simulation time used by stress windows
pub type Tick = i64;

/// Index of a simulation step; step `k` happens at time `k * dt`
pub type Step = u64;

/// Extracellular vesicle classes tracked by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvType {
    Exosome,
    Microvesicle,
    ApoptoticBody,
}

impl EvType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvType::Exosome => "exosome",
            EvType::Microvesicle => "microvesicle",
            EvType::ApoptoticBody => "apoptotic_body",
        }
    }
}

impl fmt::Display for EvType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvType {
    type Err = EvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exosome" | "exo" => Ok(EvType::Exosome),
            "microvesicle" | "mv" => Ok(EvType::Microvesicle),
            "apoptotic_body" | "apoptotic" => Ok(EvType::ApoptoticBody),
            other => Err(EvError::config(format!("unknown EV type '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_cell_id_lookup_by_str() {
        let mut map: HashMap<CellId, u32> = HashMap::new();
        map.insert(CellId::new("C1"), 7);
        assert_eq!(map.get("C1"), Some(&7));
        assert_eq!(map.get("C2"), None);
    }

    #[test]
    fn test_ev_type_parse() {
        assert_eq!("Exosome".parse::<EvType>().unwrap(), EvType::Exosome);
        assert_eq!(" mv ".parse::<EvType>().unwrap(), EvType::Microvesicle);
        assert!("vesicle".parse::<EvType>().unwrap_err().is_config());
    }

    #[test]
    fn test_ev_type_display_matches_serde() {
        for ev in [EvType::Exosome, EvType::Microvesicle, EvType::ApoptoticBody] {
            let json = serde_json::to_string(&ev).unwrap();
            assert_eq!(json, format!("\"{}\"", ev));
        }
    }
}
