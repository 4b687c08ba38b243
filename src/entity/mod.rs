pub mod cell;

pub use cell::{CellAgent, CellPatch};
