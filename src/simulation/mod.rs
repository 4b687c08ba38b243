pub mod batch;
pub mod engine;
pub mod exchange;
pub mod field;
pub mod kinetics;
pub mod model;
pub mod multi_agent;
pub mod rates;
pub mod story;
pub mod supervisor;

pub use batch::run_many;
pub use engine::{Simulation, StepProduction};
pub use exchange::{EvExchangeGraph, ExchangeEdge};
pub use field::Field;
pub use kinetics::{KineticsEntry, KineticsTable};
pub use model::SecretionModel;
pub use multi_agent::{CellExchange, ExchangeLedger, MultiAgentSimulation};
pub use rates::RateFactors;
pub use story::{run_story, StoryReport, StoryStep};
pub use supervisor::{ActiveScale, StressWindow, Supervisor};
