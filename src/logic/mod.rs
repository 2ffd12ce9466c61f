pub mod accumulator;
pub mod assembler;
pub mod batch_fetch;
pub mod expand;
pub mod natural_order;
pub mod pending;
pub mod resolver;

pub use accumulator::*;
pub use assembler::*;
pub use batch_fetch::{fetch_all, plan, AgentBatch, FetchOutcome};
pub use expand::*;
pub use natural_order::*;
pub use pending::*;
pub use resolver::*;
