pub mod eval;
pub mod gateway;
pub mod memory;


pub use eval::{Datum, Evaluator, Record, Relation};
pub use gateway::{ExecutionGateway, ExecutionResult};
pub use memory::MemoryGateway;
