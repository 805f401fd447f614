pub mod aggregate;
pub mod ast;
pub mod builders;
pub mod errors;
pub mod exec;
pub mod planner;
pub mod types;

pub use errors::*;
