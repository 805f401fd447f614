mod handler;
mod orchestrator;

#[cfg(test)]
mod orchestrator_test;

pub use handler::{QueryExplanation, WebStatsHandler};
pub use orchestrator::QueryExecutionPipeline;
