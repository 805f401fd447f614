pub mod handlers;
pub mod types;

pub use handlers::query::{QueryExecutionPipeline, WebStatsHandler};
pub use types::WebQuery;
