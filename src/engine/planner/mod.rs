pub mod eligibility;
pub mod query_plan;


pub use eligibility::{
    ROLLUP_BREAKDOWNS, allowed_property_keys, decide, evaluate, supported_metrics,
};
pub use query_plan::{QueryPlan, RoutingDecision, RoutingReason};
