mod global;
mod model;


pub use global::CONFIG;
pub use model::{
    LoggingConfig, QueryConfig, Settings, WeekStart, ZeroDenominatorPolicy, load_settings,
};
