pub mod assembler;
pub mod pagination;
pub mod types;


pub use assembler::{MetricColumn, change_from_previous, check_shape, normalize, split_pair};
pub use pagination::{Page, next_link};
pub use types::{
    BreakdownResponse, CellValue, ItemKind, OverviewItem, OverviewResponse, TrendPoint,
    TrendsResponse, WebStatsResponse,
};
