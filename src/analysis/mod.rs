pub mod compare;
pub mod explain;

pub use compare::{compare_field, compare_series, metrics_csv, pearson_r, rmse, Comparison};
pub use explain::{contribution_breakdown, Breakdown};
