pub mod ranking;
pub mod view;

pub use ranking::{AggregationResult, EndDate, RankingEntry, TimeWindow};
pub use view::View;
