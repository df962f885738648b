pub mod breakdown;
pub mod play_stats;
pub mod sorting;

pub use breakdown::{opponent_breakdown, BreakdownCache, OpponentBreakdown};
pub use play_stats::{
    aggregate, Aggregate, Difficulty, OverallRecord, Side, StatsAggregator, SubjectSummary,
    WinRateClass,
};
pub use sorting::{sort, SortColumn, SortState, SortableRow};
