use clap::ValueEnum;
use serde::Serialize;
use std::cmp::Ordering;

use super::breakdown::OpponentBreakdown;
use super::play_stats::SubjectSummary;

/// Columns a summary table can be sorted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortColumn {
    Name,
    Plays,
    Wins,
    WinRate,
    LastPlayed,
}

impl SortColumn {
    pub const ALL: [SortColumn; 5] = [
        SortColumn::Name,
        SortColumn::Plays,
        SortColumn::Wins,
        SortColumn::WinRate,
        SortColumn::LastPlayed,
    ];

    pub fn index(self) -> usize {
        match self {
            SortColumn::Name => 0,
            SortColumn::Plays => 1,
            SortColumn::Wins => 2,
            SortColumn::WinRate => 3,
            SortColumn::LastPlayed => 4,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Sort column and direction of one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortState {
    pub column: SortColumn,
    pub ascending: bool,
}

impl Default for SortState {
    fn default() -> Self {
        SortState {
            column: SortColumn::Plays,
            ascending: false,
        }
    }
}

impl SortState {
    /// A click on a column header: same column flips direction, a new column
    /// starts descending.
    pub fn activate(&mut self, column: SortColumn) {
        if column == self.column {
            self.ascending = !self.ascending;
        } else {
            self.column = column;
            self.ascending = false;
        }
    }
}

/// Anything with the columns of a summary table.
pub trait SortableRow {
    fn name(&self) -> &str;
    fn plays(&self) -> u32;
    fn wins(&self) -> u32;
    fn win_rate(&self) -> f64;
    fn last_played(&self) -> i64;
}

impl SortableRow for SubjectSummary {
    fn name(&self) -> &str {
        SubjectSummary::name(self)
    }

    fn plays(&self) -> u32 {
        SubjectSummary::plays(self)
    }

    fn wins(&self) -> u32 {
        SubjectSummary::wins(self)
    }

    fn win_rate(&self) -> f64 {
        SubjectSummary::win_rate(self)
    }

    fn last_played(&self) -> i64 {
        SubjectSummary::last_played(self)
    }
}

impl SortableRow for OpponentBreakdown {
    fn name(&self) -> &str {
        &self.opponent
    }

    fn plays(&self) -> u32 {
        self.plays
    }

    fn wins(&self) -> u32 {
        self.wins
    }

    fn win_rate(&self) -> f64 {
        self.win_rate
    }

    fn last_played(&self) -> i64 {
        0
    }
}

/// Returns `rows` ordered by `state`, leaving the input untouched.
///
/// The sort is stable in both directions. Rows whose key can't be compared
/// (a NaN win rate) always end up last.
pub fn sort<T: SortableRow + Clone>(rows: &[T], state: SortState) -> Vec<T> {
    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| compare(a, b, state));
    sorted
}

pub fn compare<T: SortableRow>(a: &T, b: &T, state: SortState) -> Ordering {
    match (is_invalid(a, state.column), is_invalid(b, state.column)) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let natural = natural_order(a, b, state.column);
            if state.ascending {
                natural
            } else {
                natural.reverse()
            }
        }
    }
}

fn is_invalid<T: SortableRow>(row: &T, column: SortColumn) -> bool {
    match column {
        SortColumn::WinRate => row.win_rate().is_nan(),
        _ => false,
    }
}

fn natural_order<T: SortableRow>(a: &T, b: &T, column: SortColumn) -> Ordering {
    match column {
        SortColumn::Name => a.name().to_lowercase().cmp(&b.name().to_lowercase()),
        SortColumn::Plays => a.plays().cmp(&b.plays()),
        SortColumn::Wins => a.wins().cmp(&b.wins()),
        SortColumn::WinRate => a
            .win_rate()
            .partial_cmp(&b.win_rate())
            .unwrap_or(Ordering::Equal),
        // missing dates (0) sort as the earliest
        SortColumn::LastPlayed => a.last_played().max(0).cmp(&b.last_played().max(0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::play_stats::aggregate;
    use crate::analysis::play_stats::tests::scenario_a;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn names<T: SortableRow>(rows: &[T]) -> Vec<String> {
        rows.iter().map(|r| r.name().to_string()).collect()
    }

    fn state(column: SortColumn, ascending: bool) -> SortState {
        SortState { column, ascending }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct RawRow {
        name: String,
        rate: f64,
    }

    impl SortableRow for RawRow {
        fn name(&self) -> &str {
            &self.name
        }
        fn plays(&self) -> u32 {
            0
        }
        fn wins(&self) -> u32 {
            0
        }
        fn win_rate(&self) -> f64 {
            self.rate
        }
        fn last_played(&self) -> i64 {
            0
        }
    }

    fn arb_summaries() -> impl Strategy<Value = Vec<SubjectSummary>> {
        prop::collection::vec((0u32..6, 0u32..6, 0i64..4), 0..25).prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (plays, wins, day))| {
                    SubjectSummary::from_counts(format!("S{}", i), plays, wins, day * 86_400_000)
                })
                .collect()
        })
    }

    fn arb_column() -> impl Strategy<Value = SortColumn> {
        (0usize..5).prop_map(|i| SortColumn::from_index(i).unwrap())
    }

    fn key(row: &SubjectSummary, column: SortColumn) -> String {
        match column {
            SortColumn::Name => row.name().to_lowercase(),
            SortColumn::Plays => row.plays().to_string(),
            SortColumn::Wins => row.wins().to_string(),
            SortColumn::WinRate => row.win_rate().to_string(),
            SortColumn::LastPlayed => row.last_played().to_string(),
        }
    }

    #[test]
    fn scenario_a_orderings() {
        let heroes = aggregate(&scenario_a()).heroes;

        assert_eq!(names(&sort(&heroes, state(SortColumn::Plays, false))), vec!["A", "B"]);
        assert_eq!(names(&sort(&heroes, state(SortColumn::Name, true))), vec!["A", "B"]);
        assert_eq!(names(&sort(&heroes, state(SortColumn::WinRate, false))), vec!["B", "A"]);
    }

    #[test]
    fn sort_leaves_input_untouched() {
        let heroes = aggregate(&scenario_a()).heroes;
        let before = heroes.clone();
        let _ = sort(&heroes, state(SortColumn::WinRate, false));
        assert_eq!(heroes, before);
    }

    #[test]
    fn name_sort_ignores_case() {
        let rows = vec![
            SubjectSummary::from_counts("gamora", 1, 0, 0),
            SubjectSummary::from_counts("Black Panther", 1, 0, 0),
            SubjectSummary::from_counts("Drax", 1, 0, 0),
        ];

        assert_eq!(
            names(&sort(&rows, state(SortColumn::Name, true))),
            vec!["Black Panther", "Drax", "gamora"]
        );
    }

    #[test]
    fn missing_dates_sort_earliest() {
        let rows = vec![
            SubjectSummary::from_counts("undated", 1, 0, 0),
            SubjectSummary::from_counts("recent", 1, 0, 2_000),
            SubjectSummary::from_counts("old", 1, 0, 1_000),
        ];

        assert_eq!(
            names(&sort(&rows, state(SortColumn::LastPlayed, true))),
            vec!["undated", "old", "recent"]
        );
        assert_eq!(
            names(&sort(&rows, state(SortColumn::LastPlayed, false))),
            vec!["recent", "old", "undated"]
        );
    }

    #[test]
    fn nan_rates_always_sort_last() {
        let row = |name: &str, rate: f64| RawRow {
            name: name.to_string(),
            rate,
        };
        let rows = vec![row("nan-1", f64::NAN), row("low", 10.0), row("nan-2", f64::NAN), row("high", 90.0)];

        assert_eq!(
            names(&sort(&rows, state(SortColumn::WinRate, true))),
            vec!["low", "high", "nan-1", "nan-2"]
        );
        assert_eq!(
            names(&sort(&rows, state(SortColumn::WinRate, false))),
            vec!["high", "low", "nan-1", "nan-2"]
        );
    }

    #[test]
    fn breakdown_rows_are_sortable() {
        let rows = crate::analysis::breakdown::opponent_breakdown(
            "A",
            crate::analysis::play_stats::Side::Hero,
            &scenario_a(),
        );
        assert_eq!(names(&sort(&rows, state(SortColumn::Name, false))), vec!["Y", "X"]);
    }

    #[test]
    fn default_state_is_plays_descending() {
        assert_eq!(SortState::default(), state(SortColumn::Plays, false));
    }

    #[test]
    fn activating_same_column_flips_direction() {
        let mut s = SortState::default();
        s.activate(SortColumn::Plays);
        assert_eq!(s, state(SortColumn::Plays, true));
        s.activate(SortColumn::Plays);
        assert_eq!(s, state(SortColumn::Plays, false));
    }

    #[test]
    fn activating_new_column_resets_to_descending() {
        let mut s = SortState::default();
        s.activate(SortColumn::Name);
        s.activate(SortColumn::Name);
        assert_eq!(s, state(SortColumn::Name, true));

        s.activate(SortColumn::WinRate);
        assert_eq!(s, state(SortColumn::WinRate, false));
    }

    #[test]
    fn column_indices_round_trip() {
        for column in SortColumn::ALL {
            assert_eq!(SortColumn::from_index(column.index()), Some(column));
        }
        assert_eq!(SortColumn::from_index(5), None);
    }

    proptest! {
        /// Sorting an already sorted table changes nothing.
        #[test]
        fn prop_sort_idempotent(rows in arb_summaries(), column in arb_column(), ascending in any::<bool>()) {
            let s = state(column, ascending);
            let once = sort(&rows, s);
            let twice = sort(&once, s);
            prop_assert_eq!(once, twice);
        }

        /// Without ties, ascending is descending reversed.
        #[test]
        fn prop_direction_inverse_without_ties(
            plays in prop::collection::hash_set(0u32..1000, 0..20)
        ) {
            let rows: Vec<SubjectSummary> = plays
                .into_iter()
                .enumerate()
                .map(|(i, p)| SubjectSummary::from_counts(format!("S{}", i), p, 0, 0))
                .collect();

            let asc = sort(&rows, state(SortColumn::Plays, true));
            let mut desc = sort(&rows, state(SortColumn::Plays, false));
            desc.reverse();
            prop_assert_eq!(asc, desc);
        }

        /// Tied rows keep their input order in both directions.
        #[test]
        fn prop_ties_keep_input_order(rows in arb_summaries(), column in arb_column(), ascending in any::<bool>()) {
            let position: HashMap<String, usize> = rows
                .iter()
                .enumerate()
                .map(|(i, r)| (r.name().to_string(), i))
                .collect();

            let sorted = sort(&rows, state(column, ascending));
            for pair in sorted.windows(2) {
                if key(&pair[0], column) == key(&pair[1], column) {
                    prop_assert!(position[pair[0].name()] < position[pair[1].name()]);
                }
            }
        }
    }
}
