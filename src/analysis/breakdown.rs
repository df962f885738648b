use crate::api::models::PlayRecord;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use super::play_stats::{win_rate, Side, TallyBook};

/// One row of a subject's record against a single opponent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpponentBreakdown {
    pub opponent: String,
    pub plays: u32,
    /// Hero victories, whichever side the breakdown is for.
    pub wins: u32,
    pub win_rate: f64,
}

impl OpponentBreakdown {
    pub fn losses(&self) -> u32 {
        self.plays - self.wins
    }
}

/// Groups the plays of `subject` on `side` by the opposing side's name.
///
/// Rows are ordered by plays, most first; ties keep first-seen order.
/// Plays with no opponent recorded are left out.
pub fn opponent_breakdown(subject: &str, side: Side, records: &[PlayRecord]) -> Vec<OpponentBreakdown> {
    let mut book = TallyBook::default();

    for record in records.iter().filter(|r| side.name_of(r) == Some(subject)) {
        if let Some(opponent) = side.opposite().name_of(record) {
            book.add(opponent, record.win, None);
        }
    }

    let mut rows: Vec<OpponentBreakdown> = book
        .into_tallies()
        .into_iter()
        .map(|t| OpponentBreakdown {
            win_rate: win_rate(t.wins, t.plays),
            opponent: t.name,
            plays: t.plays,
            wins: t.wins,
        })
        .collect();

    rows.sort_by(|a, b| b.plays.cmp(&a.plays));
    rows
}

/// Breakdowns keyed by `(side, subject)`, valid for one result-set generation.
#[derive(Debug, Default)]
pub struct BreakdownCache {
    generation: u64,
    entries: HashMap<(Side, String), Vec<OpponentBreakdown>>,
}

impl BreakdownCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute(
        &mut self,
        generation: u64,
        side: Side,
        subject: &str,
        records: &[PlayRecord],
    ) -> &[OpponentBreakdown] {
        if generation != self.generation {
            self.invalidate();
            self.generation = generation;
        }

        self.entries
            .entry((side, subject.to_string()))
            .or_insert_with(|| {
                debug!(%side, subject, generation, "computing opponent breakdown");
                opponent_breakdown(subject, side, records)
            })
            .as_slice()
    }

    pub fn invalidate(&mut self) {
        if !self.entries.is_empty() {
            debug!(entries = self.entries.len(), "dropping cached breakdowns");
        }
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::play_stats::tests::{arb_records, scenario_a};
    use crate::analysis::play_stats::{aggregate, StatsAggregator};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn row(opponent: &str, plays: u32, wins: u32, win_rate: f64) -> OpponentBreakdown {
        OpponentBreakdown {
            opponent: opponent.to_string(),
            plays,
            wins,
            win_rate,
        }
    }

    #[test]
    fn hero_breakdown_by_villain() {
        let rows = opponent_breakdown("A", Side::Hero, &scenario_a());
        assert_eq!(rows, vec![row("X", 1, 1, 100.0), row("Y", 1, 0, 0.0)]);
    }

    #[test]
    fn villain_breakdown_counts_hero_wins() {
        let records = vec![
            PlayRecord::new("A", "X", true),
            PlayRecord::new("B", "X", false),
            PlayRecord::new("B", "X", false),
            PlayRecord::new("A", "Y", false),
        ];

        let rows = opponent_breakdown("X", Side::Villain, &records);
        assert_eq!(rows, vec![row("B", 2, 0, 0.0), row("A", 1, 1, 100.0)]);
        assert_eq!(rows[0].losses(), 2);
    }

    #[test]
    fn breakdown_ties_keep_first_seen_order() {
        let records = vec![
            PlayRecord::new("A", "Z", true),
            PlayRecord::new("A", "X", true),
            PlayRecord::new("A", "X", false),
            PlayRecord::new("A", "M", true),
        ];

        let rows = opponent_breakdown("A", Side::Hero, &records);
        let names: Vec<&str> = rows.iter().map(|r| r.opponent.as_str()).collect();
        assert_eq!(names, vec!["X", "Z", "M"]);
    }

    #[test]
    fn unknown_subject_has_empty_breakdown() {
        assert!(opponent_breakdown("Nobody", Side::Hero, &scenario_a()).is_empty());
    }

    #[test]
    fn plays_without_opponent_are_skipped() {
        let records = vec![
            PlayRecord {
                hero: Some("A".to_string()),
                villain: None,
                win: true,
                ..Default::default()
            },
            PlayRecord::new("A", "X", true),
        ];

        assert_eq!(
            opponent_breakdown("A", Side::Hero, &records),
            vec![row("X", 1, 1, 100.0)]
        );
    }

    #[test]
    fn cache_serves_repeat_lookups() {
        let mut aggregator = StatsAggregator::new();
        aggregator.load(scenario_a());

        let first = aggregator.breakdown(Side::Hero, "A").to_vec();
        assert_eq!(aggregator.cached_breakdowns(), 1);
        let second = aggregator.breakdown(Side::Hero, "A").to_vec();
        assert_eq!(first, second);
        assert_eq!(aggregator.cached_breakdowns(), 1);

        aggregator.breakdown(Side::Villain, "A");
        assert_eq!(aggregator.cached_breakdowns(), 2);
    }

    #[test]
    fn load_discards_stale_breakdowns() {
        let mut aggregator = StatsAggregator::new();
        aggregator.load(scenario_a());
        assert_eq!(aggregator.breakdown(Side::Hero, "A").len(), 2);

        aggregator.load(vec![PlayRecord::new("A", "Q", false)]);
        assert_eq!(aggregator.cached_breakdowns(), 0);
        assert_eq!(aggregator.breakdown(Side::Hero, "A"), &[row("Q", 1, 0, 0.0)]);
    }

    #[test]
    fn cache_rejects_entries_from_older_generation() {
        let mut cache = BreakdownCache::new();
        let old = scenario_a();
        assert_eq!(cache.get_or_compute(1, Side::Hero, "A", &old).len(), 2);

        let new = vec![PlayRecord::new("A", "X", true)];
        assert_eq!(cache.get_or_compute(2, Side::Hero, "A", &new).len(), 1);
        assert_eq!(cache.len(), 1);

        cache.invalidate();
        assert!(cache.is_empty());
    }

    proptest! {
        /// Every play with both sides is counted once from each side's breakdowns.
        #[test]
        fn prop_breakdowns_cover_each_play_once(records in arb_records()) {
            let complete: Vec<PlayRecord> = records
                .into_iter()
                .filter(|r| r.hero.is_some() && r.villain.is_some())
                .collect();
            let stats = aggregate(&complete);

            let hero_total: u32 = stats
                .heroes
                .iter()
                .flat_map(|h| opponent_breakdown(h.name(), Side::Hero, &complete))
                .map(|r| r.plays)
                .sum();
            let villain_total: u32 = stats
                .villains
                .iter()
                .flat_map(|v| opponent_breakdown(v.name(), Side::Villain, &complete))
                .map(|r| r.plays)
                .sum();

            prop_assert_eq!(hero_total, complete.len() as u32);
            prop_assert_eq!(villain_total, complete.len() as u32);
        }
    }
}
