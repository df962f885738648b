use crate::api::models::PlayRecord;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use super::breakdown::{BreakdownCache, OpponentBreakdown};

/// Which side of a play a subject belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Hero,
    Villain,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Hero => Side::Villain,
            Side::Villain => Side::Hero,
        }
    }

    /// The record's name on this side, if present.
    pub fn name_of(self, record: &PlayRecord) -> Option<&str> {
        match self {
            Side::Hero => record.hero.as_deref(),
            Side::Villain => record.villain.as_deref(),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Hero => write!(f, "hero"),
            Side::Villain => write!(f, "villain"),
        }
    }
}

/// `wins / plays` as a percentage, 0 when nothing was played.
pub fn win_rate(wins: u32, plays: u32) -> f64 {
    if plays == 0 {
        0.0
    } else {
        (wins as f64 / plays as f64) * 100.0
    }
}

/// Aggregated record for one hero or one villain.
///
/// `wins` always counts hero victories, so for a villain it is the number of
/// times heroes beat them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectSummary {
    name: String,
    plays: u32,
    wins: u32,
    win_rate: f64,
    last_played: i64,
}

impl SubjectSummary {
    pub fn from_counts(name: impl Into<String>, plays: u32, wins: u32, last_played: i64) -> Self {
        let wins = wins.min(plays);
        SubjectSummary {
            name: name.into(),
            plays,
            wins,
            win_rate: win_rate(wins, plays),
            last_played: last_played.max(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn plays(&self) -> u32 {
        self.plays
    }

    pub fn wins(&self) -> u32 {
        self.wins
    }

    pub fn losses(&self) -> u32 {
        self.plays - self.wins
    }

    pub fn win_rate(&self) -> f64 {
        self.win_rate
    }

    /// Epoch milliseconds of the most recent play, 0 when no play had a usable date.
    pub fn last_played(&self) -> i64 {
        self.last_played
    }
}

/// Running counts while a result set is scanned.
#[derive(Debug, Clone)]
pub(crate) struct Tally {
    pub name: String,
    pub plays: u32,
    pub wins: u32,
    pub last_played: i64,
}

/// Tallies keyed by exact name, remembering first-seen order.
#[derive(Debug, Default)]
pub(crate) struct TallyBook {
    tallies: Vec<Tally>,
    index: HashMap<String, usize>,
}

impl TallyBook {
    pub fn add(&mut self, name: &str, won: bool, timestamp: Option<i64>) {
        let slot = match self.index.get(name) {
            Some(&slot) => slot,
            None => {
                self.tallies.push(Tally {
                    name: name.to_string(),
                    plays: 0,
                    wins: 0,
                    last_played: 0,
                });
                self.index.insert(name.to_string(), self.tallies.len() - 1);
                self.tallies.len() - 1
            }
        };

        let tally = &mut self.tallies[slot];
        tally.plays = tally.plays.saturating_add(1);
        if won {
            tally.wins = tally.wins.saturating_add(1);
        }
        if let Some(ts) = timestamp {
            tally.last_played = tally.last_played.max(ts);
        }
    }

    pub fn into_tallies(self) -> Vec<Tally> {
        self.tallies
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregate {
    pub heroes: Vec<SubjectSummary>,
    pub villains: Vec<SubjectSummary>,
}

/// Per-hero and per-villain summaries over `records`, in first-seen order.
///
/// A record missing one side only counts toward the side that is present.
pub fn aggregate(records: &[PlayRecord]) -> Aggregate {
    let mut heroes = TallyBook::default();
    let mut villains = TallyBook::default();

    for record in records {
        let timestamp = record.timestamp();
        if let Some(hero) = record.hero.as_deref() {
            heroes.add(hero, record.win, timestamp);
        }
        if let Some(villain) = record.villain.as_deref() {
            villains.add(villain, record.win, timestamp);
        }
    }

    Aggregate {
        heroes: finish(heroes),
        villains: finish(villains),
    }
}

fn finish(book: TallyBook) -> Vec<SubjectSummary> {
    book.into_tallies()
        .into_iter()
        .map(|t| SubjectSummary::from_counts(t.name, t.plays, t.wins, t.last_played))
        .collect()
}

/// Saturates instead of wrapping for result sets beyond `u32::MAX`.
pub(crate) fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Overall win/loss line across the whole result set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverallRecord {
    pub plays: u32,
    pub wins: u32,
    pub losses: u32,
    pub win_rate: f64,
}

impl OverallRecord {
    pub fn from_records(records: &[PlayRecord]) -> Self {
        let plays = count_u32(records.len());
        let wins = count_u32(records.iter().filter(|r| r.win).count());
        OverallRecord {
            plays,
            wins,
            losses: plays - wins,
            win_rate: win_rate(wins, plays),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinRateClass {
    High,
    Medium,
    Low,
}

impl WinRateClass {
    pub fn from_win_rate(rate: f64) -> Self {
        if rate >= 70.0 {
            WinRateClass::High
        } else if rate >= 40.0 {
            WinRateClass::Medium
        } else {
            WinRateClass::Low
        }
    }
}

/// How hard a villain is, judged by how often heroes beat them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn from_win_rate(rate: f64) -> Self {
        match WinRateClass::from_win_rate(rate) {
            WinRateClass::High => Difficulty::Easy,
            WinRateClass::Medium => Difficulty::Medium,
            WinRateClass::Low => Difficulty::Hard,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "Easy"),
            Difficulty::Medium => write!(f, "Medium"),
            Difficulty::Hard => write!(f, "Hard"),
        }
    }
}

/// Holds the current result set, its summaries and the breakdown cache.
///
/// Every call to [`StatsAggregator::load`] starts a new generation; cached
/// breakdowns from earlier generations are never served.
pub struct StatsAggregator {
    records: Vec<PlayRecord>,
    summaries: Aggregate,
    generation: u64,
    breakdowns: BreakdownCache,
}

impl StatsAggregator {
    pub fn new() -> Self {
        StatsAggregator {
            records: Vec::new(),
            summaries: Aggregate::default(),
            generation: 0,
            breakdowns: BreakdownCache::new(),
        }
    }

    /// Replaces the result set and returns its generation.
    pub fn load(&mut self, records: Vec<PlayRecord>) -> u64 {
        self.generation += 1;
        self.breakdowns.invalidate();
        self.summaries = aggregate(&records);
        self.records = records;

        debug!(
            generation = self.generation,
            records = self.records.len(),
            heroes = self.summaries.heroes.len(),
            villains = self.summaries.villains.len(),
            "loaded result set"
        );

        self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn records(&self) -> &[PlayRecord] {
        &self.records
    }

    pub fn heroes(&self) -> &[SubjectSummary] {
        &self.summaries.heroes
    }

    pub fn villains(&self) -> &[SubjectSummary] {
        &self.summaries.villains
    }

    pub fn summaries(&self, side: Side) -> &[SubjectSummary] {
        match side {
            Side::Hero => self.heroes(),
            Side::Villain => self.villains(),
        }
    }

    pub fn aggregate(&self) -> &Aggregate {
        &self.summaries
    }

    pub fn overall(&self) -> OverallRecord {
        OverallRecord::from_records(&self.records)
    }

    /// Opponents faced by `name`, computed on first access for this generation.
    pub fn breakdown(&mut self, side: Side, name: &str) -> &[OpponentBreakdown] {
        self.breakdowns
            .get_or_compute(self.generation, side, name, &self.records)
    }

    pub fn cached_breakdowns(&self) -> usize {
        self.breakdowns.len()
    }

    pub fn invalidate(&mut self) {
        self.breakdowns.invalidate();
    }
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new()
    }
}
