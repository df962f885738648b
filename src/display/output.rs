use crate::analysis::{
    Difficulty, OpponentBreakdown, OverallRecord, Side, SortColumn, SortState, SubjectSummary,
    WinRateClass,
};
use crate::api::models::{FacetCount, PlayRecord};
use crate::error::AppError;
use crate::source::PlayQuery;
use chrono::{DateTime, Utc};
use colored::*;
use serde::Serialize;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

#[derive(Tabled)]
struct PlayRow {
    #[tabled(rename = "#")]
    number: String,
    hero: String,
    villain: String,
    result: String,
    date: String,
    team: String,
}

#[derive(Tabled)]
struct BreakdownRow {
    opponent: String,
    plays: String,
    #[tabled(rename = "hero wins")]
    wins: String,
    losses: String,
    win_rate: String,
}

#[derive(Tabled)]
struct FacetRow {
    date: String,
    plays: String,
}

/// Everything the `json` output format emits.
#[derive(Serialize)]
pub struct StatsReport<'a> {
    pub query: &'a PlayQuery,
    /// False when the statistics cover only part of the matching plays.
    pub complete: bool,
    pub total_hits: usize,
    pub overall: OverallRecord,
    pub hero_sort: SortState,
    pub villain_sort: SortState,
    pub heroes: Vec<SubjectSummary>,
    pub villains: Vec<SubjectSummary>,
    pub breakdowns: Vec<BreakdownReport>,
}

#[derive(Serialize)]
pub struct BreakdownReport {
    pub side: Side,
    pub subject: String,
    pub opponents: Vec<OpponentBreakdown>,
}

pub fn display_json(report: &StatsReport<'_>) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| AppError::JsonError(format!("Failed to serialize report: {}", e)))?;
    println!("{}", json);
    Ok(())
}

pub fn display_error(error: &str) {
    eprintln!("{} {}", "❌ Error:".red().bold(), error);
}

pub fn display_info(message: &str) {
    println!("{} {}", "ℹ️".cyan(), message);
}

pub fn display_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn display_warning(message: &str) {
    println!("{} {}", "⚠️".yellow(), message);
}

/// `YYYY-MM-DD` for a stored timestamp, `-` when there is none.
pub fn format_timestamp(millis: i64) -> String {
    if millis <= 0 {
        return "-".to_string();
    }
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn colored_rate(rate: f64) -> String {
    let text = format!("{:.1}%", rate);
    match WinRateClass::from_win_rate(rate) {
        WinRateClass::High => text.green().to_string(),
        WinRateClass::Medium => text.yellow().to_string(),
        WinRateClass::Low => text.red().to_string(),
    }
}

fn colored_difficulty(rate: f64) -> String {
    let difficulty = Difficulty::from_win_rate(rate);
    let label = difficulty.to_string();
    match difficulty {
        Difficulty::Easy => label.green().to_string(),
        Difficulty::Medium => label.yellow().to_string(),
        Difficulty::Hard => label.red().to_string(),
    }
}

fn header(label: &str, column: SortColumn, state: SortState) -> String {
    if column != state.column {
        return label.to_string();
    }
    format!("{} {}", label, if state.ascending { "▲" } else { "▼" })
}

pub fn display_overview(query: &PlayQuery, overall: OverallRecord) {
    let scope = match (&query.text[..], query.date.as_deref()) {
        ("", None) => "all plays".to_string(),
        ("", Some(date)) => format!("plays on {}", date),
        (text, None) => format!("plays matching '{}'", text),
        (text, Some(date)) => format!("plays matching '{}' on {}", text, date),
    };

    println!("\n{}", format!("📊 PLAY STATISTICS ({})", scope).bold().cyan());
    println!("{}\n", "=".repeat(70).cyan());
    println!(
        "{} {} plays, {} W / {} L ({:.1}% WR)\n",
        "📈 Overall:".bold(),
        overall.plays,
        overall.wins.to_string().green(),
        overall.losses.to_string().red(),
        overall.win_rate
    );
}

pub fn display_play_list(records: &[PlayRecord], limit: usize) {
    if records.is_empty() || limit == 0 {
        return;
    }

    let rows: Vec<PlayRow> = records
        .iter()
        .take(limit)
        .enumerate()
        .map(|(idx, record)| PlayRow {
            number: format!("{}", idx + 1),
            hero: record.hero.clone().unwrap_or_else(|| "?".to_string()),
            villain: record.villain.clone().unwrap_or_else(|| "?".to_string()),
            result: if record.win {
                "Victory".green().to_string()
            } else {
                "Defeat".red().to_string()
            },
            date: record.date.clone().unwrap_or_else(|| "-".to_string()),
            team: record.team_composition.clone().unwrap_or_default(),
        })
        .collect();

    println!(
        "{}",
        format!("🎲 PLAYS (showing {} of {})", rows.len(), records.len()).bold().cyan()
    );
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}\n", table);
}

/// Hero or villain summary table, already sorted by `state`.
pub fn display_summaries(side: Side, rows: &[SubjectSummary], state: SortState) {
    let (title, subject, plural, wins_label) = match side {
        Side::Hero => ("🦸 HERO STATISTICS", "Hero", "heroes", "Wins"),
        Side::Villain => ("🦹 VILLAIN STATISTICS", "Villain", "villains", "Hero Wins"),
    };

    println!(
        "{}",
        format!("{} ({} {})", title, rows.len(), plural).bold().cyan()
    );

    if rows.is_empty() {
        println!("{}\n", "No plays found.".yellow());
        return;
    }

    let mut headers = vec![
        "#".to_string(),
        header(subject, SortColumn::Name, state),
        header("Plays", SortColumn::Plays, state),
        header(wins_label, SortColumn::Wins, state),
        "Losses".to_string(),
        header("Win Rate", SortColumn::WinRate, state),
    ];
    if side == Side::Villain {
        headers.push("Difficulty".to_string());
    }
    headers.push(header("Last Played", SortColumn::LastPlayed, state));

    let mut builder = Builder::default();
    builder.push_record(headers);

    for (idx, row) in rows.iter().enumerate() {
        let mut record = vec![
            format!("{}", idx + 1),
            row.name().to_string(),
            row.plays().to_string(),
            row.wins().to_string(),
            row.losses().to_string(),
            colored_rate(row.win_rate()),
        ];
        if side == Side::Villain {
            record.push(colored_difficulty(row.win_rate()));
        }
        record.push(format_timestamp(row.last_played()));
        builder.push_record(record);
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    println!("{}\n", table);
}

pub fn display_breakdown(side: Side, subject: &str, rows: &[OpponentBreakdown]) {
    let against = side.opposite();
    println!(
        "{}",
        format!("🔎 {} '{}' by {}", capitalize(&side.to_string()), subject, against)
            .bold()
            .cyan()
    );

    if rows.is_empty() {
        println!("{}\n", format!("No plays recorded for this {}.", side).yellow());
        return;
    }

    let rows: Vec<BreakdownRow> = rows
        .iter()
        .map(|r| BreakdownRow {
            opponent: r.opponent.clone(),
            plays: r.plays.to_string(),
            wins: r.wins.to_string(),
            losses: r.losses().to_string(),
            win_rate: colored_rate(r.win_rate),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}\n", table);
}

pub fn display_date_facets(facets: &[FacetCount]) {
    println!("\n{}", "📅 TIME PERIODS".bold().cyan());

    if facets.is_empty() {
        println!("{}", "No dated plays found.".yellow());
        return;
    }

    let rows: Vec<FacetRow> = facets
        .iter()
        .map(|f| FacetRow {
            date: f.value.clone(),
            plays: f.count.to_string(),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
    println!("{}\n", "Pass one of these to --date to filter.".dimmed());
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_timestamps() {
        assert_eq!(format_timestamp(0), "-");
        assert_eq!(format_timestamp(86_400_000), "1970-01-02");
    }

    #[test]
    fn sorted_column_header_shows_direction() {
        let mut state = SortState::default();
        assert_eq!(header("Plays", SortColumn::Plays, state), "Plays ▼");
        assert_eq!(header("Wins", SortColumn::Wins, state), "Wins");

        state.activate(SortColumn::Plays);
        assert_eq!(header("Plays", SortColumn::Plays, state), "Plays ▲");
    }

    #[test]
    fn json_report_flags_partial_results() {
        let query = PlayQuery::new("rhino", None);
        let records = vec![PlayRecord::new("A", "Rhino", true)];
        let report = StatsReport {
            query: &query,
            complete: false,
            total_hits: 1500,
            overall: OverallRecord::from_records(&records),
            hero_sort: SortState::default(),
            villain_sort: SortState::default(),
            heroes: Vec::new(),
            villains: Vec::new(),
            breakdowns: Vec::new(),
        };

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["complete"], serde_json::json!(false));
        assert_eq!(value["total_hits"], serde_json::json!(1500));
        assert_eq!(value["overall"]["plays"], serde_json::json!(1));
    }

    #[test]
    fn capitalizes_side_names() {
        assert_eq!(capitalize("villain"), "Villain");
        assert_eq!(capitalize(""), "");
    }
}
