use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use play_stats::analysis::{sort, Side, SortColumn, SortState, StatsAggregator};
use play_stats::api::client::SearchClient;
use play_stats::cache::ResultCache;
use play_stats::config::Config;
use play_stats::display::output::{
    display_breakdown, display_date_facets, display_error, display_info, display_json,
    display_overview, display_play_list, display_success, display_summaries, display_warning,
    BreakdownReport, StatsReport,
};
use play_stats::error::AppError;
use play_stats::source::{FileSource, PlayQuery, QuerySource, ResultSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "play_stats")]
#[command(about = "Hero and villain statistics for recorded plays", long_about = None)]
#[command(version)]
struct Args {
    /// Free-text search (hero, villain or team)
    #[arg(default_value = "")]
    query: String,

    /// Only plays on this date (see --list-dates)
    #[arg(short, long)]
    date: Option<String>,

    /// Read plays from a JSON export instead of the search index
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Sort the hero table; repeat a column to flip its direction
    #[arg(long, value_enum)]
    hero_sort: Vec<SortColumn>,

    /// Sort the villain table; repeat a column to flip its direction
    #[arg(long, value_enum)]
    villain_sort: Vec<SortColumn>,

    /// Show which villains this hero faced (repeatable)
    #[arg(long)]
    hero: Vec<String>,

    /// Show which heroes faced this villain (repeatable)
    #[arg(long)]
    villain: Vec<String>,

    /// Number of individual plays to list
    #[arg(short, long, default_value = "0")]
    plays: usize,

    /// List the available dates with play counts and exit
    #[arg(long)]
    list_dates: bool,

    /// Ignore the local result cache and query the index again
    #[arg(long)]
    refresh: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() {
    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(args) {
        display_error(&e.to_string());
        std::process::exit(1);
    }
}

/// Replays column activations on a fresh table state.
fn sort_state(activations: &[SortColumn]) -> SortState {
    let mut state = SortState::default();
    for &column in activations {
        state.activate(column);
    }
    state
}

fn run(args: Args) -> Result<(), AppError> {
    let query = PlayQuery::new(&args.query, args.date.as_deref());
    let table = args.format == OutputFormat::Table;

    let result = match &args.file {
        Some(path) => {
            let source = FileSource::open(path)?;
            if args.list_dates {
                display_date_facets(&source.date_facets(&query)?);
                return Ok(());
            }
            source.fetch_all(&query)?
        }
        None => {
            let config = Config::from_env()?;
            let client = SearchClient::new(config.clone());
            if args.list_dates {
                display_date_facets(&client.date_facets(&query)?);
                return Ok(());
            }
            fetch_with_cache(&client, &config, &query, args.refresh, table)?
        }
    };

    let complete = result.is_complete();
    let total_hits = result.total_hits;
    if !complete {
        warn!(fetched = result.records.len(), total_hits, "result set is partial");
        if table {
            display_warning(&format!(
                "Only {} of {} matching plays were fetched; statistics are partial",
                result.records.len(),
                total_hits
            ));
        }
    }

    let mut aggregator = StatsAggregator::new();
    let generation = aggregator.load(result.records);
    info!(generation, "statistics ready");

    let hero_state = sort_state(&args.hero_sort);
    let villain_state = sort_state(&args.villain_sort);
    let heroes = sort(aggregator.heroes(), hero_state);
    let villains = sort(aggregator.villains(), villain_state);

    let drill_downs: Vec<(Side, String)> = args
        .hero
        .iter()
        .map(|name| (Side::Hero, name.clone()))
        .chain(args.villain.iter().map(|name| (Side::Villain, name.clone())))
        .collect();

    for (side, name) in &drill_downs {
        if !aggregator.summaries(*side).iter().any(|s| s.name() == name) {
            let unknown = AppError::UnknownSubject {
                side: side.to_string(),
                name: name.clone(),
            };
            warn!(%side, name = %name, "drill-down subject not in result set");
            if table {
                display_warning(&unknown.to_string());
            }
        }
    }

    if !table {
        let breakdowns = drill_downs
            .iter()
            .map(|(side, name)| BreakdownReport {
                side: *side,
                subject: name.clone(),
                opponents: aggregator.breakdown(*side, name).to_vec(),
            })
            .collect();

        return display_json(&StatsReport {
            query: &query,
            complete,
            total_hits,
            overall: aggregator.overall(),
            hero_sort: hero_state,
            villain_sort: villain_state,
            heroes,
            villains,
            breakdowns,
        });
    }

    if aggregator.records().is_empty() {
        display_warning(&AppError::NoResults.to_string());
        return Ok(());
    }

    display_overview(&query, aggregator.overall());
    display_play_list(aggregator.records(), args.plays);
    display_summaries(Side::Hero, &heroes, hero_state);
    display_summaries(Side::Villain, &villains, villain_state);

    for (side, name) in &drill_downs {
        display_breakdown(*side, name, aggregator.breakdown(*side, name));
    }

    Ok(())
}

fn fetch_with_cache(
    client: &SearchClient,
    config: &Config,
    query: &PlayQuery,
    refresh: bool,
    table: bool,
) -> Result<ResultSet, AppError> {
    let cache_dir = ResultCache::cache_dir();

    if !refresh {
        match ResultCache::load(&cache_dir, &config.app_id, &config.index_name, query) {
            Ok(Some(cache)) if !cache.is_stale(config.cache_minutes) => {
                if table {
                    display_success(&format!(
                        "⚡ Using cached results from {} (--refresh to query again)",
                        cache.fetched_at.format("%Y-%m-%d %H:%M")
                    ));
                }
                return Ok(cache.result);
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "ignoring unreadable result cache"),
        }
    }

    if table {
        display_info(&format!("Querying index '{}'...", config.index_name));
    }
    let result = client.fetch_all(query)?;
    if table {
        display_success(&format!("Fetched {} plays", result.records.len()));
    }

    let cache = ResultCache::new(&config.app_id, &config.index_name, result);
    if let Err(e) = cache.save(&cache_dir) {
        warn!(error = %e, "could not save result cache");
    }

    Ok(cache.result)
}
