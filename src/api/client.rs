use crate::config::Config;
use crate::error::AppError;
use crate::source::{PlayQuery, QuerySource, ResultSet, DATE_FACET_LIMIT};
use governor::clock::{Clock, DefaultClock};
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use indicatif::ProgressBar;
use serde_json::{json, Value};
use std::num::NonZeroU32;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::endpoints::{browse_url, query_url, DATE_FACET, USER_AGENT};
use super::models::{top_facets, BrowseResponse, FacetCount, PlayRecord, SearchResponse};

const MAX_RETRIES: u32 = 3;
const REQUESTS_PER_SECOND: u32 = 10;

/// What to do after the index answered with an error status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry(Duration),
    GiveUp,
}

/// 429s are retried with a growing delay until `MAX_RETRIES` is spent.
pub fn retry_decision(status: u16, retry_count: u32) -> RetryDecision {
    if status != 429 || retry_count >= MAX_RETRIES {
        return RetryDecision::GiveUp;
    }
    RetryDecision::Retry(Duration::from_millis(2000 * (retry_count + 1) as u64))
}

/// One browse request against the index.
pub trait BrowsePage {
    fn browse_page(&self, body: &Value) -> Result<BrowseResponse, AppError>;
}

/// Plays gathered by walking the browse cursor.
#[derive(Debug)]
pub struct BrowseOutcome {
    pub hits: Vec<Value>,
    pub total_hits: usize,
    /// False when `max_pages` stopped the walk before the cursor ran out.
    pub complete: bool,
    pub pages: usize,
}

/// Follows the cursor from the first page until it runs out or `max_pages`
/// requests were made. `on_page` is called after every page.
pub fn browse_all<B: BrowsePage>(
    source: &B,
    query: &PlayQuery,
    hits_per_page: usize,
    max_pages: usize,
    mut on_page: impl FnMut(usize),
) -> Result<BrowseOutcome, AppError> {
    let max_pages = max_pages.max(1);
    let first = source.browse_page(&browse_body(query, hits_per_page))?;
    on_page(1);

    let total_hits = first.nb_hits;
    let mut hits = first.hits;
    let mut cursor = first.cursor;
    let mut pages = 1;

    while let Some(next) = cursor.take() {
        if pages >= max_pages {
            warn!(
                fetched = hits.len(),
                total_hits,
                pages,
                "page cap reached, statistics will cover a partial result set"
            );
            return Ok(BrowseOutcome {
                hits,
                total_hits,
                complete: false,
                pages,
            });
        }

        let response = source.browse_page(&cursor_body(&next))?;
        pages += 1;
        debug!(page = pages, hits = response.hits.len(), "fetched page");
        hits.extend(response.hits);
        cursor = response.cursor;
        on_page(pages);
    }

    Ok(BrowseOutcome {
        hits,
        total_hits,
        complete: true,
        pages,
    })
}

/// Client for the hosted search index holding the plays.
pub struct SearchClient {
    config: Config,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    clock: DefaultClock,
}

impl SearchClient {
    pub fn new(config: Config) -> Self {
        let per_second = NonZeroU32::new(REQUESTS_PER_SECOND).unwrap_or(NonZeroU32::MIN);
        SearchClient {
            config,
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
            clock: DefaultClock::default(),
        }
    }

    fn wait_for_slot(&self) {
        while let Err(not_until) = self.rate_limiter.check() {
            thread::sleep(not_until.wait_time_from(self.clock.now()));
        }
    }

    fn execute_request(&self, url: &str, body: &Value) -> Result<String, AppError> {
        let mut retry_count = 0;

        loop {
            self.wait_for_slot();

            let response = ureq::post(url)
                .set("User-Agent", USER_AGENT)
                .set("X-Algolia-Application-Id", &self.config.app_id)
                .set("X-Algolia-API-Key", &self.config.api_key)
                .send_json(body);

            match response {
                Ok(resp) => {
                    return resp
                        .into_string()
                        .map_err(|e| AppError::HttpError(e.to_string()));
                }
                Err(ureq::Error::Status(code, resp)) => match retry_decision(code, retry_count) {
                    RetryDecision::Retry(wait) => {
                        warn!(
                            wait_ms = wait.as_millis() as u64,
                            retry = retry_count + 1,
                            "rate limited by search index"
                        );
                        thread::sleep(wait);
                        retry_count += 1;
                    }
                    RetryDecision::GiveUp if code == 429 => return Err(AppError::RateLimited),
                    RetryDecision::GiveUp => {
                        let detail = resp.into_string().unwrap_or_default();
                        return Err(AppError::ApiError(format!("status {}: {}", code, detail)));
                    }
                },
                Err(e) => {
                    return Err(AppError::HttpError(e.to_string()));
                }
            }
        }
    }

    fn search(&self, body: Value) -> Result<SearchResponse, AppError> {
        let url = query_url(&self.config.app_id, &self.config.index_name);
        let text = self.execute_request(&url, &body)?;
        serde_json::from_str(&text).map_err(|e| AppError::JsonError(e.to_string()))
    }
}

impl BrowsePage for SearchClient {
    fn browse_page(&self, body: &Value) -> Result<BrowseResponse, AppError> {
        let url = browse_url(&self.config.app_id, &self.config.index_name);
        let text = self.execute_request(&url, body)?;
        serde_json::from_str(&text).map_err(|e| AppError::JsonError(e.to_string()))
    }
}

fn date_filters(query: &PlayQuery) -> Vec<String> {
    query
        .date
        .iter()
        .map(|date| format!("{}:{}", DATE_FACET, date))
        .collect()
}

/// First browse request for `query`.
pub fn browse_body(query: &PlayQuery, hits_per_page: usize) -> Value {
    json!({
        "query": query.text,
        "hitsPerPage": hits_per_page,
        "facetFilters": date_filters(query),
    })
}

/// Follow-up browse request; the cursor carries the original parameters.
pub fn cursor_body(cursor: &str) -> Value {
    json!({ "cursor": cursor })
}

/// Request body asking only for date facet counts.
pub fn facet_body(query: &PlayQuery) -> Value {
    json!({
        "query": query.text,
        "hitsPerPage": 0,
        "facets": [DATE_FACET],
        "maxValuesPerFacet": DATE_FACET_LIMIT,
    })
}

impl QuerySource for SearchClient {
    fn fetch_all(&self, query: &PlayQuery) -> Result<ResultSet, AppError> {
        info!(index = %self.config.index_name, ?query, "browsing plays");

        let pb = ProgressBar::new_spinner();
        pb.set_message("Fetching plays");
        let outcome = browse_all(
            self,
            query,
            self.config.hits_per_page,
            self.config.max_pages,
            |page| pb.set_message(format!("Fetching plays (page {})", page)),
        )?;
        pb.finish_and_clear();

        info!(
            total_hits = outcome.total_hits,
            pages = outcome.pages,
            complete = outcome.complete,
            "fetched plays"
        );

        Ok(ResultSet {
            query: query.clone(),
            records: PlayRecord::from_values(outcome.hits),
            total_hits: outcome.total_hits,
            complete: outcome.complete,
        })
    }

    fn date_facets(&self, query: &PlayQuery) -> Result<Vec<FacetCount>, AppError> {
        let mut response = self.search(facet_body(query))?;
        let counts = response.facets.remove(DATE_FACET).unwrap_or_default();
        Ok(top_facets(counts, DATE_FACET_LIMIT))
    }
}
