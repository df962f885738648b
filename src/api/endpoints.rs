// Hosted search index endpoints

pub const USER_AGENT: &str = concat!("play_stats/", env!("CARGO_PKG_VERSION"));

/// Facet attribute holding the play date.
pub const DATE_FACET: &str = "date";

fn index_url(app_id: &str, index_name: &str, operation: &str) -> String {
    format!(
        "https://{}-dsn.algolia.net/1/indexes/{}/{}",
        app_id.to_lowercase(),
        index_name,
        operation
    )
}

/// Search endpoint; paging stops at the index's pagination limit.
pub fn query_url(app_id: &str, index_name: &str) -> String {
    index_url(app_id, index_name, "query")
}

/// Cursor-based endpoint that walks every matching record.
pub fn browse_url(app_id: &str, index_name: &str) -> String {
    index_url(app_id, index_name, "browse")
}
