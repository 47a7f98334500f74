//! Utility functions for the vehicle sync repository.

use std::time::Duration;

use url::Url;

use crate::errors::SearchIndexError;

/// Port used for endpoints that do not name one.
pub const DEFAULT_NODE_PORT: u16 = 9200;

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Parse a comma-separated list of search engine endpoints.
///
/// Each entry is `host`, `host:port` or a full `http(s)://host:port` URL. Empty
/// entries (leading, trailing or doubled commas) are skipped and a missing or
/// blank port falls back to [`DEFAULT_NODE_PORT`].
///
/// # Example
///
/// ```
/// use vehicle_sync_repository::parse_endpoints;
///
/// let endpoints = parse_endpoints("es-1:9201,,es-2").expect("valid endpoints");
/// assert_eq!(endpoints[0].as_str(), "http://es-1:9201/");
/// assert_eq!(endpoints[1].as_str(), "http://es-2:9200/");
/// ```
pub fn parse_endpoints(raw: &str) -> Result<Vec<Url>, SearchIndexError> {
    let mut endpoints = Vec::new();

    for node in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        endpoints.push(parse_endpoint(node)?);
    }

    if endpoints.is_empty() {
        return Err(SearchIndexError::config(format!(
            "no search engine endpoints in '{}'",
            raw
        )));
    }

    Ok(endpoints)
}

fn parse_endpoint(node: &str) -> Result<Url, SearchIndexError> {
    if node.contains("://") {
        let mut url = Url::parse(node)
            .map_err(|e| SearchIndexError::config(format!("Invalid endpoint '{}': {}", node, e)))?;
        if url.port().is_none() && url.set_port(Some(DEFAULT_NODE_PORT)).is_err() {
            return Err(SearchIndexError::config(format!(
                "Invalid endpoint '{}': cannot carry a port",
                node
            )));
        }
        return Ok(url);
    }

    let (host, port) = match node.rsplit_once(':') {
        Some((host, port)) if port.trim().is_empty() => (host, DEFAULT_NODE_PORT),
        Some((host, port)) => {
            let port = port.trim().parse::<u16>().map_err(|e| {
                SearchIndexError::config(format!("Invalid port in endpoint '{}': {}", node, e))
            })?;
            (host, port)
        }
        None => (node, DEFAULT_NODE_PORT),
    };

    if host.trim().is_empty() {
        return Err(SearchIndexError::config(format!(
            "Missing host in endpoint '{}'",
            node
        )));
    }

    Url::parse(&format!("http://{}:{}", host.trim(), port))
        .map_err(|e| SearchIndexError::config(format!("Invalid endpoint '{}': {}", node, e)))
}
