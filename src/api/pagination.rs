//! Shared truncation/`X-Next-Batch` logic for the four `marker`/`limit` list endpoints (§6).
//!
//! Every list operation below the HTTP layer is asked for `limit + 1` rows; if that extra row
//! comes back, the last *returned* id becomes the resume marker and gets echoed in
//! `X-Next-Batch` as an absolute URL the client can follow verbatim.

use hyper::{HeaderMap, HeaderValue, Uri};

use deuce_util::config::ApiConfig;

pub const NEXT_BATCH_HEADER: &str = "X-Next-Batch";

/// Clamps the caller's requested `limit` against `api_config`, then returns `limit + 1` — the
/// probe count every list query should be issued with.
pub fn probe_count(api_config: &ApiConfig, requested: Option<usize>) -> usize {
	api_config.determine_limit(requested) + 1
}

/// Splits a probe-sized result set back down to the real page, returning the resume marker if the
/// extra row was present. The marker is the *last fetched* id — the probe row at index `limit`,
/// one past the returned page — not the last id of the returned page itself; using the returned
/// page's last id would re-list that same row on the next call, since markers are inclusive
/// (`id >= marker`).
pub fn split_page<T: Clone>(mut rows: Vec<T>, limit: usize) -> (Vec<T>, Option<T>) {
	if rows.len() > limit {
		let marker = rows.get(limit).cloned();
		rows.truncate(limit);
		(rows, marker)
	} else {
		(rows, None)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn split_page_marker_is_probe_row_not_last_of_page() {
		let rows: Vec<i32> = (0..11).collect();
		let (page, marker) = split_page(rows, 10);
		assert_eq!(page, (0..10).collect::<Vec<_>>());
		assert_eq!(marker, Some(10));
	}

	#[test]
	fn split_page_no_marker_when_not_truncated() {
		let rows: Vec<i32> = (0..5).collect();
		let (page, marker) = split_page(rows, 10);
		assert_eq!(page, (0..5).collect::<Vec<_>>());
		assert_eq!(marker, None);
	}
}

/// Builds the `X-Next-Batch` header value: the request's own URL with `marker` and `limit`
/// query parameters replaced. Uses the request's `Host` header for the authority when present
/// (the transport's own TLS/proxy termination decides the scheme); falls back to an origin-form
/// URL (path + query only) when no `Host` header was sent, which still round-trips correctly
/// against this same server.
pub fn next_batch_url(uri: &Uri, headers: &HeaderMap, marker: &str, limit: usize) -> String {
	let path = uri.path();
	let query = format!(
		"marker={}&limit={}",
		percent_encoding::utf8_percent_encode(marker, percent_encoding::NON_ALPHANUMERIC),
		limit
	);
	match headers.get(hyper::header::HOST).and_then(|h| h.to_str().ok()) {
		Some(host) => format!("http://{}{}?{}", host, path, query),
		None => format!("{}?{}", path, query),
	}
}

pub fn next_batch_header(uri: &Uri, headers: &HeaderMap, marker: &str, limit: usize) -> HeaderValue {
	HeaderValue::from_str(&next_batch_url(uri, headers, marker, limit))
		.unwrap_or_else(|_| HeaderValue::from_static(""))
}
