use std::convert::Infallible;

use hyper::{Body, Request, Response};

use crate::error::*;

pub trait InfallibleResult {
	fn make_infallible(self) -> Result<Response<Body>, Infallible>;
}

impl InfallibleResult for Result<Response<Body>, Error> {
	fn make_infallible(self) -> Result<Response<Body>, Infallible> {
		match self {
			Ok(x) => {
				debug!("{} {:?}", x.status(), x.headers());
				Ok(x)
			}
			Err(e) => {
				let body: Body = Body::from(format!("{}\n", e));
				let mut http_error = Response::new(body);
				*http_error.status_mut() = e.http_status_code();
				warn!("Response: error {}, {}", e.http_status_code(), e);
				Ok(http_error)
			}
		}
	}
}

pub fn empty_body() -> Body {
	Body::empty()
}

pub fn json_body<T: serde::Serialize>(status: hyper::StatusCode, value: &T) -> Response<Body> {
	let bytes = serde_json::to_vec(value).expect("response value should always serialize");
	Response::builder()
		.status(status)
		.header(hyper::header::CONTENT_TYPE, "application/json")
		.body(Body::from(bytes))
		.expect("building a response from a fixed set of headers should never fail")
}

/// Reads a request body fully into memory. Block/file bodies in this API are bounded by the
/// transport's own size cap (§1: "no size limit enforcement... beyond what the transport caps"),
/// so buffering here is an acceptable tradeoff against streaming parse.
pub async fn read_body(req: Request<Body>) -> Result<bytes::Bytes, Error> {
	hyper::body::to_bytes(req.into_body())
		.await
		.map_err(|e| Error::Internal(format!("failed to read request body: {}", e)))
}

/// Parses `?marker=&limit=` query parameters off a request URI, matching §6's pagination
/// protocol. An absent or empty marker is `None`, which every list operation treats as "start".
pub fn parse_marker_limit(uri: &hyper::Uri) -> (Option<String>, Option<usize>) {
	let mut marker = None;
	let mut limit = None;
	if let Some(query) = uri.query() {
		for (k, v) in form_urlencoded::parse(query.as_bytes()) {
			match k.as_ref() {
				"marker" if !v.is_empty() => marker = Some(v.into_owned()),
				"limit" => limit = v.parse::<usize>().ok(),
				_ => (),
			}
		}
	}
	(marker, limit)
}
