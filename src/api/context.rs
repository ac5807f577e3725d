//! Per-request plumbing shared by every handler: the services a handler needs (metadata store,
//! block driver, pagination config) and the auth header extraction, threaded explicitly rather
//! than carried in a thread-global (§9 "Ambient request context").

use std::sync::Arc;

use hyper::{Body, Request};

use deuce_block::BlockStorageDriver;
use deuce_model::MetadataStore;
use deuce_util::config::ApiConfig;
use deuce_util::context::RequestContext;

use crate::error::Error;

/// Everything a handler needs besides the request itself. Cloned per-connection by
/// `api_server`, cheap because every field is an `Arc`.
#[derive(Clone)]
pub struct ApiContext {
	pub store: Arc<MetadataStore>,
	pub block_driver: Arc<dyn BlockStorageDriver>,
	pub api_config: Arc<ApiConfig>,
}

impl ApiContext {
	pub fn new(
		store: Arc<MetadataStore>,
		block_driver: Arc<dyn BlockStorageDriver>,
		api_config: Arc<ApiConfig>,
	) -> Self {
		Self {
			store,
			block_driver,
			api_config,
		}
	}
}

pub const PROJECT_ID_HEADER: &str = "X-Project-Id";

/// Extracts the project id from `X-Project-Id`, an explicit per-request value rather than a
/// process-wide context object.
pub fn request_context(req: &Request<Body>) -> Result<RequestContext, Error> {
	let project_id = req
		.headers()
		.get(PROJECT_ID_HEADER)
		.ok_or_else(|| Error::BadRequest(format!("missing {} header", PROJECT_ID_HEADER)))?
		.to_str()
		.map_err(|_| Error::BadRequest(format!("{} header is not valid UTF-8", PROJECT_ID_HEADER)))?;
	if project_id.is_empty() {
		return Err(Error::BadRequest(format!("{} header is empty", PROJECT_ID_HEADER)));
	}
	Ok(RequestContext::new(project_id))
}
