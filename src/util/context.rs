//! Per-request context.
//!
//! A process-wide mutable global for the tenant id is incompatible with parallel request
//! handling: two in-flight requests from different tenants would race on the same mutable slot.
//! Every metadata/domain call in this crate instead takes a `RequestContext` (or a bare `&str`
//! project id) as an explicit argument, constructed fresh per incoming HTTP request and never
//! stored anywhere longer-lived than that request's handler.

/// Identifies the tenant a request is acting on behalf of. Cheap to clone; carried by value
/// through the domain model and metadata store calls for the lifetime of a single request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestContext {
	pub project_id: String,
}

impl RequestContext {
	pub fn new(project_id: impl Into<String>) -> Self {
		Self {
			project_id: project_id.into(),
		}
	}

	pub fn project_id(&self) -> &str {
		&self.project_id
	}
}
