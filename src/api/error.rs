//! Maps domain errors onto HTTP status codes, per §7's table. Each handler returns
//! `Result<Response<Body>, Error>`; `helpers::InfallibleResult` turns the `Err` arm into a
//! response body instead of propagating it to hyper.

use err_derive::Error;
use hyper::StatusCode;

#[derive(Debug, Error)]
pub enum Error {
	#[error(display = "{}", _0)]
	Model(#[error(source)] deuce_model::Error),

	#[error(display = "block storage error: {}", _0)]
	Block(#[error(source)] deuce_util::error::Error),

	#[error(display = "resource not found")]
	NotFound,

	#[error(display = "invalid request: {}", _0)]
	BadRequest(String),

	#[error(display = "{}", _0)]
	Internal(String),
}

impl Error {
	/// The exact status-code mapping from §7: gaps/overlaps are 413, constraint violations are
	/// 409, missing resources 404, re-finalization and malformed bodies 400, block-store failures
	/// 502, anything else 500.
	pub fn http_status_code(&self) -> StatusCode {
		use deuce_model::Error as ModelError;
		match self {
			Error::Model(ModelError::Gap { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
			Error::Model(ModelError::Overlap { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
			Error::Model(ModelError::Constraint { .. }) => StatusCode::CONFLICT,
			Error::Model(ModelError::NotFound(_)) => StatusCode::NOT_FOUND,
			Error::Model(ModelError::AlreadyFinalized { .. }) => StatusCode::BAD_REQUEST,
			Error::Model(ModelError::InvalidRequestBody(_)) => StatusCode::BAD_REQUEST,
			Error::Model(ModelError::Db(_)) => StatusCode::INTERNAL_SERVER_ERROR,
			Error::Model(ModelError::Block(_)) => StatusCode::BAD_GATEWAY,
			Error::Model(ModelError::Encoding(_)) => StatusCode::INTERNAL_SERVER_ERROR,
			Error::Block(_) => StatusCode::BAD_GATEWAY,
			Error::NotFound => StatusCode::NOT_FOUND,
			Error::BadRequest(_) => StatusCode::BAD_REQUEST,
			Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}
