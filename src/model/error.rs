//! The domain error taxonomy. Each variant here is the one that gets translated into an exact
//! HTTP status code by `deuce_api`; see that crate's handler error mapping for the status codes
//! themselves (413/409/404/400, per §7).

use err_derive::Error;

#[derive(Debug, Error)]
pub enum Error {
	/// Two blocks cover the same byte range of a file. Carries the offending block and the
	/// overlapping span.
	#[error(
		display = "overlap at block {} in file {}/{}/{} at [{}-{})",
		block_id,
		project_id,
		vault_id,
		file_id,
		startpos,
		endpos
	)]
	Overlap {
		project_id: String,
		vault_id: String,
		file_id: String,
		block_id: String,
		startpos: u64,
		endpos: u64,
	},

	/// A byte range of the file is not covered by any block.
	#[error(
		display = "gap in file {}/{}/{} at [{}-{})",
		project_id,
		vault_id,
		file_id,
		startpos,
		endpos
	)]
	Gap {
		project_id: String,
		vault_id: String,
		file_id: String,
		startpos: u64,
		endpos: u64,
	},

	/// An operation would violate a cross-row constraint, e.g. deleting a block that still has
	/// file references, or deleting a non-empty vault.
	#[error(display = "constraint violated on {}/{}: {}", project_id, vault_id, message)]
	Constraint {
		project_id: String,
		vault_id: String,
		message: String,
	},

	#[error(display = "not found: {}", _0)]
	NotFound(String),

	#[error(display = "file {}/{}/{} is already finalized", project_id, vault_id, file_id)]
	AlreadyFinalized {
		project_id: String,
		vault_id: String,
		file_id: String,
	},

	#[error(display = "invalid request body: {}", _0)]
	InvalidRequestBody(String),

	#[error(display = "storage engine error: {}", _0)]
	Db(#[error(source)] deuce_db::Error),

	#[error(display = "block storage error: {}", _0)]
	Block(#[error(source)] deuce_util::error::Error),

	#[error(display = "encoding error: {}", _0)]
	Encoding(String),
}

impl From<deuce_db::TxOpError> for Error {
	fn from(e: deuce_db::TxOpError) -> Error {
		Error::Encoding(format!("storage engine error: {}", e))
	}
}

pub type Result<T> = std::result::Result<T, Error>;
