//! General-purpose error type for the ambient stack (config loading, I/O, the storage engine).
//!
//! Domain errors (GapError, OverlapError, ConstraintError, NotFound, ...) live in
//! `deuce_model::error`; this type is for the infrastructure underneath them.

use err_derive::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error(display = "IO error: {}", _0)]
	Io(#[error(source)] std::io::Error),

	#[error(display = "TOML decode error: {}", _0)]
	TomlDecode(#[error(source)] toml::de::Error),

	#[error(display = "JSON error: {}", _0)]
	Json(#[error(source)] serde_json::Error),

	#[error(display = "Storage engine error: {}", _0)]
	Db(#[error(source)] deuce_db::Error),

	#[error(display = "HTTP server error: {}", _0)]
	Hyper(#[error(source)] hyper::Error),

	#[error(display = "{}", _0)]
	Message(String),
}

impl From<&str> for Error {
	fn from(s: &str) -> Error {
		Error::Message(s.to_string())
	}
}

impl From<String> for Error {
	fn from(s: String) -> Error {
		Error::Message(s)
	}
}

pub type Result<T> = std::result::Result<T, Error>;
