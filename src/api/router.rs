//! Parses an incoming request's method and path into one of the operations in §6: a plain
//! `Endpoint` enum matched on verb + path shape. Vaults, blocks, and files each get plain REST
//! routes instead of query-parameter-driven sub-actions.

use hyper::Method;

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
	ListVaults,
	CreateVault { vault: String },
	HeadVault { vault: String },
	DeleteVault { vault: String },

	ListBlocks { vault: String },
	PutBlock { vault: String, block_id: String },
	PostBlocksBatch { vault: String },
	GetBlock { vault: String, block_id: String },
	HeadBlock { vault: String, block_id: String },
	DeleteBlock { vault: String, block_id: String },

	ListFiles { vault: String },
	CreateFile { vault: String },
	PostFile { vault: String, file_id: String },
	GetFile { vault: String, file_id: String },
	ListFileBlocks { vault: String, file_id: String },
}

/// `path` is the request path with the `/v1.0` version prefix already stripped.
pub fn route(method: &Method, path: &str) -> Result<Endpoint, Error> {
	let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

	match (method, segments.as_slice()) {
		(&Method::GET, ["vaults"]) => Ok(Endpoint::ListVaults),
		(&Method::PUT, ["vaults", vault]) => Ok(Endpoint::CreateVault { vault: id(vault)? }),
		(&Method::HEAD, ["vaults", vault]) => Ok(Endpoint::HeadVault { vault: id(vault)? }),
		(&Method::DELETE, ["vaults", vault]) => Ok(Endpoint::DeleteVault { vault: id(vault)? }),

		(&Method::GET, ["vaults", vault, "blocks"]) => Ok(Endpoint::ListBlocks { vault: id(vault)? }),
		(&Method::POST, ["vaults", vault, "blocks"]) => Ok(Endpoint::PostBlocksBatch { vault: id(vault)? }),
		(&Method::PUT, ["vaults", vault, "blocks", block_id]) => Ok(Endpoint::PutBlock {
			vault: id(vault)?,
			block_id: id(block_id)?,
		}),
		(&Method::GET, ["vaults", vault, "blocks", block_id]) => Ok(Endpoint::GetBlock {
			vault: id(vault)?,
			block_id: id(block_id)?,
		}),
		(&Method::HEAD, ["vaults", vault, "blocks", block_id]) => Ok(Endpoint::HeadBlock {
			vault: id(vault)?,
			block_id: id(block_id)?,
		}),
		(&Method::DELETE, ["vaults", vault, "blocks", block_id]) => Ok(Endpoint::DeleteBlock {
			vault: id(vault)?,
			block_id: id(block_id)?,
		}),

		(&Method::GET, ["vaults", vault, "files"]) => Ok(Endpoint::ListFiles { vault: id(vault)? }),
		(&Method::POST, ["vaults", vault, "files"]) => Ok(Endpoint::CreateFile { vault: id(vault)? }),
		(&Method::POST, ["vaults", vault, "files", file_id]) => Ok(Endpoint::PostFile {
			vault: id(vault)?,
			file_id: id(file_id)?,
		}),
		(&Method::GET, ["vaults", vault, "files", file_id]) => Ok(Endpoint::GetFile {
			vault: id(vault)?,
			file_id: id(file_id)?,
		}),
		(&Method::GET, ["vaults", vault, "files", file_id, "blocks"]) => Ok(Endpoint::ListFileBlocks {
			vault: id(vault)?,
			file_id: id(file_id)?,
		}),

		_ => Err(Error::NotFound),
	}
}

fn id(segment: &str) -> Result<String, Error> {
	let decoded = percent_encoding::percent_decode_str(segment)
		.decode_utf8()
		.map_err(|_| Error::BadRequest("path segment is not valid UTF-8".into()))?;
	if decoded.is_empty() {
		return Err(Error::BadRequest("empty id in path".into()));
	}
	Ok(decoded.into_owned())
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn routes_vault_crud() {
		assert_eq!(route(&Method::GET, "/vaults").unwrap(), Endpoint::ListVaults);
		assert_eq!(
			route(&Method::PUT, "/vaults/v1").unwrap(),
			Endpoint::CreateVault { vault: "v1".into() }
		);
		assert_eq!(
			route(&Method::DELETE, "/vaults/v1").unwrap(),
			Endpoint::DeleteVault { vault: "v1".into() }
		);
	}

	#[test]
	fn routes_file_assignment_and_listing() {
		assert_eq!(
			route(&Method::POST, "/vaults/v1/files/f1").unwrap(),
			Endpoint::PostFile {
				vault: "v1".into(),
				file_id: "f1".into()
			}
		);
		assert_eq!(
			route(&Method::GET, "/vaults/v1/files/f1/blocks").unwrap(),
			Endpoint::ListFileBlocks {
				vault: "v1".into(),
				file_id: "f1".into()
			}
		);
	}

	#[test]
	fn unknown_route_is_not_found() {
		assert!(matches!(route(&Method::GET, "/nope"), Err(Error::NotFound)));
	}
}
