//! Contains types and functions related to the Deuce configuration file.
use std::io::Read;
use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::Error;

/// Represents the whole configuration
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
	/// Address to bind the HTTP API to
	pub api_bind_addr: SocketAddr,

	/// Configuration for the metadata store
	pub metadata_driver: MetadataDriverConfig,

	/// Configuration for the block storage driver
	pub block_driver: BlockDriverConfig,

	/// Configuration for the pagination/listing API
	#[serde(default)]
	pub api_configuration: ApiConfig,
}

/// Which metadata engine to open, and where
#[derive(Deserialize, Debug, Clone)]
pub struct MetadataDriverConfig {
	/// Path to the sqlite database file. The special value `:memory:` selects the in-memory
	/// engine instead of sqlite, for tests and ephemeral deployments.
	pub path: PathBuf,
}

/// Where the local filesystem block driver keeps block payloads
#[derive(Deserialize, Debug, Clone)]
pub struct BlockDriverConfig {
	pub data_dir: PathBuf,
}

/// Pagination defaults/limits shared by every list operation in §6
#[derive(Deserialize, Debug, Clone)]
pub struct ApiConfig {
	#[serde(default = "default_returned_num")]
	pub default_returned_num: usize,
	#[serde(default = "default_max_returned_num")]
	pub max_returned_num: usize,
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self {
			default_returned_num: default_returned_num(),
			max_returned_num: default_max_returned_num(),
		}
	}
}

fn default_returned_num() -> usize {
	100
}
fn default_max_returned_num() -> usize {
	1000
}

impl ApiConfig {
	/// Clamp a user-requested limit to the configured maximum, falling back to the default when
	/// none was requested (or when explicitly requested as zero).
	pub fn determine_limit(&self, requested: Option<usize>) -> usize {
		match requested {
			None | Some(0) => self.default_returned_num,
			Some(n) => std::cmp::min(n, self.max_returned_num),
		}
	}
}

/// Read and parse configuration
pub fn read_config(config_file: PathBuf) -> Result<Config, Error> {
	let mut file = std::fs::OpenOptions::new()
		.read(true)
		.open(config_file.as_path())?;

	let mut config = String::new();
	file.read_to_string(&mut config)?;

	Ok(toml::from_str(&config)?)
}
