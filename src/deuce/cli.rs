//! Command-line surface. Deuce is single-node: there's exactly one command a standalone process
//! needs, starting the server off a config file.

use std::path::PathBuf;

use structopt::StructOpt;

#[derive(StructOpt, Debug)]
pub enum Command {
	/// Run the Deuce server
	#[structopt(name = "server")]
	Server(ServerOpt),
}

#[derive(StructOpt, Debug)]
pub struct ServerOpt {
	/// Configuration file
	#[structopt(short = "c", long = "config", default_value = "./config.toml")]
	pub config_file: PathBuf,
}
