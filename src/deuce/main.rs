//! Entry point: parses the CLI, sets up tracing, and dispatches to the server runner.
#[macro_use]
extern crate tracing;

mod cli;
mod server;

use std::process::ExitCode;

use structopt::StructOpt;

use deuce_util::error::Error;

#[tokio::main]
async fn main() -> ExitCode {
	tracing_subscriber::fmt::Subscriber::builder()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_writer(std::io::stderr)
		.init();

	let opt = cli::Command::from_args();

	if let Err(e) = run(opt).await {
		error!("{}", e);
		return ExitCode::FAILURE;
	}
	ExitCode::SUCCESS
}

async fn run(cmd: cli::Command) -> Result<(), Error> {
	match cmd {
		cli::Command::Server(opt) => server::run_server(opt.config_file).await,
	}
}
