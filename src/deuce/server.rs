use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;

use deuce_api::api_server;
use deuce_api::context::ApiContext;
use deuce_block::{BlockStorageDriver, FsBlockDriver};
use deuce_db::sqlite_adapter::rusqlite;
use deuce_db::{mem_adapter::MemDb, sqlite_adapter::SqliteDb, Db};
use deuce_model::MetadataStore;
use deuce_util::config::*;
use deuce_util::error::Error;

async fn wait_from(mut chan: watch::Receiver<bool>) {
	while !*chan.borrow() {
		if chan.changed().await.is_err() {
			return;
		}
	}
}

/// `:memory:` selects the in-memory metadata engine; any other path opens (creating if absent) a
/// sqlite database file there.
fn open_db(path: &std::path::Path) -> Result<Db, Error> {
	if path == std::path::Path::new(":memory:") {
		info!("Opening in-memory metadata store");
		return Ok(MemDb::new());
	}

	info!("Opening sqlite metadata store at {}", path.display());
	let conn = rusqlite::Connection::open(path).map_err(|e| Error::Message(e.to_string()))?;
	Ok(SqliteDb::init(conn))
}

pub async fn run_server(config_file: PathBuf) -> Result<(), Error> {
	info!("Loading configuration...");
	let config = read_config(config_file)?;

	info!("Opening metadata store...");
	let db = open_db(&config.metadata_driver.path)?;
	let store = Arc::new(MetadataStore::new(&db).map_err(|e| Error::Message(e.to_string()))?);

	info!("Opening block storage driver at {}...", config.block_driver.data_dir.display());
	let block_driver: Arc<dyn BlockStorageDriver> =
		Arc::new(FsBlockDriver::new(config.block_driver.data_dir.clone()));

	let api_config = Arc::new(config.api_configuration.clone());
	let ctx = ApiContext::new(store, block_driver, api_config);

	let watch_cancel = watch_shutdown_signal();

	info!("Launching Deuce API server...");
	tokio::select! {
		res = api_server::run(config.api_bind_addr, ctx) => {
			res.map_err(Error::Hyper)?;
		}
		_ = wait_from(watch_cancel) => {
			info!("Shutdown signal received, stopping.");
		}
	}

	info!("Cleaning up...");
	Ok(())
}

#[cfg(unix)]
fn watch_shutdown_signal() -> watch::Receiver<bool> {
	use tokio::signal::unix::*;

	let (send_cancel, watch_cancel) = watch::channel(false);
	tokio::spawn(async move {
		let mut sigint = signal(SignalKind::interrupt()).expect("Failed to install SIGINT handler");
		let mut sigterm = signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
		let mut sighup = signal(SignalKind::hangup()).expect("Failed to install SIGHUP handler");
		tokio::select! {
			_ = sigint.recv() => info!("Received SIGINT, shutting down."),
			_ = sigterm.recv() => info!("Received SIGTERM, shutting down."),
			_ = sighup.recv() => info!("Received SIGHUP, shutting down."),
		}
		send_cancel.send(true).unwrap();
	});
	watch_cancel
}

#[cfg(windows)]
fn watch_shutdown_signal() -> watch::Receiver<bool> {
	use tokio::signal::windows::*;

	let (send_cancel, watch_cancel) = watch::channel(false);
	tokio::spawn(async move {
		let mut sigint = ctrl_c().expect("Failed to install Ctrl-C handler");
		let mut sigclose = ctrl_close().expect("Failed to install Ctrl-Close handler");
		let mut siglogoff = ctrl_logoff().expect("Failed to install Ctrl-Logoff handler");
		let mut sigsdown = ctrl_shutdown().expect("Failed to install Ctrl-Shutdown handler");
		tokio::select! {
			_ = sigint.recv() => info!("Received Ctrl-C, shutting down."),
			_ = sigclose.recv() => info!("Received Ctrl-Close, shutting down."),
			_ = siglogoff.recv() => info!("Received Ctrl-Logoff, shutting down."),
			_ = sigsdown.recv() => info!("Received Ctrl-Shutdown, shutting down."),
		}
		send_cancel.send(true).unwrap();
	});
	watch_cancel
}
