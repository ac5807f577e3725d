//! Local filesystem implementation of the block byte-store.
//!
//! Blocks are opaque byte payloads identified by a `storage_id` that the driver mints itself;
//! the caller's `block_id` (a content hash) never reaches this layer, matching the design note
//! that the two identifier spaces are independent (see the crate root docs of `deuce_model`).

#[macro_use]
extern crate tracing;

use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::Stream;

use deuce_util::error::Error;

mod fs_driver;

pub use fs_driver::FsBlockDriver;

pub type ByteStream = std::pin::Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Capability a transport/model layer needs from a block byte-store: put, get, delete, exists.
/// A `storage_id` is opaque to callers; only the driver that minted it can resolve it.
#[async_trait::async_trait]
pub trait BlockStorageDriver: Send + Sync {
	async fn put(&self, project_id: &str, vault_id: &str, data: Bytes) -> Result<String, Error>;

	async fn get(&self, project_id: &str, vault_id: &str, storage_id: &str)
		-> Result<ByteStream, Error>;

	async fn delete(&self, project_id: &str, vault_id: &str, storage_id: &str)
		-> Result<(), Error>;

	async fn exists(&self, project_id: &str, vault_id: &str, storage_id: &str)
		-> Result<bool, Error>;
}

pub(crate) fn vault_dir(root: &Path, project_id: &str, vault_id: &str) -> PathBuf {
	let mut path = root.to_path_buf();
	path.push(sanitize(project_id));
	path.push(sanitize(vault_id));
	path
}

/// storage_ids are generated by us (hex random), but project/vault ids come from callers; keep
/// path traversal out of the data directory regardless.
fn sanitize(component: &str) -> String {
	component.replace(['/', '\\', '\0'], "_")
}

#[cfg(test)]
mod test {
	use super::*;
	use futures::StreamExt;

	async fn drain(stream: ByteStream) -> Vec<u8> {
		let mut out = vec![];
		let mut stream = stream;
		while let Some(chunk) = stream.next().await {
			out.extend_from_slice(&chunk.unwrap());
		}
		out
	}

	#[tokio::test]
	async fn put_get_delete_roundtrip() {
		let dir = mktemp::Temp::new_dir().unwrap();
		let driver = FsBlockDriver::new(dir.to_path_buf());

		let storage_id = driver
			.put("proj1", "vault1", Bytes::from_static(b"hello world"))
			.await
			.unwrap();

		assert!(driver.exists("proj1", "vault1", &storage_id).await.unwrap());

		let body = drain(driver.get("proj1", "vault1", &storage_id).await.unwrap()).await;
		assert_eq!(body, b"hello world");

		driver
			.delete("proj1", "vault1", &storage_id)
			.await
			.unwrap();
		assert!(!driver.exists("proj1", "vault1", &storage_id).await.unwrap());

		// deleting twice is a no-op
		driver
			.delete("proj1", "vault1", &storage_id)
			.await
			.unwrap();
	}

	#[tokio::test]
	async fn distinct_vaults_do_not_collide() {
		let dir = mktemp::Temp::new_dir().unwrap();
		let driver = FsBlockDriver::new(dir.to_path_buf());

		let id_a = driver
			.put("proj1", "vault-a", Bytes::from_static(b"a"))
			.await
			.unwrap();
		let id_b = driver
			.put("proj1", "vault-b", Bytes::from_static(b"b"))
			.await
			.unwrap();

		assert!(!driver.exists("proj1", "vault-b", &id_a).await.unwrap());
		assert!(!driver.exists("proj1", "vault-a", &id_b).await.unwrap());
	}
}
