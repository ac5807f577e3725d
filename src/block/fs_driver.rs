use std::path::PathBuf;

use bytes::Bytes;
use rand::prelude::*;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use deuce_util::error::Error;

use crate::{vault_dir, ByteStream};

/// Stores each vault's blocks as individual files under `<data_dir>/<project_id>/<vault_id>/`,
/// named by a freshly minted hex storage id. Writes go through a temp file + rename so a reader
/// never observes a partially-written block.
pub struct FsBlockDriver {
	data_dir: PathBuf,
}

impl FsBlockDriver {
	pub fn new(data_dir: PathBuf) -> Self {
		Self { data_dir }
	}

	fn block_path(&self, project_id: &str, vault_id: &str, storage_id: &str) -> PathBuf {
		let mut path = vault_dir(&self.data_dir, project_id, vault_id);
		path.push(storage_id);
		path
	}

	fn new_storage_id(&self) -> String {
		hex::encode(thread_rng().gen::<[u8; 16]>())
	}
}

#[async_trait::async_trait]
impl crate::BlockStorageDriver for FsBlockDriver {
	async fn put(&self, project_id: &str, vault_id: &str, data: Bytes) -> Result<String, Error> {
		let dir = vault_dir(&self.data_dir, project_id, vault_id);
		fs::create_dir_all(&dir).await?;

		let storage_id = self.new_storage_id();
		let path = self.block_path(project_id, vault_id, &storage_id);

		let mut path_tmp = path.clone();
		path_tmp.set_extension(format!("tmp{}", hex::encode(thread_rng().gen::<[u8; 4]>())));

		let mut f = fs::File::create(&path_tmp).await?;
		f.write_all(&data).await?;
		f.sync_all().await?;
		drop(f);

		fs::rename(&path_tmp, &path).await?;

		debug!(
			"wrote block {}/{}/{} ({} bytes)",
			project_id,
			vault_id,
			storage_id,
			data.len()
		);

		Ok(storage_id)
	}

	async fn get(
		&self,
		project_id: &str,
		vault_id: &str,
		storage_id: &str,
	) -> Result<ByteStream, Error> {
		let path = self.block_path(project_id, vault_id, storage_id);
		let f = fs::File::open(&path).await?;
		let stream = tokio_util::io::ReaderStream::new(f);
		Ok(Box::pin(stream))
	}

	async fn delete(&self, project_id: &str, vault_id: &str, storage_id: &str) -> Result<(), Error> {
		let path = self.block_path(project_id, vault_id, storage_id);
		match fs::remove_file(&path).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(e.into()),
		}
	}

	async fn exists(&self, project_id: &str, vault_id: &str, storage_id: &str) -> Result<bool, Error> {
		let path = self.block_path(project_id, vault_id, storage_id);
		Ok(fs::metadata(&path).await.is_ok())
	}
}
