//! Turns a finalized file's ordered block list into one lazy, concatenated byte stream.
//!
//! A background task pushes one block stream at a time into a bounded channel, and the channel's
//! receiver is flattened into a single stream. This keeps only the currently-streamed block's
//! buffer alive at any time (restartable per block) while the whole reassembly is one-shot (not
//! restartable as a whole; a second read calls this function again). It does not re-validate gaps
//! or overlaps — that is `finalize_file`'s job — it simply honors the file's recorded order.

use std::sync::Arc;

use futures::stream::StreamExt;
use tokio::sync::mpsc;

use deuce_block::{BlockStorageDriver, ByteStream};

use crate::domain::Vault;
use crate::error::Error;

/// Channel depth between the fetch task and the HTTP body consumer: one block in flight plus one
/// buffered.
const CHANNEL_DEPTH: usize = 2;

/// Streams the bytes of `file_id`, fetching each referenced block from `block_driver` in the
/// file's recorded offset order and concatenating them.
pub fn reassemble_file(
	vault: Arc<Vault>,
	block_driver: Arc<dyn BlockStorageDriver>,
	project_id: String,
	vault_id: String,
	file_id: String,
) -> ByteStream {
	let (tx, rx) = mpsc::channel::<ByteStream>(CHANNEL_DEPTH);

	tokio::spawn(async move {
		if let Err(e) = fetch_blocks(&vault, block_driver.as_ref(), &project_id, &vault_id, &file_id, &tx).await {
			let _ = tx.send(error_stream(e)).await;
		}
	});

	let flattened = tokio_stream::wrappers::ReceiverStream::new(rx).flatten();
	Box::pin(flattened)
}

async fn fetch_blocks(
	vault: &Vault,
	block_driver: &dyn BlockStorageDriver,
	project_id: &str,
	vault_id: &str,
	file_id: &str,
	tx: &mpsc::Sender<ByteStream>,
) -> Result<(), Error> {
	let blocks = vault.list_file_blocks(file_id, None, None)?;
	for (block_id, _offset) in blocks {
		let storage_id = vault
			.get_block_storage_id(&block_id)?
			.ok_or_else(|| Error::NotFound(format!("storage id for block {}", block_id)))?;

		let block_stream = block_driver
			.get(project_id, vault_id, &storage_id)
			.await
			.map_err(Error::Block)?;

		if tx.send(block_stream).await.is_err() {
			// Receiver dropped: the HTTP client disconnected mid-stream. Nothing left to do but
			// stop fetching further blocks.
			break;
		}
	}
	Ok(())
}

fn error_stream(e: Error) -> ByteStream {
	let io_err = std::io::Error::new(std::io::ErrorKind::Other, e.to_string());
	Box::pin(futures::stream::once(futures::future::ready(Err(io_err))))
}

#[cfg(test)]
mod test {
	use super::*;
	use bytes::Bytes;
	use futures::StreamExt as _;
	use std::sync::Arc as StdArc;

	use deuce_block::FsBlockDriver;

	use crate::store::MetadataStore;

	async fn drain(mut stream: ByteStream) -> Vec<u8> {
		let mut out = vec![];
		while let Some(chunk) = stream.next().await {
			out.extend_from_slice(&chunk.unwrap());
		}
		out
	}

	#[tokio::test]
	async fn reassembles_blocks_in_offset_order() {
		let db = deuce_db::mem_adapter::MemDb::new();
		let store = StdArc::new(MetadataStore::new(&db).unwrap());
		let ctx = deuce_util::context::RequestContext::new("proj1");
		let vault = StdArc::new(Vault::new(store.clone(), &ctx, "v1"));
		vault.create().unwrap();

		let tmp = mktemp::Temp::new_dir().unwrap();
		let driver: Arc<dyn BlockStorageDriver> = Arc::new(FsBlockDriver::new(tmp.to_path_buf()));

		let sid_a = driver.put("proj1", "v1", Bytes::from_static(b"hello ")).await.unwrap();
		let sid_b = driver.put("proj1", "v1", Bytes::from_static(b"world")).await.unwrap();

		vault.register_block("a", &sid_a, 6).unwrap();
		vault.register_block("b", &sid_b, 5).unwrap();

		vault.create_file("f1").unwrap();
		vault.assign_block("f1", "a", 0).unwrap();
		vault.assign_block("f1", "b", 6).unwrap();
		vault.finalize_file("f1", Some(11)).unwrap();

		let stream = reassemble_file(vault, driver, "proj1".into(), "v1".into(), "f1".into());
		let body = drain(stream).await;
		assert_eq!(body, b"hello world");
	}
}
