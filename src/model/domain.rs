//! The domain facade: carries `project_id` explicitly into every metadata call, and layers policy
//! that isn't a metadata-store invariant in its own right — rejecting assignments to a finalized
//! file, and requiring a vault be empty before it's deleted.

use std::sync::Arc;

use deuce_util::context::RequestContext;

use crate::error::{Error, Result};
use crate::store::{MetadataStore, VaultStats};

/// A vault scoped to one request's project id. Cheap to construct; holds no connection state of
/// its own beyond an `Arc` to the shared metadata store.
pub struct Vault {
	store: Arc<MetadataStore>,
	project_id: String,
	vault_id: String,
}

impl Vault {
	pub fn new(store: Arc<MetadataStore>, ctx: &RequestContext, vault_id: impl Into<String>) -> Self {
		Self {
			store,
			project_id: ctx.project_id().to_string(),
			vault_id: vault_id.into(),
		}
	}

	pub fn id(&self) -> &str {
		&self.vault_id
	}

	pub fn create(&self) -> Result<()> {
		self.store.create_vault(&self.project_id, &self.vault_id)
	}

	/// Deletes the vault, but only if it has no files and no registered blocks. Both checks are
	/// full scans; acceptable since deletion is a rare, explicit administrative action.
	pub fn delete(&self) -> Result<()> {
		let files = self.store.list_files(&self.project_id, &self.vault_id, "", usize::MAX, true)?;
		let unfinalized = self
			.store
			.list_files(&self.project_id, &self.vault_id, "", usize::MAX, false)?;
		let blocks = self.store.list_blocks(&self.project_id, &self.vault_id, "", usize::MAX)?;
		if !files.is_empty() || !unfinalized.is_empty() || !blocks.is_empty() {
			return Err(Error::Constraint {
				project_id: self.project_id.clone(),
				vault_id: self.vault_id.clone(),
				message: "vault is not empty".into(),
			});
		}
		self.store.delete_vault(&self.project_id, &self.vault_id)
	}

	pub fn exists(&self) -> Result<bool> {
		self.store.has_vault(&self.project_id, &self.vault_id)
	}

	pub fn list(store: &MetadataStore, ctx: &RequestContext, marker: &str, limit: usize) -> Result<Vec<String>> {
		store.list_vaults(ctx.project_id(), marker, limit)
	}

	pub fn stats(&self) -> Result<VaultStats> {
		self.store.vault_stats(&self.project_id, &self.vault_id)
	}

	pub fn health(&self) -> Result<(usize, usize)> {
		self.store.vault_health(&self.project_id, &self.vault_id)
	}

	// ---- Files ----

	pub fn create_file(&self, file_id: &str) -> Result<()> {
		self.store.create_file(&self.project_id, &self.vault_id, file_id)
	}

	pub fn has_file(&self, file_id: &str) -> Result<bool> {
		self.store.has_file(&self.project_id, &self.vault_id, file_id)
	}

	pub fn is_finalized(&self, file_id: &str) -> Result<bool> {
		self.store.is_finalized(&self.project_id, &self.vault_id, file_id)
	}

	pub fn file_length(&self, file_id: &str) -> Result<u64> {
		self.store.file_length(&self.project_id, &self.vault_id, file_id)
	}

	pub fn get_file_data(&self, file_id: &str) -> Result<(bool, u64)> {
		self.store.get_file_data(&self.project_id, &self.vault_id, file_id)
	}

	pub fn delete_file(&self, file_id: &str) -> Result<()> {
		self.store.delete_file(&self.project_id, &self.vault_id, file_id)
	}

	/// `limit + 1` is the truncation probe the transport uses to compute `X-Next-Batch`; this
	/// facade just forwards whatever limit it's given.
	pub fn list_files(&self, marker: &str, limit: usize, finalized: bool) -> Result<Vec<String>> {
		self.store.list_files(&self.project_id, &self.vault_id, marker, limit, finalized)
	}

	pub fn list_file_blocks(&self, file_id: &str, offset: Option<u64>, limit: Option<usize>) -> Result<Vec<(String, u64)>> {
		self.store.list_file_blocks(&self.project_id, &self.vault_id, file_id, offset, limit)
	}

	/// Rejects the finalize if the file is already finalized: finalization is irreversible by
	/// design (§3), so re-finalizing is a client error rather than a silent no-op.
	pub fn finalize_file(&self, file_id: &str, file_size: Option<u64>) -> Result<()> {
		if self.store.is_finalized(&self.project_id, &self.vault_id, file_id)? {
			return Err(Error::AlreadyFinalized {
				project_id: self.project_id.clone(),
				vault_id: self.vault_id.clone(),
				file_id: file_id.to_string(),
			});
		}
		self.store.finalize_file(&self.project_id, &self.vault_id, file_id, file_size)
	}

	// ---- Blocks ----

	pub fn register_block(&self, block_id: &str, storage_id: &str, size: u64) -> Result<()> {
		self.store.register_block(&self.project_id, &self.vault_id, block_id, storage_id, size)
	}

	pub fn has_block(&self, block_id: &str, check_status: bool) -> Result<bool> {
		self.store.has_block(&self.project_id, &self.vault_id, block_id, check_status)
	}

	/// The set of block ids among `block_ids` that the client must still upload, per the
	/// "late registration" design: assignments may reference blocks not yet registered.
	pub fn missing_blocks(&self, block_ids: &[String]) -> Result<Vec<String>> {
		self.store
			.has_blocks(&self.project_id, &self.vault_id, block_ids, false)
	}

	pub fn get_block_data(&self, block_id: &str) -> Result<u64> {
		self.store.get_block_data(&self.project_id, &self.vault_id, block_id)
	}

	pub fn get_block_storage_id(&self, block_id: &str) -> Result<Option<String>> {
		self.store.get_block_storage_id(&self.project_id, &self.vault_id, block_id)
	}

	pub fn get_block_metadata_id(&self, storage_id: &str) -> Result<Option<String>> {
		self.store.get_block_metadata_id(&self.project_id, &self.vault_id, storage_id)
	}

	pub fn unregister_block(&self, block_id: &str) -> Result<()> {
		self.store.unregister_block(&self.project_id, &self.vault_id, block_id)
	}

	pub fn mark_block_as_bad(&self, block_id: &str) -> Result<()> {
		self.store.mark_block_as_bad(&self.project_id, &self.vault_id, block_id)
	}

	pub fn reset_block_status(&self, marker: &str, limit: usize) -> Result<Option<String>> {
		self.store.reset_block_status(&self.project_id, &self.vault_id, marker, limit)
	}

	pub fn list_blocks(&self, marker: &str, limit: usize) -> Result<Vec<String>> {
		self.store.list_blocks(&self.project_id, &self.vault_id, marker, limit)
	}

	pub fn get_block_ref_count(&self, block_id: &str) -> Result<u64> {
		self.store.get_block_ref_count(&self.project_id, &self.vault_id, block_id)
	}

	pub fn get_block_ref_modified(&self, block_id: &str) -> Result<i64> {
		self.store.get_block_ref_modified(&self.project_id, &self.vault_id, block_id)
	}

	pub fn assign_block(&self, file_id: &str, block_id: &str, offset: u64) -> Result<()> {
		if self.store.is_finalized(&self.project_id, &self.vault_id, file_id)? {
			return Err(Error::AlreadyFinalized {
				project_id: self.project_id.clone(),
				vault_id: self.vault_id.clone(),
				file_id: file_id.to_string(),
			});
		}
		self.store.assign_block(&self.project_id, &self.vault_id, file_id, block_id, offset)
	}

	pub fn assign_blocks(&self, file_id: &str, assignments: &[(String, u64)]) -> Result<()> {
		if self.store.is_finalized(&self.project_id, &self.vault_id, file_id)? {
			return Err(Error::AlreadyFinalized {
				project_id: self.project_id.clone(),
				vault_id: self.vault_id.clone(),
				file_id: file_id.to_string(),
			});
		}
		self.store.assign_blocks(&self.project_id, &self.vault_id, file_id, assignments)
	}
}
