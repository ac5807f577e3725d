//! The metadata store: a typed layer directly on top of `deuce_db`'s `Db`/`Tree` primitives,
//! grounded on `original_source/deuce/drivers/sqlite/sqlitemetadatadriver.py`'s SQL schema and
//! query set. Every operation takes `project_id` explicitly; nothing here reads from global
//! state.

use std::convert::TryInto;
use std::ops::Bound;

use serde::{Deserialize, Serialize};

use deuce_db::Db;

use crate::error::{Error, Result};
use crate::key;

const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";
const CURRENT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileRecord {
	finalized: bool,
	size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BlockRecord {
	storage_id: String,
	size: u64,
	reftime: i64,
	isinvalid: bool,
}

/// Statistics returned by [`MetadataStore::vault_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStats {
	pub count: usize,
	pub bad: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockStats {
	pub count: usize,
	pub bad: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VaultStats {
	pub files: FileStats,
	pub blocks: BlockStats,
}

pub struct MetadataStore {
	meta: deuce_db::Tree,
	vaults: deuce_db::Tree,
	files: deuce_db::Tree,
	fileblocks: deuce_db::Tree,
	blocks: deuce_db::Tree,
	blocks_by_storage_id: deuce_db::Tree,
}

impl MetadataStore {
	pub fn new(db: &Db) -> Result<Self> {
		let meta = db.open_tree("meta")?;
		let vaults = db.open_tree("vaults")?;
		let files = db.open_tree("files")?;
		let fileblocks = db.open_tree("fileblocks")?;
		let blocks = db.open_tree("blocks")?;
		let blocks_by_storage_id = db.open_tree("blocks_by_storage_id")?;

		let store = Self {
			meta,
			vaults,
			files,
			fileblocks,
			blocks,
			blocks_by_storage_id,
		};
		store.migrate()?;
		Ok(store)
	}

	/// Reads the schema version stored under the reserved `meta` tree and runs any migration
	/// steps needed to bring it to [`CURRENT_SCHEMA_VERSION`]. There is only one version so far;
	/// this just records it on first open (a SQL `pragma user_version`-style version slot).
	fn migrate(&self) -> Result<()> {
		let current = match self.meta.get(SCHEMA_VERSION_KEY)? {
			Some(v) => u32::from_be_bytes(v.as_slice().try_into().map_err(|_| {
				Error::Encoding("corrupt schema_version value".into())
			})?),
			None => 0,
		};
		if current < CURRENT_SCHEMA_VERSION {
			self.meta
				.insert(SCHEMA_VERSION_KEY, CURRENT_SCHEMA_VERSION.to_be_bytes())?;
		}
		Ok(())
	}

	// ---- Vault ----

	pub fn create_vault(&self, project_id: &str, vault_id: &str) -> Result<()> {
		self.vaults.insert(key::vault_key(project_id, vault_id), &[][..])?;
		Ok(())
	}

	pub fn delete_vault(&self, project_id: &str, vault_id: &str) -> Result<()> {
		self.vaults.remove(key::vault_key(project_id, vault_id))?;
		Ok(())
	}

	pub fn has_vault(&self, project_id: &str, vault_id: &str) -> Result<bool> {
		Ok(self.vaults.get(key::vault_key(project_id, vault_id))?.is_some())
	}

	pub fn list_vaults(&self, project_id: &str, marker: &str, limit: usize) -> Result<Vec<String>> {
		let prefix = key::vault_prefix(project_id);
		let start = key::vault_key(project_id, marker);
		let end = key::prefix_upper_bound(&prefix);

		let mut out = Vec::with_capacity(limit);
		for item in self.vaults.range(start..end)? {
			let (k, _) = item?;
			out.push(key::strip_prefix_id(&k, prefix.len()).ok_or_else(invalid_key)?);
			if out.len() >= limit {
				break;
			}
		}
		Ok(out)
	}

	pub fn vault_stats(&self, project_id: &str, vault_id: &str) -> Result<VaultStats> {
		let (bad_blocks, bad_files) = self.vault_health(project_id, vault_id)?;

		let files_count = self.list_files_unbounded(project_id, vault_id, None)?.len();
		let blocks_count = self.list_blocks_unbounded(project_id, vault_id)?.len();

		Ok(VaultStats {
			files: FileStats {
				count: files_count,
				bad: bad_files,
			},
			blocks: BlockStats {
				count: blocks_count,
				bad: bad_blocks,
			},
		})
	}

	/// Returns `(bad_block_count, bad_file_count)`: the number of invalid blocks in the vault,
	/// and the number of distinct files that reference at least one of them. Only the first file
	/// found referencing a given bad block counts toward that block's contribution to
	/// `bad_file_count`, not every file referencing it.
	pub fn vault_health(&self, project_id: &str, vault_id: &str) -> Result<(usize, usize)> {
		let bad_blocks = self.bad_block_ids(project_id, vault_id)?;
		let mut bad_files = std::collections::HashSet::new();
		for block_id in &bad_blocks {
			if let Some(file_id) = self.first_file_referencing_block(project_id, vault_id, block_id)? {
				bad_files.insert(file_id);
			}
		}
		Ok((bad_blocks.len(), bad_files.len()))
	}

	fn bad_block_ids(&self, project_id: &str, vault_id: &str) -> Result<Vec<String>> {
		let prefix = key::block_prefix(project_id, vault_id);
		let end = key::prefix_upper_bound(&prefix);
		let mut out = vec![];
		for item in self.blocks.range(prefix.clone()..end)? {
			let (k, v) = item?;
			let rec: BlockRecord = rmp_serde::from_slice(&v).map_err(encoding_err)?;
			if rec.isinvalid {
				out.push(key::strip_prefix_id(&k, prefix.len()).ok_or_else(invalid_key)?);
			}
		}
		Ok(out)
	}

	fn first_file_referencing_block(
		&self,
		project_id: &str,
		vault_id: &str,
		block_id: &str,
	) -> Result<Option<String>> {
		// fileblocks keys don't carry an index by block_id, so this is a full per-file scan;
		// acceptable since it only runs for bad blocks, which are expected to be rare.
		let prefix = key::file_prefix(project_id, vault_id);
		let end = key::prefix_upper_bound(&prefix);
		for item in self.files.range(prefix.clone()..end)? {
			let (k, _) = item?;
			let file_id = key::strip_prefix_id(&k, prefix.len()).ok_or_else(invalid_key)?;
			let fb_prefix = key::fileblock_prefix(project_id, vault_id, &file_id);
			let fb_end = key::prefix_upper_bound(&fb_prefix);
			for fb in self.fileblocks.range(fb_prefix.clone()..fb_end)? {
				let (fbk, _) = fb?;
				if let Some((_, bid)) = key::parse_fileblock_key(&fbk, fb_prefix.len()) {
					if bid == block_id {
						return Ok(Some(file_id));
					}
				}
			}
		}
		Ok(None)
	}

	// ---- File ----

	pub fn create_file(&self, project_id: &str, vault_id: &str, file_id: &str) -> Result<()> {
		let rec = FileRecord {
			finalized: false,
			size: 0,
		};
		self.files.insert(
			key::file_key(project_id, vault_id, file_id),
			rmp_serde::to_vec(&rec).map_err(encoding_err)?,
		)?;
		Ok(())
	}

	pub fn has_file(&self, project_id: &str, vault_id: &str, file_id: &str) -> Result<bool> {
		Ok(self.files.get(key::file_key(project_id, vault_id, file_id))?.is_some())
	}

	pub fn is_finalized(&self, project_id: &str, vault_id: &str, file_id: &str) -> Result<bool> {
		match self.files.get(key::file_key(project_id, vault_id, file_id))? {
			Some(v) => Ok(rmp_serde::from_slice::<FileRecord>(&v).map_err(encoding_err)?.finalized),
			None => Ok(false),
		}
	}

	pub fn file_length(&self, project_id: &str, vault_id: &str, file_id: &str) -> Result<u64> {
		match self.files.get(key::file_key(project_id, vault_id, file_id))? {
			Some(v) => Ok(rmp_serde::from_slice::<FileRecord>(&v).map_err(encoding_err)?.size),
			None => Ok(0),
		}
	}

	pub fn get_file_data(&self, project_id: &str, vault_id: &str, file_id: &str) -> Result<(bool, u64)> {
		match self.files.get(key::file_key(project_id, vault_id, file_id))? {
			Some(v) => {
				let rec: FileRecord = rmp_serde::from_slice(&v).map_err(encoding_err)?;
				Ok((rec.finalized, rec.size))
			}
			None => Err(Error::NotFound(format!("file {}", file_id))),
		}
	}

	/// Deletes a file: bumps reftime on every block it references (so a reaper sees recent
	/// activity even though the file disappears), then removes the file row and its fileblock
	/// rows, in that order.
	pub fn delete_file(&self, project_id: &str, vault_id: &str, file_id: &str) -> Result<()> {
		let blocks = self.list_file_blocks_unbounded(project_id, vault_id, file_id)?;
		for (block_id, _offset) in &blocks {
			self.touch_block_reftime(project_id, vault_id, block_id)?;
		}
		self.files.remove(key::file_key(project_id, vault_id, file_id))?;

		let prefix = key::fileblock_prefix(project_id, vault_id, file_id);
		let end = key::prefix_upper_bound(&prefix);
		let keys: Vec<_> = self
			.fileblocks
			.range(prefix..end)?
			.map(|item| item.map(|(k, _)| k))
			.collect::<std::result::Result<_, _>>()?;
		for k in keys {
			self.fileblocks.remove(k)?;
		}
		Ok(())
	}

	pub fn list_files(
		&self,
		project_id: &str,
		vault_id: &str,
		marker: &str,
		limit: usize,
		finalized: bool,
	) -> Result<Vec<String>> {
		let prefix = key::file_prefix(project_id, vault_id);
		let start = key::file_key(project_id, vault_id, marker);
		let end = key::prefix_upper_bound(&prefix);

		let mut out = Vec::with_capacity(limit);
		for item in self.files.range(start..end)? {
			let (k, v) = item?;
			let rec: FileRecord = rmp_serde::from_slice(&v).map_err(encoding_err)?;
			if rec.finalized != finalized {
				continue;
			}
			out.push(key::strip_prefix_id(&k, prefix.len()).ok_or_else(invalid_key)?);
			if out.len() >= limit {
				break;
			}
		}
		Ok(out)
	}

	fn list_files_unbounded(
		&self,
		project_id: &str,
		vault_id: &str,
		finalized: Option<bool>,
	) -> Result<Vec<String>> {
		let prefix = key::file_prefix(project_id, vault_id);
		let end = key::prefix_upper_bound(&prefix);
		let mut out = vec![];
		for item in self.files.range(prefix.clone()..end)? {
			let (k, v) = item?;
			if let Some(want) = finalized {
				let rec: FileRecord = rmp_serde::from_slice(&v).map_err(encoding_err)?;
				if rec.finalized != want {
					continue;
				}
			}
			out.push(key::strip_prefix_id(&k, prefix.len()).ok_or_else(invalid_key)?);
		}
		Ok(out)
	}

	pub fn list_file_blocks(
		&self,
		project_id: &str,
		vault_id: &str,
		file_id: &str,
		offset: Option<u64>,
		limit: Option<usize>,
	) -> Result<Vec<(String, u64)>> {
		match limit {
			None => self.list_file_blocks_unbounded(project_id, vault_id, file_id),
			Some(limit) => {
				let prefix = key::fileblock_prefix(project_id, vault_id, file_id);
				let end = key::prefix_upper_bound(&prefix);
				let start = key::fileblock_offset_floor(project_id, vault_id, file_id, offset.unwrap_or(0));

				let mut out = Vec::with_capacity(limit);
				for item in self.fileblocks.range(start..end)? {
					let (k, _) = item?;
					let (off, block_id) =
						key::parse_fileblock_key(&k, prefix.len()).ok_or_else(invalid_key)?;
					out.push((block_id, off));
					if out.len() >= limit {
						break;
					}
				}
				Ok(out)
			}
		}
	}

	fn list_file_blocks_unbounded(
		&self,
		project_id: &str,
		vault_id: &str,
		file_id: &str,
	) -> Result<Vec<(String, u64)>> {
		let prefix = key::fileblock_prefix(project_id, vault_id, file_id);
		let end = key::prefix_upper_bound(&prefix);
		let mut out = vec![];
		for item in self.fileblocks.range(prefix.clone()..end)? {
			let (k, _) = item?;
			let (off, block_id) = key::parse_fileblock_key(&k, prefix.len()).ok_or_else(invalid_key)?;
			out.push((block_id, off));
		}
		Ok(out)
	}

	/// Walks blocks in offset order, detecting gaps and overlaps, and (if no error) marks the
	/// file finalized with the computed size. When `file_size` is `None` this stores the computed
	/// `expected` length rather than zero (see DESIGN.md's note on this).
	pub fn finalize_file(
		&self,
		project_id: &str,
		vault_id: &str,
		file_id: &str,
		file_size: Option<u64>,
	) -> Result<()> {
		let blocks_in_file = self.fileblock_list_with_size(project_id, vault_id, file_id)?;

		let mut expected_offset: u64 = 0;
		for (block_id, offset, size) in &blocks_in_file {
			if *offset == expected_offset {
				expected_offset += size;
			} else if *offset < expected_offset {
				return Err(Error::Overlap {
					project_id: project_id.to_string(),
					vault_id: vault_id.to_string(),
					file_id: file_id.to_string(),
					block_id: block_id.clone(),
					startpos: *offset,
					endpos: expected_offset,
				});
			} else {
				return Err(Error::Gap {
					project_id: project_id.to_string(),
					vault_id: vault_id.to_string(),
					file_id: file_id.to_string(),
					startpos: expected_offset,
					endpos: *offset,
				});
			}
		}

		if let Some(given) = file_size {
			if given != expected_offset {
				if expected_offset < given {
					return Err(Error::Gap {
						project_id: project_id.to_string(),
						vault_id: vault_id.to_string(),
						file_id: file_id.to_string(),
						startpos: expected_offset,
						endpos: given,
					});
				} else {
					// There is no single offending block for a too-long file, so the requested
					// file_size is reported in the block_id slot of this error instead.
					return Err(Error::Overlap {
						project_id: project_id.to_string(),
						vault_id: vault_id.to_string(),
						file_id: file_id.to_string(),
						block_id: given.to_string(),
						startpos: given,
						endpos: expected_offset,
					});
				}
			}
		}

		let final_size = file_size.unwrap_or(expected_offset);
		let rec = FileRecord {
			finalized: true,
			size: final_size,
		};
		self.files.insert(
			key::file_key(project_id, vault_id, file_id),
			rmp_serde::to_vec(&rec).map_err(encoding_err)?,
		)?;
		Ok(())
	}

	/// Joins `fileblocks` against `blocks`, filtering out blocks marked invalid, ordered by
	/// offset. Grounded on `SQL_CREATE_FILEBLOCK_LIST`.
	fn fileblock_list_with_size(
		&self,
		project_id: &str,
		vault_id: &str,
		file_id: &str,
	) -> Result<Vec<(String, u64, u64)>> {
		let pairs = self.list_file_blocks_unbounded(project_id, vault_id, file_id)?;
		let mut out = Vec::with_capacity(pairs.len());
		for (block_id, offset) in pairs {
			if let Some(v) = self.blocks.get(key::block_key(project_id, vault_id, &block_id))? {
				let rec: BlockRecord = rmp_serde::from_slice(&v).map_err(encoding_err)?;
				if !rec.isinvalid {
					out.push((block_id, offset, rec.size));
				}
			}
		}
		out.sort_by_key(|(_, offset, _)| *offset);
		Ok(out)
	}

	// ---- Block ----

	pub fn register_block(
		&self,
		project_id: &str,
		vault_id: &str,
		block_id: &str,
		storage_id: &str,
		size: u64,
	) -> Result<()> {
		if self.has_block(project_id, vault_id, block_id, true)? {
			return Ok(());
		}
		let rec = BlockRecord {
			storage_id: storage_id.to_string(),
			size,
			reftime: deuce_util::time::now_secs(),
			isinvalid: false,
		};
		self.blocks.insert(
			key::block_key(project_id, vault_id, block_id),
			rmp_serde::to_vec(&rec).map_err(encoding_err)?,
		)?;
		self.blocks_by_storage_id.insert(
			key::storage_id_key(project_id, vault_id, storage_id),
			block_id.as_bytes(),
		)?;
		Ok(())
	}

	pub fn has_block(&self, project_id: &str, vault_id: &str, block_id: &str, check_status: bool) -> Result<bool> {
		match self.blocks.get(key::block_key(project_id, vault_id, block_id))? {
			None => Ok(false),
			Some(v) => {
				let rec: BlockRecord = rmp_serde::from_slice(&v).map_err(encoding_err)?;
				Ok(!(check_status && rec.isinvalid))
			}
		}
	}

	pub fn has_blocks(
		&self,
		project_id: &str,
		vault_id: &str,
		block_ids: &[String],
		check_status: bool,
	) -> Result<Vec<String>> {
		let mut missing = vec![];
		for block_id in block_ids {
			if !self.has_block(project_id, vault_id, block_id, check_status)? {
				missing.push(block_id.clone());
			}
		}
		Ok(missing)
	}

	pub fn get_block_data(&self, project_id: &str, vault_id: &str, block_id: &str) -> Result<u64> {
		match self.blocks.get(key::block_key(project_id, vault_id, block_id))? {
			Some(v) => Ok(rmp_serde::from_slice::<BlockRecord>(&v).map_err(encoding_err)?.size),
			None => Err(Error::NotFound(format!("block {}", block_id))),
		}
	}

	pub fn get_block_storage_id(&self, project_id: &str, vault_id: &str, block_id: &str) -> Result<Option<String>> {
		match self.blocks.get(key::block_key(project_id, vault_id, block_id))? {
			Some(v) => Ok(Some(rmp_serde::from_slice::<BlockRecord>(&v).map_err(encoding_err)?.storage_id)),
			None => Ok(None),
		}
	}

	pub fn get_block_metadata_id(&self, project_id: &str, vault_id: &str, storage_id: &str) -> Result<Option<String>> {
		match self.blocks_by_storage_id.get(key::storage_id_key(project_id, vault_id, storage_id))? {
			Some(v) => Ok(Some(String::from_utf8(v).map_err(|_| Error::Encoding("non-utf8 block id".into()))?)),
			None => Ok(None),
		}
	}

	/// Fails with [`Error::Constraint`] if the block still has fileblock references.
	pub fn unregister_block(&self, project_id: &str, vault_id: &str, block_id: &str) -> Result<()> {
		let refcount = self.get_block_ref_count(project_id, vault_id, block_id)?;
		if refcount > 0 {
			return Err(Error::Constraint {
				project_id: project_id.to_string(),
				vault_id: vault_id.to_string(),
				message: format!("block {} has references", block_id),
			});
		}
		if let Some(storage_id) = self.get_block_storage_id(project_id, vault_id, block_id)? {
			self.blocks_by_storage_id
				.remove(key::storage_id_key(project_id, vault_id, &storage_id))?;
		}
		self.blocks.remove(key::block_key(project_id, vault_id, block_id))?;
		Ok(())
	}

	pub fn mark_block_as_bad(&self, project_id: &str, vault_id: &str, block_id: &str) -> Result<()> {
		self.set_block_invalid(project_id, vault_id, block_id, true)
	}

	fn mark_block_as_good(&self, project_id: &str, vault_id: &str, block_id: &str) -> Result<()> {
		self.set_block_invalid(project_id, vault_id, block_id, false)
	}

	fn set_block_invalid(&self, project_id: &str, vault_id: &str, block_id: &str, invalid: bool) -> Result<()> {
		let k = key::block_key(project_id, vault_id, block_id);
		if let Some(v) = self.blocks.get(&k)? {
			let mut rec: BlockRecord = rmp_serde::from_slice(&v).map_err(encoding_err)?;
			rec.isinvalid = invalid;
			self.blocks.insert(k, rmp_serde::to_vec(&rec).map_err(encoding_err)?)?;
		}
		Ok(())
	}

	/// Pages through blocks ascending, marking each visited one valid again; returns the last
	/// visited id (so the caller can resume) if the page was full, else `None`.
	pub fn reset_block_status(
		&self,
		project_id: &str,
		vault_id: &str,
		marker: &str,
		limit: usize,
	) -> Result<Option<String>> {
		let ids = self.list_blocks(project_id, vault_id, marker, limit)?;
		for id in &ids {
			self.mark_block_as_good(project_id, vault_id, id)?;
		}
		Ok(if ids.len() == limit { ids.last().cloned() } else { None })
	}

	pub fn list_blocks(&self, project_id: &str, vault_id: &str, marker: &str, limit: usize) -> Result<Vec<String>> {
		let prefix = key::block_prefix(project_id, vault_id);
		let start = key::block_key(project_id, vault_id, marker);
		let end = key::prefix_upper_bound(&prefix);

		let mut out = Vec::with_capacity(limit);
		for item in self.blocks.range(start..end)? {
			let (k, _) = item?;
			out.push(key::strip_prefix_id(&k, prefix.len()).ok_or_else(invalid_key)?);
			if out.len() >= limit {
				break;
			}
		}
		Ok(out)
	}

	fn list_blocks_unbounded(&self, project_id: &str, vault_id: &str) -> Result<Vec<String>> {
		let prefix = key::block_prefix(project_id, vault_id);
		let end = key::prefix_upper_bound(&prefix);
		let mut out = vec![];
		for item in self.blocks.range(prefix.clone()..end)? {
			let (k, _) = item?;
			out.push(key::strip_prefix_id(&k, prefix.len()).ok_or_else(invalid_key)?);
		}
		Ok(out)
	}

	pub fn get_block_ref_count(&self, project_id: &str, vault_id: &str, block_id: &str) -> Result<u64> {
		let prefix = key::file_prefix(project_id, vault_id);
		let end = key::prefix_upper_bound(&prefix);
		let mut count = 0u64;
		for item in self.files.range(prefix.clone()..end)? {
			let (k, _) = item?;
			let file_id = key::strip_prefix_id(&k, prefix.len()).ok_or_else(invalid_key)?;
			for (bid, _) in self.list_file_blocks_unbounded(project_id, vault_id, &file_id)? {
				if bid == block_id {
					count += 1;
				}
			}
		}
		Ok(count)
	}

	pub fn get_block_ref_modified(&self, project_id: &str, vault_id: &str, block_id: &str) -> Result<i64> {
		match self.blocks.get(key::block_key(project_id, vault_id, block_id))? {
			Some(v) => Ok(rmp_serde::from_slice::<BlockRecord>(&v).map_err(encoding_err)?.reftime),
			None => Ok(0),
		}
	}

	fn touch_block_reftime(&self, project_id: &str, vault_id: &str, block_id: &str) -> Result<()> {
		let k = key::block_key(project_id, vault_id, block_id);
		if let Some(v) = self.blocks.get(&k)? {
			let mut rec: BlockRecord = rmp_serde::from_slice(&v).map_err(encoding_err)?;
			rec.reftime = deuce_util::time::now_secs();
			self.blocks.insert(k, rmp_serde::to_vec(&rec).map_err(encoding_err)?)?;
		}
		Ok(())
	}

	// ---- Assignment ----

	/// Upserts the (file, block, offset) fileblock row (a no-op if already present, thanks to
	/// the key encoding), then touches the block's reftime if it's already registered. If the
	/// block isn't registered yet, the touch is skipped — late registration will stamp it.
	pub fn assign_block(&self, project_id: &str, vault_id: &str, file_id: &str, block_id: &str, offset: u64) -> Result<()> {
		self.fileblocks.insert(
			key::fileblock_key(project_id, vault_id, file_id, offset, block_id),
			&[][..],
		)?;
		self.touch_block_reftime(project_id, vault_id, block_id)?;
		Ok(())
	}

	pub fn assign_blocks(
		&self,
		project_id: &str,
		vault_id: &str,
		file_id: &str,
		assignments: &[(String, u64)],
	) -> Result<()> {
		for (block_id, offset) in assignments {
			self.assign_block(project_id, vault_id, file_id, block_id, *offset)?;
		}
		Ok(())
	}
}

fn invalid_key() -> Error {
	Error::Encoding("key did not decode as utf-8 after prefix strip".into())
}

fn encoding_err<E: std::fmt::Display>(e: E) -> Error {
	Error::Encoding(e.to_string())
}

#[cfg(test)]
mod test {
	use super::*;

	const P: &str = "proj1";
	const V: &str = "vault1";

	fn store() -> MetadataStore {
		let db = deuce_db::mem_adapter::MemDb::new();
		MetadataStore::new(&db).unwrap()
	}

	/// §8 scenario 1: finalizing an empty file with size=0 and no blocks succeeds, and the file
	/// has no fileblocks afterwards.
	#[test]
	fn empty_finalize() {
		let s = store();
		s.create_vault(P, V).unwrap();
		s.create_file(P, V, "f1").unwrap();
		s.finalize_file(P, V, "f1", Some(0)).unwrap();
		assert!(s.is_finalized(P, V, "f1").unwrap());
		assert_eq!(s.file_length(P, V, "f1").unwrap(), 0);
		assert!(s.list_file_blocks(P, V, "f1", None, None).unwrap().is_empty());
	}

	/// §8 scenario 2: a block shared by two files has refcount 2, drops to 1 after one file is
	/// deleted, and can't be unregistered while any reference remains.
	#[test]
	fn happy_path_dedup() {
		let s = store();
		s.create_vault(P, V).unwrap();
		s.register_block(P, V, "a", "sid-a", 100).unwrap();

		s.create_file(P, V, "f1").unwrap();
		s.assign_block(P, V, "f1", "a", 0).unwrap();
		s.finalize_file(P, V, "f1", Some(100)).unwrap();

		s.create_file(P, V, "f2").unwrap();
		s.assign_block(P, V, "f2", "a", 0).unwrap();
		s.finalize_file(P, V, "f2", Some(100)).unwrap();

		assert_eq!(s.get_block_ref_count(P, V, "a").unwrap(), 2);

		s.delete_file(P, V, "f1").unwrap();
		assert_eq!(s.get_block_ref_count(P, V, "a").unwrap(), 1);

		match s.unregister_block(P, V, "a") {
			Err(Error::Constraint { .. }) => {}
			other => panic!("expected ConstraintError, got {:?}", other),
		}

		s.delete_file(P, V, "f2").unwrap();
		assert_eq!(s.get_block_ref_count(P, V, "a").unwrap(), 0);
		s.unregister_block(P, V, "a").unwrap();
		assert!(!s.has_block(P, V, "a", false).unwrap());
	}

	/// §8 scenario 3: a byte range left uncovered between two blocks is a GapError.
	#[test]
	fn gap_between_blocks() {
		let s = store();
		s.create_vault(P, V).unwrap();
		s.register_block(P, V, "a", "sid-a", 50).unwrap();
		s.register_block(P, V, "b", "sid-b", 50).unwrap();
		s.create_file(P, V, "f1").unwrap();
		s.assign_block(P, V, "f1", "a", 0).unwrap();
		s.assign_block(P, V, "f1", "b", 60).unwrap();

		match s.finalize_file(P, V, "f1", Some(110)) {
			Err(Error::Gap { startpos, endpos, .. }) => {
				assert_eq!(startpos, 50);
				assert_eq!(endpos, 60);
			}
			other => panic!("expected GapError, got {:?}", other),
		}
		assert!(!s.is_finalized(P, V, "f1").unwrap());
	}

	/// §8 scenario 4: two blocks covering the same byte range is an OverlapError naming the
	/// offending (later) block.
	#[test]
	fn overlapping_blocks() {
		let s = store();
		s.create_vault(P, V).unwrap();
		s.register_block(P, V, "a", "sid-a", 50).unwrap();
		s.register_block(P, V, "b", "sid-b", 50).unwrap();
		s.create_file(P, V, "f1").unwrap();
		s.assign_block(P, V, "f1", "a", 0).unwrap();
		s.assign_block(P, V, "f1", "b", 40).unwrap();

		match s.finalize_file(P, V, "f1", None) {
			Err(Error::Overlap { block_id, startpos, endpos, .. }) => {
				assert_eq!(block_id, "b");
				assert_eq!(startpos, 40);
				assert_eq!(endpos, 50);
			}
			other => panic!("expected OverlapError, got {:?}", other),
		}
		assert!(!s.is_finalized(P, V, "f1").unwrap());
	}

	/// §8 scenario 5: assigning blocks [X, Y, Z] to a file while only Y is registered reports
	/// exactly [X, Z] as missing.
	#[test]
	fn late_registration_reports_missing_blocks() {
		let s = store();
		s.create_vault(P, V).unwrap();
		s.register_block(P, V, "y", "sid-y", 10).unwrap();
		s.create_file(P, V, "f1").unwrap();

		let assignments = vec![("x".to_string(), 0u64), ("y".to_string(), 10), ("z".to_string(), 20)];
		s.assign_blocks(P, V, "f1", &assignments).unwrap();

		let mut missing = s
			.has_blocks(P, V, &["x".to_string(), "y".to_string(), "z".to_string()], false)
			.unwrap();
		missing.sort();
		assert_eq!(missing, vec!["x".to_string(), "z".to_string()]);
	}

	/// §8 scenario 6: pagination over 15 files with limit=10 yields 10 then the remaining 5, with
	/// no duplicates and no gaps, following the `marker >= id` convention.
	#[test]
	fn pagination_over_files() {
		let s = store();
		s.create_vault(P, V).unwrap();
		let mut ids: Vec<String> = (0..15).map(|i| format!("f{:02}", i)).collect();
		ids.sort();
		for id in &ids {
			s.create_file(P, V, id).unwrap();
		}

		let first_page = s.list_files(P, V, "", 10, false).unwrap();
		assert_eq!(first_page.len(), 10);
		assert_eq!(first_page, ids[0..10]);

		let marker = first_page.last().unwrap().clone();
		let second_page = s.list_files(P, V, &marker, 10, false).unwrap();
		assert_eq!(second_page, ids[9..15]);
	}

	/// §8 invariant 7: marking a block bad hides it behind `check_status`, and `reset_block_status`
	/// restores visibility once it revisits the block.
	#[test]
	fn bad_block_round_trip() {
		let s = store();
		s.create_vault(P, V).unwrap();
		s.register_block(P, V, "a", "sid-a", 10).unwrap();

		s.mark_block_as_bad(P, V, "a").unwrap();
		assert!(!s.has_block(P, V, "a", true).unwrap());
		assert!(s.has_block(P, V, "a", false).unwrap());

		let resume = s.reset_block_status(P, V, "", 10).unwrap();
		assert!(resume.is_none());
		assert!(s.has_block(P, V, "a", true).unwrap());
	}

	/// §8 invariant 2: re-registering the same block is a no-op that doesn't move its reftime
	/// backwards or change its recorded size.
	#[test]
	fn register_block_is_idempotent() {
		let s = store();
		s.create_vault(P, V).unwrap();
		s.register_block(P, V, "a", "sid-a", 10).unwrap();
		let reftime_before = s.get_block_ref_modified(P, V, "a").unwrap();
		let size_before = s.get_block_data(P, V, "a").unwrap();

		s.register_block(P, V, "a", "sid-a", 10).unwrap();
		assert_eq!(s.get_block_data(P, V, "a").unwrap(), size_before);
		assert!(s.get_block_ref_modified(P, V, "a").unwrap() >= reftime_before);
	}

	/// The open-question fix: omitting `file_size` stores the computed `expected`, not 0.
	#[test]
	fn finalize_without_size_stores_computed_length() {
		let s = store();
		s.create_vault(P, V).unwrap();
		s.register_block(P, V, "a", "sid-a", 42).unwrap();
		s.create_file(P, V, "f1").unwrap();
		s.assign_block(P, V, "f1", "a", 0).unwrap();
		s.finalize_file(P, V, "f1", None).unwrap();
		assert_eq!(s.file_length(P, V, "f1").unwrap(), 42);
	}

	/// Invalid blocks are excluded from the finalize walk: a bad block at offset 0 still finalizes
	/// as empty/zero-length rather than counting toward `expected`.
	#[test]
	fn invalid_blocks_excluded_from_finalize() {
		let s = store();
		s.create_vault(P, V).unwrap();
		s.register_block(P, V, "a", "sid-a", 10).unwrap();
		s.mark_block_as_bad(P, V, "a").unwrap();
		s.create_file(P, V, "f1").unwrap();
		s.assign_block(P, V, "f1", "a", 0).unwrap();
		s.finalize_file(P, V, "f1", Some(0)).unwrap();
		assert_eq!(s.file_length(P, V, "f1").unwrap(), 0);
	}

	/// `unregister_block` also removes the storage-id secondary index, matching `register_block`'s
	/// bidirectional insert.
	#[test]
	fn unregister_removes_storage_id_index() {
		let s = store();
		s.create_vault(P, V).unwrap();
		s.register_block(P, V, "a", "sid-a", 10).unwrap();
		assert_eq!(s.get_block_metadata_id(P, V, "sid-a").unwrap(), Some("a".to_string()));
		s.unregister_block(P, V, "a").unwrap();
		assert_eq!(s.get_block_metadata_id(P, V, "sid-a").unwrap(), None);
	}

	/// `vault_health` counts distinct bad blocks and the files that reference them.
	#[test]
	fn vault_health_counts_bad_blocks_and_files() {
		let s = store();
		s.create_vault(P, V).unwrap();
		s.register_block(P, V, "a", "sid-a", 10).unwrap();
		s.register_block(P, V, "b", "sid-b", 10).unwrap();
		s.create_file(P, V, "f1").unwrap();
		s.assign_block(P, V, "f1", "a", 0).unwrap();
		s.assign_block(P, V, "f1", "b", 10).unwrap();

		s.mark_block_as_bad(P, V, "a").unwrap();
		let (bad_blocks, bad_files) = s.vault_health(P, V).unwrap();
		assert_eq!(bad_blocks, 1);
		assert_eq!(bad_files, 1);
	}
}
