//! Composite key encoding for the four entity trees plus the storage-id secondary index.
//!
//! Keys are NUL-separated byte strings so lexicographic order in the underlying storage engine's
//! trees matches the ascending id order that `marker`/`limit` pagination requires. Offsets are
//! encoded big-endian fixed-width so numeric and lexicographic order coincide. Callers are
//! expected to pass ids that never contain the NUL byte (0x00); this is a documented assumption,
//! not validated here.

const SEP: u8 = 0;

pub fn vault_key(project_id: &str, vault_id: &str) -> Vec<u8> {
	join(&[project_id.as_bytes(), vault_id.as_bytes()])
}

pub fn vault_prefix(project_id: &str) -> Vec<u8> {
	join1(project_id.as_bytes())
}

pub fn file_key(project_id: &str, vault_id: &str, file_id: &str) -> Vec<u8> {
	join(&[project_id.as_bytes(), vault_id.as_bytes(), file_id.as_bytes()])
}

/// Prefix of every `files` key in this vault, including the trailing separator.
pub fn file_prefix(project_id: &str, vault_id: &str) -> Vec<u8> {
	let mut k = join(&[project_id.as_bytes(), vault_id.as_bytes()]);
	k.push(SEP);
	k
}

pub fn block_key(project_id: &str, vault_id: &str, block_id: &str) -> Vec<u8> {
	join(&[project_id.as_bytes(), vault_id.as_bytes(), block_id.as_bytes()])
}

/// Prefix of every `blocks` key in this vault, including the trailing separator.
pub fn block_prefix(project_id: &str, vault_id: &str) -> Vec<u8> {
	let mut k = join(&[project_id.as_bytes(), vault_id.as_bytes()]);
	k.push(SEP);
	k
}

pub fn storage_id_key(project_id: &str, vault_id: &str, storage_id: &str) -> Vec<u8> {
	join(&[project_id.as_bytes(), vault_id.as_bytes(), storage_id.as_bytes()])
}

/// `fileblocks` key: project \0 vault \0 file \0 be_u64(offset) \0 block_id.
/// Including block_id keeps the same (block_id, offset) assignment idempotent while still
/// allowing the same block at two different offsets in one file.
pub fn fileblock_key(project_id: &str, vault_id: &str, file_id: &str, offset: u64, block_id: &str) -> Vec<u8> {
	let mut k = join(&[project_id.as_bytes(), vault_id.as_bytes(), file_id.as_bytes()]);
	k.push(SEP);
	k.extend_from_slice(&offset.to_be_bytes());
	k.push(SEP);
	k.extend_from_slice(block_id.as_bytes());
	k
}

pub fn fileblock_prefix(project_id: &str, vault_id: &str, file_id: &str) -> Vec<u8> {
	let mut k = join(&[project_id.as_bytes(), vault_id.as_bytes(), file_id.as_bytes()]);
	k.push(SEP);
	k
}

/// Prefix restricting a `fileblocks` scan to offsets `>= offset`.
pub fn fileblock_offset_floor(project_id: &str, vault_id: &str, file_id: &str, offset: u64) -> Vec<u8> {
	let mut k = fileblock_prefix(project_id, vault_id, file_id);
	k.extend_from_slice(&offset.to_be_bytes());
	k
}

/// Parses `(offset, block_id)` back out of a `fileblocks` key, given the known prefix length.
pub fn parse_fileblock_key(key: &[u8], prefix_len: usize) -> Option<(u64, String)> {
	let rest = key.get(prefix_len..)?;
	if rest.len() < 8 + 1 {
		return None;
	}
	let offset = u64::from_be_bytes(rest[0..8].try_into().ok()?);
	let block_id = std::str::from_utf8(&rest[9..]).ok()?.to_string();
	Some((offset, block_id))
}

/// Strips a known prefix off a key and returns the remaining id as a `String`.
pub fn strip_prefix_id(key: &[u8], prefix_len: usize) -> Option<String> {
	std::str::from_utf8(key.get(prefix_len..)?).ok().map(String::from)
}

fn join(parts: &[&[u8]]) -> Vec<u8> {
	let mut out = Vec::new();
	for (i, p) in parts.iter().enumerate() {
		if i > 0 {
			out.push(SEP);
		}
		out.extend_from_slice(p);
	}
	out
}

fn join1(part: &[u8]) -> Vec<u8> {
	let mut out = part.to_vec();
	out.push(SEP);
	out
}

/// Byte string that is strictly greater than any key sharing this exact prefix, for use as the
/// exclusive upper bound of a `range(prefix..upper_bound(prefix))` scan.
pub fn prefix_upper_bound(prefix: &[u8]) -> Vec<u8> {
	let mut up = prefix.to_vec();
	for i in (0..up.len()).rev() {
		if up[i] != 0xff {
			up[i] += 1;
			up.truncate(i + 1);
			return up;
		}
	}
	// All 0xff (or empty): no finite upper bound; caller should use Bound::Unbounded instead.
	up.push(0xff);
	up
}
