//! In-memory storage engine, backed by `BTreeMap`.
//!
//! Keeps every tree as a sorted map guarded by a single `RwLock`, so range scans return keys
//! in the lexicographic order the metadata layer's pagination depends on. Meant for tests and
//! ephemeral deployments (selected by the `:memory:` metadata path), not for production use: a
//! process restart loses everything, and the one lock serializes all trees together.

use core::ops::Bound;

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::{
	Db, Error, IDb, ITx, ITxFn, Result, TxError, TxFnResult, TxOpError, TxOpResult, TxResult,
	TxValueIter, Value, ValueIter,
};

pub struct MemDb(RwLock<MemDbInner>);

#[derive(Default)]
struct MemDbInner {
	trees: Vec<(String, BTreeMap<Value, Value>)>,
}

impl MemDb {
	pub fn new() -> Db {
		Db(Arc::new(Self(RwLock::new(MemDbInner::default()))))
	}
}

impl MemDbInner {
	fn tree_name(&self, i: usize) -> Option<String> {
		self.trees.get(i).map(|(n, _)| n.clone())
	}
}

fn not_found_tree() -> Error {
	Error("invalid tree id".into())
}

impl IDb for MemDb {
	fn engine(&self) -> String {
		"in-memory (BTreeMap)".into()
	}

	fn open_tree(&self, name: &str) -> Result<usize> {
		let mut this = self.0.write().unwrap();
		if let Some(i) = this.trees.iter().position(|(n, _)| n == name) {
			Ok(i)
		} else {
			let i = this.trees.len();
			this.trees.push((name.to_string(), BTreeMap::new()));
			Ok(i)
		}
	}

	fn list_trees(&self) -> Result<Vec<String>> {
		let this = self.0.read().unwrap();
		Ok(this.trees.iter().map(|(n, _)| n.clone()).collect())
	}

	fn tree_name(&self, tree: usize) -> Option<String> {
		self.0.read().unwrap().tree_name(tree)
	}

	fn get(&self, tree: usize, key: &[u8]) -> Result<Option<Value>> {
		let this = self.0.read().unwrap();
		let (_, map) = this.trees.get(tree).ok_or_else(not_found_tree)?;
		Ok(map.get(key).cloned())
	}

	fn len(&self, tree: usize) -> Result<usize> {
		let this = self.0.read().unwrap();
		let (_, map) = this.trees.get(tree).ok_or_else(not_found_tree)?;
		Ok(map.len())
	}

	fn fast_len(&self, tree: usize) -> Result<Option<usize>> {
		self.len(tree).map(Some)
	}

	fn insert(&self, tree: usize, key: &[u8], value: &[u8]) -> Result<Option<Value>> {
		let mut this = self.0.write().unwrap();
		let (_, map) = this.trees.get_mut(tree).ok_or_else(not_found_tree)?;
		Ok(map.insert(key.to_vec(), value.to_vec()))
	}

	fn remove(&self, tree: usize, key: &[u8]) -> Result<Option<Value>> {
		let mut this = self.0.write().unwrap();
		let (_, map) = this.trees.get_mut(tree).ok_or_else(not_found_tree)?;
		Ok(map.remove(key))
	}

	fn clear(&self, tree: usize) -> Result<()> {
		let mut this = self.0.write().unwrap();
		let (_, map) = this.trees.get_mut(tree).ok_or_else(not_found_tree)?;
		map.clear();
		Ok(())
	}

	fn iter(&self, tree: usize) -> Result<ValueIter<'_>> {
		self.range(tree, Bound::Unbounded, Bound::Unbounded)
	}

	fn iter_rev(&self, tree: usize) -> Result<ValueIter<'_>> {
		self.range_rev(tree, Bound::Unbounded, Bound::Unbounded)
	}

	fn range<'r>(
		&self,
		tree: usize,
		low: Bound<&'r [u8]>,
		high: Bound<&'r [u8]>,
	) -> Result<ValueIter<'_>> {
		let this = self.0.read().unwrap();
		let (_, map) = this.trees.get(tree).ok_or_else(not_found_tree)?;
		let items: Vec<(Value, Value)> = map
			.range((owned_bound(low), owned_bound(high)))
			.map(|(k, v)| (k.clone(), v.clone()))
			.collect();
		Ok(Box::new(items.into_iter().map(Ok)))
	}

	fn range_rev<'r>(
		&self,
		tree: usize,
		low: Bound<&'r [u8]>,
		high: Bound<&'r [u8]>,
	) -> Result<ValueIter<'_>> {
		let this = self.0.read().unwrap();
		let (_, map) = this.trees.get(tree).ok_or_else(not_found_tree)?;
		let items: Vec<(Value, Value)> = map
			.range((owned_bound(low), owned_bound(high)))
			.rev()
			.map(|(k, v)| (k.clone(), v.clone()))
			.collect();
		Ok(Box::new(items.into_iter().map(Ok)))
	}

	fn transaction(&self, f: &dyn ITxFn) -> TxResult<(), ()> {
		let mut this = self.0.write().unwrap();
		let mut tx = MemTx {
			guard: &mut this,
			snapshot: None,
		};
		match f.try_on(&mut tx) {
			TxFnResult::Ok => {
				tx.commit();
				Ok(())
			}
			TxFnResult::Abort => {
				tx.rollback();
				Err(TxError::Abort(()))
			}
			TxFnResult::DbErr => {
				tx.rollback();
				Err(TxError::Db(Error(
					"(this message will be discarded)".into(),
				)))
			}
		}
	}
}

fn owned_bound(b: Bound<&[u8]>) -> Bound<Value> {
	match b {
		Bound::Included(v) => Bound::Included(v.to_vec()),
		Bound::Excluded(v) => Bound::Excluded(v.to_vec()),
		Bound::Unbounded => Bound::Unbounded,
	}
}

// ---- transactions ----
//
// Writes go straight into the live trees; a snapshot of the trees the transaction touched is
// taken lazily on first write so `rollback` can restore it. There's no MVCC: the write lock on
// MemDbInner is held for the whole transaction, so concurrent transactions serialize on it same
// as sqlite's single-writer model.

struct MemTx<'a> {
	guard: &'a mut MemDbInner,
	snapshot: Option<Vec<(String, BTreeMap<Value, Value>)>>,
}

impl<'a> MemTx<'a> {
	fn snapshot_once(&mut self) {
		if self.snapshot.is_none() {
			self.snapshot = Some(self.guard.trees.clone());
		}
	}

	fn commit(self) {}

	fn rollback(self) {
		if let Some(snap) = self.snapshot {
			self.guard.trees = snap;
		}
	}
}

impl<'a> ITx for MemTx<'a> {
	fn get(&self, tree: usize, key: &[u8]) -> TxOpResult<Option<Value>> {
		let (_, map) = self
			.guard
			.trees
			.get(tree)
			.ok_or_else(|| TxOpError(not_found_tree()))?;
		Ok(map.get(key).cloned())
	}

	fn len(&self, tree: usize) -> TxOpResult<usize> {
		let (_, map) = self
			.guard
			.trees
			.get(tree)
			.ok_or_else(|| TxOpError(not_found_tree()))?;
		Ok(map.len())
	}

	fn insert(&mut self, tree: usize, key: &[u8], value: &[u8]) -> TxOpResult<Option<Value>> {
		self.snapshot_once();
		let (_, map) = self
			.guard
			.trees
			.get_mut(tree)
			.ok_or_else(|| TxOpError(not_found_tree()))?;
		Ok(map.insert(key.to_vec(), value.to_vec()))
	}

	fn remove(&mut self, tree: usize, key: &[u8]) -> TxOpResult<Option<Value>> {
		self.snapshot_once();
		let (_, map) = self
			.guard
			.trees
			.get_mut(tree)
			.ok_or_else(|| TxOpError(not_found_tree()))?;
		Ok(map.remove(key))
	}

	fn clear(&mut self, tree: usize) -> TxOpResult<()> {
		self.snapshot_once();
		let (_, map) = self
			.guard
			.trees
			.get_mut(tree)
			.ok_or_else(|| TxOpError(not_found_tree()))?;
		map.clear();
		Ok(())
	}

	fn iter(&self, tree: usize) -> TxOpResult<TxValueIter<'_>> {
		self.range(tree, Bound::Unbounded, Bound::Unbounded)
	}

	fn iter_rev(&self, tree: usize) -> TxOpResult<TxValueIter<'_>> {
		self.range_rev(tree, Bound::Unbounded, Bound::Unbounded)
	}

	fn range<'r>(
		&self,
		tree: usize,
		low: Bound<&'r [u8]>,
		high: Bound<&'r [u8]>,
	) -> TxOpResult<TxValueIter<'_>> {
		let (_, map) = self
			.guard
			.trees
			.get(tree)
			.ok_or_else(|| TxOpError(not_found_tree()))?;
		let items: Vec<(Value, Value)> = map
			.range((owned_bound(low), owned_bound(high)))
			.map(|(k, v)| (k.clone(), v.clone()))
			.collect();
		Ok(Box::new(items.into_iter().map(Ok)))
	}

	fn range_rev<'r>(
		&self,
		tree: usize,
		low: Bound<&'r [u8]>,
		high: Bound<&'r [u8]>,
	) -> TxOpResult<TxValueIter<'_>> {
		let (_, map) = self
			.guard
			.trees
			.get(tree)
			.ok_or_else(|| TxOpError(not_found_tree()))?;
		let items: Vec<(Value, Value)> = map
			.range((owned_bound(low), owned_bound(high)))
			.rev()
			.map(|(k, v)| (k.clone(), v.clone()))
			.collect();
		Ok(Box::new(items.into_iter().map(Ok)))
	}
}
