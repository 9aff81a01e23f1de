//! Thread-safe in-memory [`SessionStore`] implementation for embedding, demos, and tests.

// self
use crate::{
	_prelude::*,
	auth::{Session, StorageEntries, TokenPair},
	store::{self, CompareAndSwapOutcome, SessionStore, StoreFuture},
};

type EntryMap = Arc<RwLock<StorageEntries>>;

/// Storage backend that keeps session entries in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(EntryMap);
impl MemoryStore {
	/// Creates a store already holding `session`.
	pub fn with_session(session: &Session) -> Result<Self, store::StoreError> {
		let this = Self::default();

		store::write_session(&mut this.0.write(), session)?;

		Ok(this)
	}

	/// Returns the raw value stored under `key`.
	pub fn get_item(&self, key: &str) -> Option<String> {
		self.0.read().get(key).cloned()
	}

	/// Returns a snapshot of every stored entry.
	pub fn entries(&self) -> StorageEntries {
		self.0.read().clone()
	}
}
impl SessionStore for MemoryStore {
	fn load(&self) -> StoreFuture<'_, Option<Session>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Session::from_entries(&map.read())) })
	}

	fn save(&self, session: Session) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { store::write_session(&mut map.write(), &session) })
	}

	fn compare_and_swap_tokens<'a>(
		&'a self,
		expected_refresh: &'a str,
		tokens: TokenPair,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		let map = self.0.clone();

		Box::pin(async move { Ok(store::swap_tokens(&mut map.write(), expected_refresh, tokens)) })
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			store::clear_session(&mut map.write());

			Ok(())
		})
	}
}
