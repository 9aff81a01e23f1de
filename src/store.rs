//! Storage contracts and built-in session store implementations.
//!
//! Stores keep the session as three string entries (`access_token`, `refresh_token`, `user`),
//! the same layout a browser client keeps in local storage. The gateway receives a store
//! explicitly instead of reaching for global state.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{
		ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, SESSION_KEYS, Session, StorageEntries, TokenPair,
	},
};

/// Boxed future returned by [`SessionStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract implemented by session stores.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Loads the current session, if both tokens are present.
	fn load(&self) -> StoreFuture<'_, Option<Session>>;

	/// Persists a session, replacing any previous one.
	fn save(&self, session: Session) -> StoreFuture<'_, ()>;

	/// Atomically applies refreshed tokens if the stored refresh token still matches.
	fn compare_and_swap_tokens<'a>(
		&'a self,
		expected_refresh: &'a str,
		tokens: TokenPair,
	) -> StoreFuture<'a, CompareAndSwapOutcome>;

	/// Removes every session key.
	fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Result of a token compare-and-swap attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareAndSwapOutcome {
	/// The refresh token matched and the tokens were replaced.
	Updated,
	/// A session exists but holds a different refresh token (a new login replaced it).
	RefreshMismatch,
	/// No session is stored (logout happened in the meantime).
	Missing,
}

/// Error type produced by [`SessionStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

pub(crate) fn write_session(entries: &mut StorageEntries, session: &Session) -> Result<(), StoreError> {
	session.write_entries(entries).map_err(|e| StoreError::Serialization {
		message: format!("Failed to encode session user: {e}"),
	})
}

pub(crate) fn swap_tokens(
	entries: &mut StorageEntries,
	expected_refresh: &str,
	tokens: TokenPair,
) -> CompareAndSwapOutcome {
	let Some(mut session) = Session::from_entries(entries) else {
		return CompareAndSwapOutcome::Missing;
	};

	if session.refresh_token.expose() != expected_refresh {
		return CompareAndSwapOutcome::RefreshMismatch;
	}

	session.apply_tokens(tokens);
	entries.insert(ACCESS_TOKEN_KEY.into(), session.access_token.expose().into());
	entries.insert(REFRESH_TOKEN_KEY.into(), session.refresh_token.expose().into());

	CompareAndSwapOutcome::Updated
}

pub(crate) fn clear_session(entries: &mut StorageEntries) {
	for key in SESSION_KEYS {
		entries.remove(key);
	}
}
