//! Persisted session model and its key/value storage layout.

// self
use crate::{
	_prelude::*,
	auth::token::{TokenPair, TokenSecret},
};

/// Storage key holding the access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Storage key holding the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
/// Storage key holding the JSON-encoded [`UserProfile`].
pub const USER_KEY: &str = "user";
/// Every key owned by a session.
pub const SESSION_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY];

/// Raw key/value entries as they sit in client-local storage.
pub type StorageEntries = BTreeMap<String, String>;

/// Account details returned by login, registration, and the profile endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
	/// Server-side user id.
	pub id: u64,
	/// Login name.
	pub username: String,
	/// Contact address, also accepted as a login id.
	#[serde(default)]
	pub email: String,
	/// Given name.
	#[serde(default)]
	pub first_name: String,
	/// Family name.
	#[serde(default)]
	pub last_name: String,
}

/// Authenticated session: both tokens plus the cached profile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
	/// Bearer credential attached to every authenticated request.
	pub access_token: TokenSecret,
	/// Credential exchanged for new access tokens.
	pub refresh_token: TokenSecret,
	/// Cached profile; absent when the stored entry is missing or unreadable.
	pub user: Option<UserProfile>,
}
impl Session {
	/// Creates a session without a cached profile.
	pub fn new(access_token: TokenSecret, refresh_token: TokenSecret) -> Self {
		Self { access_token, refresh_token, user: None }
	}

	/// Attaches the cached profile.
	pub fn with_user(mut self, user: UserProfile) -> Self {
		self.user = Some(user);

		self
	}

	/// Rebuilds a session from storage entries.
	///
	/// Returns `None` unless both token entries are present and non-empty.
	pub fn from_entries(entries: &StorageEntries) -> Option<Self> {
		let token = |key: &str| {
			entries.get(key).filter(|value| !value.is_empty()).map(TokenSecret::new)
		};
		let access_token = token(ACCESS_TOKEN_KEY)?;
		let refresh_token = token(REFRESH_TOKEN_KEY)?;
		let user = entries.get(USER_KEY).and_then(|raw| serde_json::from_str(raw).ok());

		Some(Self { access_token, refresh_token, user })
	}

	/// Writes the session into storage entries, replacing any previous session keys.
	pub fn write_entries(&self, entries: &mut StorageEntries) -> Result<(), serde_json::Error> {
		entries.insert(ACCESS_TOKEN_KEY.into(), self.access_token.expose().into());
		entries.insert(REFRESH_TOKEN_KEY.into(), self.refresh_token.expose().into());

		match &self.user {
			Some(user) => {
				entries.insert(USER_KEY.into(), serde_json::to_string(user)?);
			},
			None => {
				entries.remove(USER_KEY);
			},
		}

		Ok(())
	}

	/// Applies refreshed tokens, keeping the current refresh token unless it was rotated.
	pub fn apply_tokens(&mut self, tokens: TokenPair) {
		self.access_token = tokens.access;

		if let Some(refresh) = tokens.refresh {
			self.refresh_token = refresh;
		}
	}
}

/// Body returned by the login and registration endpoints.
#[derive(Clone, Debug, Deserialize)]
pub struct AuthResponse {
	/// Authenticated account.
	pub user: UserProfile,
	/// Issued tokens.
	pub tokens: IssuedTokens,
	/// Human-readable confirmation.
	#[serde(default)]
	pub message: Option<String>,
}
impl AuthResponse {
	/// Converts the response into a storable session.
	pub fn into_session(self) -> Session {
		Session::new(self.tokens.access, self.tokens.refresh).with_user(self.user)
	}
}

/// Token pair as issued on login/registration, where both tokens are always present.
#[derive(Clone, Debug, Deserialize)]
pub struct IssuedTokens {
	/// Access token.
	pub access: TokenSecret,
	/// Refresh token.
	pub refresh: TokenSecret,
}
