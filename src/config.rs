//! Validated client configuration: base URL, endpoint table, timeouts, and poll cadence.
//!
//! Every endpoint is stored as a path relative to [`ClientConfig::base_url`], so pointing the
//! client at another deployment only requires a different base URL.

/// Builder API for assembling client configurations.
pub mod builder;

pub use builder::*;

// std
use std::sync::LazyLock;
// self
use crate::{_prelude::*, auth::DatasetId, error::ConfigError};

/// Default API root of a local deployment.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/";

// Parsed once on first use.
static DEFAULT_URL: LazyLock<Url> = LazyLock::new(|| {
	Url::parse(DEFAULT_BASE_URL).expect("`DEFAULT_BASE_URL` must be an absolute URL.")
});

/// Relative endpoint paths used by the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
	/// `POST` account creation.
	pub register: String,
	/// `POST` credential login (`login_id` + `password`).
	pub login: String,
	/// `POST` access-token refresh.
	pub token_refresh: String,
	/// `POST` refresh-token blacklisting.
	pub logout: String,
	/// `POST` password reset lookup.
	pub password_reset_request: String,
	/// `POST` password reset confirmation.
	pub password_reset_confirm: String,
	/// `POST` authenticated password change.
	pub change_password: String,
	/// `GET` authenticated user profile.
	pub profile: String,
	/// `POST` multipart dataset upload.
	pub upload_dataset: String,
	/// `GET` dataset list.
	pub datasets: String,
	/// `GET` dataset status; `{id}` is substituted.
	pub dataset_status: String,
	/// `GET` PDF report download; `{id}` is substituted.
	pub download_pdf: String,
}
impl Default for Endpoints {
	fn default() -> Self {
		Self {
			register: "auth/register/".into(),
			login: "auth/login/".into(),
			token_refresh: "auth/token/refresh/".into(),
			logout: "auth/logout/".into(),
			password_reset_request: "auth/password-reset-request/".into(),
			password_reset_confirm: "auth/password-reset-confirm/".into(),
			change_password: "auth/change-password/".into(),
			profile: "auth/profile/".into(),
			upload_dataset: "upload-dataset/".into(),
			datasets: "datasets/".into(),
			dataset_status: "dataset-status/{id}/".into(),
			download_pdf: "download-pdf/{id}/".into(),
		}
	}
}
impl Endpoints {
	/// Substitutes `{id}` in a dataset-scoped endpoint template.
	pub fn for_dataset(template: &str, id: DatasetId) -> String {
		template.replace("{id}", &id.to_string())
	}
}

/// Immutable configuration consumed by the gateway, API client, and pollers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// API root; always ends with `/` so relative paths join underneath it.
	pub base_url: Url,
	/// Endpoint paths relative to the base URL.
	pub endpoints: Endpoints,
	/// Timeout applied to JSON requests.
	pub request_timeout: StdDuration,
	/// Timeout applied to uploads and report downloads.
	pub transfer_timeout: StdDuration,
	/// Fixed interval between status polls.
	pub poll_interval: StdDuration,
}
impl ClientConfig {
	/// Default JSON request timeout.
	pub const DEFAULT_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(5);
	/// Default upload/download timeout.
	pub const DEFAULT_TRANSFER_TIMEOUT: StdDuration = StdDuration::from_secs(120);
	/// Default status poll interval.
	pub const DEFAULT_POLL_INTERVAL: StdDuration = StdDuration::from_secs(3);

	/// Creates a new builder seeded with the defaults.
	pub fn builder() -> ClientConfigBuilder {
		ClientConfigBuilder::new()
	}

	/// Resolves a relative endpoint path against the base URL.
	pub fn url_for(&self, path: &str) -> Result<Url, ConfigError> {
		self.base_url
			.join(path.trim_start_matches('/'))
			.map_err(|source| ConfigError::InvalidEndpoint { path: path.to_owned(), source })
	}
}
impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			base_url: DEFAULT_URL.clone(),
			endpoints: Endpoints::default(),
			request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
			transfer_timeout: Self::DEFAULT_TRANSFER_TIMEOUT,
			poll_interval: Self::DEFAULT_POLL_INTERVAL,
		}
	}
}
