// self
use crate::{
	_prelude::*,
	config::{ClientConfig, Endpoints},
};

/// Errors raised while constructing or validating client configurations.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ClientConfigError {
	/// Base URL could not be parsed.
	#[error("Base URL `{url}` is invalid: {reason}.")]
	InvalidBaseUrl {
		/// Raw value supplied to the builder.
		url: String,
		/// Parser message.
		reason: String,
	},
	/// Base URL must be an `http` or `https` URL that can carry paths.
	#[error("Base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Base URL that failed validation.
		url: String,
	},
	/// Base URL must not carry a query or fragment; endpoints are joined onto its path.
	#[error("Base URL must not contain a query or fragment: {url}.")]
	BaseUrlHasQuery {
		/// Base URL that failed validation.
		url: String,
	},
	/// Timeouts and intervals must be non-zero.
	#[error("The {field} duration must be greater than zero.")]
	ZeroDuration {
		/// Which duration failed validation.
		field: &'static str,
	},
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Raw base URL; parsed and normalized by [`ClientConfigBuilder::build`].
	pub base_url: String,
	/// Endpoint table.
	pub endpoints: Endpoints,
	/// Timeout applied to JSON requests.
	pub request_timeout: StdDuration,
	/// Timeout applied to uploads and downloads.
	pub transfer_timeout: StdDuration,
	/// Interval between status polls.
	pub poll_interval: StdDuration,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with the defaults.
	pub fn new() -> Self {
		Self {
			base_url: super::DEFAULT_BASE_URL.into(),
			endpoints: Endpoints::default(),
			request_timeout: ClientConfig::DEFAULT_REQUEST_TIMEOUT,
			transfer_timeout: ClientConfig::DEFAULT_TRANSFER_TIMEOUT,
			poll_interval: ClientConfig::DEFAULT_POLL_INTERVAL,
		}
	}

	/// Sets the API root, e.g. `https://analyzer.example.com/api`.
	pub fn base_url(mut self, url: impl Into<String>) -> Self {
		self.base_url = url.into();

		self
	}

	/// Overrides the endpoint table.
	pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
		self.endpoints = endpoints;

		self
	}

	/// Overrides the JSON request timeout.
	pub fn request_timeout(mut self, timeout: StdDuration) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Overrides the upload/download timeout.
	pub fn transfer_timeout(mut self, timeout: StdDuration) -> Self {
		self.transfer_timeout = timeout;

		self
	}

	/// Overrides the status poll interval.
	pub fn poll_interval(mut self, interval: StdDuration) -> Self {
		self.poll_interval = interval;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ClientConfigError> {
		let base_url = normalize_base_url(&self.base_url)?;

		for (field, value) in [
			("request timeout", self.request_timeout),
			("transfer timeout", self.transfer_timeout),
			("poll interval", self.poll_interval),
		] {
			if value.is_zero() {
				return Err(ClientConfigError::ZeroDuration { field });
			}
		}

		Ok(ClientConfig {
			base_url,
			endpoints: self.endpoints,
			request_timeout: self.request_timeout,
			transfer_timeout: self.transfer_timeout,
			poll_interval: self.poll_interval,
		})
	}
}
impl Default for ClientConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

fn normalize_base_url(raw: &str) -> Result<Url, ClientConfigError> {
	let mut url = Url::parse(raw.trim()).map_err(|e| ClientConfigError::InvalidBaseUrl {
		url: raw.to_owned(),
		reason: e.to_string(),
	})?;

	if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
		return Err(ClientConfigError::UnsupportedScheme { url: url.to_string() });
	}
	if url.query().is_some() || url.fragment().is_some() {
		return Err(ClientConfigError::BaseUrlHasQuery { url: url.to_string() });
	}
	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());

		url.set_path(&path);
	}

	Ok(url)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn builder_appends_trailing_slash() {
		let config = ClientConfig::builder()
			.base_url("https://analyzer.example.com/api")
			.build()
			.expect("Builder should accept an https base URL.");

		assert_eq!(config.base_url.as_str(), "https://analyzer.example.com/api/");
		assert_eq!(
			config.url_for("datasets/").expect("Dataset path should resolve.").as_str(),
			"https://analyzer.example.com/api/datasets/",
		);
	}

	#[test]
	fn builder_rejects_bad_urls_and_zero_durations() {
		assert!(matches!(
			ClientConfig::builder().base_url("not a url").build(),
			Err(ClientConfigError::InvalidBaseUrl { .. })
		));
		assert!(matches!(
			ClientConfig::builder().base_url("ftp://example.com/api/").build(),
			Err(ClientConfigError::UnsupportedScheme { .. })
		));
		assert!(matches!(
			ClientConfig::builder().base_url("http://example.com/api/?x=1").build(),
			Err(ClientConfigError::BaseUrlHasQuery { .. })
		));
		assert_eq!(
			ClientConfig::builder().poll_interval(StdDuration::ZERO).build(),
			Err(ClientConfigError::ZeroDuration { field: "poll interval" }),
		);
	}
}
