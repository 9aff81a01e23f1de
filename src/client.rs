//! Typed API surface for the CSV analysis service.
//!
//! [`AnalyzerClient`] pairs a [`Gateway`] with one async method per endpoint. Account and dataset
//! calls live in separate impl blocks but share the same success/error mapping.

mod auth;
mod datasets;

// self
use crate::{
	_prelude::*,
	config::ClientConfig,
	error::ApiError,
	ext::Navigator,
	gateway::Gateway,
	http::{ApiRequest, ApiResponse, ApiTransport},
	store::SessionStore,
};
#[cfg(feature = "reqwest")]
use crate::{error::ConfigError, http::ReqwestHttpClient};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestAnalyzerClient = AnalyzerClient<ReqwestHttpClient>;

/// Async client for account and dataset endpoints.
///
/// Cloning is cheap; clones share the transport, session store, and in-flight token refresh.
pub struct AnalyzerClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Gateway every call is sent through.
	pub gateway: Gateway<T>,
}
impl<T> AnalyzerClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_transport(
		config: ClientConfig,
		transport: impl Into<Arc<T>>,
		store: Arc<dyn SessionStore>,
		navigator: Arc<dyn Navigator>,
	) -> Self {
		Self { gateway: Gateway::new(config, transport, store, navigator) }
	}

	/// Wraps an existing gateway.
	pub fn from_gateway(gateway: Gateway<T>) -> Self {
		Self { gateway }
	}

	/// Configuration the client was built with.
	pub fn config(&self) -> &ClientConfig {
		&self.gateway.config
	}

	/// Session store backing the client.
	pub fn store(&self) -> &Arc<dyn SessionStore> {
		&self.gateway.store
	}

	/// Sends an authenticated request and decodes a JSON success body.
	pub(crate) async fn fetch_json<R>(&self, request: ApiRequest) -> Result<R>
	where
		R: for<'de> Deserialize<'de>,
	{
		let response = self.gateway.send(request).await?;

		authorized(response)?.json()
	}

	/// Sends an anonymous request and decodes a JSON success body.
	pub(crate) async fn fetch_json_anonymous<R>(&self, request: ApiRequest) -> Result<R>
	where
		R: for<'de> Deserialize<'de>,
	{
		let response = self.gateway.send_anonymous(request).await?;

		successful(response)?.json()
	}
}
#[cfg(feature = "reqwest")]
impl AnalyzerClient<ReqwestHttpClient> {
	/// Creates a client with its own reqwest transport.
	///
	/// The underlying reqwest client does not follow redirects, so an unexpected redirect from
	/// the API surfaces as an error status instead of a silently changed request.
	pub fn new(
		config: ClientConfig,
		store: Arc<dyn SessionStore>,
		navigator: Arc<dyn Navigator>,
	) -> Result<Self> {
		let http_client = ReqwestClient::builder()
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.map_err(ConfigError::from)?;

		Ok(Self::with_transport(
			config,
			ReqwestHttpClient::with_client(http_client),
			store,
			navigator,
		))
	}
}
impl<T> Clone for AnalyzerClient<T>
where
	T: ?Sized + ApiTransport,
{
	fn clone(&self) -> Self {
		Self { gateway: self.gateway.clone() }
	}
}
impl<T> Debug for AnalyzerClient<T>
where
	T: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AnalyzerClient").field("gateway", &self.gateway).finish()
	}
}

/// Maps an authenticated response: a 401 that survived the refresh becomes
/// [`Error::Unauthenticated`], any other failure status an [`ApiError`].
pub(crate) fn authorized(response: ApiResponse) -> Result<ApiResponse> {
	if response.is_unauthorized() {
		return Err(Error::Unauthenticated);
	}

	successful(response)
}

/// Maps any non-2xx response to an [`ApiError`].
pub(crate) fn successful(response: ApiResponse) -> Result<ApiResponse> {
	if response.is_success() {
		Ok(response)
	} else {
		Err(ApiError::from_body(response.status, &response.body).into())
	}
}
