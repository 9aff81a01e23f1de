//! Authenticated request gateway.
//!
//! Every API call goes through [`Gateway::send`], which attaches the stored access token and
//! handles the `401 -> refresh -> replay` cycle. Concurrent requests that hit a 401 share one
//! refresh (see [`refresh`]), so at most one refresh call is in flight at any time and every
//! request is replayed at most once.

pub mod refresh;

mod metrics;

pub use metrics::RefreshMetrics;
pub use refresh::RefreshFailure;

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::ClientConfig,
	error::TransportError,
	ext::{LoginRedirect, Navigator, NoopNavigator},
	http::{
		AUTHORIZATION, ApiRequest, ApiResponse, ApiTransport, CONTENT_TYPE, JSON_CONTENT_TYPE,
		OutboundRequest,
	},
	store::SessionStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

type RefreshCell = AsyncOnceCell<Result<TokenSecret, RefreshFailure>>;

#[cfg(feature = "reqwest")]
/// Gateway specialized for the crate's default reqwest transport.
pub type ReqwestGateway = Gateway<ReqwestHttpClient>;

/// Sends API requests with bearer authorization and transparent token refresh.
///
/// The gateway owns no session state of its own: tokens live in the injected
/// [`SessionStore`], and redirects are delegated to the injected [`Navigator`]. Clones share the
/// transport, store, metrics, and the in-flight refresh.
pub struct Gateway<T>
where
	T: ?Sized + ApiTransport,
{
	/// Transport used for every outbound request, including refreshes.
	pub transport: Arc<T>,
	/// Session storage read before each request and rewritten by refreshes.
	pub store: Arc<dyn SessionStore>,
	/// Hook invoked when the user must log in again.
	pub navigator: Arc<dyn Navigator>,
	/// Base URL, endpoints, and timeouts.
	pub config: Arc<ClientConfig>,
	/// Shared counters for refresh network calls.
	pub refresh_metrics: Arc<RefreshMetrics>,
	refresh_slot: Arc<Mutex<Option<Arc<RefreshCell>>>>,
}
impl<T> Gateway<T>
where
	T: ?Sized + ApiTransport,
{
	/// Creates a gateway from its collaborators.
	pub fn new(
		config: impl Into<Arc<ClientConfig>>,
		transport: impl Into<Arc<T>>,
		store: Arc<dyn SessionStore>,
		navigator: Arc<dyn Navigator>,
	) -> Self {
		Self {
			transport: transport.into(),
			store,
			navigator,
			config: config.into(),
			refresh_metrics: Default::default(),
			refresh_slot: Default::default(),
		}
	}

	/// Creates a gateway that never navigates.
	pub fn headless(
		config: impl Into<Arc<ClientConfig>>,
		transport: impl Into<Arc<T>>,
		store: Arc<dyn SessionStore>,
	) -> Self {
		Self::new(config, transport, store, Arc::new(NoopNavigator))
	}

	/// Sends an authenticated request.
	///
	/// Without a stored session the navigator is asked to show the login view and a synthetic 401
	/// is returned without touching the network. A 401 from the server triggers (or joins) a
	/// token refresh, after which the request is replayed once; a 401 on the replay is returned
	/// as-is. Fails with [`Error::SessionExpired`] when the refresh fails.
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		let Some(session) = self.store.load().await? else {
			self.navigator.redirect_to_login(LoginRedirect::MissingSession);

			return Ok(ApiResponse::synthetic_unauthorized());
		};
		let stale = session.access_token;
		let response = self.dispatch(&request, Some(&stale)).await?;

		if !response.is_unauthorized() {
			return Ok(response);
		}

		let fresh = self.refreshed_token(&stale).await?;

		self.dispatch(&request, Some(&fresh)).await
	}

	/// Sends a request without authorization; used by login, registration, and password reset.
	pub async fn send_anonymous(&self, request: ApiRequest) -> Result<ApiResponse> {
		self.dispatch(&request, None).await
	}

	async fn dispatch(
		&self,
		request: &ApiRequest,
		bearer: Option<&TokenSecret>,
	) -> Result<ApiResponse> {
		let outbound = self.outbound(request, bearer)?;

		self.transport
			.execute(outbound)
			.await
			.map_err(|e| Error::Transport(TransportError::network(e)))
	}

	fn outbound(
		&self,
		request: &ApiRequest,
		bearer: Option<&TokenSecret>,
	) -> Result<OutboundRequest> {
		let url = self.config.url_for(&request.path)?;
		let mut headers = request.headers.clone();

		if let Some(token) = bearer {
			headers.insert(AUTHORIZATION.into(), token.bearer());
		}
		if !request.body.is_multipart() && !headers.contains_key(CONTENT_TYPE) {
			headers.insert(CONTENT_TYPE.into(), JSON_CONTENT_TYPE.into());
		}

		let timeout = if request.transfer {
			self.config.transfer_timeout
		} else {
			self.config.request_timeout
		};

		Ok(OutboundRequest {
			method: request.method,
			url,
			headers,
			body: request.body.clone(),
			timeout,
		})
	}

	/// Returns the refresh cell currently in flight, installing a new one if none is.
	fn refresh_cell(&self) -> Arc<RefreshCell> {
		self.refresh_slot.lock().get_or_insert_with(Default::default).clone()
	}

	/// Drops `cell` from the slot unless a newer refresh already replaced it.
	fn release_refresh_cell(&self, cell: &Arc<RefreshCell>) {
		let mut slot = self.refresh_slot.lock();

		if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, cell)) {
			*slot = None;
		}
	}
}
impl<T> Clone for Gateway<T>
where
	T: ?Sized + ApiTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			store: self.store.clone(),
			navigator: self.navigator.clone(),
			config: self.config.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			refresh_slot: self.refresh_slot.clone(),
		}
	}
}
impl<T> Debug for Gateway<T>
where
	T: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Gateway")
			.field("base_url", &self.config.base_url.as_str())
			.field("refresh_in_flight", &self.refresh_slot.lock().is_some())
			.finish()
	}
}
