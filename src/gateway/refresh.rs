//! Single-flight access-token refresh.
//!
//! A 401 makes the request attach to the refresh cell currently installed in the gateway's slot
//! (installing one if the slot is empty). The first waiter runs the initializer; everyone else
//! awaits the same outcome. The initializer re-reads the store before calling the network, so a
//! request that raced a completed refresh simply picks up the already rotated token. Rotated
//! tokens are written with a compare-and-swap on the refresh token, which keeps a concurrent
//! logout or re-login from being overwritten.
//!
//! A cycle that finds no stored session fails with [`RefreshFailure::NoSession`] and leaves the
//! store and navigator alone: whatever removed the session (a failed refresh whose slot was
//! already released, or a logout) has redirected once already.
//!
//! Dropping the waiter that runs the initializer does not poison the cell: the next waiter
//! runs its own initializer, which starts with the same store check.

// self
use crate::{
	_prelude::*,
	auth::{Session, TokenPair, TokenSecret},
	ext::LoginRedirect,
	gateway::Gateway,
	http::{ApiRequest, ApiTransport},
	obs::{self, OpKind, OpOutcome, OpSpan},
	store::CompareAndSwapOutcome,
};

/// Why a token refresh could not produce a usable access token.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshFailure {
	/// The refresh endpoint answered with a non-success status.
	#[error("refresh token rejected with status {status}")]
	Rejected {
		/// HTTP status of the refresh response.
		status: u16,
	},
	/// The refresh call never produced a response.
	#[error("refresh call failed: {message}")]
	Network {
		/// Transport error description.
		message: String,
	},
	/// The refresh response could not be decoded.
	#[error("refresh response was malformed: {message}")]
	Malformed {
		/// Decoding error description.
		message: String,
	},
	/// No session was stored, or it was removed while the refresh was running.
	#[error("no session is stored")]
	NoSession,
	/// The session store failed.
	#[error("session storage failed: {message}")]
	Storage {
		/// Store error description.
		message: String,
	},
}

#[derive(Serialize)]
struct RefreshBody<'a> {
	refresh: &'a str,
}

impl<T> Gateway<T>
where
	T: ?Sized + ApiTransport,
{
	/// Returns an access token newer than `stale`, joining the refresh already in flight if any.
	pub(crate) async fn refreshed_token(&self, stale: &TokenSecret) -> Result<TokenSecret> {
		let cell = self.refresh_cell();
		let outcome = cell.get_or_init(|| self.run_refresh(stale, &cell)).await;

		outcome.clone().map_err(|reason| Error::SessionExpired { reason })
	}

	async fn run_refresh(
		&self,
		stale: &TokenSecret,
		cell: &Arc<super::RefreshCell>,
	) -> Result<TokenSecret, RefreshFailure> {
		const KIND: OpKind = OpKind::Refresh;

		let span = OpSpan::new(KIND, "refresh_access_token");
		let outcome = span.instrument(self.rotate(stale)).await;

		match &outcome {
			// Cleared by an earlier failed cycle or a logout, both of which already redirected.
			Ok(_) | Err(RefreshFailure::NoSession) => {},
			Err(reason) => self.expire_session(reason).await,
		}

		// Leave the slot before the value is published so later 401s start a fresh cycle.
		self.release_refresh_cell(cell);

		outcome
	}

	async fn rotate(&self, stale: &TokenSecret) -> Result<TokenSecret, RefreshFailure> {
		const KIND: OpKind = OpKind::Refresh;

		let session = self.current_session().await?;

		if session.access_token != *stale {
			return Ok(session.access_token);
		}

		obs::record_op_outcome(KIND, OpOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		let result = self.call_refresh(&session).await;

		match &result {
			Ok(_) => {
				obs::record_op_outcome(KIND, OpOutcome::Success);
				self.refresh_metrics.record_success();
			},
			Err(_) => {
				obs::record_op_outcome(KIND, OpOutcome::Failure);
				self.refresh_metrics.record_failure();
			},
		}

		result
	}

	async fn call_refresh(&self, session: &Session) -> Result<TokenSecret, RefreshFailure> {
		let expected_refresh = session.refresh_token.expose();
		let request = ApiRequest::post(self.config.endpoints.token_refresh.as_str())
			.json(&RefreshBody { refresh: expected_refresh })
			.map_err(|e| RefreshFailure::Malformed { message: e.to_string() })?;
		let response = self
			.send_anonymous(request)
			.await
			.map_err(|e| RefreshFailure::Network { message: e.to_string() })?;

		if !response.is_success() {
			return Err(RefreshFailure::Rejected { status: response.status });
		}

		let tokens = response
			.json::<TokenPair>()
			.map_err(|e| RefreshFailure::Malformed { message: e.to_string() })?;
		let access = tokens.access.clone();
		let outcome = self
			.store
			.compare_and_swap_tokens(expected_refresh, tokens)
			.await
			.map_err(|e| RefreshFailure::Storage { message: e.to_string() })?;

		match outcome {
			CompareAndSwapOutcome::Updated => {
				obs::info_event(OpKind::Refresh, "Access token refreshed.", &"updated");

				Ok(access)
			},
			// A new login replaced the session mid-refresh; its token wins.
			CompareAndSwapOutcome::RefreshMismatch =>
				self.current_session().await.map(|session| session.access_token),
			CompareAndSwapOutcome::Missing => Err(RefreshFailure::NoSession),
		}
	}

	async fn current_session(&self) -> Result<Session, RefreshFailure> {
		self.store
			.load()
			.await
			.map_err(|e| RefreshFailure::Storage { message: e.to_string() })?
			.ok_or(RefreshFailure::NoSession)
	}

	async fn expire_session(&self, reason: &RefreshFailure) {
		obs::warn_event(OpKind::Refresh, "Token refresh failed; clearing session.", reason);

		if let Err(e) = self.store.clear().await {
			obs::warn_event(OpKind::Refresh, "Failed to clear session after refresh failure.", &e);
		}

		self.navigator.redirect_to_login(LoginRedirect::RefreshFailed);
	}
}
