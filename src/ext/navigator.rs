//! Login redirect hook invoked when the session is missing or can no longer be refreshed.

// self
use crate::_prelude::*;

/// Why the client is asking the host to show the login view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoginRedirect {
	/// An authenticated call was attempted without a stored session.
	MissingSession,
	/// The refresh token was rejected or the refresh call failed; the session was cleared.
	RefreshFailed,
	/// The user logged out.
	LoggedOut,
}
impl LoginRedirect {
	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::MissingSession => "missing_session",
			Self::RefreshFailed => "refresh_failed",
			Self::LoggedOut => "logged_out",
		}
	}
}
impl Display for LoginRedirect {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Contract implemented by hosts that route users to a login view.
///
/// Calls happen on whatever task observed the condition, so implementations should only
/// schedule the navigation and return quickly.
pub trait Navigator
where
	Self: Send + Sync,
{
	/// Requests navigation to the login view.
	fn redirect_to_login(&self, reason: LoginRedirect);
}

/// Navigator that ignores every redirect; suitable for headless use.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNavigator;
impl Navigator for NoopNavigator {
	fn redirect_to_login(&self, _reason: LoginRedirect) {}
}

/// Navigator that records every redirect for later inspection.
#[derive(Debug, Default)]
pub struct RecordingNavigator(Mutex<Vec<LoginRedirect>>);
impl RecordingNavigator {
	/// Returns the redirects recorded so far, oldest first.
	pub fn redirects(&self) -> Vec<LoginRedirect> {
		self.0.lock().clone()
	}
}
impl Navigator for RecordingNavigator {
	fn redirect_to_login(&self, reason: LoginRedirect) {
		self.0.lock().push(reason);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recording_navigator_keeps_order() {
		let navigator = RecordingNavigator::default();

		navigator.redirect_to_login(LoginRedirect::MissingSession);
		navigator.redirect_to_login(LoginRedirect::LoggedOut);

		assert_eq!(
			navigator.redirects(),
			vec![LoginRedirect::MissingSession, LoginRedirect::LoggedOut]
		);
		assert_eq!(LoginRedirect::RefreshFailed.to_string(), "refresh_failed");
	}
}
