//! Optional observability helpers for client operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `csv_analyzer_client.op` with the `op`
//!   (operation) and `stage` (call site) fields, plus warn/info events for poll failures,
//!   refresh outcomes, and best-effort logout failures.
//! - Enable `metrics` to increment the `csv_analyzer_client_op_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Client operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// Credential login.
	Login,
	/// Account registration.
	Register,
	/// Logout and session teardown.
	Logout,
	/// Password reset request or confirmation.
	PasswordReset,
	/// Authenticated password change.
	ChangePassword,
	/// Profile lookup.
	Profile,
	/// Access-token refresh.
	Refresh,
	/// Dataset upload.
	Upload,
	/// Single dataset status lookup.
	Status,
	/// Dataset list lookup.
	ListDatasets,
	/// PDF report download.
	Download,
	/// Background status polling.
	Poll,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::Login => "login",
			OpKind::Register => "register",
			OpKind::Logout => "logout",
			OpKind::PasswordReset => "password_reset",
			OpKind::ChangePassword => "change_password",
			OpKind::Profile => "profile",
			OpKind::Refresh => "refresh",
			OpKind::Upload => "upload",
			OpKind::Status => "status",
			OpKind::ListDatasets => "list_datasets",
			OpKind::Download => "download",
			OpKind::Poll => "poll",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to a client operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside an operation span and records attempt/success/failure outcomes.
pub async fn observe<T, Fut>(kind: OpKind, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = OpSpan::new(kind, stage);

	record_op_outcome(kind, OpOutcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => record_op_outcome(kind, OpOutcome::Success),
		Err(_) => record_op_outcome(kind, OpOutcome::Failure),
	}

	result
}
