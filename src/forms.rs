//! Client-side form validation, resolved before any request is made.
//!
//! Each form exposes `validate`, which reports every failing field at once so a view can
//! highlight all of them. Field names match the API's JSON keys, which lets server-side field
//! errors ([`crate::error::ApiError::fields`]) and local ones share the same display slots.

// std
use std::path::Path;
// self
use crate::{_prelude::*, error::TransportError, http::MultipartFile};

/// Minimum password length accepted by the service.
pub const MIN_PASSWORD_LEN: usize = 8;
/// Multipart field carrying the uploaded CSV.
pub const DATASET_FIELD: &str = "dataset_file";

/// Per-field validation failures.
#[derive(Clone, Debug, Default, PartialEq, Eq, ThisError)]
#[error("{}", self.summary())]
pub struct ValidationError {
	/// Messages keyed by field name, in field order.
	pub fields: BTreeMap<String, Vec<String>>,
}
impl ValidationError {
	/// Returns the first message for `field`, if any.
	pub fn field(&self, field: &str) -> Option<&str> {
		self.fields.get(field).and_then(|messages| messages.first()).map(String::as_str)
	}

	/// Returns `true` when no field failed.
	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	fn push(&mut self, field: &str, message: impl Into<String>) {
		self.fields.entry(field.to_owned()).or_default().push(message.into());
	}

	fn summary(&self) -> String {
		self.fields.values().flatten().cloned().collect::<Vec<_>>().join(" ")
	}

	fn into_result(self) -> Result<(), Self> {
		if self.is_empty() { Ok(()) } else { Err(self) }
	}
}

/// Login with a username or an email address.
#[derive(Clone, Serialize)]
pub struct LoginForm {
	/// Username or email.
	pub login_id: String,
	/// Account password.
	pub password: String,
}
impl LoginForm {
	/// Creates a login form.
	pub fn new(login_id: impl Into<String>, password: impl Into<String>) -> Self {
		Self { login_id: login_id.into(), password: password.into() }
	}

	/// Checks required fields.
	pub fn validate(&self) -> Result<(), ValidationError> {
		let mut errors = ValidationError::default();

		if self.login_id.trim().is_empty() {
			errors.push("login_id", "Username or Email is required.");
		}
		if self.password.is_empty() {
			errors.push("password", "Password is required.");
		}

		errors.into_result()
	}
}
impl Debug for LoginForm {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginForm")
			.field("login_id", &self.login_id)
			.field("password", &"<redacted>")
			.finish()
	}
}

/// New account registration.
#[derive(Clone, Serialize)]
pub struct RegisterForm {
	/// Login name.
	pub username: String,
	/// Contact address.
	pub email: String,
	/// Given name.
	pub first_name: String,
	/// Family name.
	pub last_name: String,
	/// Chosen password.
	pub password: String,
	/// Password confirmation.
	pub password2: String,
}
impl RegisterForm {
	/// Checks required fields, email shape, password length, and confirmation.
	pub fn validate(&self) -> Result<(), ValidationError> {
		let mut errors = ValidationError::default();

		for (field, value, label) in [
			("username", &self.username, "Username"),
			("first_name", &self.first_name, "First name"),
			("last_name", &self.last_name, "Last name"),
		] {
			if value.trim().is_empty() {
				errors.push(field, format!("{label} is required"));
			}
		}

		if self.email.trim().is_empty() {
			errors.push("email", "Email is required");
		} else if !is_email(self.email.trim()) {
			errors.push("email", "Invalid email format");
		}

		check_new_password(&mut errors, ("password", &self.password), ("password2", &self.password2));

		errors.into_result()
	}
}
impl Debug for RegisterForm {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RegisterForm")
			.field("username", &self.username)
			.field("email", &self.email)
			.field("first_name", &self.first_name)
			.field("last_name", &self.last_name)
			.finish_non_exhaustive()
	}
}

/// First step of a password reset: confirm the account exists.
#[derive(Clone, Debug, Serialize)]
pub struct PasswordResetRequestForm {
	/// Username or email.
	pub login_id: String,
}
impl PasswordResetRequestForm {
	/// Creates a reset request.
	pub fn new(login_id: impl Into<String>) -> Self {
		Self { login_id: login_id.into() }
	}

	/// Checks the login id.
	pub fn validate(&self) -> Result<(), ValidationError> {
		let mut errors = ValidationError::default();

		if self.login_id.trim().is_empty() {
			errors.push("login_id", "Username or Email is required");
		}

		errors.into_result()
	}
}

/// Second step of a password reset: set the new password.
#[derive(Clone, Serialize)]
pub struct PasswordResetConfirmForm {
	/// Username or email.
	pub login_id: String,
	/// New password.
	pub new_password: String,
	/// New password confirmation.
	pub new_password2: String,
}
impl PasswordResetConfirmForm {
	/// Checks the login id and new password rules.
	pub fn validate(&self) -> Result<(), ValidationError> {
		let mut errors = ValidationError::default();

		if self.login_id.trim().is_empty() {
			errors.push("login_id", "Username or Email is required");
		}

		check_new_password(
			&mut errors,
			("new_password", &self.new_password),
			("new_password2", &self.new_password2),
		);

		errors.into_result()
	}
}
impl Debug for PasswordResetConfirmForm {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PasswordResetConfirmForm")
			.field("login_id", &self.login_id)
			.finish_non_exhaustive()
	}
}

/// Password change for the logged-in user.
#[derive(Clone, Serialize)]
pub struct ChangePasswordForm {
	/// Current password.
	pub old_password: String,
	/// New password.
	pub new_password: String,
	/// New password confirmation.
	pub new_password2: String,
}
impl ChangePasswordForm {
	/// Checks the current password and new password rules.
	pub fn validate(&self) -> Result<(), ValidationError> {
		let mut errors = ValidationError::default();

		if self.old_password.is_empty() {
			errors.push("old_password", "Current password is required");
		}

		check_new_password(
			&mut errors,
			("new_password", &self.new_password),
			("new_password2", &self.new_password2),
		);

		errors.into_result()
	}
}
impl Debug for ChangePasswordForm {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ChangePasswordForm").finish_non_exhaustive()
	}
}

/// CSV file selected for upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CsvUpload {
	/// File name sent to the server.
	pub file_name: String,
	/// File contents.
	pub bytes: Vec<u8>,
}
impl CsvUpload {
	/// Wraps in-memory contents.
	pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
		Self { file_name: file_name.into(), bytes: bytes.into() }
	}

	/// Reads a file from disk, rejecting non-CSV names before touching the file.
	pub async fn read(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let file_name =
			path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();

		check_csv_name(&file_name)?;

		let bytes = tokio::fs::read(path).await.map_err(TransportError::from)?;

		Ok(Self { file_name, bytes })
	}

	/// Checks the file name.
	pub fn validate(&self) -> Result<(), ValidationError> {
		check_csv_name(&self.file_name)
	}

	/// Converts the upload into the multipart part expected by the API.
	pub fn into_part(self) -> MultipartFile {
		MultipartFile {
			field: DATASET_FIELD.into(),
			file_name: self.file_name,
			content_type: "text/csv".into(),
			bytes: self.bytes,
		}
	}
}

fn check_csv_name(file_name: &str) -> Result<(), ValidationError> {
	let mut errors = ValidationError::default();

	if file_name.is_empty() {
		errors.push(DATASET_FIELD, "Please select a file first");
	} else if !file_name.ends_with(".csv") {
		errors.push(DATASET_FIELD, "Please select a CSV file");
	}

	errors.into_result()
}

fn check_new_password(
	errors: &mut ValidationError,
	(field, password): (&str, &str),
	(confirm_field, confirmation): (&str, &str),
) {
	if password.is_empty() {
		errors.push(field, "Password is required");
	} else if password.chars().count() < MIN_PASSWORD_LEN {
		errors.push(field, format!("Password must be at least {MIN_PASSWORD_LEN} characters"));
	}
	if password != confirmation {
		errors.push(confirm_field, "Passwords do not match");
	}
}

/// `local@domain.tld` with no whitespace and a dot inside the domain.
fn is_email(value: &str) -> bool {
	if value.chars().any(char::is_whitespace) {
		return false;
	}

	let Some((local, domain)) = value.split_once('@') else {
		return false;
	};

	if local.is_empty() || domain.contains('@') {
		return false;
	}

	match domain.rsplit_once('.') {
		Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
		None => false,
	}
}
