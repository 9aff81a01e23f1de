// self
use crate::{
	_prelude::*,
	auth::{AuthResponse, Session, UserProfile},
	client::{AnalyzerClient, successful},
	ext::LoginRedirect,
	forms::{
		ChangePasswordForm, LoginForm, PasswordResetConfirmForm, PasswordResetRequestForm,
		RegisterForm,
	},
	http::{AUTHORIZATION, ApiRequest, ApiTransport},
	obs::{self, OpKind},
};

/// Confirmation body returned by account endpoints.
#[derive(Debug, Deserialize)]
struct MessageBody {
	#[serde(default)]
	message: Option<String>,
}

#[derive(Serialize)]
struct RefreshBody<'a> {
	refresh: &'a str,
}

impl<T> AnalyzerClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Logs in with a username or email and stores the issued session.
	pub async fn login(&self, form: &LoginForm) -> Result<Session> {
		obs::observe(OpKind::Login, "login", async move {
			form.validate()?;

			let request = ApiRequest::post(self.config().endpoints.login.as_str()).json(form)?;

			self.establish_session(OpKind::Login, request).await
		})
		.await
	}

	/// Creates an account and stores the issued session.
	pub async fn register(&self, form: &RegisterForm) -> Result<Session> {
		obs::observe(OpKind::Register, "register", async move {
			form.validate()?;

			let request = ApiRequest::post(self.config().endpoints.register.as_str()).json(form)?;

			self.establish_session(OpKind::Register, request).await
		})
		.await
	}

	/// Ends the session.
	///
	/// The server-side logout is best effort: one attempt with the current access token, never
	/// refreshed or replayed, whose failures are logged and never surfaced. The local session is
	/// always cleared and the navigator is sent to the login view exactly once.
	pub async fn logout(&self) -> Result<()> {
		obs::observe(OpKind::Logout, "logout", async move {
			if let Some(session) = self.store().load().await? {
				let refresh = RefreshBody { refresh: session.refresh_token.expose() };
				let outcome = match ApiRequest::post(self.config().endpoints.logout.as_str())
					.header(AUTHORIZATION, session.access_token.bearer())
					.json(&refresh)
				{
					Ok(request) =>
						self.gateway.send_anonymous(request).await.and_then(successful).map(drop),
					Err(e) => Err(e.into()),
				};

				if let Err(e) = outcome {
					obs::warn_event(OpKind::Logout, "Server-side logout failed.", &e);
				}
			}

			self.store().clear().await?;
			self.gateway.navigator.redirect_to_login(LoginRedirect::LoggedOut);

			Ok(())
		})
		.await
	}

	/// Confirms the account exists so a new password can be set. Returns the server message.
	pub async fn request_password_reset(&self, form: &PasswordResetRequestForm) -> Result<String> {
		obs::observe(OpKind::PasswordReset, "request_password_reset", async move {
			form.validate()?;

			let request = ApiRequest::post(
				self.config().endpoints.password_reset_request.as_str(),
			)
			.json(form)?;
			let body: MessageBody = self.fetch_json_anonymous(request).await?;

			Ok(body.message.unwrap_or_default())
		})
		.await
	}

	/// Sets a new password for an account. Returns the server message.
	pub async fn confirm_password_reset(&self, form: &PasswordResetConfirmForm) -> Result<String> {
		obs::observe(OpKind::PasswordReset, "confirm_password_reset", async move {
			form.validate()?;

			let request = ApiRequest::post(
				self.config().endpoints.password_reset_confirm.as_str(),
			)
			.json(form)?;
			let body: MessageBody = self.fetch_json_anonymous(request).await?;

			Ok(body.message.unwrap_or_default())
		})
		.await
	}

	/// Changes the logged-in user's password. Returns the server message.
	pub async fn change_password(&self, form: &ChangePasswordForm) -> Result<String> {
		obs::observe(OpKind::ChangePassword, "change_password", async move {
			form.validate()?;

			let request =
				ApiRequest::post(self.config().endpoints.change_password.as_str()).json(form)?;
			let body: MessageBody = self.fetch_json(request).await?;

			Ok(body.message.unwrap_or_default())
		})
		.await
	}

	/// Fetches the logged-in user's profile and refreshes the cached copy.
	pub async fn profile(&self) -> Result<UserProfile> {
		obs::observe(OpKind::Profile, "profile", async move {
			let user: UserProfile =
				self.fetch_json(ApiRequest::get(self.config().endpoints.profile.as_str())).await?;

			if let Some(session) = self.store().load().await? {
				self.store().save(session.with_user(user.clone())).await?;
			}

			Ok(user)
		})
		.await
	}

	/// Returns `true` while a session is stored.
	pub async fn is_authenticated(&self) -> Result<bool> {
		Ok(self.store().load().await?.is_some())
	}

	/// Returns the cached profile of the logged-in user.
	pub async fn current_user(&self) -> Result<Option<UserProfile>> {
		Ok(self.store().load().await?.and_then(|session| session.user))
	}

	async fn establish_session(&self, kind: OpKind, request: ApiRequest) -> Result<Session> {
		let response: AuthResponse = self.fetch_json_anonymous(request).await?;

		if let Some(message) = &response.message {
			obs::info_event(kind, "Session established.", message);
		}

		let session = response.into_session();

		self.store().save(session.clone()).await?;

		Ok(session)
	}
}
