//! Demonstrates logging in, transparently refreshing an expired access token, and logging out
//! with a host-provided navigator.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
// self
use csv_analyzer_client::{
	client::AnalyzerClient,
	config::ClientConfig,
	ext::{LoginRedirect, Navigator},
	forms::LoginForm,
	store::{MemoryStore, SessionStore},
};

struct ConsoleNavigator;
impl Navigator for ConsoleNavigator {
	fn redirect_to_login(&self, reason: LoginRedirect) {
		println!("Navigating to /login ({reason}).");
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let login_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/login/");
			then.status(200).header("content-type", "application/json").json_body(json!({
				"user": {
					"id": 1,
					"username": "demo",
					"email": "demo@example.com",
					"first_name": "Demo",
					"last_name": "User"
				},
				"tokens": { "refresh": "demo-refresh", "access": "demo-access-expired" },
				"message": "Login successful"
			}));
		})
		.await;
	let _expired_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/datasets/")
				.header("authorization", "Bearer demo-access-expired");
			then.status(401).json_body(json!({ "detail": "Given token not valid for any token type" }));
		})
		.await;
	let refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/auth/token/refresh/")
				.json_body(json!({ "refresh": "demo-refresh" }));
			then.status(200).json_body(json!({ "access": "demo-access", "refresh": "demo-refresh-2" }));
		})
		.await;
	let _datasets_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/datasets/").header("authorization", "Bearer demo-access");
			then.status(200).json_body(json!([]));
		})
		.await;
	let _logout_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/logout/");
			then.status(200).json_body(json!({ "message": "Logout successful" }));
		})
		.await;
	let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::default());
	let config = ClientConfig::builder().base_url(server.url("/api/")).build()?;
	let client = AnalyzerClient::new(config, store, Arc::new(ConsoleNavigator))?;
	let session = client.login(&LoginForm::new("demo@example.com", "demo-password")).await?;

	login_mock.assert_async().await;

	if let Some(user) = &session.user {
		println!("Logged in as {} <{}>.", user.username, user.email);
	}

	let datasets = client.list_datasets().await?;

	refresh_mock.assert_async().await;

	println!(
		"Listed {} datasets after {} token refresh(es).",
		datasets.len(),
		client.gateway.refresh_metrics.successes()
	);

	client.logout().await?;

	println!("Authenticated after logout: {}.", client.is_authenticated().await?);

	Ok(())
}
