//! Fixtures shared by the integration tests.

#![allow(dead_code)]

// std
use std::{sync::Arc, time::Duration};
// self
use csv_analyzer_client::{
	auth::{Session, TokenSecret, UserProfile},
	client::{AnalyzerClient, ReqwestAnalyzerClient},
	config::ClientConfig,
	ext::{Navigator, RecordingNavigator},
	http::ReqwestHttpClient,
	reqwest,
	store::{MemoryStore, SessionStore},
};

/// Handles returned by [`build_test_client`].
pub type TestClientParts = (ReqwestAnalyzerClient, Arc<MemoryStore>, Arc<RecordingNavigator>);

/// Builds a reqwest transport suitable for talking to `httpmock` servers.
pub fn test_http_client() -> ReqwestHttpClient {
	let client = reqwest::Client::builder()
		.redirect(reqwest::redirect::Policy::none())
		.build()
		.expect("Failed to build Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}

/// Configuration rooted at `base_url` with a short poll interval.
pub fn test_config(base_url: &str) -> ClientConfig {
	ClientConfig::builder()
		.base_url(base_url)
		.poll_interval(Duration::from_millis(50))
		.build()
		.expect("Test client configuration should be valid.")
}

/// Client backed by an in-memory store (optionally seeded) and a recording navigator.
pub fn build_test_client(base_url: &str, session: Option<Session>) -> TestClientParts {
	let store_backend = Arc::new(match session {
		Some(session) =>
			MemoryStore::with_session(&session).expect("Session fixture should encode."),
		None => MemoryStore::default(),
	});
	let store: Arc<dyn SessionStore> = store_backend.clone();
	let navigator_backend = Arc::new(RecordingNavigator::default());
	let navigator: Arc<dyn Navigator> = navigator_backend.clone();
	let client: ReqwestAnalyzerClient =
		AnalyzerClient::with_transport(test_config(base_url), test_http_client(), store, navigator);

	(client, store_backend, navigator_backend)
}

/// Session fixture with the provided token values and a demo profile.
pub fn session_fixture(access: &str, refresh: &str) -> Session {
	Session::new(TokenSecret::new(access), TokenSecret::new(refresh)).with_user(UserProfile {
		id: 7,
		username: "analyst".into(),
		email: "analyst@example.com".into(),
		first_name: "Ada".into(),
		last_name: "Lovelace".into(),
	})
}
