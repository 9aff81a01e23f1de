//! Client-level error types shared across the gateway, API calls, stores, and pollers.

// self
use crate::{_prelude::*, forms::ValidationError, gateway::RefreshFailure};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Banner text shown for network/transport failures.
pub const SERVICE_UNAVAILABLE: &str = "Service unavailable. Please try again later.";

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeouts, local IO).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Form input rejected before any request was made.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Server answered with a non-success status.
	#[error(transparent)]
	Api(#[from] ApiError),

	/// Request body could not be encoded as JSON.
	#[error("Request body could not be encoded.")]
	Encode(#[from] serde_json::Error),
	/// Response body could not be decoded into the expected shape.
	#[error("Server returned a malformed response body (status {status}).")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
	/// No usable session, or the server still rejected the request after a token refresh.
	#[error("Request is not authenticated.")]
	Unauthenticated,
	/// Token refresh failed; the session was cleared and the user must log in again.
	#[error("Session expired: {reason}.")]
	SessionExpired {
		/// Why the refresh could not produce a new access token.
		reason: RefreshFailure,
	},
}
impl Error {
	/// Returns the message a view should display for this error.
	///
	/// Transport failures collapse into the generic [`SERVICE_UNAVAILABLE`] banner; server and
	/// validation errors keep their own wording.
	pub fn user_message(&self) -> String {
		match self {
			Self::Transport(_) => SERVICE_UNAVAILABLE.into(),
			Self::Api(e) => e.message.clone(),
			Self::Validation(e) => e.to_string(),
			Self::Unauthenticated | Self::SessionExpired { .. } =>
				"Your session has expired. Please log in again.".into(),
			Self::Encode(_) | Self::Decode { .. } => "Something went wrong. Please try again.".into(),
			Self::Storage(_) | Self::Config(_) => self.to_string(),
		}
	}

	/// Returns `true` when retrying later cannot succeed without a new login.
	pub fn is_auth_terminal(&self) -> bool {
		matches!(self, Self::Unauthenticated | Self::SessionExpired { .. })
	}
}

/// Configuration failures raised while assembling the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Endpoint path could not be joined onto the base URL.
	#[error("Endpoint `{path}` cannot be resolved against the base URL.")]
	InvalidEndpoint {
		/// Relative endpoint path that failed to resolve.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Client configuration failed validation.
	#[error(transparent)]
	Client(#[from] crate::config::ClientConfigError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure (reading an upload, writing a report).
	#[error("I/O error occurred while transferring data.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Non-success answer from the API, mapped into display-ready messages.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Server rejected the request ({status}): {message}")]
pub struct ApiError {
	/// HTTP status code.
	pub status: u16,
	/// Summary message (the server's `error`/`detail`, or the joined field messages).
	pub message: String,
	/// Per-field messages returned by the server's validators.
	pub fields: BTreeMap<String, Vec<String>>,
}
impl ApiError {
	/// Builds an error from a response status and raw body.
	///
	/// `error` and `detail` keys win; otherwise every key is treated as a field whose value is a
	/// message or a list of messages. Non-JSON bodies fall back to the raw text.
	pub fn from_body(status: u16, body: &[u8]) -> Self {
		let fallback = || {
			let text = String::from_utf8_lossy(body).trim().to_owned();

			if text.is_empty() { format!("Request failed with status {status}.") } else { text }
		};
		let Ok(JsonValue::Object(map)) = serde_json::from_slice::<JsonValue>(body) else {
			return Self { status, message: fallback(), fields: BTreeMap::new() };
		};

		for key in ["error", "detail"] {
			if let Some(value) = map.get(key) {
				return Self { status, message: flatten(value).join("\n"), fields: BTreeMap::new() };
			}
		}

		let fields = map
			.iter()
			.map(|(field, value)| (field.clone(), flatten(value)))
			.collect::<BTreeMap<_, _>>();
		let joined = fields.values().flatten().cloned().collect::<Vec<_>>().join("\n");
		let message = if joined.is_empty() { fallback() } else { joined };

		Self { status, message, fields }
	}

	/// Returns the first message reported for `field`, if any.
	pub fn field(&self, field: &str) -> Option<&str> {
		self.fields.get(field).and_then(|messages| messages.first()).map(String::as_str)
	}
}

fn flatten(value: &JsonValue) -> Vec<String> {
	match value {
		JsonValue::String(s) => vec![s.clone()],
		JsonValue::Array(items) => items.iter().flat_map(flatten).collect(),
		JsonValue::Null => Vec::new(),
		other => vec![other.to_string()],
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn api_error_prefers_error_key() {
		let err = ApiError::from_body(400, br#"{"error":"Invalid Credentials","x":["y"]}"#);

		assert_eq!(err.message, "Invalid Credentials");
		assert!(err.fields.is_empty());
	}

	#[test]
	fn api_error_maps_field_lists() {
		let err = ApiError::from_body(
			400,
			br#"{"email":["A user with this email already exists."],"password":"Too short."}"#,
		);

		assert_eq!(err.field("email"), Some("A user with this email already exists."));
		assert_eq!(err.field("password"), Some("Too short."));
		assert_eq!(err.message, "A user with this email already exists.\nToo short.");
	}

	#[test]
	fn api_error_falls_back_to_text_and_status() {
		let err = ApiError::from_body(502, b"Bad Gateway");

		assert_eq!(err.message, "Bad Gateway");

		let err = ApiError::from_body(500, b"");

		assert_eq!(err.message, "Request failed with status 500.");
	}

	#[test]
	fn transport_errors_render_generic_banner() {
		let err = Error::from(TransportError::Io(std::io::Error::other("socket closed")));

		assert_eq!(err.user_message(), SERVICE_UNAVAILABLE);
		assert!(!err.is_auth_terminal());
		assert!(Error::Unauthenticated.is_auth_terminal());
	}
}
