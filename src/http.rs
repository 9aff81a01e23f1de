//! Transport primitives for API calls.
//!
//! The module exposes [`ApiTransport`] alongside the owned request/response values it
//! exchanges. Requests are plain data (method, URL, headers, buffered body) so the gateway can
//! replay them after a token refresh; multipart bodies are rebuilt from their buffered parts on
//! every attempt.

// self
use crate::_prelude::*;
#[cfg(feature = "reqwest")] use crate::error::TransportError;

/// Header carrying the bearer credential.
pub const AUTHORIZATION: &str = "authorization";
/// Header describing the body encoding.
pub const CONTENT_TYPE: &str = "content-type";
/// Content type applied to non-multipart bodies when the caller sets none.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Boxed future returned by [`ApiTransport::execute`].
pub type TransportFuture<'a, E> = Pin<Box<dyn Future<Output = Result<ApiResponse, E>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing API requests.
///
/// The trait is the client's only dependency on an HTTP stack. Implementations must be
/// `Send + Sync + 'static` so one transport can be shared (behind `Arc`) by the gateway,
/// the refresh path, and pollers running on other tasks.
pub trait ApiTransport
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// Sends the request and buffers the full response.
	///
	/// Any HTTP status is a successful execution; only failures to obtain a response are errors.
	fn execute(&self, request: OutboundRequest) -> TransportFuture<'_, Self::TransportError>;
}

/// HTTP verbs used by the API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
	/// `GET`.
	Get,
	/// `POST`.
	Post,
}
impl Method {
	/// Returns the verb as sent on the wire.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// One file part of a multipart form.
#[derive(Clone, PartialEq, Eq)]
pub struct MultipartFile {
	/// Form field name.
	pub field: String,
	/// File name reported to the server.
	pub file_name: String,
	/// MIME type of the part.
	pub content_type: String,
	/// Buffered file contents.
	pub bytes: Vec<u8>,
}
impl Debug for MultipartFile {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MultipartFile")
			.field("field", &self.field)
			.field("file_name", &self.file_name)
			.field("content_type", &self.content_type)
			.field("len", &self.bytes.len())
			.finish()
	}
}

/// Request payload, buffered so the request can be replayed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RequestBody {
	/// No body.
	#[default]
	Empty,
	/// Raw bytes forwarded unchanged.
	Bytes(Vec<u8>),
	/// Binary form payload; the transport sets the boundary content type.
	Multipart(Vec<MultipartFile>),
}
impl RequestBody {
	/// Serializes `value` as a JSON body.
	pub fn json<T>(value: &T) -> Result<Self, serde_json::Error>
	where
		T: ?Sized + Serialize,
	{
		serde_json::to_vec(value).map(Self::Bytes)
	}

	/// Returns `true` for binary form payloads.
	pub fn is_multipart(&self) -> bool {
		matches!(self, Self::Multipart(_))
	}
}

/// Endpoint-relative request, as issued by API methods.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiRequest {
	/// HTTP verb.
	pub method: Method,
	/// Path relative to the configured base URL.
	pub path: String,
	/// Extra headers; names are stored lowercase.
	pub headers: BTreeMap<String, String>,
	/// Buffered body.
	pub body: RequestBody,
	/// Use the long transfer timeout instead of the JSON request timeout.
	pub transfer: bool,
}
impl ApiRequest {
	/// Creates a body-less request.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			headers: BTreeMap::new(),
			body: RequestBody::Empty,
			transfer: false,
		}
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::Post, path)
	}

	/// Adds or replaces a header.
	pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
		self.headers.insert(name.to_ascii_lowercase(), value.into());

		self
	}

	/// Sets the body.
	pub fn body(mut self, body: RequestBody) -> Self {
		self.body = body;

		self
	}

	/// Serializes `value` as the JSON body.
	pub fn json<T>(self, value: &T) -> Result<Self, serde_json::Error>
	where
		T: ?Sized + Serialize,
	{
		Ok(self.body(RequestBody::json(value)?))
	}

	/// Marks the request as a file transfer (upload or download).
	pub fn transfer(mut self) -> Self {
		self.transfer = true;

		self
	}
}

/// Fully resolved request handed to an [`ApiTransport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundRequest {
	/// HTTP verb.
	pub method: Method,
	/// Absolute URL.
	pub url: Url,
	/// Headers with lowercase names.
	pub headers: BTreeMap<String, String>,
	/// Buffered body.
	pub body: RequestBody,
	/// Per-request timeout.
	pub timeout: StdDuration,
}
impl OutboundRequest {
	/// Returns the bearer token carried by the request, if any.
	pub fn bearer(&self) -> Option<&str> {
		self.headers.get(AUTHORIZATION).and_then(|value| value.strip_prefix("Bearer "))
	}
}

/// Buffered API response.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers with lowercase names.
	pub headers: BTreeMap<String, String>,
	/// Raw body.
	pub body: Vec<u8>,
	/// `true` when the response was produced locally without a network call.
	pub synthetic: bool,
}
impl ApiResponse {
	/// Creates a network response.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: BTreeMap::new(), body: body.into(), synthetic: false }
	}

	/// Locally produced 401 returned when no session exists.
	pub fn synthetic_unauthorized() -> Self {
		Self { synthetic: true, ..Self::new(401, Vec::new()) }
	}

	/// Adds or replaces a header.
	pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
		self.headers.insert(name.to_ascii_lowercase(), value.into());

		self
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns `true` for 401 responses.
	pub fn is_unauthorized(&self) -> bool {
		self.status == 401
	}

	/// Returns the value of a header.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}

	/// Decodes the body as JSON, reporting the failing path on mismatch.
	pub fn json<T>(&self) -> Result<T>
	where
		T: for<'de> Deserialize<'de>,
	{
		let mut de = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut de)
			.map_err(|source| Error::Decode { source, status: self.status })
	}
}
impl Debug for ApiResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiResponse")
			.field("status", &self.status)
			.field("headers", &self.headers)
			.field("body_len", &self.body.len())
			.field("synthetic", &self.synthetic)
			.finish()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	fn build(&self, request: OutboundRequest) -> Result<reqwest::RequestBuilder, TransportError> {
		let method = match request.method {
			Method::Get => reqwest::Method::GET,
			Method::Post => reqwest::Method::POST,
		};
		let mut builder = self.0.request(method, request.url).timeout(request.timeout);

		for (name, value) in &request.headers {
			builder = builder.header(name.as_str(), value.as_str());
		}

		builder = match request.body {
			RequestBody::Empty => builder,
			RequestBody::Bytes(bytes) => builder.body(bytes),
			RequestBody::Multipart(files) => {
				let mut form = reqwest::multipart::Form::new();

				for file in files {
					let part = reqwest::multipart::Part::bytes(file.bytes)
						.file_name(file.file_name)
						.mime_str(&file.content_type)?;

					form = form.part(file.field, part);
				}

				builder.multipart(form)
			},
		};

		Ok(builder)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ApiTransport for ReqwestHttpClient {
	type TransportError = TransportError;

	fn execute(&self, request: OutboundRequest) -> TransportFuture<'_, Self::TransportError> {
		Box::pin(async move {
			let response = self.build(request)?.send().await?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
				})
				.collect();
			let body = response.bytes().await?.to_vec();

			Ok(ApiResponse { status, headers, body, synthetic: false })
		})
	}
}
