// std
use std::path::{Path, PathBuf};
// self
use crate::{
	_prelude::*,
	auth::DatasetId,
	client::{AnalyzerClient, authorized},
	config::Endpoints,
	error::TransportError,
	forms::CsvUpload,
	http::{ApiRequest, ApiTransport, RequestBody},
	jobs::{DatasetRecord, PdfReport, StatusReport, UploadReceipt},
	obs::{self, OpKind},
	poller::JobPoller,
};

impl<T> AnalyzerClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Uploads a CSV for analysis.
	///
	/// The file name is checked before anything is sent; the server answers `202 Accepted` with
	/// the new dataset id, after which the job can be tracked with [`AnalyzerClient::poller`].
	pub async fn upload_dataset(&self, upload: CsvUpload) -> Result<UploadReceipt> {
		obs::observe(OpKind::Upload, "upload_dataset", async move {
			upload.validate()?;

			let request = ApiRequest::post(self.config().endpoints.upload_dataset.as_str())
				.body(RequestBody::Multipart(vec![upload.into_part()]))
				.transfer();

			self.fetch_json(request).await
		})
		.await
	}

	/// Reads `path` and uploads it; non-CSV names are rejected before the file is opened.
	pub async fn upload_dataset_file(&self, path: impl AsRef<Path>) -> Result<UploadReceipt> {
		let upload = CsvUpload::read(path).await?;

		self.upload_dataset(upload).await
	}

	/// Fetches the processing status of one dataset.
	pub async fn dataset_status(&self, id: DatasetId) -> Result<StatusReport> {
		obs::observe(OpKind::Status, "dataset_status", async move {
			let path = Endpoints::for_dataset(&self.config().endpoints.dataset_status, id);

			self.fetch_json(ApiRequest::get(path)).await
		})
		.await
	}

	/// Lists the user's datasets, newest first.
	pub async fn list_datasets(&self) -> Result<Vec<DatasetRecord>> {
		obs::observe(OpKind::ListDatasets, "list_datasets", async move {
			self.fetch_json(ApiRequest::get(self.config().endpoints.datasets.as_str())).await
		})
		.await
	}

	/// Downloads the PDF report of a completed dataset.
	pub async fn download_pdf(&self, id: DatasetId) -> Result<PdfReport> {
		obs::observe(OpKind::Download, "download_pdf", async move {
			let path = Endpoints::for_dataset(&self.config().endpoints.download_pdf, id);
			let response = self.gateway.send(ApiRequest::get(path).transfer()).await?;
			let response = authorized(response)?;

			Ok(PdfReport::new(id, response.body))
		})
		.await
	}

	/// Downloads the PDF report into `dir` as `analysis_report_{id}.pdf` and returns its path.
	pub async fn save_pdf(&self, id: DatasetId, dir: impl AsRef<Path>) -> Result<PathBuf> {
		let report = self.download_pdf(id).await?;
		let path = dir.as_ref().join(&report.file_name);

		tokio::fs::write(&path, &report.bytes).await.map_err(TransportError::from)?;

		Ok(path)
	}

	/// Creates a job poller that uses this client and the configured poll interval.
	pub fn poller(&self) -> JobPoller<Self> {
		JobPoller::new(Arc::new(self.clone()), self.config().poll_interval)
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, fs, process};
	// self
	use super::*;
	use crate::{
		auth::{Session, TokenSecret},
		config::ClientConfig,
		ext::NoopNavigator,
		gateway::testing::FakeTransport,
		http::{ApiResponse, CONTENT_TYPE},
		jobs::JobStatus,
		store::{MemoryStore, SessionStore},
	};

	fn client(transport: FakeTransport) -> (AnalyzerClient<FakeTransport>, Arc<FakeTransport>) {
		let transport = Arc::new(transport);
		let store = MemoryStore::with_session(&Session::new(TokenSecret::new("a"), TokenSecret::new("r")))
			.expect("Seed session should encode.");
		let client: AnalyzerClient<FakeTransport> = AnalyzerClient::with_transport(
			ClientConfig::default(),
			transport.clone(),
			Arc::new(store) as Arc<dyn SessionStore>,
			Arc::new(NoopNavigator),
		);

		(client, transport)
	}

	#[tokio::test]
	async fn non_csv_upload_never_reaches_the_network() {
		let (client, transport) = client(FakeTransport::accepting("a"));
		let err = client
			.upload_dataset(CsvUpload::new("pumps.xlsx", b"a,b".to_vec()))
			.await
			.expect_err("Non-CSV upload must fail.");

		assert!(matches!(err, Error::Validation(_)));
		assert!(transport.requests.lock().is_empty());

		let err = client
			.upload_dataset_file("/no/such/dir/pumps.txt")
			.await
			.expect_err("Non-CSV path must fail.");

		assert!(matches!(err, Error::Validation(_)));
		assert!(transport.requests.lock().is_empty());
	}

	#[tokio::test]
	async fn upload_sends_multipart_and_decodes_receipt() {
		let transport = FakeTransport::accepting("a");

		transport.queue(
			"upload-dataset/",
			ApiResponse::new(202, r#"{"message":"File uploaded.","dataset_id":42,"check_status_at":"/api/datasets/"}"#),
		);

		let (client, transport) = client(transport);
		let receipt = client
			.upload_dataset(CsvUpload::new("pumps.csv", b"Flowrate\n1.5\n".to_vec()))
			.await
			.expect("Upload should succeed.");

		assert_eq!(receipt.dataset_id, DatasetId(42));
		assert_eq!(receipt.status, JobStatus::Pending);

		let sent = transport.requests.lock()[0].clone();

		assert!(!sent.headers.contains_key(CONTENT_TYPE));
		assert_eq!(sent.timeout, ClientConfig::DEFAULT_TRANSFER_TIMEOUT);

		match sent.body {
			RequestBody::Multipart(parts) => {
				assert_eq!(parts.len(), 1);
				assert_eq!(parts[0].field, "dataset_file");
				assert_eq!(parts[0].file_name, "pumps.csv");
			},
			other => panic!("Expected a multipart body, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn file_upload_sends_file_contents() {
		let transport = FakeTransport::accepting("a");

		transport.queue("upload-dataset/", ApiResponse::new(202, r#"{"dataset_id":7}"#));

		let (client, transport) = client(transport);
		let path = env::temp_dir().join(format!("csv_analyzer_client_upload_{}.csv", process::id()));

		fs::write(&path, "Type\nPump\n").expect("Fixture should be writable.");

		let receipt = client.upload_dataset_file(&path).await.expect("Upload should succeed.");

		fs::remove_file(&path).expect("Fixture should be removable.");

		assert_eq!(receipt.dataset_id, DatasetId(7));

		match transport.requests.lock()[0].body.clone() {
			RequestBody::Multipart(parts) => assert_eq!(parts[0].bytes, b"Type\nPump\n"),
			other => panic!("Expected a multipart body, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn report_not_ready_surfaces_server_error() {
		let transport = FakeTransport::accepting("a");

		transport.queue(
			"download-pdf/9/",
			ApiResponse::new(400, r#"{"error":"Report not ready. Current status is processing"}"#),
		);

		let (client, _) = client(transport);
		let err = client.download_pdf(DatasetId(9)).await.expect_err("Pending report must fail.");

		assert_eq!(err.user_message(), "Report not ready. Current status is processing");
	}

	#[tokio::test]
	async fn save_pdf_writes_conventional_file_name() {
		let transport = FakeTransport::accepting("a");

		transport.queue("download-pdf/42/", ApiResponse::new(200, b"%PDF-1.7".to_vec()));

		let (client, _) = client(transport);
		let dir = env::temp_dir().join(format!("csv_analyzer_client_pdf_{}", process::id()));

		fs::create_dir_all(&dir).expect("Temp dir should be creatable.");

		let path = client.save_pdf(DatasetId(42), &dir).await.expect("Save should succeed.");

		assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("analysis_report_42.pdf"));
		assert_eq!(fs::read(&path).expect("Report should exist."), b"%PDF-1.7");

		fs::remove_dir_all(&dir).expect("Temp dir should be removable.");
	}
}
