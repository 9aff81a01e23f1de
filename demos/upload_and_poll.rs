//! Demonstrates uploading a CSV with the default reqwest transport, tracking the analysis job
//! until it completes, and saving the PDF report.

// std
use std::{env, sync::Arc, time::Duration};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
// self
use csv_analyzer_client::{
	auth::{Session, TokenSecret},
	client::AnalyzerClient,
	config::ClientConfig,
	ext::NoopNavigator,
	forms::CsvUpload,
	jobs::JobStatus,
	poller::JobOutcome,
	store::{MemoryStore, SessionStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let upload_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/upload-dataset/");
			then.status(202).header("content-type", "application/json").json_body(json!({
				"message": "File uploaded successfully. Processing started.",
				"dataset_id": 42,
				"check_status_at": "/api/dataset-status/42/"
			}));
		})
		.await;
	let mut processing_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/dataset-status/42/");
			then.status(200).json_body(json!({ "status": "processing" }));
		})
		.await;
	let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::with_session(&Session::new(
		TokenSecret::new("demo-access"),
		TokenSecret::new("demo-refresh"),
	))?);
	let config = ClientConfig::builder()
		.base_url(server.url("/api/"))
		.poll_interval(Duration::from_millis(200))
		.build()?;
	let client = AnalyzerClient::new(config, store, Arc::new(NoopNavigator))?;
	let receipt = client
		.upload_dataset(CsvUpload::new(
			"pumps.csv",
			"Equipment Name,Type,Flowrate,Pressure,Temperature\nP-101,Pump,12.5,3.1,45\n",
		))
		.await?;

	println!("Uploaded dataset {} ({}).", receipt.dataset_id, receipt.status);

	upload_mock.assert_async().await;

	let poller = client.poller();
	let mut watch = poller.track(receipt.dataset_id, receipt.status);

	while let Some(snapshot) = watch.changed().await {
		println!("Poll #{}: {}.", snapshot.polls, snapshot.status);

		if snapshot.status == JobStatus::Processing {
			break;
		}
	}

	// The server finishes the job; the next poll picks it up.
	processing_mock.delete_async().await;

	let _completed_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/dataset-status/42/");
			then.status(200).json_body(json!({
				"status": "completed",
				"analysis": { "total_count": 1, "type_distribution": { "Pump": 1 } }
			}));
		})
		.await;
	let _report_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/download-pdf/42/");
			then.status(200).header("content-type", "application/pdf").body("%PDF-1.7\n");
		})
		.await;

	match watch.outcome().await {
		JobOutcome::Completed { analysis } => {
			println!("Analysis: {}.", analysis.unwrap_or_default());

			let path = client.save_pdf(receipt.dataset_id, env::temp_dir()).await?;

			println!("Report saved to {}.", path.display());
		},
		other => println!("Job did not complete: {other:?}."),
	}

	Ok(())
}
