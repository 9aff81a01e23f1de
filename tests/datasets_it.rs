#![cfg(feature = "reqwest")]

mod support;

// std
use std::{env, fs, process, time::Duration};
// crates.io
use httpmock::prelude::*;
use serde_json::json;
use time::macros;
// self
use csv_analyzer_client::{
	auth::DatasetId,
	error::Error,
	forms::CsvUpload,
	jobs::JobStatus,
	poller::{self, JobOutcome},
};
use support::{build_test_client, session_fixture};

const BEARER: &str = "Bearer access-1";

#[tokio::test]
async fn non_csv_upload_is_rejected_locally() {
	let server = MockServer::start_async().await;
	let (client, _, _) = build_test_client(
		&server.url("/api/"),
		Some(session_fixture("access-1", "refresh-1")),
	);
	let upload = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/upload-dataset/");
			then.status(202);
		})
		.await;
	let err = client
		.upload_dataset(CsvUpload::new("pumps.xlsx", b"Flowrate\n1.5\n".to_vec()))
		.await
		.expect_err("Non-CSV uploads must fail.");

	match err {
		Error::Validation(e) => assert_eq!(e.to_string(), "Please select a CSV file"),
		other => panic!("Expected a validation error, got {other:?}"),
	}

	upload.assert_calls_async(0).await;
}

#[tokio::test]
async fn uploaded_job_is_polled_until_completed() {
	let server = MockServer::start_async().await;
	let (client, _, navigator) = build_test_client(
		&server.url("/api/"),
		Some(session_fixture("access-1", "refresh-1")),
	);
	let upload = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/upload-dataset/").header("authorization", BEARER);
			then.status(202).header("content-type", "application/json").json_body(json!({
				"message": "File uploaded successfully. Processing started.",
				"dataset_id": 42,
				"check_status_at": "/api/dataset-status/42/"
			}));
		})
		.await;
	let mut processing = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/dataset-status/42/").header("authorization", BEARER);
			then.status(200).json_body(json!({ "status": "processing" }));
		})
		.await;
	let receipt = client
		.upload_dataset(CsvUpload::new(
			"pumps.csv",
			b"Equipment Name,Type,Flowrate\nP-101,Pump,12.5\n".to_vec(),
		))
		.await
		.expect("Upload should succeed.");

	upload.assert_async().await;

	assert_eq!(receipt.dataset_id, DatasetId(42));
	assert_eq!(receipt.status, JobStatus::Pending);

	let poller = client.poller();
	let mut watch = poller.track(receipt.dataset_id, receipt.status);

	assert_eq!(watch.status(), JobStatus::Pending);

	loop {
		let snapshot = watch.changed().await.expect("Poller should still be running.");

		if snapshot.status == JobStatus::Processing {
			assert!(snapshot.outcome.is_none());

			break;
		}
	}

	processing.delete_async().await;

	let completed = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/dataset-status/42/");
			then.status(200).json_body(json!({
				"status": "completed",
				"analysis": { "total_count": 1, "averages": { "flowrate": 12.5 } }
			}));
		})
		.await;
	let outcome = watch.outcome().await;

	assert_eq!(
		outcome,
		JobOutcome::Completed {
			analysis: Some(json!({ "total_count": 1, "averages": { "flowrate": 12.5 } })),
		}
	);

	// Several intervals later the finished job must not have been polled again.
	tokio::time::sleep(poller.interval() * 4).await;
	completed.assert_calls_async(1).await;

	assert!(!poller.is_polling(DatasetId(42)));
	assert!(navigator.redirects().is_empty());
}

#[tokio::test]
async fn failed_job_reports_server_error() {
	let server = MockServer::start_async().await;
	let (client, _, _) = build_test_client(
		&server.url("/api/"),
		Some(session_fixture("access-1", "refresh-1")),
	);
	let status = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/dataset-status/9/");
			then.status(200).json_body(json!({
				"status": "failed",
				"error": "Missing required column: Flowrate"
			}));
		})
		.await;
	let outcome =
		poller::poll_until_terminal(&client, DatasetId(9), Duration::from_millis(20)).await;

	assert_eq!(
		outcome,
		JobOutcome::Failed { message: "Missing required column: Flowrate".into() }
	);

	status.assert_calls_async(1).await;
}

#[tokio::test]
async fn dataset_list_decodes_and_reports_downloadable_entries() {
	let server = MockServer::start_async().await;
	let (client, _, _) = build_test_client(
		&server.url("/api/"),
		Some(session_fixture("access-1", "refresh-1")),
	);
	let list = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/datasets/").header("authorization", BEARER);
			then.status(200).json_body(json!([
				{
					"id": 42,
					"dataset_file": "/media/datasets/pumps.csv",
					"pdf_file": "/media/reports/analysis_report_42.pdf",
					"status": "completed",
					"error_log": null,
					"uploaded_at": "2025-11-10T12:00:00Z"
				},
				{
					"id": 41,
					"dataset_file": "/media/datasets/broken.csv",
					"pdf_file": null,
					"status": "failed",
					"error_log": "Missing required column: Type",
					"uploaded_at": "2025-11-09T08:30:00Z"
				}
			]));
		})
		.await;
	let records =
		poller::poll_datasets_until_settled(&client, Duration::from_millis(20))
			.await
			.expect("Settled list should load.");

	list.assert_calls_async(1).await;

	assert_eq!(records.len(), 2);
	assert!(records[0].has_report());
	assert_eq!(records[0].uploaded_at, macros::datetime!(2025-11-10 12:00 UTC));
	assert!(!records[1].has_report());
	assert_eq!(records[1].error_message(), Some("Missing required column: Type"));
}

#[tokio::test]
async fn report_download_is_saved_under_conventional_name() {
	let server = MockServer::start_async().await;
	let (client, _, _) = build_test_client(
		&server.url("/api/"),
		Some(session_fixture("access-1", "refresh-1")),
	);
	let download = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/download-pdf/42/").header("authorization", BEARER);
			then.status(200)
				.header("content-type", "application/pdf")
				.header("content-disposition", "attachment; filename=\"analysis_report_42.pdf\"")
				.body(b"%PDF-1.7\n%test\n".to_vec());
		})
		.await;
	let dir = env::temp_dir().join(format!("csv_analyzer_client_it_{}", process::id()));

	fs::create_dir_all(&dir).expect("Temp dir should be creatable.");

	let path = client.save_pdf(DatasetId(42), &dir).await.expect("Report should download.");

	download.assert_async().await;

	assert_eq!(path, dir.join("analysis_report_42.pdf"));
	assert_eq!(fs::read(&path).expect("Report should exist."), b"%PDF-1.7\n%test\n");

	fs::remove_dir_all(&dir).expect("Temp dir should be removable.");
}

#[tokio::test]
async fn pending_report_surfaces_server_message() {
	let server = MockServer::start_async().await;
	let (client, _, _) = build_test_client(
		&server.url("/api/"),
		Some(session_fixture("access-1", "refresh-1")),
	);
	let _download = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/download-pdf/7/");
			then.status(400)
				.json_body(json!({ "error": "Report not ready. Current status is processing" }));
		})
		.await;
	let err = client.download_pdf(DatasetId(7)).await.expect_err("Pending report must fail.");

	assert_eq!(err.user_message(), "Report not ready. Current status is processing");
}
