//! Dataset job model: processing states, listed records, status reports, and upload receipts.

// self
use crate::{_prelude::*, auth::DatasetId};

/// Server-side processing state of an uploaded dataset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
	/// Accepted and queued.
	#[default]
	Pending,
	/// Analysis running.
	Processing,
	/// Analysis and report finished.
	Completed,
	/// Processing aborted; see the error message.
	Failed,
}
impl JobStatus {
	/// Returns `true` once the server will no longer change the status.
	pub const fn is_terminal(self) -> bool {
		matches!(self, Self::Completed | Self::Failed)
	}

	/// Returns the wire label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Pending => "pending",
			Self::Processing => "processing",
			Self::Completed => "completed",
			Self::Failed => "failed",
		}
	}
}
impl Display for JobStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Dataset as listed by `GET datasets/`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRecord {
	/// Dataset id.
	pub id: DatasetId,
	/// Server reference to the uploaded CSV.
	pub dataset_file: String,
	/// Server reference to the generated report, once available.
	#[serde(default)]
	pub pdf_file: Option<String>,
	/// Current processing state.
	pub status: JobStatus,
	/// Processing error, set when the job failed.
	#[serde(default)]
	pub error_log: Option<String>,
	/// Upload time.
	#[serde(with = "time::serde::rfc3339")]
	pub uploaded_at: OffsetDateTime,
}
impl DatasetRecord {
	/// Returns `true` when a report can be downloaded.
	pub fn has_report(&self) -> bool {
		self.status == JobStatus::Completed && self.pdf_file.as_deref().is_some_and(|f| !f.is_empty())
	}

	/// Returns the processing error, ignoring blank entries.
	pub fn error_message(&self) -> Option<&str> {
		self.error_log.as_deref().map(str::trim).filter(|log| !log.is_empty())
	}
}

/// Body of `GET dataset-status/{id}/`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
	/// Current processing state.
	pub status: JobStatus,
	/// Analysis results, present once completed.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub analysis: Option<JsonValue>,
	/// Failure message, present once failed.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

/// Body of a successful `POST upload-dataset/`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
	/// Id assigned to the new dataset.
	pub dataset_id: DatasetId,
	/// Initial state; servers that omit it mean `pending`.
	#[serde(default)]
	pub status: JobStatus,
	/// Human-readable confirmation.
	#[serde(default)]
	pub message: Option<String>,
	/// Path the server suggests for follow-up status checks.
	#[serde(default)]
	pub check_status_at: Option<String>,
}

/// Downloaded analysis report.
#[derive(Clone, PartialEq, Eq)]
pub struct PdfReport {
	/// Dataset the report belongs to.
	pub dataset_id: DatasetId,
	/// Suggested file name, `analysis_report_{id}.pdf`.
	pub file_name: String,
	/// Raw PDF bytes.
	pub bytes: Vec<u8>,
}
impl PdfReport {
	/// Wraps downloaded bytes under the conventional file name.
	pub fn new(dataset_id: DatasetId, bytes: Vec<u8>) -> Self {
		Self { dataset_id, file_name: Self::file_name_for(dataset_id), bytes }
	}

	/// Conventional report file name for `dataset_id`.
	pub fn file_name_for(dataset_id: DatasetId) -> String {
		format!("analysis_report_{dataset_id}.pdf")
	}
}
impl Debug for PdfReport {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PdfReport")
			.field("dataset_id", &self.dataset_id)
			.field("file_name", &self.file_name)
			.field("len", &self.bytes.len())
			.finish()
	}
}
