//! Job status polling.
//!
//! Datasets are processed asynchronously after upload, so their status is polled on a fixed
//! interval until it reaches `completed` or `failed`. [`JobPoller`] runs one background task per
//! tracked dataset and publishes every change through a `tokio::sync::watch` channel;
//! [`poll_until_terminal`] is the same loop awaited inline.
//!
//! Poll failures caused by the network (or any other retryable error) are logged and retried on
//! the next tick. An expired session cannot recover without a new login and ends the job with
//! [`JobOutcome::Abandoned`].

// crates.io
use tokio::{
	sync::watch,
	task::JoinHandle,
	time::{self, Instant, MissedTickBehavior},
};
// self
use crate::{
	_prelude::*,
	auth::DatasetId,
	client::AnalyzerClient,
	http::ApiTransport,
	jobs::{DatasetRecord, JobStatus, StatusReport},
	obs::{self, OpKind},
};

/// Message reported when the server marks a job failed without saying why.
pub const UNKNOWN_FAILURE: &str = "Processing failed.";

/// Boxed future returned by [`StatusSource::status`].
pub type StatusFuture<'a> = Pin<Box<dyn Future<Output = Result<StatusReport>> + 'a + Send>>;
/// Boxed future returned by [`StatusSource::datasets`].
pub type DatasetsFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<DatasetRecord>>> + 'a + Send>>;

/// Anything that can report dataset processing status.
pub trait StatusSource
where
	Self: 'static + Send + Sync,
{
	/// Fetches the status of one dataset.
	fn status(&self, id: DatasetId) -> StatusFuture<'_>;

	/// Lists every dataset of the current user.
	fn datasets(&self) -> DatasetsFuture<'_>;
}
impl<T> StatusSource for AnalyzerClient<T>
where
	T: ?Sized + ApiTransport,
{
	fn status(&self, id: DatasetId) -> StatusFuture<'_> {
		Box::pin(self.dataset_status(id))
	}

	fn datasets(&self) -> DatasetsFuture<'_> {
		Box::pin(self.list_datasets())
	}
}

/// How a tracked job ended.
#[derive(Clone, Debug, PartialEq)]
pub enum JobOutcome {
	/// Processing finished; carries the analysis when the server sent one.
	Completed {
		/// Analysis results.
		analysis: Option<JsonValue>,
	},
	/// Processing failed on the server.
	Failed {
		/// Server-provided error message.
		message: String,
	},
	/// Polling stopped because the session can no longer be used.
	Abandoned {
		/// Error that ended polling.
		reason: String,
	},
	/// Polling was cancelled locally.
	Cancelled,
}
impl JobOutcome {
	fn from_terminal(report: StatusReport) -> Option<Self> {
		match report.status {
			JobStatus::Completed => Some(Self::Completed { analysis: report.analysis }),
			JobStatus::Failed => Some(Self::Failed {
				message: report
					.error
					.filter(|message| !message.trim().is_empty())
					.unwrap_or_else(|| UNKNOWN_FAILURE.into()),
			}),
			JobStatus::Pending | JobStatus::Processing => None,
		}
	}
}

/// Latest known state of a tracked job.
#[derive(Clone, Debug, PartialEq)]
pub struct JobSnapshot {
	/// Tracked dataset.
	pub id: DatasetId,
	/// Last status reported by the server (or the initial one).
	pub status: JobStatus,
	/// Status requests sent so far, failed ones included.
	pub polls: u32,
	/// Set once polling has stopped.
	pub outcome: Option<JobOutcome>,
}

/// Polls `id` every `interval` until its status is terminal.
///
/// The first request is sent one interval after the call. Retryable failures are logged and
/// retried; an expired session returns [`JobOutcome::Abandoned`].
pub async fn poll_until_terminal<S>(source: &S, id: DatasetId, interval: StdDuration) -> JobOutcome
where
	S: ?Sized + StatusSource,
{
	drive(source, id, interval, |_, _| {}).await
}

/// Lists datasets, repeating every `interval` while any of them is pending or processing.
///
/// The first listing is immediate. Retryable failures are logged and retried; auth-terminal
/// errors are returned.
pub async fn poll_datasets_until_settled<S>(
	source: &S,
	interval: StdDuration,
) -> Result<Vec<DatasetRecord>>
where
	S: ?Sized + StatusSource,
{
	let mut ticker = time::interval(interval);

	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

	loop {
		ticker.tick().await;

		match source.datasets().await {
			Ok(records) if records.iter().all(|record| record.status.is_terminal()) =>
				return Ok(records),
			Ok(_) => {},
			Err(e) if e.is_auth_terminal() => return Err(e),
			Err(e) => obs::warn_event(OpKind::Poll, "Dataset list poll failed; retrying.", &e),
		}
	}
}

async fn drive<S, F>(source: &S, id: DatasetId, interval: StdDuration, mut on_poll: F) -> JobOutcome
where
	S: ?Sized + StatusSource,
	F: FnMut(u32, Option<JobStatus>),
{
	let mut ticker = time::interval_at(Instant::now() + interval, interval);
	let mut polls = 0_u32;

	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

	loop {
		ticker.tick().await;
		polls = polls.saturating_add(1);

		match source.status(id).await {
			Ok(report) => {
				on_poll(polls, Some(report.status));

				if let Some(outcome) = JobOutcome::from_terminal(report) {
					obs::info_event(OpKind::Poll, "Dataset reached a terminal state.", &id);

					return outcome;
				}
			},
			Err(e) if e.is_auth_terminal() => {
				on_poll(polls, None);
				obs::warn_event(OpKind::Poll, "Status polling abandoned.", &e);

				return JobOutcome::Abandoned { reason: e.to_string() };
			},
			Err(e) => {
				on_poll(polls, None);
				obs::warn_event(OpKind::Poll, "Status poll failed; retrying next tick.", &e);
			},
		}
	}
}

/// Receiver side of a tracked job.
#[derive(Clone, Debug)]
pub struct JobWatch(watch::Receiver<JobSnapshot>);
impl JobWatch {
	/// Returns the latest snapshot.
	pub fn snapshot(&self) -> JobSnapshot {
		self.0.borrow().clone()
	}

	/// Returns the latest known status.
	pub fn status(&self) -> JobStatus {
		self.0.borrow().status
	}

	/// Waits for the next change and returns it; `None` once no more changes can arrive.
	pub async fn changed(&mut self) -> Option<JobSnapshot> {
		self.0.changed().await.ok()?;

		Some(self.0.borrow_and_update().clone())
	}

	/// Waits until polling stops and returns how the job ended.
	pub async fn outcome(&mut self) -> JobOutcome {
		loop {
			if let Some(outcome) = self.0.borrow_and_update().outcome.clone() {
				return outcome;
			}
			if self.0.changed().await.is_err() {
				return self.0.borrow().outcome.clone().unwrap_or(JobOutcome::Cancelled);
			}
		}
	}
}

struct TrackedJob {
	sender: Arc<watch::Sender<JobSnapshot>>,
	handle: Option<JoinHandle<()>>,
}
impl TrackedJob {
	fn is_finished(&self) -> bool {
		self.sender.borrow().outcome.is_some()
	}

	fn stop(self) {
		if let Some(handle) = self.handle {
			handle.abort();
		}

		self.sender.send_if_modified(|snapshot| {
			if snapshot.outcome.is_some() {
				return false;
			}

			snapshot.outcome = Some(JobOutcome::Cancelled);

			true
		});
	}
}

/// Tracks uploaded datasets until their processing finishes.
///
/// Each tracked dataset gets one background task; tracking an id again subscribes to the existing
/// task. Dropping the poller cancels every task that is still running.
pub struct JobPoller<S>
where
	S: StatusSource,
{
	source: Arc<S>,
	interval: StdDuration,
	jobs: Mutex<HashMap<DatasetId, TrackedJob>>,
}
impl<S> JobPoller<S>
where
	S: StatusSource,
{
	/// Creates a poller that queries `source` every `interval`.
	pub fn new(source: Arc<S>, interval: StdDuration) -> Self {
		Self { source, interval, jobs: Default::default() }
	}

	/// Polling interval.
	pub fn interval(&self) -> StdDuration {
		self.interval
	}

	/// Starts tracking `id`, whose status at upload time was `initial`.
	///
	/// While a task for `id` is still polling, the returned watch subscribes to it. Finished jobs
	/// are forgotten here, so tracking an abandoned or completed id again starts a new task.
	/// Existing watches keep their final snapshot. A terminal `initial` status resolves
	/// immediately without starting a timer. Must be called from within a Tokio runtime.
	pub fn track(&self, id: DatasetId, initial: JobStatus) -> JobWatch {
		let mut jobs = self.jobs.lock();

		jobs.retain(|_, job| !job.is_finished());

		if let Some(job) = jobs.get(&id) {
			return JobWatch(job.sender.subscribe());
		}

		let outcome =
			JobOutcome::from_terminal(StatusReport { status: initial, analysis: None, error: None });
		let terminal = outcome.is_some();
		let (sender, receiver) =
			watch::channel(JobSnapshot { id, status: initial, polls: 0, outcome });
		let sender = Arc::new(sender);
		let handle = (!terminal).then(|| self.spawn(id, sender.clone()));

		jobs.insert(id, TrackedJob { sender, handle });

		JobWatch(receiver)
	}

	/// Stops polling `id`. Returns `false` if it was not tracked.
	pub fn cancel(&self, id: DatasetId) -> bool {
		match self.jobs.lock().remove(&id) {
			Some(job) => {
				job.stop();

				true
			},
			None => false,
		}
	}

	/// Returns `true` while `id` is tracked and still polling.
	pub fn is_polling(&self, id: DatasetId) -> bool {
		self.jobs
			.lock()
			.get(&id)
			.and_then(|job| job.handle.as_ref())
			.is_some_and(|handle| !handle.is_finished())
	}

	/// Number of tracked datasets; finished ones count until the next [`JobPoller::track`].
	pub fn tracked(&self) -> usize {
		self.jobs.lock().len()
	}

	fn spawn(&self, id: DatasetId, sender: Arc<watch::Sender<JobSnapshot>>) -> JoinHandle<()> {
		let source = self.source.clone();
		let interval = self.interval;

		tokio::spawn(async move {
			let outcome = drive(source.as_ref(), id, interval, |polls, status| {
				sender.send_modify(|snapshot| {
					snapshot.polls = polls;

					if let Some(status) = status {
						snapshot.status = status;
					}
				});
			})
			.await;

			sender.send_modify(|snapshot| snapshot.outcome = Some(outcome));
		})
	}
}
impl<S> Debug for JobPoller<S>
where
	S: StatusSource,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("JobPoller")
			.field("interval", &self.interval)
			.field("tracked", &self.tracked())
			.finish()
	}
}
impl<S> Drop for JobPoller<S>
where
	S: StatusSource,
{
	fn drop(&mut self) {
		for (_, job) in self.jobs.get_mut().drain() {
			job.stop();
		}
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{
		collections::VecDeque,
		io,
		sync::atomic::{AtomicUsize, Ordering},
	};
	// self
	use super::*;
	use crate::{error::TransportError, gateway::RefreshFailure};

	const INTERVAL: StdDuration = StdDuration::from_secs(3);

	/// Replays scripted status results; once exhausted it keeps reporting `pending`.
	#[derive(Default)]
	struct ScriptedSource {
		statuses: Mutex<VecDeque<Result<StatusReport>>>,
		listings: Mutex<VecDeque<Vec<DatasetRecord>>>,
		calls: AtomicUsize,
	}
	impl ScriptedSource {
		fn new(script: impl IntoIterator<Item = Result<StatusReport>>) -> Arc<Self> {
			Arc::new(Self { statuses: Mutex::new(script.into_iter().collect()), ..Default::default() })
		}

		fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl StatusSource for ScriptedSource {
		fn status(&self, _: DatasetId) -> StatusFuture<'_> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let next = self.statuses.lock().pop_front().unwrap_or_else(|| Ok(report(JobStatus::Pending)));

			Box::pin(async move { next })
		}

		fn datasets(&self) -> DatasetsFuture<'_> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let next = self.listings.lock().pop_front().unwrap_or_default();

			Box::pin(async move { Ok(next) })
		}
	}

	fn report(status: JobStatus) -> StatusReport {
		StatusReport { status, analysis: None, error: None }
	}

	fn offline() -> Error {
		TransportError::Io(io::Error::other("connection reset")).into()
	}

	fn record(id: u64, status: JobStatus) -> DatasetRecord {
		DatasetRecord {
			id: DatasetId(id),
			dataset_file: format!("/media/datasets/{id}.csv"),
			pdf_file: None,
			status,
			error_log: None,
			uploaded_at: OffsetDateTime::UNIX_EPOCH,
		}
	}

	#[tokio::test(start_paused = true)]
	async fn job_42_is_delivered_once_and_polling_stops() {
		let analysis = serde_json::json!({ "total_count": 15, "averages": { "Flowrate": 120.5 } });
		let source = ScriptedSource::new([
			Ok(report(JobStatus::Pending)),
			Ok(report(JobStatus::Processing)),
			Ok(StatusReport {
				status: JobStatus::Completed,
				analysis: Some(analysis.clone()),
				error: None,
			}),
		]);
		let poller = JobPoller::new(source.clone(), INTERVAL);
		let mut watch = poller.track(DatasetId(42), JobStatus::Pending);

		time::sleep(INTERVAL / 2).await;

		assert_eq!(source.calls(), 0);

		let outcome = watch.outcome().await;

		assert_eq!(outcome, JobOutcome::Completed { analysis: Some(analysis) });
		assert_eq!(source.calls(), 3);

		time::sleep(INTERVAL * 10).await;

		assert_eq!(source.calls(), 3);
		assert!(!poller.is_polling(DatasetId(42)));

		let snapshot = watch.snapshot();

		assert_eq!(snapshot.status, JobStatus::Completed);
		assert_eq!(snapshot.polls, 3);

		drop(poller);

		assert!(watch.changed().await.is_none());
	}

	#[tokio::test(start_paused = true)]
	async fn failed_status_surfaces_server_message() {
		let source = ScriptedSource::new([Ok(StatusReport {
			status: JobStatus::Failed,
			analysis: None,
			error: Some("Missing required column: Flowrate".into()),
		})]);
		let poller = JobPoller::new(source.clone(), INTERVAL);
		let outcome = poller.track(DatasetId(7), JobStatus::Pending).outcome().await;

		assert_eq!(outcome, JobOutcome::Failed { message: "Missing required column: Flowrate".into() });
		assert_eq!(source.calls(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn network_errors_are_retried_on_the_next_tick() {
		let source = ScriptedSource::new([
			Err(offline()),
			Err(offline()),
			Ok(StatusReport { status: JobStatus::Failed, analysis: None, error: None }),
		]);
		let outcome = poll_until_terminal(source.as_ref(), DatasetId(3), INTERVAL).await;

		assert_eq!(outcome, JobOutcome::Failed { message: UNKNOWN_FAILURE.into() });
		assert_eq!(source.calls(), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn expired_session_abandons_polling() {
		let source = ScriptedSource::new([Err(Error::SessionExpired {
			reason: RefreshFailure::Rejected { status: 401 },
		})]);
		let poller = JobPoller::new(source.clone(), INTERVAL);
		let outcome = poller.track(DatasetId(5), JobStatus::Processing).outcome().await;

		assert!(matches!(outcome, JobOutcome::Abandoned { .. }));

		time::sleep(INTERVAL * 5).await;

		assert_eq!(source.calls(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn abandoned_job_can_be_tracked_again() {
		let source = ScriptedSource::new([
			Err(Error::SessionExpired { reason: RefreshFailure::Rejected { status: 401 } }),
			Ok(report(JobStatus::Completed)),
		]);
		let poller = JobPoller::new(source.clone(), INTERVAL);
		let mut first = poller.track(DatasetId(42), JobStatus::Processing);

		assert!(matches!(first.outcome().await, JobOutcome::Abandoned { .. }));

		// The user logged in again.
		let mut second = poller.track(DatasetId(42), JobStatus::Processing);

		assert_eq!(second.outcome().await, JobOutcome::Completed { analysis: None });
		assert_eq!(source.calls(), 2);
		assert_eq!(poller.tracked(), 1);
		assert!(matches!(first.snapshot().outcome, Some(JobOutcome::Abandoned { .. })));
	}

	#[tokio::test(start_paused = true)]
	async fn finished_jobs_are_pruned_on_track() {
		let source = ScriptedSource::new([]);
		let poller = JobPoller::new(source.clone(), INTERVAL);
		let mut done = poller.track(DatasetId(1), JobStatus::Failed);

		assert_eq!(done.outcome().await, JobOutcome::Failed { message: UNKNOWN_FAILURE.into() });

		poller.track(DatasetId(2), JobStatus::Pending);

		assert_eq!(poller.tracked(), 1);
		assert!(poller.is_polling(DatasetId(2)));
		assert_eq!(done.outcome().await, JobOutcome::Failed { message: UNKNOWN_FAILURE.into() });
	}

	#[tokio::test(start_paused = true)]
	async fn terminal_initial_status_starts_no_timer() {
		let source = ScriptedSource::new([]);
		let poller = JobPoller::new(source.clone(), INTERVAL);
		let mut watch = poller.track(DatasetId(1), JobStatus::Completed);

		assert_eq!(watch.outcome().await, JobOutcome::Completed { analysis: None });

		time::sleep(INTERVAL * 3).await;

		assert_eq!(source.calls(), 0);
		assert!(!poller.is_polling(DatasetId(1)));
	}

	#[tokio::test(start_paused = true)]
	async fn tracking_twice_shares_one_task() {
		let source = ScriptedSource::new([]);
		let poller = JobPoller::new(source.clone(), INTERVAL);
		let first = poller.track(DatasetId(9), JobStatus::Pending);
		let second = poller.track(DatasetId(9), JobStatus::Pending);

		time::sleep(INTERVAL * 4 + INTERVAL / 2).await;

		assert_eq!(poller.tracked(), 1);
		assert_eq!(source.calls(), 4);
		assert_eq!(first.snapshot(), second.snapshot());
	}

	#[tokio::test(start_paused = true)]
	async fn cancel_and_drop_stop_polling() {
		let source = ScriptedSource::new([]);
		let poller = JobPoller::new(source.clone(), INTERVAL);
		let mut cancelled = poller.track(DatasetId(1), JobStatus::Pending);
		let mut dropped = poller.track(DatasetId(2), JobStatus::Pending);

		time::sleep(INTERVAL + INTERVAL / 2).await;

		assert_eq!(source.calls(), 2);
		assert!(poller.cancel(DatasetId(1)));
		assert!(!poller.cancel(DatasetId(1)));
		assert_eq!(cancelled.outcome().await, JobOutcome::Cancelled);

		drop(poller);

		assert_eq!(dropped.outcome().await, JobOutcome::Cancelled);

		time::sleep(INTERVAL * 5).await;

		assert_eq!(source.calls(), 2);
	}

	#[tokio::test(start_paused = true)]
	async fn dataset_list_polls_until_settled() {
		let source = ScriptedSource::new([]);

		source.listings.lock().extend([
			vec![record(2, JobStatus::Processing), record(1, JobStatus::Completed)],
			vec![record(2, JobStatus::Processing), record(1, JobStatus::Completed)],
			vec![record(2, JobStatus::Failed), record(1, JobStatus::Completed)],
		]);

		let started = Instant::now();
		let records = poll_datasets_until_settled(source.as_ref(), INTERVAL)
			.await
			.expect("Listing should settle.");

		assert_eq!(records[0].status, JobStatus::Failed);
		assert_eq!(source.calls(), 3);
		assert!(started.elapsed() >= INTERVAL * 2 && started.elapsed() < INTERVAL * 3);
	}
}
