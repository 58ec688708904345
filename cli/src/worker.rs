//! Background worker that owns the engine.
//!
//! The engine blocks on the network, so the interactive loop hands it to a
//! dedicated thread and talks to it over channels. Replies arrive in request
//! order on the loop's own thread.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use fxrates_common::Currency;
use fxrates_engine::{Conversion, FxEngine, FxResult, RateSnapshot, RateStatus, RefreshOutcome};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

/// Work the engine thread accepts.
#[derive(Debug)]
enum Job {
    Refresh { force: bool },
    Convert { amount: Decimal, from: String, to: String },
}

/// Completed work, marshalled back to the caller.
#[derive(Debug)]
pub enum Reply {
    Refreshed {
        outcome: FxResult<RefreshOutcome>,
        status: RateStatus,
        /// Copy of the snapshot the engine holds afterwards.
        snapshot: Option<RateSnapshot>,
    },
    Converted(FxResult<Conversion>),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkerError {
    /// A refresh is already in flight.
    #[error("Refresh already in progress")]
    Busy,

    /// The engine thread has exited.
    #[error("Engine worker stopped")]
    Disconnected,
}

/// Handle to the engine thread.
pub struct EngineWorker {
    jobs: Option<Sender<Job>>,
    replies: Receiver<Reply>,
    refreshing: bool,
    handle: Option<JoinHandle<()>>,
}

impl EngineWorker {
    /// Move `engine` onto its own thread.
    pub fn spawn(engine: FxEngine) -> Self {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (reply_tx, reply_rx) = mpsc::channel::<Reply>();

        let handle = thread::Builder::new()
            .name("fx-engine".to_string())
            .spawn(move || run(engine, job_rx, reply_tx))
            .ok();

        Self {
            jobs: Some(job_tx),
            replies: reply_rx,
            refreshing: false,
            handle,
        }
    }

    /// Queue a refresh. Rejected while another refresh is in flight.
    pub fn request_refresh(&mut self, force: bool) -> Result<(), WorkerError> {
        if self.refreshing {
            return Err(WorkerError::Busy);
        }
        self.send(Job::Refresh { force })?;
        self.refreshing = true;
        Ok(())
    }

    /// Queue a conversion.
    pub fn request_convert(
        &mut self,
        amount: Decimal,
        from: &Currency,
        to: &Currency,
    ) -> Result<(), WorkerError> {
        self.send(Job::Convert {
            amount,
            from: from.code().to_string(),
            to: to.code().to_string(),
        })
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    /// Take a reply if one is ready.
    pub fn poll(&mut self) -> Result<Option<Reply>, WorkerError> {
        match self.replies.try_recv() {
            Ok(reply) => Ok(Some(self.settle(reply))),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(WorkerError::Disconnected),
        }
    }

    /// Block until the next reply.
    pub fn wait(&mut self) -> Result<Reply, WorkerError> {
        let reply = self.replies.recv().map_err(|_| WorkerError::Disconnected)?;
        Ok(self.settle(reply))
    }

    fn send(&mut self, job: Job) -> Result<(), WorkerError> {
        self.jobs
            .as_ref()
            .ok_or(WorkerError::Disconnected)?
            .send(job)
            .map_err(|_| WorkerError::Disconnected)
    }

    fn settle(&mut self, reply: Reply) -> Reply {
        if matches!(reply, Reply::Refreshed { .. }) {
            self.refreshing = false;
        }
        reply
    }
}

impl Drop for EngineWorker {
    fn drop(&mut self) {
        // Closing the job channel ends the worker loop.
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run(mut engine: FxEngine, jobs: Receiver<Job>, replies: Sender<Reply>) {
    for job in jobs {
        debug!(?job, "Engine worker picked up job");

        let reply = match job {
            Job::Refresh { force } => {
                let outcome = engine.refresh(force);
                let status = RateStatus::from_refresh(&outcome, engine.source_date());
                Reply::Refreshed {
                    outcome,
                    status,
                    snapshot: engine.snapshot().cloned(),
                }
            }
            Job::Convert { amount, from, to } => {
                Reply::Converted(engine.convert_decimal(amount, &from, &to))
            }
        };

        if replies.send(reply).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxrates_engine::{FxEngineConfig, FxError, MockRateSource};
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use tempfile::TempDir;

    const FEED: &str = r#"<DataSet xmlns="http://www.bnr.ro/xsd"><Body><Cube date="2024-01-05"><Rate currency="EUR">5.0735</Rate><Rate currency="USD">4.5</Rate><Rate currency="HUF" multiplier="100">1.7205</Rate></Cube></Body></DataSet>"#;

    fn engine_with(source: MockRateSource, dir: &TempDir) -> FxEngine {
        let config = FxEngineConfig {
            cache_path: dir.path().join("cache.json"),
            ..Default::default()
        };
        FxEngine::new(Arc::new(source), config)
    }

    #[test]
    fn test_refresh_reply_carries_status() {
        let dir = TempDir::new().unwrap();
        let mut worker = EngineWorker::spawn(engine_with(MockRateSource::serving(FEED), &dir));

        worker.request_refresh(false).unwrap();
        assert!(worker.is_refreshing());
        assert_eq!(worker.request_refresh(false), Err(WorkerError::Busy));

        match worker.wait().unwrap() {
            Reply::Refreshed {
                outcome,
                status,
                snapshot,
            } => {
                assert_eq!(outcome.unwrap(), RefreshOutcome::Online);
                assert_eq!(status.status_line(), "Last update: 2024-01-05 [BNR (Live)]");
                assert_eq!(snapshot.unwrap().currencies().len(), 4);
            }
            other => panic!("unexpected reply {:?}", other),
        }

        assert!(!worker.is_refreshing());
        assert!(worker.poll().unwrap().is_none());
    }

    #[test]
    fn test_convert_reply() {
        let dir = TempDir::new().unwrap();
        let mut worker = EngineWorker::spawn(engine_with(MockRateSource::serving(FEED), &dir));

        worker
            .request_convert(dec!(100), &Currency::eur(), &Currency::usd())
            .unwrap();

        match worker.wait().unwrap() {
            Reply::Converted(Ok(conversion)) => assert_eq!(conversion.result, dec!(112.7444)),
            other => panic!("unexpected reply {:?}", other),
        }
    }

    #[test]
    fn test_unavailable_refresh() {
        let dir = TempDir::new().unwrap();
        let mut worker = EngineWorker::spawn(engine_with(MockRateSource::offline(), &dir));

        worker.request_refresh(true).unwrap();

        match worker.wait().unwrap() {
            Reply::Refreshed {
                outcome,
                status,
                snapshot,
            } => {
                assert!(matches!(outcome, Err(FxError::NoDataAvailable)));
                assert!(!status.is_available());
                assert!(snapshot.is_none());
            }
            other => panic!("unexpected reply {:?}", other),
        }
    }
}
