//! Bounded polling for long-running store jobs.

use crate::error::{Error, Result};
use crate::store::{JobId, JobStatus, ObjectStore, Operation};
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// PollSettings bounds a polling loop: a fixed interval between checks and
/// an overall timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSettings {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_interval_ms() -> u64 {
    2_000
}

fn default_timeout_ms() -> u64 {
    600_000
}

impl Default for PollSettings {
    /// Default: check every 2s, give up after 10 minutes.
    fn default() -> Self {
        PollSettings {
            interval_ms: default_interval_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl PollSettings {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        PollSettings {
            interval_ms: interval.as_millis() as u64,
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Calls `check` until it yields a value, an error, or the timeout elapses.
///
/// `check` always runs at least once. Errors from `check` end the loop
/// immediately.
pub fn poll_until<T, F>(settings: &PollSettings, what: &str, mut check: F) -> Result<T>
where
    F: FnMut() -> Result<Option<T>>,
{
    let start = Instant::now();
    let timeout = settings.timeout();
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        if let Some(value) = check()? {
            return Ok(value);
        }
        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Err(Error::Timeout {
                what: what.to_string(),
                elapsed,
            });
        }
        debug!(what, attempt, ?elapsed, "still waiting");
        thread::sleep(settings.interval().min(timeout - elapsed));
    }
}

/// Commits the candidate configuration and waits for the job to finish.
pub fn commit_and_wait<S: ObjectStore + ?Sized>(
    store: &mut S,
    description: Option<&str>,
    settings: &PollSettings,
) -> Result<JobId> {
    let job = store
        .commit(description)
        .map_err(|e| Error::remote(Operation::Commit, "candidate configuration", &[], e))?;
    info!(%job, "commit started");

    let store: &S = store;
    poll_until(settings, &format!("commit {}", job), || {
        match store
            .job_status(job)
            .map_err(|e| Error::remote(Operation::JobStatus, job.to_string(), &[], e))?
        {
            JobStatus::Pending => Ok(None),
            JobStatus::Finished => Ok(Some(())),
            JobStatus::Failed(message) => Err(Error::remote(
                Operation::Commit,
                job.to_string(),
                &[],
                crate::store::StoreError::new(message),
            )),
        }
    })?;

    info!(%job, "commit finished");
    Ok(job)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn fast() -> PollSettings {
        PollSettings::new(Duration::from_millis(1), Duration::from_secs(5))
    }

    #[test]
    fn test_poll_returns_first_value() {
        let mut calls = 0;
        let got = poll_until(&fast(), "counter", || {
            calls += 1;
            Ok(if calls == 3 { Some(calls) } else { None })
        })
        .unwrap();
        assert_eq!(got, 3);
    }

    #[test]
    fn test_poll_times_out() {
        let settings = PollSettings::new(Duration::from_millis(1), Duration::from_millis(0));
        let err = poll_until::<(), _>(&settings, "never", || Ok(None)).unwrap_err();
        assert!(matches!(err, Error::Timeout { ref what, .. } if what == "never"));
    }

    #[test]
    fn test_poll_propagates_errors() {
        let err = poll_until::<(), _>(&fast(), "broken", || Err(Error::validation("boom"))).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_commit_and_wait() {
        let mut store = MemoryStore::new().with_commit_polls(2);
        let job = commit_and_wait(&mut store, Some("rules"), &fast()).unwrap();
        assert_eq!(job, JobId(1));
    }

    #[test]
    fn test_commit_failure() {
        let mut store = MemoryStore::new().with_commit_failure("validation failed");
        let err = commit_and_wait(&mut store, None, &fast()).unwrap_err();
        assert!(matches!(err, Error::RemoteOperation { operation: Operation::Commit, .. }));
        assert!(err.to_string().contains("validation failed"));
    }

    #[test]
    fn test_commit_timeout() {
        let mut store = MemoryStore::new().with_commit_polls(u32::MAX);
        let settings = PollSettings::new(Duration::from_millis(1), Duration::from_millis(5));
        let err = commit_and_wait(&mut store, None, &settings).unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }

    #[test]
    fn test_settings_yaml_defaults() {
        let s: PollSettings = serde_yaml::from_str("intervalMs: 10").unwrap();
        assert_eq!(s.interval(), Duration::from_millis(10));
        assert_eq!(s.timeout_ms, 600_000);
    }
}
