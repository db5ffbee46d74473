use super::{join_remote, ArtifactStore};
use crate::logging::EventLog;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogUploadOutcome {
    Uploaded { remote: String },
    NoLogFile,
    NoRunName,
    Failed { remote: String, reason: String },
}

impl LogUploadOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded { .. } => "uploaded",
            Self::NoLogFile => "no_log_file",
            Self::NoRunName => "no_run_name",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Best-effort upload of the pipeline log to
/// `<remote_base>/<run_name>/<remote_file_name>`. Nothing here is fatal;
/// every problem becomes an outcome and a warning event.
pub fn upload_log_if_present(
    store: &dyn ArtifactStore,
    log_path: &Path,
    remote_base: &str,
    remote_file_name: &str,
    run_name: Option<&str>,
    events: &EventLog,
) -> LogUploadOutcome {
    if !log_path.is_file() {
        return LogUploadOutcome::NoLogFile;
    }

    let Some(run_name) = run_name.map(str::trim).filter(|name| !name.is_empty()) else {
        println!("Skipping logs upload, failed to get execution name");
        events.warn(
            "log_upload.skipped",
            "execution name unavailable; pipeline log not uploaded",
        );
        return LogUploadOutcome::NoRunName;
    };

    let remote = join_remote(remote_base, &[run_name, remote_file_name]);
    println!(
        "Uploading {} to {remote}",
        log_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| log_path.display().to_string())
    );
    match store.upload(log_path, &remote) {
        Ok(()) => {
            events.info("log_upload.done", &remote);
            LogUploadOutcome::Uploaded { remote }
        }
        Err(err) => {
            events.warn("log_upload.failed", &format!("{remote}: {err}"));
            LogUploadOutcome::Failed {
                remote,
                reason: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{ArtifactError, DirectoryStore};
    use std::cell::Cell;
    use std::fs;
    use tempfile::tempdir;

    struct CountingStore {
        calls: Cell<usize>,
    }

    impl ArtifactStore for CountingStore {
        fn upload(&self, _local: &Path, _remote: &str) -> Result<(), ArtifactError> {
            self.calls.set(self.calls.get() + 1);
            Ok(())
        }
    }

    struct FailingStore;

    impl ArtifactStore for FailingStore {
        fn upload(&self, _local: &Path, remote: &str) -> Result<(), ArtifactError> {
            Err(ArtifactError::Upload {
                url: remote.to_string(),
                reason: "connection refused".to_string(),
            })
        }
    }

    #[test]
    fn absent_log_makes_no_upload_call() {
        let dir = tempdir().expect("tempdir");
        let store = CountingStore {
            calls: Cell::new(0),
        };
        let outcome = upload_log_if_present(
            &store,
            &dir.path().join(".nextflow.log"),
            "latch:///logs",
            "nextflow.log",
            Some("run-1"),
            &EventLog::to_file(dir.path().join("events.log")),
        );
        assert_eq!(outcome, LogUploadOutcome::NoLogFile);
        assert_eq!(store.calls.get(), 0);
    }

    #[test]
    fn missing_run_name_skips_with_warning() {
        let dir = tempdir().expect("tempdir");
        let log = dir.path().join(".nextflow.log");
        fs::write(&log, "log").expect("write");
        let events_path = dir.path().join("events.log");
        let store = CountingStore {
            calls: Cell::new(0),
        };

        let outcome = upload_log_if_present(
            &store,
            &log,
            "latch:///logs",
            "nextflow.log",
            Some("  "),
            &EventLog::to_file(&events_path),
        );

        assert_eq!(outcome, LogUploadOutcome::NoRunName);
        assert_eq!(store.calls.get(), 0);
        let events = fs::read_to_string(events_path).expect("events");
        assert!(events.contains("\"level\":\"warn\""));
        assert!(events.contains("log_upload.skipped"));
    }

    #[test]
    fn upload_lands_under_run_name() {
        let dir = tempdir().expect("tempdir");
        let log = dir.path().join(".nextflow.log");
        fs::write(&log, "log body").expect("write");
        let store = DirectoryStore::new(dir.path().join("store"));

        let outcome = upload_log_if_present(
            &store,
            &log,
            "latch:///your_log_dir/nf_nf_core_crisprseq",
            "nextflow.log",
            Some("run-9"),
            &EventLog::to_file(dir.path().join("events.log")),
        );

        assert_eq!(
            outcome,
            LogUploadOutcome::Uploaded {
                remote: "latch:///your_log_dir/nf_nf_core_crisprseq/run-9/nextflow.log"
                    .to_string()
            }
        );
        assert_eq!(
            fs::read_to_string(
                dir.path()
                    .join("store/your_log_dir/nf_nf_core_crisprseq/run-9/nextflow.log")
            )
            .expect("uploaded copy"),
            "log body"
        );
    }

    #[test]
    fn store_failure_is_reported_not_raised() {
        let dir = tempdir().expect("tempdir");
        let log = dir.path().join(".nextflow.log");
        fs::write(&log, "log").expect("write");

        let outcome = upload_log_if_present(
            &FailingStore,
            &log,
            "latch:///logs",
            "nextflow.log",
            Some("run-2"),
            &EventLog::to_file(dir.path().join("events.log")),
        );
        assert!(matches!(
            outcome,
            LogUploadOutcome::Failed { ref reason, .. } if reason.contains("connection refused")
        ));
    }
}
