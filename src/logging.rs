use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Append-only JSON-lines event log. Writes are best-effort: a launch never
/// fails because its own diagnostics could not be recorded.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    path: Option<PathBuf>,
}

impl EventLog {
    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn to_stderr() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn info(&self, event: &str, message: &str) {
        self.emit(Level::Info, event, message);
    }

    pub fn warn(&self, event: &str, message: &str) {
        self.emit(Level::Warn, event, message);
    }

    pub fn error(&self, event: &str, message: &str) {
        self.emit(Level::Error, event, message);
    }

    pub fn emit(&self, level: Level, event: &str, message: &str) {
        let payload = serde_json::json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "level": level.as_str(),
            "event": event,
            "message": message,
        });

        let Ok(line) = serde_json::to_string(&payload) else {
            return;
        };

        let Some(path) = &self.path else {
            eprintln!("{line}");
            return;
        };
        if let Some(parent) = path.parent() {
            if fs::create_dir_all(parent).is_err() {
                return;
            }
        }
        let Ok(mut file) = fs::OpenOptions::new().create(true).append(true).open(path) else {
            return;
        };
        let _ = writeln!(file, "{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn events_append_as_json_lines() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("logs/launcher.log");
        let log = EventLog::to_file(&path);

        log.info("provision.start", "requesting 100 GiB");
        log.warn("log_upload.skipped", "no run name");

        let raw = fs::read_to_string(&path).expect("read log");
        let lines: Vec<serde_json::Value> = raw
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["level"], "info");
        assert_eq!(lines[0]["event"], "provision.start");
        assert_eq!(lines[1]["level"], "warn");
        assert_eq!(lines[1]["message"], "no run name");
        assert!(lines[1]["timestamp"].as_str().is_some());
    }

    #[test]
    fn unwritable_log_path_is_ignored() {
        let dir = tempdir().expect("tempdir");
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file").expect("write blocker");
        let log = EventLog::to_file(blocker.join("launcher.log"));
        log.error("pipeline.failed", "exit code 1");
    }
}
