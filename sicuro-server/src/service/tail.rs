//! Log Tail Streamer
//!
//! Per-subscriber polling of a log file. Each poll compares the file's
//! modification time with the subscriber's cursor and yields the full content
//! when the file changed. There is no filesystem notification; callers poll
//! on a fixed interval.

use sicuro_core::domain::log::LogCursor;
use sicuro_core::dto::log::LogDelivery;
use std::io;
use std::path::{Path, PathBuf};

/// Streaming state of one subscriber
#[derive(Debug)]
pub struct LogTail {
    path: PathBuf,
    cursor: LogCursor,
    /// Last error delivered, so a persisting error is sent once
    last_error: Option<String>,
}

impl LogTail {
    pub fn new(path: impl Into<PathBuf>, cursor: LogCursor) -> Self {
        Self {
            path: path.into(),
            cursor,
            last_error: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cursor(&self) -> LogCursor {
        self.cursor
    }

    /// Checks the file once
    ///
    /// Returns the full content and the new cursor when the file was modified
    /// after the current cursor. A missing or unreadable file yields its error
    /// text with the cursor unchanged, once per distinct error.
    pub async fn poll(&mut self) -> Option<LogDelivery> {
        match read_if_newer(&self.path, self.cursor).await {
            Ok(Some((content, modified))) => {
                self.cursor = modified;
                self.last_error = None;
                Some(LogDelivery {
                    content,
                    cursor: modified.encode(),
                })
            }
            Ok(None) => {
                self.last_error = None;
                None
            }
            Err(e) => {
                let message = e.to_string();
                if self.last_error.as_deref() == Some(message.as_str()) {
                    return None;
                }
                tracing::debug!("Log {} unavailable: {}", self.path.display(), message);
                self.last_error = Some(message.clone());
                Some(LogDelivery {
                    content: message,
                    cursor: self.cursor.encode(),
                })
            }
        }
    }
}

async fn read_if_newer(path: &Path, cursor: LogCursor) -> io::Result<Option<(String, LogCursor)>> {
    let modified = LogCursor::from_system_time(tokio::fs::metadata(path).await?.modified()?);
    if !modified.is_newer_than(&cursor) {
        return Ok(None);
    }

    let bytes = tokio::fs::read(path).await?;
    Ok(Some((String::from_utf8_lossy(&bytes).into_owned(), modified)))
}

/// Reads a log and its cursor in one go
pub async fn snapshot(path: &Path) -> io::Result<(String, LogCursor)> {
    let modified = LogCursor::from_system_time(tokio::fs::metadata(path).await?.modified()?);
    let bytes = tokio::fs::read(path).await?;
    Ok((String::from_utf8_lossy(&bytes).into_owned(), modified))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File, FileTimes};
    use std::time::{Duration, SystemTime};

    fn set_mtime(path: &Path, time: SystemTime) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_times(FileTimes::new().set_modified(time)).unwrap();
    }

    #[tokio::test]
    async fn test_delivers_only_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc1234.log");
        let t1 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let t2 = t1 + Duration::from_secs(5);

        fs::write(&path, "hello").unwrap();
        set_mtime(&path, t1);

        let mut tail = LogTail::new(&path, LogCursor::EPOCH);
        let first = tail.poll().await.unwrap();
        assert_eq!(first.content, "hello");
        assert_eq!(first.cursor, LogCursor::from_system_time(t1).encode());

        assert_eq!(tail.poll().await, None);

        fs::write(&path, "hello world").unwrap();
        set_mtime(&path, t2);

        let second = tail.poll().await.unwrap();
        assert_eq!(second.content, "hello world");
        assert_eq!(second.cursor, LogCursor::from_system_time(t2).encode());
        assert_eq!(tail.cursor(), LogCursor::from_system_time(t2));
    }

    #[tokio::test]
    async fn test_resume_from_cursor_skips_unchanged_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc1234.log");
        let t1 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);

        fs::write(&path, "hello").unwrap();
        set_mtime(&path, t1);

        let cursor = LogCursor::decode(&LogCursor::from_system_time(t1).encode()).unwrap();
        let mut tail = LogTail::new(&path, cursor);
        assert_eq!(tail.poll().await, None);
    }

    #[tokio::test]
    async fn test_missing_file_reports_error_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.log");

        let mut tail = LogTail::new(&path, LogCursor::EPOCH);
        let delivery = tail.poll().await.unwrap();
        assert!(!delivery.content.is_empty());
        assert_eq!(delivery.cursor, LogCursor::EPOCH.encode());

        assert_eq!(tail.poll().await, None);

        fs::write(&path, "started").unwrap();
        let delivery = tail.poll().await.unwrap();
        assert_eq!(delivery.content, "started");
        assert_ne!(delivery.cursor, LogCursor::EPOCH.encode());
    }

    #[tokio::test]
    async fn test_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc1234.log");
        fs::write(&path, "line\n").unwrap();

        let (content, cursor) = snapshot(&path).await.unwrap();
        assert_eq!(content, "line\n");
        assert!(cursor.is_newer_than(&LogCursor::EPOCH));
        assert!(snapshot(&dir.path().join("nope.log")).await.is_err());
    }
}
