//! Per-room history logs.
//!
//! Each room has one append-only text file, `<dir>/<room>.log`, holding one
//! `sender: text` line per accepted message. The file is opened and closed
//! around every write so no handle outlives a single append.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::Result;

/// File extension of history logs.
const LOG_EXTENSION: &str = "log";

/// Append-only history logger.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    /// Directory holding the room logs.
    dir: PathBuf,
}

impl HistoryLog {
    /// Create a logger writing under `dir`.
    ///
    /// The directory is created on the first append.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Get the log directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the log file for a room.
    pub fn path_for(&self, room: &str) -> PathBuf {
        self.dir.join(format!("{room}.{LOG_EXTENSION}"))
    }

    /// Append one `sender: text` line to the room's log.
    pub fn append(&self, room: &str, sender: &str, text: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(room))?;
        file.write_all(format_line(sender, text).as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Read every line of a room's log, oldest first.
    ///
    /// A room with no log yet has an empty history.
    pub fn read(&self, room: &str) -> Result<Vec<String>> {
        match fs::read_to_string(self.path_for(room)) {
            Ok(content) => Ok(content.lines().map(str::to_string).collect()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Format a history line. Embedded line breaks are flattened so one message
/// is always one line.
fn format_line(sender: &str, text: &str) -> String {
    let text = text.replace(['\r', '\n'], " ");
    format!("{sender}: {text}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_for() {
        let log = HistoryLog::new("/tmp/history");
        assert_eq!(
            log.path_for("General"),
            PathBuf::from("/tmp/history/General.log")
        );
    }

    #[test]
    fn test_append_in_arrival_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = HistoryLog::new(dir.path());

        log.append("General", "A", "hola").unwrap();
        log.append("General", "B", "que tal").unwrap();
        log.append("General", "A", "bien").unwrap();

        let content = fs::read_to_string(log.path_for("General")).unwrap();
        assert_eq!(content, "A: hola\nB: que tal\nA: bien\n");
    }

    #[test]
    fn test_rooms_have_separate_logs() {
        let dir = tempfile::tempdir().unwrap();
        let log = HistoryLog::new(dir.path());

        log.append("General", "A", "one").unwrap();
        log.append("Deportes", "B", "two").unwrap();

        assert_eq!(log.read("General").unwrap(), vec!["A: one"]);
        assert_eq!(log.read("Deportes").unwrap(), vec!["B: two"]);
    }

    #[test]
    fn test_append_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let log = HistoryLog::new(dir.path().join("nested").join("history"));

        log.append("General", "A", "hola").unwrap();
        assert!(log.path_for("General").exists());
    }

    #[test]
    fn test_append_flattens_newlines() {
        let dir = tempfile::tempdir().unwrap();
        let log = HistoryLog::new(dir.path());

        log.append("General", "A", "line one\nline two").unwrap();
        assert_eq!(log.read("General").unwrap(), vec!["A: line one line two"]);
    }

    #[test]
    fn test_read_missing_room_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = HistoryLog::new(dir.path());
        assert!(log.read("Nowhere").unwrap().is_empty());
    }

    #[test]
    fn test_append_fails_when_dir_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let log = HistoryLog::new(&blocker);
        assert!(log.append("General", "A", "hola").is_err());
    }
}
