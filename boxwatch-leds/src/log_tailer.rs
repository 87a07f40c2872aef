/// Incremental scan of a growing log file for new `ERROR` lines.
///
/// Only bytes appended since the previous scan are read. A file that shrank
/// (rotated or truncated) is rescanned from the start.
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Case-sensitive marker searched for in each new line.
pub const ERROR_MARKER: &str = "ERROR";

/// Position in the tailed file up to which content has been scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogCursor {
    pub file_path: PathBuf,
    pub byte_offset: u64,
}

impl LogCursor {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            byte_offset: 0,
        }
    }

    fn at(&self, byte_offset: u64) -> Self {
        Self {
            file_path: self.file_path.clone(),
            byte_offset,
        }
    }
}

/// Scan content appended since `cursor` for an error line.
///
/// Returns whether a new line contains [`ERROR_MARKER`], and the cursor for the
/// next call. The new cursor is the file size observed at the start of this
/// scan, whether or not a match was found. A missing file reports no error and
/// a cursor at zero.
pub fn scan_new_errors(cursor: &LogCursor) -> std::io::Result<(bool, LogCursor)> {
    let size = match std::fs::metadata(&cursor.file_path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((false, cursor.at(0))),
        Err(e) => return Err(e),
    };

    let offset = if cursor.byte_offset > size {
        tracing::debug!(
            path = %cursor.file_path.display(),
            offset = cursor.byte_offset,
            size,
            "log file shrank, rescanning from start"
        );
        0
    } else {
        cursor.byte_offset
    };

    if size == offset {
        return Ok((false, cursor.at(size)));
    }

    let found = contains_error(&cursor.file_path, offset, size - offset)?;
    Ok((found, cursor.at(size)))
}

/// Look for the marker in the `len` bytes starting at `offset`.
fn contains_error(path: &Path, offset: u64, len: u64) -> std::io::Result<bool> {
    let mut file = std::fs::File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    let mut reader = BufReader::new(file.take(len));

    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(false);
        }
        if String::from_utf8_lossy(&line).contains(ERROR_MARKER) {
            return Ok(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn append(path: &Path, text: &str) {
        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        f.write_all(text.as_bytes()).unwrap();
    }

    #[test]
    fn test_missing_file_is_no_error_and_resets_cursor() {
        let dir = tempdir().unwrap();
        let cursor = LogCursor {
            file_path: dir.path().join("home-assistant.log"),
            byte_offset: 512,
        };
        let (found, next) = scan_new_errors(&cursor).unwrap();
        assert!(!found);
        assert_eq!(next.byte_offset, 0);
    }

    #[test]
    fn test_new_error_line_detected_then_consumed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("home-assistant.log");
        append(&path, "INFO: starting\n");

        let (found, cursor) = scan_new_errors(&LogCursor::new(&path)).unwrap();
        assert!(!found);
        assert_eq!(cursor.byte_offset, 15);

        append(&path, "ERROR: disk full\n");
        let (found, cursor) = scan_new_errors(&cursor).unwrap();
        assert!(found);
        assert_eq!(cursor.byte_offset, 32);

        let (found, cursor) = scan_new_errors(&cursor).unwrap();
        assert!(!found);
        assert_eq!(cursor.byte_offset, 32);
    }

    #[test]
    fn test_old_errors_before_offset_are_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("home-assistant.log");
        append(&path, "ERROR: old\n");
        let (_, cursor) = scan_new_errors(&LogCursor::new(&path)).unwrap();

        append(&path, "INFO: fine\nWARNING: meh\n");
        let (found, _) = scan_new_errors(&cursor).unwrap();
        assert!(!found);
    }

    #[test]
    fn test_marker_is_case_sensitive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("home-assistant.log");
        append(&path, "error: lowercase does not count\n");
        let (found, _) = scan_new_errors(&LogCursor::new(&path)).unwrap();
        assert!(!found);
    }

    #[test]
    fn test_cursor_advances_without_match() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("home-assistant.log");
        append(&path, "a\nb\nc\n");
        let (found, cursor) = scan_new_errors(&LogCursor::new(&path)).unwrap();
        assert!(!found);
        assert_eq!(cursor.byte_offset, 6);
    }

    #[test]
    fn test_shrunk_file_rescans_from_start() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("home-assistant.log");
        append(&path, "INFO: a long line that makes the file big\n");
        let (_, cursor) = scan_new_errors(&LogCursor::new(&path)).unwrap();

        // Rotation: file replaced with shorter content.
        std::fs::write(&path, "ERROR: new\n").unwrap();
        let (found, cursor) = scan_new_errors(&cursor).unwrap();
        assert!(found);
        assert_eq!(cursor.byte_offset, 11);
    }

    #[test]
    fn test_partial_last_line_is_scanned() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("home-assistant.log");
        append(&path, "INFO: ok\nERROR: no newline yet");
        let (found, cursor) = scan_new_errors(&LogCursor::new(&path)).unwrap();
        assert!(found);
        assert_eq!(cursor.byte_offset, 30);
    }

    #[test]
    fn test_non_utf8_content_does_not_fail() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("home-assistant.log");
        std::fs::write(&path, b"\xff\xfe garbage\nERROR \xc3\n").unwrap();
        let (found, _) = scan_new_errors(&LogCursor::new(&path)).unwrap();
        assert!(found);
    }

    #[test]
    fn test_bytes_past_sampled_size_are_not_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("home-assistant.log");
        append(&path, "INFO: ok\n");
        let sampled = std::fs::metadata(&path).unwrap().len();
        // Written after the size was taken: left for the next scan.
        append(&path, "ERROR: late\n");

        assert!(!contains_error(&path, 0, sampled).unwrap());
        assert!(contains_error(&path, sampled, 12).unwrap());
    }
}
