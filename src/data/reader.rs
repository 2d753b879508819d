use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use crate::error::LoadErrorKind;

// ---------------------------------------------------------------------------
// RawTable – header plus text rows, before coercion
// ---------------------------------------------------------------------------

/// A parsed CSV file whose cells are still text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    /// Where the bytes came from; labels errors found after parsing.
    pub origin: PathBuf,
    /// Header names in file order.
    pub columns: Vec<String>,
    /// Data rows in file order; each has `columns.len()` cells.
    pub rows: Vec<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Read a CSV file and check that its header carries `expected_header`.
///
/// The bytes are fetched on a helper thread; a read that has not finished
/// within `timeout` fails as [`LoadErrorKind::SourceNotFound`].
pub fn read_table(
    path: &Path,
    expected_header: &[&str],
    timeout: Duration,
) -> Result<RawTable, LoadErrorKind> {
    let bytes = read_bytes(path, timeout)?;
    let table = parse_table(path, &bytes)?;

    let present: BTreeSet<&str> = table.columns.iter().map(String::as_str).collect();
    let missing: Vec<String> = expected_header
        .iter()
        .filter(|c| !present.contains(*c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LoadErrorKind::SchemaMismatch {
            missing,
            unexpected: Vec::new(),
        });
    }

    log::debug!(
        "read {} ({} columns, {} rows)",
        path.display(),
        table.columns.len(),
        table.rows.len()
    );
    Ok(table)
}

/// CSV layout: one header row, then data rows with exactly as many fields.
/// A single ragged row fails the whole table.  `origin` only labels errors.
pub fn parse_table(origin: &Path, bytes: &[u8]) -> Result<RawTable, LoadErrorKind> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(bytes);

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| malformed(origin, e))?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
            h.trim().to_string()
        })
        .collect();

    if columns.is_empty() || columns.iter().all(|c| c.is_empty()) {
        return Err(LoadErrorKind::MalformedTable {
            path: origin.to_path_buf(),
            line: Some(1),
            reason: "missing header row".to_string(),
        });
    }

    let mut seen = BTreeSet::new();
    for col in &columns {
        if !seen.insert(col.as_str()) {
            return Err(LoadErrorKind::MalformedTable {
                path: origin.to_path_buf(),
                line: Some(1),
                reason: format!("duplicate column '{col}'"),
            });
        }
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| malformed(origin, e))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(RawTable {
        origin: origin.to_path_buf(),
        columns,
        rows,
    })
}

// -- helpers --

/// Paths whose reader thread outlived its timeout and is still blocked.
static STALLED: Mutex<BTreeSet<PathBuf>> = Mutex::new(BTreeSet::new());

fn stalled() -> MutexGuard<'static, BTreeSet<PathBuf>> {
    STALLED.lock().unwrap_or_else(|e| e.into_inner())
}

fn read_bytes(path: &Path, timeout: Duration) -> Result<Vec<u8>, LoadErrorKind> {
    // A hung mount would otherwise collect one blocked thread per reload.
    if stalled().contains(path) {
        log::warn!("{}: earlier read still blocked, not starting another", path.display());
        return Err(not_found(path, "an earlier read is still pending".to_string()));
    }

    let (tx, rx) = mpsc::channel();
    let finished = Arc::new(AtomicBool::new(false));
    let owned: PathBuf = path.to_path_buf();
    let done = Arc::clone(&finished);
    thread::Builder::new()
        .name("csv-read".to_string())
        .spawn(move || {
            let result = std::fs::read(&owned);
            {
                let mut stalled = stalled();
                stalled.remove(&owned);
                done.store(true, Ordering::SeqCst);
            }
            // The receiver may have given up already; nothing to do then.
            let _ = tx.send(result);
        })
        .map_err(|e| not_found(path, format!("cannot spawn reader thread: {e}")))?;

    match rx.recv_timeout(timeout) {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(e)) if e.kind() == ErrorKind::NotFound => Err(not_found(path, "no such file".to_string())),
        Ok(Err(e)) => Err(not_found(path, e.to_string())),
        Err(mpsc::RecvTimeoutError::Timeout) => {
            // `finished` is only set under the same lock, so the thread either
            // already cleaned up or will remove this entry when it returns.
            let mut stalled = stalled();
            if !finished.load(Ordering::SeqCst) {
                stalled.insert(path.to_path_buf());
                log::warn!(
                    "{}: read timed out after {} ms, abandoning reader thread",
                    path.display(),
                    timeout.as_millis()
                );
            }
            Err(not_found(
                path,
                format!("timed out after {} ms", timeout.as_millis()),
            ))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(not_found(path, "reader thread exited".to_string()))
        }
    }
}

#[cfg(test)]
pub(crate) fn is_stalled(path: &Path) -> bool {
    stalled().contains(path)
}

/// A named pipe with no writer: opening it for reading blocks.
#[cfg(all(test, unix))]
pub(crate) fn make_fifo(path: &Path) {
    let status = std::process::Command::new("mkfifo")
        .arg(path)
        .status()
        .unwrap();
    assert!(status.success());
}

/// Open the write end once so a reader blocked on `path` returns.
#[cfg(all(test, unix))]
pub(crate) fn release_fifo(path: &Path) {
    drop(std::fs::OpenOptions::new().write(true).open(path).unwrap());
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while is_stalled(path) {
        assert!(std::time::Instant::now() < deadline, "reader thread never finished");
        thread::sleep(Duration::from_millis(10));
    }
}

fn not_found(path: &Path, reason: String) -> LoadErrorKind {
    LoadErrorKind::SourceNotFound {
        path: path.to_path_buf(),
        reason,
    }
}

fn malformed(path: &Path, err: csv::Error) -> LoadErrorKind {
    let line = err.position().map(|p| p.line());
    let reason = match err.kind() {
        csv::ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => format!("found {len} fields, expected {expected_len}"),
        csv::ErrorKind::Utf8 { err, .. } => format!("invalid UTF-8: {err}"),
        _ => err.to_string(),
    };
    LoadErrorKind::MalformedTable {
        path: path.to_path_buf(),
        line,
        reason,
    }
}
