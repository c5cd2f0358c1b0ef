//! Durable append-only disk queue for buffered uploads.
//!
//! Each entry is a flat `{len:u32, headers_len:u16, headers:bytes, body:bytes}`
//! record appended to the current active file under `dir`. Files roll at
//! `ROLL_BYTES` and are `fsync`'d on roll, not per entry (fsync-per-entry
//! would make Bouncer's whole point — staying up when Gateway is down —
//! too slow to absorb a real outage's backlog). An in-memory index tracks
//! (file, offset, len, enqueued_at, consumed) per entry and is persisted to
//! `queue/index.json` on graceful shutdown and on a timer, grounded on the
//! teacher's durable-journal shape (`services/forwarder/src/storage/journal.rs`:
//! PRAGMAs + integrity check at open) reshaped around the spec-frozen
//! on-disk record format instead of SQLite rows.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

const ROLL_BYTES: u64 = 64 * 1024 * 1024;
const INDEX_FILE: &str = "index.json";

#[derive(Debug)]
pub enum JournalError {
    Io(std::io::Error),
    Corrupt(String),
}

impl std::fmt::Display for JournalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JournalError::Io(e) => write!(f, "journal I/O error: {e}"),
            JournalError::Corrupt(s) => write!(f, "corrupt journal entry: {s}"),
        }
    }
}

impl std::error::Error for JournalError {}

impl From<std::io::Error> for JournalError {
    fn from(e: std::io::Error) -> Self {
        JournalError::Io(e)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub file: String,
    pub offset: u64,
    pub headers: Vec<(String, String)>,
    pub body_len: u32,
    pub enqueued_at_unix: u64,
}

#[derive(Default, Serialize, Deserialize)]
struct IndexFile {
    entries: Vec<QueueEntry>,
}

struct Inner {
    active_path: PathBuf,
    active_file: File,
    active_len: u64,
    entries: VecDeque<QueueEntry>,
}

/// The durable disk-backed upload queue for a single Bouncer instance.
pub struct Journal {
    dir: PathBuf,
    inner: Mutex<Inner>,
}

impl Journal {
    pub fn open(dir: &Path) -> Result<Self, JournalError> {
        std::fs::create_dir_all(dir)?;
        let entries = load_index(dir)?;
        let active_path = dir.join(active_file_name(&entries));
        let active_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&active_path)?;
        let active_len = active_file.metadata()?.len();

        Ok(Journal {
            dir: dir.to_owned(),
            inner: Mutex::new(Inner {
                active_path,
                active_file,
                active_len,
                entries,
            }),
        })
    }

    /// Append `(headers, body)` to the active file, rolling to a new file
    /// first if the active file has reached `ROLL_BYTES`.
    pub fn enqueue(&self, headers: &[(String, String)], body: &[u8]) -> Result<(), JournalError> {
        let mut inner = self.inner.lock().expect("journal mutex poisoned");

        if inner.active_len >= ROLL_BYTES {
            self.roll(&mut inner)?;
        }

        let headers_blob = encode_headers(headers);
        let headers_len: u16 = headers_blob
            .len()
            .try_into()
            .map_err(|_| JournalError::Corrupt("headers too large".to_owned()))?;
        let record_len: u32 = (2 + headers_blob.len() + body.len())
            .try_into()
            .map_err(|_| JournalError::Corrupt("record too large".to_owned()))?;

        let offset = inner.active_len;
        inner.active_file.write_all(&record_len.to_be_bytes())?;
        inner.active_file.write_all(&headers_len.to_be_bytes())?;
        inner.active_file.write_all(&headers_blob)?;
        inner.active_file.write_all(body)?;
        inner.active_len += 4 + u64::from(record_len);

        let file_name = inner
            .active_path
            .file_name()
            .expect("active path always has a file name")
            .to_string_lossy()
            .into_owned();
        inner.entries.push_back(QueueEntry {
            file: file_name,
            offset,
            headers: headers.to_vec(),
            body_len: body
                .len()
                .try_into()
                .map_err(|_| JournalError::Corrupt("body too large".to_owned()))?,
            enqueued_at_unix: now_unix(),
        });

        Ok(())
    }

    fn roll(&self, inner: &mut Inner) -> Result<(), JournalError> {
        inner.active_file.sync_all()?;
        let current_name = inner
            .active_path
            .file_name()
            .expect("active path always has a file name")
            .to_string_lossy();
        let next_path = self.dir.join(next_file_name(&current_name));
        let next_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&next_path)?;
        inner.active_path = next_path;
        inner.active_file = next_file;
        inner.active_len = 0;
        Ok(())
    }

    /// Peek the oldest unconsumed entry without removing it.
    pub fn peek(&self) -> Option<QueueEntry> {
        let inner = self.inner.lock().expect("journal mutex poisoned");
        inner.entries.front().cloned()
    }

    /// Read the body bytes for `entry` from disk.
    pub fn read_body(&self, entry: &QueueEntry) -> Result<Vec<u8>, JournalError> {
        let path = self.dir.join(&entry.file);
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(entry.offset))?;

        let mut len_buf = [0u8; 4];
        file.read_exact(&mut len_buf)?;
        let mut headers_len_buf = [0u8; 2];
        file.read_exact(&mut headers_len_buf)?;
        let headers_len = u16::from_be_bytes(headers_len_buf) as usize;

        let mut headers_blob = vec![0u8; headers_len];
        file.read_exact(&mut headers_blob)?;

        let mut body = vec![0u8; entry.body_len as usize];
        file.read_exact(&mut body)?;
        Ok(body)
    }

    /// Remove the oldest entry (it has been durably forwarded upstream).
    pub fn pop_front(&self) {
        let mut inner = self.inner.lock().expect("journal mutex poisoned");
        inner.entries.pop_front();
    }

    /// Discard entries enqueued more than `max_age` ago.
    pub fn prune_expired(&self, max_age: std::time::Duration) -> usize {
        let mut inner = self.inner.lock().expect("journal mutex poisoned");
        let cutoff = now_unix().saturating_sub(max_age.as_secs());
        let before = inner.entries.len();
        inner.entries.retain(|e| e.enqueued_at_unix >= cutoff);
        before - inner.entries.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("journal mutex poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persist the in-memory index to `queue/index.json`. Called on a timer
    /// and on graceful shutdown.
    pub fn flush_index(&self) -> Result<(), JournalError> {
        let inner = self.inner.lock().expect("journal mutex poisoned");
        let index = IndexFile {
            entries: inner.entries.iter().cloned().collect(),
        };
        let text = serde_json::to_string(&index)
            .map_err(|e| JournalError::Corrupt(e.to_string()))?;
        std::fs::write(self.dir.join(INDEX_FILE), text)?;
        Ok(())
    }
}

fn load_index(dir: &Path) -> Result<VecDeque<QueueEntry>, JournalError> {
    let path = dir.join(INDEX_FILE);
    if !path.exists() {
        return Ok(VecDeque::new());
    }
    let text = std::fs::read_to_string(path)?;
    let index: IndexFile =
        serde_json::from_str(&text).map_err(|e| JournalError::Corrupt(e.to_string()))?;
    Ok(index.entries.into_iter().collect())
}

fn active_file_name(entries: &VecDeque<QueueEntry>) -> String {
    entries
        .back()
        .map(|e| e.file.clone())
        .unwrap_or_else(|| "queue-0000000001.log".to_owned())
}

/// The next file name in the roll sequence: `queue-0000000001.log` ->
/// `queue-0000000002.log`. Falls back to the default first name if `current`
/// doesn't match the expected `queue-<10 digits>.log` shape.
fn next_file_name(current: &str) -> String {
    let digits = current
        .strip_prefix("queue-")
        .and_then(|s| s.strip_suffix(".log"));
    match digits.and_then(|d| d.parse::<u64>().ok()) {
        Some(n) => format!("queue-{:010}.log", n + 1),
        None => "queue-0000000001.log".to_owned(),
    }
}

fn encode_headers(headers: &[(String, String)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (k, v) in headers {
        out.extend_from_slice(k.as_bytes());
        out.push(b'\n');
        out.extend_from_slice(v.as_bytes());
        out.push(b'\n');
    }
    out
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
