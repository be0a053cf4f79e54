//! File identity tracking, rotation detection, and incremental line reads.
//!
//! [`Cursor::poll`] only inspects metadata. [`read_complete_lines`] opens the
//! file and returns the newline-terminated lines inside a byte range. The
//! split keeps rotation detection independent of read failures.

use std::fs;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::Path;

use crate::error::TailError;

/// Upper bound on bytes read in one cycle.
pub const MAX_READ_BYTES: u64 = 4 * 1024 * 1024;

/// Platform file identity token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    device: u64,
    inode: u64,
}

impl FileIdentity {
    /// Identity of the file described by `metadata`.
    #[cfg(unix)]
    pub fn from_metadata(metadata: &fs::Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self {
            device: metadata.dev(),
            inode: metadata.ino(),
        }
    }

    /// Identity of the file described by `metadata`.
    ///
    /// Without inode numbers every file looks the same, so rotation is
    /// detected by size alone.
    #[cfg(not(unix))]
    pub fn from_metadata(_metadata: &fs::Metadata) -> Self {
        Self {
            device: 0,
            inode: 0,
        }
    }
}

/// What a metadata poll found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollResult {
    /// A rotation, truncation, or first sighting started a new epoch.
    pub new_epoch: bool,
    /// Bytes that may be read this cycle. Empty after a new epoch.
    pub bytes_to_read: Range<u64>,
}

/// Read position within the tailed file.
///
/// Never persisted: a restart begins at the current end of file.
#[derive(Debug, Default, Clone)]
pub struct Cursor {
    identity: Option<FileIdentity>,
    offset: u64,
    last_size: u64,
    epoch: u64,
}

impl Cursor {
    /// A cursor that has never seen the file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect `path` and decide what to read next.
    ///
    /// A changed identity or a shrunken size starts a new epoch and moves the
    /// offset to the current size; content written before the rotation is
    /// skipped.
    ///
    /// # Errors
    ///
    /// [`TailError::SourceNotFound`] when the file is missing (the caller
    /// should [`reset`](Self::reset)), [`TailError::TransientRead`] for any
    /// other metadata failure. Neither mutates the cursor.
    pub fn poll(&mut self, path: &Path) -> Result<PollResult, TailError> {
        let metadata = match fs::metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(TailError::SourceNotFound {
                    path: path.to_owned(),
                });
            }
            Err(source) => {
                return Err(TailError::TransientRead {
                    path: path.to_owned(),
                    source,
                });
            }
        };

        let identity = FileIdentity::from_metadata(&metadata);
        let size = metadata.len();

        if self.identity != Some(identity) || size < self.last_size {
            self.identity = Some(identity);
            self.offset = size;
            self.last_size = size;
            self.epoch = self.epoch.saturating_add(1);
            return Ok(PollResult {
                new_epoch: true,
                bytes_to_read: size..size,
            });
        }

        self.last_size = size;
        self.offset = self.offset.min(size);
        Ok(PollResult {
            new_epoch: false,
            bytes_to_read: self.offset..size,
        })
    }

    /// Move the offset forward past `consumed` bytes, never beyond the last known size.
    pub fn advance(&mut self, consumed: u64) {
        self.offset = self.offset.saturating_add(consumed).min(self.last_size);
    }

    /// Forget the file after it went missing. The epoch is kept so it keeps increasing.
    pub fn reset(&mut self) {
        self.identity = None;
        self.offset = 0;
        self.last_size = 0;
    }

    /// Identity of the file currently tracked.
    pub fn identity(&self) -> Option<FileIdentity> {
        self.identity
    }

    /// Next byte to read.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of epochs started so far.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// One complete line and the file offset just past its newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// Line text without the trailing `\n` / `\r\n`.
    pub text: String,
    /// Absolute offset of the byte after this line's newline.
    pub end_offset: u64,
}

/// Complete lines read from a byte range.
#[derive(Debug, Clone, Default)]
pub struct ReadBatch {
    /// Lines in file order.
    pub lines: Vec<LogLine>,
    /// Bytes consumed from the start of the range.
    pub consumed: u64,
    /// An unterminated fragment filled the whole chunk and was discarded.
    pub discarded_oversized: bool,
}

/// Read the newline-terminated lines inside `range`.
///
/// A trailing fragment with no newline is left unconsumed. The opened handle
/// must still carry `expected` identity; otherwise the file was replaced
/// after the metadata poll and nothing is consumed.
///
/// # Errors
///
/// [`TailError::SourceNotFound`] if the file vanished,
/// [`TailError::SourceRotated`] if it was replaced, or
/// [`TailError::TransientRead`] on I/O failure.
pub fn read_complete_lines(
    path: &Path,
    range: Range<u64>,
    expected: Option<FileIdentity>,
) -> Result<ReadBatch, TailError> {
    let len = range.end.saturating_sub(range.start).min(MAX_READ_BYTES);
    if len == 0 {
        return Ok(ReadBatch::default());
    }

    let transient = |source: std::io::Error| TailError::TransientRead {
        path: path.to_owned(),
        source,
    };

    let mut file = match fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(TailError::SourceNotFound {
                path: path.to_owned(),
            });
        }
        Err(e) => return Err(transient(e)),
    };

    let metadata = file.metadata().map_err(transient)?;
    if expected.is_some_and(|id| id != FileIdentity::from_metadata(&metadata))
        || metadata.len() < range.start
    {
        return Err(TailError::SourceRotated {
            path: path.to_owned(),
        });
    }

    file.seek(SeekFrom::Start(range.start)).map_err(transient)?;
    let mut buf = Vec::new();
    file.take(len).read_to_end(&mut buf).map_err(transient)?;

    Ok(split_complete_lines(&buf, range.start, len))
}

fn split_complete_lines(buf: &[u8], start: u64, requested: u64) -> ReadBatch {
    let Some(last_newline) = buf.iter().rposition(|&b| b == b'\n') else {
        let oversized = u64::try_from(buf.len()).is_ok_and(|n| n >= MAX_READ_BYTES);
        return ReadBatch {
            lines: Vec::new(),
            consumed: if oversized { requested } else { 0 },
            discarded_oversized: oversized,
        };
    };

    let complete = &buf[..=last_newline];
    let mut lines = Vec::new();
    let mut end_offset = start;

    for chunk in complete.split_inclusive(|&b| b == b'\n') {
        let chunk_len = u64::try_from(chunk.len()).unwrap_or(u64::MAX);
        end_offset = end_offset.saturating_add(chunk_len);

        let text = String::from_utf8_lossy(chunk);
        let text = text.trim_end_matches(['\n', '\r']);
        lines.push(LogLine {
            text: text.to_owned(),
            end_offset,
        });
    }

    ReadBatch {
        lines,
        consumed: end_offset.saturating_sub(start),
        discarded_oversized: false,
    }
}
