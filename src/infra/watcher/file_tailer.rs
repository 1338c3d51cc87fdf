// Polling log tailer.
//
// Opens the game-server log, seeks to the end (only new lines matter), and
// polls for appended lines on a short interval - a fallback-polling design
// rather than OS-level file notification, chosen for portability. A missing
// file or a read error drops the tailer into a fixed backoff and a reopen,
// indefinitely; a reopen resumes after the last fully consumed line instead
// of the new end of file. The cancellation token is checked at every
// suspension point so the process can stop the watcher cleanly.

use crate::core::watcher::{EventSink, LogScanner};
use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const REOPEN_BACKOFF: Duration = Duration::from_secs(2);

pub struct LogTailer {
    path: PathBuf,
    poll_interval: Duration,
    reopen_backoff: Duration,
}

impl LogTailer {
    pub fn new(path: PathBuf) -> Self {
        Self::with_intervals(path, POLL_INTERVAL, REOPEN_BACKOFF)
    }

    /// Intervals are injectable so tests don't sleep for real half-seconds.
    pub fn with_intervals(path: PathBuf, poll_interval: Duration, reopen_backoff: Duration) -> Self {
        Self {
            path,
            poll_interval,
            reopen_backoff,
        }
    }

    /// Tail the file until cancelled. Scanner state survives reopens, so a
    /// session code seen before a read error is still de-duplicated after.
    pub async fn run(self, sink: Arc<dyn EventSink>, cancel: CancellationToken) {
        let mut scanner = LogScanner::new();
        // Byte offset of the last fully consumed line. None until the first
        // successful open, which skips whatever the file already holds.
        let mut resume_offset: Option<u64> = None;

        loop {
            if cancel.is_cancelled() {
                return;
            }

            let file = match File::open(&self.path).await {
                Ok(file) => file,
                Err(err) => {
                    tracing::warn!(path = %self.path.display(), %err, "log file not readable, retrying");
                    if wait_or_cancel(self.reopen_backoff, &cancel).await {
                        return;
                    }
                    continue;
                }
            };

            let len = match file.metadata().await {
                Ok(meta) => meta.len(),
                Err(err) => {
                    tracing::warn!(path = %self.path.display(), %err, "failed to stat log file");
                    if wait_or_cancel(self.reopen_backoff, &cancel).await {
                        return;
                    }
                    continue;
                }
            };

            let mut reader = BufReader::new(file);
            let mut committed = match reader.seek(resume_position(resume_offset, len)).await {
                Ok(pos) => pos,
                Err(err) => {
                    tracing::warn!(path = %self.path.display(), %err, "failed to seek log file");
                    if wait_or_cancel(self.reopen_backoff, &cancel).await {
                        return;
                    }
                    continue;
                }
            };

            if self
                .scan_appended(&mut reader, &mut scanner, &sink, &cancel, &mut committed)
                .await
            {
                return;
            }

            // Read error - back off and reopen where consumption stopped, so
            // lines appended during the backoff are not skipped.
            resume_offset = Some(committed);
            if wait_or_cancel(self.reopen_backoff, &cancel).await {
                return;
            }
        }
    }

    /// Inner read loop. Returns true when cancelled, false on a read error
    /// (the caller reopens). `committed` tracks the offset just past the
    /// last complete line handed to the scanner.
    async fn scan_appended(
        &self,
        reader: &mut BufReader<File>,
        scanner: &mut LogScanner,
        sink: &Arc<dyn EventSink>,
        cancel: &CancellationToken,
        committed: &mut u64,
    ) -> bool {
        // Persistent buffer: read_line appends, so a partially written line
        // accumulates across polls until its newline arrives.
        let mut line = String::new();
        let mut pending = *committed;

        loop {
            match reader.read_line(&mut line).await {
                Ok(0) => {
                    if wait_or_cancel(self.poll_interval, cancel).await {
                        return true;
                    }
                }
                Ok(n) if !line.ends_with('\n') => {
                    // Mid-write; wait for the rest of the line.
                    pending += n as u64;
                    if wait_or_cancel(self.poll_interval, cancel).await {
                        return true;
                    }
                }
                Ok(n) => {
                    pending += n as u64;
                    if let Some(event) = scanner.scan_line(line.trim_end()) {
                        tracing::info!(?event, "game server event");
                        // Fire-and-forget relative to the scanning loop.
                        let sink = Arc::clone(sink);
                        tokio::spawn(async move {
                            if let Err(err) = sink.deliver(&event).await {
                                tracing::warn!(%err, "failed to deliver game event");
                            }
                        });
                    }
                    line.clear();
                    *committed = pending;
                }
                Err(err) => {
                    tracing::warn!(path = %self.path.display(), %err, "error reading log file");
                    return false;
                }
            }
        }
    }
}

/// Where an open should start reading. The first open skips history; a
/// reopen resumes after the last consumed line. A file shorter than the
/// saved offset means rotation, so replay from the top and let the
/// scanner's de-dup absorb repeats.
fn resume_position(resume_offset: Option<u64>, len: u64) -> SeekFrom {
    match resume_offset {
        None => SeekFrom::End(0),
        Some(offset) if offset <= len => SeekFrom::Start(offset),
        Some(_) => SeekFrom::Start(0),
    }
}

/// Sleep, unless cancellation arrives first. Returns true when cancelled.
async fn wait_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => true,
        _ = sleep(duration) => false,
    }
}
