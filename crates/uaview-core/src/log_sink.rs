// ── Log sink ──
//
// The user-visible info pane: free-form lines, oldest first, unbounded.
// Replaces writing to stdout, which would corrupt the terminal. Every
// line is mirrored to `tracing` so it also lands in the log file.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::info;

/// Cloneable handle to a shared, append-only line buffer.
#[derive(Clone)]
pub struct LogSink {
    inner: Arc<LogInner>,
}

struct LogInner {
    buffer: Mutex<Buffer>,
    open: AtomicBool,
    revision: watch::Sender<u64>,
}

#[derive(Default)]
struct Buffer {
    lines: Vec<String>,
    /// Bumped by `clear`; readers holding an older cursor start over.
    generation: u64,
}

/// Reader position in the sink, advanced by [`LogSink::read_since`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogCursor {
    generation: u64,
    offset: usize,
}

/// Lines a reader has not seen yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogUpdate {
    /// New lines after the ones already read.
    Appended(Vec<String>),
    /// The sink was cleared since the last read; these are all its lines.
    Reset(Vec<String>),
}

impl LogSink {
    /// Create an open sink.
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0u64);
        Self {
            inner: Arc::new(LogInner {
                buffer: Mutex::new(Buffer::default()),
                open: AtomicBool::new(true),
                revision,
            }),
        }
    }

    /// Append `text`, one entry per line.
    pub fn append(&self, text: impl AsRef<str>) {
        let text = text.as_ref();
        for line in text.split('\n') {
            info!(target: "uaview::log", "{line}");
        }
        if !self.is_open() {
            return;
        }
        self.buffer().lines.extend(text.split('\n').map(str::to_owned));
        self.bump();
    }

    /// Drop every line.
    pub fn clear(&self) {
        {
            let mut buffer = self.buffer();
            buffer.lines.clear();
            buffer.generation += 1;
        }
        self.bump();
    }

    /// Copy of the current lines, oldest first.
    pub fn snapshot(&self) -> Vec<String> {
        self.buffer().lines.clone()
    }

    /// Lines added since `cursor`, which is moved to the end.
    pub fn read_since(&self, cursor: &mut LogCursor) -> LogUpdate {
        let buffer = self.buffer();
        let update = if cursor.generation == buffer.generation {
            let from = cursor.offset.min(buffer.lines.len());
            LogUpdate::Appended(buffer.lines[from..].to_vec())
        } else {
            LogUpdate::Reset(buffer.lines.clone())
        };
        *cursor = LogCursor {
            generation: buffer.generation,
            offset: buffer.lines.len(),
        };
        update
    }

    pub fn len(&self) -> usize {
        self.buffer().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer().lines.is_empty()
    }

    /// End the sink's lifecycle. Later lines only reach `tracing`.
    pub fn close(&self) {
        self.inner.open.store(false, Ordering::Release);
    }

    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::Acquire)
    }

    /// Change notification; the value is a revision counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    fn buffer(&self) -> MutexGuard<'_, Buffer> {
        self.inner
            .buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.inner.revision.send_modify(|r| *r += 1);
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_line_entries_are_split_in_order() {
        let sink = LogSink::new();
        sink.append("first");
        sink.append("second\nthird");
        assert_eq!(sink.snapshot(), ["first", "second", "third"]);
    }

    #[test]
    fn clear_empties_and_notifies() {
        let sink = LogSink::new();
        let rx = sink.subscribe();
        sink.append("line");
        sink.clear();
        assert!(sink.is_empty());
        assert_eq!(*rx.borrow(), 2);
    }

    #[test]
    fn closed_sink_drops_new_lines() {
        let sink = LogSink::new();
        sink.append("kept");
        sink.close();
        sink.append("dropped");
        assert_eq!(sink.snapshot(), ["kept"]);
        assert!(!sink.is_open());
    }

    #[test]
    fn clones_share_one_buffer() {
        let sink = LogSink::new();
        let other = sink.clone();
        other.append("from clone");
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn readers_get_only_new_lines() {
        let sink = LogSink::new();
        let mut cursor = LogCursor::default();
        sink.append("one\ntwo");
        assert_eq!(
            sink.read_since(&mut cursor),
            LogUpdate::Appended(vec!["one".into(), "two".into()])
        );

        sink.append("three");
        assert_eq!(
            sink.read_since(&mut cursor),
            LogUpdate::Appended(vec!["three".into()])
        );
        assert_eq!(sink.read_since(&mut cursor), LogUpdate::Appended(Vec::new()));
    }

    #[test]
    fn clear_resets_readers() {
        let sink = LogSink::new();
        let mut cursor = LogCursor::default();
        sink.append("old");
        sink.read_since(&mut cursor);

        sink.clear();
        sink.append("new");
        assert_eq!(
            sink.read_since(&mut cursor),
            LogUpdate::Reset(vec!["new".into()])
        );
    }
}
