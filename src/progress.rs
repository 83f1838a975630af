//! Incremental progress labels from a streaming Codex run.
//!
//! The relay consumes the same stdout chunks the process runner buffers, but
//! decodes them as they arrive instead of waiting for exit. Its labels are a
//! side channel only; the final result is parsed separately from the full
//! buffer.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::exec::ChunkCallback;
use crate::output::codex::{CodexEvent, ItemKind};
use crate::output::lines::LineBuffer;

/// Maximum characters of agent message text shown in a label.
pub const MAX_DETAIL_CHARS: usize = 80;

/// Receiver of progress labels. Must not block.
pub trait ProgressSink: Send + Sync {
    fn report(&self, message: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn report(&self, message: &str) {
        self(message)
    }
}

/// One numbered progress notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
    pub step: u32,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Sink that numbers labels and forwards them over an unbounded channel.
#[derive(Debug)]
pub struct ChannelProgress {
    tx: mpsc::UnboundedSender<ProgressUpdate>,
    step: AtomicU32,
}

impl ChannelProgress {
    pub fn new(tx: mpsc::UnboundedSender<ProgressUpdate>) -> Self {
        Self {
            tx,
            step: AtomicU32::new(0),
        }
    }

    /// Create a sink together with the receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl ProgressSink for ChannelProgress {
    fn report(&self, message: &str) {
        let step = self.step.fetch_add(1, Ordering::SeqCst) + 1;
        // A closed receiver just means nobody is listening anymore.
        let _ = self.tx.send(ProgressUpdate {
            step,
            message: message.to_string(),
            timestamp: Utc::now(),
        });
    }
}

/// Turns raw stdout chunks into progress labels.
pub struct ProgressRelay {
    lines: Mutex<LineBuffer>,
    sink: Arc<dyn ProgressSink>,
}

impl ProgressRelay {
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            lines: Mutex::new(LineBuffer::new()),
            sink,
        }
    }

    /// Report a free-form label.
    pub fn report(&self, message: &str) {
        self.sink.report(message);
    }

    /// Consume one stdout chunk, reporting a label for each completed line.
    pub fn feed(&self, chunk: &[u8]) {
        let lines = self
            .lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(chunk);
        for line in lines {
            self.report_line(&line);
        }
    }

    /// Report the trailing fragment left once the stream has ended.
    pub fn flush(&self) {
        let rest = self.lines.lock().unwrap_or_else(|e| e.into_inner()).finish();
        if let Some(rest) = rest {
            self.report_line(&rest);
        }
    }

    /// Stdout callback feeding this relay.
    pub fn chunk_callback(self: &Arc<Self>) -> ChunkCallback {
        let relay = Arc::clone(self);
        Arc::new(move |chunk: &[u8]| relay.feed(chunk))
    }

    fn report_line(&self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        if let Some(event) = CodexEvent::parse_line(line) {
            self.sink.report(&progress_label(&event));
        }
    }
}

/// Short human-readable label for an event.
pub fn progress_label(event: &CodexEvent) -> String {
    let Some(item) = event.item() else {
        return event.event_type().to_string();
    };
    let Some(item_type) = item.item_type.as_deref().filter(|t| !t.is_empty()) else {
        return event.event_type().to_string();
    };

    let detail = match item.kind() {
        Some(ItemKind::CommandExecution) => item.command.clone().unwrap_or_default(),
        Some(ItemKind::FileChange) => {
            let kind = item.change_kind.as_deref().unwrap_or("");
            let path = item.path.as_deref().unwrap_or("");
            if !kind.is_empty() && !path.is_empty() {
                format!("{} {}", kind, path)
            } else if !path.is_empty() {
                path.to_string()
            } else {
                kind.to_string()
            }
        }
        Some(ItemKind::AgentMessage) => truncate_detail(item.text.as_deref().unwrap_or("")),
        Some(ItemKind::Other(_)) | None => String::new(),
    };

    if detail.is_empty() {
        item_type.to_string()
    } else {
        format!("{}: {}", item_type, detail)
    }
}

fn truncate_detail(text: &str) -> String {
    match text.char_indices().nth(MAX_DETAIL_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
