//! Line splitting shared by the incremental and whole-buffer JSONL readers.
//!
//! Lines end at `\r\n`, `\n` or `\r`.

/// Split a complete buffer into lines.
pub fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n')
        .flat_map(|line| line.split('\r'))
        .filter(|line| !line.is_empty())
}

/// Carry-over buffer for lines split across stream chunks.
///
/// Works on bytes, so a multi-byte character cut by a chunk boundary is kept
/// intact until the rest of it arrives.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return every line it completed. The trailing
    /// fragment stays buffered for the next call.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        for (i, byte) in self.pending.iter().enumerate() {
            if *byte == b'\n' || *byte == b'\r' {
                if i > start {
                    lines.push(String::from_utf8_lossy(&self.pending[start..i]).into_owned());
                }
                start = i + 1;
            }
        }
        self.pending.drain(..start);
        lines
    }

    /// Take whatever incomplete fragment is left.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(rest)
    }
}
