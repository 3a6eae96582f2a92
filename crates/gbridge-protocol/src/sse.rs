//! Incremental server-sent-events scanner.
//!
//! Bytes arrive in arbitrary fragments: a fragment may end in the middle of a
//! field name, a JSON value, a CRLF pair or a multi-byte UTF-8 sequence. The
//! decoder keeps whatever it cannot classify yet and yields one `data`
//! payload per blank-line-terminated event, in arrival order.

use tracing::warn;

#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Undecoded tail of a split UTF-8 sequence.
    pending_bytes: Vec<u8>,
    /// Current, not yet terminated line.
    line: String,
    /// `data:` lines of the current event, joined with `\n`.
    data: Option<String>,
    /// Raw text of the current event since the last dispatch.
    raw: String,
    /// The previous character was `\r`; a following `\n` belongs to it.
    after_cr: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one fragment and return every payload it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut out = Vec::new();
        let text = self.decode_utf8(chunk);
        self.push_str_into(&text, &mut out);
        out
    }

    /// Feed an already decoded fragment.
    pub fn push_str(&mut self, chunk: &str) -> Vec<String> {
        let mut out = Vec::new();
        self.push_str_into(chunk, &mut out);
        out
    }

    /// End of stream. Anything still buffered is a truncated event; it is
    /// logged and handed back so the caller sees the anomaly instead of
    /// losing it.
    pub fn finish(mut self) -> Vec<String> {
        if !self.pending_bytes.is_empty() {
            let tail = String::from_utf8_lossy(&self.pending_bytes).into_owned();
            self.pending_bytes.clear();
            self.raw.push_str(&tail);
            self.line.push_str(&tail);
        }
        if self.raw.trim().is_empty() {
            return Vec::new();
        }

        let residual = if let Some(value) = data_field(&self.line) {
            match self.data.take() {
                Some(mut data) => {
                    data.push('\n');
                    data.push_str(value);
                    data
                }
                None => value.to_string(),
            }
        } else if let Some(data) = self.data.take() {
            data
        } else {
            self.raw.clone()
        };
        // A bare `data` line carries nothing parseable; hand back what arrived.
        let residual = if residual.trim().is_empty() {
            self.raw.clone()
        } else {
            residual
        };
        warn!(
            event = "stream_residual",
            bytes = self.raw.len(),
            residual = %self.raw,
            "upstream stream ended inside an event"
        );
        vec![residual]
    }

    fn decode_utf8(&mut self, chunk: &[u8]) -> String {
        self.pending_bytes.extend_from_slice(chunk);
        let bytes = std::mem::take(&mut self.pending_bytes);
        let mut decoded = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    decoded.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    decoded.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(len) => {
                            decoded.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            self.pending_bytes = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        decoded
    }

    fn push_str_into(&mut self, chunk: &str, out: &mut Vec<String>) {
        for ch in chunk.chars() {
            if self.after_cr {
                self.after_cr = false;
                if ch == '\n' {
                    self.raw.push(ch);
                    continue;
                }
            }
            match ch {
                '\r' => {
                    self.raw.push(ch);
                    self.after_cr = true;
                    self.end_line(out);
                }
                '\n' => {
                    self.raw.push(ch);
                    self.end_line(out);
                }
                _ => {
                    self.raw.push(ch);
                    self.line.push(ch);
                }
            }
        }
    }

    fn end_line(&mut self, out: &mut Vec<String>) {
        let line = std::mem::take(&mut self.line);
        if line.is_empty() {
            if let Some(data) = self.data.take() {
                out.push(data);
            }
            self.raw.clear();
            return;
        }
        if let Some(value) = data_field(&line) {
            match self.data.as_mut() {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.data = Some(value.to_string()),
            }
        }
        // Comments (`:`) and other fields (`event`, `id`, `retry`) carry nothing we forward.
    }
}

fn data_field(line: &str) -> Option<&str> {
    let value = line.strip_prefix("data")?;
    if value.is_empty() {
        return Some(value);
    }
    let value = value.strip_prefix(':')?;
    Some(value.strip_prefix(' ').unwrap_or(value))
}
