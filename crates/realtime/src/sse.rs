//! Server-sent event decoding and the local mirror that turns `put`/`patch`
//! frames into child events.

use crate::error::Result;
use crate::event::{diff_children, ChildEvent, StreamMessage};
use crate::path::DbPath;
use crate::tree;
use serde_json::Value;

/// One complete `event:`/`data:` frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SseFrame {
    pub event: String,
    pub data: String,
}

/// Incremental decoder; chunks may split lines and UTF-8 sequences anywhere.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub(crate) fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(frame) = self.dispatch() {
                    frames.push(frame);
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => self.event = Some(value.to_string()),
                "data" => self.data.push(value.to_string()),
                _ => {}
            }
        }
        frames
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        let data = std::mem::take(&mut self.data);
        if event.is_none() && data.is_empty() {
            return None;
        }
        Some(SseFrame {
            event: event.unwrap_or_else(|| "message".to_string()),
            data: data.join("\n"),
        })
    }
}

/// Local copy of the listened location, used to derive child events from
/// the stream's absolute writes.
#[derive(Debug, Default)]
pub(crate) struct ChildMirror {
    root: Value,
}

impl ChildMirror {
    /// `put`: replace the data at the message path.
    pub(crate) fn apply_put(&mut self, message: StreamMessage) -> Result<Vec<ChildEvent>> {
        let path = DbPath::parse(&message.path)?;
        Ok(self.write(vec![(path, message.data)]))
    }

    /// `patch`: replace each listed child of the message path.
    pub(crate) fn apply_patch(&mut self, message: StreamMessage) -> Result<Vec<ChildEvent>> {
        let base = DbPath::parse(&message.path)?;
        let mut writes = Vec::new();
        if let Value::Object(fields) = message.data {
            for (key, value) in fields {
                writes.push((base.join(&DbPath::parse(&key)?), value));
            }
        }
        Ok(self.write(writes))
    }

    fn write(&mut self, writes: Vec<(DbPath, Value)>) -> Vec<ChildEvent> {
        let before = tree::children_at(&self.root, &[]);
        for (path, value) in writes {
            tree::write_at(&mut self.root, path.segments(), value);
        }
        let after = tree::children_at(&self.root, &[]);
        diff_children(&before, &after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ChildEventKind;
    use serde_json::json;

    fn message(path: &str, data: Value) -> StreamMessage {
        StreamMessage {
            path: path.to_string(),
            data,
        }
    }

    #[test]
    fn decoder_handles_split_chunks() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.feed(b"event: put\nda").is_empty());
        let frames = decoder.feed(b"ta: {\"path\":\"/\",\"data\":null}\n\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: "put".to_string(),
                data: "{\"path\":\"/\",\"data\":null}".to_string(),
            }]
        );
    }

    #[test]
    fn decoder_accepts_crlf_and_comments() {
        let mut decoder = SseDecoder::default();
        let frames = decoder.feed(b": hello\r\nevent: keep-alive\r\ndata: null\r\n\r\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "keep-alive");
        assert_eq!(frames[0].data, "null");
    }

    #[test]
    fn initial_put_reports_every_child_as_added() {
        let mut mirror = ChildMirror::default();
        let events = mirror
            .apply_put(message("/", json!({"A": {"n": 1}, "B": {"n": 2}})))
            .unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.kind == ChildEventKind::Added));
    }

    #[test]
    fn replayed_snapshot_produces_only_real_changes() {
        let mut mirror = ChildMirror::default();
        mirror
            .apply_put(message("/", json!({"A": {"n": 1}, "B": {"n": 2}})))
            .unwrap();
        let events = mirror
            .apply_put(message("/", json!({"A": {"n": 1}, "B": {"n": 3}})))
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ChildEventKind::Changed);
        assert_eq!(events[0].key, "B");
    }

    #[test]
    fn nested_put_and_patch_change_one_child() {
        let mut mirror = ChildMirror::default();
        mirror
            .apply_put(message("/", json!({"A": {"status": "Aberta", "n": 1}})))
            .unwrap();

        let events = mirror
            .apply_put(message("/A/status", json!("Finalizada")))
            .unwrap();
        assert_eq!(events[0].value, json!({"status": "Finalizada", "n": 1}));

        let events = mirror
            .apply_patch(message("/A", json!({"status": "Cancelada"})))
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].value["status"], json!("Cancelada"));
    }

    #[test]
    fn put_null_removes_child() {
        let mut mirror = ChildMirror::default();
        mirror.apply_put(message("/", json!({"A": 1}))).unwrap();
        let events = mirror.apply_put(message("/A", Value::Null)).unwrap();
        assert_eq!(events[0].kind, ChildEventKind::Removed);
    }
}
