use serde::Deserialize;
use tracing::warn;

use crate::constants::{MAX_LINE_BYTES, SELECTION_MESSAGE_TYPE};
use crate::error::Result;
use crate::events::Rect;

/// Приёмный буфер, собирающий строки из кусков потока.
///
/// Работает с байтами, поэтому разрезанный между кусками UTF-8 символ или
/// пара `\r\n` собираются корректно. Хвост без перевода строки остаётся
/// в буфере до следующего куска.
#[derive(Debug)]
pub struct LineBuffer {
    pending: Vec<u8>,
    max_line_bytes: usize,
    discarding: bool,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::with_limit(MAX_LINE_BYTES)
    }

    pub fn with_limit(max_line_bytes: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_line_bytes,
            discarding: false,
        }
    }

    /// Добавить кусок и вернуть все завершённые непустые строки
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        // Остаток слишком длинной строки выбрасываем до ближайшего перевода строки
        if self.discarding {
            match self.pending.iter().position(|b| *b == b'\n') {
                Some(pos) => {
                    self.pending.drain(..=pos);
                    self.discarding = false;
                }
                None => {
                    self.pending.clear();
                    return Vec::new();
                }
            }
        }

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(pos) = self.pending[start..].iter().position(|b| *b == b'\n') {
            let end = start + pos;
            let mut line = &self.pending[start..end];
            if line.last() == Some(&b'\r') {
                line = &line[..line.len() - 1];
            }

            let text = String::from_utf8_lossy(line);
            if !text.trim().is_empty() {
                lines.push(text.into_owned());
            }
            start = end + 1;
        }
        self.pending.drain(..start);

        if self.pending.len() > self.max_line_bytes {
            warn!(
                "Незавершённая строка превысила {} байт, отбрасываем",
                self.max_line_bytes
            );
            self.pending.clear();
            self.discarding = true;
        }

        lines
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Выделение, полученное из канала
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingSelection {
    pub text: String,
    pub rect: Rect,
    pub process: String,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    rect: Option<Rect>,
    #[serde(default)]
    process: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

/// Разобрать одну строку канала.
///
/// Некорректный JSON возвращается ошибкой. Объекты другого вида (не
/// `selection`, без текста, с полями неожиданного типа) дают `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<IncomingSelection>> {
    let value: serde_json::Value = serde_json::from_str(line)?;
    if !value.is_object() {
        return Ok(None);
    }

    let Ok(message) = serde_json::from_value::<IncomingMessage>(value) else {
        return Ok(None);
    };

    if message.kind.as_deref() != Some(SELECTION_MESSAGE_TYPE) {
        return Ok(None);
    }

    match message.text {
        Some(text) if !text.is_empty() => Ok(Some(IncomingSelection {
            text,
            rect: message.rect.unwrap_or_default(),
            process: message.process.unwrap_or_default(),
            timestamp: message.timestamp.unwrap_or_default(),
        })),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::SelectionEvent;

    #[test]
    fn test_line_split_across_chunks() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(br#"{"type":"selection","tex"#).is_empty());

        let lines = buffer
            .push(b"t\":\"hi\",\"rect\":{},\"process\":\"p\",\"timestamp\":\"t\"}\n");
        assert_eq!(lines.len(), 1);
        assert_eq!(buffer.pending_len(), 0);

        let selection = parse_line(&lines[0]).unwrap().unwrap();
        assert_eq!(selection.text, "hi");
        assert_eq!(selection.rect, Rect::default());
        assert_eq!(selection.process, "p");
    }

    #[test]
    fn test_crlf_split_between_chunks() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(b"first\r").is_empty());
        assert_eq!(buffer.push(b"\nsecond\r\nthi"), vec!["first", "second"]);
        assert_eq!(buffer.pending_len(), 3);
    }

    #[test]
    fn test_utf8_split_between_chunks() {
        let bytes = "привет\n".as_bytes();
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(&bytes[..3]).is_empty());
        assert_eq!(buffer.push(&bytes[3..]), vec!["привет"]);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let mut buffer = LineBuffer::new();
        assert_eq!(buffer.push(b"\n\r\n  \na\n"), vec!["a"]);
    }

    #[test]
    fn test_oversized_line_discarded_until_newline() {
        let mut buffer = LineBuffer::with_limit(8);
        assert!(buffer.push(b"0123456789").is_empty());
        assert_eq!(buffer.pending_len(), 0);
        assert!(buffer.push(b"still-the-same-line").is_empty());
        assert_eq!(buffer.push(b"tail\nok\n"), vec!["ok"]);
    }

    #[test]
    fn test_malformed_line_does_not_stop_following_lines() {
        let mut buffer = LineBuffer::new();
        let chunk = b"{not json\n{\"type\":\"selection\",\"text\":\"good\"}\n";
        let parsed: Vec<_> = buffer
            .push(chunk)
            .iter()
            .filter_map(|line| parse_line(line).ok().flatten())
            .collect();

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].text, "good");
        assert!(parse_line("{not json").is_err());
    }

    #[test]
    fn test_other_shapes_ignored() {
        assert_eq!(parse_line(r#"{"type":"ping"}"#).unwrap(), None);
        assert_eq!(parse_line(r#"{"type":"selection","text":""}"#).unwrap(), None);
        assert_eq!(parse_line(r#"{"type":"selection"}"#).unwrap(), None);
        assert_eq!(parse_line(r#"{"type":"selection","text":42}"#).unwrap(), None);
        assert_eq!(parse_line("[1,2,3]").unwrap(), None);
        assert_eq!(parse_line("42").unwrap(), None);
    }

    #[test]
    fn test_serialized_event_round_trips() {
        for text in ["ok", "some selected text", "многострочный\nтекст\tс табами"] {
            let event = SelectionEvent::new(text, Rect::new(10.5, 20.0, 40.0, 50.0), "kate")
                .unwrap();
            let line = event.to_line().unwrap();

            let mut buffer = LineBuffer::new();
            let lines = buffer.push(line.as_bytes());
            assert_eq!(lines.len(), 1);

            let parsed = parse_line(&lines[0]).unwrap().unwrap();
            assert_eq!(
                (parsed.text.as_str(), parsed.rect, parsed.process.as_str()),
                (event.text(), event.rect(), event.process())
            );
        }
    }
}
