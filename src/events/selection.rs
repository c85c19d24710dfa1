use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::constants::{
    MAX_TEXT_CHARS, MIN_TEXT_CHARS, PROBE_DEBOUNCE, SELECTION_MESSAGE_TYPE, UNKNOWN_PROCESS,
};
use crate::error::Result;

/// Прямоугольник выделения в экранных координатах
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Точка без размеров (позиция указателя)
    pub fn at_point(x: f64, y: f64) -> Self {
        Self::new(x, y, 0.0, 0.0)
    }

    /// Нет геометрии: потребитель использует позицию указателя
    pub fn is_degenerate(&self) -> bool {
        self.width == 0.0 && self.height == 0.0
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Преобразовать сырые границы диапазона текста в прямоугольник.
///
/// Платформа отдаёт массив длиной 0 или кратной 4. Первые два числа всегда
/// левый верхний угол. Следующие два считаются правым нижним углом, если оба
/// не меньше левого верхнего (тогда ширина и высота не меньше 1.0), иначе
/// они берутся как ширина и высота без изменений. Потребители уже учитывают
/// эту неоднозначность, поэтому правило сохраняется как есть.
pub fn rect_from_bounds(bounds: &[f64]) -> Rect {
    if bounds.len() < 4 {
        return Rect::default();
    }

    let (x, y) = (bounds[0], bounds[1]);
    let (third, fourth) = (bounds[2], bounds[3]);

    if third >= x && fourth >= y {
        Rect::new(x, y, (third - x).max(1.0), (fourth - y).max(1.0))
    } else {
        Rect::new(x, y, third, fourth)
    }
}

/// Стратегия, которая обнаружила выделение
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Accessibility,
    ClipboardProbe,
}

impl StrategyKind {
    /// Минимальный интервал между проверками для стратегии
    pub fn min_check_interval(&self) -> Duration {
        match self {
            StrategyKind::Accessibility => Duration::ZERO,
            StrategyKind::ClipboardProbe => PROBE_DEBOUNCE,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Accessibility => write!(f, "accessibility"),
            StrategyKind::ClipboardProbe => write!(f, "clipboard-probe"),
        }
    }
}

/// Событие выделения текста. Неизменяемо после создания.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionEvent {
    text: String,
    rect: Rect,
    process: String,
    timestamp: DateTime<Utc>,
}

impl SelectionEvent {
    /// Создать событие, если текст после обрезки пробелов укладывается в допустимую длину
    pub fn new(text: &str, rect: Rect, process: impl Into<String>) -> Option<Self> {
        let text = text.trim();
        let len = text.chars().count();
        if !(MIN_TEXT_CHARS..=MAX_TEXT_CHARS).contains(&len) {
            return None;
        }

        let mut process = process.into();
        if process.trim().is_empty() {
            process = UNKNOWN_PROCESS.to_string();
        }

        Some(Self {
            text: text.to_string(),
            rect: Rect {
                width: rect.width.max(0.0),
                height: rect.height.max(0.0),
                ..rect
            },
            process,
            timestamp: Utc::now(),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn process(&self) -> &str {
        &self.process
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn to_wire(&self) -> WireMessage {
        WireMessage {
            kind: SELECTION_MESSAGE_TYPE.to_string(),
            text: self.text.clone(),
            rect: self.rect,
            process: self.process.clone(),
            timestamp: self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Одна строка протокола вместе с завершающим переводом строки
    pub fn to_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(&self.to_wire())?;
        line.push('\n');
        Ok(line)
    }
}

impl fmt::Display for SelectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let preview: String = self.text.chars().take(50).collect();
        write!(
            f,
            "'{}' ({} симв.) из {} @ {}",
            preview,
            self.text.chars().count(),
            self.process,
            self.rect
        )
    }
}

/// Сообщение о выделении в том виде, в каком оно идёт по каналу
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub rect: Rect,
    pub process: String,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_right_bottom_form() {
        let rect = rect_from_bounds(&[10.0, 20.0, 50.0, 70.0]);
        assert_eq!(rect, Rect::new(10.0, 20.0, 40.0, 50.0));
    }

    #[test]
    fn test_rect_width_height_fallback() {
        let rect = rect_from_bounds(&[10.0, 20.0, 5.0, 5.0]);
        assert_eq!(rect, Rect::new(10.0, 20.0, 5.0, 5.0));
    }

    #[test]
    fn test_rect_floors_size_at_one() {
        let rect = rect_from_bounds(&[10.0, 20.0, 10.0, 20.0]);
        assert_eq!(rect, Rect::new(10.0, 20.0, 1.0, 1.0));
    }

    #[test]
    fn test_rect_short_payload_is_empty() {
        assert_eq!(rect_from_bounds(&[]), Rect::default());
        assert_eq!(rect_from_bounds(&[1.0, 2.0, 3.0]), Rect::default());
        // Берётся только первый прямоугольник
        let rect = rect_from_bounds(&[0.0, 0.0, 4.0, 4.0, 100.0, 100.0, 200.0, 200.0]);
        assert_eq!(rect, Rect::new(0.0, 0.0, 4.0, 4.0));
    }

    #[test]
    fn test_event_trims_and_bounds_text() {
        let event = SelectionEvent::new("  hello \n", Rect::default(), "firefox").unwrap();
        assert_eq!(event.text(), "hello");

        assert!(SelectionEvent::new("   ", Rect::default(), "p").is_none());
        assert!(SelectionEvent::new(" a ", Rect::default(), "p").is_none());
        assert!(SelectionEvent::new("ab", Rect::default(), "p").is_some());

        let max = "я".repeat(MAX_TEXT_CHARS);
        assert!(SelectionEvent::new(&max, Rect::default(), "p").is_some());
        let too_long = "я".repeat(MAX_TEXT_CHARS + 1);
        assert!(SelectionEvent::new(&too_long, Rect::default(), "p").is_none());
    }

    #[test]
    fn test_event_empty_process_becomes_unknown() {
        let event = SelectionEvent::new("text", Rect::default(), "").unwrap();
        assert_eq!(event.process(), UNKNOWN_PROCESS);
    }

    #[test]
    fn test_wire_line_shape() {
        let event =
            SelectionEvent::new("hi there", Rect::new(1.0, 2.0, 3.0, 4.0), "gedit").unwrap();
        let line = event.to_line().unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);

        let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(value["type"], "selection");
        assert_eq!(value["text"], "hi there");
        assert_eq!(value["rect"]["width"], 3.0);
        assert_eq!(value["process"], "gedit");
        let ts = value["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(ts).is_ok());
        assert!(ts.ends_with('Z'));
    }

    #[test]
    fn test_multiline_text_stays_on_one_line() {
        let event = SelectionEvent::new("first\nsecond", Rect::default(), "p").unwrap();
        let line = event.to_line().unwrap();
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn test_clipboard_strategy_has_debounce() {
        assert_eq!(StrategyKind::ClipboardProbe.min_check_interval(), PROBE_DEBOUNCE);
        assert_eq!(StrategyKind::Accessibility.min_check_interval(), Duration::ZERO);
    }
}
