use evdev::KeyCode;
use std::fmt;

/// Кнопка указателя
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Left,
    Right,
    Middle,
}

impl PointerButton {
    /// Кнопка по коду evdev
    pub fn from_code(code: u16) -> Option<Self> {
        match KeyCode::new(code) {
            KeyCode::BTN_LEFT => Some(PointerButton::Left),
            KeyCode::BTN_RIGHT => Some(PointerButton::Right),
            KeyCode::BTN_MIDDLE => Some(PointerButton::Middle),
            _ => None,
        }
    }
}

/// Отпускание кнопки указателя
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerEvent {
    pub button: PointerButton,
    pub timestamp: std::time::Instant,
    pub device_name: String,
}

impl PointerEvent {
    pub fn released(button: PointerButton, device_name: impl Into<String>) -> Self {
        Self {
            button,
            timestamp: std::time::Instant::now(),
            device_name: device_name.into(),
        }
    }

    /// Выделение завершается отпусканием левой кнопки
    pub fn ends_selection(&self) -> bool {
        self.button == PointerButton::Left
    }
}

impl fmt::Display for PointerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}[{}] released ({}ms)",
            self.button,
            self.device_name,
            self.timestamp.elapsed().as_millis()
        )
    }
}
