use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("Ошибка конфигурации: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ошибка uinput: {0}")]
    Uinput(#[from] uinput::Error),

    #[error("Ошибка D-Bus: {0}")]
    DBus(#[from] zbus::Error),

    #[error("Ошибка JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Ошибка буфера обмена: {0}")]
    Clipboard(String),

    #[error("Устройство не найдено: {0}")]
    DeviceNotFound(String),

    #[error("Недостаточно прав доступа: {0}")]
    Permission(String),

    #[error("Сервис недоступен: {0}")]
    ServiceUnavailable(String),

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl WatcherError {
    pub fn device_not_found<T>(msg: impl Into<String>) -> Result<T> {
        Err(WatcherError::DeviceNotFound(msg.into()))
    }
}

impl From<arboard::Error> for WatcherError {
    fn from(e: arboard::Error) -> Self {
        WatcherError::Clipboard(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WatcherError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! watcher_error {
    (clipboard, $($arg:tt)*) => {
        $crate::error::WatcherError::Clipboard(format!($($arg)*))
    };
    (device_not_found, $($arg:tt)*) => {
        $crate::error::WatcherError::DeviceNotFound(format!($($arg)*))
    };
    (permission, $($arg:tt)*) => {
        $crate::error::WatcherError::Permission(format!($($arg)*))
    };
    (service_unavailable, $($arg:tt)*) => {
        $crate::error::WatcherError::ServiceUnavailable(format!($($arg)*))
    };
    (internal, $($arg:tt)*) => {
        $crate::error::WatcherError::Internal(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_macro_formats_message() {
        let err = watcher_error!(service_unavailable, "шина {} недоступна", "a11y");
        assert!(matches!(err, WatcherError::ServiceUnavailable(ref m) if m == "шина a11y недоступна"));
    }

    #[test]
    fn test_device_not_found_helper() {
        let result: Result<()> = WatcherError::device_not_found("нет мыши");
        assert!(matches!(result, Err(WatcherError::DeviceNotFound(_))));
    }
}
