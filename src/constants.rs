//! Фиксированные параметры, общие для процесса-наблюдателя и процесса-презентера.
//!
//! Эти значения задаются при сборке и не читаются из конфигурации.

use std::time::Duration;

/// Имя конечной точки канала, известное обоим процессам.
pub const ENDPOINT_NAME: &str = "ai_selection_pipe";

/// Тип сообщения о выделении в протоколе канала.
pub const SELECTION_MESSAGE_TYPE: &str = "selection";

/// Имя процесса, когда его не удалось определить.
pub const UNKNOWN_PROCESS: &str = "unknown";

/// Имя процесса для событий из пробы буфера обмена.
pub const PROBE_PROCESS_PLACEHOLDER: &str = "detected";

/// Допустимая длина текста выделения (в символах, после обрезки пробелов).
pub const MIN_TEXT_CHARS: usize = 2;
pub const MAX_TEXT_CHARS: usize = 5000;

/// Допустимая длина текста, полученного пробой буфера обмена (включительно).
pub const PROBE_MIN_CHARS: usize = 3;
pub const PROBE_MAX_CHARS: usize = 4999;

/// Минимальный интервал между проверками пробы буфера обмена.
pub const PROBE_DEBOUNCE: Duration = Duration::from_millis(300);

/// Пауза после отпускания кнопки, чтобы выделение успело завершиться.
pub const RELEASE_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Ожидание обновления буфера обмена после синтезированного Ctrl+C.
pub const CLIPBOARD_UPDATE_WAIT: Duration = Duration::from_millis(50);

/// Задержка перед восстановлением исходного содержимого буфера обмена.
pub const CLIPBOARD_RESTORE_DELAY: Duration = Duration::from_millis(200);

/// Предел ожидания ответа приложения при чтении выделения через AT-SPI.
pub const ACCESSIBILITY_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Интервал фиктивных выделений в режиме dry-run.
pub const DRY_RUN_SELECTION_INTERVAL: Duration = Duration::from_secs(5);

/// Пауза сервера канала перед повторным ожиданием клиента.
pub const SERVER_RELISTEN_BACKOFF: Duration = Duration::from_millis(500);

/// Задержки клиента канала.
pub const CLIENT_INITIAL_DELAY: Duration = Duration::from_secs(2);
pub const CLIENT_RETRY_AFTER_CLOSE: Duration = Duration::from_secs(1);
pub const CLIENT_RETRY_AFTER_ERROR: Duration = Duration::from_secs(2);

/// Максимальный размер незавершённой строки в приёмном буфере клиента.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Размеры всплывающего окна и отступ от выделения.
pub const POPUP_WIDTH: i32 = 140;
pub const POPUP_HEIGHT: i32 = 46;
pub const POPUP_GAP: i32 = 8;

/// Длина превью текста во всплывающем окне.
pub const POPUP_PREVIEW_CHARS: usize = 80;

/// Сколько символов запроса попадает в ответ-заглушку.
pub const ACTION_REPLY_QUERY_CHARS: usize = 200;
