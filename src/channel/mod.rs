//! Канал событий выделения между процессом-наблюдателем и процессом-презентером.
//!
//! Транспорт: Unix-сокет с фиксированным именем, один JSON-объект на строку.
//! Сервер держит не более одного клиента и теряет события, когда клиента нет.
//! Клиент переподключается бесконечно и собирает строки из произвольных кусков.

mod client;
mod framing;
mod server;

pub use client::{ChannelClient, ReconnectPolicy};
pub use framing::{parse_line, IncomingSelection, LineBuffer};
pub use server::{ChannelServer, ChannelState};

use crate::constants::ENDPOINT_NAME;
use crate::events::SelectionEvent;
use std::path::PathBuf;

/// Получатель событий, прошедших дедупликацию
#[async_trait::async_trait]
pub trait EventSink: Send + Sync {
    /// Отправить событие. Ошибки доставки не возвращаются: доставка best-effort.
    async fn send(&self, event: &SelectionEvent);
}

/// Путь сокета по умолчанию: $XDG_RUNTIME_DIR, иначе временный каталог системы
pub fn default_socket_path() -> PathBuf {
    let file_name = format!("{}.sock", ENDPOINT_NAME);
    std::env::var("XDG_RUNTIME_DIR")
        .ok()
        .filter(|dir| !dir.is_empty())
        .map_or_else(
            || std::env::temp_dir().join(&file_name),
            |dir| PathBuf::from(dir).join(&file_name),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_name_uses_endpoint() {
        let path = default_socket_path();
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("ai_selection_pipe.sock")
        );
    }
}
