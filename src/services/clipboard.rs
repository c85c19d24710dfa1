use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

use crate::error::Result;
use crate::watcher_error;

/// Текстовый доступ к системному буферу обмена
#[async_trait::async_trait]
pub trait ClipboardAccess: Send + Sync {
    /// Текущий текст; `None`, если в буфере нет текста
    async fn get_text(&self) -> Result<Option<String>>;

    async fn set_text(&self, text: &str) -> Result<()>;
}

/// Буфер обмена через arboard.
///
/// Экземпляр `arboard::Clipboard` живёт всё время работы процесса: на X11
/// установленное содержимое обслуживается, пока он существует.
pub struct SystemClipboard {
    inner: Arc<Mutex<arboard::Clipboard>>,
}

impl SystemClipboard {
    pub fn new() -> Result<Self> {
        info!("Инициализация доступа к буферу обмена");
        Ok(Self {
            inner: Arc::new(Mutex::new(arboard::Clipboard::new()?)),
        })
    }
}

#[async_trait::async_trait]
impl ClipboardAccess for SystemClipboard {
    async fn get_text(&self) -> Result<Option<String>> {
        let inner = Arc::clone(&self.inner);
        let result = tokio::task::spawn_blocking(move || inner.lock().get_text())
            .await
            .map_err(|e| watcher_error!(internal, "Задача чтения буфера обмена: {}", e))?;

        match result {
            Ok(text) => Ok(Some(text)),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_text(&self, text: &str) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        let text = text.to_string();
        tokio::task::spawn_blocking(move || inner.lock().set_text(text))
            .await
            .map_err(|e| watcher_error!(internal, "Задача записи буфера обмена: {}", e))??;
        Ok(())
    }
}
