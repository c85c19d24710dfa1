use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{watch, Mutex, Notify};
use tracing::{debug, error, info, warn};

use super::EventSink;
use crate::constants::SERVER_RELISTEN_BACKOFF;
use crate::debug_if_enabled;
use crate::error::Result;
use crate::events::SelectionEvent;

/// Сколько ждём записи строки клиенту, прежде чем считать его отвалившимся
const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Состояние сессии канала на стороне сервера
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Listening,
    Connected,
    Disconnected,
}

/// Текущий писатель: поток к подключённому клиенту
struct ActiveWriter {
    connection_id: u64,
    half: OwnedWriteHalf,
}

/// Сервер канала: один писатель, бесконечные переподключения.
///
/// Ссылка на текущего писателя доступна только через `send` и цикл
/// обслуживания соединения; оба пути проходят через один мьютекс.
pub struct ChannelServer {
    path: PathBuf,
    writer: Mutex<Option<ActiveWriter>>,
    write_failed: Notify,
    state_tx: watch::Sender<ChannelState>,
    next_connection_id: AtomicU64,
    relisten_backoff: Duration,
}

impl ChannelServer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (state_tx, _) = watch::channel(ChannelState::Listening);
        Self {
            path: path.into(),
            writer: Mutex::new(None),
            write_failed: Notify::new(),
            state_tx,
            next_connection_id: AtomicU64::new(1),
            relisten_backoff: SERVER_RELISTEN_BACKOFF,
        }
    }

    pub fn with_relisten_backoff(mut self, backoff: Duration) -> Self {
        self.relisten_backoff = backoff;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Наблюдение за состоянием сессии
    pub fn state(&self) -> watch::Receiver<ChannelState> {
        self.state_tx.subscribe()
    }

    pub async fn is_connected(&self) -> bool {
        self.writer.lock().await.is_some()
    }

    /// Бесконечный цикл: ждать клиента, обслуживать, после отключения пауза и снова ждать
    pub async fn run(self: Arc<Self>) -> Result<()> {
        info!("Сервер канала запущен: {}", self.path.display());

        let mut listener: Option<UnixListener> = None;
        loop {
            let current = match listener.take() {
                Some(l) => l,
                None => match self.bind() {
                    Ok(l) => l,
                    Err(e) => {
                        error!("Не удалось создать сокет {}: {}", self.path.display(), e);
                        tokio::time::sleep(self.relisten_backoff).await;
                        continue;
                    }
                },
            };

            self.set_state(ChannelState::Listening);
            debug!("Ожидание клиента канала...");

            match current.accept().await {
                Ok((stream, _)) => {
                    let connection_id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
                    info!("Клиент канала подключился (#{})", connection_id);
                    self.serve_connection(&current, connection_id, stream).await;
                    info!("Клиент канала отключился (#{})", connection_id);
                    listener = Some(current);
                }
                Err(e) => {
                    // Сокет пересоздаётся на следующей итерации
                    warn!("Ошибка accept на сокете канала: {}", e);
                }
            }

            self.set_state(ChannelState::Disconnected);
            tokio::time::sleep(self.relisten_backoff).await;
        }
    }

    /// Отправить событие текущему клиенту; без клиента событие теряется
    pub async fn send(&self, event: &SelectionEvent) {
        let line = match event.to_line() {
            Ok(line) => line,
            Err(e) => {
                warn!("Не удалось сериализовать событие выделения: {}", e);
                return;
            }
        };

        let mut guard = self.writer.lock().await;
        let Some(active) = guard.as_mut() else {
            debug_if_enabled!("Клиента нет, событие отброшено: {}", event);
            return;
        };

        let result = tokio::time::timeout(WRITE_TIMEOUT, write_line(&mut active.half, &line)).await;
        match result {
            Ok(Ok(())) => {
                debug_if_enabled!("Событие отправлено клиенту #{}: {}", active.connection_id, event);
            }
            Ok(Err(e)) => {
                warn!("Ошибка записи в канал: {}", e);
                *guard = None;
                self.write_failed.notify_one();
            }
            Err(_) => {
                warn!("Таймаут записи в канал ({:?})", WRITE_TIMEOUT);
                *guard = None;
                self.write_failed.notify_one();
            }
        }
    }

    /// Удалить файл сокета при завершении
    pub fn cleanup(&self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!("Не удалось удалить сокет {}: {}", self.path.display(), e);
            }
        }
    }

    fn bind(&self) -> Result<UnixListener> {
        // Сокет, оставшийся от предыдущего запуска
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let listener = UnixListener::bind(&self.path)?;
        info!("Сокет канала создан: {}", self.path.display());
        Ok(listener)
    }

    async fn serve_connection(&self, listener: &UnixListener, connection_id: u64, stream: UnixStream) {
        let (mut reader, half) = stream.into_split();
        *self.writer.lock().await = Some(ActiveWriter { connection_id, half });
        self.set_state(ChannelState::Connected);

        // Клиент ничего не пишет; чтение нужно только чтобы заметить закрытие
        let mut scratch = [0u8; 256];
        loop {
            tokio::select! {
                read = reader.read(&mut scratch) => match read {
                    Ok(0) => break,
                    Ok(n) => debug!("Игнорируем {} байт от клиента канала", n),
                    Err(e) => {
                        warn!("Ошибка чтения из канала: {}", e);
                        break;
                    }
                },
                _ = self.write_failed.notified() => {
                    if !self.owns_writer(connection_id).await {
                        break;
                    }
                }
                extra = listener.accept() => match extra {
                    Ok((stream, _)) => {
                        warn!("Канал уже занят клиентом #{}, новое подключение закрыто", connection_id);
                        drop(stream);
                    }
                    Err(e) => {
                        // Ошибка повторится сразу (например, EMFILE), не крутим accept
                        debug!("Ошибка accept при активном клиенте: {}", e);
                        tokio::time::sleep(self.relisten_backoff).await;
                    }
                },
            }
        }

        self.clear_writer(connection_id).await;
    }

    async fn owns_writer(&self, connection_id: u64) -> bool {
        self.writer
            .lock()
            .await
            .as_ref()
            .is_some_and(|w| w.connection_id == connection_id)
    }

    async fn clear_writer(&self, connection_id: u64) {
        let mut guard = self.writer.lock().await;
        if guard.as_ref().is_some_and(|w| w.connection_id == connection_id) {
            *guard = None;
        }
    }

    fn set_state(&self, state: ChannelState) {
        self.state_tx.send_replace(state);
    }
}

#[async_trait::async_trait]
impl EventSink for ChannelServer {
    async fn send(&self, event: &SelectionEvent) {
        ChannelServer::send(self, event).await
    }
}

async fn write_line(half: &mut OwnedWriteHalf, line: &str) -> std::io::Result<()> {
    half.write_all(line.as_bytes()).await?;
    half.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Rect;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    fn event(text: &str) -> SelectionEvent {
        SelectionEvent::new(text, Rect::new(1.0, 2.0, 3.0, 4.0), "test").unwrap()
    }

    fn spawn_server(dir: &tempfile::TempDir) -> Arc<ChannelServer> {
        let server = Arc::new(
            ChannelServer::new(dir.path().join("channel.sock"))
                .with_relisten_backoff(Duration::from_millis(20)),
        );
        tokio::spawn(server.clone().run());
        server
    }

    async fn wait_state(server: &ChannelServer, expected: ChannelState) {
        let mut rx = server.state();
        timeout(WAIT, rx.wait_for(|s| *s == expected))
            .await
            .expect("состояние не достигнуто")
            .unwrap();
    }

    async fn connect(server: &ChannelServer) -> UnixStream {
        wait_state(server, ChannelState::Listening).await;
        for _ in 0..100 {
            if let Ok(stream) = UnixStream::connect(server.path()).await {
                return stream;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("не удалось подключиться к {}", server.path().display());
    }

    #[tokio::test]
    async fn test_send_without_client_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let server = ChannelServer::new(dir.path().join("idle.sock"));

        for i in 0..100 {
            server.send(&event(&format!("text {}", i))).await;
        }
        assert!(!server.is_connected().await);
    }

    #[tokio::test]
    async fn test_connected_client_receives_lines() {
        let dir = tempfile::tempdir().unwrap();
        let server = spawn_server(&dir);

        let stream = connect(&server).await;
        wait_state(&server, ChannelState::Connected).await;

        server.send(&event("first")).await;
        server.send(&event("second")).await;

        let mut lines = BufReader::new(stream).lines();
        let first = timeout(WAIT, lines.next_line()).await.unwrap().unwrap().unwrap();
        let second = timeout(WAIT, lines.next_line()).await.unwrap().unwrap().unwrap();

        let first: serde_json::Value = serde_json::from_str(&first).unwrap();
        let second: serde_json::Value = serde_json::from_str(&second).unwrap();
        assert_eq!(first["type"], "selection");
        assert_eq!(first["text"], "first");
        assert_eq!(second["text"], "second");
    }

    #[tokio::test]
    async fn test_reconnect_resumes_delivery() {
        let dir = tempfile::tempdir().unwrap();
        let server = spawn_server(&dir);

        let first_client = connect(&server).await;
        wait_state(&server, ChannelState::Connected).await;
        drop(first_client);

        wait_state(&server, ChannelState::Listening).await;
        assert!(!server.is_connected().await);
        // Без клиента событие просто теряется
        server.send(&event("lost")).await;

        let second_client = connect(&server).await;
        wait_state(&server, ChannelState::Connected).await;
        server.send(&event("after reconnect")).await;

        let mut lines = BufReader::new(second_client).lines();
        let line = timeout(WAIT, lines.next_line()).await.unwrap().unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["text"], "after reconnect");
    }

    #[tokio::test]
    async fn test_write_failure_clears_writer_and_relistens() {
        let dir = tempfile::tempdir().unwrap();
        let server = spawn_server(&dir);

        // Клиент закрывает только приём: чтение сервера не видит EOF, запись падает
        let deaf = connect(&server).await.into_std().unwrap();
        wait_state(&server, ChannelState::Connected).await;
        deaf.shutdown(std::net::Shutdown::Read).unwrap();

        let mut state = server.state();
        server.send(&event("never delivered")).await;
        assert!(!server.is_connected().await);

        timeout(WAIT, state.wait_for(|s| *s != ChannelState::Connected))
            .await
            .unwrap()
            .unwrap();

        // Пока клиента нет, события теряются без ошибок
        server.send(&event("dropped")).await;
        assert!(!server.is_connected().await);

        let client = connect(&server).await;
        wait_state(&server, ChannelState::Connected).await;
        server.send(&event("after failure")).await;

        let mut lines = BufReader::new(client).lines();
        let line = timeout(WAIT, lines.next_line()).await.unwrap().unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["text"], "after failure");
        drop(deaf);
    }

    #[tokio::test]
    async fn test_second_client_is_rejected_while_busy() {
        let dir = tempfile::tempdir().unwrap();
        let server = spawn_server(&dir);

        let _first = connect(&server).await;
        wait_state(&server, ChannelState::Connected).await;

        let mut second = UnixStream::connect(server.path()).await.unwrap();
        let mut buf = [0u8; 16];
        let n = timeout(WAIT, second.read(&mut buf)).await.unwrap().unwrap_or(0);
        assert_eq!(n, 0);
        assert!(server.is_connected().await);
    }

    #[tokio::test]
    async fn test_stale_socket_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("channel.sock");
        std::fs::write(&path, b"stale").unwrap();

        let server = Arc::new(
            ChannelServer::new(&path).with_relisten_backoff(Duration::from_millis(20)),
        );
        tokio::spawn(server.clone().run());

        let _client = connect(&server).await;
        wait_state(&server, ChannelState::Connected).await;

        server.cleanup();
        assert!(!path.exists());
    }
}
