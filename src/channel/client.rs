use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::UnixStream;
use tracing::{debug, info, warn};

use super::framing::{parse_line, LineBuffer};
use crate::constants::{CLIENT_INITIAL_DELAY, CLIENT_RETRY_AFTER_CLOSE, CLIENT_RETRY_AFTER_ERROR};
use crate::error::Result;
use crate::presenter::PresentationController;

/// Задержки переподключения клиента
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    /// Перед первой попыткой: даём серверу время запуститься
    pub initial_delay: Duration,
    pub after_close: Duration,
    /// После ошибки ждём дольше, чтобы не крутиться на сломанном сокете
    pub after_error: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: CLIENT_INITIAL_DELAY,
            after_close: CLIENT_RETRY_AFTER_CLOSE,
            after_error: CLIENT_RETRY_AFTER_ERROR,
        }
    }
}

/// Клиент канала на стороне презентера
pub struct ChannelClient {
    path: PathBuf,
    presenter: Arc<dyn PresentationController>,
    policy: ReconnectPolicy,
}

impl ChannelClient {
    pub fn new(path: impl Into<PathBuf>, presenter: Arc<dyn PresentationController>) -> Self {
        Self {
            path: path.into(),
            presenter,
            policy: ReconnectPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Подключаться и читать события до завершения процесса
    pub async fn run(self) -> Result<()> {
        tokio::time::sleep(self.policy.initial_delay).await;

        loop {
            let delay = match self.session().await {
                Ok(()) => {
                    info!("Канал закрыт сервером, переподключение...");
                    self.policy.after_close
                }
                Err(e) => {
                    warn!("Ошибка канала {}: {}", self.path.display(), e);
                    self.policy.after_error
                }
            };
            tokio::time::sleep(delay).await;
        }
    }

    /// Одна сессия: от подключения до закрытия потока
    async fn session(&self) -> Result<()> {
        let mut stream = UnixStream::connect(&self.path).await?;
        info!("Подключились к каналу выделений: {}", self.path.display());

        let mut buffer = LineBuffer::new();
        let mut chunk = vec![0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                return Ok(());
            }

            for line in buffer.push(&chunk[..n]) {
                self.dispatch_line(&line).await;
            }
        }
    }

    async fn dispatch_line(&self, line: &str) {
        match parse_line(line) {
            Ok(Some(selection)) => {
                debug!(
                    "Выделение из {} ({} симв.)",
                    selection.process,
                    selection.text.chars().count()
                );
                self.presenter.show(&selection.text, selection.rect).await;
            }
            Ok(None) => debug!("Сообщение канала проигнорировано: {}", line),
            Err(e) => warn!("Не удалось разобрать JSON из канала: {} ({})", e, line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelServer, ChannelState};
    use crate::events::{Rect, SelectionEvent};
    use crate::presenter::ActionReply;
    use tokio::io::AsyncWriteExt;
    use tokio::net::UnixListener;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    struct RecordingPresenter {
        tx: mpsc::UnboundedSender<(String, Rect)>,
    }

    #[async_trait::async_trait]
    impl PresentationController for RecordingPresenter {
        async fn show(&self, text: &str, rect: Rect) {
            let _ = self.tx.send((text.to_string(), rect));
        }

        async fn request_action(&self, text: &str) -> Result<ActionReply> {
            Ok(ActionReply::demo(text))
        }
    }

    fn fast_policy() -> ReconnectPolicy {
        ReconnectPolicy {
            initial_delay: Duration::ZERO,
            after_close: Duration::from_millis(20),
            after_error: Duration::from_millis(40),
        }
    }

    fn recording_client(
        path: PathBuf,
    ) -> (ChannelClient, mpsc::UnboundedReceiver<(String, Rect)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = ChannelClient::new(path, Arc::new(RecordingPresenter { tx }))
            .with_policy(fast_policy());
        (client, rx)
    }

    #[tokio::test]
    async fn test_chunked_stream_with_malformed_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let (client, mut rx) = recording_client(path);
        tokio::spawn(client.run());

        let (mut stream, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
        stream.write_all(br#"{"type":"selection","tex"#).await.unwrap();
        stream.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        stream
            .write_all(b"t\":\"hi\",\"rect\":{},\"process\":\"p\",\"timestamp\":\"t\"}\n")
            .await
            .unwrap();
        stream
            .write_all(b"garbage\n{\"type\":\"status\"}\n{\"type\":\"selection\",\"text\":\"next\",\"rect\":{\"x\":5,\"y\":6,\"width\":7,\"height\":8}}\r\n")
            .await
            .unwrap();

        let (text, rect) = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(text, "hi");
        assert_eq!(rect, Rect::default());

        let (text, rect) = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(text, "next");
        assert_eq!(rect, Rect::new(5.0, 6.0, 7.0, 8.0));
    }

    #[tokio::test]
    async fn test_client_retries_until_server_appears() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late.sock");

        let (client, mut rx) = recording_client(path.clone());
        tokio::spawn(client.run());

        // Сервер стартует позже клиента
        tokio::time::sleep(Duration::from_millis(100)).await;
        let server = Arc::new(
            ChannelServer::new(&path).with_relisten_backoff(Duration::from_millis(20)),
        );
        tokio::spawn(server.clone().run());

        let mut state = server.state();
        timeout(WAIT, state.wait_for(|s| *s == ChannelState::Connected))
            .await
            .unwrap()
            .unwrap();

        let event = SelectionEvent::new("late hello", Rect::new(1.0, 1.0, 2.0, 2.0), "xterm")
            .unwrap();
        server.send(&event).await;

        let (text, rect) = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(text, "late hello");
        assert_eq!(rect, event.rect());
    }

    #[tokio::test]
    async fn test_client_reconnects_after_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flaky.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let (client, mut rx) = recording_client(path);
        tokio::spawn(client.run());

        // Первое соединение закрываем сразу
        let (first, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
        drop(first);

        let (mut second, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
        second
            .write_all(b"{\"type\":\"selection\",\"text\":\"again\"}\n")
            .await
            .unwrap();

        let (text, _) = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(text, "again");
    }
}
