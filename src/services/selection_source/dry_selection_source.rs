use crate::constants::DRY_RUN_SELECTION_INTERVAL;
use crate::error::Result;
use crate::events::{Rect, SelectionEvent, StrategyKind};
use crate::services::SelectionDispatcher;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::info;

use super::r#trait::SelectionSourceTrait;

const FAKE_SELECTIONS: [(&str, &str); 4] = [
    ("Hello from dry run", "gedit"),
    ("fn main() { println!(\"dry run\"); }", "code"),
    ("The quick brown fox jumps over the lazy dog", "firefox"),
    ("Выделенный текст для проверки канала", "telegram-desktop"),
];

/// Фиктивные выделения без устройств, буфера обмена и D-Bus
pub struct DrySelectionSource {
    dispatcher: Arc<SelectionDispatcher>,
    period: Duration,
}

impl DrySelectionSource {
    pub fn new(dispatcher: Arc<SelectionDispatcher>) -> Self {
        Self {
            dispatcher,
            period: DRY_RUN_SELECTION_INTERVAL,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }
}

#[async_trait::async_trait]
impl SelectionSourceTrait for DrySelectionSource {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    async fn run(self: Box<Self>, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!("Dry-run режим - выделения эмулируются каждые {:?}", self.period);

        let mut ticker = interval(self.period);
        // Первый тик срабатывает сразу
        ticker.tick().await;

        let mut index = 0;
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let (text, process) = FAKE_SELECTIONS[index];
                    let rect = Rect::new(100.0 + 40.0 * index as f64, 200.0, 180.0, 18.0);
                    if let Some(event) = SelectionEvent::new(text, rect, process) {
                        info!("Dry-run: эмулируем выделение в {}", process);
                        self.dispatcher.submit(StrategyKind::Accessibility, event).await;
                    }
                    index = (index + 1) % FAKE_SELECTIONS.len();
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::RecordingSink;

    #[tokio::test]
    async fn test_emits_rotating_selections_until_shutdown() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = Arc::new(SelectionDispatcher::new(sink.clone()));
        let source = DrySelectionSource::new(dispatcher).with_period(Duration::from_millis(10));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(Box::new(source).run(shutdown_rx));

        for _ in 0..100 {
            if sink.texts().len() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        shutdown_tx.send(true).unwrap();
        assert!(handle.await.unwrap().is_ok());

        let texts = sink.texts();
        assert!(texts.len() >= 2);
        assert_eq!(texts[0], "Hello from dry run");
        assert_ne!(texts[0], texts[1]);
    }

    #[tokio::test]
    async fn test_spurious_wakeup_does_not_skip_selection() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = Arc::new(SelectionDispatcher::new(sink.clone()));
        let source = DrySelectionSource::new(dispatcher).with_period(Duration::from_millis(30));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(Box::new(source).run(shutdown_rx));

        for _ in 0..200 {
            if sink.texts().len() >= 3 {
                break;
            }
            // Изменение без запроса остановки
            shutdown_tx.send(false).unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        shutdown_tx.send(true).unwrap();
        assert!(handle.await.unwrap().is_ok());

        let texts = sink.texts();
        assert!(texts.len() >= 3);
        for (text, (expected, _)) in texts.iter().zip(FAKE_SELECTIONS.iter()) {
            assert_eq!(text, expected);
        }
    }
}
