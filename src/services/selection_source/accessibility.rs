use crate::constants::ACCESSIBILITY_READ_TIMEOUT;
use crate::debug_if_enabled;
use crate::error::{Result, WatcherError};
use crate::events::{rect_from_bounds, SelectionEvent, StrategyKind};
use crate::services::{process_name, SelectionDispatcher};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::r#trait::SelectionSourceTrait;

/// Уведомления доступности, на которые подписан источник
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    TextSelectionChanged,
    /// Запасной вариант: часть элементов обновляет выделение только при смене фокуса
    FocusChanged,
}

/// Элемент интерфейса, приславший уведомление
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessibleRef {
    pub bus_name: String,
    pub path: String,
}

impl fmt::Display for AccessibleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.bus_name, self.path)
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub kind: NotificationKind,
    pub source: AccessibleRef,
}

/// Первый диапазон выделения, прочитанный у элемента
#[derive(Debug, Clone, Default)]
pub struct RawSelection {
    pub text: String,
    /// Границы длиной 0 или кратной 4, см. `rect_from_bounds`
    pub bounds: SmallVec<[f64; 4]>,
    pub pid: Option<u32>,
}

/// Шина доступности рабочего стола
#[async_trait::async_trait]
pub trait AccessibilityBus: Send + Sync {
    /// Подписаться на смену выделения и фокуса по всему дереву элементов
    async fn subscribe(&self) -> Result<mpsc::Receiver<Notification>>;

    /// Прочитать выделение элемента; `None`, если элемент не даёт доступа к тексту
    async fn read_selection(&self, source: &AccessibleRef) -> Result<Option<RawSelection>>;

    /// Снять все подписки
    async fn unsubscribe_all(&self);
}

/// Стратегия A: выделение по уведомлениям доступности
pub struct AccessibilitySource<B> {
    bus: B,
    dispatcher: Arc<SelectionDispatcher>,
}

impl<B: AccessibilityBus> AccessibilitySource<B> {
    pub fn new(bus: B, dispatcher: Arc<SelectionDispatcher>) -> Self {
        Self { bus, dispatcher }
    }

    /// Обработать уведомление. Ошибки чтения только логируются.
    ///
    /// Возвращает `true`, если событие ушло в канал.
    pub async fn handle_notification(&self, notification: &Notification) -> bool {
        if !self.dispatcher.begin_check(StrategyKind::Accessibility) {
            return false;
        }

        let read = tokio::time::timeout(ACCESSIBILITY_READ_TIMEOUT, self.read_event(notification)).await;

        match read {
            Ok(Ok(Some(event))) => self.dispatcher.submit(StrategyKind::Accessibility, event).await,
            Ok(Ok(None)) => false,
            Ok(Err(e)) => {
                debug!("Не удалось прочитать выделение {}: {}", notification.source, e);
                false
            }
            Err(_) => {
                debug!("Элемент {} не ответил вовремя", notification.source);
                false
            }
        }
    }

    async fn read_event(&self, notification: &Notification) -> Result<Option<SelectionEvent>> {
        let Some(raw) = self.bus.read_selection(&notification.source).await? else {
            debug_if_enabled!("{:?} от {} без доступа к тексту", notification.kind, notification.source);
            return Ok(None);
        };

        if raw.text.trim().is_empty() {
            return Ok(None);
        }

        let rect = rect_from_bounds(&raw.bounds);
        Ok(SelectionEvent::new(&raw.text, rect, process_name(raw.pid)))
    }
}

#[async_trait::async_trait]
impl<B: AccessibilityBus + 'static> SelectionSourceTrait for AccessibilitySource<B> {
    fn name(&self) -> &'static str {
        "accessibility"
    }

    async fn run(self: Box<Self>, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut notifications = self.bus.subscribe().await?;
        info!("Подписка на уведомления доступности активна");

        let result = loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break Ok(());
                    }
                }
                notification = notifications.recv() => match notification {
                    Some(notification) => {
                        self.handle_notification(&notification).await;
                    }
                    None => {
                        warn!("Поток уведомлений доступности закрылся");
                        break Err(WatcherError::ServiceUnavailable(
                            "Соединение с шиной доступности потеряно".to_string(),
                        ));
                    }
                },
            }
        };

        self.bus.unsubscribe_all().await;
        info!("Подписка на уведомления доступности снята");
        result
    }
}
