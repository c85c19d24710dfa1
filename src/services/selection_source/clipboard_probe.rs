use crate::config::Config;
use crate::constants::{
    CLIPBOARD_RESTORE_DELAY, CLIPBOARD_UPDATE_WAIT, PROBE_MAX_CHARS, PROBE_MIN_CHARS,
    PROBE_PROCESS_PLACEHOLDER, RELEASE_SETTLE_DELAY,
};
use crate::debug_if_enabled;
use crate::error::Result;
use crate::events::{PointerEvent, Rect, SelectionEvent, StrategyKind};
use crate::services::{
    ClipboardAccess, CopyTrigger, PointerListener, PointerLocator, PointerPosition, SelectionDispatcher,
    SystemClipboard, VirtualDevice,
};
use crate::utils::check_permissions;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::r#trait::SelectionSourceTrait;

/// Паузы пробы буфера обмена
#[derive(Debug, Clone, Copy)]
pub struct ProbeTimings {
    /// После отпускания кнопки, до проверки
    pub settle: Duration,
    /// После синтезированного Ctrl+C
    pub clipboard_wait: Duration,
    /// Перед восстановлением исходного содержимого
    pub restore_delay: Duration,
}

impl Default for ProbeTimings {
    fn default() -> Self {
        Self {
            settle: RELEASE_SETTLE_DELAY,
            clipboard_wait: CLIPBOARD_UPDATE_WAIT,
            restore_delay: CLIPBOARD_RESTORE_DELAY,
        }
    }
}

/// Стратегия B: копирование в буфер обмена после отпускания левой кнопки.
///
/// Меняет живой буфер обмена пользователя и возвращает прежнее содержимое
/// с задержкой. Ошибки буфера и синтеза клавиш не выходят наружу.
pub struct ClipboardProbe {
    dispatcher: Arc<SelectionDispatcher>,
    clipboard: Arc<dyn ClipboardAccess>,
    copier: Arc<dyn CopyTrigger>,
    pointer: Arc<dyn PointerPosition>,
    timings: ProbeTimings,
}

impl ClipboardProbe {
    pub fn new(
        dispatcher: Arc<SelectionDispatcher>,
        clipboard: Arc<dyn ClipboardAccess>,
        copier: Arc<dyn CopyTrigger>,
        pointer: Arc<dyn PointerPosition>,
    ) -> Self {
        Self {
            dispatcher,
            clipboard,
            copier,
            pointer,
            timings: ProbeTimings::default(),
        }
    }

    pub fn with_timings(mut self, timings: ProbeTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Запланировать проверку после отпускания кнопки, не блокируя хук
    pub fn on_pointer_release(self: &Arc<Self>, event: &PointerEvent) -> Option<JoinHandle<()>> {
        if !event.ends_selection() {
            return None;
        }

        let probe = Arc::clone(self);
        Some(tokio::spawn(async move {
            tokio::time::sleep(probe.timings.settle).await;
            probe.check_for_selection().await;
        }))
    }

    /// Одна проба. `true`, если выделение ушло в канал.
    pub async fn check_for_selection(&self) -> bool {
        if !self.dispatcher.begin_check(StrategyKind::ClipboardProbe) {
            return false;
        }

        let original = match self.clipboard.get_text().await {
            Ok(text) => text.unwrap_or_default(),
            Err(e) => {
                debug!("Снимок буфера обмена не получен: {}", e);
                String::new()
            }
        };

        if let Err(e) = self.copier.trigger_copy() {
            warn!("Не удалось синтезировать Ctrl+C: {}", e);
            return false;
        }

        tokio::time::sleep(self.timings.clipboard_wait).await;

        let copied = match self.clipboard.get_text().await {
            Ok(Some(text)) => text,
            Ok(None) => return false,
            Err(e) => {
                debug!("Буфер обмена не прочитан после копирования: {}", e);
                return false;
            }
        };

        let emitted = if self.qualifies(&copied, &original) {
            let (x, y) = self.pointer.pointer_position().await;
            match SelectionEvent::new(&copied, Rect::at_point(x, y), PROBE_PROCESS_PLACEHOLDER) {
                Some(event) => self.dispatcher.submit(StrategyKind::ClipboardProbe, event).await,
                None => false,
            }
        } else {
            debug_if_enabled!("Содержимое буфера обмена не похоже на новое выделение");
            false
        };

        if !original.is_empty() && copied != original {
            self.schedule_restore(original);
        }

        emitted
    }

    fn qualifies(&self, copied: &str, original: &str) -> bool {
        let chars = copied.chars().count();
        !copied.trim().is_empty()
            && copied != original
            && self.dispatcher.last_emitted().as_deref() != Some(copied.trim())
            && (PROBE_MIN_CHARS..=PROBE_MAX_CHARS).contains(&chars)
    }

    fn schedule_restore(&self, original: String) {
        let clipboard = Arc::clone(&self.clipboard);
        let delay = self.timings.restore_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = clipboard.set_text(&original).await {
                debug!("Не удалось восстановить буфер обмена: {}", e);
            }
        });
    }
}

/// Проба вместе с хуком отпускания кнопок
pub struct ClipboardProbeSource {
    probe: Arc<ClipboardProbe>,
    listener: PointerListener,
}

impl ClipboardProbeSource {
    pub fn new(config: &Config, dispatcher: Arc<SelectionDispatcher>) -> Result<Self> {
        check_permissions()?;

        let listener = PointerListener::new(config)?;
        let copier = Arc::new(VirtualDevice::new("Selection Watcher Virtual Keyboard", false)?);
        let clipboard = Arc::new(SystemClipboard::new()?);
        let pointer = Arc::new(PointerLocator::new());

        Ok(Self {
            probe: Arc::new(ClipboardProbe::new(dispatcher, clipboard, copier, pointer)),
            listener,
        })
    }
}

#[async_trait::async_trait]
impl SelectionSourceTrait for ClipboardProbeSource {
    fn name(&self) -> &'static str {
        "clipboard-probe"
    }

    async fn run(self: Box<Self>, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let Self { probe, listener } = *self;
        let (tx, mut releases) = mpsc::channel::<PointerEvent>(32);

        let listener_handle = tokio::spawn(listener.run(tx));
        info!("Проба буфера обмена ждёт отпускания левой кнопки");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                release = releases.recv() => match release {
                    Some(event) => {
                        probe.on_pointer_release(&event);
                    }
                    None => break,
                },
            }
        }

        listener_handle.abort();
        match listener_handle.await {
            Ok(result) => result,
            Err(_) => Ok(()),
        }
    }
}
