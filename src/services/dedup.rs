use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::channel::EventSink;
use crate::debug_if_enabled;
use crate::events::{SelectionEvent, StrategyKind};

/// Подавление дублей и слишком частых проверок.
///
/// Последний отправленный текст общий для всех стратегий; время последней
/// проверки хранится отдельно для каждой стратегии.
#[derive(Default)]
pub struct Deduplicator {
    last_emitted: Mutex<Option<String>>,
    last_checks: DashMap<StrategyKind, Instant>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Разрешить проверку, если с прошлой прошло не меньше минимального интервала стратегии
    pub fn try_begin_check(&self, strategy: StrategyKind) -> bool {
        self.try_begin_check_at(strategy, Instant::now())
    }

    pub fn try_begin_check_at(&self, strategy: StrategyKind, now: Instant) -> bool {
        let interval = strategy.min_check_interval();
        match self.last_checks.entry(strategy) {
            Entry::Occupied(mut entry) => {
                if now.saturating_duration_since(*entry.get()) < interval {
                    false
                } else {
                    entry.insert(now);
                    true
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }

    /// Запомнить текст как отправленный, если он отличается от предыдущего
    pub fn should_emit(&self, text: &str) -> bool {
        let mut last = self.last_emitted.lock();
        if last.as_deref() == Some(text) {
            return false;
        }
        *last = Some(text.to_string());
        true
    }

    pub fn last_emitted(&self) -> Option<String> {
        self.last_emitted.lock().clone()
    }
}

/// Точка входа событий от всех стратегий: дедупликация и передача в канал
pub struct SelectionDispatcher {
    dedup: Deduplicator,
    sink: Arc<dyn EventSink>,
}

impl SelectionDispatcher {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            dedup: Deduplicator::new(),
            sink,
        }
    }

    pub fn begin_check(&self, strategy: StrategyKind) -> bool {
        let allowed = self.dedup.try_begin_check(strategy);
        if !allowed {
            debug_if_enabled!("Проверка {} подавлена интервалом", strategy);
        }
        allowed
    }

    /// Передать событие в канал; `false`, если оно повторяет предыдущее
    pub async fn submit(&self, strategy: StrategyKind, event: SelectionEvent) -> bool {
        if !self.dedup.should_emit(event.text()) {
            debug_if_enabled!("Повтор выделения от {} подавлен", strategy);
            return false;
        }

        info!("Выделение [{}]: {}", strategy, event);
        self.sink.send(&event).await;
        true
    }

    pub fn last_emitted(&self) -> Option<String> {
        self.dedup.last_emitted()
    }
}
