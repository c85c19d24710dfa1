use crate::config::{Config, StrategyMode};
use crate::error::{Result, WatcherError};
use crate::services::SelectionDispatcher;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use super::accessibility::AccessibilitySource;
use super::atspi::AtspiBus;
use super::clipboard_probe::ClipboardProbeSource;
use super::dry_selection_source::DrySelectionSource;

/// Trait for selection sources that can run in different modes
#[async_trait::async_trait]
pub trait SelectionSourceTrait {
    /// Имя источника для логов
    fn name(&self) -> &'static str;

    /// Run the source until `shutdown` becomes `true`
    async fn run(self: Box<Self>, shutdown: watch::Receiver<bool>) -> Result<()>;
}

/// Factory function: источники по стратегии из конфигурации и флагу dry_run
pub async fn create_selection_sources(
    config: &Config,
    dispatcher: Arc<SelectionDispatcher>,
    dry_run: bool,
) -> Result<Vec<Box<dyn SelectionSourceTrait + Send>>> {
    if dry_run {
        return Ok(vec![Box::new(DrySelectionSource::new(dispatcher))]);
    }

    let mode = config.strategy_mode()?;
    info!("Стратегия обнаружения: {:?}", mode);

    let mut sources: Vec<Box<dyn SelectionSourceTrait + Send>> = Vec::new();

    match mode {
        StrategyMode::Accessibility => {
            sources.push(accessibility_source(dispatcher).await?);
        }
        StrategyMode::Clipboard => {
            sources.push(Box::new(ClipboardProbeSource::new(config, dispatcher)?));
        }
        StrategyMode::Auto => match accessibility_source(dispatcher.clone()).await {
            Ok(source) => sources.push(source),
            Err(e) => {
                warn!("AT-SPI недоступен ({}), используем пробу буфера обмена", e);
                sources.push(Box::new(ClipboardProbeSource::new(config, dispatcher)?));
            }
        },
        StrategyMode::Both => {
            match accessibility_source(dispatcher.clone()).await {
                Ok(source) => sources.push(source),
                Err(e) => warn!("AT-SPI недоступен: {}", e),
            }
            match ClipboardProbeSource::new(config, dispatcher) {
                Ok(source) => sources.push(Box::new(source)),
                Err(e) => warn!("Проба буфера обмена недоступна: {}", e),
            }
            if sources.is_empty() {
                return Err(WatcherError::ServiceUnavailable(
                    "Ни одна стратегия обнаружения не запустилась".to_string(),
                ));
            }
        }
    }

    Ok(sources)
}

async fn accessibility_source(
    dispatcher: Arc<SelectionDispatcher>,
) -> Result<Box<dyn SelectionSourceTrait + Send>> {
    let bus = AtspiBus::connect().await?;
    Ok(Box::new(AccessibilitySource::new(bus, dispatcher)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::RecordingSink;

    #[tokio::test]
    async fn test_dry_run_creates_single_fake_source() {
        let dispatcher = Arc::new(SelectionDispatcher::new(Arc::new(RecordingSink::default())));
        let sources = create_selection_sources(&Config::default(), dispatcher, true)
            .await
            .unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name(), "dry-run");
    }

    #[tokio::test]
    async fn test_invalid_strategy_is_rejected() {
        let mut config = Config::default();
        config.detection.strategy = "telepathy".to_string();
        let dispatcher = Arc::new(SelectionDispatcher::new(Arc::new(RecordingSink::default())));
        let result = create_selection_sources(&config, dispatcher, false).await;
        assert!(matches!(result, Err(WatcherError::Config(_))));
    }
}
