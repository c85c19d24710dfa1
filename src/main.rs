use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use selection_watcher::channel::ChannelServer;
use selection_watcher::config::Config;
use selection_watcher::services::{create_selection_sources, SelectionDispatcher};
use selection_watcher::utils::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "selection-watcher")]
#[command(about = "Отслеживание выделения текста и передача его презентеру по локальному каналу")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "selection-watcher.toml")]
    config: String,

    /// Режим сухого запуска (фиктивные выделения, без устройств и буфера обмена)
    #[arg(long)]
    dry_run: bool,

    /// Уровень логирования (перекрывает конфигурацию)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Загрузка конфигурации
    let config = Config::load(&args.config)?;

    // Инициализация системы логирования
    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    init_tracing(level, &config.logging.format)?;

    info!("Запуск Selection Watcher v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {}", args.config);

    if args.dry_run {
        warn!("Режим сухого запуска - выделения эмулируются");
    }

    // Канал событий и единая точка дедупликации
    let server = Arc::new(ChannelServer::new(config.socket_path()));
    let dispatcher = Arc::new(SelectionDispatcher::new(server.clone()));
    let sources = create_selection_sources(&config, dispatcher, args.dry_run).await?;

    info!("Все компоненты инициализированы");

    let server_handle = tokio::spawn({
        let server = server.clone();
        async move {
            if let Err(e) = server.run().await {
                error!("Ошибка в ChannelServer: {}", e);
            }
        }
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut source_handles = Vec::with_capacity(sources.len());
    for source in sources {
        let name = source.name();
        let shutdown = shutdown_rx.clone();
        source_handles.push(tokio::spawn(async move {
            if let Err(e) = source.run(shutdown).await {
                error!("Ошибка в источнике {}: {}", name, e);
            }
        }));
    }

    info!("Все сервисы запущены, источников: {}", source_handles.len());

    // Ожидание сигнала завершения
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Получен сигнал завершения (Ctrl+C)");
        }
        Err(err) => {
            error!("Ошибка при ожидании сигнала завершения: {}", err);
        }
    }

    info!("Завершение работы...");

    // Источники снимают подписки сами
    let _ = shutdown_tx.send(true);

    let shutdown_timeout = tokio::time::Duration::from_secs(5);
    let shutdown_result = tokio::time::timeout(shutdown_timeout, async {
        for handle in &mut source_handles {
            let _ = handle.await;
        }
    })
    .await;

    match shutdown_result {
        Ok(_) => info!("Все источники завершили работу корректно"),
        Err(_) => {
            warn!("Таймаут при завершении источников");
            for handle in &source_handles {
                handle.abort();
            }
        }
    }

    server_handle.abort();
    let _ = server_handle.await;
    server.cleanup();

    info!("Selection Watcher завершил работу");
    Ok(())
}
