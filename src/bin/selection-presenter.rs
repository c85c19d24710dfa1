use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use selection_watcher::channel::{default_socket_path, ChannelClient};
use selection_watcher::presenter::{launch_helper, LogPresenter, XdotoolGeometry};
use selection_watcher::utils::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "selection-presenter")]
#[command(about = "Приём выделений из канала и расчёт всплывающего окна \"спросить ИИ\"")]
struct Args {
    /// Путь к сокету канала (по умолчанию в $XDG_RUNTIME_DIR)
    #[arg(long)]
    socket: Option<PathBuf>,

    /// Запустить наблюдатель из указанного файла
    #[arg(long)]
    helper: Option<PathBuf>,

    /// Сразу запрашивать ответ для каждого выделения
    #[arg(long)]
    auto_ask: bool,

    /// Уровень логирования
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args.log_level, "pretty")?;

    info!("Запуск Selection Presenter v{}", env!("CARGO_PKG_VERSION"));

    if let Some(helper) = &args.helper {
        launch_helper(helper);
    }

    let socket = args.socket.unwrap_or_else(default_socket_path);
    let presenter = LogPresenter::new(Arc::new(XdotoolGeometry::new())).with_auto_request(args.auto_ask);
    let client = ChannelClient::new(socket.clone(), Arc::new(presenter));

    info!("Ожидание выделений из {}", socket.display());

    tokio::select! {
        result = client.run() => {
            if let Err(e) = result {
                error!("Ошибка клиента канала: {}", e);
            }
        }
        signal = signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("Получен сигнал завершения (Ctrl+C)"),
                Err(err) => error!("Ошибка при ожидании сигнала завершения: {}", err),
            }
        }
    }

    info!("Selection Presenter завершил работу");
    Ok(())
}
