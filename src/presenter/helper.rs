use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{error, info, warn};

/// Запустить процесс-наблюдатель рядом с презентером.
///
/// Best-effort: отсутствующий файл или ошибка запуска только логируются.
/// Вывод наблюдателя пересылается в лог презентера.
pub fn launch_helper(executable: &Path) -> bool {
    if !executable.exists() {
        error!("Исполняемый файл наблюдателя не найден: {}", executable.display());
        warn!("Соберите его командой: cargo build --bin selection-watcher");
        return false;
    }

    info!("Запуск наблюдателя: {}", executable.display());
    let mut child = match Command::new(executable)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(false)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            error!("Не удалось запустить наблюдатель: {}", e);
            return false;
        }
    };

    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!("helper stdout: {}", line);
            }
        });
    }

    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!("helper stderr: {}", line);
            }
        });
    }

    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => warn!("Наблюдатель завершился: {}", status),
            Err(e) => error!("Ошибка ожидания наблюдателя: {}", e),
        }
    });

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_helper_is_not_fatal() {
        assert!(!launch_helper(Path::new("/non/existent/selection-watcher")));
    }
}
