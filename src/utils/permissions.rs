use crate::error::{WatcherError, Result};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use tracing::{info, warn};

/// Проверить доступ к ресурсам пробы буфера обмена: устройства ввода и uinput
pub fn check_permissions() -> Result<()> {
    info!("Проверка прав доступа...");

    check_input_devices_access()?;
    check_uinput_access()?;
    check_not_root();

    info!("Проверка прав доступа завершена успешно");
    Ok(())
}

fn check_input_devices_access() -> Result<()> {
    let input_dir = "/dev/input";

    if !std::path::Path::new(input_dir).exists() {
        return Err(WatcherError::Permission(
            format!("Директория {} не существует", input_dir)
        ));
    }

    match fs::read_dir(input_dir) {
        Ok(_) => {
            info!("Доступ к {} подтвержден", input_dir);
            Ok(())
        }
        Err(e) => {
            Err(WatcherError::Permission(
                format!("Нет доступа к {}: {}. Добавьте пользователя в группу 'input'", input_dir, e)
            ))
        }
    }
}

fn check_uinput_access() -> Result<()> {
    let uinput_device = "/dev/uinput";

    if !std::path::Path::new(uinput_device).exists() {
        // Модуль может быть загружен позже, создание устройства сообщит об ошибке само
        warn!("{} не существует, возможно модуль uinput не загружен", uinput_device);
        return Ok(());
    }

    let metadata = fs::metadata(uinput_device).map_err(|e| {
        WatcherError::Permission(format!("Не удалось проверить права доступа к {}: {}", uinput_device, e))
    })?;

    if !mode_allows_access(metadata.permissions().mode()) {
        return Err(WatcherError::Permission(
            format!("Нет прав доступа к {}. Без него Ctrl+C не синтезировать, добавьте пользователя в группу 'uinput'", uinput_device)
        ));
    }

    info!("Доступ к {} подтвержден", uinput_device);
    Ok(())
}

/// Доступ через группу или для всех (обычно 660 или 666)
fn mode_allows_access(mode: u32) -> bool {
    mode & 0o006 != 0 || mode & 0o060 != 0
}

fn check_not_root() {
    match std::env::var("USER") {
        Ok(user) if user == "root" => {
            warn!("⚠️  Наблюдатель запущен от имени root!");
            warn!("   Буфер обмена и AT-SPI принадлежат сессии пользователя и могут быть недоступны");
            for command in get_setup_commands().iter().filter(|c| c.starts_with("sudo")) {
                warn!("   {}", command);
            }
        }
        Ok(user) => {
            info!("Наблюдатель запущен от имени пользователя: {}", user);
        }
        Err(_) => {
            warn!("Не удалось определить пользователя");
        }
    }
}

/// Рекомендуемые команды для настройки прав доступа
pub fn get_setup_commands() -> Vec<String> {
    vec![
        "# Добавить пользователя в необходимые группы:".to_string(),
        "sudo usermod -a -G input,uinput $USER".to_string(),
        "".to_string(),
        "# Загрузить модуль uinput:".to_string(),
        "sudo modprobe uinput".to_string(),
        "".to_string(),
        "# После выполнения команд перезайдите в систему".to_string(),
    ]
}
