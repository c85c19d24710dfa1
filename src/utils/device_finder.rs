use crate::error::{WatcherError, Result};
use evdev::KeyCode;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub struct DeviceFinder;

impl DeviceFinder {
    /// Найти устройства указателя (мыши, тачпады), с которых читаем кнопки
    pub fn find_pointer_devices(device_path: &str) -> Result<Vec<PathBuf>> {
        if device_path != "auto" {
            let path = PathBuf::from(device_path);
            return if path.exists() {
                info!("Используется указанное устройство: {:?}", path);
                Ok(vec![path])
            } else {
                WatcherError::device_not_found(
                    format!("Указанное устройство не найдено: {:?}", path)
                )
            }
        }

        Self::auto_find_pointers()
    }

    fn auto_find_pointers() -> Result<Vec<PathBuf>> {
        info!("Начинаем автопоиск устройств указателя...");

        let input_dir = Path::new("/dev/input");

        let entries = fs::read_dir(input_dir)
            .map_err(|e| WatcherError::Permission(
                format!("Нет доступа к /dev/input: {}", e)
            ))?;

        let mut event_devices = Vec::new();

        for entry in entries {
            let entry = entry.map_err(WatcherError::Io)?;
            let path = entry.path();
            let name = path.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("");

            if name.starts_with("event") {
                event_devices.push(path);
            }
        }

        // Сортируем устройства по номеру
        event_devices.sort();

        let pointers: Vec<PathBuf> = event_devices
            .into_iter()
            .filter(|path| Self::is_device_accessible(path) && Self::is_pointer_device(path))
            .collect();

        if pointers.is_empty() {
            return WatcherError::device_not_found(
                "Не найдено доступное устройство указателя. \
                 Убедитесь, что пользователь добавлен в группу 'input'"
            );
        }

        Ok(pointers)
    }

    fn is_pointer_device(device_path: &Path) -> bool {
        match evdev::Device::open(device_path) {
            Ok(device) => {
                let device_name = device.name().unwrap_or("Unknown").to_string();

                let has_left_button = device
                    .supported_keys()
                    .is_some_and(|keys| keys.contains(KeyCode::BTN_LEFT));

                if has_left_button {
                    info!("Устройство {:?} подходит как указатель ({})", device_path, device_name);
                } else {
                    debug!("Устройство {:?} не указатель ({})", device_path, device_name);
                }

                has_left_button
            }
            Err(e) => {
                debug!("Не удалось открыть устройство {:?}: {}", device_path, e);
                false
            }
        }
    }

    fn is_device_accessible(device_path: &Path) -> bool {
        match fs::File::open(device_path) {
            Ok(_) => true,
            Err(e) => {
                warn!("Устройство {:?} недоступно: {}", device_path, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_pointer_device_with_specific_path() {
        // Тест с несуществующим путем
        let result = DeviceFinder::find_pointer_devices("/non/existent/path");
        assert!(matches!(result, Err(WatcherError::DeviceNotFound(_))));
    }

    #[test]
    fn test_specific_existing_path_is_used_as_is() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        let devices = DeviceFinder::find_pointer_devices(path).unwrap();
        assert_eq!(devices, vec![file.path().to_path_buf()]);
    }
}
