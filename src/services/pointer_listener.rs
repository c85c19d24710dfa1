use crate::config::Config;
use crate::error::{WatcherError, Result};
use crate::events::{PointerButton, PointerEvent};
use crate::utils::DeviceFinder;
use crate::watcher_error;
use evdev::{Device, EventType};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Глобальный хук отпускания кнопок: читает все устройства указателя.
///
/// Устройства не захватываются эксклюзивно: события продолжают идти в сессию.
pub struct PointerListener {
    devices: Vec<(PathBuf, Device)>,
}

impl PointerListener {
    pub fn new(config: &Config) -> Result<Self> {
        info!("Инициализация PointerListener");

        let paths = DeviceFinder::find_pointer_devices(&config.input.pointer_device_path)?;

        let mut devices = Vec::new();
        for path in paths {
            match Device::open(&path) {
                Ok(device) => {
                    info!("Устройство: {} ({})", device.name().unwrap_or("Unknown"), path.display());
                    devices.push((path, device));
                }
                Err(e) => warn!("Не удалось открыть устройство {:?}: {}", path, e),
            }
        }

        if devices.is_empty() {
            return Err(WatcherError::DeviceNotFound(
                "Ни одно устройство указателя не удалось открыть".to_string(),
            ));
        }

        Ok(Self { devices })
    }

    /// Читать события всех устройств и отправлять отпускания кнопок в канал
    pub async fn run(self, tx: mpsc::Sender<PointerEvent>) -> Result<()> {
        info!("PointerListener запущен, устройств: {}", self.devices.len());

        let mut tasks = JoinSet::new();
        for (path, device) in self.devices {
            let device_name = device.name().unwrap_or("Unknown").to_string();
            let mut stream = match device.into_event_stream() {
                Ok(stream) => stream,
                Err(e) => {
                    error!("Не удалось открыть поток событий {:?}: {}", path, e);
                    continue;
                }
            };

            let tx = tx.clone();
            tasks.spawn(async move {
                loop {
                    let event = match stream.next_event().await {
                        Ok(event) => event,
                        Err(e) => {
                            error!("Ошибка чтения событий {}: {}", device_name, e);
                            break;
                        }
                    };

                    if let Some(released) = release_from_raw(event.event_type(), event.code(), event.value(), &device_name) {
                        debug!("Событие указателя: {}", released);
                        if tx.send(released).await.is_err() {
                            // Получатель завершился
                            break;
                        }
                    }
                }
            });
        }

        while tasks.join_next().await.is_some() {}

        Err(watcher_error!(service_unavailable, "Все устройства указателя перестали отдавать события"))
    }
}

/// Отпускание кнопки из сырого события evdev
fn release_from_raw(event_type: EventType, code: u16, value: i32, device_name: &str) -> Option<PointerEvent> {
    if event_type != EventType::KEY || value != 0 {
        return None;
    }
    PointerButton::from_code(code).map(|button| PointerEvent::released(button, device_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use evdev::KeyCode;

    #[test]
    fn test_left_release_detected() {
        let event = release_from_raw(EventType::KEY, KeyCode::BTN_LEFT.code(), 0, "mouse").unwrap();
        assert_eq!(event.button, PointerButton::Left);
        assert_eq!(event.device_name, "mouse");
    }

    #[test]
    fn test_press_and_other_events_ignored() {
        assert!(release_from_raw(EventType::KEY, KeyCode::BTN_LEFT.code(), 1, "m").is_none());
        assert!(release_from_raw(EventType::KEY, KeyCode::KEY_A.code(), 0, "m").is_none());
        assert!(release_from_raw(EventType::RELATIVE, 0, 0, "m").is_none());
    }
}
